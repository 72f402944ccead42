pub mod error;
pub mod raw_data_loader;
pub mod validation;
