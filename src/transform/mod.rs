pub mod aggregate;
pub mod densify;
pub mod error;
pub(crate) mod frame_utils;
pub mod windows;
