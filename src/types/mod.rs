pub mod columns;
pub mod dense_series;
pub mod feature_window;
pub mod month;
pub mod observation;
