pub mod types;
pub mod classification;

pub use types::FuzzError;
pub use classification::ErrorClassification;
