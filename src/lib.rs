pub mod classify;
pub mod error;
pub mod fetch;
pub mod listing;
pub mod output;
pub mod parser;
pub mod record;
pub mod stats;

pub use error::ConfigError;
pub use record::{FieldNames, ListingRecord};
