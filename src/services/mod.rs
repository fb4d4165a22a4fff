pub mod collector;
pub mod listing_api;
