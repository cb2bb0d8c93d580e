//! Scraper Adapters
//!
//! Concrete `RateScraper` implementations.

pub mod json_table;

pub use json_table::JsonTableScraper;
