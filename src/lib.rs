//! Client for a vendor report-sharing portal's file listing.

pub mod config;
pub mod listing;

pub use config::Config;
