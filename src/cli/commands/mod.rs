//! CLI command implementations

pub mod utils;

pub mod completions;
pub mod config;
pub mod forecast;
pub mod future_sales;
pub mod inventory;
pub mod scorecard;
pub mod sentiment;
pub mod status;
