//! DineFlow: restaurant sales analytics
//!
//! Caches a restaurant's sales CSV locally and turns the results of external
//! prediction services into chart-ready records.

pub mod analytics;
pub mod cli;
pub mod core;
pub mod service;
