//! Analytics views over the cached inventory CSV
//!
//! Each view takes the cached file, asks a prediction service about it, and
//! maps the service's JSON into records ready for a table or chart.

pub mod forecast;
pub mod future_sales;
pub mod scorecard;
pub mod sentiment;

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::core::cache::{CacheError, CachedCsv, CsvCache};
use crate::core::csv::CsvError;
use crate::service::{CsvUpload, ServiceError};

/// Errors raised by the analytics views
#[derive(Debug, Error, Diagnostic)]
pub enum AnalyticsError {
    #[error("No inventory data found in local storage or data has expired")]
    #[diagnostic(
        code(dineflow::analytics::no_data),
        help("upload a sales file first: dineflow inventory upload <file.csv>")
    )]
    NoData,

    #[error("{0}")]
    #[diagnostic(code(dineflow::analytics::invalid_input))]
    InvalidInput(String),

    #[error("Unexpected {view} response: {message}")]
    #[diagnostic(code(dineflow::analytics::shape))]
    Shape { view: &'static str, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Csv(#[from] CsvError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Service(#[from] ServiceError),
}

/// Load the cached inventory file, failing when it is missing or expired
pub fn load_inventory(cache: &CsvCache) -> Result<CachedCsv, AnalyticsError> {
    cache.load()?.ok_or(AnalyticsError::NoData)
}

impl From<&CachedCsv> for CsvUpload {
    fn from(cached: &CachedCsv) -> Self {
        CsvUpload::new(cached.file_name.clone(), cached.content.clone())
    }
}

/// Read a `{"item": number}` object into (item, rounded value) pairs, in order
pub(crate) fn item_predictions(
    document: &Value,
    view: &'static str,
) -> Result<Vec<(String, i64)>, AnalyticsError> {
    let predictions = document
        .get("predictions")
        .and_then(Value::as_object)
        .ok_or_else(|| AnalyticsError::Shape {
            view,
            message: "missing `predictions` object".to_string(),
        })?;

    predictions
        .iter()
        .map(|(name, value)| {
            value
                .as_f64()
                .map(|v| (name.clone(), v.round() as i64))
                .ok_or_else(|| AnalyticsError::Shape {
                    view,
                    message: format!("prediction for `{}` is not a number: {}", name, value),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_predictions_keep_order_and_round() {
        let doc = json!({"predictions": {"Samosa": 12.6, "Chai": 40, "Biryani": 7.4}});
        let pairs = item_predictions(&doc, "forecast").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("Samosa".to_string(), 13),
                ("Chai".to_string(), 40),
                ("Biryani".to_string(), 7)
            ]
        );
    }

    #[test]
    fn test_item_predictions_reject_bad_shapes() {
        assert!(matches!(
            item_predictions(&json!({}), "forecast").unwrap_err(),
            AnalyticsError::Shape { .. }
        ));
        let err = item_predictions(&json!({"predictions": {"Chai": "lots"}}), "forecast")
            .unwrap_err();
        assert!(err.to_string().contains("`Chai` is not a number"));
    }

    #[test]
    fn test_load_inventory_reports_missing_data() {
        let cache = CsvCache::open_in_memory().unwrap();
        let err = load_inventory(&cache).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No inventory data found in local storage or data has expired"
        );

        cache.store("sales.csv", "a\n1\n").unwrap();
        assert_eq!(load_inventory(&cache).unwrap().file_name, "sales.csv");
    }
}
