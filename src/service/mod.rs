//! Clients for the external prediction services
//!
//! Each analytics view sends the cached CSV, plus a few view-specific
//! parameters, to a black-box service and gets back a JSON document. The
//! `PredictionService` trait is the seam between the views and the
//! transport; `GradioClient` speaks the Gradio HTTP API.

mod gradio;

pub use gradio::{parse_event_stream, GradioClient};

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while talking to a prediction service
#[derive(Debug, Error, Diagnostic)]
pub enum ServiceError {
    #[error("Failed to reach prediction service at {url}: {message}")]
    #[diagnostic(
        code(dineflow::service::unreachable),
        help("check that the service is running and the URL in `dineflow config show` is right")
    )]
    Unreachable { url: String, message: String },

    #[error("Prediction service returned HTTP {status} for {url}: {body}")]
    #[diagnostic(code(dineflow::service::http))]
    Http {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected response from prediction service: {0}")]
    #[diagnostic(code(dineflow::service::protocol))]
    Protocol(String),

    #[error("Prediction failed: {0}")]
    #[diagnostic(code(dineflow::service::remote))]
    Remote(String),

    #[error("{0}")]
    #[diagnostic(code(dineflow::service::rejected))]
    Rejected(String),
}

/// CSV text presented to a service as an uploaded file
#[derive(Debug, Clone)]
pub struct CsvUpload {
    pub file_name: String,
    pub content: String,
}

impl CsvUpload {
    pub fn new(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// A service that turns an uploaded CSV and parameters into JSON outputs
pub trait PredictionService {
    /// Submit the file followed by `params`; returns the service's output list
    fn predict(&self, upload: &CsvUpload, params: &[Value]) -> Result<Vec<Value>, ServiceError>;
}

/// Extract the first output as a JSON document
///
/// Outputs that arrive as a JSON string are decoded, and an object carrying
/// an `"error"` key becomes `ServiceError::Rejected`.
pub fn primary_output(outputs: Vec<Value>) -> Result<Value, ServiceError> {
    let first = outputs
        .into_iter()
        .next()
        .ok_or_else(|| ServiceError::Protocol("service returned no outputs".to_string()))?;

    let document = match first {
        Value::String(text) => serde_json::from_str(&text).map_err(|e| {
            ServiceError::Protocol(format!("output is a string but not JSON: {}", e))
        })?,
        Value::Null => {
            return Err(ServiceError::Protocol("service returned an empty output".to_string()))
        }
        other => other,
    };

    if let Some(message) = document.get("error") {
        let message = match message {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(ServiceError::Rejected(message));
    }

    Ok(document)
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primary_output_returns_first_document() {
        let doc = primary_output(vec![json!({"predictions": {}}), json!(null)]).unwrap();
        assert_eq!(doc, json!({"predictions": {}}));
    }

    #[test]
    fn test_primary_output_decodes_json_strings() {
        let doc = primary_output(vec![json!("[{\"Review\": \"ok\"}]")]).unwrap();
        assert_eq!(doc, json!([{"Review": "ok"}]));
    }

    #[test]
    fn test_primary_output_surfaces_error_payloads() {
        let err = primary_output(vec![json!({"error": "Number of days must be greater than 0"})])
            .unwrap_err();
        assert!(matches!(err, ServiceError::Rejected(_)));
        assert_eq!(err.to_string(), "Number of days must be greater than 0");

        let err = primary_output(vec![json!("{\"error\": \"CSV file must contain a 'Review' column\"}")])
            .unwrap_err();
        assert_eq!(err.to_string(), "CSV file must contain a 'Review' column");
    }

    #[test]
    fn test_primary_output_rejects_empty() {
        assert!(matches!(
            primary_output(vec![]).unwrap_err(),
            ServiceError::Protocol(_)
        ));
        assert!(matches!(
            primary_output(vec![json!(null)]).unwrap_err(),
            ServiceError::Protocol(_)
        ));
        assert!(matches!(
            primary_output(vec![json!("not json")]).unwrap_err(),
            ServiceError::Protocol(_)
        ));
    }
}
