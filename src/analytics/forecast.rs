//! Demand forecast: predicted quantity per item over the next N days

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{item_predictions, AnalyticsError};
use crate::core::cache::CachedCsv;
use crate::service::{primary_output, CsvUpload, PredictionService};

pub const DEFAULT_DAYS: i64 = 30;
pub const MAX_DAYS: i64 = 365;

/// One point of the forecast line chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastPoint {
    pub name: String,
    pub prediction: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastMetadata {
    pub prediction_period: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Forecast {
    pub days: i64,
    pub metadata: ForecastMetadata,
    pub points: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn total(&self) -> i64 {
        self.points.iter().map(|p| p.prediction).sum()
    }
}

/// Check a horizon before sending it
pub fn validate_days(days: i64) -> Result<i64, AnalyticsError> {
    if days <= 0 {
        Err(AnalyticsError::InvalidInput(
            "Number of days must be greater than 0".to_string(),
        ))
    } else if days > MAX_DAYS {
        Err(AnalyticsError::InvalidInput(
            "Prediction period cannot exceed 365 days".to_string(),
        ))
    } else {
        Ok(days)
    }
}

/// Request a forecast for the cached file
pub fn run(
    service: &dyn PredictionService,
    csv: &CachedCsv,
    days: i64,
) -> Result<Forecast, AnalyticsError> {
    let days = validate_days(days)?;
    tracing::debug!(file = %csv.file_name, days, "requesting demand forecast");

    let outputs = service.predict(&CsvUpload::from(csv), &[json!(days)])?;
    from_document(days, &primary_output(outputs)?)
}

pub fn from_document(days: i64, document: &Value) -> Result<Forecast, AnalyticsError> {
    let metadata = document
        .get("metadata")
        .filter(|m| !m.is_null())
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| AnalyticsError::Shape {
            view: "forecast",
            message: e.to_string(),
        })?
        .unwrap_or_default();

    let points = item_predictions(document, "forecast")?
        .into_iter()
        .map(|(name, prediction)| ForecastPoint { name, prediction })
        .collect();

    Ok(Forecast {
        days,
        metadata,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::stub::StubService;
    use chrono::Utc;

    fn cached() -> CachedCsv {
        CachedCsv {
            file_name: "sales.csv".to_string(),
            content: "date,time,item_name,quantity\n01-10-2024,12:00:00,Chai,3\n".to_string(),
            stored_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_days_bounds() {
        assert_eq!(validate_days(1).unwrap(), 1);
        assert_eq!(validate_days(365).unwrap(), 365);
        assert_eq!(
            validate_days(0).unwrap_err().to_string(),
            "Number of days must be greater than 0"
        );
        assert_eq!(
            validate_days(366).unwrap_err().to_string(),
            "Prediction period cannot exceed 365 days"
        );
    }

    #[test]
    fn test_run_sends_days_and_maps_points() {
        let service = StubService::returning(json!({
            "metadata": {
                "prediction_period": "14 days",
                "start_date": "2024-10-02",
                "end_date": "2024-10-15"
            },
            "predictions": {"Chai": 120, "Samosa": 45.5}
        }));

        let forecast = run(&service, &cached(), 14).unwrap();

        let calls = service.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "sales.csv");
        assert_eq!(calls[0].1, vec![json!(14)]);

        assert_eq!(forecast.metadata.prediction_period.as_deref(), Some("14 days"));
        assert_eq!(
            forecast.points,
            vec![
                ForecastPoint { name: "Chai".into(), prediction: 120 },
                ForecastPoint { name: "Samosa".into(), prediction: 46 },
            ]
        );
        assert_eq!(forecast.total(), 166);
    }

    #[test]
    fn test_run_rejects_days_without_calling_service() {
        let service = StubService::returning(json!({}));
        assert!(run(&service, &cached(), 0).is_err());
        assert!(service.calls.borrow().is_empty());
    }

    #[test]
    fn test_service_error_payload_is_surfaced() {
        let service = StubService::returning(json!({"error": "time data '2024/10/01' does not match format"}));
        let err = run(&service, &cached(), 30).unwrap_err();
        assert_eq!(err.to_string(), "time data '2024/10/01' does not match format");
    }

    #[test]
    fn test_missing_metadata_is_tolerated() {
        let forecast = from_document(7, &json!({"predictions": {}})).unwrap();
        assert_eq!(forecast.metadata, ForecastMetadata::default());
        assert!(forecast.points.is_empty());
    }
}
