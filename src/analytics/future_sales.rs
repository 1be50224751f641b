//! Future sales: predicted quantity per item for a single date

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{item_predictions, AnalyticsError};
use crate::core::cache::CachedCsv;
use crate::service::{primary_output, CsvUpload, PredictionService};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesBar {
    pub name: String,
    pub predicted_sales: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weather {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub weather_main: Option<String>,
    pub weather_description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentFactors {
    pub season_factor: Option<f64>,
    pub weather_factor: Option<f64>,
    pub holiday_factor: Option<f64>,
    pub weekend_factor: Option<f64>,
}

/// Context the service attaches to a prediction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FutureSalesMetadata {
    pub date: Option<String>,
    pub season: Option<String>,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub holiday_name: Option<String>,
    pub weather: Option<Weather>,
    pub adjustment_factors: Option<AdjustmentFactors>,
}

impl FutureSalesMetadata {
    pub fn day_kind(&self) -> &'static str {
        if self.is_weekend {
            "Weekend"
        } else {
            "Weekday"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FutureSales {
    pub date: NaiveDate,
    pub metadata: FutureSalesMetadata,
    pub bars: Vec<SalesBar>,
}

/// The date predicted when none is given
pub fn default_date(today: NaiveDate) -> NaiveDate {
    today.checked_add_days(Days::new(1)).unwrap_or(today)
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(text: &str) -> Result<NaiveDate, AnalyticsError> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).map_err(|_| {
        AnalyticsError::InvalidInput(format!(
            "Invalid prediction date '{}': expected YYYY-MM-DD",
            text
        ))
    })
}

pub fn run(
    service: &dyn PredictionService,
    csv: &CachedCsv,
    date: NaiveDate,
) -> Result<FutureSales, AnalyticsError> {
    let formatted = date.format(DATE_FORMAT).to_string();
    tracing::debug!(file = %csv.file_name, date = %formatted, "requesting future sales");

    let outputs = service.predict(&CsvUpload::from(csv), &[json!(formatted)])?;
    from_document(date, &primary_output(outputs)?)
}

pub fn from_document(date: NaiveDate, document: &Value) -> Result<FutureSales, AnalyticsError> {
    let metadata: FutureSalesMetadata = match document.get("metadata") {
        Some(Value::Null) | None => FutureSalesMetadata::default(),
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(|e| AnalyticsError::Shape {
                view: "future sales",
                message: e.to_string(),
            })?
        }
    };

    let bars = item_predictions(document, "future sales")?
        .into_iter()
        .map(|(name, predicted_sales)| SalesBar {
            name,
            predicted_sales,
        })
        .collect();

    Ok(FutureSales {
        date,
        metadata,
        bars,
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
            content: "date,item_name,quantity\n01-10-2024,Chai,3\n".to_string(),
            stored_at: Utc::now(),
        }
    }

    fn date(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_default_date_is_tomorrow() {
        assert_eq!(default_date(date("2024-12-31")), date("2025-01-01"));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-10-05").unwrap(), date("2024-10-05"));
        let err = parse_date("05-10-2024").unwrap_err();
        assert!(err.to_string().contains("expected YYYY-MM-DD"));
    }

    #[test]
    fn test_run_maps_bars_and_metadata() {
        let service = StubService::returning(json!({
            "metadata": {
                "date": "2024-10-05",
                "season": "Post-Monsoon",
                "is_weekend": true,
                "is_holiday": true,
                "holiday_name": "Navratri",
                "weather": {
                    "temperature": 29.5,
                    "humidity": 70,
                    "weather_main": "Clouds",
                    "weather_description": "broken clouds"
                },
                "adjustment_factors": {
                    "season_factor": 1.0,
                    "weather_factor": 0.95,
                    "holiday_factor": 1.3,
                    "weekend_factor": 1.2
                }
            },
            "predictions": {"Vada Pav": 88, "Chai": 140}
        }));

        let sales = run(&service, &cached(), date("2024-10-05")).unwrap();

        assert_eq!(service.calls.borrow()[0].1, vec![json!("2024-10-05")]);
        assert_eq!(sales.metadata.day_kind(), "Weekend");
        assert_eq!(sales.metadata.holiday_name.as_deref(), Some("Navratri"));
        let weather = sales.metadata.weather.as_ref().unwrap();
        assert_eq!(weather.weather_main.as_deref(), Some("Clouds"));
        assert_eq!(weather.humidity, Some(70.0));
        assert_eq!(
            sales.metadata.adjustment_factors.as_ref().unwrap().holiday_factor,
            Some(1.3)
        );
        assert_eq!(
            sales.bars,
            vec![
                SalesBar { name: "Vada Pav".into(), predicted_sales: 88 },
                SalesBar { name: "Chai".into(), predicted_sales: 140 },
            ]
        );
    }

    #[test]
    fn test_null_weather_values_are_kept_empty() {
        let sales = from_document(
            date("2024-10-07"),
            &json!({
                "metadata": {
                    "is_weekend": false,
                    "weather": {"temperature": null, "humidity": null, "weather_main": null}
                },
                "predictions": {}
            }),
        )
        .unwrap();
        assert_eq!(sales.metadata.day_kind(), "Weekday");
        assert_eq!(sales.metadata.weather, Some(Weather::default()));
    }

    #[test]
    fn test_service_failure_propagates() {
        let service = StubService::failing("connection refused");
        let err = run(&service, &cached(), date("2024-10-05")).unwrap_err();
        assert!(matches!(err, AnalyticsError::Service(_)));
    }
}
