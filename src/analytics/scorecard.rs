//! Model scorecard: accuracy and reliability of the sales model per item

use std::fmt;

use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;

use super::AnalyticsError;
use crate::core::cache::CachedCsv;
use crate::service::{primary_output, CsvUpload, PredictionService};

/// Score at which an item's model counts as good
pub const GOOD_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
            Timeframe::Monthly => "monthly",
        }
    }

    fn metrics_key(&self) -> String {
        format!("{}_metrics", self.as_str())
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Good,
    Poor,
}

impl Grade {
    pub fn for_score(score: f64) -> Self {
        if score >= GOOD_THRESHOLD {
            Grade::Good
        } else {
            Grade::Poor
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Good => write!(f, "good"),
            Grade::Poor => write!(f, "poor"),
        }
    }
}

/// One scorecard row, rounded to display precision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRow {
    pub item: String,
    pub accuracy: f64,
    pub reliability: f64,
    pub max_metric: f64,
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
    pub mape: f64,
    pub grade: Grade,
}

impl ScoreRow {
    /// Build a row from a `{mae, rmse, r2, mape}` object
    pub fn from_metrics(item: &str, metrics: Option<&Value>) -> Self {
        let field = |name: &str| metrics.and_then(|m| m.get(name)).and_then(finite);

        let accuracy = field("r2")
            .map(|r2| round_to((r2 + 1.0) * 50.0, 1).clamp(0.0, 100.0))
            .unwrap_or(0.0);
        let reliability = field("mape")
            .map(|mape| round_to(100.0 - mape, 1).clamp(0.0, 100.0))
            .unwrap_or(0.0);
        let max_metric = accuracy.max(reliability);

        Self {
            item: item.to_string(),
            accuracy,
            reliability,
            max_metric,
            mae: round_to(field("mae").unwrap_or(0.0), 3),
            rmse: round_to(field("rmse").unwrap_or(0.0), 3),
            r2: round_to(field("r2").unwrap_or(0.0), 3),
            mape: round_to(field("mape").unwrap_or(0.0), 1),
            grade: Grade::for_score(max_metric),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scorecard {
    pub timeframe: Timeframe,
    pub analysis_timestamp: Option<String>,
    pub rows: Vec<ScoreRow>,
}

impl Scorecard {
    pub fn good_count(&self) -> usize {
        self.rows.iter().filter(|r| r.grade == Grade::Good).count()
    }
}

pub fn run(
    service: &dyn PredictionService,
    csv: &CachedCsv,
    timeframe: Timeframe,
) -> Result<Scorecard, AnalyticsError> {
    tracing::debug!(file = %csv.file_name, %timeframe, "requesting scorecard");

    let outputs = service.predict(&CsvUpload::from(csv), &[])?;
    from_document(timeframe, &primary_output(outputs)?)
}

pub fn from_document(timeframe: Timeframe, document: &Value) -> Result<Scorecard, AnalyticsError> {
    let performance = document
        .get("item_performance")
        .and_then(Value::as_object)
        .ok_or_else(|| AnalyticsError::Shape {
            view: "scorecard",
            message: "missing `item_performance` object".to_string(),
        })?;

    let key = timeframe.metrics_key();
    let rows = performance
        .iter()
        .map(|(item, perf)| ScoreRow::from_metrics(item, perf.get(&key)))
        .collect();

    Ok(Scorecard {
        timeframe,
        analysis_timestamp: document
            .get("analysis_timestamp")
            .and_then(Value::as_str)
            .map(str::to_string),
        rows,
    })
}

fn finite(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::stub::StubService;
    use chrono::Utc;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "analysis_timestamp": "2024-10-01 09:30:00",
            "overall_summary": {},
            "item_performance": {
                "Chai": {
                    "daily_metrics": {"mae": 1.23456, "rmse": 2.0, "r2": 0.5, "mape": 12.34},
                    "weekly_metrics": {"mae": 4.0, "rmse": 5.0, "r2": -0.2, "mape": 45.0}
                },
                "Samosa": {
                    "daily_metrics": {"mae": 3.0, "rmse": 3.5, "r2": -3.0, "mape": 250.0}
                }
            }
        })
    }

    #[test]
    fn test_accuracy_and_reliability_are_clamped() {
        let card = from_document(Timeframe::Daily, &document()).unwrap();
        assert_eq!(card.analysis_timestamp.as_deref(), Some("2024-10-01 09:30:00"));

        let chai = &card.rows[0];
        assert_eq!(chai.item, "Chai");
        assert_eq!(chai.accuracy, 75.0);
        assert_eq!(chai.reliability, 87.7);
        assert_eq!(chai.max_metric, 87.7);
        assert_eq!(chai.mae, 1.235);
        assert_eq!(chai.mape, 12.3);
        assert_eq!(chai.grade, Grade::Good);

        let samosa = &card.rows[1];
        assert_eq!(samosa.accuracy, 0.0);
        assert_eq!(samosa.reliability, 0.0);
        assert_eq!(samosa.grade, Grade::Poor);
        assert_eq!(card.good_count(), 1);
    }

    #[test]
    fn test_timeframe_selects_metrics_block() {
        let card = from_document(Timeframe::Weekly, &document()).unwrap();
        assert_eq!(card.rows[0].accuracy, 40.0);
        assert_eq!(card.rows[0].reliability, 55.0);
        assert_eq!(card.rows[0].grade, Grade::Poor);

        // no weekly block for Samosa
        let samosa = &card.rows[1];
        assert_eq!((samosa.accuracy, samosa.reliability, samosa.mae), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_missing_and_non_numeric_metrics_default_to_zero() {
        let row = ScoreRow::from_metrics(
            "Lassi",
            Some(&json!({"mae": null, "rmse": "NaN", "r2": "0.9", "mape": "oops"})),
        );
        assert_eq!(row.mae, 0.0);
        assert_eq!(row.rmse, 0.0);
        assert_eq!(row.accuracy, 95.0);
        assert_eq!(row.reliability, 0.0);
        assert_eq!(row.grade, Grade::Good);
    }

    #[test]
    fn test_max_metric_compares_numerically() {
        // "9.0" > "10.0" as strings; numerically 10 wins
        let row = ScoreRow::from_metrics("Kulfi", Some(&json!({"r2": -0.82, "mape": 90.0})));
        assert_eq!(row.accuracy, 9.0);
        assert_eq!(row.reliability, 10.0);
        assert_eq!(row.max_metric, 10.0);
    }

    #[test]
    fn test_grade_threshold_is_inclusive() {
        assert_eq!(Grade::for_score(70.0), Grade::Good);
        assert_eq!(Grade::for_score(69.9), Grade::Poor);
    }

    #[test]
    fn test_run_sends_file_only() {
        let service = StubService::returning(document());
        let csv = CachedCsv {
            file_name: "sales.csv".to_string(),
            content: "a\n1\n".to_string(),
            stored_at: Utc::now(),
        };
        let card = run(&service, &csv, Timeframe::Monthly).unwrap();
        assert!(service.calls.borrow()[0].1.is_empty());
        assert_eq!(card.timeframe, Timeframe::Monthly);
        assert_eq!(card.rows.len(), 2);
    }

    #[test]
    fn test_missing_item_performance_is_an_error() {
        let err = from_document(Timeframe::Daily, &json!({"overall_summary": {}})).unwrap_err();
        assert!(err.to_string().contains("item_performance"));
    }
}
