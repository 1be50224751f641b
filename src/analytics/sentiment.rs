//! Review sentiment distribution
//!
//! Reviews come from the `Review` column of a CSV. They are labelled either
//! by the remote sentiment service or by a local keyword classifier, then
//! summarised as counts and pie slices.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::AnalyticsError;
use crate::core::csv::CsvTable;
use crate::service::{primary_output, CsvUpload, PredictionService};

pub const REVIEW_COLUMN: &str = "Review";
const LABEL_FIELD: &str = "Predicted_Sentiment";

const POSITIVE_KEYWORDS: [&str; 6] = ["good", "great", "excellent", "delicious", "love", "amazing"];
const NEGATIVE_KEYWORDS: [&str; 6] = [
    "bad",
    "poor",
    "terrible",
    "horrible",
    "hate",
    "disappointing",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Unknown,
}

impl Sentiment {
    /// Map a service label; anything unrecognised is `Unknown`
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            "neutral" => Sentiment::Neutral,
            _ => Sentiment::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
            Sentiment::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Label a review by which keyword list it matches more of
pub fn classify(review: &str) -> Sentiment {
    let text = review.to_lowercase();
    let positive = POSITIVE_KEYWORDS.iter().filter(|k| text.contains(*k)).count();
    let negative = NEGATIVE_KEYWORDS.iter().filter(|k| text.contains(*k)).count();

    if positive > negative {
        Sentiment::Positive
    } else if negative > positive {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewVerdict {
    pub review: String,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PieSlice {
    pub name: &'static str,
    pub value: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub unknown: usize,
}

impl SentimentCounts {
    pub fn tally<'a>(labels: impl IntoIterator<Item = &'a Sentiment>) -> Self {
        let mut counts = Self::default();
        for label in labels {
            match label {
                Sentiment::Positive => counts.positive += 1,
                Sentiment::Negative => counts.negative += 1,
                Sentiment::Neutral => counts.neutral += 1,
                Sentiment::Unknown => counts.unknown += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral + self.unknown
    }

    /// Chart slices for the three known labels, skipping empty ones
    pub fn slices(&self) -> Vec<PieSlice> {
        [
            ("Positive", self.positive),
            ("Negative", self.negative),
            ("Neutral", self.neutral),
        ]
        .into_iter()
        .filter(|(_, value)| *value > 0)
        .map(|(name, value)| PieSlice { name, value })
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentimentSummary {
    pub counts: SentimentCounts,
    pub slices: Vec<PieSlice>,
    pub reviews: Vec<ReviewVerdict>,
}

impl SentimentSummary {
    pub fn from_verdicts(reviews: Vec<ReviewVerdict>) -> Self {
        let counts = SentimentCounts::tally(reviews.iter().map(|r| &r.sentiment));
        let slices = counts.slices();
        Self {
            counts,
            slices,
            reviews,
        }
    }
}

/// Classify every review locally
pub fn analyze_local(table: &CsvTable) -> Result<SentimentSummary, AnalyticsError> {
    let reviews = table.column(REVIEW_COLUMN).ok_or_else(missing_review_column)?;
    let verdicts = reviews
        .into_iter()
        .map(|review| ReviewVerdict {
            sentiment: classify(review),
            review: review.to_string(),
        })
        .collect();
    Ok(SentimentSummary::from_verdicts(verdicts))
}

/// Send the file to the sentiment service and summarise its labels
pub fn analyze_remote(
    service: &dyn PredictionService,
    upload: &CsvUpload,
    table: &CsvTable,
) -> Result<SentimentSummary, AnalyticsError> {
    if table.column(REVIEW_COLUMN).is_none() {
        return Err(missing_review_column());
    }
    tracing::debug!(file = %upload.file_name, rows = table.len(), "requesting sentiment labels");

    let outputs = service.predict(upload, &[])?;
    from_document(&primary_output(outputs)?)
}

pub fn from_document(document: &Value) -> Result<SentimentSummary, AnalyticsError> {
    let rows = document.as_array().ok_or_else(|| AnalyticsError::Shape {
        view: "sentiment",
        message: "expected an array of labelled rows".to_string(),
    })?;

    let verdicts = rows
        .iter()
        .map(|row| ReviewVerdict {
            review: match row.get(REVIEW_COLUMN) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            },
            sentiment: row
                .get(LABEL_FIELD)
                .and_then(Value::as_str)
                .map(Sentiment::from_label)
                .unwrap_or(Sentiment::Unknown),
        })
        .collect();

    Ok(SentimentSummary::from_verdicts(verdicts))
}

fn missing_review_column() -> AnalyticsError {
    AnalyticsError::InvalidInput(format!(
        "CSV file must contain a '{}' column",
        REVIEW_COLUMN
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::csv;
    use crate::service::stub::StubService;
    use serde_json::json;

    #[test]
    fn test_classify_keywords() {
        assert_eq!(classify("The biryani was DELICIOUS"), Sentiment::Positive);
        assert_eq!(classify("Terrible service, cold food"), Sentiment::Negative);
        assert_eq!(classify("It was fine"), Sentiment::Neutral);
        // one hit each
        assert_eq!(classify("good food but bad service"), Sentiment::Neutral);
        // substring match
        assert_eq!(classify("goodness me, lovely"), Sentiment::Positive);
        // each keyword counts once however often it appears
        assert_eq!(
            classify("bad bad bad, but great and amazing"),
            Sentiment::Positive
        );
    }

    #[test]
    fn test_analyze_local_counts_and_slices() {
        let table = csv::parse(
            "Review,Rating\n\
             Great chai,5\n\
             \"Poor, disappointing samosa\",1\n\
             Loved it,5\n\
             ,3\n",
        )
        .unwrap();

        let summary = analyze_local(&table).unwrap();
        assert_eq!(
            summary.counts,
            SentimentCounts {
                positive: 2,
                negative: 1,
                neutral: 1,
                unknown: 0
            }
        );
        assert_eq!(summary.counts.total(), 4);
        assert_eq!(summary.reviews[1].review, "Poor, disappointing samosa");
        assert_eq!(summary.slices.len(), 3);
    }

    #[test]
    fn test_zero_slices_are_dropped() {
        let counts = SentimentCounts {
            positive: 3,
            negative: 0,
            neutral: 1,
            unknown: 2,
        };
        assert_eq!(
            counts.slices(),
            vec![
                PieSlice { name: "Positive", value: 3 },
                PieSlice { name: "Neutral", value: 1 },
            ]
        );
    }

    #[test]
    fn test_review_column_is_required() {
        let table = csv::parse("Comment\nnice\n").unwrap();
        let err = analyze_local(&table).unwrap_err();
        assert_eq!(err.to_string(), "CSV file must contain a 'Review' column");

        let service = StubService::returning(json!([]));
        let upload = CsvUpload::new("r.csv", "Comment\nnice\n");
        assert!(analyze_remote(&service, &upload, &table).is_err());
        assert!(service.calls.borrow().is_empty());
    }

    #[test]
    fn test_analyze_remote_reads_string_output() {
        let rows = json!([
            {"Review": "Great food", "Predicted_Sentiment": "Positive"},
            {"Review": "meh", "Predicted_Sentiment": "Neutral"},
            {"Review": null, "Predicted_Sentiment": "Unknown"},
            {"Review": "Awful", "Predicted_Sentiment": "Negative"},
            {"Review": "??"}
        ]);
        let service = StubService::returning(Value::String(rows.to_string()));
        let content = "Review\nGreat food\nmeh\n\nAwful\n??\n";
        let table = csv::parse(content).unwrap();

        let summary = analyze_remote(&service, &CsvUpload::new("r.csv", content), &table).unwrap();

        assert_eq!(
            summary.counts,
            SentimentCounts {
                positive: 1,
                negative: 1,
                neutral: 1,
                unknown: 2
            }
        );
        assert_eq!(summary.reviews[2].review, "");
        assert_eq!(summary.slices.len(), 3);
    }

    #[test]
    fn test_remote_error_payload() {
        let service = StubService::returning(Value::String(
            json!({"error": "An error occurred: bad file"}).to_string(),
        ));
        let table = csv::parse("Review\nok\n").unwrap();
        let err = analyze_remote(&service, &CsvUpload::new("r.csv", "Review\nok\n"), &table)
            .unwrap_err();
        assert_eq!(err.to_string(), "An error occurred: bad file");
    }

    #[test]
    fn test_label_mapping() {
        assert_eq!(Sentiment::from_label("positive"), Sentiment::Positive);
        assert_eq!(Sentiment::from_label(" Negative "), Sentiment::Negative);
        assert_eq!(Sentiment::from_label("Mixed"), Sentiment::Unknown);
    }
}
