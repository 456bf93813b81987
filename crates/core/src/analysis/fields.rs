//! Field-name overrides for each stage, with the defaults of the usual
//! FNSPID news / OHLCV price layouts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReturnsFields {
    pub date: String,
    pub close: String,
    pub output: String,
}

impl Default for ReturnsFields {
    fn default() -> Self {
        Self {
            date: "Date".to_string(),
            close: "Close".to_string(),
            output: "daily_return".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentFields {
    pub date: String,
    pub score: String,
    pub instrument: String,
    /// Group by instrument as well as date. Ignored when the instrument field is absent.
    pub by_instrument: bool,
    pub output_date: String,
    pub output: String,
}

impl Default for SentimentFields {
    fn default() -> Self {
        Self {
            date: "date".to_string(),
            score: "sentiment_polarity".to_string(),
            instrument: "stock".to_string(),
            by_instrument: false,
            output_date: "date".to_string(),
            output: "avg_sentiment".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignFields {
    pub left_date: String,
    pub right_date: String,
    pub output_date: String,
    /// Drop joined rows holding a null or non-finite number.
    pub require_complete: bool,
}

impl Default for AlignFields {
    fn default() -> Self {
        Self {
            left_date: "date".to_string(),
            right_date: "Date".to_string(),
            output_date: "date".to_string(),
            require_complete: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationFields {
    pub sentiment: String,
    pub returns: String,
}

impl Default for CorrelationFields {
    fn default() -> Self {
        Self {
            sentiment: "avg_sentiment".to_string(),
            returns: "daily_return".to_string(),
        }
    }
}
