//! Row-level headline scoring. The model itself lives in an external crate; this module
//! only annotates tables with its numeric output.

pub mod vader;

pub use vader::VaderScorer;

use crate::analysis::sentiment::group_means;
use crate::error::AnalysisError;
use crate::frame::{ColumnKind, FrameExt};
use polars::prelude::{Column, DataFrame};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    /// Tone in [-1, 1].
    pub polarity: f64,
    /// Opinionated share of the text in [0, 1].
    pub subjectivity: f64,
}

impl SentimentScore {
    pub const NEUTRAL: SentimentScore = SentimentScore {
        polarity: 0.0,
        subjectivity: 0.0,
    };
}

pub trait SentimentScorer: Send + Sync {
    fn scorer_name(&self) -> &'static str;

    fn score(&self, text: &str) -> SentimentScore;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringFields {
    pub text: String,
    pub polarity: String,
    pub subjectivity: String,
    pub date: String,
    pub instrument: String,
}

impl Default for ScoringFields {
    fn default() -> Self {
        Self {
            text: "headline".to_string(),
            polarity: "sentiment_polarity".to_string(),
            subjectivity: "sentiment_subjectivity".to_string(),
            date: "date".to_string(),
            instrument: "stock".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreAggregation {
    /// Row-level scores.
    #[default]
    None,
    /// Mean scores per calendar date.
    Date,
    /// Mean scores per (calendar date, instrument).
    DateInstrument,
}

/// Returns a copy of `news` with polarity and subjectivity columns. Null text is scored
/// as empty text.
pub fn score_headlines(
    news: &DataFrame,
    scorer: &dyn SentimentScorer,
    fields: &ScoringFields,
) -> Result<DataFrame, AnalysisError> {
    let text = news.require_text(&fields.text)?;

    let scores: Vec<SentimentScore> = text
        .into_iter()
        .map(|t| scorer.score(t.unwrap_or_default()))
        .collect();

    let polarity: Vec<f64> = scores.iter().map(|s| s.polarity).collect();
    let subjectivity: Vec<f64> = scores.iter().map(|s| s.subjectivity).collect();

    let mut out = news.clone();
    out.with_column(Column::new(fields.polarity.as_str().into(), polarity))?;
    out.with_column(Column::new(fields.subjectivity.as_str().into(), subjectivity))?;

    tracing::debug!(
        scorer = scorer.scorer_name(),
        rows = out.height(),
        "scored headlines"
    );
    Ok(out)
}

/// Scores headlines and optionally averages both scores per date or per
/// (date, instrument).
pub fn score_and_aggregate(
    news: &DataFrame,
    scorer: &dyn SentimentScorer,
    fields: &ScoringFields,
    aggregation: ScoreAggregation,
) -> Result<DataFrame, AnalysisError> {
    let instrument = match aggregation {
        ScoreAggregation::None => return score_headlines(news, scorer, fields),
        ScoreAggregation::Date => None,
        ScoreAggregation::DateInstrument => {
            news.require_text(&fields.instrument)?;
            Some(fields.instrument.as_str())
        }
    };
    news.require_kind(&fields.date, ColumnKind::Date)?;

    let scored = score_headlines(news, scorer, fields)?;
    group_means(
        &scored,
        &fields.date,
        instrument,
        &fields.date,
        &[
            (fields.polarity.as_str(), fields.polarity.as_str()),
            (fields.subjectivity.as_str(), fields.subjectivity.as_str()),
        ],
    )
}
