use crate::analysis::CorrelationResult;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Error,
}

/// Row accounting for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    pub news_rows: usize,
    pub news_unparseable_dates: usize,
    pub price_rows: usize,
    pub price_unparseable_dates: usize,
    pub daily_sentiment_rows: usize,
    pub return_rows: usize,
    pub aligned_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub status: RunStatus,
    pub instrument: Option<String>,
    pub counts: StageCounts,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub result: Option<CorrelationResult>,
    pub error: Option<String>,
}

impl CorrelationReport {
    pub fn success(
        instrument: Option<String>,
        counts: StageCounts,
        span: Option<(NaiveDate, NaiveDate)>,
        result: CorrelationResult,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            status: RunStatus::Success,
            instrument,
            counts,
            first_date: span.map(|s| s.0),
            last_date: span.map(|s| s.1),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(instrument: Option<String>, error: &anyhow::Error) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            status: RunStatus::Error,
            instrument,
            counts: StageCounts::default(),
            first_date: None,
            last_date: None,
            result: None,
            error: Some(format!("{error:#}")),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}
