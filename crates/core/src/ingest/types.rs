use crate::analysis::{ReturnsFields, SentimentFields};
use crate::error::AnalysisError;
use crate::frame::parse_dates;
use chrono::FixedOffset;
use polars::prelude::{Column, DataFrame};
use serde::{Deserialize, Serialize};

/// One scored article, as posted to the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsRecord {
    pub date: String,
    #[serde(alias = "sentiment_polarity")]
    pub sentiment_score: Option<f64>,
    #[serde(default, alias = "stock")]
    pub instrument: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: String,
    #[serde(alias = "Close")]
    pub close: Option<f64>,
}

/// Builds a news frame whose column names follow `fields`. The instrument column is
/// only present when at least one record carries an instrument.
pub fn news_table(
    records: &[NewsRecord],
    fields: &SentimentFields,
    tz: Option<FixedOffset>,
) -> Result<DataFrame, AnalysisError> {
    let dates = parse_dates(
        &fields.date,
        records.iter().map(|r| Some(r.date.as_str())),
        tz,
    )?;
    let scores: Vec<Option<f64>> = records.iter().map(|r| r.sentiment_score).collect();

    let mut columns = vec![dates, Column::new(fields.score.as_str().into(), scores)];
    if records.iter().any(|r| r.instrument.is_some()) {
        let instruments: Vec<Option<&str>> =
            records.iter().map(|r| r.instrument.as_deref()).collect();
        columns.push(Column::new(fields.instrument.as_str().into(), instruments));
    }
    Ok(DataFrame::new(columns)?)
}

pub fn price_table(
    records: &[PriceRecord],
    fields: &ReturnsFields,
) -> Result<DataFrame, AnalysisError> {
    let dates = parse_dates(
        &fields.date,
        records.iter().map(|r| Some(r.date.as_str())),
        None,
    )?;
    let closes: Vec<Option<f64>> = records.iter().map(|r| r.close).collect();
    Ok(DataFrame::new(vec![
        dates,
        Column::new(fields.close.as_str().into(), closes),
    ])?)
}
