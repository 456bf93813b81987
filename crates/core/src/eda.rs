//! Descriptive statistics over headline tables.

use crate::error::AnalysisError;
use crate::frame::FrameExt;
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeMap;

pub const LEN_CHARS: &str = "headline_len_chars";
pub const LEN_WORDS: &str = "headline_len_words";

const ARTICLES: &str = "articles";

/// Returns a copy of `news` with character and word counts of `field`.
pub fn add_headline_length(news: &DataFrame, field: &str) -> Result<DataFrame, AnalysisError> {
    let text = news.require_text(field)?;

    let chars: Vec<Option<i64>> = text
        .into_iter()
        .map(|t| t.map(|s| s.chars().count() as i64))
        .collect();
    let words: Vec<Option<i64>> = text
        .into_iter()
        .map(|t| t.map(|s| s.split_whitespace().count() as i64))
        .collect();

    let mut out = news.clone();
    out.with_column(Column::new(LEN_CHARS.into(), chars))?;
    out.with_column(Column::new(LEN_WORDS.into(), words))?;
    Ok(out)
}

/// Articles per publisher, most active first; ties by name.
pub fn publisher_counts(
    news: &DataFrame,
    field: &str,
) -> Result<Vec<(String, usize)>, AnalysisError> {
    news.require_text(field)?;

    let counts = news
        .clone()
        .lazy()
        .filter(col(field).is_not_null())
        .group_by([col(field)])
        .agg([len().cast(DataType::UInt64).alias(ARTICLES)])
        .sort_by_exprs(
            [col(ARTICLES), col(field)],
            SortMultipleOptions::default()
                .with_order_descending_multi([true, false])
                .with_maintain_order(true),
        )
        .collect()?;

    let names = counts.require_text(field)?;
    let articles = counts.require(ARTICLES)?.as_materialized_series().u64()?;
    Ok(names
        .into_iter()
        .zip(articles)
        .filter_map(|(name, n)| Some((name?.to_string(), n? as usize)))
        .collect())
}

/// Articles per calendar day between the first and last dated article, with quiet days
/// present as zero.
pub fn articles_per_day(
    news: &DataFrame,
    date_field: &str,
) -> Result<BTreeMap<NaiveDate, usize>, AnalysisError> {
    let mut out: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for day in news.calendar_dates(date_field)?.into_iter().flatten() {
        *out.entry(day).or_default() += 1;
    }

    let span = match (out.keys().next(), out.keys().next_back()) {
        (Some(&first), Some(&last)) => Some((first, last)),
        _ => None,
    };
    if let Some((first, last)) = span {
        for day in first.iter_days().take_while(|d| *d <= last) {
            out.entry(day).or_insert(0);
        }
    }
    Ok(out)
}
