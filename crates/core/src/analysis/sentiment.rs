use crate::analysis::fields::SentimentFields;
use crate::error::AnalysisError;
use crate::frame::{ColumnKind, FrameExt};
use polars::prelude::*;

/// Averages per-article scores into one row per calendar day, or per
/// (day, instrument) when `fields.by_instrument` is set and the instrument field exists.
///
/// Days are taken in the zone each timestamp already carries. Output is ordered by
/// (date, instrument). Rows with unparseable dates are skipped, as are rows with a
/// null instrument when grouping by instrument. Null and non-finite scores do not count
/// towards the mean; a group with no usable score gets a null average.
pub fn aggregate_sentiment(
    news: &DataFrame,
    fields: &SentimentFields,
) -> Result<DataFrame, AnalysisError> {
    news.require_kind(&fields.date, ColumnKind::Date)?;
    news.require_floats(&fields.score)?;

    let instrument = if fields.by_instrument && news.has_column(&fields.instrument) {
        news.require_text(&fields.instrument)?;
        Some(fields.instrument.as_str())
    } else {
        if fields.by_instrument {
            tracing::debug!(
                field = %fields.instrument,
                "instrument field absent; aggregating by date only"
            );
        }
        None
    };

    let out = group_means(
        news,
        &fields.date,
        instrument,
        &fields.output_date,
        &[(fields.score.as_str(), fields.output.as_str())],
    )?;

    tracing::debug!(
        input_rows = news.height(),
        groups = out.height(),
        "aggregated daily sentiment"
    );
    Ok(out)
}

/// Groups by calendar day (and instrument) and averages each `(score, output)` pair.
/// Field presence and types are checked by the caller.
pub(crate) fn group_means(
    news: &DataFrame,
    date: &str,
    instrument: Option<&str>,
    output_date: &str,
    scores: &[(&str, &str)],
) -> Result<DataFrame, AnalysisError> {
    let mut keep = col(date).is_not_null();
    let mut keys = vec![col(date).dt().date().alias(output_date)];
    let mut order = vec![col(output_date)];
    if let Some(inst) = instrument {
        keep = keep.and(col(inst).is_not_null());
        keys.push(col(inst));
        order.push(col(inst));
    }

    let means: Vec<Expr> = scores
        .iter()
        .map(|&(score, output)| {
            when(col(score).is_finite())
                .then(col(score))
                .otherwise(lit(NULL))
                .mean()
                .alias(output)
        })
        .collect();

    Ok(news
        .clone()
        .lazy()
        .filter(keep)
        .group_by(keys)
        .agg(means)
        .sort_by_exprs(order, SortMultipleOptions::default().with_maintain_order(true))
        .collect()?)
}
