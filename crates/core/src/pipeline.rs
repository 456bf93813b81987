use crate::analysis::{
    align, aggregate_sentiment, compute_returns, correlate, AlignFields, CorrelationFields,
    ReturnsFields, SentimentFields,
};
use crate::domain::report::{CorrelationReport, StageCounts};
use crate::error::AnalysisError;
use crate::frame::{filter_text_eq, FrameExt};
use anyhow::Context;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub returns: ReturnsFields,
    pub sentiment: SentimentFields,
    pub align: AlignFields,
    pub correlation: CorrelationFields,
    /// Keep only news rows whose instrument field equals this key.
    pub instrument: Option<String>,
}

/// Intermediate tables of a successful run, plus its report.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub daily_sentiment: DataFrame,
    pub returns: DataFrame,
    pub aligned: DataFrame,
    pub report: CorrelationReport,
}

/// Returns → daily sentiment → date join → Pearson. Fails atomically: any stage error
/// is returned as-is (wrapped with the stage name) and nothing else is produced.
///
/// Grouping by instrument needs `cfg.instrument` unless the news covers a single
/// instrument; otherwise every instrument's row would pair with the same daily return.
pub fn run(
    news: &DataFrame,
    prices: &DataFrame,
    cfg: &PipelineConfig,
) -> anyhow::Result<PipelineRun> {
    let mut counts = StageCounts {
        news_rows: news.height(),
        price_rows: prices.height(),
        ..StageCounts::default()
    };
    counts.news_unparseable_dates = news
        .unparseable_dates(&cfg.sentiment.date)
        .context("news table")?;
    counts.price_unparseable_dates = prices
        .unparseable_dates(&cfg.returns.date)
        .context("price table")?;

    let filtered;
    let news = match cfg.instrument.as_deref() {
        Some(inst) => {
            filtered = filter_text_eq(news, &cfg.sentiment.instrument, inst)
                .with_context(|| format!("filter news by instrument {inst}"))?;
            tracing::info!(instrument = inst, kept = filtered.height(), "filtered news");
            &filtered
        }
        None => {
            if cfg.sentiment.by_instrument {
                single_instrument(news, &cfg.sentiment.instrument)
                    .context("group news by instrument")?;
            }
            news
        }
    };

    let returns = compute_returns(prices, &cfg.returns).context("compute daily returns")?;
    counts.return_rows = returns.height();

    let daily_sentiment =
        aggregate_sentiment(news, &cfg.sentiment).context("aggregate daily sentiment")?;
    counts.daily_sentiment_rows = daily_sentiment.height();

    let aligned =
        align(&daily_sentiment, &returns, &cfg.align).context("align sentiment and returns")?;
    counts.aligned_rows = aligned.height();

    let result = correlate(&aligned, &cfg.correlation).context("correlate")?;

    let span = aligned
        .calendar_dates(&cfg.align.output_date)
        .context("aligned table")?
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<(NaiveDate, NaiveDate)>, d| match acc {
            Some((lo, hi)) => Some((std::cmp::min(lo, d), std::cmp::max(hi, d))),
            None => Some((d, d)),
        });

    tracing::info!(
        news_rows = counts.news_rows,
        price_rows = counts.price_rows,
        aligned_rows = counts.aligned_rows,
        n = result.n,
        coefficient = result.coefficient,
        p_value = result.p_value,
        "correlation run complete"
    );

    let report = CorrelationReport::success(cfg.instrument.clone(), counts, span, result);
    Ok(PipelineRun {
        daily_sentiment,
        returns,
        aligned,
        report,
    })
}

// A missing instrument field is fine here; aggregation falls back to date-only grouping.
fn single_instrument(news: &DataFrame, field: &str) -> Result<(), AnalysisError> {
    if !news.has_column(field) {
        return Ok(());
    }
    let count = news
        .require_text(field)?
        .into_iter()
        .flatten()
        .collect::<BTreeSet<_>>()
        .len();
    if count > 1 {
        return Err(AnalysisError::MultipleInstruments {
            field: field.to_string(),
            count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::testing::*;

    fn news(rows: &[(&str, f64, &str)]) -> DataFrame {
        let raw: Vec<&str> = rows.iter().map(|r| r.0).collect();
        let scores: Vec<Option<f64>> = rows.iter().map(|r| Some(r.1)).collect();
        let stocks: Vec<Option<&str>> = rows.iter().map(|r| Some(r.2)).collect();
        frame(vec![
            dates("date", &raw),
            floats("sentiment_polarity", &scores),
            texts("stock", &stocks),
        ])
    }

    fn prices(rows: &[(&str, f64)]) -> DataFrame {
        let raw: Vec<&str> = rows.iter().map(|r| r.0).collect();
        let closes: Vec<Option<f64>> = rows.iter().map(|r| Some(r.1)).collect();
        frame(vec![dates("Date", &raw), floats("Close", &closes)])
    }

    #[test]
    fn end_to_end_scenario_stops_at_insufficient_data() {
        let n = news(&[
            ("2024-01-01T09:00:00", 0.5, "AAPL"),
            ("2024-01-01T15:00:00", -0.1, "AAPL"),
            ("2024-01-02T10:00:00", 0.2, "AAPL"),
        ]);
        let p = prices(&[("2024-01-01", 100.0), ("2024-01-02", 102.0), ("2024-01-03", 101.0)]);
        let cfg = PipelineConfig::default();

        let err = run(&n, &p, &cfg).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AnalysisError>(),
            Some(&AnalysisError::InsufficientData {
                required: 3,
                found: 1
            })
        );

        // The stages themselves produce the documented intermediate tables.
        let daily = aggregate_sentiment(&n, &cfg.sentiment).unwrap();
        let avg = floats_of(&daily, "avg_sentiment");
        assert_eq!(daily.height(), 2);
        assert!((avg[0].unwrap() - 0.2).abs() < 1e-12);
        assert!((avg[1].unwrap() - 0.2).abs() < 1e-12);

        let returns = compute_returns(&p, &cfg.returns).unwrap();
        let r = floats_of(&returns, "daily_return");
        assert_eq!(r[0], None);
        assert!((r[1].unwrap() - 0.02).abs() < 1e-12);
        assert!((r[2].unwrap() + 0.0098).abs() < 1e-4);

        let aligned = align(&daily, &returns, &cfg.align).unwrap();
        assert_eq!(aligned.height(), 1);
        assert_eq!(
            aligned.calendar_dates("date").unwrap(),
            vec![Some(ymd(2024, 1, 2))]
        );
        assert!((floats_of(&aligned, "avg_sentiment")[0].unwrap() - 0.2).abs() < 1e-12);
        assert!((floats_of(&aligned, "daily_return")[0].unwrap() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn reports_counts_and_span_for_a_full_run() {
        let n = news(&[
            ("2024-01-02 09:00:00", 0.1, "AAPL"),
            ("2024-01-03 09:00:00", 0.3, "AAPL"),
            ("2024-01-03 09:00:00", 0.9, "MSFT"),
            ("2024-01-04 09:00:00", -0.2, "AAPL"),
            ("2024-01-05 09:00:00", 0.4, "AAPL"),
            ("bogus", 0.4, "AAPL"),
        ]);
        let p = prices(&[
            ("2024-01-01", 100.0),
            ("2024-01-02", 101.0),
            ("2024-01-03", 103.0),
            ("2024-01-04", 100.0),
            ("2024-01-05", 104.0),
        ]);
        let cfg = PipelineConfig {
            instrument: Some("AAPL".to_string()),
            ..PipelineConfig::default()
        };

        let out = run(&n, &p, &cfg).unwrap();
        let report = &out.report;
        assert!(report.is_success());
        assert_eq!(report.instrument.as_deref(), Some("AAPL"));
        assert_eq!(report.counts.news_rows, 6);
        assert_eq!(report.counts.news_unparseable_dates, 1);
        assert_eq!(report.counts.price_rows, 5);
        assert_eq!(report.counts.daily_sentiment_rows, 4);
        assert_eq!(report.counts.aligned_rows, 4);
        assert_eq!(report.first_date, Some(ymd(2024, 1, 2)));
        assert_eq!(report.last_date, Some(ymd(2024, 1, 5)));

        let result = report.result.unwrap();
        assert_eq!(result.n, 4);
        assert!(result.coefficient > 0.9);
        assert!((0.0..=1.0).contains(&result.p_value));
    }

    #[test]
    fn missing_columns_surface_through_anyhow() {
        let n = news(&[("2024-01-02", 0.1, "AAPL")]);
        let p = prices(&[("2024-01-02", 1.0)]);
        let cfg = PipelineConfig {
            returns: ReturnsFields {
                close: "Adj Close".to_string(),
                ..ReturnsFields::default()
            },
            ..PipelineConfig::default()
        };
        let err = run(&n, &p, &cfg).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AnalysisError>(),
            Some(&AnalysisError::missing("Adj Close"))
        );
    }

    #[test]
    fn grouping_several_instruments_needs_an_instrument_filter() {
        let n = news(&[
            ("2024-01-02 09:00:00", 0.1, "AAPL"),
            ("2024-01-02 10:00:00", 0.7, "MSFT"),
            ("2024-01-03 09:00:00", 0.3, "AAPL"),
            ("2024-01-03 10:00:00", -0.4, "MSFT"),
            ("2024-01-04 09:00:00", -0.2, "AAPL"),
            ("2024-01-04 10:00:00", 0.2, "MSFT"),
        ]);
        let p = prices(&[
            ("2024-01-01", 100.0),
            ("2024-01-02", 101.0),
            ("2024-01-03", 103.0),
            ("2024-01-04", 100.0),
        ]);
        let mut cfg = PipelineConfig::default();
        cfg.sentiment.by_instrument = true;

        let err = run(&n, &p, &cfg).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AnalysisError>(),
            Some(&AnalysisError::MultipleInstruments {
                field: "stock".into(),
                count: 2
            })
        );

        cfg.instrument = Some("AAPL".to_string());
        let out = run(&n, &p, &cfg).unwrap();
        assert_eq!(out.report.counts.aligned_rows, 3);
        assert_eq!(out.report.result.unwrap().n, 3);
    }
}
