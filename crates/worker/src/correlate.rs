use anyhow::Context;
use newscorr_core::config::Settings;
use newscorr_core::ingest::{
    load_news_csv, load_prices_csv, write_table_csv, NewsLoadOptions, PriceLoadOptions,
};
use newscorr_core::pipeline::{self, PipelineConfig, PipelineRun};
use newscorr_core::scoring::{score_headlines, ScoringFields, VaderScorer};
use newscorr_core::frame::FrameExt;
use newscorr_core::storage::reports;
use polars::prelude::DataFrame;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct CorrelateJob {
    pub news: PathBuf,
    pub prices: PathBuf,
    pub instrument: Option<String>,
    pub by_instrument: bool,
    pub close_field: String,
    pub dry_run: bool,
}

impl CorrelateJob {
    fn pipeline_config(&self) -> PipelineConfig {
        let mut cfg = PipelineConfig {
            instrument: self.instrument.clone(),
            ..PipelineConfig::default()
        };
        cfg.returns.close = self.close_field.clone();
        cfg.sentiment.by_instrument = self.by_instrument;
        cfg
    }
}

pub fn run(settings: &Settings, job: CorrelateJob) -> anyhow::Result<()> {
    let cfg = job.pipeline_config();

    match execute(settings, &job, &cfg) {
        Ok(out) => {
            let report = &out.report;
            if job.dry_run {
                tracing::info!(
                    dry_run = true,
                    aligned_rows = report.counts.aligned_rows,
                    result = ?report.result,
                    "correlation run complete (dry-run)"
                );
                return Ok(());
            }

            let aligned_path = settings
                .processed_dir()
                .join(format!("aligned_{}.csv", report.run_id));
            write_table_csv(&aligned_path, &out.aligned)?;
            let daily_path = settings
                .interim_dir()
                .join(format!("daily_sentiment_{}.csv", report.run_id));
            write_table_csv(&daily_path, &out.daily_sentiment)?;

            let run_id = reports::persist_success(&settings.reports_dir(), report)?;
            tracing::info!(
                %run_id,
                aligned = %aligned_path.display(),
                "persisted correlation report"
            );
            Ok(())
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            if !job.dry_run {
                let run_id =
                    reports::persist_failure(&settings.reports_dir(), job.instrument.clone(), &err)?;
                tracing::error!(%run_id, error = %err, "correlation run failed");
            } else {
                tracing::error!(dry_run = true, error = %err, "correlation run failed");
            }
            Err(err)
        }
    }
}

fn execute(
    settings: &Settings,
    job: &CorrelateJob,
    cfg: &PipelineConfig,
) -> anyhow::Result<PipelineRun> {
    let news = load_news_csv(
        &job.news,
        &NewsLoadOptions {
            date_field: cfg.sentiment.date.clone(),
            tz: settings.news_tz_offset,
        },
    )?;
    let prices = load_prices_csv(
        &job.prices,
        &PriceLoadOptions {
            date_field: cfg.returns.date.clone(),
        },
    )?;

    let news = ensure_scored(news, cfg)?;
    pipeline::run(&news, &prices, cfg)
}

/// Raw headline files carry no score; those are scored with VADER before aggregation.
fn ensure_scored(news: DataFrame, cfg: &PipelineConfig) -> anyhow::Result<DataFrame> {
    if news.has_column(&cfg.sentiment.score) {
        return Ok(news);
    }
    let fields = ScoringFields {
        polarity: cfg.sentiment.score.clone(),
        date: cfg.sentiment.date.clone(),
        instrument: cfg.sentiment.instrument.clone(),
        ..ScoringFields::default()
    };
    if !news.has_column(&fields.text) {
        // Let the pipeline report the missing score column.
        return Ok(news);
    }

    tracing::info!(rows = news.height(), text = %fields.text, "scoring headlines");
    score_headlines(&news, &VaderScorer::new(), &fields).context("score headlines")
}

#[cfg(test)]
mod tests {
    use super::*;
    use newscorr_core::frame::parse_dates;
    use polars::prelude::Column;

    fn job() -> CorrelateJob {
        CorrelateJob {
            news: PathBuf::from("news.csv"),
            prices: PathBuf::from("prices.csv"),
            instrument: Some("AAPL".to_string()),
            by_instrument: true,
            close_field: "Adj Close".to_string(),
            dry_run: true,
        }
    }

    #[test]
    fn job_flags_flow_into_pipeline_config() {
        let cfg = job().pipeline_config();
        assert_eq!(cfg.instrument.as_deref(), Some("AAPL"));
        assert_eq!(cfg.returns.close, "Adj Close");
        assert!(cfg.sentiment.by_instrument);
        assert_eq!(cfg.returns.date, "Date");
    }

    #[test]
    fn unscored_headlines_get_a_polarity_column() {
        let news = DataFrame::new(vec![
            Column::new("headline".into(), &[Some("Great results, shares soar")]),
            parse_dates("date", [Some("2024-01-02")], None).unwrap(),
        ])
        .unwrap();
        let cfg = job().pipeline_config();

        let scored = ensure_scored(news, &cfg).unwrap();
        let polarity = scored.require_floats("sentiment_polarity").unwrap();
        assert!(polarity.get(0).unwrap() > 0.0);
        assert!(scored.has_column("sentiment_subjectivity"));
    }

    #[test]
    fn scored_tables_pass_through() {
        let news =
            DataFrame::new(vec![Column::new("sentiment_polarity".into(), &[Some(0.3)])]).unwrap();
        let out = ensure_scored(news.clone(), &PipelineConfig::default()).unwrap();
        assert!(out.equals_missing(&news));
    }
}
