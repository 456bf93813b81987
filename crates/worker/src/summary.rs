use anyhow::Context;
use newscorr_core::config::Settings;
use newscorr_core::eda;
use newscorr_core::frame::{parse_dates, FrameExt};
use newscorr_core::ingest::{load_news_csv, write_table_csv, NewsLoadOptions};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

pub fn run(settings: &Settings, news: &Path, top: usize, dry_run: bool) -> anyhow::Result<()> {
    let opts = NewsLoadOptions {
        tz: settings.news_tz_offset,
        ..NewsLoadOptions::default()
    };
    let news = load_news_csv(news, &opts)?;

    let with_lengths = eda::add_headline_length(&news, "headline").context("headline lengths")?;
    let publishers = eda::publisher_counts(&news, "publisher").context("publisher counts")?;
    let per_day = eda::articles_per_day(&news, &opts.date_field).context("articles per day")?;

    let (mean_chars, mean_words) = mean_lengths(&with_lengths)?;
    tracing::info!(
        articles = news.height(),
        publishers = publishers.len(),
        days = per_day.len(),
        mean_chars,
        mean_words,
        "headline summary"
    );
    for (rank, (publisher, count)) in publishers.iter().take(top).enumerate() {
        tracing::info!(rank = rank + 1, %publisher, count, "top publisher");
    }

    if dry_run {
        return Ok(());
    }

    let out_dir = settings.interim_dir();
    write_table_csv(&out_dir.join("headline_lengths.csv"), &with_lengths)?;
    write_table_csv(
        &out_dir.join("publisher_counts.csv"),
        &publisher_table(&publishers)?,
    )?;
    write_table_csv(&out_dir.join("articles_per_day.csv"), &per_day_table(&per_day)?)?;
    tracing::info!(dir = %out_dir.display(), "wrote headline summary");
    Ok(())
}

fn publisher_table(counts: &[(String, usize)]) -> anyhow::Result<DataFrame> {
    let names: Vec<&str> = counts.iter().map(|(p, _)| p.as_str()).collect();
    let articles: Vec<u64> = counts.iter().map(|(_, n)| *n as u64).collect();
    Ok(DataFrame::new(vec![
        Column::new("publisher".into(), names),
        Column::new("articles".into(), articles),
    ])?)
}

fn per_day_table(per_day: &BTreeMap<chrono::NaiveDate, usize>) -> anyhow::Result<DataFrame> {
    let days: Vec<String> = per_day.keys().map(|d| d.to_string()).collect();
    let days = parse_dates("date", days.iter().map(|d| Some(d.as_str())), None)?;
    let articles: Vec<u64> = per_day.values().map(|n| *n as u64).collect();
    Ok(DataFrame::new(vec![
        days.cast(&DataType::Date)?,
        Column::new("articles".into(), articles),
    ])?)
}

fn mean_lengths(df: &DataFrame) -> anyhow::Result<(f64, f64)> {
    let mean = |field: &str| -> anyhow::Result<f64> {
        let lengths = df.require(field)?.as_materialized_series().i64()?;
        Ok(lengths.mean().unwrap_or(0.0))
    };
    Ok((mean(eda::LEN_CHARS)?, mean(eda::LEN_WORDS)?))
}
