use anyhow::Context;
use newscorr_core::config::Settings;
use newscorr_core::indicators::{
    add_macd, add_moving_averages, add_rsi, MacdSettings, DEFAULT_RSI_PERIOD, DEFAULT_SMA_WINDOWS,
};
use newscorr_core::ingest::{load_prices_csv, write_table_csv, PriceLoadOptions};
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};

/// Adds SMA, RSI and MACD columns to a price CSV and writes the result next to the
/// other processed outputs as `indicators_<stem>.csv`.
pub fn run(
    settings: &Settings,
    prices: &Path,
    close_field: &str,
    dry_run: bool,
) -> anyhow::Result<()> {
    let df = load_prices_csv(prices, &PriceLoadOptions::default())?;
    let out = with_indicators(&df, close_field)?;

    tracing::info!(
        rows = out.height(),
        columns = out.width(),
        close = close_field,
        "computed technical indicators"
    );
    if dry_run {
        return Ok(());
    }

    let path = output_path(settings, prices);
    write_table_csv(&path, &out)?;
    tracing::info!(path = %path.display(), "wrote technical indicators");
    Ok(())
}

fn with_indicators(prices: &DataFrame, close: &str) -> anyhow::Result<DataFrame> {
    let out = add_moving_averages(prices, close, &DEFAULT_SMA_WINDOWS).context("moving averages")?;
    let out = add_rsi(&out, close, DEFAULT_RSI_PERIOD, None).context("rsi")?;
    let out = add_macd(&out, close, &MacdSettings::default()).context("macd")?;
    Ok(out)
}

fn output_path(settings: &Settings, prices: &Path) -> PathBuf {
    let stem = prices
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "prices".to_string());
    settings.processed_dir().join(format!("indicators_{stem}.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use newscorr_core::frame::FrameExt;

    fn write_prices(dir: &Path, rows: usize) -> PathBuf {
        let mut body = String::from("Date,Close\n");
        for i in 0..rows {
            let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                + chrono::Duration::days(i as i64);
            body.push_str(&format!("{day},{}\n", 100.0 + i as f64));
        }
        let path = dir.join("AAPL.csv");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn writes_every_indicator_column() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings::with_data_dir(tmp.path());
        settings.ensure_data_dirs().unwrap();
        let prices = write_prices(tmp.path(), 60);

        run(&settings, &prices, "Close", false).unwrap();

        let out = settings.processed_dir().join("indicators_AAPL.csv");
        let header = std::fs::read_to_string(&out).unwrap();
        let header = header.lines().next().unwrap();
        assert_eq!(
            header,
            "Date,Close,SMA_5,SMA_20,SMA_50,RSI_14,MACD,MACD_signal,MACD_hist"
        );
    }

    #[test]
    fn unknown_close_field_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let prices = write_prices(tmp.path(), 3);
        let df = load_prices_csv(&prices, &PriceLoadOptions::default()).unwrap();
        assert!(df.has_column("Close"));
        let err = with_indicators(&df, "Adj Close").unwrap_err();
        assert!(format!("{err:#}").contains("Adj Close"));
    }
}
