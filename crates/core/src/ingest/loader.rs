use crate::frame::{parse_dates, sort_by_date, ColumnKind, FrameExt};
use anyhow::Context;
use chrono::FixedOffset;
use polars::prelude::*;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct NewsLoadOptions {
    pub date_field: String,
    /// Naive timestamps are localized to this offset and zoned ones converted to it.
    /// `None` keeps timestamps exactly as written.
    pub tz: Option<FixedOffset>,
}

impl Default for NewsLoadOptions {
    fn default() -> Self {
        Self {
            date_field: "date".to_string(),
            tz: FixedOffset::east_opt(0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PriceLoadOptions {
    pub date_field: String,
}

impl Default for PriceLoadOptions {
    fn default() -> Self {
        Self {
            date_field: "Date".to_string(),
        }
    }
}

/// Loads a FNSPID-style news CSV (headline, url, publisher, date, stock, ...).
pub fn load_news_csv(path: &Path, opts: &NewsLoadOptions) -> anyhow::Result<DataFrame> {
    let df = read_csv(path, &[opts.date_field.as_str()], opts.tz)?;

    tracing::info!(
        path = %path.display(),
        rows = df.height(),
        unparseable_dates = df.unparseable_dates(&opts.date_field).unwrap_or(0),
        "loaded news csv"
    );
    Ok(df)
}

/// Loads an OHLCV price CSV and sorts it by date.
pub fn load_prices_csv(path: &Path, opts: &PriceLoadOptions) -> anyhow::Result<DataFrame> {
    let mut df = read_csv_table(path, &[opts.date_field.as_str()])?;
    if df.has_column(&opts.date_field) {
        df = sort_by_date(&df, &opts.date_field)?;
    }

    tracing::info!(
        path = %path.display(),
        rows = df.height(),
        unparseable_dates = df.unparseable_dates(&opts.date_field).unwrap_or(0),
        "loaded price csv"
    );
    Ok(df)
}

/// Reads a headed CSV. Columns listed in `date_fields` are parsed into datetime columns
/// as written; integer columns are widened to `f64`; empty cells are null.
pub fn read_csv_table(path: &Path, date_fields: &[&str]) -> anyhow::Result<DataFrame> {
    read_csv(path, date_fields, None)
}

fn read_csv(
    path: &Path,
    date_fields: &[&str],
    tz: Option<FixedOffset>,
) -> anyhow::Result<DataFrame> {
    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("failed to open {}", path.display()))?
        .finish()
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut columns = Vec::with_capacity(raw.width());
    for column in raw.get_columns() {
        let name = column.name().as_str();
        let column = if date_fields.contains(&name) {
            let text = column.cast(&DataType::String)?;
            parse_dates(name, text.as_materialized_series().str()?, tz)?
        } else if ColumnKind::of(column.dtype()) == ColumnKind::Integer {
            column.cast(&DataType::Float64)?
        } else {
            column.clone()
        };
        columns.push(column);
    }
    DataFrame::new(columns).with_context(|| format!("invalid column layout in {}", path.display()))
}

/// Writes a frame as CSV; dates in ISO form, nulls as empty cells.
pub fn write_table_csv(path: &Path, df: &DataFrame) -> anyhow::Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df.clone())
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::testing::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn news_csv_types_columns_and_converts_to_utc() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_file(
            tmp.path(),
            "news.csv",
            "headline,url,publisher,date,stock\n\
             \"Stocks rally, again\",http://a,Benzinga,2020-06-05 22:30:54-04:00,A\n\
             Plain,http://b,,2020-06-05 10:00:00,A\n\
             Broken,http://c,Reuters,yesterday,AA\n",
        );

        let t = load_news_csv(&path, &NewsLoadOptions::default()).unwrap();
        assert_eq!(t.height(), 3);
        assert_eq!(
            texts_of(&t, "headline")[0].as_deref(),
            Some("Stocks rally, again")
        );
        assert_eq!(texts_of(&t, "publisher")[1], None);
        assert_eq!(t.unparseable_dates("date").unwrap(), 1);

        let dates = t.calendar_dates("date").unwrap();
        // 22:30 at -04:00 is 02:30 UTC on the 6th.
        assert_eq!(dates[0], Some(ymd(2020, 6, 6)));
        assert_eq!(dates[1], Some(ymd(2020, 6, 5)));
    }

    #[test]
    fn news_csv_without_tz_keeps_carried_offsets() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_file(
            tmp.path(),
            "news.csv",
            "date,stock\n2020-06-05 22:30:54-04:00,A\n",
        );
        let opts = NewsLoadOptions {
            tz: None,
            ..NewsLoadOptions::default()
        };
        let t = load_news_csv(&path, &opts).unwrap();
        assert_eq!(t.calendar_dates("date").unwrap(), vec![Some(ymd(2020, 6, 5))]);
    }

    #[test]
    fn prices_csv_is_numeric_and_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_file(
            tmp.path(),
            "prices.csv",
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-03,1,1,1,101.0,10\n\
             2024-01-01,1,1,1,100.0,10\n\
             2024-01-02,1,1,1,,10\n",
        );
        let t = load_prices_csv(&path, &PriceLoadOptions::default()).unwrap();
        assert_eq!(floats_of(&t, "Close"), vec![Some(100.0), None, Some(101.0)]);
        assert_eq!(floats_of(&t, "Volume"), vec![Some(10.0); 3]);
    }

    #[test]
    fn missing_file_is_an_error_with_path() {
        let err = load_prices_csv(Path::new("/nonexistent/prices.csv"), &PriceLoadOptions::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/prices.csv"));
    }

    #[test]
    fn written_tables_read_back() {
        let tmp = tempfile::tempdir().unwrap();
        let day = dates("date", &["2024-01-02"]).cast(&DataType::Date).unwrap();
        let df = frame(vec![
            day,
            floats("avg_sentiment", &[Some(0.2)]),
            floats("daily_return", &[None]),
        ]);
        let path = tmp.path().join("aligned.csv");
        write_table_csv(&path, &df).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "date,avg_sentiment,daily_return\n2024-01-02,0.2,\n");

        let back = read_csv_table(&path, &["date"]).unwrap();
        assert_eq!(floats_of(&back, "avg_sentiment"), vec![Some(0.2)]);
        assert_eq!(back.calendar_dates("date").unwrap(), vec![Some(ymd(2024, 1, 2))]);
    }
}
