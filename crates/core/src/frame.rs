//! Checked column access over polars frames.
//!
//! Stages borrow a `DataFrame`, resolve every configured field through [`FrameExt`] before
//! doing any work, and return a fresh frame. Date fields are `Datetime(µs)` columns holding
//! wall-clock time in whatever zone the source carried; a null there is a date that could
//! not be parsed.

use crate::error::AnalysisError;
use crate::time::parse_stamp;
use chrono::{DateTime, FixedOffset, NaiveDate};
use polars::prelude::*;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Date,
    Float,
    Integer,
    Text,
    Other,
}

impl ColumnKind {
    pub fn of(dtype: &DataType) -> Self {
        match dtype {
            DataType::Date | DataType::Datetime(_, _) => ColumnKind::Date,
            DataType::String => ColumnKind::Text,
            d if d.is_float() => ColumnKind::Float,
            d if d.is_integer() => ColumnKind::Integer,
            _ => ColumnKind::Other,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnKind::Date => "date",
            ColumnKind::Float => "float",
            ColumnKind::Integer => "integer",
            ColumnKind::Text => "text",
            ColumnKind::Other => "other",
        };
        f.write_str(s)
    }
}

pub fn datetime_dtype() -> DataType {
    DataType::Datetime(TimeUnit::Microseconds, None)
}

pub trait FrameExt {
    fn has_column(&self, name: &str) -> bool;

    fn require(&self, name: &str) -> Result<&Column, AnalysisError>;

    fn require_kind(&self, name: &str, kind: ColumnKind) -> Result<&Column, AnalysisError>;

    fn require_floats(&self, name: &str) -> Result<&Float64Chunked, AnalysisError>;

    fn require_text(&self, name: &str) -> Result<&StringChunked, AnalysisError>;

    /// Calendar date of every row; `None` for unparseable dates.
    fn calendar_dates(&self, name: &str) -> Result<Vec<Option<NaiveDate>>, AnalysisError>;

    /// Number of rows whose date field could not be parsed.
    fn unparseable_dates(&self, name: &str) -> Result<usize, AnalysisError>;
}

impl FrameExt for DataFrame {
    fn has_column(&self, name: &str) -> bool {
        self.get_column_index(name).is_some()
    }

    fn require(&self, name: &str) -> Result<&Column, AnalysisError> {
        self.column(name).map_err(|_| AnalysisError::missing(name))
    }

    fn require_kind(&self, name: &str, kind: ColumnKind) -> Result<&Column, AnalysisError> {
        let column = self.require(name)?;
        let found = ColumnKind::of(column.dtype());
        if found != kind {
            return Err(AnalysisError::ColumnType {
                field: name.to_string(),
                expected: kind,
                found,
            });
        }
        Ok(column)
    }

    fn require_floats(&self, name: &str) -> Result<&Float64Chunked, AnalysisError> {
        let column = self.require_kind(name, ColumnKind::Float)?;
        Ok(column.as_materialized_series().f64()?)
    }

    fn require_text(&self, name: &str) -> Result<&StringChunked, AnalysisError> {
        let column = self.require_kind(name, ColumnKind::Text)?;
        Ok(column.as_materialized_series().str()?)
    }

    fn calendar_dates(&self, name: &str) -> Result<Vec<Option<NaiveDate>>, AnalysisError> {
        let days = self
            .require_kind(name, ColumnKind::Date)?
            .cast(&DataType::Date)?
            .cast(&DataType::Int32)?;
        let days = days.as_materialized_series().i32()?;
        Ok(days.into_iter().map(|d| d.and_then(epoch_day)).collect())
    }

    fn unparseable_dates(&self, name: &str) -> Result<usize, AnalysisError> {
        Ok(self.require_kind(name, ColumnKind::Date)?.null_count())
    }
}

fn epoch_day(days: i32) -> Option<NaiveDate> {
    DateTime::from_timestamp(i64::from(days) * 86_400, 0).map(|dt| dt.date_naive())
}

/// Parses raw date text into a wall-clock datetime column. With `tz`, naive values are
/// read as local time there and zoned values are converted to it.
pub fn parse_dates<'a>(
    name: &str,
    raw: impl IntoIterator<Item = Option<&'a str>>,
    tz: Option<FixedOffset>,
) -> PolarsResult<Column> {
    let micros: Vec<Option<i64>> = raw
        .into_iter()
        .map(|cell| {
            let stamp = parse_stamp(cell?)?;
            let stamp = match tz {
                Some(tz) => stamp.localize(tz),
                None => stamp,
            };
            Some(stamp.sort_key().and_utc().timestamp_micros())
        })
        .collect();
    Ok(Series::new(name.into(), micros)
        .cast(&datetime_dtype())?
        .into_column())
}

/// Stable ascending sort on a date field; unparseable dates go last.
pub fn sort_by_date(df: &DataFrame, name: &str) -> Result<DataFrame, AnalysisError> {
    df.require_kind(name, ColumnKind::Date)?;
    Ok(df.sort(
        [name],
        SortMultipleOptions::default()
            .with_maintain_order(true)
            .with_nulls_last(true),
    )?)
}

/// Rows whose text field equals `value` exactly.
pub fn filter_text_eq(df: &DataFrame, name: &str, value: &str) -> Result<DataFrame, AnalysisError> {
    df.require_text(name)?;
    Ok(df
        .clone()
        .lazy()
        .filter(col(name).eq(lit(value)))
        .collect()?)
}
