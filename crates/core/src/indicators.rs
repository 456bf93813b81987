//! Technical indicators over a price frame.
//!
//! The recurrences come from the `ta` crate. Every output column has one row per input
//! row; null or non-finite closes get a null output and are not fed to the indicator, and
//! each indicator reports null until it has seen enough closes to fill its window. EMA-based
//! indicators seed on the first close rather than on an SMA of the first window.

use crate::error::AnalysisError;
use crate::frame::FrameExt;
use polars::prelude::{Column, DataFrame, Float64Chunked};
use ta::indicators::{
    MovingAverageConvergenceDivergence, RelativeStrengthIndex, SimpleMovingAverage,
};
use ta::Next;

pub const DEFAULT_CLOSE: &str = "Close";
pub const DEFAULT_SMA_WINDOWS: [usize; 3] = [5, 20, 50];
pub const DEFAULT_RSI_PERIOD: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacdSettings {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
    /// Output columns are `{prefix}`, `{prefix}_signal` and `{prefix}_hist`.
    pub prefix: String,
}

impl Default for MacdSettings {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
            prefix: "MACD".to_string(),
        }
    }
}

/// Adds one `SMA_{w}` column per window.
pub fn add_moving_averages(
    prices: &DataFrame,
    close: &str,
    windows: &[usize],
) -> Result<DataFrame, AnalysisError> {
    let closes = prices.require_floats(close)?;
    let mut out = prices.clone();
    for &w in windows {
        let mut sma =
            SimpleMovingAverage::new(w).map_err(|e| invalid(format!("SMA window {w}"), e))?;
        let values = warmed(feed(closes, |c| sma.next(c)), w, |v| v);
        out.with_column(Column::new(format!("SMA_{w}").into(), values))?;
    }
    Ok(out)
}

/// Adds the relative strength index as `col_name`, or `RSI_{period}` when unset.
pub fn add_rsi(
    prices: &DataFrame,
    close: &str,
    period: usize,
    col_name: Option<&str>,
) -> Result<DataFrame, AnalysisError> {
    let closes = prices.require_floats(close)?;
    let mut rsi = RelativeStrengthIndex::new(period)
        .map_err(|e| invalid(format!("RSI period {period}"), e))?;
    let values = warmed(feed(closes, |c| rsi.next(c)), period + 1, |v| v);

    let name = col_name.map_or_else(|| format!("RSI_{period}"), str::to_string);
    let mut out = prices.clone();
    out.with_column(Column::new(name.into(), values))?;
    Ok(out)
}

/// Adds the MACD line, its signal line and their difference.
pub fn add_macd(
    prices: &DataFrame,
    close: &str,
    settings: &MacdSettings,
) -> Result<DataFrame, AnalysisError> {
    let closes = prices.require_floats(close)?;
    if settings.fast >= settings.slow {
        return Err(AnalysisError::InvalidParameter(format!(
            "MACD fast period {} must be shorter than slow period {}",
            settings.fast, settings.slow
        )));
    }
    let mut macd = MovingAverageConvergenceDivergence::new(
        settings.fast,
        settings.slow,
        settings.signal,
    )
    .map_err(|e| {
        let periods = format!("MACD periods {}/{}/{}", settings.fast, settings.slow, settings.signal);
        invalid(periods, e)
    })?;

    let outputs = feed(closes, |c| {
        let o = macd.next(c);
        (o.macd, o.signal, o.histogram)
    });
    let line_warmup = settings.slow;
    let signal_warmup = settings.slow + settings.signal - 1;

    let prefix = &settings.prefix;
    let mut out = prices.clone();
    out.with_column(Column::new(
        prefix.as_str().into(),
        warmed(outputs.clone(), line_warmup, |o| o.0),
    ))?;
    out.with_column(Column::new(
        format!("{prefix}_signal").into(),
        warmed(outputs.clone(), signal_warmup, |o| o.1),
    ))?;
    out.with_column(Column::new(
        format!("{prefix}_hist").into(),
        warmed(outputs, signal_warmup, |o| o.2),
    ))?;
    Ok(out)
}

// Each fed value carries how many closes the indicator has seen so far.
fn feed<T>(closes: &Float64Chunked, mut step: impl FnMut(f64) -> T) -> Vec<Option<(usize, T)>> {
    let mut seen = 0;
    closes
        .into_iter()
        .map(|close| {
            let close = close.filter(|c| c.is_finite())?;
            seen += 1;
            Some((seen, step(close)))
        })
        .collect()
}

fn warmed<T>(
    fed: Vec<Option<(usize, T)>>,
    warmup: usize,
    pick: impl Fn(T) -> f64,
) -> Vec<Option<f64>> {
    fed.into_iter()
        .map(|v| v.filter(|(seen, _)| *seen >= warmup).map(|(_, o)| pick(o)))
        .collect()
}

fn invalid(what: String, err: ta::errors::TaError) -> AnalysisError {
    AnalysisError::InvalidParameter(format!("{what}: {err:?}"))
}
