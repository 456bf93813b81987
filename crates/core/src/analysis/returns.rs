use crate::analysis::fields::ReturnsFields;
use crate::error::AnalysisError;
use crate::frame::{sort_by_date, FrameExt};
use polars::prelude::*;

/// Sorts a copy of `prices` by date and adds `fields.output` with the simple return
/// `(close[t] - close[t-1]) / close[t-1]`.
///
/// The first dated row has a null return. Rows with unparseable dates are moved to the
/// end, get a null return and do not interrupt the chain between their dated
/// neighbours. A null close nulls its own return and the next one. A zero previous
/// close follows IEEE division (`inf`, or `NaN` for `0/0`).
pub fn compute_returns(
    prices: &DataFrame,
    fields: &ReturnsFields,
) -> Result<DataFrame, AnalysisError> {
    prices.require_floats(&fields.close)?;
    let sorted = sort_by_date(prices, &fields.date)?;
    let undated = sorted.unparseable_dates(&fields.date)?;

    let close = col(fields.close.as_str());
    let prev = close.clone().shift(lit(1));
    let ret = (close - prev.clone()) / prev;

    let out = sorted
        .lazy()
        .with_column(
            when(col(fields.date.as_str()).is_not_null())
                .then(ret)
                .otherwise(lit(NULL).cast(DataType::Float64))
                .alias(fields.output.as_str()),
        )
        .collect()?;

    tracing::debug!(rows = out.height(), undated, "computed daily returns");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::testing::*;

    fn prices(dates_raw: &[&str], closes: &[Option<f64>]) -> DataFrame {
        frame(vec![dates("Date", dates_raw), floats("Close", closes)])
    }

    fn returns_of(df: &DataFrame) -> Vec<Option<f64>> {
        floats_of(df, "daily_return")
    }

    fn assert_close(a: Option<f64>, b: f64) {
        let a = a.expect("expected a return");
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn first_return_is_null_and_rest_are_pct_change() {
        let t = prices(
            &["2024-01-01", "2024-01-02", "2024-01-03"],
            &[Some(100.0), Some(102.0), Some(101.0)],
        );
        let out = compute_returns(&t, &ReturnsFields::default()).unwrap();
        let r = returns_of(&out);

        assert_eq!(r[0], None);
        assert_close(r[1], 0.02);
        assert_close(r[2], (101.0 - 102.0) / 102.0);
        assert!((r[2].unwrap() + 0.0098).abs() < 1e-4);
    }

    #[test]
    fn sorts_a_copy_by_date() {
        let t = prices(
            &["2024-01-03", "2024-01-01", "2024-01-02"],
            &[Some(110.0), Some(100.0), Some(105.0)],
        );
        let out = compute_returns(&t, &ReturnsFields::default()).unwrap();

        assert_eq!(
            floats_of(&out, "Close"),
            vec![Some(100.0), Some(105.0), Some(110.0)]
        );
        let r = returns_of(&out);
        assert_eq!(r[0], None);
        assert_close(r[1], 0.05);
        assert_close(r[2], 5.0 / 105.0);

        // Input is untouched.
        assert_eq!(
            floats_of(&t, "Close"),
            vec![Some(110.0), Some(100.0), Some(105.0)]
        );
        assert!(!t.has_column("daily_return"));
    }

    #[test]
    fn missing_close_column_fails_before_work() {
        let t = frame(vec![dates("Date", &["2024-01-01"])]);
        let err = compute_returns(&t, &ReturnsFields::default()).unwrap_err();
        assert_eq!(err, AnalysisError::missing("Close"));

        let fields = ReturnsFields {
            close: "Adj Close".to_string(),
            ..ReturnsFields::default()
        };
        let t = prices(&["2024-01-01"], &[Some(1.0)]);
        assert_eq!(
            compute_returns(&t, &fields).unwrap_err(),
            AnalysisError::missing("Adj Close")
        );
    }

    #[test]
    fn zero_previous_close_follows_ieee_division() {
        let t = prices(
            &["2024-01-01", "2024-01-02", "2024-01-03"],
            &[Some(0.0), Some(5.0), Some(5.0)],
        );
        let r = returns_of(&compute_returns(&t, &ReturnsFields::default()).unwrap());
        assert_eq!(r[1], Some(f64::INFINITY));
        assert_close(r[2], 0.0);

        let t = prices(&["2024-01-01", "2024-01-02"], &[Some(0.0), Some(0.0)]);
        let r = returns_of(&compute_returns(&t, &ReturnsFields::default()).unwrap());
        assert!(r[1].unwrap().is_nan());
    }

    #[test]
    fn null_close_breaks_only_adjacent_returns() {
        let t = prices(
            &["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04"],
            &[Some(100.0), None, Some(50.0), Some(55.0)],
        );
        let r = returns_of(&compute_returns(&t, &ReturnsFields::default()).unwrap());
        assert!(r[..3].iter().all(Option::is_none));
        assert_close(r[3], 0.1);
    }

    #[test]
    fn unparseable_dates_go_last_without_breaking_the_chain() {
        let t = prices(
            &["2024-01-01", "n/a", "2024-01-02"],
            &[Some(100.0), Some(1.0), Some(110.0)],
        );
        let out = compute_returns(&t, &ReturnsFields::default()).unwrap();
        assert_eq!(
            floats_of(&out, "Close"),
            vec![Some(100.0), Some(110.0), Some(1.0)]
        );
        let r = returns_of(&out);
        assert_close(r[1], 0.1);
        assert_eq!(r[2], None);
        assert_eq!(out.unparseable_dates("Date").unwrap(), 1);
    }
}
