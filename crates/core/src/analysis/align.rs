use crate::analysis::fields::AlignFields;
use crate::error::AnalysisError;
use crate::frame::{ColumnKind, FrameExt};
use polars::prelude::*;

const LEFT_ROW: &str = "__left_row";
const RIGHT_ROW: &str = "__right_row";
const JOIN_KEY: &str = "__join_key";

/// Inner-joins `left` and `right` on calendar-date equality.
///
/// Time-of-day and offsets are dropped from both keys, never converted. The join key is
/// written once as `fields.output_date`, followed by the remaining left columns and then
/// the remaining right columns; a clash between non-key names gets a `_left`/`_right`
/// suffix. Rows come out in left order, and in right order within one left row.
///
/// With `fields.require_complete`, joined rows carrying a null or non-finite value in
/// any numeric column are dropped.
pub fn align(
    left: &DataFrame,
    right: &DataFrame,
    fields: &AlignFields,
) -> Result<DataFrame, AnalysisError> {
    left.require_kind(&fields.left_date, ColumnKind::Date)?;
    right.require_kind(&fields.right_date, ColumnKind::Date)?;

    let left_rest = rest(left, &fields.left_date);
    let right_rest = rest(right, &fields.right_date);

    let mut output = vec![col(JOIN_KEY).alias(fields.output_date.as_str())];
    let mut complete = Vec::new();

    let mut left_cols = vec![col(LEFT_ROW), date_key(&fields.left_date)];
    for (name, dtype) in &left_rest {
        let out = side_name(name, "left", &fields.output_date, &right_rest);
        left_cols.push(col(*name).alias(out.as_str()));
        output.push(col(out.as_str()));
        complete.extend(is_complete(&out, dtype));
    }
    let mut right_cols = vec![col(RIGHT_ROW), date_key(&fields.right_date)];
    for (name, dtype) in &right_rest {
        let out = side_name(name, "right", &fields.output_date, &left_rest);
        right_cols.push(col(*name).alias(out.as_str()));
        output.push(col(out.as_str()));
        complete.extend(is_complete(&out, dtype));
    }

    let lhs = left.clone().lazy().with_row_index(LEFT_ROW, None).select(left_cols);
    let rhs = right.clone().lazy().with_row_index(RIGHT_ROW, None).select(right_cols);

    let joined = lhs
        .join(
            rhs,
            [col(JOIN_KEY)],
            [col(JOIN_KEY)],
            JoinArgs::new(JoinType::Inner),
        )
        .sort_by_exprs(
            [col(LEFT_ROW), col(RIGHT_ROW)],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .select(output)
        .collect()?;

    let matched = joined.height();
    let out = match complete.into_iter().reduce(Expr::and) {
        Some(predicate) if fields.require_complete => joined.lazy().filter(predicate).collect()?,
        _ => joined,
    };

    tracing::debug!(
        left_rows = left.height(),
        right_rows = right.height(),
        matched,
        kept = out.height(),
        "aligned tables on calendar date"
    );
    Ok(out)
}

fn rest<'a>(df: &'a DataFrame, date: &str) -> Vec<(&'a str, DataType)> {
    df.get_columns()
        .iter()
        .filter(|c| c.name().as_str() != date)
        .map(|c| (c.name().as_str(), c.dtype().clone()))
        .collect()
}

fn date_key(date: &str) -> Expr {
    col(date).cast(DataType::Date).alias(JOIN_KEY)
}

fn side_name(name: &str, side: &str, output_date: &str, others: &[(&str, DataType)]) -> String {
    if name == output_date || others.iter().any(|(other, _)| *other == name) {
        format!("{name}_{side}")
    } else {
        name.to_string()
    }
}

fn is_complete(name: &str, dtype: &DataType) -> Option<Expr> {
    match ColumnKind::of(dtype) {
        ColumnKind::Float => Some(col(name).is_finite()),
        ColumnKind::Integer => Some(col(name).is_not_null()),
        _ => None,
    }
}
