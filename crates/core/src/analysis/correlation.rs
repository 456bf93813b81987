use crate::analysis::fields::CorrelationFields;
use crate::error::AnalysisError;
use crate::frame::FrameExt;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use statrs::function::beta::checked_beta_reg;

/// Pearson's r and its significance test are meaningless below this many pairs.
pub const MIN_PAIRS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    /// Pearson product-moment coefficient, in [-1, 1].
    pub coefficient: f64,
    /// Two-sided p-value for H0: no linear correlation, in [0, 1].
    pub p_value: f64,
    /// Number of fully populated pairs used.
    pub n: usize,
}

/// Pearson correlation between two numeric fields of an aligned table.
///
/// Pairs with a null or non-finite value on either side are dropped first. Fails with
/// `InsufficientData` below [`MIN_PAIRS`] pairs and with `ConstantInput` when either
/// side has zero variance. Each side is scaled by its largest magnitude before the
/// moments are taken, so finite inputs of any size give a finite coefficient.
pub fn correlate(
    aligned: &DataFrame,
    fields: &CorrelationFields,
) -> Result<CorrelationResult, AnalysisError> {
    let xs = aligned.require_floats(&fields.sentiment)?;
    let ys = aligned.require_floats(&fields.returns)?;

    let pairs: Vec<(f64, f64)> = xs
        .into_iter()
        .zip(ys)
        .filter_map(|pair| match pair {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
            _ => None,
        })
        .collect();

    if pairs.len() < MIN_PAIRS {
        return Err(AnalysisError::InsufficientData {
            required: MIN_PAIRS,
            found: pairs.len(),
        });
    }

    if is_constant(pairs.iter().map(|p| p.0)) {
        return Err(AnalysisError::ConstantInput {
            field: fields.sentiment.clone(),
        });
    }
    if is_constant(pairs.iter().map(|p| p.1)) {
        return Err(AnalysisError::ConstantInput {
            field: fields.returns.clone(),
        });
    }

    let xs = scaled(pairs.iter().map(|p| p.0));
    let ys = scaled(pairs.iter().map(|p| p.1));

    let n = pairs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(&ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let coefficient = cov / (var_x.sqrt() * var_y.sqrt());
    if !coefficient.is_finite() || var_x == 0.0 || var_y == 0.0 {
        return Err(AnalysisError::NonFinite {
            detail: format!("r = {coefficient}, var_x = {var_x}, var_y = {var_y}"),
        });
    }
    let coefficient = coefficient.clamp(-1.0, 1.0);
    let p_value = two_sided_p_value(coefficient, pairs.len() - 2)?;

    tracing::debug!(n = pairs.len(), coefficient, p_value, "pearson correlation");
    Ok(CorrelationResult {
        coefficient,
        p_value,
        n: pairs.len(),
    })
}

fn is_constant(mut values: impl Iterator<Item = f64>) -> bool {
    match values.next() {
        Some(first) => values.all(|v| v == first),
        None => true,
    }
}

// Divides by the largest magnitude; callers guarantee a non-constant finite series.
fn scaled(values: impl Iterator<Item = f64> + Clone) -> Vec<f64> {
    let max = values.clone().fold(0.0_f64, |m, v| m.max(v.abs()));
    values.map(|v| v / max).collect()
}

// Student-t test on t = r * sqrt(df / (1 - r^2)), written through the regularized
// incomplete beta: P(|T| >= t) = I_{df / (df + t^2)}(df / 2, 1 / 2) and
// df / (df + t^2) = 1 - r^2.
fn two_sided_p_value(r: f64, df: usize) -> Result<f64, AnalysisError> {
    let x = (1.0 - r * r).clamp(0.0, 1.0);
    if x == 0.0 {
        return Ok(0.0);
    }
    let p = checked_beta_reg(df as f64 / 2.0, 0.5, x).map_err(|e| AnalysisError::NonFinite {
        detail: format!("p-value for r = {r}: {e}"),
    })?;
    Ok(p.clamp(0.0, 1.0))
}
