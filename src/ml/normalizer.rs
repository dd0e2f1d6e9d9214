//! Min-max feature scaling

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Stored parameters do not match the width of the input
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Normalizer fitted on {expected} columns, input has {got}")]
pub struct TransformMismatch {
    pub expected: usize,
    pub got: usize,
}

/// Scales every column to [0, 1] using the min and max seen at fit time.
/// Constant columns are shifted by their min and left unscaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    min: Vec<f64>,
    scale: Vec<f64>,
}

impl Normalizer {
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let mut min = vec![f64::INFINITY; width];
        let mut max = vec![f64::NEG_INFINITY; width];

        for row in rows {
            for (j, &v) in row.iter().enumerate().take(width) {
                if v.is_finite() {
                    min[j] = min[j].min(v);
                    max[j] = max[j].max(v);
                }
            }
        }

        let (min, scale) = min
            .into_iter()
            .zip(max)
            .map(|(lo, hi)| {
                if !lo.is_finite() {
                    (0.0, 1.0)
                } else if hi > lo {
                    (lo, 1.0 / (hi - lo))
                } else {
                    (lo, 1.0)
                }
            })
            .unzip();

        Self { min, scale }
    }

    pub fn fit_transform(rows: &[Vec<f64>]) -> (Self, Vec<Vec<f64>>) {
        let normalizer = Self::fit(rows);
        let scaled = rows.iter().map(|r| normalizer.scale_row(r)).collect();
        (normalizer, scaled)
    }

    pub fn width(&self) -> usize {
        self.min.len()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, TransformMismatch> {
        if let Some(row) = rows.iter().find(|r| r.len() != self.width()) {
            return Err(TransformMismatch {
                expected: self.width(),
                got: row.len(),
            });
        }
        Ok(rows.iter().map(|r| self.scale_row(r)).collect())
    }

    fn scale_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.min.iter().zip(&self.scale))
            .map(|(v, (lo, s))| (v - lo) * s)
            .collect()
    }
}

/// Apply `normalizer`, refitting on `rows` when the widths disagree.
/// Rows projected onto the model schema always match; a mismatch means the
/// normalizer and schema of a `FittedModel` were assembled inconsistently.
pub fn scale_or_refit(normalizer: &Normalizer, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    match normalizer.transform(rows) {
        Ok(scaled) => scaled,
        Err(mismatch) => {
            warn!("Scaler transform failed: {}. Refitting on current input", mismatch);
            Normalizer::fit_transform(rows).1
        }
    }
}

/// Replace NaN and infinities with zero, returning how many were replaced
pub fn sanitize(rows: &mut [Vec<f64>]) -> usize {
    let mut replaced = 0;
    for v in rows.iter_mut().flat_map(|r| r.iter_mut()) {
        if !v.is_finite() {
            *v = 0.0;
            replaced += 1;
        }
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_scales_to_unit_range() {
        let rows = vec![vec![0.0, 10.0], vec![5.0, 20.0], vec![10.0, 30.0]];
        let (normalizer, scaled) = Normalizer::fit_transform(&rows);
        assert_eq!(normalizer.width(), 2);
        assert_eq!(scaled[0], vec![0.0, 0.0]);
        assert_eq!(scaled[1], vec![0.5, 0.5]);
        assert_eq!(scaled[2], vec![1.0, 1.0]);
    }

    #[test]
    fn test_constant_column_is_shifted() {
        let rows = vec![vec![3.0], vec![3.0]];
        let normalizer = Normalizer::fit(&rows);
        assert_eq!(normalizer.transform(&[vec![4.0]]).unwrap(), vec![vec![1.0]]);
    }

    #[test]
    fn test_out_of_range_values_extrapolate() {
        let normalizer = Normalizer::fit(&[vec![0.0], vec![2.0]]);
        assert_eq!(normalizer.transform(&[vec![4.0]]).unwrap(), vec![vec![2.0]]);
    }

    #[test]
    fn test_width_mismatch() {
        let normalizer = Normalizer::fit(&[vec![0.0, 1.0], vec![1.0, 2.0]]);
        let err = normalizer.transform(&[vec![1.0]]).unwrap_err();
        assert_eq!(err, TransformMismatch { expected: 2, got: 1 });
    }

    #[test]
    fn test_scale_or_refit_recovers() {
        let normalizer = Normalizer::fit(&[vec![0.0, 1.0], vec![1.0, 2.0]]);
        let rows = vec![vec![2.0], vec![4.0]];
        let scaled = scale_or_refit(&normalizer, &rows);
        assert_eq!(scaled, vec![vec![0.0], vec![1.0]]);
    }

    #[test]
    fn test_sanitize() {
        let mut rows = vec![vec![f64::NAN, 1.0], vec![f64::INFINITY, f64::NEG_INFINITY]];
        assert_eq!(sanitize(&mut rows), 3);
        assert_eq!(rows, vec![vec![0.0, 1.0], vec![0.0, 0.0]]);
    }
}
