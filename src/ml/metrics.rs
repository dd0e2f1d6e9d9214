//! Regression metrics

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Feature name and weight pairs, highest weight first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureImportance(Vec<(String, f64)>);

impl FeatureImportance {
    /// Pair names with weights and sort descending
    pub fn ranked(names: &[String], weights: &[f64]) -> Self {
        let mut pairs: Vec<(String, f64)> = names.iter().cloned().zip(weights.iter().copied()).collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        Self(pairs)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(n, w)| (n.as_str(), *w))
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, w)| *w)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for FeatureImportance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, weight) in &self.0 {
            map.serialize_entry(name, weight)?;
        }
        map.end()
    }
}

/// Model quality on the price scale. Every score is `None` when there were
/// too few rows to compute it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    /// R² on the training partition
    pub train_score: Option<f64>,
    /// R² on the held-out (or evaluated) rows
    pub test_score: Option<f64>,
    pub mse: Option<f64>,
    pub rmse: Option<f64>,
    pub mae: Option<f64>,
    pub r2: Option<f64>,
    pub feature_importance: FeatureImportance,
}

impl Metrics {
    /// All-null metrics
    pub fn empty() -> Self {
        Self::default()
    }

    /// Error metrics of `predicted` against `actual`
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        if actual.is_empty() || actual.len() != predicted.len() {
            return Self::empty();
        }
        let mse = mean_squared_error(actual, predicted);
        let r2 = r2_score(actual, predicted);
        Self {
            train_score: None,
            test_score: Some(r2),
            mse: Some(mse),
            rmse: Some(mse.sqrt()),
            mae: Some(mean_absolute_error(actual, predicted)),
            r2: Some(r2),
            feature_importance: FeatureImportance::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.test_score.is_none() && self.mse.is_none() && self.r2.is_none()
    }
}

pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len() as f64;
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / n
}

pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len() as f64;
    actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum::<f64>() / n
}

/// Coefficient of determination. A constant `actual` scores 1.0 on a perfect
/// fit and 0.0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len() as f64;
    let mean = actual.iter().sum::<f64>() / n;
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}
