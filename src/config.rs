//! Configuration management
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `FORECAST__SECTION__KEY` environment variables (a `.env` file is honoured).

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub forest: ForestConfig,
    #[serde(default)]
    pub sequence: SequenceConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
}

/// Regression backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Bagged regression trees
    #[default]
    Forest,
    /// Ridge autoregression over a window of recent feature rows
    Sequence,
}

/// What the regressor is fitted against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    /// Next-step price relative to the current price (`next / price - 1`)
    #[default]
    Relative,
    /// Raw next-step price
    Absolute,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub target_mode: TargetMode,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Forest,
            target_mode: TargetMode::Relative,
        }
    }
}

/// Random forest hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    /// Seed for bootstrap sampling
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_n_estimators() -> usize {
    100
}

fn default_max_depth() -> usize {
    10
}

fn default_min_samples_split() -> usize {
    2
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_seed() -> u64 {
    42
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            seed: default_seed(),
        }
    }
}

/// Sequence backend hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceConfig {
    /// Number of feature rows fed per prediction
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    /// L2 penalty on the coefficients
    #[serde(default = "default_ridge_lambda")]
    pub ridge_lambda: f64,
}

fn default_lookback() -> usize {
    10
}

fn default_ridge_lambda() -> f64 {
    1e-3
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            lookback: default_lookback(),
            ridge_lambda: default_ridge_lambda(),
        }
    }
}

/// Train/evaluate thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_min_train_rows")]
    pub min_train_rows: usize,
    /// Leading share of rows used for fitting; the rest is the test tail
    #[serde(default = "default_train_fraction")]
    pub train_fraction: f64,
    #[serde(default = "default_min_eval_rows")]
    pub min_eval_rows: usize,
}

fn default_min_train_rows() -> usize {
    20
}

fn default_train_fraction() -> f64 {
    0.8
}

fn default_min_eval_rows() -> usize {
    5
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            min_train_rows: default_min_train_rows(),
            train_fraction: default_train_fraction(),
            min_eval_rows: default_min_eval_rows(),
        }
    }
}

/// Moving-average crossover windows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_short_window")]
    pub short_window: usize,
    #[serde(default = "default_long_window")]
    pub long_window: usize,
}

fn default_short_window() -> usize {
    5
}

fn default_long_window() -> usize {
    20
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            short_window: default_short_window(),
            long_window: default_long_window(),
        }
    }
}

impl ForecastConfig {
    /// Load configuration from file and environment. A missing file is not an error.
    pub fn load(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = PathBuf::from(shellexpand::tilde(path).into_owned());
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("FORECAST")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
