//! Error types for the forecasting pipeline

use thiserror::Error;

/// Errors raised by regression backends
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Empty training set")]
    EmptyInput,

    #[error("Invalid input shape: expected {expected} columns, got {got}")]
    InvalidShape { expected: usize, got: usize },

    #[error("Feature and target lengths differ: {features} rows vs {targets} targets")]
    LengthMismatch { features: usize, targets: usize },

    #[error("Model has not been fitted")]
    NotFitted,

    #[error("Singular system while solving for coefficients")]
    Singular,
}

/// Main error type
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Data error: {0}")]
    Data(String),

    #[error("Insufficient data: need at least {needed} rows, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Model not trained yet. Call train() first.")]
    NotTrained,

    #[error("Feature schema mismatch: column '{0}' missing from input")]
    SchemaMismatch(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ForecastError>;
