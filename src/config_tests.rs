//! Tests for configuration

#[cfg(test)]
mod tests {
    use super::super::config::*;
    use std::io::Write;

    #[test]
    fn test_forest_config_default() {
        let config = ForestConfig::default();
        assert_eq!(config.n_estimators, 100);
        assert_eq!(config.max_depth, 10);
        assert_eq!(config.min_samples_split, 2);
        assert_eq!(config.min_samples_leaf, 1);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.min_train_rows, 20);
        assert_eq!(config.train_fraction, 0.8);
        assert_eq!(config.min_eval_rows, 5);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: ForecastConfig = toml::from_str("").unwrap();
        assert_eq!(config.model.backend, Backend::Forest);
        assert_eq!(config.model.target_mode, TargetMode::Relative);
        assert_eq!(config.sequence.lookback, 10);
        assert_eq!(config.sequence.ridge_lambda, 1e-3);
        assert_eq!(config.strategy.short_window, 5);
        assert_eq!(config.strategy.long_window, 20);
    }

    #[test]
    fn test_partial_override() {
        let config: ForecastConfig = toml::from_str(
            r#"
            [model]
            backend = "sequence"
            target_mode = "absolute"

            [forest]
            n_estimators = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.model.backend, Backend::Sequence);
        assert_eq!(config.model.target_mode, TargetMode::Absolute);
        assert_eq!(config.forest.n_estimators, 25);
        assert_eq!(config.forest.max_depth, 10);
        assert_eq!(config.training.min_train_rows, 20);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result: Result<ForecastConfig, _> = toml::from_str("[model]\nbackend = \"lstm\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[training]\nmin_train_rows = 50\ntrain_fraction = 0.7").unwrap();

        let config = ForecastConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.training.min_train_rows, 50);
        assert_eq!(config.training.train_fraction, 0.7);
        assert_eq!(config.forest.seed, 42);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = ForecastConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.forest.n_estimators, 100);
    }
}
