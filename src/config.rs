use std::{env, net::SocketAddr, path::PathBuf};

use thiserror::Error;

use crate::forest::ForestParams;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Parameters of the synthetic fallback trainer.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub n_samples: usize,
    /// Share of rows held out from fitting and used for scoring.
    pub test_fraction: f64,
    pub seed: u64,
    pub forest: ForestParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_samples: 1000,
            test_fraction: 0.2,
            seed: 42,
            forest: ForestParams::default(),
        }
    }
}

impl TrainingConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.forest.seed = seed;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub model_dir: PathBuf,
    pub training: TrainingConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_dir: PathBuf::from("model"),
            training: TrainingConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Reads `HOST`, `PORT`, `MODEL_DIR` and `TRAIN_SEED`, keeping defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(host) = lookup("HOST") {
            cfg.host = host;
        }
        if let Some(port) = lookup("PORT") {
            cfg.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue { var: "PORT", value: port })?;
        }
        if let Some(dir) = lookup("MODEL_DIR") {
            cfg.model_dir = PathBuf::from(dir);
        }
        if let Some(seed) = lookup("TRAIN_SEED") {
            let parsed = seed
                .parse()
                .map_err(|_| ConfigError::InvalidValue { var: "TRAIN_SEED", value: seed })?;
            cfg.training = cfg.training.with_seed(parsed);
        }

        Ok(cfg)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|_| ConfigError::InvalidValue { var: "HOST", value: self.host.clone() })
    }
}
