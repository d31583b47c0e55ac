use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::config::TrainingConfig;
use crate::crops::N_CLASSES;
use crate::forest::RandomForest;
use crate::sample::N_FEATURES;
use crate::scaler::MinMaxScaler;
use crate::trainer;

pub const MODEL_FILE: &str = "random_forest_model.json";
pub const SCALER_FILE: &str = "scaler.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact {} is unavailable: {source}", .path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("artifact {} could not be decoded: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("artifact {} does not fit the service: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
    #[error("failed to write artifact {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("training failed: {0}")]
    Training(String),
}

impl StoreError {
    /// Absent, unreadable, undecodable or mis-shaped artifacts; the trainer
    /// can recover these.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Corrupt { .. } | Self::Invalid { .. }
        )
    }
}

/// A fitted classifier and the scaler its inputs were normalized with.
#[derive(Debug)]
pub struct Artifacts {
    pub model: RandomForest,
    pub scaler: MinMaxScaler,
}

/// Artifact pair kept as JSON files in one directory.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(SCALER_FILE)
    }

    pub fn load(&self) -> Result<Artifacts, StoreError> {
        let model_path = self.model_path();
        let scaler_path = self.scaler_path();
        let model: RandomForest = read_json(&model_path)?;
        let scaler: MinMaxScaler = read_json(&scaler_path)?;

        model
            .validate(N_FEATURES, N_CLASSES)
            .map_err(|e| invalid(&model_path, e))?;
        scaler
            .validate(N_FEATURES)
            .map_err(|e| invalid(&scaler_path, e))?;
        Ok(Artifacts { model, scaler })
    }

    pub fn persist(&self, artifacts: &Artifacts) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Persist {
            path: self.dir.clone(),
            source,
        })?;
        write_json(&self.model_path(), &artifacts.model)?;
        write_json(&self.scaler_path(), &artifacts.scaler)?;
        Ok(())
    }

    /// Fits a throwaway model on synthetic data and writes it to the store.
    pub fn train_and_persist(&self, config: &TrainingConfig) -> Result<Artifacts, StoreError> {
        tracing::info!(
            "training fallback model: samples={} trees={} max_depth={} seed={}",
            config.n_samples,
            config.forest.n_estimators,
            config.forest.max_depth,
            config.seed
        );
        let trained =
            trainer::train(config).map_err(|e| StoreError::Training(format!("{:#}", e)))?;
        match trained.holdout_accuracy {
            Some(acc) => tracing::info!("hold-out accuracy {:.3} (synthetic labels)", acc),
            None => tracing::info!("no hold-out rows; skipping evaluation"),
        }

        let artifacts = Artifacts {
            model: trained.model,
            scaler: trained.scaler,
        };
        self.persist(&artifacts)?;
        tracing::info!(
            "saved model to {} and scaler to {}",
            self.model_path().display(),
            self.scaler_path().display()
        );
        Ok(artifacts)
    }

    /// Loads the stored pair, training a fallback when it is unavailable.
    pub fn load_or_train(&self, config: &TrainingConfig) -> Result<Artifacts, StoreError> {
        match self.load() {
            Ok(artifacts) => Ok(artifacts),
            Err(e) if e.is_unavailable() => {
                tracing::warn!("{}; training a new model", e);
                self.train_and_persist(config)
            }
            Err(e) => Err(e),
        }
    }
}

fn invalid(path: &Path, err: anyhow::Error) -> StoreError {
    StoreError::Invalid {
        path: path.to_path_buf(),
        reason: format!("{:#}", err),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let bytes = fs::read(path).map_err(|source| StoreError::Unavailable {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(value).map_err(|e| StoreError::Persist {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    })?;
    fs::write(path, bytes).map_err(|source| StoreError::Persist {
        path: path.to_path_buf(),
        source,
    })
}
