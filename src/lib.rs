//! Crop recommendation service: validates soil and climate readings, scales
//! them with a fitted min-max scaler and ranks crops with a random forest.

pub mod config;
pub mod crops;
pub mod error;
pub mod forest;
pub mod model;
pub mod predictor;
pub mod sample;
pub mod scaler;
pub mod server;
pub mod state;
pub mod store;
pub mod trainer;

pub use config::{ConfigError, ServiceConfig, TrainingConfig};
pub use crops::{CropLabel, CROP_NAMES, N_CLASSES};
pub use error::ServiceError;
pub use forest::{ForestParams, RandomForest};
pub use model::{Classifier, FeatureScaler};
pub use predictor::{Alternative, PredictionResult, Predictor};
pub use sample::{SoilReading, SoilSample, ValidationError, FIELD_BOUNDS};
pub use scaler::MinMaxScaler;
pub use server::router;
pub use state::ServiceContext;
pub use store::{Artifacts, ModelStore, StoreError};
