use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::ServiceError;
use crate::predictor::{PredictionResult, Predictor};
use crate::sample::SoilSample;

/// Shared handle to the predictor. Starts empty and becomes ready once a
/// predictor is installed; it is never replaced afterwards.
#[derive(Clone, Default)]
pub struct ServiceContext {
    predictor: Arc<OnceCell<Predictor>>,
}

impl ServiceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ready(predictor: Predictor) -> Self {
        let ctx = Self::new();
        ctx.install(predictor);
        ctx
    }

    /// Returns false when a predictor was already installed.
    pub fn install(&self, predictor: Predictor) -> bool {
        self.predictor.set(predictor).is_ok()
    }

    pub fn is_ready(&self) -> bool {
        self.predictor.get().is_some()
    }

    pub fn predictor(&self) -> Result<&Predictor, ServiceError> {
        self.predictor.get().ok_or(ServiceError::ServiceUnavailable)
    }

    pub fn predict(&self, sample: &SoilSample) -> Result<PredictionResult, ServiceError> {
        self.predictor()?.predict(sample)
    }
}
