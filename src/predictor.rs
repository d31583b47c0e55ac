use std::sync::Arc;

use anyhow::{bail, ensure, Result};
use serde::Serialize;

use crate::crops::{CropLabel, N_CLASSES};
use crate::error::ServiceError;
use crate::model::{Classifier, FeatureScaler};
use crate::sample::SoilSample;
use crate::store::Artifacts;

const N_ALTERNATIVES: usize = 3;
const PROBABILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alternative {
    pub crop: &'static str,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    #[serde(skip)]
    pub label: CropLabel,
    pub prediction: &'static str,
    /// Probability of the top class as a percentage.
    pub confidence: f64,
    /// The three most probable classes, highest first.
    pub alternatives: Vec<Alternative>,
    pub success: bool,
}

/// Scales a sample, runs the classifier and ranks the classes.
#[derive(Clone)]
pub struct Predictor {
    model: Arc<dyn Classifier>,
    scaler: Arc<dyn FeatureScaler>,
}

impl Predictor {
    pub fn new(model: Arc<dyn Classifier>, scaler: Arc<dyn FeatureScaler>) -> Self {
        Self { model, scaler }
    }

    pub fn from_artifacts(artifacts: Artifacts) -> Self {
        Self::new(Arc::new(artifacts.model), Arc::new(artifacts.scaler))
    }

    pub fn predict(&self, sample: &SoilSample) -> Result<PredictionResult, ServiceError> {
        self.infer(sample)
            .map_err(|e| ServiceError::PredictionFailed(format!("{:#}", e)))
    }

    fn infer(&self, sample: &SoilSample) -> Result<PredictionResult> {
        let scaled = self.scaler.transform(&sample.features())?;
        let probs = self.model.predict_proba(&scaled)?;
        check_distribution(&probs)?;

        let ranked = rank(&probs);
        let label = CropLabel::new(ranked[0])
            .ok_or_else(|| anyhow::anyhow!("class index {} has no crop name", ranked[0]))?;
        let alternatives = ranked
            .iter()
            .take(N_ALTERNATIVES)
            .filter_map(|&i| CropLabel::new(i).map(|l| (l, probs[i])))
            .map(|(l, p)| Alternative {
                crop: l.name(),
                confidence: p * 100.0,
            })
            .collect();

        Ok(PredictionResult {
            label,
            prediction: label.name(),
            confidence: probs[ranked[0]] * 100.0,
            alternatives,
            success: true,
        })
    }
}

fn check_distribution(probs: &[f64]) -> Result<()> {
    ensure!(
        probs.len() == N_CLASSES,
        "classifier returned {} probabilities, expected {}",
        probs.len(),
        N_CLASSES
    );
    if let Some((i, p)) = probs
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p < -PROBABILITY_TOLERANCE || **p > 1.0 + PROBABILITY_TOLERANCE)
    {
        bail!("probability for class {} is out of range: {}", i, p);
    }
    let total: f64 = probs.iter().sum();
    ensure!(
        (total - 1.0).abs() <= PROBABILITY_TOLERANCE,
        "class probabilities sum to {}, expected 1",
        total
    );
    Ok(())
}

/// Class indices by descending probability; equal probabilities keep label order.
fn rank(probs: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..probs.len()).collect();
    idx.sort_by(|&a, &b| probs[b].total_cmp(&probs[a]));
    idx
}
