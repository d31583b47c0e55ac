//! Synthetic-data trainer used when no artifacts are on disk.
//!
//! Labels are drawn independently of the features, so the resulting model
//! only exists to make the service runnable. Its predictions carry no
//! agronomic meaning.

use anyhow::{ensure, Context, Result};
use ndarray::{Array2, Axis};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::config::TrainingConfig;
use crate::crops::N_CLASSES;
use crate::forest::RandomForest;
use crate::sample::{FIELD_BOUNDS, N_FEATURES};
use crate::scaler::MinMaxScaler;

#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: Array2<f64>,
    pub labels: Vec<usize>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn select(&self, rows: &[usize]) -> Self {
        Self {
            features: self.features.select(Axis(0), rows),
            labels: rows.iter().map(|&r| self.labels[r]).collect(),
        }
    }
}

/// Uniform draws within each field's bounds, uniform labels in `0..N_CLASSES`.
pub fn synthetic_dataset(n_samples: usize, rng: &mut StdRng) -> Dataset {
    let mut features = Array2::zeros((n_samples, N_FEATURES));
    for (col, bounds) in FIELD_BOUNDS.iter().enumerate() {
        for row in 0..n_samples {
            features[[row, col]] = rng.random_range(bounds.min..=bounds.max);
        }
    }
    let labels = (0..n_samples).map(|_| rng.random_range(0..N_CLASSES)).collect();
    Dataset { features, labels }
}

/// Shuffled split; the test side gets `ceil(len * test_fraction)` rows.
pub fn train_test_split(data: &Dataset, test_fraction: f64, rng: &mut StdRng) -> (Dataset, Dataset) {
    let mut rows: Vec<usize> = (0..data.len()).collect();
    rows.shuffle(rng);
    let n_test = ((data.len() as f64) * test_fraction).ceil() as usize;
    let (test, train) = rows.split_at(n_test.min(data.len()));
    (data.select(train), data.select(test))
}

pub struct TrainedModel {
    pub model: RandomForest,
    pub scaler: MinMaxScaler,
    pub holdout_accuracy: Option<f64>,
}

pub fn train(config: &TrainingConfig) -> Result<TrainedModel> {
    ensure!(
        (0.0..1.0).contains(&config.test_fraction),
        "test_fraction must be in [0, 1), got {}",
        config.test_fraction
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let data = synthetic_dataset(config.n_samples, &mut rng);
    let (train_set, test_set) = train_test_split(&data, config.test_fraction, &mut rng);
    ensure!(!train_set.is_empty(), "training split is empty");

    let scaler = MinMaxScaler::fit(train_set.features.view()).context("fitting scaler")?;
    let x_train = scaler.transform_matrix(train_set.features.view())?;
    let model = RandomForest::fit(x_train.view(), &train_set.labels, N_CLASSES, &config.forest)
        .context("fitting random forest")?;

    let holdout_accuracy = if test_set.is_empty() {
        None
    } else {
        let x_test = scaler.transform_matrix(test_set.features.view())?;
        Some(model.accuracy(x_test.view(), &test_set.labels)?)
    };

    Ok(TrainedModel {
        model,
        scaler,
        holdout_accuracy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::ForestParams;
    use crate::model::{Classifier, FeatureScaler};

    fn small() -> TrainingConfig {
        TrainingConfig {
            n_samples: 200,
            test_fraction: 0.2,
            seed: 3,
            forest: ForestParams {
                n_estimators: 10,
                max_depth: 3,
                seed: 3,
            },
        }
    }

    #[test]
    fn synthetic_rows_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let data = synthetic_dataset(500, &mut rng);
        assert_eq!(data.features.dim(), (500, N_FEATURES));
        for row in data.features.rows() {
            for (v, b) in row.iter().zip(FIELD_BOUNDS.iter()) {
                assert!(b.contains(*v), "{} = {} out of bounds", b.field, v);
            }
        }
        assert!(data.labels.iter().all(|&l| l < N_CLASSES));
    }

    #[test]
    fn split_is_eighty_twenty() {
        let mut rng = StdRng::seed_from_u64(1);
        let data = synthetic_dataset(1000, &mut rng);
        let (train, test) = train_test_split(&data, 0.2, &mut rng);
        assert_eq!(train.len(), 800);
        assert_eq!(test.len(), 200);
        assert_eq!(train.features.nrows(), 800);
    }

    #[test]
    fn trains_usable_artifacts() {
        let trained = train(&small()).unwrap();
        assert_eq!(trained.model.n_trees(), 10);
        let acc = trained.holdout_accuracy.unwrap();
        assert!((0.0..=1.0).contains(&acc));

        let scaled = trained
            .scaler
            .transform(&[90.0, 42.0, 43.0, 20.87, 82.0, 6.5, 202.93])
            .unwrap();
        let probs = trained.model.predict_proba(&scaled).unwrap();
        assert_eq!(probs.len(), N_CLASSES);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn training_is_reproducible() {
        let a = train(&small()).unwrap();
        let b = train(&small()).unwrap();
        assert_eq!(a.scaler, b.scaler);
        let point = a.scaler.transform(&[70.0, 75.0, 105.0, 26.0, 57.0, 6.7, 159.0]).unwrap();
        assert_eq!(
            a.model.predict_proba(&point).unwrap(),
            b.model.predict_proba(&point).unwrap()
        );
    }

    #[test]
    fn rejects_bad_fraction() {
        let cfg = TrainingConfig { test_fraction: 1.0, ..small() };
        assert!(train(&cfg).is_err());
    }
}
