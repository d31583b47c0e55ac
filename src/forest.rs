use anyhow::{bail, ensure, Context, Result};
use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::model::Classifier;

/// Hyperparameters for [`RandomForest::fit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 4,
            seed: 42,
        }
    }
}

/// Bagged ensemble of Gini decision trees, each fit on a seeded bootstrap
/// sample. Class probabilities are the share of trees voting for each class.
#[derive(Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    n_classes: usize,
    trees: Vec<DecisionTree<f64, usize>>,
}

impl std::fmt::Debug for RandomForest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomForest")
            .field("n_features", &self.n_features)
            .field("n_classes", &self.n_classes)
            .field("n_trees", &self.trees.len())
            .finish()
    }
}

impl RandomForest {
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: &[usize],
        n_classes: usize,
        params: &ForestParams,
    ) -> Result<Self> {
        let (n_rows, n_features) = x.dim();
        ensure!(n_rows > 0 && n_features > 0, "cannot fit forest on an empty matrix");
        ensure!(
            n_rows == y.len(),
            "row count {} does not match label count {}",
            n_rows,
            y.len()
        );
        ensure!(params.n_estimators > 0, "n_estimators must be positive");
        if let Some(bad) = y.iter().find(|&&label| label >= n_classes) {
            bail!("label {} outside 0..{}", bad, n_classes);
        }

        let tree_params = DecisionTree::<f64, usize>::params()
            .split_quality(SplitQuality::Gini)
            .max_depth(Some(params.max_depth));

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_estimators);
        for i in 0..params.n_estimators {
            let rows: Vec<usize> = (0..n_rows).map(|_| rng.random_range(0..n_rows)).collect();
            let records = x.select(Axis(0), &rows);
            let targets: Array1<usize> = rows.iter().map(|&r| y[r]).collect();
            let dataset = DatasetBase::from(records).with_targets(targets);
            let tree = tree_params
                .fit(&dataset)
                .with_context(|| format!("fitting tree {}", i))?;
            trees.push(tree);
        }

        Ok(Self {
            n_features,
            n_classes,
            trees,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Checks a decoded forest against the shape the service feeds it.
    pub fn validate(&self, n_features: usize, n_classes: usize) -> Result<()> {
        ensure!(
            self.n_features == n_features,
            "forest expects {} features, service provides {}",
            self.n_features,
            n_features
        );
        ensure!(
            self.n_classes == n_classes,
            "forest has {} classes, expected {}",
            self.n_classes,
            n_classes
        );
        ensure!(!self.trees.is_empty(), "forest has no trees");
        for (i, tree) in self.trees.iter().enumerate() {
            if let Some(f) = tree.features().into_iter().find(|&f| f >= n_features) {
                bail!("tree {} splits on feature {} of {}", i, f, n_features);
            }
        }
        Ok(())
    }

    /// Fraction of rows whose predicted class matches `y`.
    pub fn accuracy(&self, x: ArrayView2<'_, f64>, y: &[usize]) -> Result<f64> {
        ensure!(x.nrows() == y.len() && !y.is_empty(), "bad evaluation set");
        let mut hits = 0usize;
        for (row, &label) in x.rows().into_iter().zip(y) {
            let features = row.to_vec();
            if self.predict(&features)?.index() == label {
                hits += 1;
            }
        }
        Ok(hits as f64 / y.len() as f64)
    }
}

impl Classifier for RandomForest {
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.n_features {
            bail!(
                "feature length mismatch: got {}, expected {}",
                features.len(),
                self.n_features
            );
        }
        ensure!(!self.trees.is_empty(), "forest has no trees");

        let row = Array2::from_shape_vec((1, features.len()), features.to_vec())?;
        let share = 1.0 / self.trees.len() as f64;
        let mut probs = vec![0.0; self.n_classes];
        for tree in &self.trees {
            let votes: Array1<usize> = tree.predict(&row);
            let label = votes[0];
            let slot = probs
                .get_mut(label)
                .with_context(|| format!("tree voted for unknown class {}", label))?;
            *slot += share;
        }
        Ok(probs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 0.9],
            [0.1, 0.8],
            [0.2, 0.7],
            [0.3, 0.1],
            [0.7, 0.2],
            [0.8, 0.3],
            [0.9, 0.4],
            [1.0, 0.5],
        ];
        (x, vec![0, 0, 0, 0, 1, 1, 1, 1])
    }

    fn params() -> ForestParams {
        ForestParams {
            n_estimators: 25,
            max_depth: 3,
            seed: 7,
        }
    }

    #[test]
    fn learns_a_separable_problem() {
        let (x, y) = separable();
        let forest = RandomForest::fit(x.view(), &y, 2, &params()).unwrap();
        assert_eq!(forest.n_trees(), 25);
        assert_eq!(forest.predict(&[0.05, 0.85]).unwrap().index(), 0);
        assert_eq!(forest.predict(&[0.95, 0.3]).unwrap().index(), 1);
        assert!(forest.accuracy(x.view(), &y).unwrap() >= 0.875);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let (x, y) = separable();
        let forest = RandomForest::fit(x.view(), &y, 3, &params()).unwrap();
        let probs = forest.predict_proba(&[0.5, 0.5]).unwrap();
        assert_eq!(probs.len(), 3);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
        assert_eq!(probs[2], 0.0);
    }

    #[test]
    fn same_seed_same_votes() {
        let (x, y) = separable();
        let a = RandomForest::fit(x.view(), &y, 2, &params()).unwrap();
        let b = RandomForest::fit(x.view(), &y, 2, &params()).unwrap();
        for q in [[0.0, 0.0], [0.5, 0.5], [0.35, 0.6]] {
            assert_eq!(a.predict_proba(&q).unwrap(), b.predict_proba(&q).unwrap());
        }
    }

    #[test]
    fn rejects_bad_inputs() {
        let (x, y) = separable();
        assert!(RandomForest::fit(x.view(), &y[..3], 2, &params()).is_err());
        assert!(RandomForest::fit(x.view(), &y, 1, &params()).is_err());
        let forest = RandomForest::fit(x.view(), &y, 2, &params()).unwrap();
        assert!(forest.predict_proba(&[0.1]).is_err());
    }

    #[test]
    fn validate_checks_shape() {
        let (x, y) = separable();
        let forest = RandomForest::fit(x.view(), &y, 2, &params()).unwrap();
        assert!(forest.validate(2, 2).is_ok());
        assert!(forest.validate(7, 2).is_err());
        assert!(forest.validate(2, 22).is_err());
    }

    #[test]
    fn survives_json_round_trip() {
        let (x, y) = separable();
        let forest = RandomForest::fit(x.view(), &y, 2, &params()).unwrap();
        let json = serde_json::to_string(&forest).unwrap();
        let back: RandomForest = serde_json::from_str(&json).unwrap();
        back.validate(2, 2).unwrap();
        let a = forest.predict_proba(&[0.4, 0.4]).unwrap();
        let b = back.predict_proba(&[0.4, 0.4]).unwrap();
        for (p, q) in a.iter().zip(&b) {
            assert!((p - q).abs() < 1e-12);
        }
    }
}
