use anyhow::{bail, Result};
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::model::FeatureScaler;

/// Per-column min-max normalization to [0, 1] over the fitted range.
///
/// Values outside the fitted range are not clipped. A column with zero
/// range is shifted but not scaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    data_min: Vec<f64>,
    data_max: Vec<f64>,
}

impl MinMaxScaler {
    pub fn fit(x: ArrayView2<'_, f64>) -> Result<Self> {
        if x.nrows() == 0 || x.ncols() == 0 {
            bail!("cannot fit scaler on an empty matrix ({}x{})", x.nrows(), x.ncols());
        }
        let data_min = x.fold_axis(Axis(0), f64::INFINITY, |acc, v| acc.min(*v));
        let data_max = x.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, v| acc.max(*v));
        Ok(Self {
            data_min: data_min.to_vec(),
            data_max: data_max.to_vec(),
        })
    }

    /// Checks a decoded scaler against the feature width the service feeds it.
    pub fn validate(&self, n_features: usize) -> Result<()> {
        if self.data_min.len() != n_features || self.data_max.len() != n_features {
            bail!(
                "scaler has {} minima and {} maxima, expected {} of each",
                self.data_min.len(),
                self.data_max.len(),
                n_features
            );
        }
        for (col, (lo, hi)) in self.data_min.iter().zip(&self.data_max).enumerate() {
            if !lo.is_finite() || !hi.is_finite() || lo > hi {
                bail!("scaler column {} has invalid range [{}, {}]", col, lo, hi);
            }
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.data_min.len()
    }

    fn scale(&self, col: usize) -> f64 {
        let range = self.data_max[col] - self.data_min[col];
        if range == 0.0 {
            1.0
        } else {
            range
        }
    }

    pub fn transform_matrix(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            bail!(
                "feature length mismatch: got {}, expected {}",
                x.ncols(),
                self.n_features()
            );
        }
        let mut out = x.to_owned();
        for (col, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (min, scale) = (self.data_min[col], self.scale(col));
            column.mapv_inplace(|v| (v - min) / scale);
        }
        Ok(out)
    }
}

impl FeatureScaler for MinMaxScaler {
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.n_features() {
            bail!(
                "feature length mismatch: got {}, expected {}",
                features.len(),
                self.n_features()
            );
        }
        Ok(features
            .iter()
            .enumerate()
            .map(|(col, v)| (v - self.data_min[col]) / self.scale(col))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn fit_transform_maps_range_to_unit_interval() {
        let x = array![[0.0, 10.0], [5.0, 20.0], [10.0, 30.0]];
        let scaler = MinMaxScaler::fit(x.view()).unwrap();
        let t = scaler.transform_matrix(x.view()).unwrap();
        assert_eq!(t, array![[0.0, 0.0], [0.5, 0.5], [1.0, 1.0]]);
        assert_eq!(scaler.transform(&[5.0, 20.0]).unwrap(), vec![0.5, 0.5]);
    }

    #[test]
    fn does_not_clip_out_of_range_values() {
        let scaler = MinMaxScaler::fit(array![[0.0], [10.0]].view()).unwrap();
        assert_eq!(scaler.transform(&[20.0]).unwrap(), vec![2.0]);
        assert_eq!(scaler.transform(&[-5.0]).unwrap(), vec![-0.5]);
    }

    #[test]
    fn constant_column_is_only_shifted() {
        let scaler = MinMaxScaler::fit(array![[3.0], [3.0]].view()).unwrap();
        assert_eq!(scaler.transform(&[4.0]).unwrap(), vec![1.0]);
    }

    #[test]
    fn validate_catches_mismatched_ranges() {
        let scaler = MinMaxScaler::fit(array![[1.0, 2.0], [3.0, 4.0]].view()).unwrap();
        assert!(scaler.validate(2).is_ok());
        assert!(scaler.validate(7).is_err());

        let lopsided: MinMaxScaler =
            serde_json::from_str(r#"{"data_min":[0.0,0.0],"data_max":[1.0]}"#).unwrap();
        assert!(lopsided.validate(2).is_err());
        let inverted: MinMaxScaler =
            serde_json::from_str(r#"{"data_min":[5.0],"data_max":[1.0]}"#).unwrap();
        assert!(inverted.validate(1).is_err());
    }

    #[test]
    fn rejects_wrong_width() {
        let scaler = MinMaxScaler::fit(array![[1.0, 2.0]].view()).unwrap();
        assert!(scaler.transform(&[1.0]).is_err());
        assert!(MinMaxScaler::fit(Array2::<f64>::zeros((0, 3)).view()).is_err());
    }
}
