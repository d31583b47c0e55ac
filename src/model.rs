use anyhow::Result;

use crate::crops::CropLabel;

/// Normalizes a raw feature vector into the space the classifier was fit in.
pub trait FeatureScaler: Send + Sync {
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>>;
}

/// Maps a normalized feature vector to per-class probabilities.
pub trait Classifier: Send + Sync {
    /// One probability per crop class, summing to 1.
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>>;

    /// Most probable class; the lowest label wins ties.
    fn predict(&self, features: &[f64]) -> Result<CropLabel> {
        let probs = self.predict_proba(features)?;
        let best = argmax(&probs)
            .ok_or_else(|| anyhow::anyhow!("classifier returned an empty probability vector"))?;
        CropLabel::new(best)
            .ok_or_else(|| anyhow::anyhow!("class index {} has no crop name", best))
    }
}

pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<f64>);

    impl Classifier for Fixed {
        fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn argmax_prefers_lowest_index_on_ties() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn default_predict_uses_argmax() {
        let mut probs = vec![0.0; 22];
        probs[20] = 1.0;
        assert_eq!(Fixed(probs).predict(&[]).unwrap().name(), "rice");
        assert!(Fixed(vec![]).predict(&[]).is_err());
    }
}
