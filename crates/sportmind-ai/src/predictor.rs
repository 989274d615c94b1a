//! Final inference step: classifier output → [`RegulationPrediction`].

use sportmind_core::RegulationPrediction;
use thiserror::Error;
use tracing::debug;

use crate::model::{Classifier, ModelError};
use crate::select::SelectedFeatures;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictionError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("classifier predicted class {0}, expected 0 or 1")]
    NonBinaryClass(i64),
}

/// Run `classifier` on one sample.
///
/// The class decides the result; the probability estimate only adds a
/// confidence. Failing to obtain a usable confidence never fails the
/// prediction, it just leaves `confidence` empty.
pub fn predict<C: Classifier + ?Sized>(
    classifier: &C,
    features: &SelectedFeatures,
) -> Result<RegulationPrediction, PredictionError> {
    let x = features.values();
    let regulated = match classifier.predict(x)? {
        0 => false,
        1 => true,
        other => return Err(PredictionError::NonBinaryClass(other)),
    };

    let confidence = match classifier.predict_proba(x) {
        None => None,
        Some(Ok(p)) => max_probability(&p),
        Some(Err(e)) => {
            debug!(error = %e, "probability estimate failed; omitting confidence");
            None
        }
    };

    Ok(RegulationPrediction::new(regulated, confidence))
}

/// Highest class probability, rejected unless it is a probability.
fn max_probability(p: &[f64]) -> Option<f64> {
    let max = p.iter().copied().reduce(f64::max)?;
    (0.0..=1.0).contains(&max).then_some(max)
}
