//! Fitted feature scalers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScalerError {
    #[error("scaler fitted on {expected} features, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("scaler parameters disagree in length ({0})")]
    Inconsistent(&'static str),
}

/// A fitted per-feature scaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Scaler {
    /// `(x - mean) / scale`; either parameter may be absent (identity for that step).
    Standard {
        #[serde(default)]
        mean: Option<Vec<f64>>,
        #[serde(default)]
        scale: Option<Vec<f64>>,
    },
    /// `x * scale + min`.
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

impl Scaler {
    /// Number of features the scaler was fitted on, if it records one.
    pub fn n_features(&self) -> Option<usize> {
        match self {
            Self::Standard { mean, scale } => mean.as_ref().or(scale.as_ref()).map(Vec::len),
            Self::MinMax { min, .. } => Some(min.len()),
        }
    }

    /// Scale a single sample.
    pub fn transform(&self, x: &[f64]) -> Result<Vec<f64>, ScalerError> {
        match self {
            Self::Standard { mean, scale } => {
                if let (Some(m), Some(s)) = (mean, scale)
                    && m.len() != s.len()
                {
                    return Err(ScalerError::Inconsistent("mean/scale"));
                }
                if let Some(n) = self.n_features() {
                    check_dim(n, x.len())?;
                }
                Ok(x.iter()
                    .enumerate()
                    .map(|(i, &v)| {
                        let centred = mean.as_ref().map_or(v, |m| v - m[i]);
                        // Constant features are fitted with scale 0; leave them unscaled.
                        match scale.as_ref().map(|s| s[i]) {
                            Some(s) if s != 0.0 => centred / s,
                            _ => centred,
                        }
                    })
                    .collect())
            }
            Self::MinMax { min, scale } => {
                if min.len() != scale.len() {
                    return Err(ScalerError::Inconsistent("min/scale"));
                }
                check_dim(min.len(), x.len())?;
                Ok(x.iter()
                    .zip(min.iter().zip(scale))
                    .map(|(&v, (&lo, &s))| v * s + lo)
                    .collect())
            }
        }
    }
}

fn check_dim(expected: usize, found: usize) -> Result<(), ScalerError> {
    if expected != found {
        return Err(ScalerError::DimensionMismatch { expected, found });
    }
    Ok(())
}
