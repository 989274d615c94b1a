//! Model artifact bundle produced by offline training.
//!
//! The bundle on disk is JSON in one of two shapes:
//!
//! - a **bare** classifier: `{"type": "logistic_regression", ...}`
//! - a **composite** object with any of `modelo` (or `model`), `scaler`,
//!   `encoders`, `features`.
//!
//! The shape is resolved once when the file is read. A missing or corrupt
//! file disables predictions instead of failing startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::encoder::EncoderSet;
use crate::model::{Classifier, ClassifierModel, ModelError};
use crate::scaler::Scaler;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("model bundle not found: {0}")]
    NotFound(PathBuf),
    #[error("reading model bundle: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing model bundle: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model bundle is not a JSON object")]
    NotAnObject,
    #[error("invalid classifier in model bundle: {0}")]
    InvalidModel(#[from] ModelError),
}

/// Keys whose presence marks a composite bundle.
const COMPOSITE_KEYS: &[&str] = &["modelo", "model", "scaler", "encoders", "features"];

/// Classifier plus the preprocessing it was trained with.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompositeBundle {
    #[serde(rename = "modelo", alias = "model", default)]
    pub classifier: Option<ClassifierModel>,
    #[serde(default)]
    pub scaler: Option<Scaler>,
    #[serde(default)]
    pub encoders: EncoderSet,
    #[serde(rename = "features", default)]
    pub feature_order: Vec<String>,
}

/// A loaded bundle. Read-only for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactBundle {
    /// A classifier fed with raw (unencoded, unscaled) features.
    Bare(ClassifierModel),
    Composite(CompositeBundle),
}

impl ArtifactBundle {
    /// Load a bundle, logging and returning `None` when it is unusable.
    pub fn load(path: &Path) -> Option<Self> {
        match Self::read(path) {
            Ok(bundle) => {
                info!(
                    path = %path.display(),
                    shape = bundle.shape(),
                    classifier = bundle.classifier().map(ClassifierModel::kind),
                    encoders = bundle.encoders().map_or(0, EncoderSet::len),
                    features = bundle.feature_order().len(),
                    n_features = bundle.n_features(),
                    scaler = bundle.scaler().is_some(),
                    "loaded emotional-regulation model"
                );
                if bundle.classifier().is_none() {
                    warn!(path = %path.display(), "model bundle has no classifier; predictions disabled");
                }
                Some(bundle)
            }
            Err(BundleError::NotFound(p)) => {
                warn!(path = %p.display(), "model bundle not found; predictions disabled");
                None
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to load model bundle; predictions disabled");
                None
            }
        }
    }

    /// Read and parse a bundle file.
    pub fn read(path: &Path) -> Result<Self, BundleError> {
        if !path.exists() {
            return Err(BundleError::NotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        let value: Value = serde_json::from_slice(&bytes)?;
        Self::from_json(value)
    }

    /// Resolve a parsed bundle into its bare or composite shape.
    pub fn from_json(value: Value) -> Result<Self, BundleError> {
        let Value::Object(map) = &value else {
            return Err(BundleError::NotAnObject);
        };
        let bundle = if COMPOSITE_KEYS.iter().any(|k| map.contains_key(*k)) {
            Self::Composite(serde_json::from_value(value)?)
        } else {
            Self::Bare(serde_json::from_value(value)?)
        };
        if let Some(classifier) = bundle.classifier() {
            classifier.validate()?;
        }
        Ok(bundle)
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Self::Bare(_) => "bare",
            Self::Composite(_) => "composite",
        }
    }

    /// The classifier, if the bundle carries a usable one.
    pub fn classifier(&self) -> Option<&ClassifierModel> {
        match self {
            Self::Bare(model) => Some(model),
            Self::Composite(c) => c.classifier.as_ref(),
        }
    }

    /// Configured encoders; `None` for bare bundles or an empty encoder map.
    pub fn encoders(&self) -> Option<&EncoderSet> {
        match self {
            Self::Composite(c) if !c.encoders.is_empty() => Some(&c.encoders),
            _ => None,
        }
    }

    pub fn scaler(&self) -> Option<&Scaler> {
        match self {
            Self::Composite(c) => c.scaler.as_ref(),
            Self::Bare(_) => None,
        }
    }

    /// Declared training feature order; empty when not declared.
    pub fn feature_order(&self) -> &[String] {
        match self {
            Self::Composite(c) => &c.feature_order,
            Self::Bare(_) => &[],
        }
    }

    /// Expected input width, when the bundle pins it down.
    pub fn n_features(&self) -> Option<usize> {
        if !self.feature_order().is_empty() {
            return Some(self.feature_order().len());
        }
        self.classifier().and_then(Classifier::n_features)
    }
}
