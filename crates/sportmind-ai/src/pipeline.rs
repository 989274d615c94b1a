//! Emotional-regulation inference pipeline.
//!
//! `record → FeatureRow → EncodedRow → SelectedFeatures → RegulationPrediction`
//!
//! [`RegulationPipeline`] is the handle built once at startup and shared by
//! every request. Each call is a pure function of the record and the
//! immutable bundle, so the handle is cheap to clone and safe to use from
//! any number of threads.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use sportmind_core::RegulationPrediction;
use sportmind_core::session::{REGULATION_KEY, SessionRecord};
use thiserror::Error;
use tracing::{debug, warn};

use crate::bundle::ArtifactBundle;
use crate::encoder::{EncodedRow, EncodingError};
use crate::features::FeatureRow;
use crate::predictor::{self, PredictionError};
use crate::select::{self, SelectedFeatures, SelectionError};

/// Why a record got no prediction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("no usable classifier loaded")]
    BundleUnavailable,
    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),
    #[error("feature selection failed: {0}")]
    Selection(#[from] SelectionError),
    #[error("prediction failed: {0}")]
    Prediction(#[from] PredictionError),
}

impl PipelineError {
    /// Pipeline stage that produced the error.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::BundleUnavailable => "load",
            Self::Encoding(_) => "encode",
            Self::Selection(_) => "select",
            Self::Prediction(_) => "predict",
        }
    }
}

/// Shared handle to the loaded model bundle.
#[derive(Debug, Clone, Default)]
pub struct RegulationPipeline {
    bundle: Option<Arc<ArtifactBundle>>,
}

impl RegulationPipeline {
    pub fn new(bundle: ArtifactBundle) -> Self {
        Self {
            bundle: Some(Arc::new(bundle)),
        }
    }

    /// A pipeline that never predicts.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Load the bundle at `path`; an unusable bundle yields a disabled pipeline.
    pub fn load(path: &Path) -> Self {
        Self {
            bundle: ArtifactBundle::load(path).map(Arc::new),
        }
    }

    pub fn bundle(&self) -> Option<&ArtifactBundle> {
        self.bundle.as_deref()
    }

    /// Whether a classifier is available to predict with.
    pub fn is_enabled(&self) -> bool {
        self.bundle().and_then(ArtifactBundle::classifier).is_some()
    }

    /// Extract, encode and select the classifier input for `record`.
    pub fn features(&self, record: &SessionRecord) -> Result<SelectedFeatures, PipelineError> {
        let bundle = self.bundle().ok_or(PipelineError::BundleUnavailable)?;
        let encoded = self.encode(record)?;
        Ok(select::select_and_scale(
            &encoded,
            bundle.feature_order(),
            bundle.scaler(),
        )?)
    }

    /// Extract and encode `record` using the bundle's encoders, if any.
    pub fn encode(&self, record: &SessionRecord) -> Result<EncodedRow, PipelineError> {
        let row = FeatureRow::extract(record);
        match self.bundle().and_then(ArtifactBundle::encoders) {
            Some(encoders) => Ok(encoders.encode(row)?),
            None => Ok(EncodedRow::raw(row)),
        }
    }

    /// Run the full pipeline, reporting why no prediction was produced.
    pub fn try_predict(
        &self,
        record: &SessionRecord,
    ) -> Result<RegulationPrediction, PipelineError> {
        let classifier = self
            .bundle()
            .and_then(ArtifactBundle::classifier)
            .ok_or(PipelineError::BundleUnavailable)?;
        let features = self.features(record)?;
        Ok(predictor::predict(classifier, &features)?)
    }

    /// Run the full pipeline; any failure is logged and yields `None`.
    pub fn predict(&self, record: &SessionRecord) -> Option<RegulationPrediction> {
        match self.try_predict(record) {
            Ok(p) => Some(p),
            Err(PipelineError::BundleUnavailable) => {
                debug!("emotional-regulation model unavailable; skipping prediction");
                None
            }
            Err(e) => {
                warn!(stage = e.stage(), error = %e, "emotional-regulation prediction skipped");
                None
            }
        }
    }

    /// Attach the prediction to `record` under `emotional_regulation`.
    ///
    /// Returns whether a prediction was attached; the key is never added
    /// when there is none.
    pub fn annotate(&self, record: &mut SessionRecord) -> bool {
        let Some(prediction) = self.predict(record) else {
            return false;
        };
        match serde_json::to_value(&prediction) {
            Ok(value) => {
                record.insert(REGULATION_KEY.to_string(), value);
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to serialize prediction");
                false
            }
        }
    }

    /// Annotate every object in `records`; non-objects are left untouched.
    pub fn annotate_all<'a>(&self, records: impl IntoIterator<Item = &'a mut Value>) -> usize {
        let mut attached = 0;
        for record in records.into_iter().filter_map(Value::as_object_mut) {
            if self.annotate(record) {
                attached += 1;
            }
        }
        attached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> SessionRecord {
        v.as_object().cloned().unwrap()
    }

    fn scenario_record() -> SessionRecord {
        record(json!({
            "selectedSport": "boxing",
            "gender": "F",
            "emotionalState": "calm",
            "preEmotionTiroEasy": "2",
            "shootingScoreEasy": 8.5,
            "shootingRendimiento": 3,
            "shootingPostEmotion": "happy",
            "climbingPostEmotion": "tired",
        }))
    }

    /// Logistic model over `shootingScoreEasy` with P(1) = 0.9 at 8.5.
    fn scenario_bundle() -> ArtifactBundle {
        ArtifactBundle::from_json(json!({
            "modelo": {
                "type": "logistic_regression",
                "coef": [0.0, 0.0],
                "intercept": (9.0f64).ln()
            },
            "encoders": {
                "le_sport": {"classes": ["boxing", "climbing"]},
                "le_gender": {"classes": ["F", "M"]},
                "le_emotionalState": {"classes": ["anxious", "calm"]},
                "le_post": {"classes": ["happy", "tired"]}
            },
            "features": ["shootingScoreEasy", "emotionalState_encoded"]
        }))
        .unwrap()
    }

    /// Bare logistic model over the 15 numeric base columns.
    fn bare_bundle() -> ArtifactBundle {
        ArtifactBundle::from_json(json!({
            "type": "logistic_regression",
            "coef": vec![0.1; 15],
            "intercept": -1.0
        }))
        .unwrap()
    }

    #[test]
    fn scenario_predicts_yes_with_confidence() {
        let pipeline = RegulationPipeline::new(scenario_bundle());
        let p = pipeline.try_predict(&scenario_record()).unwrap();
        assert_eq!(p.prediction, 1);
        assert_eq!(p.label, "Sí");
        assert!((p.confidence.unwrap() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn unavailable_bundle_adds_no_key() {
        let pipeline = RegulationPipeline::disabled();
        assert!(!pipeline.is_enabled());
        let mut r = scenario_record();
        assert!(!pipeline.annotate(&mut r));
        assert!(!r.contains_key(REGULATION_KEY));
        assert_eq!(
            pipeline.try_predict(&r).unwrap_err(),
            PipelineError::BundleUnavailable
        );
    }

    #[test]
    fn composite_without_classifier_is_unavailable() {
        let bundle = ArtifactBundle::from_json(json!({"features": ["shootingScoreEasy"]})).unwrap();
        let pipeline = RegulationPipeline::new(bundle);
        assert!(!pipeline.is_enabled());
        assert_eq!(
            pipeline.try_predict(&scenario_record()).unwrap_err(),
            PipelineError::BundleUnavailable
        );
    }

    #[test]
    fn raw_feature_path_predicts_for_any_record() {
        let pipeline = RegulationPipeline::new(bare_bundle());
        for r in [
            scenario_record(),
            SessionRecord::new(),
            record(json!({"data": {"shootingScoreEasy": "garbage"}})),
        ] {
            assert!(pipeline.predict(&r).is_some());
        }
    }

    #[test]
    fn bare_bundle_width_mismatch_fails_in_predict_stage() {
        let bundle = ArtifactBundle::from_json(json!({
            "type": "logistic_regression",
            "coef": [1.0, 2.0],
            "intercept": 0.0
        }))
        .unwrap();
        let err = RegulationPipeline::new(bundle)
            .try_predict(&scenario_record())
            .unwrap_err();
        assert_eq!(err.stage(), "predict");
    }

    #[test]
    fn pipeline_is_idempotent() {
        let pipeline = RegulationPipeline::new(scenario_bundle());
        let r = scenario_record();
        let a = pipeline.try_predict(&r).unwrap();
        let b = pipeline.try_predict(&r).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.confidence.map(f64::to_bits),
            b.confidence.map(f64::to_bits)
        );
    }

    #[test]
    fn unseen_emotional_state_yields_no_prediction() {
        let pipeline = RegulationPipeline::new(scenario_bundle());
        let mut r = scenario_record();
        r.insert("emotionalState".into(), json!("euphoric"));
        let err = pipeline.try_predict(&r).unwrap_err();
        assert_eq!(err.stage(), "encode");
        assert!(err.to_string().contains("euphoric"));
        assert!(pipeline.predict(&r).is_none());
        assert!(!pipeline.annotate(&mut r));
        assert!(!r.contains_key(REGULATION_KEY));
    }

    #[test]
    fn missing_declared_feature_fails_selection() {
        let mut bundle = scenario_bundle();
        if let ArtifactBundle::Composite(c) = &mut bundle {
            c.feature_order.push("heartRate".into());
        }
        let pipeline = RegulationPipeline::new(bundle);
        let err = pipeline.try_predict(&scenario_record()).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Selection(SelectionError::MissingFeatures(vec!["heartRate".into()]))
        );
    }

    #[test]
    fn nested_data_predicts_identically() {
        let pipeline = RegulationPipeline::new(scenario_bundle());
        let flat = scenario_record();
        let nested = record(json!({
            "timestamp": "2025-11-03T10:00:00",
            "data": Value::Object(flat.clone()),
        }));
        assert_eq!(pipeline.predict(&flat), pipeline.predict(&nested));
    }

    #[test]
    fn annotate_inserts_prediction_object() {
        let pipeline = RegulationPipeline::new(scenario_bundle());
        let mut r = scenario_record();
        assert!(pipeline.annotate(&mut r));
        let attached = &r[REGULATION_KEY];
        assert_eq!(attached["prediction"], 1);
        assert_eq!(attached["label"], "Sí");
        assert!(attached["confidence"].is_f64());
    }

    #[test]
    fn annotate_all_counts_attached() {
        let pipeline = RegulationPipeline::new(scenario_bundle());
        let mut unseen = scenario_record();
        unseen.insert("gender".into(), json!("X"));
        let mut records = vec![
            Value::Object(scenario_record()),
            Value::Object(unseen),
            json!("not a session"),
        ];
        assert_eq!(pipeline.annotate_all(records.iter_mut()), 1);
        assert!(records[0].get(REGULATION_KEY).is_some());
        assert!(records[1].get(REGULATION_KEY).is_none());
    }

    #[test]
    fn handle_is_shareable_across_threads() {
        let pipeline = RegulationPipeline::new(scenario_bundle());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let p = pipeline.clone();
                std::thread::spawn(move || p.predict(&scenario_record()))
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap().map(|p| p.prediction), Some(1));
        }
    }
}
