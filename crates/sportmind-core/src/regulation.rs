//! Emotional self-regulation prediction attached to session records.

use serde::{Deserialize, Serialize};

/// Label shown for class 1 (the athlete self-regulated).
pub const LABEL_YES: &str = "Sí";
/// Label shown for class 0.
pub const LABEL_NO: &str = "No";

/// Binary self-regulation prediction for one session.
///
/// Serialized under the `emotional_regulation` key of the session record.
/// `confidence` is the highest class probability and is omitted when the
/// classifier has no probability estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulationPrediction {
    pub prediction: u8,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl RegulationPrediction {
    /// Build a prediction from a positive/negative outcome.
    pub fn new(regulated: bool, confidence: Option<f64>) -> Self {
        let (prediction, label) = if regulated {
            (1, LABEL_YES)
        } else {
            (0, LABEL_NO)
        };
        Self {
            prediction,
            label: label.to_string(),
            confidence,
        }
    }
}
