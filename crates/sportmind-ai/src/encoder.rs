//! Label encoding of the categorical feature columns.
//!
//! A bundle may ship up to four fitted label encoders. Each maps a category
//! to its index in the encoder's trained vocabulary and rejects anything it
//! was not fitted on. The post-emotion encoder is shared by the shooting and
//! climbing post-emotion columns.

use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use sportmind_core::columns;
use thiserror::Error;

use crate::features::{FeatureRow, FeatureValue};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("encoder {encoder} has no class {value:?} (column {column})")]
    UnseenCategory {
        encoder: &'static str,
        column: &'static str,
        value: String,
    },
}

/// A fitted categorical → integer mapping over a fixed vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    /// Code for `value`, or `None` if the encoder was never fitted on it.
    pub fn transform(&self, value: &str) -> Option<i64> {
        self.classes
            .iter()
            .position(|c| c == value)
            .map(|i| i as i64)
    }
}

/// The named encoders a bundle may carry. Unknown names are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncoderSet {
    #[serde(rename = "le_sport", default, skip_serializing_if = "Option::is_none")]
    pub sport: Option<LabelEncoder>,
    #[serde(rename = "le_gender", default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<LabelEncoder>,
    #[serde(
        rename = "le_emotionalState",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub emotional_state: Option<LabelEncoder>,
    #[serde(rename = "le_post", default, skip_serializing_if = "Option::is_none")]
    pub post_emotion: Option<LabelEncoder>,
}

impl EncoderSet {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of configured encoders.
    pub fn len(&self) -> usize {
        [
            &self.sport,
            &self.gender,
            &self.emotional_state,
            &self.post_emotion,
        ]
        .iter()
        .filter(|e| e.is_some())
        .count()
    }

    /// Encode the categorical columns of `row`.
    ///
    /// Derived columns are appended in a fixed order: sport, gender,
    /// emotional state, shooting post-emotion, climbing post-emotion. Any
    /// unseen category fails the whole row; no partially-encoded row is
    /// returned.
    pub fn encode(&self, row: FeatureRow) -> Result<EncodedRow, EncodingError> {
        let plan: [(&Option<LabelEncoder>, &'static str, &'static str, &str, &'static str); 5] = [
            (
                &self.sport,
                "le_sport",
                columns::SELECTED_SPORT,
                &row.selected_sport,
                columns::SELECTED_SPORT_ENCODED,
            ),
            (
                &self.gender,
                "le_gender",
                columns::GENDER,
                &row.gender,
                columns::GENDER_ENCODED,
            ),
            (
                &self.emotional_state,
                "le_emotionalState",
                columns::EMOTIONAL_STATE,
                &row.emotional_state,
                columns::EMOTIONAL_STATE_ENCODED,
            ),
            (
                &self.post_emotion,
                "le_post",
                columns::SHOOTING_POST_EMOTION,
                &row.shooting_post_emotion,
                columns::SHOOTING_POST_EMOTION_ENCODED,
            ),
            (
                &self.post_emotion,
                "le_post",
                columns::CLIMBING_POST_EMOTION,
                &row.climbing_post_emotion,
                columns::CLIMBING_POST_EMOTION_ENCODED,
            ),
        ];

        let mut encoded = Vec::with_capacity(plan.len());
        for (encoder, encoder_name, column, value, target) in plan {
            let Some(encoder) = encoder else { continue };
            let code = encoder
                .transform(value)
                .ok_or_else(|| EncodingError::UnseenCategory {
                    encoder: encoder_name,
                    column,
                    value: value.to_string(),
                })?;
            encoded.push((target, code));
        }

        Ok(EncodedRow { row, encoded })
    }
}

/// A feature row plus its label-encoded columns.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    row: FeatureRow,
    encoded: Vec<(&'static str, i64)>,
}

impl EncodedRow {
    /// Wrap a row with no derived columns (bundle without encoders).
    pub fn raw(row: FeatureRow) -> Self {
        Self {
            row,
            encoded: Vec::new(),
        }
    }

    pub fn row(&self) -> &FeatureRow {
        &self.row
    }

    /// Derived columns in the order they were added.
    pub fn encoded(&self) -> &[(&'static str, i64)] {
        &self.encoded
    }

    /// Look up a base or derived column by name.
    pub fn get(&self, name: &str) -> Option<FeatureValue<'_>> {
        self.row.get(name).or_else(|| {
            self.encoded
                .iter()
                .find(|(col, _)| *col == name)
                .map(|(_, code)| FeatureValue::Int(*code))
        })
    }

    /// Single-row Arrow batch: base columns then derived columns.
    pub fn to_record_batch(&self) -> Result<RecordBatch, ArrowError> {
        let schema = columns::encoded_row_schema(self.encoded.iter().map(|(name, _)| *name));
        let mut arrays = self.row.arrays();
        arrays.extend(
            self.encoded
                .iter()
                .map(|(_, code)| Arc::new(Int64Array::from(vec![*code])) as ArrayRef),
        );
        RecordBatch::try_new(Arc::new(schema), arrays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encoder(classes: &[&str]) -> LabelEncoder {
        LabelEncoder::new(classes.iter().map(|s| s.to_string()).collect())
    }

    fn row() -> FeatureRow {
        let record = json!({
            "selectedSport": "boxing",
            "gender": "F",
            "emotionalState": "calm",
            "shootingPostEmotion": "happy",
            "climbingPostEmotion": "tired",
        });
        FeatureRow::extract(record.as_object().unwrap())
    }

    fn full_set() -> EncoderSet {
        EncoderSet {
            sport: Some(encoder(&["boxing", "football", "tennis"])),
            gender: Some(encoder(&["F", "M"])),
            emotional_state: Some(encoder(&["anxious", "calm"])),
            post_emotion: Some(encoder(&["happy", "sad", "tired"])),
        }
    }

    #[test]
    fn transform_returns_vocabulary_index() {
        let e = encoder(&["F", "M"]);
        assert_eq!(e.transform("F"), Some(0));
        assert_eq!(e.transform("M"), Some(1));
        assert_eq!(e.transform("X"), None);
    }

    #[test]
    fn empty_set_adds_no_columns() {
        let set = EncoderSet::default();
        assert!(set.is_empty());
        let encoded = set.encode(row()).unwrap();
        assert!(encoded.encoded().is_empty());
        assert_eq!(encoded.row(), &row());
    }

    #[test]
    fn full_set_adds_five_columns_in_order() {
        let encoded = full_set().encode(row()).unwrap();
        assert_eq!(
            encoded.encoded(),
            &[
                ("selectedSport_encoded", 0),
                ("gender_encoded", 0),
                ("emotionalState_encoded", 1),
                ("shootingPostEmotion_encoded", 0),
                ("climbingPostEmotion_encoded", 2),
            ]
        );
    }

    #[test]
    fn post_encoder_applies_to_both_activities() {
        let set = EncoderSet {
            post_emotion: Some(encoder(&["happy", "tired"])),
            ..Default::default()
        };
        assert_eq!(set.len(), 1);
        let encoded = set.encode(row()).unwrap();
        assert_eq!(encoded.encoded().len(), 2);
        assert_eq!(
            encoded.get("shootingPostEmotion_encoded"),
            Some(FeatureValue::Int(0))
        );
        assert_eq!(
            encoded.get("climbingPostEmotion_encoded"),
            Some(FeatureValue::Int(1))
        );
    }

    #[test]
    fn unseen_category_fails_whole_row() {
        let mut set = full_set();
        set.emotional_state = Some(encoder(&["anxious", "excited"]));
        let err = set.encode(row()).unwrap_err();
        assert_eq!(
            err,
            EncodingError::UnseenCategory {
                encoder: "le_emotionalState",
                column: "emotionalState",
                value: "calm".into(),
            }
        );
    }

    #[test]
    fn empty_value_is_unseen_unless_fitted() {
        let set = EncoderSet {
            gender: Some(encoder(&["F", "M"])),
            ..Default::default()
        };
        let blank = FeatureRow::extract(&serde_json::Map::new());
        assert!(set.encode(blank.clone()).is_err());

        let set = EncoderSet {
            gender: Some(encoder(&["", "F", "M"])),
            ..Default::default()
        };
        assert_eq!(
            set.encode(blank).unwrap().get("gender_encoded"),
            Some(FeatureValue::Int(0))
        );
    }

    #[test]
    fn deserializes_bundle_names_and_ignores_unknown() {
        let set: EncoderSet = serde_json::from_value(json!({
            "le_sport": {"classes": ["boxing"]},
            "le_post": {"classes": ["happy", "tired"]},
            "le_unused": {"classes": ["x"]},
        }))
        .unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.gender.is_none());
        assert_eq!(set.sport.unwrap().transform("boxing"), Some(0));
    }

    #[test]
    fn encoded_batch_appends_columns() {
        let encoded = full_set().encode(row()).unwrap();
        let batch = encoded.to_record_batch().unwrap();
        assert_eq!(batch.num_columns(), 25);
        assert!(batch.column_by_name("climbingPostEmotion_encoded").is_some());
    }
}
