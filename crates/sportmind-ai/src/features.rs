//! Feature extraction from raw session records.
//!
//! Maps an arbitrarily-shaped session record onto the fixed 20-column
//! [`FeatureRow`]. Extraction is total: every column has a default and every
//! numeric column is coerced, so malformed input degrades to defaults rather
//! than failing the request.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use serde_json::Value;
use sportmind_core::columns::{self, ColumnKind};
use sportmind_core::session::{self, SessionRecord};

/// One session's features, one field per column of [`columns::FEATURE_ROW`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub selected_sport: String,
    pub gender: String,
    pub emotional_state: String,
    pub pre_emotion_tiro_easy: f64,
    pub pre_emotion_tiro_hard: f64,
    pub pre_emotion_muro_easy: f64,
    pub pre_emotion_muro_hard: f64,
    pub shooting_score_easy: f64,
    pub shooting_score_hard: f64,
    pub shooting_rendimiento: i64,
    pub shooting_ritmo: i64,
    pub shooting_confianza: i64,
    pub shooting_post_emotion: String,
    pub climbing_time_easy: f64,
    pub climbing_time_hard: f64,
    pub climbing_rendimiento: i64,
    pub climbing_ritmo: i64,
    pub climbing_confianza: i64,
    pub climbing_post_emotion: String,
    pub recomendacion_final: i64,
}

/// A borrowed cell of a feature row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue<'a> {
    Text(&'a str),
    Float(f64),
    Int(i64),
}

impl FeatureValue<'_> {
    /// Numeric value, or `None` for text cells.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Text(_) => None,
            Self::Float(v) => Some(v),
            Self::Int(v) => Some(v as f64),
        }
    }
}

impl FeatureRow {
    /// Extract features from a session record.
    ///
    /// Reads from the nested `data` object when present, otherwise from the
    /// record itself.
    pub fn extract(record: &SessionRecord) -> Self {
        let src = session::payload(record);

        Self {
            selected_sport: text(src, columns::SELECTED_SPORT),
            gender: text(src, columns::GENDER),
            emotional_state: text(src, columns::EMOTIONAL_STATE),
            pre_emotion_tiro_easy: emotion_rating(src, columns::PRE_EMOTION_TIRO_EASY),
            pre_emotion_tiro_hard: emotion_rating(src, columns::PRE_EMOTION_TIRO_HARD),
            pre_emotion_muro_easy: emotion_rating(src, columns::PRE_EMOTION_MURO_EASY),
            pre_emotion_muro_hard: emotion_rating(src, columns::PRE_EMOTION_MURO_HARD),
            shooting_score_easy: float(src, columns::SHOOTING_SCORE_EASY),
            shooting_score_hard: float(src, columns::SHOOTING_SCORE_HARD),
            shooting_rendimiento: int(src, columns::SHOOTING_RENDIMIENTO),
            shooting_ritmo: int(src, columns::SHOOTING_RITMO),
            shooting_confianza: int(src, columns::SHOOTING_CONFIANZA),
            shooting_post_emotion: text(src, columns::SHOOTING_POST_EMOTION),
            climbing_time_easy: float(src, columns::CLIMBING_TIME_EASY),
            climbing_time_hard: float(src, columns::CLIMBING_TIME_HARD),
            climbing_rendimiento: int(src, columns::CLIMBING_RENDIMIENTO),
            climbing_ritmo: int(src, columns::CLIMBING_RITMO),
            climbing_confianza: int(src, columns::CLIMBING_CONFIANZA),
            climbing_post_emotion: text(src, columns::CLIMBING_POST_EMOTION),
            recomendacion_final: int(src, columns::RECOMENDACION_FINAL),
        }
    }

    /// All cells in row-definition order.
    pub fn cells(&self) -> [(&'static str, FeatureValue<'_>); 20] {
        use FeatureValue::{Float, Int, Text};
        [
            (columns::SELECTED_SPORT, Text(&self.selected_sport)),
            (columns::GENDER, Text(&self.gender)),
            (columns::EMOTIONAL_STATE, Text(&self.emotional_state)),
            (columns::PRE_EMOTION_TIRO_EASY, Float(self.pre_emotion_tiro_easy)),
            (columns::PRE_EMOTION_TIRO_HARD, Float(self.pre_emotion_tiro_hard)),
            (columns::PRE_EMOTION_MURO_EASY, Float(self.pre_emotion_muro_easy)),
            (columns::PRE_EMOTION_MURO_HARD, Float(self.pre_emotion_muro_hard)),
            (columns::SHOOTING_SCORE_EASY, Float(self.shooting_score_easy)),
            (columns::SHOOTING_SCORE_HARD, Float(self.shooting_score_hard)),
            (columns::SHOOTING_RENDIMIENTO, Int(self.shooting_rendimiento)),
            (columns::SHOOTING_RITMO, Int(self.shooting_ritmo)),
            (columns::SHOOTING_CONFIANZA, Int(self.shooting_confianza)),
            (columns::SHOOTING_POST_EMOTION, Text(&self.shooting_post_emotion)),
            (columns::CLIMBING_TIME_EASY, Float(self.climbing_time_easy)),
            (columns::CLIMBING_TIME_HARD, Float(self.climbing_time_hard)),
            (columns::CLIMBING_RENDIMIENTO, Int(self.climbing_rendimiento)),
            (columns::CLIMBING_RITMO, Int(self.climbing_ritmo)),
            (columns::CLIMBING_CONFIANZA, Int(self.climbing_confianza)),
            (columns::CLIMBING_POST_EMOTION, Text(&self.climbing_post_emotion)),
            (columns::RECOMENDACION_FINAL, Int(self.recomendacion_final)),
        ]
    }

    /// Look up a cell by column name.
    pub fn get(&self, name: &str) -> Option<FeatureValue<'_>> {
        self.cells()
            .into_iter()
            .find(|(col, _)| *col == name)
            .map(|(_, v)| v)
    }

    /// Numeric cells in row-definition order.
    pub fn numeric_cells(&self) -> Vec<(&'static str, f64)> {
        self.cells()
            .into_iter()
            .filter_map(|(name, v)| v.as_f64().map(|x| (name, x)))
            .collect()
    }

    /// Arrays for the 20 base columns, typed per [`columns::FEATURE_ROW`].
    pub(crate) fn arrays(&self) -> Vec<ArrayRef> {
        self.cells()
            .into_iter()
            .map(|(_, v)| -> ArrayRef {
                match v {
                    FeatureValue::Text(s) => Arc::new(StringArray::from(vec![s])),
                    FeatureValue::Float(x) => Arc::new(Float64Array::from(vec![x])),
                    FeatureValue::Int(x) => Arc::new(Int64Array::from(vec![x])),
                }
            })
            .collect()
    }
}

// ── Coercion helpers ──

/// Text column: strings verbatim, `null`/absent as `""`, other scalars as JSON text.
fn text(src: &SessionRecord, key: &str) -> String {
    match src.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Float column with default `0.0`.
fn float(src: &SessionRecord, key: &str) -> f64 {
    src.get(key).and_then(number).unwrap_or_else(|| {
        log_coerced(src, key, ColumnKind::Float);
        0.0
    })
}

/// Integer column with default `0`. Fractional input truncates toward zero.
fn int(src: &SessionRecord, key: &str) -> i64 {
    let value = src.get(key).and_then(|v| match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| parse_finite(s).map(|f| f.trunc() as i64))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    });
    value.unwrap_or_else(|| {
        log_coerced(src, key, ColumnKind::Int);
        0
    })
}

/// Pre-activity emotion rating; anything that is not a number becomes the
/// neutral midpoint, including an absent field.
fn emotion_rating(src: &SessionRecord, key: &str) -> f64 {
    src.get(key)
        .and_then(number)
        .unwrap_or(columns::PRE_EMOTION_MIDPOINT)
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_finite(s.trim()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Only unparseable present values are worth a log line; absence is normal.
fn log_coerced(src: &SessionRecord, key: &str, kind: ColumnKind) {
    if let Some(v) = src.get(key)
        && !v.is_null()
        && v.as_str() != Some("")
    {
        tracing::debug!(column = key, value = %v, ?kind, "unparseable numeric field, using 0");
    }
}
