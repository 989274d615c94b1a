/// Column names and Arrow schema for the per-session feature row.
///
/// Names match the keys the VR client writes into each session document,
/// so a record field and its feature column share one identifier.
pub mod columns {
    use arrow::datatypes::{DataType, Field, Schema};

    pub const SELECTED_SPORT: &str = "selectedSport";
    pub const GENDER: &str = "gender";
    pub const EMOTIONAL_STATE: &str = "emotionalState";

    pub const PRE_EMOTION_TIRO_EASY: &str = "preEmotionTiroEasy";
    pub const PRE_EMOTION_TIRO_HARD: &str = "preEmotionTiroHard";
    pub const PRE_EMOTION_MURO_EASY: &str = "preEmotionMuroEasy";
    pub const PRE_EMOTION_MURO_HARD: &str = "preEmotionMuroHard";

    pub const SHOOTING_SCORE_EASY: &str = "shootingScoreEasy";
    pub const SHOOTING_SCORE_HARD: &str = "shootingScoreHard";
    pub const SHOOTING_RENDIMIENTO: &str = "shootingRendimiento";
    pub const SHOOTING_RITMO: &str = "shootingRitmo";
    pub const SHOOTING_CONFIANZA: &str = "shootingConfianza";
    pub const SHOOTING_POST_EMOTION: &str = "shootingPostEmotion";

    pub const CLIMBING_TIME_EASY: &str = "climbingTimeEasy";
    pub const CLIMBING_TIME_HARD: &str = "climbingTimeHard";
    pub const CLIMBING_RENDIMIENTO: &str = "climbingRendimiento";
    pub const CLIMBING_RITMO: &str = "climbingRitmo";
    pub const CLIMBING_CONFIANZA: &str = "climbingConfianza";
    pub const CLIMBING_POST_EMOTION: &str = "climbingPostEmotion";

    pub const RECOMENDACION_FINAL: &str = "recomendacionFinal";

    /// Neutral rating substituted when a pre-activity emotion is not a number.
    pub const PRE_EMOTION_MIDPOINT: f64 = 3.0;

    pub const SELECTED_SPORT_ENCODED: &str = "selectedSport_encoded";
    pub const GENDER_ENCODED: &str = "gender_encoded";
    pub const EMOTIONAL_STATE_ENCODED: &str = "emotionalState_encoded";
    pub const SHOOTING_POST_EMOTION_ENCODED: &str = "shootingPostEmotion_encoded";
    pub const CLIMBING_POST_EMOTION_ENCODED: &str = "climbingPostEmotion_encoded";

    /// Storage type of a feature column.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ColumnKind {
        Text,
        Float,
        Int,
    }

    impl ColumnKind {
        pub fn data_type(&self) -> DataType {
            match self {
                Self::Text => DataType::Utf8,
                Self::Float => DataType::Float64,
                Self::Int => DataType::Int64,
            }
        }
    }

    /// The 20 feature-row columns in row-definition order.
    pub const FEATURE_ROW: [(&str, ColumnKind); 20] = [
        (SELECTED_SPORT, ColumnKind::Text),
        (GENDER, ColumnKind::Text),
        (EMOTIONAL_STATE, ColumnKind::Text),
        (PRE_EMOTION_TIRO_EASY, ColumnKind::Float),
        (PRE_EMOTION_TIRO_HARD, ColumnKind::Float),
        (PRE_EMOTION_MURO_EASY, ColumnKind::Float),
        (PRE_EMOTION_MURO_HARD, ColumnKind::Float),
        (SHOOTING_SCORE_EASY, ColumnKind::Float),
        (SHOOTING_SCORE_HARD, ColumnKind::Float),
        (SHOOTING_RENDIMIENTO, ColumnKind::Int),
        (SHOOTING_RITMO, ColumnKind::Int),
        (SHOOTING_CONFIANZA, ColumnKind::Int),
        (SHOOTING_POST_EMOTION, ColumnKind::Text),
        (CLIMBING_TIME_EASY, ColumnKind::Float),
        (CLIMBING_TIME_HARD, ColumnKind::Float),
        (CLIMBING_RENDIMIENTO, ColumnKind::Int),
        (CLIMBING_RITMO, ColumnKind::Int),
        (CLIMBING_CONFIANZA, ColumnKind::Int),
        (CLIMBING_POST_EMOTION, ColumnKind::Text),
        (RECOMENDACION_FINAL, ColumnKind::Int),
    ];

    /// Schema of the 20 base columns.
    pub fn feature_row_schema() -> Schema {
        Schema::new(
            FEATURE_ROW
                .iter()
                .map(|(name, kind)| Field::new(*name, kind.data_type(), false))
                .collect::<Vec<_>>(),
        )
    }

    /// Schema of a feature row followed by the given encoded columns (Int64).
    pub fn encoded_row_schema<'a>(encoded: impl IntoIterator<Item = &'a str>) -> Schema {
        let mut fields: Vec<Field> = feature_row_schema()
            .fields()
            .iter()
            .map(|f| f.as_ref().clone())
            .collect();
        fields.extend(
            encoded
                .into_iter()
                .map(|name| Field::new(name, DataType::Int64, false)),
        );
        Schema::new(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::columns;

    #[test]
    fn feature_row_schema_has_twenty_fields() {
        let schema = columns::feature_row_schema();
        assert_eq!(schema.fields().len(), 20);
        assert!(schema.field_with_name("preEmotionTiroEasy").is_ok());
        assert!(schema.field_with_name("recomendacionFinal").is_ok());
    }

    #[test]
    fn numeric_column_count() {
        let numeric = columns::FEATURE_ROW
            .iter()
            .filter(|(_, kind)| *kind != columns::ColumnKind::Text)
            .count();
        // 5 text columns: sport, gender, state, two post-emotions.
        assert_eq!(numeric, 15);
    }

    #[test]
    fn encoded_row_schema_appends_int_columns() {
        let schema = columns::encoded_row_schema([columns::GENDER_ENCODED]);
        assert_eq!(schema.fields().len(), 21);
        assert_eq!(
            schema.field(20).data_type(),
            &arrow::datatypes::DataType::Int64
        );
    }
}
