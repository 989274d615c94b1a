//! Vertical card display for session feature rows.
//!
//! Renders a single-row RecordBatch grouped by activity, the same layout
//! the VR client uses for its questionnaire.

use arrow::array::Array;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use arrow::util::pretty::pretty_format_batches;
use sportmind_ai::SelectedFeatures;
use sportmind_core::RegulationPrediction;
use sportmind_core::columns::*;

// ── Schema section groupings ──

const PROFILE: &[&str] = &[SELECTED_SPORT, GENDER, EMOTIONAL_STATE];

const SHOOTING: &[&str] = &[
    PRE_EMOTION_TIRO_EASY,
    PRE_EMOTION_TIRO_HARD,
    SHOOTING_SCORE_EASY,
    SHOOTING_SCORE_HARD,
    SHOOTING_RENDIMIENTO,
    SHOOTING_RITMO,
    SHOOTING_CONFIANZA,
    SHOOTING_POST_EMOTION,
];

const CLIMBING: &[&str] = &[
    PRE_EMOTION_MURO_EASY,
    PRE_EMOTION_MURO_HARD,
    CLIMBING_TIME_EASY,
    CLIMBING_TIME_HARD,
    CLIMBING_RENDIMIENTO,
    CLIMBING_RITMO,
    CLIMBING_CONFIANZA,
    CLIMBING_POST_EMOTION,
];

const OUTCOME: &[&str] = &[RECOMENDACION_FINAL];

const ENCODED: &[&str] = &[
    SELECTED_SPORT_ENCODED,
    GENDER_ENCODED,
    EMOTIONAL_STATE_ENCODED,
    SHOOTING_POST_EMOTION_ENCODED,
    CLIMBING_POST_EMOTION_ENCODED,
];

// ── Public API ──

/// Print one session's feature row as a vertical card grouped by activity.
pub fn print_feature_card(title: &str, batch: &RecordBatch) {
    println!("=== {title} ===");
    println!();

    print_section(batch, "Profile", PROFILE);
    print_section(batch, "Shooting", SHOOTING);
    print_section(batch, "Climbing", CLIMBING);
    print_section(batch, "Outcome", OUTCOME);
    print_section(batch, "Encoded", ENCODED);
}

/// Print the classifier input vector in model order.
pub fn print_selected(features: &SelectedFeatures) {
    println!("Model input ({} features)", features.len());
    for (name, value) in features.names().iter().zip(features.values()) {
        println!("  {name:<30} {value}");
    }
    println!();
}

pub fn print_prediction(prediction: Option<&RegulationPrediction>) {
    match prediction {
        Some(p) => match p.confidence {
            Some(c) => println!(
                "Regulation: {} ({}), confidence {:.1}%",
                p.label,
                p.prediction,
                c * 100.0
            ),
            None => println!("Regulation: {} ({})", p.label, p.prediction),
        },
        None => println!("Regulation: (no prediction)"),
    }
    println!();
}

/// Render rows as one table per run of identical schemas.
pub fn format_feature_table(batches: &[RecordBatch]) -> anyhow::Result<String> {
    let mut out = String::new();
    for run in batches.chunk_by(|a, b| a.schema() == b.schema()) {
        out.push_str(&pretty_format_batches(run)?.to_string());
        out.push('\n');
    }
    Ok(out)
}

// ── Section rendering ──

fn print_section(batch: &RecordBatch, header: &str, cols: &[&str]) {
    let schema = batch.schema();
    let present: Vec<(&str, usize)> = cols
        .iter()
        .filter_map(|&col| schema.index_of(col).ok().map(|i| (col, i)))
        .filter(|&(_, i)| !batch.column(i).is_null(0))
        .collect();
    if present.is_empty() {
        return;
    }

    let options = FormatOptions::default();
    println!("{header}");
    for (col_name, idx) in present {
        match ArrayFormatter::try_new(batch.column(idx).as_ref(), &options) {
            Ok(fmt) => {
                let value = fmt.value(0).to_string();
                if value.is_empty() {
                    println!("  {col_name:<30} (empty)");
                } else {
                    println!("  {col_name:<30} {value}");
                }
            }
            Err(_) => println!("  {col_name:<30} (unprintable)"),
        }
    }
    println!();
}
