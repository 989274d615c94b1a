//! Feature selection and scaling.
//!
//! Turns an [`EncodedRow`] into the ordered numeric vector the classifier
//! consumes. A bundle that declares its training feature order is followed
//! exactly; otherwise every numeric base column is taken in row-definition
//! order, followed by the encoded columns in the order they were added.

use thiserror::Error;

use crate::encoder::EncodedRow;
use crate::scaler::{Scaler, ScalerError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("declared features missing from row: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),
    #[error("declared feature {0} is not numeric")]
    NonNumeric(String),
    #[error(transparent)]
    Scaler(#[from] ScalerError),
}

/// The classifier input for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFeatures {
    names: Vec<String>,
    values: Vec<f64>,
}

impl SelectedFeatures {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Select columns from `row` and apply `scaler` when present.
///
/// An empty `feature_order` selects the fallback column set. A declared
/// order naming any absent column fails; columns are never zero-filled.
pub fn select_and_scale(
    row: &EncodedRow,
    feature_order: &[String],
    scaler: Option<&Scaler>,
) -> Result<SelectedFeatures, SelectionError> {
    let (names, values) = if feature_order.is_empty() {
        fallback_columns(row)
    } else {
        declared_columns(row, feature_order)?
    };

    let values = match scaler {
        Some(s) => s.transform(&values)?,
        None => values,
    };

    Ok(SelectedFeatures { names, values })
}

fn declared_columns(
    row: &EncodedRow,
    feature_order: &[String],
) -> Result<(Vec<String>, Vec<f64>), SelectionError> {
    let missing: Vec<String> = feature_order
        .iter()
        .filter(|name| row.get(name).is_none())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(SelectionError::MissingFeatures(missing));
    }

    let mut values = Vec::with_capacity(feature_order.len());
    for name in feature_order {
        let value = row
            .get(name)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| SelectionError::NonNumeric(name.clone()))?;
        values.push(value);
    }
    Ok((feature_order.to_vec(), values))
}

fn fallback_columns(row: &EncodedRow) -> (Vec<String>, Vec<f64>) {
    let base = row.row().numeric_cells();
    let mut names = Vec::with_capacity(base.len() + row.encoded().len());
    let mut values = Vec::with_capacity(names.capacity());

    for (name, v) in base {
        names.push(name.to_string());
        values.push(v);
    }
    for &(name, code) in row.encoded() {
        names.push(name.to_string());
        values.push(code as f64);
    }
    (names, values)
}
