//! Classifier models exported by the training pipeline.
//!
//! Every model predicts a class label for one sample. Models that can
//! estimate class probabilities also implement
//! [`Classifier::predict_proba`]; the rest return `None` from it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("model expects {expected} features, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("model declares {classes} classes but produces {outputs} outputs")]
    ClassCountMismatch { classes: usize, outputs: usize },
    #[error("malformed decision tree: {0}")]
    MalformedTree(String),
    #[error("random forest has no estimators")]
    EmptyEnsemble,
}

/// Single-sample classifier.
pub trait Classifier {
    /// Number of input features, when the model records it.
    fn n_features(&self) -> Option<usize>;

    /// Predicted class label for `x`.
    fn predict(&self, x: &[f64]) -> Result<i64, ModelError>;

    /// Per-class probabilities aligned with the model's classes, or `None`
    /// when the model has no probability estimator.
    fn predict_proba(&self, x: &[f64]) -> Option<Result<Vec<f64>, ModelError>>;
}

fn binary_classes() -> Vec<i64> {
    vec![0, 1]
}

/// Any model a bundle can carry, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassifierModel {
    LogisticRegression(LinearModel),
    LinearSvc(LinearModel),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
}

impl ClassifierModel {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LogisticRegression(_) => "logistic_regression",
            Self::LinearSvc(_) => "linear_svc",
            Self::DecisionTree(_) => "decision_tree",
            Self::RandomForest(_) => "random_forest",
        }
    }

    /// Check the class layout inference relies on: exactly two classes on
    /// the model and on every tree of a forest.
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            Self::LogisticRegression(m) | Self::LinearSvc(m) => check_binary(&m.classes),
            Self::DecisionTree(t) => check_binary(&t.classes),
            Self::RandomForest(f) => {
                check_binary(&f.classes)?;
                if f.estimators.is_empty() {
                    return Err(ModelError::EmptyEnsemble);
                }
                f.estimators.iter().try_for_each(|t| check_binary(&t.classes))
            }
        }
    }
}

impl Classifier for ClassifierModel {
    fn n_features(&self) -> Option<usize> {
        match self {
            Self::LogisticRegression(m) | Self::LinearSvc(m) => Some(m.coef.len()),
            Self::DecisionTree(t) => t.n_features,
            Self::RandomForest(f) => f.n_features,
        }
    }

    fn predict(&self, x: &[f64]) -> Result<i64, ModelError> {
        match self {
            Self::LogisticRegression(m) | Self::LinearSvc(m) => m.predict(x),
            Self::DecisionTree(t) => t.predict(x),
            Self::RandomForest(f) => f.predict(x),
        }
    }

    fn predict_proba(&self, x: &[f64]) -> Option<Result<Vec<f64>, ModelError>> {
        match self {
            Self::LogisticRegression(m) => Some(m.proba(x)),
            Self::LinearSvc(_) => None,
            Self::DecisionTree(t) => Some(t.proba(x)),
            Self::RandomForest(f) => Some(f.proba(x)),
        }
    }
}

// ── Linear models ──

/// Binary linear model: `z = coef · x + intercept`, class 1 when `z > 0`.
///
/// As logistic regression the probability of class 1 is `sigmoid(z)`; as a
/// linear SVM it has no probability estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coef: Vec<f64>,
    pub intercept: f64,
    #[serde(default = "binary_classes")]
    pub classes: Vec<i64>,
}

impl LinearModel {
    fn decision(&self, x: &[f64]) -> Result<f64, ModelError> {
        check_dim(self.coef.len(), x.len())?;
        check_binary(&self.classes)?;
        Ok(self.coef.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + self.intercept)
    }

    fn predict(&self, x: &[f64]) -> Result<i64, ModelError> {
        let z = self.decision(x)?;
        Ok(self.classes[usize::from(z > 0.0)])
    }

    fn proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        let p = sigmoid(self.decision(x)?);
        Ok(vec![1.0 - p, p])
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

// ── Trees ──

/// One node of a flattened decision tree.
///
/// Split nodes send samples with `x[feature] <= threshold` to `left`.
/// Leaves carry per-class weights (counts or fractions) in `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default)]
    pub feature: Option<usize>,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub left: Option<usize>,
    #[serde(default)]
    pub right: Option<usize>,
    #[serde(default)]
    pub value: Vec<f64>,
}

impl TreeNode {
    fn is_leaf(&self) -> bool {
        self.feature.is_none()
    }
}

/// A decision tree with the root at `nodes[0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
    #[serde(default = "binary_classes")]
    pub classes: Vec<i64>,
    #[serde(default)]
    pub n_features: Option<usize>,
}

impl DecisionTree {
    fn leaf(&self, x: &[f64]) -> Result<&TreeNode, ModelError> {
        if let Some(n) = self.n_features {
            check_dim(n, x.len())?;
        }
        let mut idx = 0usize;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..=self.nodes.len() {
            let node = self
                .nodes
                .get(idx)
                .ok_or_else(|| ModelError::MalformedTree(format!("node {idx} out of range")))?;
            let Some(feature) = node.feature else {
                return Ok(node);
            };
            let v = x.get(feature).ok_or(ModelError::DimensionMismatch {
                expected: feature + 1,
                found: x.len(),
            })?;
            let next = if *v <= node.threshold {
                node.left
            } else {
                node.right
            };
            idx = next.ok_or_else(|| {
                ModelError::MalformedTree(format!("split node {idx} missing a child"))
            })?;
        }
        Err(ModelError::MalformedTree("cycle in node links".into()))
    }

    fn proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        let leaf = self.leaf(x)?;
        debug_assert!(leaf.is_leaf());
        if leaf.value.len() != self.classes.len() {
            return Err(ModelError::ClassCountMismatch {
                classes: self.classes.len(),
                outputs: leaf.value.len(),
            });
        }
        Ok(normalized(&leaf.value))
    }

    fn predict(&self, x: &[f64]) -> Result<i64, ModelError> {
        let p = self.proba(x)?;
        class_at(&self.classes, &p)
    }
}

/// Bagged trees; probabilities are the mean of the trees' probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub estimators: Vec<DecisionTree>,
    #[serde(default = "binary_classes")]
    pub classes: Vec<i64>,
    #[serde(default)]
    pub n_features: Option<usize>,
}

impl RandomForest {
    fn proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        if self.estimators.is_empty() {
            return Err(ModelError::EmptyEnsemble);
        }
        if let Some(n) = self.n_features {
            check_dim(n, x.len())?;
        }
        let mut sum = vec![0.0f64; self.classes.len()];
        for tree in &self.estimators {
            let p = tree.proba(x)?;
            if p.len() != sum.len() {
                return Err(ModelError::ClassCountMismatch {
                    classes: sum.len(),
                    outputs: p.len(),
                });
            }
            for (acc, v) in sum.iter_mut().zip(p) {
                *acc += v;
            }
        }
        let n = self.estimators.len() as f64;
        Ok(sum.into_iter().map(|s| s / n).collect())
    }

    fn predict(&self, x: &[f64]) -> Result<i64, ModelError> {
        let p = self.proba(x)?;
        class_at(&self.classes, &p)
    }
}

// ── Helpers ──

fn check_dim(expected: usize, found: usize) -> Result<(), ModelError> {
    if expected != found {
        return Err(ModelError::DimensionMismatch { expected, found });
    }
    Ok(())
}

fn check_binary(classes: &[i64]) -> Result<(), ModelError> {
    if classes.len() != 2 {
        return Err(ModelError::ClassCountMismatch {
            classes: classes.len(),
            outputs: 2,
        });
    }
    Ok(())
}

/// Class with the highest probability.
fn class_at(classes: &[i64], p: &[f64]) -> Result<i64, ModelError> {
    classes
        .get(argmax(p))
        .copied()
        .ok_or(ModelError::ClassCountMismatch {
            classes: classes.len(),
            outputs: p.len(),
        })
}

/// Scale weights to sum to 1; all-zero weights stay zero.
fn normalized(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        weights.iter().map(|w| w / total).collect()
    } else {
        weights.to_vec()
    }
}

/// Index of the largest value; ties go to the lowest index.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}
