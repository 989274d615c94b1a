//! Inference layer: turns a session record into an emotional-regulation prediction.

pub mod bundle;
pub mod encoder;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod predictor;
pub mod scaler;
pub mod select;

pub use bundle::{ArtifactBundle, BundleError};
pub use encoder::{EncodedRow, EncoderSet, EncodingError, LabelEncoder};
pub use features::FeatureRow;
pub use model::{Classifier, ClassifierModel, ModelError};
pub use pipeline::{PipelineError, RegulationPipeline};
pub use predictor::PredictionError;
pub use scaler::{Scaler, ScalerError};
pub use select::{SelectedFeatures, SelectionError, select_and_scale};
