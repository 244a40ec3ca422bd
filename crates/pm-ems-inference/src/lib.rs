//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "01-bootstrap"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Inference contract module exports."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Consumer side of the generated datasets.
//!
//! Models are fitted elsewhere and plugged in through [`Predictor`] and
//! [`Trainer`]. [`InferenceService`] validates incoming feature rows,
//! runs the four predictors, and maps the predicted probability to the same
//! health tiers the generator uses.

pub mod error;
pub mod features;
pub mod predictor;
pub mod service;
pub mod training;

pub use error::{InferenceError, Result};
pub use features::{FeatureRow, FEATURE_COLUMNS, NUMERIC_COLUMNS};
pub use predictor::{ConstantPredictor, Predictor, RulePredictor};
pub use service::{ErrorResponse, InferenceResponse, InferenceService, RawPredictions, ServiceStatus};
pub use training::{
    evaluate, BaselineTrainer, Evaluation, ReasonEncoder, TargetColumn, Trainer, TrainTestSplit,
    TrainingSet, DEFAULT_SPLIT_SEED, DEFAULT_TEST_FRACTION, TARGET_COLUMNS,
};
