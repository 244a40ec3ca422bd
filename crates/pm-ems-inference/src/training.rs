//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Training targets, label encoding, and deterministic train/test splits."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Model fitting happens outside this crate. What lives here is the
//! dataset side of it: which columns are features and targets, how the
//! categorical reason is encoded, and how rows are split for evaluation.

use std::str::FromStr;

use pm_ems_common::FailureReason;
use pm_ems_logging::{ems_debug, LogContext};
use pm_ems_sim::EquipmentRecord;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, Result};
use crate::features::FeatureRow;
use crate::predictor::{ConstantPredictor, Predictor};
use crate::service::InferenceService;

/// Target columns in the order models are trained.
pub const TARGET_COLUMNS: [&str; 4] = [
    "failure_probability",
    "failure_reason",
    "cost_implications",
    "updated_uptime",
];

pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
pub const DEFAULT_SPLIT_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetColumn {
    FailureProbability,
    FailureReason,
    CostImplications,
    UpdatedUptime,
}

impl TargetColumn {
    pub const ALL: [TargetColumn; 4] = [
        TargetColumn::FailureProbability,
        TargetColumn::FailureReason,
        TargetColumn::CostImplications,
        TargetColumn::UpdatedUptime,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TargetColumn::FailureProbability => TARGET_COLUMNS[0],
            TargetColumn::FailureReason => TARGET_COLUMNS[1],
            TargetColumn::CostImplications => TARGET_COLUMNS[2],
            TargetColumn::UpdatedUptime => TARGET_COLUMNS[3],
        }
    }

    pub fn is_classification(self) -> bool {
        matches!(self, TargetColumn::FailureReason)
    }
}

impl FromStr for TargetColumn {
    type Err = InferenceError;

    fn from_str(value: &str) -> Result<Self> {
        TargetColumn::ALL
            .into_iter()
            .find(|target| target.name() == value)
            .ok_or_else(|| InferenceError::MissingTargetColumn(value.to_owned()))
    }
}

/// Maps failure reasons to class indices in sorted label order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonEncoder {
    classes: Vec<FailureReason>,
}

impl ReasonEncoder {
    /// Encoder over the reasons that occur in `reasons`.
    pub fn fit<I: IntoIterator<Item = FailureReason>>(reasons: I) -> Self {
        let mut classes: Vec<FailureReason> = reasons.into_iter().collect();
        classes.sort_by(|a, b| a.as_ref().cmp(b.as_ref()));
        classes.dedup();
        Self { classes }
    }

    /// Encoder over every known reason.
    pub fn all() -> Self {
        Self::fit([
            FailureReason::Overheating,
            FailureReason::VoltageSurge,
            FailureReason::PressureLeak,
            FailureReason::ComponentWear,
            FailureReason::CalibrationDrift,
        ])
    }

    pub fn classes(&self) -> &[FailureReason] {
        &self.classes
    }

    pub fn encode(&self, reason: FailureReason) -> Option<usize> {
        self.classes.iter().position(|class| *class == reason)
    }

    /// Decode a predicted class, rounding to the nearest index.
    pub fn decode(&self, code: f64) -> Result<FailureReason> {
        let rounded = code.round();
        if !rounded.is_finite() || rounded < 0.0 {
            return Err(InferenceError::UnknownReasonCode(code));
        }
        self.classes
            .get(rounded as usize)
            .copied()
            .ok_or(InferenceError::UnknownReasonCode(code))
    }
}

/// Feature rows with their four target columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    pub features: Vec<FeatureRow>,
    pub failure_probability: Vec<f64>,
    pub failure_reason: Vec<usize>,
    pub cost_implications: Vec<f64>,
    pub updated_uptime: Vec<f64>,
    pub encoder: ReasonEncoder,
}

impl TrainingSet {
    pub fn from_records(records: &[EquipmentRecord]) -> Self {
        let encoder = ReasonEncoder::fit(records.iter().map(|record| record.failure_reason));
        let mut set = Self::empty(encoder);
        for record in records {
            set.features.push(FeatureRow::from_record(record));
            set.failure_probability.push(record.failure_probability);
            set.failure_reason
                .push(set.encoder.encode(record.failure_reason).unwrap_or_default());
            set.cost_implications
                .push(f64::from(record.cost_implications));
            set.updated_uptime.push(f64::from(record.updated_uptime));
        }
        set
    }

    fn empty(encoder: ReasonEncoder) -> Self {
        Self {
            features: Vec::new(),
            failure_probability: Vec::new(),
            failure_reason: Vec::new(),
            cost_implications: Vec::new(),
            updated_uptime: Vec::new(),
            encoder,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Target values as numbers; reasons are class indices.
    pub fn target(&self, column: TargetColumn) -> Vec<f64> {
        match column {
            TargetColumn::FailureProbability => self.failure_probability.clone(),
            TargetColumn::FailureReason => {
                self.failure_reason.iter().map(|code| *code as f64).collect()
            }
            TargetColumn::CostImplications => self.cost_implications.clone(),
            TargetColumn::UpdatedUptime => self.updated_uptime.clone(),
        }
    }

    pub fn target_by_name(&self, column: &str) -> Result<Vec<f64>> {
        Ok(self.target(column.parse()?))
    }

    /// Shuffle with `seed` and hold out `ceil(len * test_fraction)` rows.
    ///
    /// Both halves always keep at least one row.
    pub fn split(&self, test_fraction: f64, seed: u64) -> Result<TrainTestSplit> {
        let records = self.len();
        if records < 2 {
            return Err(InferenceError::DatasetTooSmall {
                records,
                required: 2,
            });
        }
        let wanted = (records as f64 * test_fraction).ceil();
        let test_len = if wanted.is_finite() {
            (wanted.max(1.0) as usize).min(records - 1)
        } else {
            1
        };

        let mut order: Vec<usize> = (0..records).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));
        let (test, train) = order.split_at(test_len);
        ems_debug!(
            context = LogContext::new().with_stage("training"),
            "split {} records into {} train / {} test",
            records,
            train.len(),
            test.len()
        );
        Ok(TrainTestSplit {
            train: self.subset(train),
            test: self.subset(test),
        })
    }

    pub fn default_split(&self) -> Result<TrainTestSplit> {
        self.split(DEFAULT_TEST_FRACTION, DEFAULT_SPLIT_SEED)
    }

    fn subset(&self, indices: &[usize]) -> Self {
        let mut set = Self::empty(self.encoder.clone());
        for &index in indices {
            set.features.push(self.features[index].clone());
            set.failure_probability.push(self.failure_probability[index]);
            set.failure_reason.push(self.failure_reason[index]);
            set.cost_implications.push(self.cost_implications[index]);
            set.updated_uptime.push(self.updated_uptime[index]);
        }
        set
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub train: TrainingSet,
    pub test: TrainingSet,
}

/// Fits one predictor per target column.
pub trait Trainer {
    fn fit(
        &self,
        features: &[FeatureRow],
        target: TargetColumn,
        values: &[f64],
    ) -> Result<Box<dyn Predictor>>;

    /// Fit all four targets and assemble an inference service.
    fn fit_service(&self, set: &TrainingSet) -> Result<InferenceService> {
        let mut fitted = Vec::with_capacity(TargetColumn::ALL.len());
        for target in TargetColumn::ALL {
            fitted.push(self.fit(&set.features, target, &set.target(target))?);
        }
        let mut fitted = fitted.into_iter();
        match (fitted.next(), fitted.next(), fitted.next(), fitted.next()) {
            (Some(probability), Some(reason), Some(cost), Some(uptime)) => Ok(
                InferenceService::new(probability, reason, cost, uptime, set.encoder.clone()),
            ),
            _ => Err(InferenceError::PredictorFailed {
                target: "all",
                message: "trainer returned fewer models than targets".into(),
            }),
        }
    }
}

/// Predicts the training mean, or the most frequent class for reasons.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineTrainer;

impl Trainer for BaselineTrainer {
    fn fit(
        &self,
        _features: &[FeatureRow],
        target: TargetColumn,
        values: &[f64],
    ) -> Result<Box<dyn Predictor>> {
        if values.is_empty() {
            return Err(InferenceError::DatasetTooSmall {
                records: 0,
                required: 1,
            });
        }
        let value = if target.is_classification() {
            most_frequent(values)
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        };
        Ok(Box::new(ConstantPredictor(value)))
    }
}

fn most_frequent(values: &[f64]) -> f64 {
    let mut counts: Vec<(i64, usize)> = Vec::new();
    for value in values {
        let code = value.round() as i64;
        match counts.iter_mut().find(|(class, _)| *class == code) {
            Some((_, count)) => *count += 1,
            None => counts.push((code, 1)),
        }
    }
    // Ties go to the lowest class index.
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    counts.first().map(|(code, _)| *code as f64).unwrap_or(0.0)
}

/// Held-out error of a fitted service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub samples: usize,
    pub failure_probability_mse: f64,
    pub cost_implications_mse: f64,
    pub updated_uptime_mse: f64,
    pub failure_reason_accuracy: f64,
}

pub fn evaluate(service: &InferenceService, test: &TrainingSet) -> Result<Evaluation> {
    if test.is_empty() {
        return Err(InferenceError::DatasetTooSmall {
            records: 0,
            required: 1,
        });
    }
    let mut probability = 0.0;
    let mut cost = 0.0;
    let mut uptime = 0.0;
    let mut correct = 0usize;
    for (index, row) in test.features.iter().enumerate() {
        let raw = service.raw_predictions(row)?;
        probability += (raw.failure_probability - test.failure_probability[index]).powi(2);
        cost += (raw.cost_implications - test.cost_implications[index]).powi(2);
        uptime += (raw.updated_uptime - test.updated_uptime[index]).powi(2);
        // Codes from different encoders are not comparable; compare labels.
        let predicted = service.encoder().decode(raw.failure_reason)?;
        if test.encoder.classes().get(test.failure_reason[index]) == Some(&predicted) {
            correct += 1;
        }
    }
    let samples = test.len() as f64;
    Ok(Evaluation {
        samples: test.len(),
        failure_probability_mse: probability / samples,
        cost_implications_mse: cost / samples,
        updated_uptime_mse: uptime / samples,
        failure_reason_accuracy: correct as f64 / samples,
    })
}
