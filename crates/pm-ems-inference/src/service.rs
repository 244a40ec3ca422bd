//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Four-predictor inference service and its request/response contract."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use pm_ems_common::{EquipmentHealth, FailureReason, MaintenanceLevel, SimulatorConfig};
use pm_ems_sim::SimulationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{InferenceError, Result};
use crate::features::FeatureRow;
use crate::predictor::{Predictor, RulePredictor};
use crate::training::{ReasonEncoder, TargetColumn};

const RECENT_ERROR_LIMIT: usize = 20;

/// Prediction for one feature row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub equipment_health: EquipmentHealth,
    pub maintenance_level: MaintenanceLevel,
    pub failure_probability: f64,
    pub failure_reason: FailureReason,
    pub cost_implications: f64,
    pub updated_uptime: f64,
}

/// Undecoded output of the four predictors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPredictions {
    pub failure_probability: f64,
    pub failure_reason: f64,
    pub cost_implications: f64,
    pub updated_uptime: f64,
}

/// Body an API wrapper returns for a rejected request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: String,
}

impl From<&InferenceError> for ErrorResponse {
    fn from(err: &InferenceError) -> Self {
        Self {
            status: err.status_code(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub predictions_served: u64,
    pub requests_rejected: u64,
    pub recent_errors: Vec<String>,
}

/// Holds one predictor per target and maps their output to the response.
pub struct InferenceService {
    probability: Box<dyn Predictor>,
    reason: Box<dyn Predictor>,
    cost: Box<dyn Predictor>,
    uptime: Box<dyn Predictor>,
    encoder: ReasonEncoder,
    start: Instant,
    served: AtomicU64,
    rejected: AtomicU64,
    recent_errors: Mutex<VecDeque<String>>,
}

impl fmt::Debug for InferenceService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceService")
            .field("encoder", &self.encoder)
            .field("served", &self.served)
            .field("rejected", &self.rejected)
            .finish_non_exhaustive()
    }
}

impl InferenceService {
    pub fn new(
        probability: Box<dyn Predictor>,
        reason: Box<dyn Predictor>,
        cost: Box<dyn Predictor>,
        uptime: Box<dyn Predictor>,
        encoder: ReasonEncoder,
    ) -> Self {
        Self {
            probability,
            reason,
            cost,
            uptime,
            encoder,
            start: Instant::now(),
            served: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            recent_errors: Mutex::new(VecDeque::with_capacity(RECENT_ERROR_LIMIT)),
        }
    }

    /// Service backed by the generator's own rules.
    pub fn rule_based(config: &SimulatorConfig) -> std::result::Result<Self, SimulationError> {
        let predictor = |target| RulePredictor::new(config, target).map(Box::new);
        Ok(Self::new(
            predictor(TargetColumn::FailureProbability)?,
            predictor(TargetColumn::FailureReason)?,
            predictor(TargetColumn::CostImplications)?,
            predictor(TargetColumn::UpdatedUptime)?,
            ReasonEncoder::all(),
        ))
    }

    pub fn encoder(&self) -> &ReasonEncoder {
        &self.encoder
    }

    pub fn raw_predictions(&self, row: &FeatureRow) -> Result<RawPredictions> {
        let run = |target: TargetColumn, predictor: &dyn Predictor| -> Result<f64> {
            let value = predictor.predict(row)?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(InferenceError::PredictorFailed {
                    target: target.name(),
                    message: format!("non-finite output {value}"),
                })
            }
        };
        Ok(RawPredictions {
            failure_probability: run(TargetColumn::FailureProbability, self.probability.as_ref())?,
            failure_reason: run(TargetColumn::FailureReason, self.reason.as_ref())?,
            cost_implications: run(TargetColumn::CostImplications, self.cost.as_ref())?,
            updated_uptime: run(TargetColumn::UpdatedUptime, self.uptime.as_ref())?,
        })
    }

    /// Validate `row`, run all four predictors, and derive the tier.
    pub fn predict(&self, row: &FeatureRow) -> Result<InferenceResponse> {
        let outcome = row.validate().and_then(|()| self.respond(row));
        self.track(&outcome);
        outcome
    }

    /// Parse a JSON feature row and predict it.
    pub fn predict_json(&self, value: &Value) -> Result<InferenceResponse> {
        match FeatureRow::from_json(value) {
            Ok(row) => self.predict(&row),
            Err(err) => {
                let outcome: Result<InferenceResponse> = Err(err);
                self.track(&outcome);
                outcome
            }
        }
    }

    /// Predict every row of a batch; the first failure rejects the batch.
    pub fn predict_batch(&self, value: &Value) -> Result<Vec<InferenceResponse>> {
        let rows = match FeatureRow::batch_from_json(value) {
            Ok(rows) => rows,
            Err(err) => {
                let outcome: Result<Vec<InferenceResponse>> = Err(err);
                self.track(&outcome);
                return outcome;
            }
        };
        rows.iter().map(|row| self.predict(row)).collect()
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            status: "ok".into(),
            version: pm_ems_common::VERSION.to_owned(),
            uptime_seconds: self.start.elapsed().as_secs(),
            predictions_served: self.served.load(Ordering::Relaxed),
            requests_rejected: self.rejected.load(Ordering::Relaxed),
            recent_errors: self.recent_errors.lock().iter().cloned().collect(),
        }
    }

    fn respond(&self, row: &FeatureRow) -> Result<InferenceResponse> {
        let raw = self.raw_predictions(row)?;
        let equipment_health = EquipmentHealth::from_probability(raw.failure_probability);
        Ok(InferenceResponse {
            equipment_health,
            maintenance_level: equipment_health.maintenance_level(),
            failure_probability: raw.failure_probability,
            failure_reason: self.encoder.decode(raw.failure_reason)?,
            cost_implications: raw.cost_implications,
            updated_uptime: raw.updated_uptime,
        })
    }

    fn track<T>(&self, outcome: &Result<T>) {
        match outcome {
            Ok(_) => {
                self.served.fetch_add(1, Ordering::Relaxed);
                debug!("prediction served");
            }
            Err(err) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(status = err.status_code(), error = %err, "prediction rejected");
                let mut recent = self.recent_errors.lock();
                if recent.len() == RECENT_ERROR_LIMIT {
                    recent.pop_front();
                }
                recent.push_back(err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::ConstantPredictor;
    use serde_json::json;

    fn rules() -> InferenceService {
        InferenceService::rule_based(&SimulatorConfig::default()).unwrap()
    }

    fn constant(probability: f64, reason: f64) -> InferenceService {
        InferenceService::new(
            Box::new(ConstantPredictor(probability)),
            Box::new(ConstantPredictor(reason)),
            Box::new(ConstantPredictor(2500.0)),
            Box::new(ConstantPredictor(1800.0)),
            ReasonEncoder::all(),
        )
    }

    fn request() -> Value {
        json!({
            "equipment_type": "CT Scanner",
            "temperature_avg": 35.0,
            "humidity_avg": 40.0,
            "last_maintenance_days": 100,
            "uptime_hours": 1000,
            "sensor_1": 0.5,
            "sensor_2": 0.5,
            "vibration": 1.0,
            "voltage_fluctuation": 0.2,
            "pressure": 90.0
        })
    }

    #[test]
    fn rule_service_reproduces_generator_labels() {
        let response = rules().predict_json(&request()).unwrap();
        assert_eq!(response.failure_probability, 0.40);
        assert_eq!(response.equipment_health, EquipmentHealth::Moderate);
        assert_eq!(response.maintenance_level, MaintenanceLevel::Medium);
        assert!(response.failure_reason.is_residual());
        assert_eq!(response.cost_implications, 6000.0);
        assert_eq!(response.updated_uptime, 1900.0);
    }

    #[test]
    fn tier_follows_shared_cutpoints() {
        let row = FeatureRow::from_json(&request()).unwrap();
        for (probability, health) in [
            (0.29, EquipmentHealth::Good),
            (0.3, EquipmentHealth::Moderate),
            (0.59, EquipmentHealth::Moderate),
            (0.6, EquipmentHealth::Critical),
            (1.2, EquipmentHealth::Critical),
        ] {
            let response = constant(probability, 2.0).predict(&row).unwrap();
            assert_eq!(response.equipment_health, health);
            assert_eq!(response.failure_reason, FailureReason::Overheating);
        }
    }

    #[test]
    fn malformed_rows_are_rejected_and_tracked() {
        let service = rules();
        let err = service
            .predict_json(&json!(["CT Scanner", 35.0]))
            .unwrap_err();
        assert_eq!(ErrorResponse::from(&err).status, 400);

        let status = service.status();
        assert_eq!(status.predictions_served, 0);
        assert_eq!(status.requests_rejected, 1);
        assert_eq!(status.recent_errors.len(), 1);
        assert!(status.recent_errors[0].contains("expected 10"));
    }

    #[test]
    fn predictor_failures_surface_as_server_errors() {
        let row = FeatureRow::from_json(&request()).unwrap();
        let err = constant(f64::NAN, 0.0).predict(&row).unwrap_err();
        assert_eq!(err.status_code(), 500);
        let err = constant(0.1, 9.0).predict(&row).unwrap_err();
        assert_eq!(err, InferenceError::UnknownReasonCode(9.0));
    }

    #[test]
    fn batches_predict_every_row() {
        let service = rules();
        let responses = service
            .predict_batch(&json!({ "data": [request(), request()] }))
            .unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(service.status().predictions_served, 2);
    }

    #[test]
    fn recent_errors_are_bounded() {
        let service = rules();
        for _ in 0..(RECENT_ERROR_LIMIT + 5) {
            let _ = service.predict_json(&json!(null));
        }
        let status = service.status();
        assert_eq!(status.recent_errors.len(), RECENT_ERROR_LIMIT);
        assert_eq!(status.requests_rejected, (RECENT_ERROR_LIMIT + 5) as u64);
    }
}
