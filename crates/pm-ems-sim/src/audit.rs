//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Label invariant checks over generated or loaded datasets."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Re-derives every rule-determined column of a record and reports the
//! rows that disagree. Random columns are checked against their ranges.

use pm_ems_common::{EquipmentHealth, SimulatorConfig};
use serde::Serialize;
use thiserror::Error;

use crate::cascade::FailureCascade;
use crate::error::Result;
use crate::labeling::LabelRules;
use crate::record::EquipmentRecord;

const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// A single broken label invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
pub enum InvariantViolation {
    #[error("{equipment_id}: failure probability {probability} outside [0, 1]")]
    ProbabilityOutOfBounds { equipment_id: String, probability: f64 },
    #[error("{equipment_id}: failure probability {found} but the cascade yields {expected}")]
    ProbabilityMismatch {
        equipment_id: String,
        expected: f64,
        found: f64,
    },
    #[error("{equipment_id}: labels {found_health}/{found_level} but probability implies {expected_health}")]
    TierMismatch {
        equipment_id: String,
        expected_health: String,
        found_health: String,
        found_level: String,
    },
    #[error("{equipment_id}: failure reason {found} but readings imply {expected}")]
    ReasonMismatch {
        equipment_id: String,
        expected: String,
        found: String,
    },
    #[error("{equipment_id}: cost {cost} outside {min}..={max} for {health}")]
    CostOutOfRange {
        equipment_id: String,
        health: String,
        cost: u32,
        min: u32,
        max: u32,
    },
    #[error("{equipment_id}: uptime increment {increment} outside {min}..={max} for {health}")]
    UptimeIncrementOutOfRange {
        equipment_id: String,
        health: String,
        increment: i64,
        min: u32,
        max: u32,
    },
}

/// Outcome of auditing a set of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditReport {
    pub checked: usize,
    pub violations: Vec<InvariantViolation>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check every record against the rules in `config`.
pub fn audit(config: &SimulatorConfig, records: &[EquipmentRecord]) -> Result<AuditReport> {
    config.validate()?;
    let cascade = FailureCascade::from_config(config)?;
    let labels = LabelRules::new(config.labels.clone());

    let mut report = AuditReport {
        checked: records.len(),
        violations: Vec::new(),
    };
    for record in records {
        check_record(&cascade, &labels, record, &mut report.violations);
    }
    Ok(report)
}

fn check_record(
    cascade: &FailureCascade,
    labels: &LabelRules,
    record: &EquipmentRecord,
    violations: &mut Vec<InvariantViolation>,
) {
    let id = &record.equipment_id;
    let probability = record.failure_probability;
    if !(0.0..=1.0).contains(&probability) {
        violations.push(InvariantViolation::ProbabilityOutOfBounds {
            equipment_id: id.clone(),
            probability,
        });
    }

    let reading = record.reading();
    let expected = cascade.assess(&reading).probability;
    if (expected - probability).abs() > PROBABILITY_TOLERANCE {
        violations.push(InvariantViolation::ProbabilityMismatch {
            equipment_id: id.clone(),
            expected,
            found: probability,
        });
    }

    let health = EquipmentHealth::from_probability(probability);
    if record.equipment_health != health || record.maintenance_level != health.maintenance_level() {
        violations.push(InvariantViolation::TierMismatch {
            equipment_id: id.clone(),
            expected_health: health.to_string(),
            found_health: record.equipment_health.to_string(),
            found_level: record.maintenance_level.to_string(),
        });
    }

    match labels.deterministic_reason(&reading) {
        Some(reason) if reason != record.failure_reason => {
            violations.push(InvariantViolation::ReasonMismatch {
                equipment_id: id.clone(),
                expected: reason.to_string(),
                found: record.failure_reason.to_string(),
            });
        }
        None if !record.failure_reason.is_residual() => {
            violations.push(InvariantViolation::ReasonMismatch {
                equipment_id: id.clone(),
                expected: "Component Wear or Calibration Drift".into(),
                found: record.failure_reason.to_string(),
            });
        }
        _ => {}
    }

    // Cost and uptime ranges follow the stored tier, which the tier check
    // above already ties to the probability.
    let tier = record.equipment_health;
    let cost = labels.cost_range(tier);
    if !cost.contains(record.cost_implications) {
        violations.push(InvariantViolation::CostOutOfRange {
            equipment_id: id.clone(),
            health: tier.to_string(),
            cost: record.cost_implications,
            min: cost.min,
            max: cost.max,
        });
    }

    let uptime = labels.uptime_increment_range(tier);
    let increment = record.uptime_increment();
    if increment < i64::from(uptime.min) || increment > i64::from(uptime.max) {
        violations.push(InvariantViolation::UptimeIncrementOutOfRange {
            equipment_id: id.clone(),
            health: tier.to_string(),
            increment,
            min: uptime.min,
            max: uptime.max,
        });
    }
}
