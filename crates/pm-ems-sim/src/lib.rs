//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "01-bootstrap"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Equipment telemetry generator, dataset I/O, and label audit exports."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Synthetic equipment telemetry generator for the PM-EMS project.
//!
//! A dataset is produced in two passes. The per-record pass samples sensor
//! and environment readings ([`sampler`]) and scores them through the
//! failure-probability cascade ([`cascade`]). Once every record has a final
//! health tier, the labeling pass ([`labeling`]) assigns failure reasons,
//! maintenance cost, and post-maintenance uptime. [`generator`] drives both
//! passes; [`dataset`] serializes the result and [`audit`] re-checks the
//! label invariants on any set of records.

pub mod audit;
pub mod cascade;
pub mod dataset;
pub mod error;
pub mod generator;
pub mod labeling;
pub mod record;
pub mod sampler;

pub use audit::{audit, AuditReport, InvariantViolation};
pub use cascade::{FailureAssessment, FailureCascade, RiskFactor};
pub use dataset::{Dataset, DatasetFormat, DatasetSummary};
pub use error::{Result, SimulationError};
pub use generator::{seeded_rng, AssessedReading, DatasetGenerator};
pub use labeling::LabelRules;
pub use record::{EquipmentRecord, COLUMNS};
pub use sampler::{MeasurementSampler, SensorReading};
