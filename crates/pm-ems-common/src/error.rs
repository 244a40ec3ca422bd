//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Configuration validation errors."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use thiserror::Error;

use crate::equipment::EquipmentType;

/// Structural problems detected while validating a [`crate::SimulatorConfig`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sample count must be greater than zero")]
    ZeroSamples,
    #[error("noise sigma must be finite and positive, got {0}")]
    InvalidNoiseSigma(f64),
    #[error("range '{name}' is invalid: min {min} must not exceed max {max} and both must be finite")]
    InvalidRange { name: String, min: f64, max: f64 },
    #[error("no failure thresholds configured for equipment type '{0}'")]
    MissingThresholds(EquipmentType),
    #[error("threshold '{field}' for '{equipment}' must be finite and non-negative, got {value}")]
    InvalidThreshold {
        equipment: EquipmentType,
        field: &'static str,
        value: f64,
    },
    #[error("cascade increment '{name}' must be finite and non-negative, got {value}")]
    InvalidIncrement { name: String, value: f64 },
    #[error("label trigger '{name}' must be finite, got {value}")]
    InvalidTrigger { name: String, value: f64 },
    #[error("cost range for {upper} starts below the cost range for {lower}")]
    InvertedCostRanges {
        lower: &'static str,
        upper: &'static str,
    },
    #[error("uptime increment '{0}' must be strictly positive")]
    NonPositiveUptimeIncrement(&'static str),
    #[error("uptime_hours max {max_uptime} plus increment {increment} overflows u32")]
    UptimeOverflow { max_uptime: u32, increment: u32 },
}
