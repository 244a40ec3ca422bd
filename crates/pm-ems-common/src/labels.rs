//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Health tiers, maintenance levels, and failure reason labels."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Label vocabulary and the probability-to-tier mapping.
//!
//! [`EquipmentHealth::from_probability`] is the only place the tier
//! cutpoints are applied. The simulator, the dataset audit, and the
//! inference contract all classify through it.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Probabilities at or above this value are at least `Moderate`.
pub const MODERATE_CUTPOINT: f64 = 0.3;
/// Probabilities at or above this value are `Critical`.
pub const CRITICAL_CUTPOINT: f64 = 0.6;

/// Equipment health tier derived from the failure probability.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum EquipmentHealth {
    Good,
    Moderate,
    Critical,
}

impl EquipmentHealth {
    /// Classify a failure probability.
    ///
    /// `p < 0.3` is `Good`, `0.3 <= p < 0.6` is `Moderate`, anything else is
    /// `Critical`. A NaN input lands in `Critical`; callers validate
    /// finiteness before classifying.
    pub fn from_probability(probability: f64) -> Self {
        if probability < MODERATE_CUTPOINT {
            EquipmentHealth::Good
        } else if probability < CRITICAL_CUTPOINT {
            EquipmentHealth::Moderate
        } else {
            EquipmentHealth::Critical
        }
    }

    /// Maintenance level paired 1:1 with the health tier.
    pub fn maintenance_level(self) -> MaintenanceLevel {
        match self {
            EquipmentHealth::Good => MaintenanceLevel::Low,
            EquipmentHealth::Moderate => MaintenanceLevel::Medium,
            EquipmentHealth::Critical => MaintenanceLevel::High,
        }
    }
}

/// Maintenance effort required for a given health tier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum MaintenanceLevel {
    Low,
    Medium,
    High,
}

/// Root cause assigned to a record by the labeling pass.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum FailureReason {
    #[serde(rename = "Overheating")]
    #[strum(serialize = "Overheating")]
    Overheating,
    #[serde(rename = "Voltage Surge")]
    #[strum(serialize = "Voltage Surge")]
    VoltageSurge,
    #[serde(rename = "Pressure Leak")]
    #[strum(serialize = "Pressure Leak")]
    PressureLeak,
    #[serde(rename = "Component Wear")]
    #[strum(serialize = "Component Wear")]
    ComponentWear,
    #[serde(rename = "Calibration Drift")]
    #[strum(serialize = "Calibration Drift")]
    CalibrationDrift,
}

impl FailureReason {
    /// Reasons drawn at random when no sensor condition explains the record.
    pub const RESIDUAL: [FailureReason; 2] =
        [FailureReason::ComponentWear, FailureReason::CalibrationDrift];

    pub fn is_residual(self) -> bool {
        Self::RESIDUAL.contains(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutpoints_are_inclusive_on_the_upper_tier() {
        assert_eq!(EquipmentHealth::from_probability(0.29), EquipmentHealth::Good);
        assert_eq!(EquipmentHealth::from_probability(0.3), EquipmentHealth::Moderate);
        assert_eq!(EquipmentHealth::from_probability(0.59), EquipmentHealth::Moderate);
        assert_eq!(EquipmentHealth::from_probability(0.6), EquipmentHealth::Critical);
        assert_eq!(EquipmentHealth::from_probability(1.0), EquipmentHealth::Critical);
    }

    #[test]
    fn rounded_sums_hit_the_cutpoint_exactly() {
        let rounded = ((0.05_f64 + 0.25) * 100.0).round() / 100.0;
        assert_eq!(EquipmentHealth::from_probability(rounded), EquipmentHealth::Moderate);
        let rounded = ((0.05_f64 + 0.35 + 0.20) * 100.0).round() / 100.0;
        assert_eq!(EquipmentHealth::from_probability(rounded), EquipmentHealth::Critical);
    }

    #[test]
    fn maintenance_level_tracks_health() {
        assert_eq!(EquipmentHealth::Good.maintenance_level(), MaintenanceLevel::Low);
        assert_eq!(EquipmentHealth::Moderate.maintenance_level(), MaintenanceLevel::Medium);
        assert_eq!(EquipmentHealth::Critical.maintenance_level(), MaintenanceLevel::High);
    }

    #[test]
    fn reason_labels_match_dataset_strings() {
        assert_eq!(FailureReason::VoltageSurge.to_string(), "Voltage Surge");
        assert_eq!(
            "Calibration Drift".parse::<FailureReason>().unwrap(),
            FailureReason::CalibrationDrift
        );
        assert!(FailureReason::ComponentWear.is_residual());
        assert!(!FailureReason::Overheating.is_residual());
    }
}
