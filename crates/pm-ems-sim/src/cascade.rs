//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Failure-probability rule cascade."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Additive failure-probability rules.
//!
//! Every rule is evaluated independently and in a fixed order: equipment
//! thresholds (temperature, humidity, overdue maintenance), then the sensor
//! cascade (vibration, voltage fluctuation, pressure), then the combined
//! heat-and-humidity interaction. The heat-and-humidity bonus is added even
//! when the plain temperature or humidity rules already fired. The sum is
//! rounded to two decimals and capped at 1.0.

use pm_ems_common::{
    CascadeConfig, ConfigError, EquipmentHealth, EquipmentType, FailureThresholds,
    MaintenanceLevel, SimulatorConfig,
};
use serde::{Deserialize, Serialize};

use crate::sampler::{round_dp, SensorReading};

/// Upper bound applied after rounding.
pub const MAX_PROBABILITY: f64 = 1.0;

/// Rule that contributed to a failure probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    Temperature,
    Humidity,
    MaintenanceOverdue,
    Vibration,
    VoltageFluctuation,
    Pressure,
    HeatAndHumidity,
}

/// Outcome of running the cascade over one reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureAssessment {
    /// Unrounded, uncapped sum of the base and every fired increment.
    pub raw_score: f64,
    /// Rounded and capped probability written to the dataset.
    pub probability: f64,
    /// Rules that fired, in evaluation order.
    pub factors: Vec<RiskFactor>,
}

impl FailureAssessment {
    pub fn health(&self) -> EquipmentHealth {
        EquipmentHealth::from_probability(self.probability)
    }

    pub fn maintenance_level(&self) -> MaintenanceLevel {
        self.health().maintenance_level()
    }

    pub fn is_capped(&self) -> bool {
        round_dp(self.raw_score, 2) > MAX_PROBABILITY
    }
}

/// Resolved cascade rules with a dense per-equipment threshold table.
#[derive(Debug, Clone)]
pub struct FailureCascade {
    rules: CascadeConfig,
    thresholds: [FailureThresholds; EquipmentType::ALL.len()],
}

impl FailureCascade {
    pub fn from_config(config: &SimulatorConfig) -> Result<Self, ConfigError> {
        let mut thresholds = [FailureThresholds::new(0.0, 0.0, 0); EquipmentType::ALL.len()];
        for equipment in EquipmentType::ALL {
            thresholds[equipment.index()] = *config
                .thresholds_for(equipment)
                .ok_or(ConfigError::MissingThresholds(equipment))?;
        }
        Ok(Self {
            rules: config.cascade.clone(),
            thresholds,
        })
    }

    pub fn thresholds(&self, equipment: EquipmentType) -> &FailureThresholds {
        &self.thresholds[equipment.index()]
    }

    pub fn assess(&self, reading: &SensorReading) -> FailureAssessment {
        let rules = &self.rules;
        let limits = self.thresholds(reading.equipment_type);
        let mut raw_score = rules.base;
        let mut factors = Vec::new();

        let checks = [
            (
                reading.temperature_avg > limits.temp_limit,
                rules.temperature,
                RiskFactor::Temperature,
            ),
            (
                reading.humidity_avg > limits.humidity_limit,
                rules.humidity,
                RiskFactor::Humidity,
            ),
            (
                reading.last_maintenance_days > limits.maintenance_limit,
                rules.maintenance,
                RiskFactor::MaintenanceOverdue,
            ),
            (
                reading.vibration > rules.vibration.above,
                rules.vibration.increment,
                RiskFactor::Vibration,
            ),
            (
                reading.voltage_fluctuation > rules.voltage_fluctuation.above,
                rules.voltage_fluctuation.increment,
                RiskFactor::VoltageFluctuation,
            ),
            (
                reading.pressure > rules.pressure.above,
                rules.pressure.increment,
                RiskFactor::Pressure,
            ),
            (
                reading.temperature_avg > rules.environment.temperature_above
                    && reading.humidity_avg > rules.environment.humidity_above,
                rules.environment.increment,
                RiskFactor::HeatAndHumidity,
            ),
        ];
        for (fired, increment, factor) in checks {
            if fired {
                raw_score += increment;
                factors.push(factor);
            }
        }

        FailureAssessment {
            raw_score,
            probability: round_dp(raw_score, 2).min(MAX_PROBABILITY),
            factors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cascade() -> FailureCascade {
        FailureCascade::from_config(&SimulatorConfig::default()).unwrap()
    }

    fn ct_reading(
        temperature_avg: f64,
        humidity_avg: f64,
        last_maintenance_days: u32,
        vibration: f64,
        voltage_fluctuation: f64,
        pressure: f64,
    ) -> SensorReading {
        SensorReading {
            equipment_id: "EQ-1234".into(),
            equipment_type: EquipmentType::CtScanner,
            temperature_avg,
            humidity_avg,
            last_maintenance_days,
            uptime_hours: 1000,
            sensor_1: 0.5,
            sensor_2: 0.5,
            vibration,
            voltage_fluctuation,
            pressure,
        }
    }

    #[test]
    fn temperature_only_breach_is_moderate() {
        let assessment = cascade().assess(&ct_reading(35.0, 40.0, 100, 1.0, 0.2, 90.0));
        assert_eq!(assessment.probability, 0.40);
        assert_eq!(assessment.factors, vec![RiskFactor::Temperature]);
        assert_eq!(assessment.health(), EquipmentHealth::Moderate);
        assert_eq!(assessment.maintenance_level(), MaintenanceLevel::Medium);
        assert!(!assessment.is_capped());
    }

    #[test]
    fn every_rule_firing_is_capped_to_one() {
        let assessment = cascade().assess(&ct_reading(38.0, 72.0, 400, 5.5, 1.1, 125.0));
        // 0.05 + 0.35 + 0.25 + 0.30 + 0.15 + 0.20 + 0.10 + 0.20
        assert!((assessment.raw_score - 1.60).abs() < 1e-9);
        assert_eq!(assessment.probability, 1.0);
        assert_eq!(assessment.factors.len(), 7);
        assert_eq!(assessment.health(), EquipmentHealth::Critical);
        assert_eq!(assessment.maintenance_level(), MaintenanceLevel::High);
        assert!(assessment.is_capped());
    }

    #[test]
    fn quiet_reading_keeps_base_probability() {
        let assessment = cascade().assess(&ct_reading(20.0, 30.0, 10, 1.0, 0.2, 90.0));
        assert_eq!(assessment.probability, 0.05);
        assert!(assessment.factors.is_empty());
        assert_eq!(assessment.health(), EquipmentHealth::Good);
    }

    #[test]
    fn thresholds_are_strictly_greater_than() {
        let assessment = cascade().assess(&ct_reading(28.0, 55.0, 250, 5.0, 1.0, 120.0));
        assert_eq!(assessment.probability, 0.05);
    }

    #[test]
    fn heat_and_humidity_bonus_stacks_with_plain_rules() {
        let assessment = cascade().assess(&ct_reading(37.0, 71.0, 0, 0.0, 0.0, 90.0));
        assert_eq!(
            assessment.factors,
            vec![
                RiskFactor::Temperature,
                RiskFactor::Humidity,
                RiskFactor::HeatAndHumidity
            ]
        );
        assert_eq!(assessment.probability, 0.85);
    }

    #[test]
    fn humidity_breach_lands_exactly_on_moderate_cutpoint() {
        let assessment = cascade().assess(&ct_reading(20.0, 60.0, 0, 0.0, 0.0, 90.0));
        assert_eq!(assessment.probability, 0.3);
        assert_eq!(assessment.health(), EquipmentHealth::Moderate);
    }

    #[test]
    fn thresholds_depend_on_equipment_type() {
        let cascade = cascade();
        let mut reading = ct_reading(33.0, 40.0, 0, 0.0, 0.0, 90.0);
        assert_eq!(cascade.assess(&reading).probability, 0.40);
        reading.equipment_type = EquipmentType::XRayMachine;
        assert_eq!(cascade.assess(&reading).probability, 0.05);
        reading.equipment_type = EquipmentType::MriScanner;
        assert_eq!(cascade.assess(&reading).probability, 0.40);
    }

    #[test]
    fn missing_thresholds_are_reported() {
        let mut config = SimulatorConfig::default();
        config.thresholds.shift_remove(&EquipmentType::BloodAnalyzer);
        let err = FailureCascade::from_config(&config).unwrap_err();
        assert_eq!(err, ConfigError::MissingThresholds(EquipmentType::BloodAnalyzer));
    }
}
