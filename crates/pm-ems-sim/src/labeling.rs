//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Failure reason, cost, and uptime labeling."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use pm_ems_common::{ClosedRange, EquipmentHealth, FailureReason, LabelConfig};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::sampler::SensorReading;

/// Label rules applied once a record's health tier is final.
#[derive(Debug, Clone)]
pub struct LabelRules {
    config: LabelConfig,
}

impl LabelRules {
    pub fn new(config: LabelConfig) -> Self {
        Self { config }
    }

    /// Reason implied by the sensor readings, first match wins.
    ///
    /// `None` means no condition tripped and the reason is drawn from
    /// [`FailureReason::RESIDUAL`].
    pub fn deterministic_reason(&self, reading: &SensorReading) -> Option<FailureReason> {
        let rules = &self.config;
        if reading.temperature_avg > rules.overheating_temperature
            || reading.vibration > rules.overheating_vibration
        {
            Some(FailureReason::Overheating)
        } else if reading.voltage_fluctuation > rules.voltage_surge {
            Some(FailureReason::VoltageSurge)
        } else if reading.pressure > rules.pressure_leak {
            Some(FailureReason::PressureLeak)
        } else {
            None
        }
    }

    pub fn failure_reason<R: Rng + ?Sized>(
        &self,
        reading: &SensorReading,
        rng: &mut R,
    ) -> FailureReason {
        self.deterministic_reason(reading).unwrap_or_else(|| {
            FailureReason::RESIDUAL
                .choose(rng)
                .copied()
                .unwrap_or(FailureReason::ComponentWear)
        })
    }

    pub fn cost_range(&self, health: EquipmentHealth) -> ClosedRange<u32> {
        match health {
            EquipmentHealth::Critical => self.config.cost.critical,
            EquipmentHealth::Moderate => self.config.cost.moderate,
            EquipmentHealth::Good => self.config.cost.good,
        }
    }

    pub fn uptime_increment_range(&self, health: EquipmentHealth) -> ClosedRange<u32> {
        match health {
            EquipmentHealth::Critical => self.config.uptime_increment.critical,
            EquipmentHealth::Moderate | EquipmentHealth::Good => {
                self.config.uptime_increment.nominal
            }
        }
    }

    pub fn cost<R: Rng + ?Sized>(&self, health: EquipmentHealth, rng: &mut R) -> u32 {
        draw(rng, self.cost_range(health))
    }

    pub fn updated_uptime<R: Rng + ?Sized>(
        &self,
        uptime_hours: u32,
        health: EquipmentHealth,
        rng: &mut R,
    ) -> u32 {
        uptime_hours.saturating_add(draw(rng, self.uptime_increment_range(health)))
    }
}

fn draw<R: Rng + ?Sized>(rng: &mut R, range: ClosedRange<u32>) -> u32 {
    rng.gen_range(range.min..=range.max)
}
