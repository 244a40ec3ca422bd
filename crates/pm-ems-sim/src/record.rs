//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Dataset row representation."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use pm_ems_common::{EquipmentHealth, EquipmentType, FailureReason, MaintenanceLevel};
use serde::{Deserialize, Serialize};

use crate::sampler::SensorReading;

/// Dataset column names in serialization order.
pub const COLUMNS: [&str; 17] = [
    "equipment_id",
    "equipment_type",
    "temperature_avg",
    "humidity_avg",
    "last_maintenance_days",
    "uptime_hours",
    "sensor_1",
    "sensor_2",
    "vibration",
    "voltage_fluctuation",
    "pressure",
    "equipment_health",
    "failure_probability",
    "failure_reason",
    "maintenance_level",
    "cost_implications",
    "updated_uptime",
];

/// One labeled row of the generated dataset.
///
/// Field order is the column order; serde derives the CSV header from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub equipment_id: String,
    pub equipment_type: EquipmentType,
    pub temperature_avg: f64,
    pub humidity_avg: f64,
    pub last_maintenance_days: u32,
    pub uptime_hours: u32,
    pub sensor_1: f64,
    pub sensor_2: f64,
    pub vibration: f64,
    pub voltage_fluctuation: f64,
    pub pressure: f64,
    pub equipment_health: EquipmentHealth,
    pub failure_probability: f64,
    pub failure_reason: FailureReason,
    pub maintenance_level: MaintenanceLevel,
    pub cost_implications: u32,
    pub updated_uptime: u32,
}

impl EquipmentRecord {
    /// Measurement columns of this record.
    pub fn reading(&self) -> SensorReading {
        SensorReading {
            equipment_id: self.equipment_id.clone(),
            equipment_type: self.equipment_type,
            temperature_avg: self.temperature_avg,
            humidity_avg: self.humidity_avg,
            last_maintenance_days: self.last_maintenance_days,
            uptime_hours: self.uptime_hours,
            sensor_1: self.sensor_1,
            sensor_2: self.sensor_2,
            vibration: self.vibration,
            voltage_fluctuation: self.voltage_fluctuation,
            pressure: self.pressure,
        }
    }

    /// Hours gained by the maintenance pass.
    pub fn uptime_increment(&self) -> i64 {
        i64::from(self.updated_uptime) - i64::from(self.uptime_hours)
    }
}
