//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Ten-column feature-row contract shared by training and inference."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! A feature row is exactly the ten measurement columns a predictor sees.
//! Rows arrive either as a JSON object keyed by column name or as a
//! positional array in [`FEATURE_COLUMNS`] order. Anything else is rejected.

use pm_ems_common::EquipmentType;
use pm_ems_sim::{EquipmentRecord, SensorReading};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{InferenceError, Result};

/// Feature columns in positional order.
pub const FEATURE_COLUMNS: [&str; 10] = [
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
];

/// Numeric feature columns, i.e. every column after `equipment_type`.
pub const NUMERIC_COLUMNS: [&str; 9] = [
    "temperature_avg",
    "humidity_avg",
    "last_maintenance_days",
    "uptime_hours",
    "sensor_1",
    "sensor_2",
    "vibration",
    "voltage_fluctuation",
    "pressure",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub equipment_type: EquipmentType,
    pub temperature_avg: f64,
    pub humidity_avg: f64,
    pub last_maintenance_days: f64,
    pub uptime_hours: f64,
    pub sensor_1: f64,
    pub sensor_2: f64,
    pub vibration: f64,
    pub voltage_fluctuation: f64,
    pub pressure: f64,
}

impl FeatureRow {
    pub fn from_record(record: &EquipmentRecord) -> Self {
        Self::from_reading(&record.reading())
    }

    pub fn from_reading(reading: &SensorReading) -> Self {
        Self {
            equipment_type: reading.equipment_type,
            temperature_avg: reading.temperature_avg,
            humidity_avg: reading.humidity_avg,
            last_maintenance_days: f64::from(reading.last_maintenance_days),
            uptime_hours: f64::from(reading.uptime_hours),
            sensor_1: reading.sensor_1,
            sensor_2: reading.sensor_2,
            vibration: reading.vibration,
            voltage_fluctuation: reading.voltage_fluctuation,
            pressure: reading.pressure,
        }
    }

    /// Parse and validate a row from JSON.
    pub fn from_json(value: &Value) -> Result<Self> {
        let row = match value {
            Value::Object(map) => Self::from_object(map)?,
            Value::Array(values) => Self::from_positional(values)?,
            other => return Err(InferenceError::MalformedRow(json_kind(other).into())),
        };
        row.validate()?;
        Ok(row)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|err| InferenceError::MalformedRow(format!("invalid JSON ({err})")))?;
        Self::from_json(&value)
    }

    /// Parse a batch: an array of rows, or `{"data": [...]}`.
    pub fn batch_from_json(value: &Value) -> Result<Vec<Self>> {
        let rows = match value {
            Value::Object(map) if map.len() == 1 && map.contains_key("data") => &map["data"],
            other => other,
        };
        match rows {
            Value::Array(items) => items.iter().map(Self::from_json).collect(),
            other => Err(InferenceError::MalformedRow(json_kind(other).into())),
        }
    }

    fn from_object(map: &Map<String, Value>) -> Result<Self> {
        if let Some(extra) = map
            .keys()
            .find(|key| !FEATURE_COLUMNS.iter().any(|column| column == key))
        {
            return Err(InferenceError::UnexpectedColumn(extra.clone()));
        }
        let mut values = Vec::with_capacity(FEATURE_COLUMNS.len());
        for column in FEATURE_COLUMNS {
            values.push(
                map.get(column)
                    .ok_or(InferenceError::MissingColumn(column))?,
            );
        }
        Self::from_values(&values)
    }

    fn from_positional(values: &[Value]) -> Result<Self> {
        if values.len() != FEATURE_COLUMNS.len() {
            return Err(InferenceError::WrongColumnCount {
                expected: FEATURE_COLUMNS.len(),
                found: values.len(),
            });
        }
        let values: Vec<&Value> = values.iter().collect();
        Self::from_values(&values)
    }

    fn from_values(values: &[&Value]) -> Result<Self> {
        let label = values[0]
            .as_str()
            .ok_or(InferenceError::WrongColumnType {
                column: FEATURE_COLUMNS[0],
                expected: "string",
            })?;
        let equipment_type: EquipmentType = label
            .parse()
            .map_err(|_| InferenceError::UnknownEquipmentType(label.to_owned()))?;

        let mut numbers = [0.0; NUMERIC_COLUMNS.len()];
        for (slot, (column, value)) in numbers
            .iter_mut()
            .zip(NUMERIC_COLUMNS.into_iter().zip(&values[1..]))
        {
            *slot = value.as_f64().ok_or(InferenceError::WrongColumnType {
                column,
                expected: "number",
            })?;
        }
        Ok(Self::from_numeric(equipment_type, numbers))
    }

    fn from_numeric(equipment_type: EquipmentType, numbers: [f64; 9]) -> Self {
        let [temperature_avg, humidity_avg, last_maintenance_days, uptime_hours, sensor_1, sensor_2, vibration, voltage_fluctuation, pressure] = numbers;
        Self {
            equipment_type,
            temperature_avg,
            humidity_avg,
            last_maintenance_days,
            uptime_hours,
            sensor_1,
            sensor_2,
            vibration,
            voltage_fluctuation,
            pressure,
        }
    }

    /// Numeric features in [`NUMERIC_COLUMNS`] order.
    pub fn numeric_values(&self) -> [f64; 9] {
        [
            self.temperature_avg,
            self.humidity_avg,
            self.last_maintenance_days,
            self.uptime_hours,
            self.sensor_1,
            self.sensor_2,
            self.vibration,
            self.voltage_fluctuation,
            self.pressure,
        ]
    }

    /// Reject non-finite values and negative day or hour counts.
    pub fn validate(&self) -> Result<()> {
        for (column, value) in NUMERIC_COLUMNS.into_iter().zip(self.numeric_values()) {
            if !value.is_finite() {
                return Err(InferenceError::NonFiniteValue { column, value });
            }
        }
        for (column, value) in [
            ("last_maintenance_days", self.last_maintenance_days),
            ("uptime_hours", self.uptime_hours),
        ] {
            if value < 0.0 {
                return Err(InferenceError::NegativeValue { column, value });
            }
        }
        Ok(())
    }

    /// Reading view for rule-based scoring. Day and hour counts are rounded.
    pub fn to_reading(&self) -> SensorReading {
        SensorReading {
            equipment_id: String::from("EQ-0000"),
            equipment_type: self.equipment_type,
            temperature_avg: self.temperature_avg,
            humidity_avg: self.humidity_avg,
            last_maintenance_days: count(self.last_maintenance_days),
            uptime_hours: count(self.uptime_hours),
            sensor_1: self.sensor_1,
            sensor_2: self.sensor_2,
            vibration: self.vibration,
            voltage_fluctuation: self.voltage_fluctuation,
            pressure: self.pressure,
        }
    }
}

fn count(value: f64) -> u32 {
    value.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
