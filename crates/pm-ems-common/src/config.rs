//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "TOML simulator configuration: ranges, thresholds, cascade increments, label rules, validation."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::equipment::EquipmentType;
use crate::error::ConfigError;
use crate::logging::LogFormat;

fn default_samples() -> usize {
    1000
}

fn default_noise_sigma() -> f64 {
    0.05
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_thresholds() -> IndexMap<EquipmentType, FailureThresholds> {
    IndexMap::from([
        (EquipmentType::MriScanner, FailureThresholds::new(32.0, 65.0, 300)),
        (EquipmentType::Ventilator, FailureThresholds::new(30.0, 60.0, 200)),
        (EquipmentType::CtScanner, FailureThresholds::new(28.0, 55.0, 250)),
        (EquipmentType::XRayMachine, FailureThresholds::new(35.0, 70.0, 365)),
        (EquipmentType::BloodAnalyzer, FailureThresholds::new(34.0, 68.0, 350)),
    ])
}

/// Top-level configuration file for PM-EMS tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "PM_EMS_CONFIG";

    /// Load configuration from disk, respecting the `PM_EMS_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Read and validate a single configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulator.validate()
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the rolling JSON log file. Console-only when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// Inclusive `[min, max]` interval used for sampling and label draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosedRange<T> {
    pub min: T,
    pub max: T,
}

impl<T: Copy + PartialOrd> ClosedRange<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }
}

impl ClosedRange<f64> {
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(ConfigError::InvalidRange {
                name: name.to_owned(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

impl ClosedRange<u32> {
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvalidRange {
                name: name.to_owned(),
                min: f64::from(self.min),
                max: f64::from(self.max),
            });
        }
        Ok(())
    }
}

/// Generator settings: sample count, noise, ranges, thresholds, and label rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_samples")]
    pub samples: usize,
    /// Fixed RNG seed. A fresh entropy seed is drawn when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default = "default_noise_sigma")]
    pub noise_sigma: f64,
    #[serde(default)]
    pub ranges: MeasurementRanges,
    #[serde(default = "default_thresholds")]
    pub thresholds: IndexMap<EquipmentType, FailureThresholds>,
    #[serde(default)]
    pub cascade: CascadeConfig,
    #[serde(default)]
    pub labels: LabelConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            samples: default_samples(),
            seed: None,
            noise_sigma: default_noise_sigma(),
            ranges: MeasurementRanges::default(),
            thresholds: default_thresholds(),
            cascade: CascadeConfig::default(),
            labels: LabelConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// Thresholds for an equipment type. Present for every type once validated.
    pub fn thresholds_for(&self, equipment: EquipmentType) -> Option<&FailureThresholds> {
        self.thresholds.get(&equipment)
    }

    /// Validate every section, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.samples == 0 {
            return Err(ConfigError::ZeroSamples);
        }
        if !self.noise_sigma.is_finite() || self.noise_sigma <= 0.0 {
            return Err(ConfigError::InvalidNoiseSigma(self.noise_sigma));
        }
        self.ranges.validate()?;
        for equipment in EquipmentType::ALL {
            let thresholds = self
                .thresholds
                .get(&equipment)
                .ok_or(ConfigError::MissingThresholds(equipment))?;
            thresholds.validate(equipment)?;
        }
        self.cascade.validate()?;
        self.labels.validate()?;
        // updated_uptime must stay strictly above uptime_hours.
        let increments = &self.labels.uptime_increment;
        let largest = increments.critical.max.max(increments.nominal.max);
        if self.ranges.uptime_hours.max.checked_add(largest).is_none() {
            return Err(ConfigError::UptimeOverflow {
                max_uptime: self.ranges.uptime_hours.max,
                increment: largest,
            });
        }
        Ok(())
    }
}

/// Sampling intervals for every generated column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementRanges {
    pub equipment_id: ClosedRange<u32>,
    pub temperature_avg: ClosedRange<f64>,
    pub humidity_avg: ClosedRange<f64>,
    pub last_maintenance_days: ClosedRange<u32>,
    pub uptime_hours: ClosedRange<u32>,
    pub sensor: ClosedRange<f64>,
    pub vibration: ClosedRange<f64>,
    pub voltage_fluctuation: ClosedRange<f64>,
    pub pressure: ClosedRange<f64>,
}

impl Default for MeasurementRanges {
    fn default() -> Self {
        Self {
            equipment_id: ClosedRange::new(1000, 9999),
            temperature_avg: ClosedRange::new(18.0, 40.0),
            humidity_avg: ClosedRange::new(20.0, 80.0),
            last_maintenance_days: ClosedRange::new(0, 730),
            uptime_hours: ClosedRange::new(100, 5000),
            sensor: ClosedRange::new(0.0, 1.0),
            vibration: ClosedRange::new(0.0, 6.0),
            voltage_fluctuation: ClosedRange::new(0.0, 1.5),
            pressure: ClosedRange::new(80.0, 130.0),
        }
    }
}

impl MeasurementRanges {
    fn validate(&self) -> Result<(), ConfigError> {
        self.equipment_id.validate("equipment_id")?;
        self.temperature_avg.validate("temperature_avg")?;
        self.humidity_avg.validate("humidity_avg")?;
        self.last_maintenance_days.validate("last_maintenance_days")?;
        self.uptime_hours.validate("uptime_hours")?;
        self.sensor.validate("sensor")?;
        self.vibration.validate("vibration")?;
        self.voltage_fluctuation.validate("voltage_fluctuation")?;
        self.pressure.validate("pressure")?;
        Ok(())
    }
}

/// Per-equipment limits beyond which the cascade adds risk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FailureThresholds {
    pub temp_limit: f64,
    pub humidity_limit: f64,
    pub maintenance_limit: u32,
}

impl FailureThresholds {
    pub const fn new(temp_limit: f64, humidity_limit: f64, maintenance_limit: u32) -> Self {
        Self {
            temp_limit,
            humidity_limit,
            maintenance_limit,
        }
    }

    fn validate(&self, equipment: EquipmentType) -> Result<(), ConfigError> {
        for (field, value) in [
            ("temp_limit", self.temp_limit),
            ("humidity_limit", self.humidity_limit),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidThreshold {
                    equipment,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Sensor reading that adds `increment` once it exceeds `above`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorTrigger {
    pub above: f64,
    pub increment: f64,
}

/// Combined heat and humidity condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentTrigger {
    pub temperature_above: f64,
    pub humidity_above: f64,
    pub increment: f64,
}

/// Additive increments of the failure-probability cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    pub base: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub maintenance: f64,
    pub vibration: SensorTrigger,
    pub voltage_fluctuation: SensorTrigger,
    pub pressure: SensorTrigger,
    pub environment: EnvironmentTrigger,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            base: 0.05,
            temperature: 0.35,
            humidity: 0.25,
            maintenance: 0.30,
            vibration: SensorTrigger {
                above: 5.0,
                increment: 0.15,
            },
            voltage_fluctuation: SensorTrigger {
                above: 1.0,
                increment: 0.20,
            },
            pressure: SensorTrigger {
                above: 120.0,
                increment: 0.10,
            },
            environment: EnvironmentTrigger {
                temperature_above: 36.0,
                humidity_above: 70.0,
                increment: 0.20,
            },
        }
    }
}

impl CascadeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let increments = [
            ("base", self.base),
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("maintenance", self.maintenance),
            ("vibration.increment", self.vibration.increment),
            ("voltage_fluctuation.increment", self.voltage_fluctuation.increment),
            ("pressure.increment", self.pressure.increment),
            ("environment.increment", self.environment.increment),
        ];
        for (name, value) in increments {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidIncrement {
                    name: name.to_owned(),
                    value,
                });
            }
        }
        check_triggers([
            ("vibration.above", self.vibration.above),
            ("voltage_fluctuation.above", self.voltage_fluctuation.above),
            ("pressure.above", self.pressure.above),
            ("environment.temperature_above", self.environment.temperature_above),
            ("environment.humidity_above", self.environment.humidity_above),
        ])
    }
}

/// Value ranges keyed by health tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierRanges {
    pub good: ClosedRange<u32>,
    pub moderate: ClosedRange<u32>,
    pub critical: ClosedRange<u32>,
}

/// Uptime gained after maintenance. Critical equipment recovers less.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UptimeIncrements {
    pub critical: ClosedRange<u32>,
    pub nominal: ClosedRange<u32>,
}

/// Rules for the labeling pass: reason triggers, costs, and uptime increments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub overheating_temperature: f64,
    pub overheating_vibration: f64,
    pub voltage_surge: f64,
    pub pressure_leak: f64,
    pub cost: TierRanges,
    pub uptime_increment: UptimeIncrements,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            overheating_temperature: 36.0,
            overheating_vibration: 5.0,
            voltage_surge: 1.2,
            pressure_leak: 120.0,
            cost: TierRanges {
                good: ClosedRange::new(1000, 4000),
                moderate: ClosedRange::new(4000, 8000),
                critical: ClosedRange::new(8000, 15000),
            },
            uptime_increment: UptimeIncrements {
                critical: ClosedRange::new(100, 500),
                nominal: ClosedRange::new(600, 1200),
            },
        }
    }
}

impl LabelConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_triggers([
            ("overheating_temperature", self.overheating_temperature),
            ("overheating_vibration", self.overheating_vibration),
            ("voltage_surge", self.voltage_surge),
            ("pressure_leak", self.pressure_leak),
        ])?;

        self.cost.good.validate("cost.good")?;
        self.cost.moderate.validate("cost.moderate")?;
        self.cost.critical.validate("cost.critical")?;
        check_ordered(&self.cost.good, &self.cost.moderate, "Good", "Moderate")?;
        check_ordered(&self.cost.moderate, &self.cost.critical, "Moderate", "Critical")?;

        self.uptime_increment
            .critical
            .validate("uptime_increment.critical")?;
        self.uptime_increment
            .nominal
            .validate("uptime_increment.nominal")?;
        if self.uptime_increment.critical.min == 0 {
            return Err(ConfigError::NonPositiveUptimeIncrement("critical"));
        }
        if self.uptime_increment.nominal.min == 0 {
            return Err(ConfigError::NonPositiveUptimeIncrement("nominal"));
        }
        Ok(())
    }
}

fn check_triggers<const N: usize>(triggers: [(&str, f64); N]) -> Result<(), ConfigError> {
    for (name, value) in triggers {
        if !value.is_finite() {
            return Err(ConfigError::InvalidTrigger {
                name: name.to_owned(),
                value,
            });
        }
    }
    Ok(())
}

fn check_ordered<T: PartialOrd>(
    lower: &ClosedRange<T>,
    upper: &ClosedRange<T>,
    lower_name: &'static str,
    upper_name: &'static str,
) -> Result<(), ConfigError> {
    if upper.min < lower.min || upper.max < lower.max {
        return Err(ConfigError::InvertedCostRanges {
            lower: lower_name,
            upper: upper_name,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::str::FromStr;

    use tempfile::NamedTempFile;

    #[test]
    fn empty_document_yields_reference_configuration() {
        let config = AppConfig::from_str("").unwrap();
        let sim = &config.simulator;
        assert_eq!(sim.samples, 1000);
        assert_eq!(sim.noise_sigma, 0.05);
        assert_eq!(sim.thresholds.len(), 5);
        let ct = sim.thresholds_for(EquipmentType::CtScanner).unwrap();
        assert_eq!(ct.temp_limit, 28.0);
        assert_eq!(ct.humidity_limit, 55.0);
        assert_eq!(ct.maintenance_limit, 250);
        assert_eq!(sim.labels.cost.critical, ClosedRange::new(8000, 15000));
        assert_eq!(sim.ranges.pressure, ClosedRange::new(80.0, 130.0));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = AppConfig::from_str(
            r#"
            [simulator]
            samples = 25
            seed = 7

            [simulator.ranges.temperature_avg]
            min = 20.0
            max = 30.0

            [simulator.cascade]
            base = 0.1
            "#,
        )
        .unwrap();
        let sim = config.simulator;
        assert_eq!(sim.samples, 25);
        assert_eq!(sim.seed, Some(7));
        assert_eq!(sim.ranges.temperature_avg, ClosedRange::new(20.0, 30.0));
        assert_eq!(sim.ranges.humidity_avg, ClosedRange::new(20.0, 80.0));
        assert_eq!(sim.cascade.base, 0.1);
        assert_eq!(sim.cascade.temperature, 0.35);
    }

    #[test]
    fn unknown_equipment_type_fails_to_parse() {
        let err = AppConfig::from_str(
            r#"
            [simulator.thresholds."Dialysis Machine"]
            temp_limit = 30.0
            humidity_limit = 60.0
            maintenance_limit = 100
            "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse"));
    }

    #[test]
    fn partial_threshold_table_is_rejected() {
        let err = AppConfig::from_str(
            r#"
            [simulator.thresholds."CT Scanner"]
            temp_limit = 28.0
            humidity_limit = 55.0
            maintenance_limit = 250
            "#,
        )
        .unwrap_err();
        let config_err = err.downcast_ref::<ConfigError>().unwrap();
        assert_eq!(
            *config_err,
            ConfigError::MissingThresholds(EquipmentType::MriScanner)
        );
    }

    #[test]
    fn uptime_range_must_leave_room_for_increments() {
        let mut config = SimulatorConfig::default();
        config.ranges.uptime_hours = ClosedRange::new(100, u32::MAX - 1200);
        assert_eq!(config.validate(), Ok(()));

        config.ranges.uptime_hours = ClosedRange::new(100, u32::MAX - 1199);
        assert_eq!(
            config.validate(),
            Err(ConfigError::UptimeOverflow {
                max_uptime: u32::MAX - 1199,
                increment: 1200,
            })
        );

        config.labels.uptime_increment.nominal = ClosedRange::new(600, 1000);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut config = SimulatorConfig::default();
        config.samples = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroSamples));

        let mut config = SimulatorConfig::default();
        config.noise_sigma = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidNoiseSigma(_))
        ));

        let mut config = SimulatorConfig::default();
        config.ranges.vibration = ClosedRange::new(6.0, 0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRange { ref name, .. }) if name == "vibration"
        ));

        let mut config = SimulatorConfig::default();
        config
            .thresholds
            .insert(EquipmentType::Ventilator, FailureThresholds::new(f64::NAN, 60.0, 200));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreshold {
                equipment: EquipmentType::Ventilator,
                field: "temp_limit",
                ..
            })
        ));

        let mut config = SimulatorConfig::default();
        config.cascade.pressure.increment = -0.1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidIncrement { .. })
        ));

        let mut config = SimulatorConfig::default();
        config.labels.cost.critical = ClosedRange::new(500, 900);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedCostRanges {
                lower: "Moderate",
                upper: "Critical"
            })
        );

        let mut config = SimulatorConfig::default();
        config.labels.uptime_increment.nominal = ClosedRange::new(0, 10);
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositiveUptimeIncrement("nominal"))
        );
    }

    #[test]
    fn load_reads_first_existing_candidate() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[simulator]\nsamples = 12\n\n[logging]\nformat = \"structured-json\"")?;
        file.flush()?;
        let missing = PathBuf::from("does/not/exist.toml");
        let loaded = AppConfig::load_with_source(&[missing, file.path().to_path_buf()])?;
        assert_eq!(loaded.source, file.path());
        assert_eq!(loaded.config.simulator.samples, 12);
        assert_eq!(loaded.config.logging.format, LogFormat::StructuredJson);
        Ok(())
    }

    #[test]
    fn load_without_candidates_lists_inspected_paths() {
        let err = AppConfig::load(&["nowhere.toml"]).unwrap_err();
        assert!(err.to_string().contains("nowhere.toml"));
    }

    #[test]
    fn configuration_round_trips_through_toml() {
        let config = AppConfig::default();
        let rendered = toml::to_string(&config).unwrap();
        let parsed = AppConfig::from_str(&rendered).unwrap();
        assert_eq!(parsed.simulator.thresholds, config.simulator.thresholds);
        assert_eq!(parsed.simulator.labels.cost, config.simulator.labels.cost);
    }
}
