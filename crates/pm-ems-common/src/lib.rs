//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Configuration model, equipment catalog, and shared health-tier labels."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Core shared primitives for the PM-EMS workspace.
//! This crate exposes configuration loading, the equipment and label
//! vocabulary, the health tier mapping, and logging bootstrap utilities
//! consumed across the workspace.

pub mod config;
pub mod equipment;
pub mod error;
pub mod labels;
pub mod logging;

pub use config::{
    AppConfig, CascadeConfig, ClosedRange, EnvironmentTrigger, FailureThresholds, LabelConfig,
    LoadedAppConfig, LoggingConfig, MeasurementRanges, SensorTrigger, SimulatorConfig,
    TierRanges, UptimeIncrements,
};
pub use equipment::EquipmentType;
pub use error::ConfigError;
pub use labels::{
    EquipmentHealth, FailureReason, MaintenanceLevel, CRITICAL_CUTPOINT, MODERATE_CUTPOINT,
};
pub use logging::{init_tracing, LogFormat};

/// Version string embedded into manifests and CLI output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
