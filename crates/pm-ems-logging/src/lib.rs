//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Logging context and lifecycle events for dataset generation."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Structured logging context shared by the PM-EMS crates.

pub mod macros;

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Dataset label, usually the output path.
    pub dataset: Option<&'a str>,
    /// Generation stage (`sampling`, `labeling`, `audit`, ...).
    pub stage: Option<&'a str>,
    /// Equipment type of the record being processed.
    pub equipment_type: Option<&'a str>,
    /// Zero-based record index within the dataset.
    pub record: Option<u64>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a dataset label.
    pub fn with_dataset(mut self, dataset: &'a str) -> Self {
        self.dataset = Some(dataset);
        self
    }

    /// Attach a generation stage.
    pub fn with_stage(mut self, stage: &'a str) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Attach an equipment type label.
    pub fn with_equipment_type(mut self, equipment_type: &'a str) -> Self {
        self.equipment_type = Some(equipment_type);
        self
    }

    /// Attach a record index.
    pub fn with_record(mut self, record: u64) -> Self {
        self.record = Some(record);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation failed or was aborted.
    Fault,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized lifecycle event such as `generation.start` or `generation.failed`.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let default_ctx = LogContext::default();
    let ctx = context.unwrap_or(&default_ctx);
    match outcome {
        SystemEventOutcome::Success => tracing::info!(
            event = %event,
            outcome = outcome.as_str(),
            dataset = ctx.dataset.unwrap_or(""),
            stage = ctx.stage.unwrap_or(""),
            message = %message
        ),
        SystemEventOutcome::Fault => tracing::error!(
            event = %event,
            outcome = outcome.as_str(),
            dataset = ctx.dataset.unwrap_or(""),
            stage = ctx.stage.unwrap_or(""),
            message = %message
        ),
    }
}
