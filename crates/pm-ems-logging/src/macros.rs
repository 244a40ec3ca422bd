//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Context-aware tracing macros for generator and training events."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
/// Expands to a `tracing` event carrying every [`crate::LogContext`] field.
#[doc(hidden)]
#[macro_export]
macro_rules! __ems_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            dataset = ctx.dataset.unwrap_or(""),
            stage = ctx.stage.unwrap_or(""),
            equipment_type = ctx.equipment_type.unwrap_or(""),
            record = ctx.record.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with PM-EMS context.
#[macro_export]
macro_rules! ems_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__ems_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__ems_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with PM-EMS context.
#[macro_export]
macro_rules! ems_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__ems_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__ems_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a per-record trace log enriched with PM-EMS context.
#[macro_export]
macro_rules! ems_trace {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__ems_event!(tracing::Level::TRACE, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__ems_event!(tracing::Level::TRACE, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with PM-EMS context.
#[macro_export]
macro_rules! ems_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__ems_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__ems_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
