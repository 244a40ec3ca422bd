//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Inference and training error types."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, InferenceError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("feature row must be a JSON object or array, found {0}")]
    MalformedRow(String),
    #[error("feature row has {found} values, expected {expected}")]
    WrongColumnCount { expected: usize, found: usize },
    #[error("feature row is missing column '{0}'")]
    MissingColumn(&'static str),
    #[error("feature row has unexpected column '{0}'")]
    UnexpectedColumn(String),
    #[error("column '{column}' must be a {expected}")]
    WrongColumnType {
        column: &'static str,
        expected: &'static str,
    },
    #[error("unknown equipment type '{0}'")]
    UnknownEquipmentType(String),
    #[error("column '{column}' must be finite, found {value}")]
    NonFiniteValue { column: &'static str, value: f64 },
    #[error("column '{column}' must not be negative, found {value}")]
    NegativeValue { column: &'static str, value: f64 },
    #[error("unknown target column '{0}'")]
    MissingTargetColumn(String),
    #[error("dataset has {records} records, need at least {required} to split")]
    DatasetTooSmall { records: usize, required: usize },
    #[error("{target} predictor failed: {message}")]
    PredictorFailed {
        target: &'static str,
        message: String,
    },
    #[error("failure reason code {0} has no class")]
    UnknownReasonCode(f64),
}

impl InferenceError {
    /// HTTP status an API wrapper should answer with.
    ///
    /// Shape violations are 400, well-formed rows with unusable values are
    /// 422, and anything raised while predicting is 500.
    pub fn status_code(&self) -> u16 {
        match self {
            InferenceError::MalformedRow(_)
            | InferenceError::WrongColumnCount { .. }
            | InferenceError::MissingColumn(_)
            | InferenceError::UnexpectedColumn(_)
            | InferenceError::WrongColumnType { .. }
            | InferenceError::MissingTargetColumn(_) => 400,
            InferenceError::UnknownEquipmentType(_)
            | InferenceError::NonFiniteValue { .. }
            | InferenceError::NegativeValue { .. }
            | InferenceError::DatasetTooSmall { .. } => 422,
            InferenceError::PredictorFailed { .. } | InferenceError::UnknownReasonCode(_) => 500,
        }
    }

    /// Whether the caller, not the model, is at fault.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_violations_map_to_client_errors() {
        assert_eq!(
            InferenceError::WrongColumnCount {
                expected: 10,
                found: 9
            }
            .status_code(),
            400
        );
        assert_eq!(
            InferenceError::UnknownEquipmentType("Dialysis Unit".into()).status_code(),
            422
        );
        assert!(InferenceError::MissingColumn("pressure").is_client_error());
    }

    #[test]
    fn predictor_failures_are_server_errors() {
        let err = InferenceError::PredictorFailed {
            target: "failure_probability",
            message: "model not loaded".into(),
        };
        assert_eq!(err.status_code(), 500);
        assert!(!err.is_client_error());
        assert_eq!(
            err.to_string(),
            "failure_probability predictor failed: model not loaded"
        );
    }
}
