use thiserror::Error;

use crate::config::ConfigError;
use crate::flows::TurnError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Turn(#[from] TurnError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("intent recognizer failure: {0}")]
    Recognizer(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "Sorry, I lost track of our conversation. Let's start over.",
            Self::ServiceUnavailable { .. } => {
                "Sorry, I could not understand that right now. Please try again in a moment."
            }
            Self::Internal { .. } => "Unpredictable error happens, please call the admin.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<TurnError> for ApplicationError {
    fn from(value: TurnError) -> Self {
        Self::Domain(DomainError::Turn(value))
    }
}

impl From<ConfigError> for ApplicationError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value.to_string())
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Recognizer(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ConfigError;
    use crate::domain::RecordField;
    use crate::errors::{ApplicationError, DomainError, InterfaceError};
    use crate::flows::{TurnError, TurnStep};

    #[test]
    fn turn_error_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(TurnError::CursorAhead {
            step: TurnStep::AskDuration,
            missing: RecordField::EmployeeCode,
        })
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ref message,
            } if correlation_id == "req-1" && message.contains("employee_code")
        ));
    }

    #[test]
    fn bad_request_has_user_safe_message() {
        let interface = ApplicationError::from(DomainError::Turn(TurnError::OutOfOrder {
            field: RecordField::Duration,
            missing: RecordField::ActivityKind,
        }))
        .into_interface("req-2");

        assert_eq!(
            interface.user_message(),
            "Sorry, I lost track of our conversation. Let's start over."
        );
        assert_eq!(interface.correlation_id(), "req-2");
    }

    #[test]
    fn recognizer_error_maps_to_service_unavailable() {
        let interface =
            ApplicationError::Recognizer("endpoint timed out".to_owned()).into_interface("req-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert!(interface.user_message().contains("try again"));
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let error = ApplicationError::from(ConfigError::Validation(
            "validation.codes must not be empty".to_owned(),
        ));
        assert!(error.to_string().contains("validation.codes"));

        let interface = error.into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "Unpredictable error happens, please call the admin.");
    }
}
