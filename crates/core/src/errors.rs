use thiserror::Error;

use crate::session::SessionStoreError;

/// Turn-level failures. Anything in here aborts the turn before or instead of
/// dispatch; per-action failures never surface as an `ApplicationError`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("missing credential: {0}")]
    Unauthenticated(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<SessionStoreError> for ApplicationError {
    fn from(value: SessionStoreError) -> Self {
        Self::Persistence(value.to_string())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Unauthorized { .. } => "Authentication is required to perform this request.",
            Self::NotFound { .. } => "The requested resource does not exist.",
            Self::Internal { .. } => "The request could not be completed. Please retry shortly.",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::NotFound { .. } => 404,
            Self::Internal { .. } => 500,
        }
    }

    pub fn details(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Unauthorized { message, .. }
            | Self::NotFound { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Unauthorized { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
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
            | InterfaceError::Unauthorized { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::InvalidRequest(message) => Self::BadRequest { message, correlation_id },
            ApplicationError::Unauthenticated(message) => {
                Self::Unauthorized { message, correlation_id }
            }
            ApplicationError::NotFound(message) => Self::NotFound { message, correlation_id },
            ApplicationError::Persistence(message)
            | ApplicationError::Integration(message)
            | ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, InterfaceError};
    use crate::session::SessionStoreError;

    #[test]
    fn invalid_request_maps_to_bad_request_with_correlation_id() {
        let interface =
            ApplicationError::InvalidRequest("messages must not be empty".to_owned())
                .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(interface.status_code(), 400);
        assert_eq!(interface.details(), "messages must not be empty");
    }

    #[test]
    fn integration_failure_is_an_internal_error() {
        let interface = ApplicationError::Integration("completion endpoint returned 502".to_owned())
            .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.status_code(), 500);
        assert_eq!(
            interface.user_message(),
            "The request could not be completed. Please retry shortly."
        );
    }

    #[test]
    fn missing_credential_maps_to_unauthorized() {
        let interface = ApplicationError::Unauthenticated("no session cookie".to_owned())
            .into_interface("req-3");

        assert_eq!(interface.status_code(), 401);
        assert_eq!(interface.correlation_id(), "req-3");
    }

    #[test]
    fn session_store_errors_become_persistence_failures() {
        let error = ApplicationError::from(SessionStoreError::Unavailable("down".to_owned()));
        assert!(matches!(error, ApplicationError::Persistence(ref message) if message.contains("down")));
    }
}
