//! Container error types

use thiserror::Error;

use crate::key::SelectorKey;

/// Errors that can occur during registration, validation and resolution
#[derive(Debug, Error)]
pub enum DIError {
    #[error("Incompatible types: {implementation} is not assignable to {dependency}")]
    IncompatibleType {
        dependency: String,
        implementation: String,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Unresolved dependency: {service_type} (key {key})")]
    UnresolvedDependency {
        service_type: String,
        key: SelectorKey,
    },

    #[error("Cannot construct {type_name}: {message}")]
    Construction { type_name: String, message: String },

    #[error("Invalid service type: {message}")]
    InvalidServiceType { message: String },

    #[error("Invalid type descriptor '{input}': {message}")]
    InvalidDescriptor { input: String, message: String },

    #[error("Manifest error: {message}")]
    Manifest { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type DIResult<T> = Result<T, DIError>;

impl DIError {
    pub fn incompatible(dependency: impl ToString, implementation: impl ToString) -> Self {
        Self::IncompatibleType {
            dependency: dependency.to_string(),
            implementation: implementation.to_string(),
        }
    }

    pub fn unresolved(service_type: impl ToString, key: SelectorKey) -> Self {
        Self::UnresolvedDependency {
            service_type: service_type.to_string(),
            key,
        }
    }

    pub fn construction(type_name: impl ToString, message: impl Into<String>) -> Self {
        Self::Construction {
            type_name: type_name.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DIError::incompatible("IMessageSender", "Rep");
        assert_eq!(
            err.to_string(),
            "Incompatible types: Rep is not assignable to IMessageSender"
        );

        let err = DIError::unresolved("IRep", SelectorKey::FIRST);
        assert_eq!(err.to_string(), "Unresolved dependency: IRep (key First)");

        let err = DIError::construction("Email", "no constructor with resolvable parameters");
        assert_eq!(
            err.to_string(),
            "Cannot construct Email: no constructor with resolvable parameters"
        );

        let err = DIError::invalid_configuration("Email cannot be constructed");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: Email cannot be constructed"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.toml");
        let err: DIError = io.into();
        assert!(matches!(err, DIError::Io(_)));
        assert!(err.to_string().contains("missing.toml"));
    }
}
