//! Error types for the EC2 backend.

use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;

/// Errors raised by the EC2 backend.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Ec2BackendError {
    /// Raised when the high-level configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when a request is missing a required field.
    #[error("invalid instance request: {0}")]
    Validation(String),
    /// Raised when a launch response carries no instance record.
    #[error("launch request for '{node_name}' returned no instance")]
    MissingInstance {
        /// Node name from the originating request.
        node_name: String,
    },
    /// Raised when an asynchronous operation exceeds the timeout.
    #[error("timeout waiting for {action} on instance {instance_id}")]
    Timeout {
        /// Action being waited on.
        action: String,
        /// Provider instance identifier.
        instance_id: String,
    },
    /// Raised when a running instance never exposes a public address.
    #[error("instance {instance_id} missing public DNS name and IP address")]
    MissingAddress {
        /// Provider instance identifier.
        instance_id: String,
    },
    /// Wrapper for AWS API failures.
    #[error("provider error: {message}")]
    Api {
        /// Rendered error chain from the AWS SDK.
        message: String,
    },
}

impl<E, R> From<SdkError<E, R>> for Ec2BackendError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    fn from(value: SdkError<E, R>) -> Self {
        Self::Api {
            message: DisplayErrorContext(value).to_string(),
        }
    }
}

impl From<BackendError> for Ec2BackendError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Validation(field) => Self::Validation(field),
        }
    }
}

impl From<ConfigError> for Ec2BackendError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}

/// Extracts the EC2 error code from a service-level failure, when present.
pub(in crate::ec2) fn sdk_error_code<E, R>(error: &SdkError<E, R>) -> Option<&str>
where
    E: ProvideErrorMetadata,
{
    error.as_service_error().and_then(ProvideErrorMetadata::code)
}
