//! Error types for command parsing, stepping and serving.

use heat_core::StepError;
use std::fmt;

/// A request path that does not name a usable command.
///
/// Both variants are answered with the fixed `unknown command` body.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    /// The name is not recognised, or was given the wrong number of arguments.
    Unknown {
        name: String,
    },
    /// The argument failed to parse as the expected type.
    Parameter {
        name: String,
        arg: String,
        expected: &'static str,
    },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown { name } => write!(f, "unknown command `{name}`"),
            Self::Parameter { name, arg, expected } => {
                write!(f, "`{name}` expects {expected}, got `{arg}`")
            }
        }
    }
}

impl std::error::Error for CommandError {}

/// A command that could not complete. Fails the request.
#[derive(Debug)]
pub enum StepFailure {
    Kernel(StepError),
    Encode(png::EncodingError),
    Store(std::io::Error),
    Status(serde_json::Error),
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kernel(e) => write!(f, "step function failed: {e}"),
            Self::Encode(e) => write!(f, "png encoding failed: {e}"),
            Self::Store(e) => write!(f, "image store failed: {e}"),
            Self::Status(e) => write!(f, "status serialization failed: {e}"),
        }
    }
}

impl std::error::Error for StepFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Kernel(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::Status(e) => Some(e),
        }
    }
}

impl From<StepError> for StepFailure {
    fn from(e: StepError) -> Self {
        Self::Kernel(e)
    }
}

impl From<png::EncodingError> for StepFailure {
    fn from(e: png::EncodingError) -> Self {
        Self::Encode(e)
    }
}

impl From<serde_json::Error> for StepFailure {
    fn from(e: serde_json::Error) -> Self {
        Self::Status(e)
    }
}

impl From<std::io::Error> for StepFailure {
    fn from(e: std::io::Error) -> Self {
        Self::Store(e)
    }
}

/// Startup failures of the HTTP transport.
#[derive(Debug)]
pub enum ServerError {
    Bind(String),
    Header(&'static str),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind(reason) => write!(f, "could not bind listener: {reason}"),
            Self::Header(raw) => write!(f, "invalid header `{raw}`"),
        }
    }
}

impl std::error::Error for ServerError {}
