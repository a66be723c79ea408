/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::types::ResourceId;
use crate::native::constants::{self, ErrorCode};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure reported by the native library for one call
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[error("{message} (native error {code})")]
pub struct NativeError {
    pub code: ErrorCode,
    pub message: String,
}

impl NativeError {
    /// Build an error whose text comes from the native error table
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            message: constants::error_text(code).to_string(),
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Whether the code indicates a permissions or authentication problem
    #[inline]
    pub fn is_security(&self) -> bool {
        constants::SECURITY_ERROR_CODES.contains(&self.code)
    }
}

/// Result of a single native call
pub type NativeResult<T> = Result<T, NativeError>;

/// The closed set of error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Remote or operational failure
    Native,
    /// Native failure caused by permissions or authentication
    Security,
    /// The caller used the API incorrectly
    ClientProgrammer,
    /// An invariant of the lifecycle core was violated
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Native => "native",
            ErrorKind::Security => "security",
            ErrorKind::ClientProgrammer => "client_programmer",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Runtime errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum VixError {
    #[error("{message} (native error {code})")]
    #[diagnostic(
        code(vix::native),
        help("The native library rejected the operation. Check the remote host state.")
    )]
    Native { code: ErrorCode, message: String },

    #[error("Security violation: {message} (native error {code})")]
    #[diagnostic(
        code(vix::security),
        help("Check the credentials and the permissions granted on the host or guest.")
    )]
    Security { code: ErrorCode, message: String },

    #[error("Client programmer error: {0}")]
    #[diagnostic(
        code(vix::client_programmer),
        help("The object must be OPEN to perform this operation.")
    )]
    ClientProgrammer(String),

    #[error("Internal error: {0}")]
    #[diagnostic(
        code(vix::internal),
        help("The lifecycle core reached an inconsistent state. Please report this issue.")
    )]
    Internal(String),
}

impl VixError {
    pub fn client(msg: impl Into<String>) -> Self {
        VixError::ClientProgrammer(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        VixError::Internal(msg.into())
    }

    /// Error raised by every operation on a resource that is not open
    pub fn not_open(id: ResourceId) -> Self {
        VixError::ClientProgrammer(format!(
            "resource {} must be OPEN to perform this operation",
            id
        ))
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            VixError::Native { .. } => ErrorKind::Native,
            VixError::Security { .. } => ErrorKind::Security,
            VixError::ClientProgrammer(_) => ErrorKind::ClientProgrammer,
            VixError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Native error code, when the failure came from the native library
    pub fn native_code(&self) -> Option<ErrorCode> {
        match self {
            VixError::Native { code, .. } | VixError::Security { code, .. } => Some(*code),
            _ => None,
        }
    }

    #[inline]
    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::ClientProgrammer
    }

    #[inline]
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

impl From<NativeError> for VixError {
    fn from(err: NativeError) -> Self {
        if err.is_security() {
            VixError::Security {
                code: err.code,
                message: err.message,
            }
        } else {
            VixError::Native {
                code: err.code,
                message: err.message,
            }
        }
    }
}

/// Common result type for runtime operations
pub type VixResult<T> = Result<T, VixError>;
