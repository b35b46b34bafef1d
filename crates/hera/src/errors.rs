//! Error and retry-policy types for the Hera client.
//!
//! [`HeraError`] is the single, closed error type returned by every public
//! operation. It distinguishes local configuration problems, missing modules,
//! client-side policy refusals, bad caller input, and failures reported by the
//! remote appliance ([`RemoteError`]).
//!
//! [`RetryPolicy`] lets callers decide whether re-issuing an operation could
//! help. The client itself never retries.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ModuleName, NodeName, PoolName};

/// Convenience alias used throughout the workspace.
pub type HeraResult<T> = Result<T, HeraError>;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry.
///
/// - `Retryable` errors: network failures between client and appliance.
/// - `NonRetryable` errors: everything else (configuration, missing modules,
///   policy refusals, authentication failures, SOAP faults).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried on the caller's own back-off schedule.
    Retryable,
    /// The operation must not be retried without human intervention.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Remote failures
// ---------------------------------------------------------------------------

/// Classification of a failure reported while talking to the appliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteErrorKind {
    /// The appliance rejected the credential (HTTP 401 / 403).
    Authentication {
        /// HTTP status code returned by the appliance.
        status: u16,
    },
    /// The request never produced an HTTP response, or the response status
    /// was an unexpected non-success code without a SOAP fault body.
    Transport,
    /// The appliance answered with a SOAP fault.
    Fault {
        /// Fault code (e.g. `SOAP-ENV:Server`).
        code: String,
        /// Fault string / reason text.
        message: String,
    },
    /// The response could not be decoded into the expected shape.
    InvalidResponse,
}

impl std::fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteErrorKind::Authentication { status } => write!(f, "authentication failed (HTTP {status})"),
            RemoteErrorKind::Transport => f.write_str("transport failure"),
            RemoteErrorKind::Fault { code, message } => write!(f, "fault {code}: {message}"),
            RemoteErrorKind::InvalidResponse => f.write_str("invalid response"),
        }
    }
}

/// A failure surfaced by the transport / binding layer during a remote call.
///
/// Propagated to the caller verbatim; Hera does not reinterpret it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{operation}: {kind}: {detail}")]
pub struct RemoteError {
    /// Remote operation that failed (e.g. `getPoolNames`).
    pub operation: String,
    /// What went wrong.
    pub kind: RemoteErrorKind,
    /// Human-readable detail from the transport or decoder.
    pub detail: String,
}

impl RemoteError {
    /// Creates a remote error for `operation`.
    pub fn new(operation: impl Into<String>, kind: RemoteErrorKind, detail: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            kind,
            detail: detail.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Client-level errors
// ---------------------------------------------------------------------------

/// Errors returned by Hera operations.
///
/// On every variant except [`HeraError::Remote`] the client's binding state is
/// guaranteed unchanged and no remote mutation has been issued.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum HeraError {
    /// The service-description directory is missing or unreadable, a
    /// description could not be loaded, or a bound module lacks the interface
    /// an operation needs.
    #[error("Configuration error at '{}': {reason}", .path.display())]
    Configuration {
        /// Directory or file the problem relates to.
        path: PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// The requested module has no description in the directory.
    #[error("Unable to locate service description '{module}' in '{}'", .directory.display())]
    ModuleNotFound {
        /// Module that was requested (normalized).
        module: String,
        /// Directory that was searched.
        directory: PathBuf,
    },

    /// A client-side safety check refused the operation before any remote
    /// mutation was issued.
    #[error("Refusing to disable node(s) in pool '{pool}' with {active_connections} active connection(s)")]
    Policy {
        /// Pool the nodes belong to.
        pool: PoolName,
        /// Nodes the caller asked to disable.
        nodes: Vec<NodeName>,
        /// Sum of active connections across `nodes` at check time.
        active_connections: u64,
    },

    /// A caller-supplied value could not be interpreted.
    #[error("Invalid {argument}: {reason}")]
    InvalidArgument {
        /// Which argument was rejected.
        argument: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A remote call failed.
    #[error("Remote call failed: {0}")]
    Remote(#[from] RemoteError),
}

impl HeraError {
    /// Builds a [`HeraError::ModuleNotFound`] for `module` under `directory`.
    pub fn module_not_found(module: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        HeraError::ModuleNotFound {
            module: module.into(),
            directory: directory.into(),
        }
    }

    /// Builds a [`HeraError::Configuration`] for a bound module that does not
    /// offer the interface an operation needs.
    pub fn missing_interface(module: &ModuleName, location: impl Into<PathBuf>, interface: &str) -> Self {
        HeraError::Configuration {
            path: location.into(),
            reason: format!("module '{module}' does not provide the {interface} interface"),
        }
    }

    /// Whether re-issuing the failed operation could succeed.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            HeraError::Remote(RemoteError {
                kind: RemoteErrorKind::Transport,
                ..
            }) => RetryPolicy::Retryable,
            _ => RetryPolicy::NonRetryable,
        }
    }
}
