// ── Core error types ──
//
// User-facing errors from emrscope-core. Domain crates translate their
// SDK failures into `CoreError::Remote` so the hierarchy engine never
// sees transport details -- network and authorization failures are
// surfaced identically.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    // ── Remote errors ────────────────────────────────────────────────
    /// A `list` / `describe` / `list_children` call against a domain failed.
    #[error("{domain}: {operation} failed: {message}")]
    Remote {
        /// Domain key (e.g. `emr-ec2`).
        domain: String,
        /// Remote operation name (e.g. `ListClusters`).
        operation: String,
        message: String,
    },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Unknown resource domain: {key}")]
    UnknownDomain { key: String },

    #[error("No node '{segment}' under {parent}")]
    NodeNotFound { parent: String, segment: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Build a remote-call failure for `domain` / `operation`.
    pub fn remote(
        domain: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Remote {
            domain: domain.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this error came from a remote call.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}
