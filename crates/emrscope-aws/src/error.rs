use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use emrscope_core::CoreError;
use thiserror::Error;

/// Top-level error type for the `emrscope-aws` crate.
///
/// SDK failures are flattened into strings at the call site so the error
/// stays `Clone` and never leaks SDK generics. `emrscope-core` only ever
/// sees the [`CoreError::Remote`] these convert into.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    // ── Remote ──────────────────────────────────────────────────────
    /// An SDK operation failed (network, auth, throttling, service error).
    #[error("{domain}: {operation} failed: {message}")]
    Sdk {
        domain: &'static str,
        operation: &'static str,
        message: String,
    },

    // ── Session ─────────────────────────────────────────────────────
    /// The configured endpoint override is not a valid URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// A resource id that does not have the shape the domain expects.
    #[error("Malformed {domain} id '{id}': {reason}")]
    MalformedId {
        domain: &'static str,
        id: String,
        reason: &'static str,
    },
}

impl Error {
    /// Flatten an SDK error, preferring the service's code and message.
    pub(crate) fn sdk<E>(domain: &'static str, operation: &'static str, err: &E) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error,
    {
        let message = match (err.code(), err.message()) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (Some(code), None) => code.to_owned(),
            _ => DisplayErrorContext(err).to_string(),
        };
        Self::Sdk {
            domain,
            operation,
            message,
        }
    }

    /// Returns `true` if the service rejected the request for lack of access.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::Sdk { message, .. } if message.starts_with("AccessDenied"))
    }
}

impl From<Error> for CoreError {
    fn from(err: Error) -> Self {
        let text = err.to_string();
        match err {
            Error::Sdk {
                domain,
                operation,
                message,
            } => CoreError::remote(domain, operation, message),
            Error::MalformedId { domain, .. } => CoreError::remote(domain, "describe", text),
            Error::InvalidEndpoint(_) => CoreError::Config { message: text },
        }
    }
}
