//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError`, `ConfigError`, and session errors into user-facing
//! errors with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use emrscope_config::ConfigError;
use emrscope_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Remote ───────────────────────────────────────────────────────

    #[error("{domain}: {operation} failed: {message}")]
    #[diagnostic(
        code(emrscope::remote),
        help(
            "Check the credentials and region in use.\n\
             Try: emrscope --region <region> --profile <profile> domains"
        )
    )]
    Remote {
        domain: String,
        operation: String,
        message: String,
    },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(emrscope::not_found),
        help("Run: emrscope {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Unknown domain '{key}'")]
    #[diagnostic(
        code(emrscope::unknown_domain),
        help("Run: emrscope domains to see registered domains")
    )]
    UnknownDomain { key: String },

    #[error("No node '{segment}' under '{parent}'")]
    #[diagnostic(
        code(emrscope::node_not_found),
        help("List the parent's children with `emrscope ls` and use an id or name from it")
    )]
    NodeNotFound { parent: String, segment: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(emrscope::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(emrscope::config_exists),
        help("Use --force to overwrite it, or edit it directly.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(
        code(emrscope::config),
        help("Run: emrscope config path to locate the file in use")
    )]
    Config(#[from] ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(emrscope::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(emrscope::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to render TOML: {0}")]
    #[diagnostic(code(emrscope::toml))]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Remote { message, .. } => remote_exit_code(message),
            Self::NotFound { .. } | Self::UnknownDomain { .. } | Self::NodeNotFound { .. } => {
                exit_code::NOT_FOUND
            }
            Self::Validation { .. } => exit_code::USAGE,
            Self::ConfigExists { .. } => exit_code::CONFLICT,
            _ => exit_code::GENERAL,
        }
    }
}

/// Classify a flattened SDK message (`Code: message`) by its error code.
fn remote_exit_code(message: &str) -> i32 {
    let code = message.split(':').next().unwrap_or_default().trim();
    match code {
        "AccessDeniedException" | "AccessDenied" | "UnauthorizedOperation" => {
            exit_code::PERMISSION
        }
        "ExpiredTokenException" | "UnrecognizedClientException" | "InvalidSignatureException"
        | "InvalidClientTokenId" => exit_code::AUTH,
        _ if message.contains("timed out") || message.contains("timeout") => exit_code::TIMEOUT,
        _ if message.contains("dispatch failure") || message.contains("connection") => {
            exit_code::CONNECTION
        }
        _ => exit_code::GENERAL,
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Remote {
                domain,
                operation,
                message,
            } => CliError::Remote {
                domain,
                operation,
                message,
            },

            CoreError::UnknownDomain { key } => CliError::UnknownDomain { key },

            CoreError::NodeNotFound { parent, segment } => {
                CliError::NodeNotFound { parent, segment }
            }

            CoreError::Config { message } => CliError::Validation {
                field: "configuration".into(),
                reason: message,
            },
        }
    }
}

impl From<emrscope_aws::Error> for CliError {
    fn from(err: emrscope_aws::Error) -> Self {
        CoreError::from(err).into()
    }
}
