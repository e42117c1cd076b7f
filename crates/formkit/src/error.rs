//! Error types for formkit

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or checking a form configuration
///
/// Field and form operations themselves never fail; these only surface from
/// loading definitions and from strict checks.
#[derive(Error, Debug)]
pub enum FormError {
    /// A configuration value has the wrong shape or is missing
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A handler list names a field that was never declared
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// Two fields share a name
    #[error("duplicate field '{0}'")]
    DuplicateField(String),

    /// Failed to read a form definition
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a form definition
    #[error("failed to parse form definition: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result type for formkit operations
pub type Result<T> = std::result::Result<T, FormError>;
