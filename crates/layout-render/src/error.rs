//! Error types for template compilation and rendering.
//!
//! [`RenderError`] is the single error type returned by the public API. It
//! hides the underlying template engine's error type behind a stable set of
//! variants that follow the compile-fatal / execution split.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for template set compilation and rendering operations.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A template file failed to parse. Aborts the whole compile pass.
    #[error("failed to compile template \"{name}\": {message}")]
    Compile {
        /// Name the template would have been registered under.
        name: String,
        /// Parser message from the template engine.
        message: String,
    },

    /// A matched template file could not be read. Aborts the whole compile pass.
    #[error("failed to read template file \"{}\": {source}", path.display())]
    Read {
        /// Path of the file that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The engine was asked to execute a template that is not in the set.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Runtime failure while executing a template.
    #[error("template execution failed: {0}")]
    Execution(String),

    /// Data could not be encoded for output.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Writing to the output sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;

impl From<minijinja::Error> for RenderError {
    fn from(err: minijinja::Error) -> Self {
        use minijinja::ErrorKind;

        match err.kind() {
            ErrorKind::TemplateNotFound => RenderError::TemplateNotFound(err.to_string()),
            ErrorKind::SyntaxError | ErrorKind::BadEscape => RenderError::Compile {
                name: err.name().unwrap_or_default().to_string(),
                message: err.to_string(),
            },
            ErrorKind::BadSerialization => RenderError::Serialization(err.to_string()),
            _ => RenderError::Execution(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::Serialization(err.to_string())
    }
}

impl From<quick_xml::DeError> for RenderError {
    fn from(err: quick_xml::DeError) -> Self {
        RenderError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for RenderError {
    fn from(err: serde_yaml::Error) -> Self {
        RenderError::Config(err.to_string())
    }
}
