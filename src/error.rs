//! Error types for exam-forge operations.
//!
//! Defines error types for every subsystem of the generation pipeline:
//! - Question selection
//! - Document rendering
//! - Document compilation
//! - Asset relocation
//! - Repository (storage) access
//! - Pre-flight validation
//! - Configuration

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while selecting questions for a student.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Question bank is inconsistent: {0}")]
    InconsistentBank(String),
}

/// Errors that can occur while rendering a document.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Layout '{0}' not found")]
    LayoutNotFound(String),

    #[error("Invalid render context: {0}")]
    InvalidContext(String),

    #[error("Tera template rendering error: {0}")]
    Tera(#[from] tera::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while compiling a rendered document.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Compiler '{0}' not found")]
    NotFound(String),

    #[error("Compilation timed out after {} seconds", .timeout.as_secs_f64())]
    Timeout { timeout: Duration },

    #[error("Compiled output not created. Check log: {}", log.display())]
    MissingOutput { log: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while relocating assets into a run directory.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Asset path '{}' has no file name", .0.display())]
    InvalidPath(PathBuf),

    #[error("Failed to copy '{}': {source}", path.display())]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while reading or writing repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("'{0}' not found")]
    NotFound(String),

    #[error("Failed to parse '{path}': {message}")]
    ParseError { path: String, message: String },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A pre-flight rule violation. Never raised during generation itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed: {reason}")]
pub struct ValidationError {
    pub reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while building a generator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_display() {
        let err = CompileError::Timeout {
            timeout: Duration::from_secs(60),
        };
        assert_eq!(err.to_string(), "Compilation timed out after 60 seconds");

        let err = CompileError::Timeout {
            timeout: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "Compilation timed out after 0.25 seconds");

        let err = CompileError::NotFound("pdflatex".to_string());
        assert_eq!(err.to_string(), "Compiler 'pdflatex' not found");

        let err = CompileError::MissingOutput {
            log: PathBuf::from("out/exam.log"),
        };
        assert!(err.to_string().contains("out/exam.log"));
    }

    #[test]
    fn test_validation_error_carries_reason() {
        let err = ValidationError::new("Class roster cannot be empty");
        assert_eq!(err.reason, "Class roster cannot be empty");
        assert!(err.to_string().contains("roster"));
    }
}
