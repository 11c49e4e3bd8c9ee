//! Compiler error types.
#![allow(unused_assignments)]

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use super::ConfigPath;

/// Result alias used throughout the compiler.
pub type Result<T, E = CompileError> = std::result::Result<T, E>;

/// Errors that can occur while loading or compiling a mapping.
///
/// Every variant is raised before a plan is returned or cached. Executing a
/// compiled plan never produces one of these.
#[allow(unused_assignments)]
#[derive(Error, Diagnostic, Debug)]
pub enum CompileError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Failed to read mapping '{}': {message}", path.display())]
    #[diagnostic(code(projection::config::io_error))]
    Io { path: PathBuf, message: String },

    #[error("Failed to parse mapping '{source_name}': {message}")]
    #[diagnostic(code(projection::config::parse_error))]
    Parse { source_name: String, message: String },

    #[error("Configuration section '{path}' does not exist")]
    #[diagnostic(code(projection::config::missing_section))]
    MissingSection { path: ConfigPath },

    // =========================================================================
    // Mapping Errors
    // =========================================================================
    #[error("Unsupported format '{format}' at '{path}'")]
    #[diagnostic(
        code(projection::mapping::unsupported_format),
        help("Mappings use format \"object[]\"; embedded columns and index targets use format \"json\"")
    )]
    UnsupportedFormat { path: ConfigPath, format: String },

    #[error("Missing required key '{key}' at '{path}'")]
    #[diagnostic(code(projection::mapping::missing_key))]
    MissingRequiredKey { path: ConfigPath, key: String },

    #[error("Invalid mapping at '{path}': {message}")]
    #[diagnostic(code(projection::mapping::invalid))]
    InvalidMapping { path: ConfigPath, message: String },

    // =========================================================================
    // Resolution Errors
    // =========================================================================
    #[error("Field '{field}' does not resolve against shape '{shape}' (at '{path}')")]
    #[diagnostic(
        code(projection::resolve::unresolvable_field),
        help("Check the field name and that the shape registers it")
    )]
    UnresolvableField {
        path: ConfigPath,
        field: String,
        shape: &'static str,
    },

    #[error("Field '{field}' of type {actual} cannot be used as {declared} (at '{path}')")]
    #[diagnostic(code(projection::resolve::type_coercion))]
    TypeCoercionFailure {
        path: ConfigPath,
        field: String,
        declared: String,
        actual: String,
    },
}

impl CompileError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid(path: &ConfigPath, message: impl Into<String>) -> Self {
        Self::InvalidMapping {
            path: path.clone(),
            message: message.into(),
        }
    }

    pub fn missing_key(path: &ConfigPath, key: &str) -> Self {
        Self::MissingRequiredKey {
            path: path.clone(),
            key: key.to_string(),
        }
    }

    pub fn unsupported_format(path: &ConfigPath, format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            path: path.clone(),
            format: format.into(),
        }
    }

    /// Configuration path of the offending node, when the error has one.
    pub fn config_path(&self) -> Option<&ConfigPath> {
        match self {
            Self::Io { .. } | Self::Parse { .. } => None,
            Self::MissingSection { path }
            | Self::UnsupportedFormat { path, .. }
            | Self::MissingRequiredKey { path, .. }
            | Self::InvalidMapping { path, .. }
            | Self::UnresolvableField { path, .. }
            | Self::TypeCoercionFailure { path, .. } => Some(path),
        }
    }
}
