//! Diagnostic types for error reporting.

mod error;
mod path;

pub use error::{CompileError, Result};
pub use path::{ConfigPath, PATH_SEPARATOR};
