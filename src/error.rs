//! Structured error types for chainlint.
//!
//! Two real error kinds exist in this tool: a positional argument's glob
//! pattern failing to parse, and a file failing to read. A third,
//! `Internal`, exists only to convert a caught worker-thread panic into a
//! per-file report instead of taking down the whole run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainlintError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid glob pattern '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("internal error: {detail}")]
    Internal { detail: String },
}

impl ChainlintError {
    /// Render this error the way it appears inline in annotated output:
    /// `?!ERR?! PATH: REASON` for I/O failures (§6).
    pub fn as_annotation(&self, path: &str) -> String {
        match self {
            ChainlintError::Io { source, .. } => format!("?!ERR?! {}: {}\n", path, source),
            ChainlintError::Glob { pattern, source } => {
                format!("?!ERR?! {}: {}\n", pattern, source)
            }
            ChainlintError::Internal { detail } => format!("?!ERR?! {}: {}\n", path, detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_renders_as_path_prefixed_annotation() {
        let err = ChainlintError::Io {
            path: PathBuf::from("t/broken.sh"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let rendered = err.as_annotation("t/broken.sh");
        assert!(rendered.starts_with("?!ERR?! t/broken.sh: "));
        assert!(rendered.ends_with('\n'));
    }
}
