use std::path::PathBuf;

use crate::hierarchy::NodeKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while parsing, resolving, rescaling or committing a run.
///
/// Every variant except `Commit` is raised before the data file is touched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed block structure (unbalanced braces, dangling operators).
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The requested hierarchy node has no match.
    #[error("no {kind} matches '{name}'")]
    NotFound { kind: NodeKind, name: String },

    /// The requested node resolves to zero leaves.
    #[error("'{name}' resolves to no leaf locations")]
    EmptyAggregate { name: String },

    /// The resolved leaves carry no weight, so there is nothing to scale.
    #[error("current total under '{name}' is zero, nothing to scale")]
    ZeroTotal { name: String },

    /// Target totals must be finite and positive (zero is allowed when rescaling directly).
    #[error("invalid target total {0}")]
    InvalidTarget(f64),

    /// The rescaled total drifted away from the target.
    #[error("rescaled total {actual} differs from target {expected} by more than {tolerance}")]
    InternalConsistency { expected: f64, actual: f64, tolerance: f64 },

    #[error("failed to access {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },

    /// The file on disk changed since it was read.
    #[error("{} changed on disk since it was read, refusing to overwrite", path.display())]
    Stale { path: PathBuf },

    /// The backup could not be written or did not verify.
    #[error("backup {} failed: {reason}", path.display())]
    Backup { path: PathBuf, reason: String },

    /// The overwrite failed after the backup was written.
    #[error("failed to write {} (backup kept at {}): {source}", path.display(), backup.display())]
    Commit { path: PathBuf, backup: PathBuf, source: std::io::Error },

    /// The normalized-record source failed.
    #[error("record source failed: {0}")]
    Records(#[source] anyhow::Error),
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse { line, message: message.into() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}
