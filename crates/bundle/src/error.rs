//! Error types for the bundle crate

use sourcekit::ErrorCategory;
use thiserror::Error;

/// Errors that can occur while ingesting or running a task
#[derive(Error, Debug)]
pub enum Error {
    /// Resolving a source failed while reading the manifest
    #[error(transparent)]
    Source(#[from] sourcekit::Error),

    /// The manifest literal has the wrong shape
    #[error("invalid manifest: {0}")]
    Manifest(String),

    /// An entry failed while running; the runner stops here
    #[error("{label}: {cause}")]
    EntryFailed {
        /// Label or description of the entry
        label: String,
        /// What went wrong
        #[source]
        cause: sourcekit::Error,
    },
}

impl Error {
    pub(crate) fn manifest(message: impl Into<String>) -> Self {
        Self::Manifest(message.into())
    }

    /// Coarse category, for user-facing advice.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Source(e) | Self::EntryFailed { cause: e, .. } => e.category(),
            Self::Manifest(_) => ErrorCategory::Format,
        }
    }
}

/// Result type for bundle operations
pub type Result<T> = std::result::Result<T, Error>;
