//! Error types for source resolution and execution.
//!
//! Every failure is local and typed. Errors are grouped into categories so
//! callers can present consistent advice without matching every variant.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for source operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of source errors for user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The reference is malformed or was given to the wrong adapter.
    Reference,
    /// A literal payload or dispatch input has the wrong shape.
    Format,
    /// Network or transfer tool failure.
    Network,
    /// The operation is not supported by this source.
    Capability,
    /// A child process failed.
    Execution,
    /// Local filesystem errors.
    Io,
}

impl ErrorCategory {
    /// Whether this error category is typically transient.
    ///
    /// Nothing in this crate retries; the flag is informational.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Reference => "Invalid source reference",
            Self::Format => "Unrecognized source format",
            Self::Network => "Fetch failed",
            Self::Capability => "Operation not supported",
            Self::Execution => "Command failed",
            Self::Io => "Filesystem error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Reference => "Check the URL scheme, path and fragment of the source",
            Self::Format => "Use a URL string or a one-key mapping such as {text: ...}",
            Self::Network => "Check connectivity, credentials and that the object exists",
            Self::Capability => "Use a file-natured reference or a different source kind",
            Self::Execution => "Inspect the command output above for details",
            Self::Io => "Check that the paths exist and are writable",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while resolving, fetching, placing or running sources.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A reference was presented to an adapter that does not handle its scheme.
    #[error("the accepted schemes for {adapter} (which are: {accepted}) do not include: {scheme}")]
    InvalidScheme {
        /// Adapter that rejected the reference.
        adapter: &'static str,
        /// Comma-separated accepted schemes.
        accepted: String,
        /// Scheme that was presented.
        scheme: String,
    },

    /// Right scheme, illegal shape.
    #[error("invalid reference {reference}: {reason}")]
    InvalidReference {
        /// Reference, with credentials masked.
        reference: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Dispatch input is neither a string nor a mapping.
    #[error("unknown source format: {0}")]
    UnknownSourceFormat(String),

    /// Dispatch input is a mapping of the wrong size, or its payload is malformed.
    #[error("bad source format: {0}")]
    BadSourceFormat(String),

    /// No registered handler matched the scheme or key.
    #[error("unsupported {shape} source: {kind}")]
    Unsupported {
        /// `"URL"` or `"inline"`.
        shape: &'static str,
        /// Scheme or mapping key.
        kind: String,
    },

    /// Network or transfer tool failure.
    #[error("failed to fetch {reference}: {message}")]
    Fetch {
        /// Reference being fetched.
        reference: String,
        /// Error message.
        message: String,
    },

    /// The source or its reference shape cannot be executed.
    #[error("{what} can not be executed: {reason}")]
    NotExecutable {
        /// Description of the source.
        what: String,
        /// Why.
        reason: String,
    },

    /// The source cannot be presigned.
    #[error("{what} can not be signed: {reason}")]
    NotSignable {
        /// Description of the source.
        what: String,
        /// Why.
        reason: String,
    },

    /// A child process exited unsuccessfully.
    #[error("{program} failed with {}", describe_status(.status))]
    RunFailed {
        /// Program that was executed.
        program: String,
        /// Exit code, if the process exited normally.
        status: Option<i32>,
    },

    /// Archive could not be read, or the selected entry is missing.
    #[error("archive error: {0}")]
    Archive(String),

    /// IO error during file operations.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "no exit status (terminated by signal)".to_string(),
    }
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid reference error.
    pub fn invalid(reference: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a fetch error.
    pub fn fetch(reference: impl fmt::Display, message: impl Into<String>) -> Self {
        Self::Fetch {
            reference: reference.to_string(),
            message: message.into(),
        }
    }

    /// Create a not-executable error.
    pub fn not_executable(what: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::NotExecutable {
            what: what.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a not-signable error.
    pub fn not_signable(what: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::NotSignable {
            what: what.to_string(),
            reason: reason.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidScheme { .. } | Error::InvalidReference { .. } => {
                ErrorCategory::Reference
            }
            Error::UnknownSourceFormat(_)
            | Error::BadSourceFormat(_)
            | Error::Unsupported { .. }
            | Error::Archive(_) => ErrorCategory::Format,
            Error::Fetch { .. } => ErrorCategory::Network,
            Error::NotExecutable { .. } | Error::NotSignable { .. } => ErrorCategory::Capability,
            Error::RunFailed { .. } => ErrorCategory::Execution,
            Error::Io { .. } => ErrorCategory::Io,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}
