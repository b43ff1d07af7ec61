//! The source contract.

use crate::cache::CacheDir;
use crate::error::{Error, Result};
use crate::exec::ExecContext;
use crate::literal::Literal;
use crate::local::FileSource;
use std::fmt;
use std::path::{Path, PathBuf};

/// Concrete variant of a [`Source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Http,
    HttpTar,
    HttpJar,
    S3,
    S3Tar,
    S3Jar,
    File,
    FileTar,
    FileJar,
    Git,
    InlineText,
    InlineBinary,
    InlineTarGz,
    InlineJar,
    InlineCollection,
}

impl SourceKind {
    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Http => "HTTP",
            Self::HttpTar => "HTTPTar",
            Self::HttpJar => "HTTPJar",
            Self::S3 => "S3",
            Self::S3Tar => "S3Tar",
            Self::S3Jar => "S3Jar",
            Self::File => "File",
            Self::FileTar => "FileTar",
            Self::FileJar => "FileJar",
            Self::Git => "Git",
            Self::InlineText => "InlineText",
            Self::InlineBinary => "InlineBinary",
            Self::InlineTarGz => "InlineTarGZ",
            Self::InlineJar => "InlineJar",
            Self::InlineCollection => "InlineCollection",
        }
    }

    /// Whether the payload is embedded in the manifest.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Self::InlineText
                | Self::InlineBinary
                | Self::InlineTarGz
                | Self::InlineJar
                | Self::InlineCollection
        )
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved, immutable handle on code or data.
///
/// Sources hold no runtime state. Side effects happen only through
/// [`cache`](Source::cache), which stages content into a caller-owned
/// [`CacheDir`], and through [`place`](Source::place) and
/// [`run`](Source::run), which consume the returned [`LocalHandle`].
pub trait Source: fmt::Debug + Send + Sync {
    /// Which variant this is.
    fn kind(&self) -> SourceKind;

    /// Stage whatever local data `place` and `run` need.
    fn cache(&self, cache: &CacheDir, ctx: &ExecContext) -> Result<LocalHandle>;

    /// Materialize the content at `dest`, creating parent directories.
    fn place(&self, handle: &LocalHandle, dest: &Path, ctx: &ExecContext) -> Result<()>;

    /// Execute the source as a program, inheriting standard streams.
    fn run(&self, handle: &LocalHandle, args: &[String], ctx: &ExecContext) -> Result<()>;

    /// The minimal manifest literal that interprets back to this source.
    fn externalize(&self) -> Literal;

    /// A time-limited, credential-free equivalent of this source.
    ///
    /// Credentials and settings are looked up through `ctx`.
    fn sign(&self, _ctx: &ExecContext) -> Result<Box<dyn Source>> {
        Err(Error::not_signable(
            self.describe(),
            format!("{} sources have no signing capability", self.kind()),
        ))
    }

    /// Short human readable description, with credentials masked.
    fn describe(&self) -> String;
}

/// Local view of a source after [`Source::cache`].
///
/// `scratch` is the cache directory the handle was produced for; adapters
/// extract programs there. `data` is where the content lives locally, which is
/// inside `scratch` for fetched sources and the resolved path for local ones.
#[derive(Debug, Clone)]
pub struct LocalHandle {
    scratch: PathBuf,
    data: Option<PathBuf>,
    local: Option<FileSource>,
}

impl LocalHandle {
    /// Content fetched or found at `data`, equivalent to the `local` source.
    pub(crate) fn at(cache: &CacheDir, data: PathBuf, local: FileSource) -> Self {
        Self {
            scratch: cache.path().to_path_buf(),
            data: Some(data),
            local: Some(local),
        }
    }

    /// Content carried by the source itself.
    pub(crate) fn inline(cache: &CacheDir) -> Self {
        Self {
            scratch: cache.path().to_path_buf(),
            data: None,
            local: None,
        }
    }

    /// The cache directory this handle belongs to.
    pub fn scratch(&self) -> &Path {
        &self.scratch
    }

    /// Local location of the content, if it has one.
    pub fn data(&self) -> Option<&Path> {
        self.data.as_deref()
    }

    /// Local content path, or an error for handles without one.
    pub(crate) fn require_data(&self) -> Result<&Path> {
        self.data.as_deref().ok_or_else(|| {
            Error::io(
                &self.scratch,
                std::io::Error::new(std::io::ErrorKind::NotFound, "nothing was cached"),
            )
        })
    }

    /// An equivalent `file://` source reading the cached content.
    ///
    /// Only meaningful while the cache directory is alive. Inline sources
    /// have no file equivalent.
    pub fn to_source(&self) -> Option<&FileSource> {
        self.local.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(SourceKind::Http.to_string(), "HTTP");
        assert_eq!(SourceKind::S3Jar.to_string(), "S3Jar");
        assert_eq!(SourceKind::InlineTarGz.to_string(), "InlineTarGZ");
    }

    #[test]
    fn test_inline_kinds() {
        assert!(SourceKind::InlineCollection.is_inline());
        assert!(SourceKind::InlineJar.is_inline());
        assert!(!SourceKind::File.is_inline());
        assert!(!SourceKind::Git.is_inline());
    }

    #[test]
    fn test_inline_handle_has_no_data() {
        let cache = CacheDir::new().unwrap();
        let handle = LocalHandle::inline(&cache);
        assert_eq!(handle.scratch(), cache.path());
        assert!(handle.data().is_none());
        assert!(handle.to_source().is_none());
        assert!(matches!(handle.require_data(), Err(Error::Io { .. })));
    }
}
