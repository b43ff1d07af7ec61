//! Git repository references.
//!
//! References are recognised and validated so that manifests naming them
//! parse and round-trip, but nothing is cloned yet: every operation that
//! needs the repository content fails with a fetch error.
//!
//! ```text
//! git+ssh://abc.example.com/web/server.git?beta          # branch or tag
//! git+ssh://abc.example.com/web/server.git?ref=0abc3df   # same, explicit
//! git+file:///@/.#docs/                                  # manifest's repo
//! ```

use crate::archive::ArchiveKind;
use crate::cache::CacheDir;
use crate::error::{Error, Result};
use crate::exec::ExecContext;
use crate::literal::Literal;
use crate::local::{FileSource, Origin};
use crate::reference::Reference;
use crate::source::{LocalHandle, Source, SourceKind};
use std::path::Path;

const SCHEMES: &[&str] = &["git+file", "git+http", "git+https", "git+ssh"];

/// A tree in a Git repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSource {
    reference: Reference,
    revision: Option<String>,
}

impl GitSource {
    /// Validate `reference`; `git+file` paths follow the `/@/` rules of
    /// `file://` references.
    pub fn new(reference: Reference, origin: &Origin) -> Result<Self> {
        reference.require_scheme("Git", SCHEMES)?;
        if reference.transport() == "file" {
            FileSource::new(ArchiveKind::Plain, reference.base(), origin)?;
        }
        let revision = match reference.query() {
            None | Some("") => None,
            Some(query) => Some(parse_revision(query).ok_or_else(|| {
                Error::invalid(reference.display(), "query must be ?<rev> or ?ref=<rev>")
            })?),
        };
        Ok(Self {
            reference,
            revision,
        })
    }

    /// Parse and validate.
    pub fn parse(input: &str, origin: &Origin) -> Result<Self> {
        Self::new(Reference::parse(input)?, origin)
    }

    /// Branch, tag or commit prefix selected by the query.
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Path inside the repository selected by the fragment.
    pub fn subpath(&self) -> Option<&str> {
        self.reference.fragment()
    }

    fn unsupported(&self) -> Error {
        Error::fetch(self.reference.display(), "git sources are not supported yet")
    }
}

fn parse_revision(query: &str) -> Option<String> {
    match query.split_once('=') {
        Some(("ref", rev)) if !rev.is_empty() => Some(rev.to_string()),
        Some(_) => None,
        None if query.contains('&') => None,
        None => Some(query.to_string()),
    }
}

impl Source for GitSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Git
    }

    fn cache(&self, _cache: &CacheDir, _ctx: &ExecContext) -> Result<LocalHandle> {
        Err(self.unsupported())
    }

    fn place(&self, _handle: &LocalHandle, _dest: &Path, _ctx: &ExecContext) -> Result<()> {
        Err(self.unsupported())
    }

    fn run(&self, _handle: &LocalHandle, _args: &[String], _ctx: &ExecContext) -> Result<()> {
        Err(self.unsupported())
    }

    fn externalize(&self) -> Literal {
        Literal::Str(self.reference.to_string())
    }

    fn describe(&self) -> String {
        self.reference.display()
    }
}
