//! HTTP and HTTPS sources, plain or as tar and jar archives.

use crate::archive::ArchiveKind;
use crate::cache::CacheDir;
use crate::error::{Error, Result};
use crate::exec::ExecContext;
use crate::literal::Literal;
use crate::local::FileSource;
use crate::reference::Reference;
use crate::source::{LocalHandle, Source, SourceKind};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// A resource fetched with a GET request.
///
/// `tar+http(s)` references use their fragment to select a subtree or a
/// single entry of the downloaded archive; plain and jar references may not
/// carry a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSource {
    reference: Reference,
    archive: ArchiveKind,
}

impl HttpSource {
    /// Validate `reference` as an `archive` kind HTTP/S reference.
    pub fn new(archive: ArchiveKind, reference: Reference) -> Result<Self> {
        let accepted = [archive.scheme("http"), archive.scheme("https")];
        reference.require_scheme(Self::kind_of(archive).name(), &accepted)?;
        match archive {
            ArchiveKind::Plain => reference.forbid_fragment("plain HTTP/S")?,
            ArchiveKind::Jar => reference.forbid_fragment("jar HTTP/S")?,
            ArchiveKind::Tar => {}
        }
        Ok(Self { reference, archive })
    }

    /// Parse, taking the archive kind from the scheme prefix.
    pub fn parse(input: &str) -> Result<Self> {
        let reference = Reference::parse(input)?;
        let archive = ArchiveKind::from_prefix(reference.prefix()).unwrap_or_default();
        Self::new(archive, reference)
    }

    fn kind_of(archive: ArchiveKind) -> SourceKind {
        match archive {
            ArchiveKind::Plain => SourceKind::Http,
            ArchiveKind::Tar => SourceKind::HttpTar,
            ArchiveKind::Jar => SourceKind::HttpJar,
        }
    }

    /// The reference this source was built from.
    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    /// How the downloaded body is treated.
    pub fn archive(&self) -> ArchiveKind {
        self.archive
    }

    /// The URL actually requested: archive prefix and fragment removed.
    pub fn url(&self) -> String {
        self.reference.base().to_string()
    }

    /// Proxy for this URL, read from `ctx` the way curl reads its
    /// environment: `NO_PROXY` first, then the scheme's proxy variable, then
    /// `ALL_PROXY`.
    fn proxy(&self, ctx: &ExecContext) -> Result<Option<ureq::Proxy>> {
        let host = self.reference.host().unwrap_or_default();
        let no_proxy = ctx.var("NO_PROXY").or_else(|| ctx.var("no_proxy"));
        if no_proxy.is_some_and(|list| bypasses_proxy(&list, host)) {
            log::debug!("NO_PROXY matches {host}");
            return Ok(None);
        }
        let keys: &[&str] = if self.reference.transport() == "https" {
            &["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]
        } else {
            &["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]
        };
        let Some(uri) = keys
            .iter()
            .find_map(|key| ctx.var(key).filter(|value| !value.is_empty()))
        else {
            return Ok(None);
        };
        log::debug!("Using proxy {uri} for {host}");
        ureq::Proxy::new(&uri)
            .map(Some)
            .map_err(|e| Error::fetch(self.reference.display(), format!("bad proxy {uri}: {e}")))
    }

    fn download(&self, headers_path: &Path, body_path: &Path, ctx: &ExecContext) -> Result<()> {
        let url = self.url();
        log::info!("GET {}", self.reference.base().display());
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .proxy(self.proxy(ctx)?)
            .build()
            .into();
        let response = agent
            .get(&url)
            .header("User-Agent", concat!("arx/", env!("CARGO_PKG_VERSION")))
            .call()
            .map_err(|e| self.fetch_error(e))?;

        let mut headers = format!("{:?} {}\n", response.version(), response.status());
        for (name, value) in response.headers() {
            headers.push_str(&format!(
                "{}: {}\n",
                name,
                String::from_utf8_lossy(value.as_bytes())
            ));
        }
        fs::write(headers_path, headers).map_err(|e| Error::io(headers_path, e))?;

        let mut reader = response.into_body().into_reader();
        let mut file = fs::File::create(body_path).map_err(|e| Error::io(body_path, e))?;
        let bytes = io::copy(&mut reader, &mut file)
            .map_err(|e| Error::fetch(self.reference.display(), e.to_string()))?;
        file.flush().map_err(|e| Error::io(body_path, e))?;
        log::debug!("Downloaded {bytes} bytes to {}", body_path.display());
        Ok(())
    }

    fn fetch_error(&self, err: ureq::Error) -> Error {
        let message = match err {
            ureq::Error::StatusCode(code) => format!("HTTP {code}"),
            other => other.to_string(),
        };
        Error::fetch(self.reference.display(), message)
    }
}

impl Source for HttpSource {
    fn kind(&self) -> SourceKind {
        Self::kind_of(self.archive)
    }

    fn cache(&self, cache: &CacheDir, ctx: &ExecContext) -> Result<LocalHandle> {
        let body = cache.join(self.archive.cache_name());
        self.download(&cache.join("headers"), &body, ctx)?;
        let local = FileSource::from_path(self.archive, &body, self.reference.fragment())?;
        Ok(LocalHandle::at(cache, body, local))
    }

    fn place(&self, handle: &LocalHandle, dest: &Path, _ctx: &ExecContext) -> Result<()> {
        self.archive
            .place(handle.require_data()?, self.reference.fragment(), dest)
    }

    fn run(&self, handle: &LocalHandle, args: &[String], ctx: &ExecContext) -> Result<()> {
        self.archive.run(
            handle.require_data()?,
            self.reference.fragment(),
            handle.scratch(),
            args,
            ctx,
            true,
        )
    }

    fn externalize(&self) -> Literal {
        Literal::Str(self.reference.to_string())
    }

    fn describe(&self) -> String {
        self.reference.display()
    }
}

/// Whether a `NO_PROXY` list (`*`, `example.com`, `.example.com`) covers
/// `host`.
fn bypasses_proxy(list: &str, host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    list.split(',')
        .map(|entry| entry.trim().trim_start_matches('.'))
        .filter(|entry| !entry.is_empty())
        .any(|entry| {
            entry == "*"
                || host.eq_ignore_ascii_case(entry)
                || host
                    .to_ascii_lowercase()
                    .ends_with(&format!(".{}", entry.to_ascii_lowercase()))
        })
}
