//! Local file sources and the `/@/` virtual directory.
//!
//! Raw absolute paths do not travel well between machines running the same
//! manifest, so `file://` paths may start with a reserved virtual segment:
//!
//! - `file:///@/./x` and `file:///@/../x` resolve against the manifest's
//!   directory (the [`Origin`]).
//! - `file:///@/~/x` resolves against the invoking user's home directory.
//! - `file:///@/~alice/x` resolves against the home directory of `alice`.
//!
//! Any other `/@/` path is rejected. A real `@` directory at the filesystem
//! root is written with percent-encoding: `file:///%40/x`.

use crate::archive::{self, ArchiveKind};
use crate::cache::CacheDir;
use crate::error::{Error, Result};
use crate::exec::ExecContext;
use crate::literal::Literal;
use crate::reference::{Reference, percent_decode};
use crate::source::{LocalHandle, Source, SourceKind};
use std::path::{Component, Path, PathBuf};

/// Where manifest-relative references are anchored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    manifest_dir: Option<PathBuf>,
}

impl Origin {
    /// Anchor at the directory containing the manifest.
    pub fn manifest_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest_dir: Some(dir.into()),
        }
    }

    /// Directory `/@/.` refers to; the current directory when unset.
    pub fn dir(&self) -> PathBuf {
        match &self.manifest_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

/// How a file reference's path was anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// A plain filesystem path.
    Absolute,
    /// `/@/.` or `/@/..`: relative to the manifest.
    Manifest,
    /// `/@/~` or `/@/~user`: relative to a home directory.
    Home,
}

/// A file or directory on local disk, plain or as a tar or jar archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    reference: Reference,
    archive: ArchiveKind,
    resolved: PathBuf,
    anchor: Anchor,
}

impl FileSource {
    /// Validate `reference` as an `archive` kind file reference and resolve
    /// its path against `origin`.
    pub fn new(archive: ArchiveKind, reference: Reference, origin: &Origin) -> Result<Self> {
        reference.require_scheme(Self::kind_of(archive).name(), &[archive.scheme("file")])?;
        if reference.authority().is_some_and(|a| !a.is_empty()) {
            return Err(Error::invalid(
                reference.display(),
                "non-local file URLs are not supported",
            ));
        }
        match archive {
            ArchiveKind::Plain => reference.forbid_fragment("plain file")?,
            ArchiveKind::Jar => reference.forbid_fragment("jar file")?,
            ArchiveKind::Tar => {}
        }
        let (resolved, anchor) = resolve(&reference, origin)?;
        log::debug!("Resolved {} to {}", reference.display(), resolved.display());
        Ok(Self {
            reference,
            archive,
            resolved,
            anchor,
        })
    }

    /// Parse, taking the archive kind from the scheme prefix.
    pub fn parse(input: &str, origin: &Origin) -> Result<Self> {
        let reference = Reference::parse(input)?;
        let archive = ArchiveKind::from_prefix(reference.prefix()).unwrap_or_default();
        Self::new(archive, reference, origin)
    }

    fn kind_of(archive: ArchiveKind) -> SourceKind {
        match archive {
            ArchiveKind::Plain => SourceKind::File,
            ArchiveKind::Tar => SourceKind::FileTar,
            ArchiveKind::Jar => SourceKind::FileJar,
        }
    }

    /// A source for an absolute local path.
    pub fn from_path(archive: ArchiveKind, path: &Path, fragment: Option<&str>) -> Result<Self> {
        let mut url = format!("{}://", archive.scheme("file"));
        let text = path.to_string_lossy();
        for (i, c) in text.chars().enumerate() {
            match c {
                '%' => url.push_str("%25"),
                '#' => url.push_str("%23"),
                '?' => url.push_str("%3F"),
                '@' if i == 1 && text.starts_with("/@/") => url.push_str("%40"),
                _ => url.push(c),
            }
        }
        if path.is_dir() && !url.ends_with('/') {
            url.push('/');
        }
        if let Some(fragment) = fragment {
            url.push('#');
            url.push_str(fragment);
        }
        Self::parse(&url, &Origin::default())
    }

    /// The reference this source was built from.
    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    /// Real filesystem path.
    pub fn resolved(&self) -> &Path {
        &self.resolved
    }

    /// How the path was anchored.
    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    /// How the content is treated.
    pub fn archive(&self) -> ArchiveKind {
        self.archive
    }
}

impl Source for FileSource {
    fn kind(&self) -> SourceKind {
        Self::kind_of(self.archive)
    }

    fn cache(&self, cache: &CacheDir, _ctx: &ExecContext) -> Result<LocalHandle> {
        if !self.resolved.exists() {
            return Err(Error::io(
                &self.resolved,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
            ));
        }
        Ok(LocalHandle::at(cache, self.resolved.clone(), self.clone()))
    }

    fn place(&self, handle: &LocalHandle, dest: &Path, _ctx: &ExecContext) -> Result<()> {
        self.archive
            .place(handle.require_data()?, self.reference.fragment(), dest)
    }

    fn run(&self, handle: &LocalHandle, args: &[String], ctx: &ExecContext) -> Result<()> {
        if self.archive == ArchiveKind::Plain && self.reference.is_dirlike() {
            return Err(Error::not_executable(
                self.describe(),
                "directories can not be run as commands",
            ));
        }
        match self.archive {
            ArchiveKind::Jar => archive::run_jar(handle.require_data()?, args, ctx),
            kind => kind.run(
                handle.require_data()?,
                self.reference.fragment(),
                handle.scratch(),
                args,
                ctx,
                self.anchor == Anchor::Manifest,
            ),
        }
    }

    fn externalize(&self) -> Literal {
        Literal::Str(self.reference.to_string())
    }

    fn describe(&self) -> String {
        self.reference.display()
    }
}

fn resolve(reference: &Reference, origin: &Origin) -> Result<(PathBuf, Anchor)> {
    let path = reference.path();
    let Some(rest) = path.strip_prefix("/@/") else {
        return Ok((PathBuf::from(percent_decode(path)?), Anchor::Absolute));
    };

    if rest.starts_with('.') {
        let relative = percent_decode(rest)?;
        return Ok((normalize(&origin.dir().join(relative)), Anchor::Manifest));
    }

    if let Some(tilde) = rest.strip_prefix('~') {
        let (user, remainder) = tilde.split_once('/').unwrap_or((tilde, ""));
        let home = if user.is_empty() {
            dirs::home_dir()
                .ok_or_else(|| Error::invalid(reference.display(), "no home directory"))?
        } else {
            let user = percent_decode(user)?;
            home_of(&user).ok_or_else(|| {
                Error::invalid(
                    reference.display(),
                    format!("user {user} has no home directory"),
                )
            })?
        };
        let remainder = percent_decode(remainder)?;
        return Ok((home.join(remainder.trim_start_matches('/')), Anchor::Home));
    }

    Err(Error::invalid(
        reference.display(),
        "/@/ must be followed by ., .., ~ or ~user (write a literal @ as %40)",
    ))
}

/// Lexically remove `.` and resolve `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Home directory of `user` from the password database.
#[cfg(unix)]
fn home_of(user: &str) -> Option<PathBuf> {
    use std::ffi::{CStr, CString, OsStr};
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;

    let name = CString::new(user).ok()?;
    let mut buf = vec![0 as libc::c_char; 16 * 1024];
    let mut result: *mut libc::passwd = std::ptr::null_mut();

    // SAFETY: getpwnam_r writes into pwd and buf, both owned here and sized as
    // passed; pw_dir points into buf, which outlives the CStr borrow.
    unsafe {
        let mut pwd: MaybeUninit<libc::passwd> = MaybeUninit::uninit();
        let rc = libc::getpwnam_r(
            name.as_ptr(),
            pwd.as_mut_ptr(),
            buf.as_mut_ptr(),
            buf.len(),
            &raw mut result,
        );
        if rc != 0 || result.is_null() {
            return None;
        }
        let pwd = pwd.assume_init();
        if pwd.pw_dir.is_null() {
            return None;
        }
        let dir = CStr::from_ptr(pwd.pw_dir).to_bytes();
        if dir.is_empty() {
            return None;
        }
        Some(PathBuf::from(OsStr::from_bytes(dir)))
    }
}

#[cfg(not(unix))]
fn home_of(_user: &str) -> Option<PathBuf> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_relative() {
        let origin = Origin::manifest_dir("/work/project");
        let source = FileSource::parse("file:///@/./package.json", &origin).unwrap();
        assert_eq!(source.resolved(), Path::new("/work/project/package.json"));
        assert_eq!(source.anchor(), Anchor::Manifest);

        let source = FileSource::parse("file:///@/../shared/conf", &origin).unwrap();
        assert_eq!(source.resolved(), Path::new("/work/shared/conf"));
    }

    #[test]
    fn test_home_relative() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let source = FileSource::parse("file:///@/~/.profile", &Origin::default()).unwrap();
        assert_eq!(source.resolved(), home.join(".profile"));
        assert_eq!(source.anchor(), Anchor::Home);

        let source = FileSource::parse("file:///@/~//etc/passwd", &Origin::default()).unwrap();
        assert_eq!(source.resolved(), home.join("etc/passwd"));
        let source = FileSource::parse("file:///@/~/%2Fetc", &Origin::default()).unwrap();
        assert_eq!(source.resolved(), home.join("etc"));
    }

    #[cfg(unix)]
    #[test]
    fn test_named_user_home() {
        let home = home_of("root").unwrap();
        assert!(home.is_absolute());
        let source = FileSource::parse("file:///@/~root/x", &Origin::default()).unwrap();
        assert_eq!(source.resolved(), home.join("x"));
    }

    #[test]
    fn test_unknown_user_is_invalid() {
        let err = FileSource::parse("file:///@/~no-such-user-arx-test/x", &Origin::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidReference { .. }));
    }

    #[test]
    fn test_unrecognized_virtual_path() {
        let err = FileSource::parse("file:///@/etc/passwd", &Origin::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidReference { .. }));
    }

    #[test]
    fn test_percent_encoded_at_is_literal() {
        let source = FileSource::parse("file:///%40/x", &Origin::default()).unwrap();
        assert_eq!(source.resolved(), Path::new("/@/x"));
        assert_eq!(source.anchor(), Anchor::Absolute);
    }

    #[test]
    fn test_validation() {
        let origin = Origin::default();
        assert!(matches!(
            FileSource::parse("file://host/etc/hosts", &origin),
            Err(Error::InvalidReference { .. })
        ));
        assert!(matches!(
            FileSource::parse("file:///etc/hosts#x", &origin),
            Err(Error::InvalidReference { .. })
        ));
        assert!(matches!(
            FileSource::parse("jar+file:///a.jar#Main", &origin),
            Err(Error::InvalidReference { .. })
        ));
        assert!(matches!(
            FileSource::parse("http://x/y", &origin),
            Err(Error::InvalidScheme { adapter: "File", .. })
        ));
        let tar = FileSource::parse("tar+file:///tmp/a.tgz#/", &origin).unwrap();
        assert_eq!(tar.kind(), SourceKind::FileTar);
    }

    #[test]
    fn test_from_path_roundtrip() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("odd #name%.txt");
        fs::write(&file, "x").unwrap();
        let source = FileSource::from_path(ArchiveKind::Plain, &file, None).unwrap();
        assert_eq!(source.resolved(), file);

        let dir = FileSource::from_path(ArchiveKind::Plain, temp.path(), None).unwrap();
        assert!(dir.reference().is_dirlike());
    }

    #[test]
    fn test_place_directory() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("conf");
        fs::create_dir_all(src.join("d")).unwrap();
        fs::write(src.join("d/app.ini"), "a=1").unwrap();

        let origin = Origin::manifest_dir(temp.path());
        let source = FileSource::parse("file:///@/./conf/", &origin).unwrap();
        let cache = CacheDir::new().unwrap();
        let ctx = ExecContext::new();
        let handle = source.cache(&cache, &ctx).unwrap();

        let dest = temp.path().join("out");
        source.place(&handle, &dest, &ctx).unwrap();
        assert_eq!(fs::read_to_string(dest.join("d/app.ini")).unwrap(), "a=1");

        assert!(matches!(
            source.run(&handle, &[], &ctx),
            Err(Error::NotExecutable { .. })
        ));
    }

    #[test]
    fn test_cache_missing_file() {
        let source = FileSource::parse("file:///nonexistent/arx/x", &Origin::default()).unwrap();
        let cache = CacheDir::new().unwrap();
        assert!(matches!(
            source.cache(&cache, &ExecContext::new()),
            Err(Error::Io { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_manifest_relative_marks_executable() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("setup.sh"),
            "#!/bin/sh\ntouch \"$1\"\n",
        )
        .unwrap();
        let origin = Origin::manifest_dir(temp.path());
        let source = FileSource::parse("file:///@/./setup.sh", &origin).unwrap();
        let cache = CacheDir::new().unwrap();
        let ctx = ExecContext::new();
        let handle = source.cache(&cache, &ctx).unwrap();

        let marker = temp.path().join("marker");
        source
            .run(&handle, &[marker.display().to_string()], &ctx)
            .unwrap();
        assert!(marker.exists());
        assert!(crate::exec::is_executable(&temp.path().join("setup.sh")));
    }
}
