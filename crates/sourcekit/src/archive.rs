//! Archive strategies shared by the HTTP, S3 and file adapters.
//!
//! An adapter declares an [`ArchiveKind`] and delegates placement and
//! execution of its staged content to it:
//!
//! - [`ArchiveKind::Plain`] copies the content (recursively for directories)
//!   and runs it directly.
//! - [`ArchiveKind::Tar`] extracts the archive, or the part of it the
//!   fragment selects, and runs a single selected entry.
//! - [`ArchiveKind::Jar`] copies the jar and runs it with `java -jar`.
//!
//! # Fragments
//!
//! A tar fragment is split on `/`. Every component before the last names a
//! directory and must equal the entry's component at the same depth; an
//! empty component matches any name. The number of leading components
//! stripped on extraction is the number of `/` in the fragment.
//!
//! | Fragment | Nature    | Selects                                   | Strip |
//! |----------|-----------|-------------------------------------------|-------|
//! | none     | directory | whole archive                             | 0     |
//! | `#/`     | directory | everything under the single root folder   | 1     |
//! | `#a/b/`  | directory | the subtree `a/b/`                        | 2     |
//! | `#a/b`   | file      | the entry `a/b`, written to the target    | 1     |
//! | `#/bin/x`| file      | `bin/x` under any root folder             | 2     |

use crate::error::{Error, Result};
use crate::exec::{self, ExecContext};
use crate::reference::percent_decode;
use std::borrow::Cow;
use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];
const BZIP2_MAGIC: &[u8] = b"BZh";
const XZ_MAGIC: &[u8] = &[0xfd, b'7', b'z', b'X', b'Z', 0x00];

/// How staged content is placed and executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArchiveKind {
    /// The content itself.
    #[default]
    Plain,
    /// A tar archive, optionally gzip or zstd compressed.
    Tar,
    /// A Java archive.
    Jar,
}

impl ArchiveKind {
    /// From a compound scheme prefix (`tar`, `jar`, or none).
    pub fn from_prefix(prefix: Option<&str>) -> Option<Self> {
        match prefix {
            None => Some(Self::Plain),
            Some("tar") => Some(Self::Tar),
            Some("jar") => Some(Self::Jar),
            Some(_) => None,
        }
    }

    /// Scheme prefix for this kind.
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            Self::Plain => None,
            Self::Tar => Some("tar"),
            Self::Jar => Some("jar"),
        }
    }

    /// Prefix `transport` with this kind (`tar+https`).
    pub fn scheme(&self, transport: &str) -> String {
        match self.prefix() {
            Some(prefix) => format!("{prefix}+{transport}"),
            None => transport.to_string(),
        }
    }

    /// File name of fetched content inside a cache directory.
    pub fn cache_name(&self) -> &'static str {
        match self {
            Self::Plain => "data",
            Self::Tar => "data.tar",
            Self::Jar => "data.jar",
        }
    }

    /// Whether the fragment gives the reference file nature.
    ///
    /// Plain and jar content has file nature unless `dirlike` is set. Tar
    /// content has directory nature unless a non-empty fragment that does not
    /// end with `/` selects one entry.
    pub fn is_file_natured(&self, dirlike: bool, fragment: Option<&str>) -> bool {
        match self {
            Self::Plain | Self::Jar => !dirlike,
            Self::Tar => fragment.is_some_and(|f| !f.is_empty() && !f.ends_with('/')),
        }
    }

    /// Materialize staged content at `dest`.
    pub fn place(&self, data: &Path, fragment: Option<&str>, dest: &Path) -> Result<()> {
        match self {
            Self::Plain | Self::Jar => copy_path(data, dest),
            Self::Tar => extract_file(data, fragment, dest),
        }
    }

    /// Execute staged content.
    ///
    /// `scratch` receives extracted programs. `chmod` controls whether plain
    /// content that is not executable may be marked executable first.
    pub fn run(
        &self,
        data: &Path,
        fragment: Option<&str>,
        scratch: &Path,
        args: &[String],
        ctx: &ExecContext,
        chmod: bool,
    ) -> Result<()> {
        match self {
            Self::Plain => {
                if data.is_dir() {
                    return Err(Error::not_executable(
                        data.display(),
                        "directories can not be run as commands",
                    ));
                }
                if !exec::is_executable(data) {
                    if chmod {
                        exec::make_executable(data)?;
                    } else {
                        log::error!("Not able to mark {} as executable", data.display());
                    }
                }
                ctx.run(data, args)
            }
            Self::Tar => {
                let program = program_path(scratch, fragment)?;
                extract_file(data, fragment, &program)?;
                exec::make_executable(&program)?;
                ctx.run(&program, args)
            }
            Self::Jar => run_jar(data, args, ctx),
        }
    }
}

/// Run a jar with `java -jar`.
pub fn run_jar(jar: &Path, args: &[String], ctx: &ExecContext) -> Result<()> {
    let java = exec::find_tool("java").ok_or_else(|| {
        Error::not_executable(jar.display(), "java was not found in PATH")
    })?;
    let mut argv = vec![jar.as_os_str().to_os_string()];
    argv.extend(args.iter().map(Into::into));
    ctx.run(java, &argv)
}

/// Where a tar program is extracted before it runs: `program/<name>`.
fn program_path(scratch: &Path, fragment: Option<&str>) -> Result<PathBuf> {
    let fragment = fragment.ok_or_else(|| {
        Error::not_executable("tarball", "tarball URLs without a fragment can not be executed")
    })?;
    let name = fragment.rsplit('/').next().unwrap_or_default();
    if name.is_empty() {
        return Err(Error::not_executable(
            format!("#{fragment}"),
            "the fragment selects a directory, not a program",
        ));
    }
    Ok(scratch.join("program").join(percent_decode(name)?))
}

/// Copy a file, or a directory tree, to `dest`.
pub fn copy_path(src: &Path, dest: &Path) -> Result<()> {
    if src.is_dir() {
        for entry in walkdir::WalkDir::new(src) {
            let entry = entry.map_err(|e| Error::io(src, io::Error::other(e.to_string())))?;
            let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
            let target = dest.join(rel);
            let file_type = entry.file_type();
            if file_type.is_dir() {
                fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
            } else if file_type.is_symlink() {
                copy_symlink(entry.path(), &target)?;
            } else {
                fs::copy(entry.path(), &target).map_err(|e| Error::io(&target, e))?;
            }
        }
        Ok(())
    } else {
        ensure_parent(dest)?;
        fs::copy(src, dest).map_err(|e| Error::io(src, e))?;
        Ok(())
    }
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    let link = fs::read_link(src).map_err(|e| Error::io(src, e))?;
    std::os::unix::fs::symlink(link, dest).map_err(|e| Error::io(dest, e))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    fs::copy(src, dest).map_err(|e| Error::io(dest, e))?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Extract a tar archive on disk according to `fragment`.
pub fn extract_file(archive: &Path, fragment: Option<&str>, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive).map_err(|e| Error::io(archive, e))?;
    extract(BufReader::new(file), fragment, dest)
}

/// Extract a tar stream according to `fragment`.
///
/// Compression is detected from the leading bytes.
pub fn extract<R: BufRead>(reader: R, fragment: Option<&str>, dest: &Path) -> Result<()> {
    let selector = Selector::parse(fragment)?;
    let mut archive = tar::Archive::new(decompress(reader)?);
    let entries = archive
        .entries()
        .map_err(|e| Error::Archive(format!("unreadable archive: {e}")))?;

    let root = match selector.name {
        Some(_) => None,
        None => {
            fs::create_dir_all(dest).map_err(|e| Error::io(dest, e))?;
            Some(fs::canonicalize(dest).map_err(|e| Error::io(dest, e))?)
        }
    };

    let mut matched = false;
    for entry in entries {
        let mut entry = entry.map_err(|e| Error::Archive(format!("unreadable entry: {e}")))?;
        let path = entry
            .path()
            .map_err(|e| Error::Archive(format!("bad entry path: {e}")))?
            .into_owned();
        let Some(components) = normal_components(&path) else {
            log::warn!("Skipping unsafe archive entry {}", path.display());
            continue;
        };

        match selector.name.as_deref() {
            Some(name) => {
                let selected = components.len() == selector.strip() + 1
                    && selector.matches_dirs(&components)
                    && components.last().is_some_and(|last| last == name)
                    && !entry.header().entry_type().is_dir();
                if selected {
                    ensure_parent(dest)?;
                    let mut out = fs::File::create(dest).map_err(|e| Error::io(dest, e))?;
                    io::copy(&mut entry, &mut out).map_err(|e| Error::io(dest, e))?;
                    log::debug!("Extracted {} to {}", path.display(), dest.display());
                    return Ok(());
                }
            }
            None => {
                let Some(root) = root.as_deref() else {
                    continue;
                };
                if components.len() <= selector.strip() || !selector.matches_dirs(&components) {
                    continue;
                }
                // A skipped entry still counts: the fragment did select something.
                matched = true;
                unpack_under(&mut entry, root, &components[selector.strip()..], selector.strip())?;
            }
        }
    }

    match (&selector.name, matched || fragment.is_none_or(str::is_empty)) {
        (None, true) => Ok(()),
        (Some(name), _) => Err(Error::Archive(format!("{name} not found in archive"))),
        (None, false) => Err(Error::Archive(format!(
            "{} not found in archive",
            fragment.unwrap_or_default()
        ))),
    }
}

/// Unpack one entry at `rel` under the canonical directory `root`.
///
/// Entries that would land outside `root`, symlinks pointing outside it and
/// hard links to anything outside it are skipped with a warning. Hard link
/// targets are archive paths, stripped like every other entry.
fn unpack_under<R: Read>(
    entry: &mut tar::Entry<'_, R>,
    root: &Path,
    rel: &[String],
    strip: usize,
) -> Result<()> {
    let target = join_all(root, rel);
    if !within(root, &target) {
        log::warn!("Skipping archive entry {} outside the destination", target.display());
        return Ok(());
    }

    let kind = entry.header().entry_type();
    let link = if kind.is_symlink() || kind.is_hard_link() {
        entry
            .link_name()
            .map_err(|e| Error::Archive(format!("bad link target: {e}")))?
            .map(Cow::into_owned)
    } else {
        None
    };
    let hard_source = match &link {
        Some(link) if kind.is_hard_link() => {
            let source = normal_components(link)
                .filter(|parts| parts.len() > strip)
                .map(|parts| join_all(root, &parts[strip..]))
                .filter(|source| within(root, source));
            if source.is_none() {
                log::warn!("Skipping hard link {} to {}", target.display(), link.display());
                return Ok(());
            }
            source
        }
        Some(link) if link_escapes(rel, link) => {
            log::warn!("Skipping symlink {} to {}", target.display(), link.display());
            return Ok(());
        }
        _ => None,
    };

    ensure_parent(&target)?;
    clear(&target)?;
    match hard_source {
        Some(source) => fs::hard_link(&source, &target).map_err(|e| Error::io(&target, e)),
        None => entry
            .unpack(&target)
            .map(drop)
            .map_err(|e| Error::io(&target, e)),
    }
}

fn join_all(root: &Path, parts: &[String]) -> PathBuf {
    parts.iter().fold(root.to_path_buf(), |acc, part| acc.join(part))
}

/// Whether `path` stays under `root` once the symlinks already on disk along
/// its parent are followed.
fn within(root: &Path, path: &Path) -> bool {
    let mut existing = path.parent();
    while let Some(dir) = existing {
        if fs::symlink_metadata(dir).is_ok() {
            break;
        }
        existing = dir.parent();
    }
    existing
        .and_then(|dir| fs::canonicalize(dir).ok())
        .is_some_and(|real| real.starts_with(root))
}

/// Whether a symlink at `rel` (relative to the root) pointing at `link`
/// resolves outside the root.
fn link_escapes(rel: &[String], link: &Path) -> bool {
    let mut depth = rel.len().saturating_sub(1);
    for component in link.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(up) => depth = up,
                None => return true,
            },
            Component::RootDir | Component::Prefix(_) => return true,
        }
    }
    false
}

/// Remove a file or symlink at `path` so nothing is written through an
/// earlier symlink entry. Real directories stay.
fn clear(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if !meta.is_dir() => fs::remove_file(path).map_err(|e| Error::io(path, e)),
        _ => Ok(()),
    }
}

/// What a fragment selects.
#[derive(Debug, PartialEq, Eq)]
struct Selector {
    /// Directory components; empty strings match anything.
    dirs: Vec<String>,
    /// Entry name for file-natured fragments.
    name: Option<String>,
}

impl Selector {
    fn parse(fragment: Option<&str>) -> Result<Self> {
        let Some(fragment) = fragment.filter(|f| !f.is_empty()) else {
            return Ok(Self {
                dirs: Vec::new(),
                name: None,
            });
        };
        let mut parts = fragment
            .split('/')
            .map(percent_decode)
            .collect::<Result<Vec<_>>>()?;
        let last = parts.pop().unwrap_or_default();
        Ok(Self {
            dirs: parts,
            name: (!last.is_empty()).then_some(last),
        })
    }

    fn strip(&self) -> usize {
        self.dirs.len()
    }

    fn matches_dirs(&self, components: &[String]) -> bool {
        self.dirs
            .iter()
            .zip(components)
            .all(|(want, have)| want.is_empty() || want == have)
    }
}

/// Normal components of an archive path; `None` for absolute or `..` paths.
fn normal_components(path: &Path) -> Option<Vec<String>> {
    let mut out = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

/// Wrap `reader` in the decoder its magic bytes call for.
fn decompress<'a, R: BufRead + 'a>(mut reader: R) -> Result<Box<dyn Read + 'a>> {
    let head = reader
        .fill_buf()
        .map_err(|e| Error::Archive(format!("unreadable archive: {e}")))?;
    if head.starts_with(GZIP_MAGIC) {
        log::debug!("Archive is gzip compressed");
        Ok(Box::new(flate2::bufread::GzDecoder::new(reader)))
    } else if head.starts_with(ZSTD_MAGIC) {
        log::debug!("Archive is zstd compressed");
        let decoder = zstd::stream::read::Decoder::with_buffer(reader)
            .map_err(|e| Error::Archive(format!("bad zstd stream: {e}")))?;
        Ok(Box::new(decoder))
    } else if head.starts_with(BZIP2_MAGIC) || head.starts_with(XZ_MAGIC) {
        Err(Error::Archive(
            "unsupported compression (use gzip, zstd or none)".to_string(),
        ))
    } else {
        Ok(Box::new(reader))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;

    /// Build a gzipped tarball from `(path, contents)` pairs.
    pub(crate) fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, contents.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn release() -> Vec<u8> {
        tarball(&[
            ("proj-1.0/README", "readme\n"),
            ("proj-1.0/bin/tool", "#!/bin/sh\necho tool\n"),
            ("proj-1.0/lib/a/b.txt", "b\n"),
        ])
    }

    fn extract_bytes(bytes: &[u8], fragment: Option<&str>, dest: &Path) -> Result<()> {
        extract(io::Cursor::new(bytes), fragment, dest)
    }

    #[test]
    fn test_selector_strip_counts() {
        assert_eq!(Selector::parse(None).unwrap().strip(), 0);
        assert_eq!(Selector::parse(Some("")).unwrap().strip(), 0);
        assert_eq!(Selector::parse(Some("/")).unwrap().strip(), 1);
        assert_eq!(Selector::parse(Some("//")).unwrap().strip(), 2);
        assert_eq!(Selector::parse(Some("a/b/")).unwrap().strip(), 2);
        assert_eq!(Selector::parse(Some("a/b")).unwrap().strip(), 1);
        assert_eq!(Selector::parse(Some("README")).unwrap().strip(), 0);
    }

    #[test]
    fn test_selector_nature() {
        assert_eq!(Selector::parse(Some("a/b")).unwrap().name.as_deref(), Some("b"));
        assert_eq!(Selector::parse(Some("a/b/")).unwrap().name, None);
        assert!(ArchiveKind::Tar.is_file_natured(false, Some("a/b")));
        assert!(!ArchiveKind::Tar.is_file_natured(false, Some("a/b/")));
        assert!(!ArchiveKind::Tar.is_file_natured(false, None));
        assert!(!ArchiveKind::Tar.is_file_natured(false, Some("")));
        assert!(ArchiveKind::Plain.is_file_natured(false, None));
        assert!(!ArchiveKind::Plain.is_file_natured(true, None));
    }

    #[test]
    fn test_extract_whole_archive() {
        let temp = TempDir::new().unwrap();
        extract_bytes(&release(), None, temp.path()).unwrap();
        assert!(temp.path().join("proj-1.0/README").is_file());
        assert!(temp.path().join("proj-1.0/lib/a/b.txt").is_file());
    }

    #[test]
    fn test_extract_root_slash_strips_one() {
        let temp = TempDir::new().unwrap();
        extract_bytes(&release(), Some("/"), temp.path()).unwrap();
        assert_eq!(
            fs::read_to_string(temp.path().join("README")).unwrap(),
            "readme\n"
        );
        assert!(temp.path().join("bin/tool").is_file());
        assert!(!temp.path().join("proj-1.0").exists());
    }

    #[test]
    fn test_extract_subtree_strips_two() {
        let temp = TempDir::new().unwrap();
        extract_bytes(&release(), Some("proj-1.0/lib/"), temp.path()).unwrap();
        assert!(temp.path().join("a/b.txt").is_file());
        assert!(!temp.path().join("README").exists());
    }

    #[test]
    fn test_extract_single_file_strips_own_prefix() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("out/readme.txt");
        extract_bytes(&release(), Some("proj-1.0/README"), &dest).unwrap();
        assert_eq!(fs::read_to_string(dest).unwrap(), "readme\n");
    }

    #[test]
    fn test_extract_wildcard_root() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("tool");
        extract_bytes(&release(), Some("/bin/tool"), &dest).unwrap();
        assert!(fs::read_to_string(dest).unwrap().contains("echo tool"));
    }

    #[test]
    fn test_extract_missing_entry() {
        let temp = TempDir::new().unwrap();
        let err = extract_bytes(&release(), Some("proj-1.0/nope"), &temp.path().join("x"))
            .unwrap_err();
        assert!(matches!(err, Error::Archive(_)));

        let err = extract_bytes(&release(), Some("other/"), temp.path()).unwrap_err();
        assert!(matches!(err, Error::Archive(_)));
    }

    /// Uncompressed tarball of `(path, type, contents or link target)`.
    fn linked_tarball(entries: &[(&str, tar::EntryType, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, kind, value) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(*kind);
            header.set_mode(0o644);
            if kind.is_file() {
                header.set_size(value.len() as u64);
                header.set_cksum();
                builder.append_data(&mut header, path, value.as_bytes()).unwrap();
            } else {
                header.set_size(0);
                builder.append_link(&mut header, path, value).unwrap();
            }
        }
        builder.into_inner().unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_does_not_write_through_symlinks() {
        let outside = TempDir::new().unwrap();
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("out");
        let outside_dir = outside.path().display().to_string();
        let bytes = linked_tarball(&[
            ("link", tar::EntryType::Symlink, &outside_dir),
            ("link/evil", tar::EntryType::Regular, "x"),
        ]);

        extract_bytes(&bytes, None, &dest).unwrap();
        assert!(!outside.path().join("evil").exists());
        let link = fs::symlink_metadata(dest.join("link")).unwrap();
        assert!(link.is_dir());
        assert_eq!(fs::read_to_string(dest.join("link/evil")).unwrap(), "x");
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_keeps_links_inside_destination() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a/b/out");
        let bytes = linked_tarball(&[
            ("p/docs/README", tar::EntryType::Regular, "readme\n"),
            ("p/readme", tar::EntryType::Symlink, "docs/README"),
            ("p/up", tar::EntryType::Symlink, "../../x"),
            ("p/abs", tar::EntryType::Symlink, "/etc"),
            ("p/copy", tar::EntryType::Link, "p/docs/README"),
            ("p/stolen", tar::EntryType::Link, "../etc/passwd"),
        ]);

        extract_bytes(&bytes, Some("/"), &dest).unwrap();
        assert_eq!(fs::read_to_string(dest.join("readme")).unwrap(), "readme\n");
        assert_eq!(fs::read_to_string(dest.join("copy")).unwrap(), "readme\n");
        assert!(fs::symlink_metadata(dest.join("up")).is_err());
        assert!(fs::symlink_metadata(dest.join("abs")).is_err());
        assert!(fs::symlink_metadata(dest.join("stolen")).is_err());
    }

    #[test]
    fn test_link_escapes() {
        let rel = |parts: &[&str]| parts.iter().map(ToString::to_string).collect::<Vec<_>>();
        assert!(!link_escapes(&rel(&["a", "b"]), Path::new("../c")));
        assert!(link_escapes(&rel(&["a", "b"]), Path::new("../../c")));
        assert!(link_escapes(&rel(&["b"]), Path::new("../c")));
        assert!(!link_escapes(&rel(&["b"]), Path::new("./c/../d")));
        assert!(link_escapes(&rel(&["b"]), Path::new("/etc")));
    }

    #[test]
    fn test_extract_plain_and_zstd() {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(3);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "x.txt", &b"xyz"[..]).unwrap();
        let plain = builder.into_inner().unwrap();

        let temp = TempDir::new().unwrap();
        extract_bytes(&plain, Some("x.txt"), &temp.path().join("plain")).unwrap();
        assert_eq!(fs::read(temp.path().join("plain")).unwrap(), b"xyz");

        let compressed = zstd::encode_all(plain.as_slice(), 3).unwrap();
        extract_bytes(&compressed, Some("x.txt"), &temp.path().join("zstd")).unwrap();
        assert_eq!(fs::read(temp.path().join("zstd")).unwrap(), b"xyz");
    }

    #[test]
    fn test_extract_rejects_bzip2() {
        let temp = TempDir::new().unwrap();
        let err = extract_bytes(b"BZh91AY&SY", None, temp.path()).unwrap_err();
        assert!(matches!(err, Error::Archive(_)));
    }

    #[test]
    fn test_program_path() {
        let scratch = Path::new("/tmp/arx.x");
        assert_eq!(
            program_path(scratch, Some("proj/bin/tool")).unwrap(),
            PathBuf::from("/tmp/arx.x/program/tool")
        );
        assert!(matches!(
            program_path(scratch, None),
            Err(Error::NotExecutable { .. })
        ));
        assert!(matches!(
            program_path(scratch, Some("proj/bin/")),
            Err(Error::NotExecutable { .. })
        ));
    }

    #[test]
    fn test_copy_path_tree() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a"), "a").unwrap();
        fs::write(src.join("nested/b"), "b").unwrap();

        let dest = temp.path().join("dest");
        copy_path(&src, &dest).unwrap();
        assert_eq!(fs::read_to_string(dest.join("a")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dest.join("nested/b")).unwrap(), "b");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_tar_program() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("data.tar");
        fs::write(
            &archive,
            tarball(&[("p/bin/hello", "#!/bin/sh\necho hi > \"$1\"\n")]),
        )
        .unwrap();
        let out = temp.path().join("out");
        ArchiveKind::Tar
            .run(
                &archive,
                Some("p/bin/hello"),
                temp.path(),
                &[out.display().to_string()],
                &ExecContext::new(),
                true,
            )
            .unwrap();
        assert_eq!(fs::read_to_string(out).unwrap(), "hi\n");
        assert!(exec::is_executable(&temp.path().join("program/hello")));
    }
}
