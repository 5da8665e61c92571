//! Multi-format archive extraction with progress reporting.
//!
//! Format is determined by the filename suffix (`.zip`, `.tar`, `.tar.gz`,
//! `.tar.bz2`). Extraction enumerates all members up front, computes the
//! single common leading path component (the returned root directory name,
//! needed because the extracted trees are nested one level deep), validates
//! every member path against traversal, then unpacks with member-count
//! progress. Any failure is fatal; a half-extracted destination is invalid.

use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use zip::ZipArchive;

use crate::errors::SetupError;
use crate::util::fs::ensure_dir;

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarBz2,
}

impl ArchiveFormat {
    /// Detect the format from a filename suffix.
    pub fn detect(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        // Compound suffixes first.
        if name.ends_with(".tar.gz") {
            Ok(ArchiveFormat::TarGz)
        } else if name.ends_with(".tar.bz2") {
            Ok(ArchiveFormat::TarBz2)
        } else if name.ends_with(".tar") {
            Ok(ArchiveFormat::Tar)
        } else if name.ends_with(".zip") {
            Ok(ArchiveFormat::Zip)
        } else {
            Err(SetupError::Extraction(format!(
                "unsupported file extension '{}'",
                path.display()
            ))
            .into())
        }
    }
}

/// Extract an archive to `dest`, returning the common root directory name.
pub fn extract(archive: &Path, dest: &Path) -> Result<String> {
    let format = ArchiveFormat::detect(archive)?;

    let root = match format {
        ArchiveFormat::Zip => extract_zip(archive, dest),
        _ => extract_tar(archive, dest, format),
    }
    .map_err(|e| SetupError::Extraction(format!("{}: {:#}", archive.display(), e)))?;

    tracing::info!("extracted successfully");
    Ok(root)
}

/// Reject member paths that could escape the destination: absolute paths,
/// drive prefixes, and `..` components.
fn validate_member(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("archive member has an empty path");
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => bail!(
                "archive member escapes the destination directory: {}",
                path.display()
            ),
        }
    }
    Ok(())
}

/// The single leading path component shared by every member.
fn common_root(members: &[PathBuf]) -> Result<String> {
    let mut root: Option<String> = None;

    for member in members {
        let first = member
            .components()
            .find_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .ok_or_else(|| anyhow::anyhow!("archive member has no path: {}", member.display()))?;

        match &root {
            None => root = Some(first),
            Some(existing) if *existing == first => {}
            Some(existing) => bail!(
                "archive has no single root directory ('{}' vs '{}')",
                existing,
                first
            ),
        }
    }

    root.ok_or_else(|| anyhow::anyhow!("archive is empty"))
}

fn progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} extracting [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

fn open_tar(path: &Path, format: ArchiveFormat) -> Result<tar::Archive<Box<dyn Read>>> {
    let file =
        File::open(path).with_context(|| format!("failed to open archive: {}", path.display()))?;

    let reader: Box<dyn Read> = match format {
        ArchiveFormat::Tar => Box::new(file),
        ArchiveFormat::TarGz => Box::new(GzDecoder::new(file)),
        ArchiveFormat::TarBz2 => Box::new(BzDecoder::new(file)),
        ArchiveFormat::Zip => unreachable!("zip handled separately"),
    };

    Ok(tar::Archive::new(reader))
}

fn extract_tar(path: &Path, dest: &Path, format: ArchiveFormat) -> Result<String> {
    // First pass: enumerate and validate all members before writing anything.
    let mut members = Vec::new();
    {
        let mut archive = open_tar(path, format)?;
        for entry in archive.entries().context("failed to read archive entries")? {
            let entry = entry.context("failed to read archive entry")?;
            let member = entry.path().context("failed to read entry path")?.into_owned();
            validate_member(&member)?;
            members.push(member);
        }
    }

    let root = common_root(&members)?;
    tracing::info!("extracting '{}' to '{}'...", root, dest.display());

    ensure_dir(dest)?;

    // Second pass: unpack.
    let pb = progress_bar(members.len() as u64);
    let mut archive = open_tar(path, format)?;
    for entry in archive.entries().context("failed to read archive entries")? {
        let mut entry = entry.context("failed to read archive entry")?;
        entry
            .unpack_in(dest)
            .with_context(|| "failed to unpack archive entry")?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(root)
}

fn extract_zip(path: &Path, dest: &Path) -> Result<String> {
    let file =
        File::open(path).with_context(|| format!("failed to open archive: {}", path.display()))?;
    let mut archive = ZipArchive::new(file).context("failed to read zip archive")?;

    // First pass over the central directory.
    let members: Vec<PathBuf> = archive.file_names().map(PathBuf::from).collect();
    for member in &members {
        validate_member(member)?;
    }

    let root = common_root(&members)?;
    tracing::info!("extracting '{}' to '{}'...", root, dest.display());

    ensure_dir(dest)?;

    let pb = progress_bar(archive.len() as u64);
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).context("failed to read zip entry")?;

        let relative = entry
            .enclosed_name()
            .ok_or_else(|| anyhow::anyhow!("zip entry escapes the destination directory"))?;
        let out_path = dest.join(relative);

        if entry.is_dir() {
            ensure_dir(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                ensure_dir(parent)?;
            }
            let mut out = File::create(&out_path)
                .with_context(|| format!("failed to create file: {}", out_path.display()))?;
            std::io::copy(&mut entry, &mut out)
                .with_context(|| format!("failed to extract: {}", out_path.display()))?;

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))?;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(root)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;

    /// Build an uncompressed tar with the given (path, contents) members.
    pub fn tar_fixture(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, data) in members {
            let mut header = tar::Header::new_gnu();
            header.set_path(path).unwrap();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, Cursor::new(data)).unwrap();
        }
        builder.into_inner().unwrap()
    }

    pub fn tar_gz_fixture(members: &[(&str, &[u8])]) -> Vec<u8> {
        let tar = tar_fixture(members);
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&tar).unwrap();
        encoder.finish().unwrap()
    }

    pub fn tar_bz2_fixture(members: &[(&str, &[u8])]) -> Vec<u8> {
        let tar = tar_fixture(members);
        let mut encoder =
            bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        encoder.write_all(&tar).unwrap();
        encoder.finish().unwrap()
    }

    pub fn zip_fixture(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (path, data) in members {
            writer.start_file(path.to_string(), options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn write_archive(tmp: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = tmp.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    const MEMBERS: &[(&str, &[u8])] = &[("root/a", b"alpha"), ("root/b/c", b"gamma")];

    fn assert_round_trip(tmp: &TempDir, archive: &Path) {
        let dest = tmp.path().join("out");
        let root = extract(archive, &dest).unwrap();

        assert_eq!(root, "root");
        assert_eq!(std::fs::read(dest.join("root/a")).unwrap(), b"alpha");
        assert_eq!(std::fs::read(dest.join("root/b/c")).unwrap(), b"gamma");

        std::fs::remove_dir_all(dest).unwrap();
    }

    #[test]
    fn test_round_trip_all_formats() {
        let tmp = TempDir::new().unwrap();

        let tar = write_archive(&tmp, "x.tar", &tar_fixture(MEMBERS));
        assert_round_trip(&tmp, &tar);

        let tgz = write_archive(&tmp, "x.tar.gz", &tar_gz_fixture(MEMBERS));
        assert_round_trip(&tmp, &tgz);

        let tbz = write_archive(&tmp, "x.tar.bz2", &tar_bz2_fixture(MEMBERS));
        assert_round_trip(&tmp, &tbz);

        let zip = write_archive(&tmp, "x.zip", &zip_fixture(MEMBERS));
        assert_round_trip(&tmp, &zip);
    }

    #[test]
    fn test_single_file_archive_root_is_the_file() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(&tmp, "ninja.zip", &zip_fixture(&[("ninja", b"bin")]));

        let dest = tmp.path().join("out");
        let root = extract(&archive, &dest).unwrap();

        assert_eq!(root, "ninja");
        assert!(dest.join("ninja").is_file());
    }

    #[test]
    fn test_unsupported_extension() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(&tmp, "tool.7z", b"whatever");

        let err = extract(&archive, &tmp.path().join("out")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::Extraction(_))
        ));
    }

    #[test]
    fn test_traversal_rejected_before_writing() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(
            &tmp,
            "evil.zip",
            &zip_fixture(&[("root/ok", b"fine"), ("../evil", b"bad")]),
        );

        let dest = tmp.path().join("out");
        let err = extract(&archive, &dest).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::Extraction(_))
        ));

        // Validation happens before any member is written.
        assert!(!dest.join("root/ok").exists());
        assert!(!tmp.path().join("evil").exists());
    }

    #[test]
    fn test_tar_traversal_rejected() {
        // tar::Header::set_path refuses `..`, so write the raw name field
        // to produce the hostile member a real attacker would.
        let mut builder = tar::Builder::new(Vec::new());

        let mut header = tar::Header::new_gnu();
        header.set_path("root/ok").unwrap();
        header.set_size(4);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, Cursor::new(b"fine")).unwrap();

        let mut evil = tar::Header::new_gnu();
        let name = b"root/../../evil";
        evil.as_old_mut().name[..name.len()].copy_from_slice(name);
        evil.set_size(3);
        evil.set_mode(0o644);
        evil.set_cksum();
        builder.append(&evil, Cursor::new(b"bad")).unwrap();

        let tmp = TempDir::new().unwrap();
        let archive = write_archive(&tmp, "evil.tar", &builder.into_inner().unwrap());

        let dest = tmp.path().join("out");
        assert!(extract(&archive, &dest).is_err());
        assert!(!dest.join("root/ok").exists());
    }

    #[test]
    fn test_no_common_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(
            &tmp,
            "split.tar",
            &tar_fixture(&[("a/x", b"1"), ("b/y", b"2")]),
        );

        assert!(extract(&archive, &tmp.path().join("out")).is_err());
    }
}
