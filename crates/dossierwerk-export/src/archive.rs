// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ZIP archive assembly for the export bundle.
//
// Entries are collected in one sorted pass with forward-slash names, then
// streamed through `ZipWriter` with Deflate. A file that vanishes between
// the walk and the copy is tolerated with a warning (reports may still be
// settling on slow filesystems); every other failure is fatal.

use std::fs::{self, File};
use std::io::{BufWriter, Seek};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use zip::{CompressionMethod, ZipWriter, write::FileOptions};

use dossierwerk_core::error::{DossierError, Result};

/// Stream `source_dir` into a ZIP at `zip_path`, returning the archive's
/// final byte size.
///
/// `zip_path` may live inside `source_dir`; the archive never includes
/// itself.
#[instrument(skip_all, fields(source = %source_dir.display(), zip = %zip_path.display()))]
pub fn create_zip_archive(source_dir: &Path, zip_path: &Path) -> Result<u64> {
    let mut files: Vec<PathBuf> = Vec::new();
    collect(source_dir, source_dir, zip_path, &mut files)?;
    files.sort();

    let file = File::create(zip_path)
        .map_err(|err| DossierError::Archive(format!("create {}: {err}", zip_path.display())))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0usize;
    for rel in &files {
        let full_path = source_dir.join(rel);
        let mut source = match File::open(&full_path) {
            Ok(source) => source,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                // Tolerated: the entry disappeared between walk and open.
                warn!(path = %full_path.display(), "archive entry vanished, skipping");
                continue;
            }
            Err(err) => {
                return Err(DossierError::Archive(format!(
                    "open {}: {err}",
                    full_path.display()
                )));
            }
        };

        let name = rel.to_string_lossy().replace('\\', "/");
        writer
            .start_file(name.as_str(), options)
            .map_err(|err| DossierError::Archive(format!("start entry {name}: {err}")))?;
        std::io::copy(&mut source, &mut writer)
            .map_err(|err| DossierError::Archive(format!("write entry {name}: {err}")))?;
        entries += 1;
        debug!(entry = %name, "archived");
    }

    let mut inner = writer
        .finish()
        .map_err(|err| DossierError::Archive(format!("finalize archive: {err}")))?;

    // Primary size source is a fresh stat; fall back to the writer's own
    // position when the stat races a concurrent sweep.
    let size = match fs::metadata(zip_path) {
        Ok(metadata) => metadata.len(),
        Err(_) => inner.stream_position().unwrap_or(0),
    };

    info!(entries, size, "archive complete");
    Ok(size)
}

/// Recursive walk collecting package-relative file paths, excluding the
/// archive itself.
fn collect(dir: &Path, root: &Path, zip_path: &Path, acc: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir)
        .map_err(|err| DossierError::Archive(format!("read {}: {err}", dir.display())))?;
    for entry in entries {
        let entry =
            entry.map_err(|err| DossierError::Archive(format!("read {}: {err}", dir.display())))?;
        let path = entry.path();
        if path == zip_path {
            continue;
        }
        if path.is_dir() {
            collect(&path, root, zip_path, acc)?;
        } else {
            let rel = path.strip_prefix(root).map_err(|err| {
                DossierError::Archive(format!("relativise {}: {err}", path.display()))
            })?;
            acc.push(rel.to_path_buf());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn populate(root: &Path) {
        fs::create_dir_all(root.join("m5/study-001/16-1")).unwrap();
        fs::create_dir_all(root.join("ectd")).unwrap();
        fs::write(root.join("m5/study-001/16-1/a.pdf"), b"pdf bytes").unwrap();
        fs::write(root.join("ectd/index.xml"), b"<ectd/>").unwrap();
        fs::write(root.join("qc-summary.json"), b"{}").unwrap();
    }

    #[test]
    fn archives_tree_with_forward_slash_names() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let zip_path = dir.path().join("package.zip");

        let size = create_zip_archive(dir.path(), &zip_path).unwrap();
        assert!(size > 0);
        assert_eq!(size, fs::metadata(&zip_path).unwrap().len());

        let mut archive = ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"m5/study-001/16-1/a.pdf".to_string()));
        assert!(names.contains(&"ectd/index.xml".to_string()));
        // The archive never contains itself.
        assert!(!names.iter().any(|name| name.contains("package.zip")));
    }

    #[test]
    fn entries_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let zip_path = dir.path().join("package.zip");
        create_zip_archive(dir.path(), &zip_path).unwrap();

        let mut archive = ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        let mut entry = archive.by_name("m5/study-001/16-1/a.pdf").unwrap();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"pdf bytes");
    }

    #[test]
    fn missing_source_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = create_zip_archive(&dir.path().join("ghost"), &dir.path().join("p.zip"))
            .unwrap_err();
        assert!(matches!(err, DossierError::Archive(_)));
    }

    #[test]
    fn empty_tree_yields_valid_empty_archive() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("package.zip");
        let size = create_zip_archive(dir.path(), &zip_path).unwrap();
        assert!(size > 0);
        let archive = ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
