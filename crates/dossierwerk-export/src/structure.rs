// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// eCTD directory materialisation.
//
// Target paths arrive pre-sanitized from the path mapper, but this module
// re-validates every one of them against traversal before a single byte
// is copied. A malicious or corrupted path is always a fatal error, never
// silently corrected.

use std::path::Path;

use tracing::{debug, info, instrument};

use dossierwerk_bridge::StoragePaths;
use dossierwerk_core::error::{DossierError, Result};
use dossierwerk_core::types::{FolderNode, PackageManifest};

/// Reject anything that is not a clean, relative, forward-slash path:
/// absolute paths, drive letters, `.`/`..` components, backslashes, and
/// empty segments all fail.
pub fn validate_target_path(target: &str) -> Result<()> {
    if target.is_empty() {
        return Err(DossierError::PathSecurity("empty target path".to_string()));
    }
    if target.starts_with('/') || target.contains('\\') || target.contains(':') {
        return Err(DossierError::PathSecurity(format!(
            "'{target}' is absolute or uses non-portable separators"
        )));
    }
    for segment in target.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(DossierError::PathSecurity(format!(
                "'{target}' contains a traversal or empty segment"
            )));
        }
    }
    Ok(())
}

/// Materialise the manifest's directory tree and copy every source file
/// into place.
///
/// All target paths are validated up front, so a single bad path aborts
/// the export before any copy happens. Directory creation is recursive
/// and idempotent.
#[instrument(skip_all, fields(files = manifest.files.len(), root = %output_root.display()))]
pub async fn create_ectd_structure(
    manifest: &PackageManifest,
    output_root: &Path,
    storage: &dyn StoragePaths,
) -> Result<()> {
    for file in &manifest.files {
        validate_target_path(&file.target_path)?;
    }

    tokio::fs::create_dir_all(output_root).await?;
    create_folders(output_root, &manifest.folder_structure).await?;

    for file in &manifest.files {
        let target = output_root.join(&file.target_path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let source = storage.full_path(&file.source_path);
        tokio::fs::copy(&source, &target).await.map_err(|err| {
            DossierError::Io(std::io::Error::new(
                err.kind(),
                format!(
                    "copying {} to {}: {err}",
                    source.display(),
                    file.target_path
                ),
            ))
        })?;
        debug!(target = %file.target_path, "file copied");
    }

    info!(files = manifest.files.len(), "eCTD structure created");
    Ok(())
}

/// Depth-first directory creation from the folder tree.
async fn create_folders(root: &Path, nodes: &[FolderNode]) -> Result<()> {
    // Recursion over async fns boxes poorly; the tree is shallow, so walk
    // it iteratively instead.
    let mut stack: Vec<&FolderNode> = nodes.iter().collect();
    while let Some(node) = stack.pop() {
        validate_target_path(&node.path)?;
        tokio::fs::create_dir_all(root.join(&node.path)).await?;
        stack.extend(node.children.iter());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dossierwerk_bridge::UploadsRoot;
    use dossierwerk_core::paths::build_folder_tree;
    use dossierwerk_core::types::{PackageFile, ReadinessCheck};
    use uuid::Uuid;

    fn manifest_for(files: Vec<PackageFile>) -> PackageManifest {
        let folder_structure = build_folder_tree(&files);
        PackageManifest {
            study_id: Uuid::new_v4(),
            study_number: "STUDY-001".into(),
            generated_at: Utc::now(),
            files,
            folder_structure,
            readiness: ReadinessCheck {
                ready: true,
                missing_required: Vec::new(),
                pending_approval: Vec::new(),
                validation_errors: 0,
                unresolved_annotations: 0,
                total_files: 0,
                total_required_nodes: 0,
            },
        }
    }

    fn file(source: &str, target: &str) -> PackageFile {
        PackageFile {
            source_document_id: Uuid::new_v4(),
            source_path: source.into(),
            target_path: target.into(),
            node_code: "16.1".into(),
            node_title: "Protocol".into(),
            file_name: target.rsplit('/').next().unwrap().into(),
            version: 1,
            file_size: 0,
            page_count: None,
        }
    }

    #[test]
    fn traversal_and_absolute_paths_rejected() {
        assert!(validate_target_path("m5/study-001/16-1/a.pdf").is_ok());
        for bad in [
            "../etc/passwd",
            "/absolute/path/file.pdf",
            "m5/../../../etc/passwd",
            "m5\\study\\a.pdf",
            "c:/windows/a.pdf",
            "m5//a.pdf",
            "m5/./a.pdf",
            "",
        ] {
            let err = validate_target_path(bad).unwrap_err();
            assert!(
                err.to_string().contains("Invalid target path"),
                "expected path security error for {bad:?}, got {err}"
            );
        }
    }

    #[tokio::test]
    async fn copies_files_into_folder_tree() {
        let uploads = tempfile::tempdir().unwrap();
        std::fs::write(uploads.path().join("src.pdf"), b"%PDF-1.5 test").unwrap();
        let storage = UploadsRoot::new(uploads.path());

        let out = tempfile::tempdir().unwrap();
        let manifest = manifest_for(vec![file("src.pdf", "m5/study-001/16-1/a.pdf")]);

        create_ectd_structure(&manifest, out.path(), &storage)
            .await
            .unwrap();

        let copied = std::fs::read(out.path().join("m5/study-001/16-1/a.pdf")).unwrap();
        assert_eq!(copied, b"%PDF-1.5 test");
    }

    #[tokio::test]
    async fn bad_path_aborts_before_any_copy() {
        let uploads = tempfile::tempdir().unwrap();
        std::fs::write(uploads.path().join("src.pdf"), b"data").unwrap();
        let storage = UploadsRoot::new(uploads.path());

        let out = tempfile::tempdir().unwrap();
        let manifest = manifest_for(vec![
            file("src.pdf", "m5/study-001/16-1/a.pdf"),
            file("src.pdf", "../etc/passwd"),
        ]);

        let err = create_ectd_structure(&manifest, out.path(), &storage)
            .await
            .unwrap_err();
        assert!(matches!(err, DossierError::PathSecurity(_)));
        // The good file was never copied either.
        assert!(!out.path().join("m5/study-001/16-1/a.pdf").exists());
    }

    #[tokio::test]
    async fn missing_source_is_an_io_failure() {
        let storage = UploadsRoot::new("/nonexistent");
        let out = tempfile::tempdir().unwrap();
        let manifest = manifest_for(vec![file("ghost.pdf", "m5/study-001/16-1/a.pdf")]);

        let err = create_ectd_structure(&manifest, out.path(), &storage)
            .await
            .unwrap_err();
        assert!(matches!(err, DossierError::Io(_)));
    }

    #[tokio::test]
    async fn structure_creation_is_idempotent() {
        let uploads = tempfile::tempdir().unwrap();
        std::fs::write(uploads.path().join("src.pdf"), b"data").unwrap();
        let storage = UploadsRoot::new(uploads.path());

        let out = tempfile::tempdir().unwrap();
        let manifest = manifest_for(vec![file("src.pdf", "m5/study-001/16-1/a.pdf")]);

        create_ectd_structure(&manifest, out.path(), &storage)
            .await
            .unwrap();
        create_ectd_structure(&manifest, out.path(), &storage)
            .await
            .unwrap();
    }
}
