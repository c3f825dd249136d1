// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The exporter — top-level orchestration with all-or-nothing semantics.
//
// One export runs readiness gate → structure → per-document PDF
// processing → cover → artifacts → validation, strictly in that order.
// Any failure after the export directory exists triggers exactly one
// best-effort cleanup; cleanup failures are logged and swallowed so the
// original error always wins.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use tracing::{info, instrument, warn};
use uuid::Uuid;

use dossierwerk_bridge::{SponsorDirectory, StoragePaths, StudyRecord, StudyRepository};
use dossierwerk_core::config::ExportConfig;
use dossierwerk_core::error::{DossierError, Result};
use dossierwerk_core::types::{
    BookmarkManifest, DocumentBookmarks, ExportResult, HyperlinkReport, PackageId,
    PackageManifest, ReadinessCheck,
};
use dossierwerk_manifest::{ManifestAssembler, ManifestOptions};
use dossierwerk_pdf::{HyperlinkOptions, ProcessOptions, build_path_map, generate_cover, process_document};
use dossierwerk_validate::PackageValidator;

use crate::artifacts::{ArtifactInputs, ExportArtifacts, generate_export_artifacts};
use crate::structure::create_ectd_structure;

/// Fallback for an error that renders to nothing useful.
const UNKNOWN_EXPORT_ERROR: &str = "Unknown export error";

/// Per-export options.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Export despite a failed readiness gate. Path security failures are
    /// never forceable.
    pub force: bool,
    /// Submission sequence, 4-digit zero-padded.
    pub sequence: String,
    pub manifest: ManifestOptions,
    pub process_hyperlinks: bool,
    pub remove_external_links: bool,
    pub remove_mailto_links: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            force: false,
            sequence: "0000".to_string(),
            manifest: ManifestOptions::default(),
            process_hyperlinks: true,
            remove_external_links: false,
            remove_mailto_links: false,
        }
    }
}

/// Orchestrates one export per call over explicitly passed collaborators.
pub struct Exporter<R, S, P> {
    repository: R,
    storage: S,
    sponsors: P,
    config: ExportConfig,
}

impl<R, S, P> Exporter<R, S, P>
where
    R: StudyRepository,
    S: StoragePaths,
    P: SponsorDirectory,
{
    pub fn new(repository: R, storage: S, sponsors: P, config: ExportConfig) -> Self {
        Self {
            repository,
            storage,
            sponsors,
            config,
        }
    }

    /// Run one export to completion.
    ///
    /// Short-circuits (no directory, no cleanup) on assembly failure, an
    /// empty file set, or a failed readiness gate without `force`. After
    /// the export directory exists, any error removes it again.
    #[instrument(skip(self, options), fields(%study_id, force = options.force))]
    pub async fn export_package(&self, study_id: Uuid, options: ExportOptions) -> ExportResult {
        let package_id = PackageId::new();

        let assembler = ManifestAssembler::new(&self.repository);
        let (manifest, study) = match assembler.assemble_detailed(study_id, options.manifest).await
        {
            Ok(assembled) => assembled,
            Err(err) => return ExportResult::failure(package_id, error_message(err)),
        };

        if manifest.files.is_empty() {
            return ExportResult::failure(package_id, "No documents available for export");
        }
        if !manifest.readiness.ready && !options.force {
            return ExportResult::failure(package_id, readiness_error(&manifest.readiness));
        }

        let export_dir = self
            .config
            .exports_root
            .join(study_id.to_string())
            .join(package_id.to_string());
        if let Err(err) = tokio::fs::create_dir_all(&export_dir).await {
            return ExportResult::failure(package_id, error_message(err.into()));
        }
        info!(dir = %export_dir.display(), "export directory created");

        match self
            .run_pipeline(&manifest, &study, &export_dir, &options)
            .await
        {
            Ok((artifacts, validation)) => {
                info!(zip = %artifacts.zip_path.display(), "export complete");
                ExportResult {
                    package_id,
                    success: true,
                    zip_path: Some(artifacts.zip_path),
                    zip_size: Some(artifacts.zip_size),
                    manifest: Some(manifest),
                    validation,
                    error: None,
                }
            }
            Err(err) => {
                let message = error_message(err);
                // Exactly one cleanup; its failure never masks the export
                // error.
                if let Err(cleanup_err) = self.cleanup_export(&export_dir).await {
                    warn!(%cleanup_err, "cleanup after failed export also failed");
                }
                ExportResult::failure(package_id, message)
            }
        }
    }

    /// Remove an export directory.
    ///
    /// Refuses to touch anything outside the configured exports root
    /// without going near the filesystem first.
    pub async fn cleanup_export(&self, path: &Path) -> Result<()> {
        ensure_inside_root(&self.config.exports_root, path)?;
        tokio::fs::remove_dir_all(path).await?;
        info!(dir = %path.display(), "export directory removed");
        Ok(())
    }

    async fn run_pipeline(
        &self,
        manifest: &PackageManifest,
        study: &StudyRecord,
        export_dir: &Path,
        options: &ExportOptions,
    ) -> Result<(ExportArtifacts, Option<serde_json::Value>)> {
        create_ectd_structure(manifest, export_dir, &self.storage).await?;

        let (bookmark_rollups, link_report) = self
            .process_documents(manifest, study, export_dir, options)
            .await?;

        let cover = generate_cover(manifest)?;
        let cover_dir = export_dir.join("m1/us");
        tokio::fs::create_dir_all(&cover_dir).await?;
        tokio::fs::write(cover_dir.join("cover.pdf"), &cover.bytes).await?;

        let bookmark_manifest = BookmarkManifest {
            root_bookmarks: cover.outline,
            total_count: cover.bookmarks.bookmark_count
                + bookmark_rollups.iter().map(|b| b.bookmark_count).sum::<u32>(),
            max_depth: cover
                .bookmarks
                .max_depth
                .max(bookmark_rollups.iter().map(|b| b.max_depth).max().unwrap_or(0)),
            warnings: cover
                .bookmarks
                .warnings
                .iter()
                .chain(bookmark_rollups.iter().flat_map(|b| b.warnings.iter()))
                .cloned()
                .collect(),
            document_bookmarks: bookmark_rollups,
        };

        let sponsor = self.sponsors.sponsor_for_study(manifest.study_id).await?;
        let inputs = ArtifactInputs {
            manifest,
            sponsor: &sponsor,
            sequence: dossierwerk_backbone::sequence_info(&options.sequence),
            study_title: &study.title,
            bookmark_manifest: &bookmark_manifest,
            hyperlinks: &link_report,
            compute_checksums: self.config.compute_checksums,
        };
        let artifacts = generate_export_artifacts(&inputs, export_dir).await?;

        let validation = if self.config.validate_after_export {
            Some(self.validate(manifest, &link_report, export_dir).await?)
        } else {
            None
        };

        Ok((artifacts, validation))
    }

    /// Bookmark and hyperlink stages, one load/save pass per document.
    async fn process_documents(
        &self,
        manifest: &PackageManifest,
        study: &StudyRecord,
        export_dir: &Path,
        options: &ExportOptions,
    ) -> Result<(Vec<DocumentBookmarks>, HyperlinkReport)> {
        let records: HashMap<Uuid, &dossierwerk_bridge::DocumentRecord> =
            study.documents.iter().map(|doc| (doc.id, doc)).collect();
        let path_map = build_path_map(&manifest.files);

        let mut bookmark_rollups = Vec::new();
        let mut link_report = HyperlinkReport::default();

        for file in &manifest.files {
            let target = export_dir.join(&file.target_path);
            let bytes = tokio::fs::read(&target).await?;

            let bookmarks = records
                .get(&file.source_document_id)
                .filter(|record| !record.bookmarks.is_empty())
                .map(|record| record.bookmarks.clone());
            let base_dir = file
                .target_path
                .rsplit_once('/')
                .map(|(dir, _)| dir.to_string())
                .unwrap_or_default();

            let process_options = ProcessOptions {
                bookmarks,
                strip_bookmarks: false,
                hyperlinks: Some(HyperlinkOptions {
                    path_map: path_map.clone(),
                    base_dir,
                    remove_external: options.remove_external_links,
                    remove_mailto: options.remove_mailto_links,
                }),
                process_hyperlinks: options.process_hyperlinks,
            };

            let (processed, outcome) = process_document(&bytes, &file.target_path, &process_options)?;
            tokio::fs::write(&target, processed).await?;

            if let Some(injection) = outcome.bookmarks {
                bookmark_rollups.push(DocumentBookmarks {
                    target_path: file.target_path.clone(),
                    bookmark_count: injection.bookmark_count,
                    max_depth: injection.max_depth,
                    warnings: injection.warnings,
                });
            }
            if let Some(report) = outcome.hyperlinks {
                link_report.merge(&report);
            }
        }

        Ok((bookmark_rollups, link_report))
    }

    async fn validate(
        &self,
        manifest: &PackageManifest,
        link_report: &HyperlinkReport,
        export_dir: &Path,
    ) -> Result<serde_json::Value> {
        let validator = PackageValidator::new()?;
        let mut file_results = Vec::with_capacity(manifest.files.len());
        for file in &manifest.files {
            let bytes = tokio::fs::read(export_dir.join(&file.target_path)).await?;
            file_results.push(validator.validate_file(file, &bytes));
        }
        let report = validator
            .validate_package(manifest, Some(link_report), file_results)
            .strip_details();
        Ok(serde_json::to_value(report)?)
    }
}

// -- Helpers ------------------------------------------------------------------

fn error_message(err: DossierError) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        UNKNOWN_EXPORT_ERROR.to_string()
    } else {
        message
    }
}

/// "Study is not ready for export: 1 required document(s) missing,
/// 2 validation error(s), 3 unresolved correction(s)".
fn readiness_error(readiness: &ReadinessCheck) -> String {
    let mut parts = Vec::new();
    if !readiness.missing_required.is_empty() {
        parts.push(format!(
            "{} required document(s) missing",
            readiness.missing_required.len()
        ));
    }
    if readiness.validation_errors > 0 {
        parts.push(format!(
            "{} validation error(s)",
            readiness.validation_errors
        ));
    }
    if readiness.unresolved_annotations > 0 {
        parts.push(format!(
            "{} unresolved correction(s)",
            readiness.unresolved_annotations
        ));
    }
    if parts.is_empty() {
        parts.push("readiness gate failed".to_string());
    }
    format!("Study is not ready for export: {}", parts.join(", "))
}

/// Lexical containment check: `path` must normalise to something strictly
/// inside `root`. No filesystem access.
fn ensure_inside_root(root: &Path, path: &Path) -> Result<()> {
    let root = normalize(root).ok_or_else(|| cleanup_error(path))?;
    let normalized = normalize(path).ok_or_else(|| cleanup_error(path))?;
    if normalized.len() > root.len() && normalized.starts_with(&root[..]) {
        Ok(())
    } else {
        Err(cleanup_error(path))
    }
}

fn cleanup_error(path: &Path) -> DossierError {
    DossierError::Cleanup(path.display().to_string())
}

/// Fold `.` and `..` without touching the filesystem. Returns `None` when
/// `..` would climb above the start of the path.
fn normalize(path: &Path) -> Option<Vec<std::ffi::OsString>> {
    let mut stack: Vec<std::ffi::OsString> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                stack.pop()?;
            }
            Component::Normal(part) => stack.push(part.to_os_string()),
            Component::RootDir | Component::Prefix(_) => {
                stack.push(component.as_os_str().to_os_string())
            }
        }
    }
    Some(stack)
}
