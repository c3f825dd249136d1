// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Dossierwerk packaging engine.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one export run. Every export gets a fresh id and
/// an isolated directory `exports/<study_id>/<package_id>/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageId(pub Uuid);

impl PackageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PackageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Review lifecycle states of a study document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    /// Authored but not yet submitted for review.
    Draft,
    /// Submitted, waiting on reviewer sign-off.
    InReview,
    /// Signed off by all reviewers.
    Approved,
    /// Approved and released into the submission-ready set.
    Published,
    /// Sent back with required corrections.
    Rejected,
}

impl DocumentStatus {
    /// Preference rank when several versions compete for one slot.
    /// Published beats Approved beats everything else.
    pub fn slot_rank(&self) -> u8 {
        match self {
            Self::Published => 3,
            Self::Approved => 2,
            Self::Draft | Self::InReview => 1,
            Self::Rejected => 0,
        }
    }

    /// Whether the document has left the review pipeline.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Published | Self::Rejected)
    }
}

/// One document placed into the package.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageFile {
    pub source_document_id: Uuid,
    /// Path of the source bytes, relative to the uploads root.
    pub source_path: String,
    /// Sanitized, traversal-free path inside the package, forward slashes.
    pub target_path: String,
    /// Dotted template node code, e.g. "16.2.1".
    pub node_code: String,
    pub node_title: String,
    /// Lowercase ASCII file name, stem capped at 50 chars.
    pub file_name: String,
    pub version: u32,
    pub file_size: u64,
    pub page_count: Option<u32>,
}

/// A required or optional slot that has no eligible document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingSlot {
    pub node_code: String,
    pub node_title: String,
}

/// A document still in the review pipeline at manifest time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDocument {
    pub document_id: Uuid,
    pub node_code: String,
    pub title: String,
    pub status: DocumentStatus,
}

/// Export eligibility snapshot computed alongside the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessCheck {
    pub ready: bool,
    pub missing_required: Vec<MissingSlot>,
    pub pending_approval: Vec<PendingDocument>,
    /// Count of selected documents with failed validations.
    pub validation_errors: u32,
    /// Count of unresolved correction-required annotations on selected
    /// documents.
    pub unresolved_annotations: u32,
    pub total_files: u32,
    pub total_required_nodes: u32,
}

impl ReadinessCheck {
    /// `ready` is derived, never stored independently: no missing required
    /// slots, no validation errors, no unresolved corrections.
    pub fn compute_ready(&mut self) {
        self.ready = self.missing_required.is_empty()
            && self.validation_errors == 0
            && self.unresolved_annotations == 0;
    }
}

/// Directory tree node, built purely from `target_path` segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    /// Last path segment, e.g. "16-2-1".
    pub name: String,
    /// Full path from the package root, forward slashes.
    pub path: String,
    /// File names placed directly in this folder.
    pub files: Vec<String>,
    pub children: Vec<FolderNode>,
}

/// One export's full file set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub study_id: Uuid,
    pub study_number: String,
    pub generated_at: DateTime<Utc>,
    /// Sorted by numeric-aware node code comparison; one file per slot.
    pub files: Vec<PackageFile>,
    pub folder_structure: Vec<FolderNode>,
    pub readiness: ReadinessCheck,
}

/// One eCTD XML `<leaf>` element.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafEntry {
    /// Stable synthetic element ID derived from the node code.
    pub id: String,
    /// Relative to the package root, forward slashes.
    pub href: String,
    /// 32-char lowercase hex, or empty when checksum computation was
    /// skipped for a dry run.
    pub checksum: String,
    pub checksum_type: String,
    pub file_size: u64,
    pub title: String,
    pub node_code: String,
}

/// One PDF outline entry supplied to the bookmark injector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkEntry {
    pub title: String,
    /// 1-based; entries outside `[1, page_count]` are dropped with a
    /// warning.
    pub page_number: u32,
    #[serde(default)]
    pub children: Vec<BookmarkEntry>,
    /// Whether the entry renders expanded in the viewer.
    #[serde(default)]
    pub is_open: bool,
}

/// Result of one bookmark injection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkInjection {
    pub success: bool,
    pub bookmark_count: u32,
    pub max_depth: u32,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

/// Per-document roll-up recorded in `bookmark-manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentBookmarks {
    pub target_path: String,
    pub bookmark_count: u32,
    pub max_depth: u32,
    pub warnings: Vec<String>,
}

/// Aggregate bookmark report for one export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkManifest {
    /// The cover page's own outline, mirroring the table of contents.
    pub root_bookmarks: Vec<BookmarkEntry>,
    pub document_bookmarks: Vec<DocumentBookmarks>,
    pub total_count: u32,
    pub max_depth: u32,
    pub warnings: Vec<String>,
}

/// Classification of a PDF link annotation. A pure function of the link's
/// target fields — see `dossierwerk-pdf::hyperlinks::classify_link`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkType {
    Internal,
    CrossDocument,
    External,
    Unknown,
}

/// One link annotation lifted out of a PDF page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedLink {
    /// Package-relative path of the file the link lives in.
    pub source_file: String,
    /// 1-based page the annotation sits on.
    pub page_number: u32,
    pub target_uri: Option<String>,
    pub target_page: Option<u32>,
    pub target_destination: Option<String>,
    pub link_type: LinkType,
}

/// A cross-document link whose target could not be resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenLink {
    pub source_file: String,
    pub page_number: u32,
    pub target: String,
    pub reason: String,
}

/// Aggregate hyperlink report for one processing run.
///
/// Invariant: `updated_count + removed_count + kept_count == total_links`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HyperlinkReport {
    pub total_links: u32,
    pub internal_count: u32,
    pub cross_document_count: u32,
    pub external_count: u32,
    pub unknown_count: u32,
    /// Cross-document targets rewritten through the path map.
    pub updated_count: u32,
    /// External / mailto annotations deleted outright.
    pub removed_count: u32,
    /// Links left in place (flagged or untouched).
    pub kept_count: u32,
    pub broken_links: Vec<BrokenLink>,
    pub external_links: Vec<ExtractedLink>,
    pub warnings: Vec<String>,
}

impl HyperlinkReport {
    /// Fold another per-file report into this aggregate.
    pub fn merge(&mut self, other: &HyperlinkReport) {
        self.total_links += other.total_links;
        self.internal_count += other.internal_count;
        self.cross_document_count += other.cross_document_count;
        self.external_count += other.external_count;
        self.unknown_count += other.unknown_count;
        self.updated_count += other.updated_count;
        self.removed_count += other.removed_count;
        self.kept_count += other.kept_count;
        self.broken_links.extend(other.broken_links.iter().cloned());
        self.external_links
            .extend(other.external_links.iter().cloned());
        self.warnings.extend(other.warnings.iter().cloned());
    }
}

/// Submission sequence classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionType {
    Original,
    Amendment,
}

impl SubmissionType {
    /// Keyword used in the backbone XML header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Amendment => "amendment",
        }
    }
}

/// A submission sequence: a 4-digit zero-padded number plus its type.
/// Sequence "0000" is the original application; everything after is an
/// amendment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceInfo {
    pub number: String,
    #[serde(rename = "type")]
    pub kind: SubmissionType,
}

/// Final outcome of one export call.
///
/// `success == false` implies `zip_path` is absent and the export
/// directory has been removed (when it was ever created).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub package_id: PackageId,
    pub success: bool,
    pub zip_path: Option<PathBuf>,
    pub zip_size: Option<u64>,
    pub manifest: Option<PackageManifest>,
    pub validation: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl ExportResult {
    /// Shape a failure result. Failures never carry a zip path.
    pub fn failure(package_id: PackageId, error: impl Into<String>) -> Self {
        Self {
            package_id,
            success: false,
            zip_path: None,
            zip_size: None,
            manifest: None,
            validation: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_rank_prefers_published() {
        assert!(DocumentStatus::Published.slot_rank() > DocumentStatus::Approved.slot_rank());
        assert!(DocumentStatus::Approved.slot_rank() > DocumentStatus::Draft.slot_rank());
        assert!(DocumentStatus::Draft.slot_rank() > DocumentStatus::Rejected.slot_rank());
    }

    #[test]
    fn readiness_ready_is_derived() {
        let mut readiness = ReadinessCheck {
            ready: true,
            missing_required: vec![MissingSlot {
                node_code: "16.1".into(),
                node_title: "Protocol".into(),
            }],
            pending_approval: Vec::new(),
            validation_errors: 0,
            unresolved_annotations: 0,
            total_files: 0,
            total_required_nodes: 1,
        };
        readiness.compute_ready();
        assert!(!readiness.ready);

        readiness.missing_required.clear();
        readiness.compute_ready();
        assert!(readiness.ready);

        readiness.unresolved_annotations = 2;
        readiness.compute_ready();
        assert!(!readiness.ready);
    }

    #[test]
    fn hyperlink_report_merge_sums_counts() {
        let mut total = HyperlinkReport::default();
        let per_file = HyperlinkReport {
            total_links: 3,
            internal_count: 1,
            cross_document_count: 1,
            external_count: 1,
            updated_count: 1,
            removed_count: 1,
            kept_count: 1,
            ..Default::default()
        };
        total.merge(&per_file);
        total.merge(&per_file);
        assert_eq!(total.total_links, 6);
        assert_eq!(
            total.updated_count + total.removed_count + total.kept_count,
            total.total_links
        );
    }

    #[test]
    fn link_type_serializes_kebab_case() {
        let json = serde_json::to_string(&LinkType::CrossDocument).unwrap();
        assert_eq!(json, "\"cross-document\"");
    }

    #[test]
    fn failure_result_has_no_zip_path() {
        let result = ExportResult::failure(PackageId::new(), "boom");
        assert!(!result.success);
        assert!(result.zip_path.is_none());
        assert_eq!(result.error.as_deref(), Some("boom"));
    }
}
