// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Collaborator trait definitions for the packaging engine.
//
// The engine never talks to a database, object store, or sponsor registry
// directly. Everything it needs from the surrounding system arrives through
// these three traits, passed explicitly into the exporter — no ambient
// singletons.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dossierwerk_core::error::Result;
use dossierwerk_core::types::{BookmarkEntry, DocumentStatus};

/// A clinical study as the repository hands it over: template and document
/// set pre-joined, annotations counted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyRecord {
    pub id: Uuid,
    pub study_number: String,
    pub title: String,
    pub template: Option<TemplateRecord>,
    pub documents: Vec<DocumentRecord>,
}

/// The active document template assigned to a study.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: Uuid,
    pub name: String,
    pub nodes: Vec<TemplateNode>,
}

/// One slot in the study structure: a position a document may fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateNode {
    /// Dotted hierarchical code, e.g. "16.2.1".
    pub code: String,
    pub title: String,
    pub required: bool,
}

/// One document version as stored by the review system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub node_code: String,
    pub title: String,
    pub version: u32,
    pub status: DocumentStatus,
    pub file_name: String,
    /// Path of the PDF bytes, relative to the uploads root.
    pub storage_path: String,
    pub file_size: u64,
    pub page_count: Option<u32>,
    /// Failed validation findings still open on this version.
    pub validation_error_count: u32,
    /// Correction-required review annotations not yet resolved.
    pub unresolved_correction_count: u32,
    /// Outline to inject during export. Stored structured, never as a
    /// serialized blob.
    pub bookmarks: Vec<BookmarkEntry>,
}

/// Sponsor metadata stamped into the regional backbone XML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SponsorInfo {
    pub applicant_name: String,
    pub application_type: Option<String>,
    pub application_number: Option<String>,
    pub duns_number: Option<String>,
}

/// Read access to studies, templates, and their document sets.
#[async_trait]
pub trait StudyRepository: Send + Sync {
    /// Load a study with its active template and every document version,
    /// or `None` when the study does not exist.
    async fn find_study_with_template_and_documents(
        &self,
        id: Uuid,
    ) -> Result<Option<StudyRecord>>;
}

/// Resolves repository-relative storage paths to absolute filesystem paths.
pub trait StoragePaths: Send + Sync {
    /// Absolute location of the bytes behind a relative storage path.
    fn full_path(&self, relative: &str) -> PathBuf;
}

/// Sponsor metadata lookup for the regional XML.
#[async_trait]
pub trait SponsorDirectory: Send + Sync {
    async fn sponsor_for_study(&self, study_id: Uuid) -> Result<SponsorInfo>;
}

/// Storage resolver rooted at a fixed uploads directory.
#[derive(Debug, Clone)]
pub struct UploadsRoot {
    root: PathBuf,
}

impl UploadsRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl StoragePaths for UploadsRoot {
    fn full_path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}
