// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Manifest assembly — slot selection and readiness computation.
//
// For every template node ("slot") the assembler picks the single best
// candidate document: Published beats Approved beats everything else, ties
// broken by highest version. Slots with no eligible candidate are omitted
// from the file set and, when required, reported as missing.

use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use dossierwerk_bridge::{DocumentRecord, StudyRecord, StudyRepository, TemplateNode};
use dossierwerk_core::error::{DossierError, Result};
use dossierwerk_core::paths::{
    build_folder_tree, compare_node_codes, sanitize_file_name, target_path_for,
};
use dossierwerk_core::types::{
    MissingSlot, PackageFile, PackageManifest, PendingDocument, ReadinessCheck,
};

/// Which document statuses are eligible for slot selection.
#[derive(Debug, Clone, Copy)]
pub struct ManifestOptions {
    pub include_drafts: bool,
    pub include_approved: bool,
    pub include_published: bool,
}

impl Default for ManifestOptions {
    /// Regulators only ever see approved or published content.
    fn default() -> Self {
        Self {
            include_drafts: false,
            include_approved: true,
            include_published: true,
        }
    }
}

impl ManifestOptions {
    fn eligible(&self, doc: &DocumentRecord) -> bool {
        use dossierwerk_core::types::DocumentStatus::*;
        match doc.status {
            Published => self.include_published,
            Approved => self.include_approved,
            Draft | InReview => self.include_drafts,
            Rejected => false,
        }
    }
}

/// Builds a [`PackageManifest`] from repository state.
pub struct ManifestAssembler<'a, R: StudyRepository> {
    repository: &'a R,
}

impl<'a, R: StudyRepository> ManifestAssembler<'a, R> {
    pub fn new(repository: &'a R) -> Self {
        Self { repository }
    }

    /// Assemble the manifest for one study.
    ///
    /// Fails with [`DossierError::StudyNotFound`] when the study does not
    /// exist and [`DossierError::NoActiveTemplate`] when it has no template
    /// (or an empty one) — without a template there are no slots to fill.
    pub async fn assemble(
        &self,
        study_id: Uuid,
        options: ManifestOptions,
    ) -> Result<PackageManifest> {
        let (manifest, _) = self.assemble_detailed(study_id, options).await?;
        Ok(manifest)
    }

    /// Assemble the manifest and hand the study record back with it, for
    /// callers (the exporter) that also need document bookmarks and study
    /// metadata without a second repository round trip.
    #[instrument(skip(self), fields(%study_id))]
    pub async fn assemble_detailed(
        &self,
        study_id: Uuid,
        options: ManifestOptions,
    ) -> Result<(PackageManifest, StudyRecord)> {
        let study = self
            .repository
            .find_study_with_template_and_documents(study_id)
            .await?
            .ok_or(DossierError::StudyNotFound(study_id))?;

        let template = study
            .template
            .as_ref()
            .filter(|template| !template.nodes.is_empty())
            .ok_or(DossierError::NoActiveTemplate(study_id))?;

        info!(
            study_number = %study.study_number,
            nodes = template.nodes.len(),
            documents = study.documents.len(),
            "assembling package manifest"
        );

        let mut files = Vec::new();
        let mut missing_required = Vec::new();

        for node in &template.nodes {
            match select_best(&study.documents, node, &options) {
                Some(doc) => files.push(package_file(&study, node, doc)),
                None if node.required => missing_required.push(MissingSlot {
                    node_code: node.code.clone(),
                    node_title: node.title.clone(),
                }),
                None => {}
            }
        }

        files.sort_by(|a, b| compare_node_codes(&a.node_code, &b.node_code));

        let readiness = readiness_for(&study, template.nodes.as_slice(), &files, missing_required);
        let folder_structure = build_folder_tree(&files);

        debug!(
            files = files.len(),
            ready = readiness.ready,
            missing = readiness.missing_required.len(),
            "manifest assembled"
        );

        let manifest = PackageManifest {
            study_id: study.id,
            study_number: study.study_number.clone(),
            generated_at: Utc::now(),
            files,
            folder_structure,
            readiness,
        };
        Ok((manifest, study))
    }
}

/// Pick the best candidate for one slot: highest status rank, then highest
/// version.
fn select_best<'d>(
    documents: &'d [DocumentRecord],
    node: &TemplateNode,
    options: &ManifestOptions,
) -> Option<&'d DocumentRecord> {
    documents
        .iter()
        .filter(|doc| doc.node_code == node.code && options.eligible(doc))
        .max_by_key(|doc| (doc.status.slot_rank(), doc.version))
}

fn package_file(study: &StudyRecord, node: &TemplateNode, doc: &DocumentRecord) -> PackageFile {
    PackageFile {
        source_document_id: doc.id,
        source_path: doc.storage_path.clone(),
        target_path: target_path_for(&node.code, &study.study_number, &doc.file_name),
        node_code: node.code.clone(),
        node_title: node.title.clone(),
        file_name: sanitize_file_name(&doc.file_name),
        version: doc.version,
        file_size: doc.file_size,
        page_count: doc.page_count,
    }
}

/// Diff required nodes against filled slots, count open findings on the
/// selected documents, and list everything still in review.
fn readiness_for(
    study: &StudyRecord,
    nodes: &[TemplateNode],
    files: &[PackageFile],
    missing_required: Vec<MissingSlot>,
) -> ReadinessCheck {
    let selected_ids: Vec<Uuid> = files.iter().map(|f| f.source_document_id).collect();

    let mut validation_errors = 0u32;
    let mut unresolved_annotations = 0u32;
    for doc in &study.documents {
        if !selected_ids.contains(&doc.id) {
            continue;
        }
        if doc.validation_error_count > 0 {
            validation_errors += 1;
        }
        unresolved_annotations += doc.unresolved_correction_count;
    }

    let pending_approval = study
        .documents
        .iter()
        .filter(|doc| !doc.status.is_terminal())
        .map(|doc| PendingDocument {
            document_id: doc.id,
            node_code: doc.node_code.clone(),
            title: doc.title.clone(),
            status: doc.status,
        })
        .collect();

    let mut readiness = ReadinessCheck {
        ready: false,
        missing_required,
        pending_approval,
        validation_errors,
        unresolved_annotations,
        total_files: files.len() as u32,
        total_required_nodes: nodes.iter().filter(|n| n.required).count() as u32,
    };
    readiness.compute_ready();
    readiness
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossierwerk_bridge::{MemoryRepository, TemplateRecord};
    use dossierwerk_core::types::DocumentStatus;

    fn node(code: &str, title: &str, required: bool) -> TemplateNode {
        TemplateNode {
            code: code.into(),
            title: title.into(),
            required,
        }
    }

    fn doc(code: &str, version: u32, status: DocumentStatus) -> DocumentRecord {
        DocumentRecord {
            id: Uuid::new_v4(),
            node_code: code.into(),
            title: format!("Document {code} v{version}"),
            version,
            status,
            file_name: format!("doc-{}-v{version}.pdf", code.replace('.', "-")),
            storage_path: format!("uploads/{code}/v{version}.pdf"),
            file_size: 1024,
            page_count: Some(10),
            validation_error_count: 0,
            unresolved_correction_count: 0,
            bookmarks: Vec::new(),
        }
    }

    fn study_with(nodes: Vec<TemplateNode>, documents: Vec<DocumentRecord>) -> StudyRecord {
        StudyRecord {
            id: Uuid::new_v4(),
            study_number: "STUDY-001".into(),
            title: "Pivotal study".into(),
            template: Some(TemplateRecord {
                id: Uuid::new_v4(),
                name: "CSR template".into(),
                nodes,
            }),
            documents,
        }
    }

    async fn assemble(study: StudyRecord, options: ManifestOptions) -> PackageManifest {
        let id = study.id;
        let mut repo = MemoryRepository::new();
        repo.put_study(study);
        ManifestAssembler::new(&repo)
            .assemble(id, options)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn unknown_study_fails() {
        let repo = MemoryRepository::new();
        let err = ManifestAssembler::new(&repo)
            .assemble(Uuid::new_v4(), ManifestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DossierError::StudyNotFound(_)));
    }

    #[tokio::test]
    async fn study_without_template_fails() {
        let mut study = study_with(Vec::new(), Vec::new());
        study.template = None;
        let id = study.id;
        let mut repo = MemoryRepository::new();
        repo.put_study(study);
        let err = ManifestAssembler::new(&repo)
            .assemble(id, ManifestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DossierError::NoActiveTemplate(_)));
    }

    #[tokio::test]
    async fn published_wins_over_newer_approved() {
        let study = study_with(
            vec![node("16.1", "Protocol", true)],
            vec![
                doc("16.1", 3, DocumentStatus::Approved),
                doc("16.1", 2, DocumentStatus::Published),
            ],
        );
        let manifest = assemble(study, ManifestOptions::default()).await;
        assert_eq!(manifest.files.len(), 1);
        assert_eq!(manifest.files[0].version, 2);
    }

    #[tokio::test]
    async fn highest_version_breaks_status_ties() {
        let study = study_with(
            vec![node("16.1", "Protocol", true)],
            vec![
                doc("16.1", 1, DocumentStatus::Approved),
                doc("16.1", 4, DocumentStatus::Approved),
                doc("16.1", 2, DocumentStatus::Approved),
            ],
        );
        let manifest = assemble(study, ManifestOptions::default()).await;
        assert_eq!(manifest.files[0].version, 4);
    }

    #[tokio::test]
    async fn drafts_excluded_by_default() {
        let study = study_with(
            vec![node("16.1", "Protocol", true)],
            vec![doc("16.1", 1, DocumentStatus::Draft)],
        );
        let manifest = assemble(study, ManifestOptions::default()).await;
        assert!(manifest.files.is_empty());
        assert_eq!(manifest.readiness.missing_required.len(), 1);
        assert!(!manifest.readiness.ready);
    }

    #[tokio::test]
    async fn drafts_included_when_opted_in() {
        let study = study_with(
            vec![node("16.1", "Protocol", true)],
            vec![doc("16.1", 1, DocumentStatus::Draft)],
        );
        let options = ManifestOptions {
            include_drafts: true,
            ..Default::default()
        };
        let manifest = assemble(study, options).await;
        assert_eq!(manifest.files.len(), 1);
        // A draft fills the slot but still shows up as pending review.
        assert_eq!(manifest.readiness.pending_approval.len(), 1);
    }

    #[tokio::test]
    async fn files_sorted_by_numeric_node_code() {
        let study = study_with(
            vec![
                node("16.10", "Appendix J", false),
                node("16.2", "Listings", false),
                node("16.1", "Protocol", false),
            ],
            vec![
                doc("16.10", 1, DocumentStatus::Published),
                doc("16.2", 1, DocumentStatus::Published),
                doc("16.1", 1, DocumentStatus::Published),
            ],
        );
        let manifest = assemble(study, ManifestOptions::default()).await;
        let codes: Vec<&str> = manifest.files.iter().map(|f| f.node_code.as_str()).collect();
        assert_eq!(codes, vec!["16.1", "16.2", "16.10"]);
    }

    #[tokio::test]
    async fn open_findings_block_readiness() {
        let mut failing = doc("16.1", 1, DocumentStatus::Published);
        failing.validation_error_count = 2;
        failing.unresolved_correction_count = 1;
        let study = study_with(vec![node("16.1", "Protocol", true)], vec![failing]);
        let manifest = assemble(study, ManifestOptions::default()).await;
        assert_eq!(manifest.readiness.validation_errors, 1);
        assert_eq!(manifest.readiness.unresolved_annotations, 1);
        assert!(!manifest.readiness.ready);
    }

    #[tokio::test]
    async fn folder_structure_follows_target_paths() {
        let study = study_with(
            vec![node("16.1", "Protocol", true)],
            vec![doc("16.1", 1, DocumentStatus::Published)],
        );
        let manifest = assemble(study, ManifestOptions::default()).await;
        assert_eq!(manifest.folder_structure.len(), 1);
        assert_eq!(manifest.folder_structure[0].name, "m5");
        assert_eq!(
            manifest.files[0].target_path,
            "m5/study-001/16-1/doc-16-1-v1.pdf"
        );
    }
}
