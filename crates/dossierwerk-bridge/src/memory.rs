// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory collaborators for tests and offline tooling.
//
// Real deployments implement the traits over a relational store and an
// object store; the engine itself cannot tell the difference.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use dossierwerk_core::error::Result;

use crate::traits::{SponsorDirectory, SponsorInfo, StudyRecord, StudyRepository};

/// Studies held in a plain map, keyed by id.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    studies: HashMap<Uuid, StudyRecord>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a study record.
    pub fn put_study(&mut self, study: StudyRecord) {
        self.studies.insert(study.id, study);
    }
}

#[async_trait]
impl StudyRepository for MemoryRepository {
    async fn find_study_with_template_and_documents(
        &self,
        id: Uuid,
    ) -> Result<Option<StudyRecord>> {
        Ok(self.studies.get(&id).cloned())
    }
}

/// Sponsor directory returning one fixed record for every study.
#[derive(Debug, Clone)]
pub struct FixedSponsor {
    info: SponsorInfo,
}

impl FixedSponsor {
    pub fn new(info: SponsorInfo) -> Self {
        Self { info }
    }
}

impl Default for FixedSponsor {
    fn default() -> Self {
        Self {
            info: SponsorInfo {
                applicant_name: "Example Pharma Inc".to_string(),
                application_type: Some("IND".to_string()),
                application_number: Some("123456".to_string()),
                duns_number: None,
            },
        }
    }
}

#[async_trait]
impl SponsorDirectory for FixedSponsor {
    async fn sponsor_for_study(&self, _study_id: Uuid) -> Result<SponsorInfo> {
        Ok(self.info.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{StoragePaths, UploadsRoot};

    #[tokio::test]
    async fn missing_study_returns_none() {
        let repo = MemoryRepository::new();
        let found = repo
            .find_study_with_template_and_documents(Uuid::new_v4())
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn stored_study_round_trips() {
        let mut repo = MemoryRepository::new();
        let id = Uuid::new_v4();
        repo.put_study(StudyRecord {
            id,
            study_number: "STUDY-001".into(),
            title: "Phase III pivotal".into(),
            template: None,
            documents: Vec::new(),
        });

        let found = repo
            .find_study_with_template_and_documents(id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.study_number, "STUDY-001");
    }

    #[test]
    fn uploads_root_prefixes_relative_paths() {
        let resolver = UploadsRoot::new("/srv/uploads");
        assert_eq!(
            resolver.full_path("docs/a.pdf"),
            std::path::PathBuf::from("/srv/uploads/docs/a.pdf")
        );
    }
}
