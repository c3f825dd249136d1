// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The validator — runs both check tiers and assembles the report.

use lopdf::Document;
use tracing::{debug, instrument};

use dossierwerk_core::error::Result;
use dossierwerk_core::types::{HyperlinkReport, PackageFile, PackageManifest};

use crate::checks::FileCheckContext;
use crate::package_checks::PackageCheckContext;
use crate::report::{CheckResult, FileValidation, PackageValidationReport};
use crate::rules::Registry;

/// Two-tier package validator.
///
/// Construction validates the rule/check registry exhaustively, so an
/// unregistered rule name fails here rather than mid-export.
pub struct PackageValidator {
    registry: Registry,
}

impl PackageValidator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            registry: Registry::new()?,
        })
    }

    /// Run every per-file check over one packaged file's bytes.
    #[instrument(skip(self, bytes), fields(target = %file.target_path, bytes_len = bytes.len()))]
    pub fn validate_file(&self, file: &PackageFile, bytes: &[u8]) -> FileValidation {
        // Parse once; individual checks see `None` on parse failure and
        // fail with their own message.
        let document = Document::load_mem(bytes).ok();
        let ctx = FileCheckContext {
            file,
            bytes,
            document: document.as_ref(),
        };

        let results = self
            .registry
            .file_rules()
            .iter()
            .map(|(rule, check)| {
                let outcome = check(&ctx);
                CheckResult {
                    rule: rule.name.to_string(),
                    severity: rule.severity,
                    passed: outcome.passed,
                    message: outcome.message,
                    details: outcome.details,
                }
            })
            .collect();

        FileValidation {
            target_path: file.target_path.clone(),
            results,
        }
    }

    /// Run the package-level checks and assemble the full report from the
    /// per-file results collected by the caller.
    #[instrument(skip_all, fields(files = file_results.len()))]
    pub fn validate_package(
        &self,
        manifest: &PackageManifest,
        hyperlinks: Option<&HyperlinkReport>,
        file_results: Vec<FileValidation>,
    ) -> PackageValidationReport {
        let ctx = PackageCheckContext {
            manifest,
            hyperlinks,
        };

        let package_results = self
            .registry
            .package_rules()
            .iter()
            .map(|(rule, check)| {
                let outcome = check(&ctx);
                CheckResult {
                    rule: rule.name.to_string(),
                    severity: rule.severity,
                    passed: outcome.passed,
                    message: outcome.message,
                    details: outcome.details,
                }
            })
            .collect();

        let report = PackageValidationReport::from_results(
            manifest.readiness.ready,
            file_results,
            package_results,
        );
        debug!(
            valid = report.valid,
            errors = report.error_count,
            warnings = report.warning_count,
            "package validated"
        );
        report
    }
}
