// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Validation reporting — severity bucketing, transport stripping, and the
// human-readable rendering.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::rules::Severity;

/// One check outcome, joined to its rule's severity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub rule: String,
    pub severity: Severity,
    pub passed: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// All check results for one packaged file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileValidation {
    pub target_path: String,
    pub results: Vec<CheckResult>,
}

/// The full two-tier validation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageValidationReport {
    /// `error_count == 0`.
    pub valid: bool,
    /// Mirrors the manifest's readiness flag for the header line.
    pub ready: bool,
    pub error_count: u32,
    pub warning_count: u32,
    pub info_count: u32,
    pub files: Vec<FileValidation>,
    pub package_results: Vec<CheckResult>,
}

impl PackageValidationReport {
    /// Assemble a report from raw results, bucketing failed checks by
    /// their rule severity.
    pub fn from_results(
        ready: bool,
        files: Vec<FileValidation>,
        package_results: Vec<CheckResult>,
    ) -> Self {
        let mut error_count = 0u32;
        let mut warning_count = 0u32;
        let mut info_count = 0u32;

        let failed = files
            .iter()
            .flat_map(|file| file.results.iter())
            .chain(package_results.iter())
            .filter(|result| !result.passed);
        for result in failed {
            match result.severity {
                Severity::Error => error_count += 1,
                Severity::Warning => warning_count += 1,
                Severity::Info => info_count += 1,
            }
        }

        Self {
            valid: error_count == 0,
            ready,
            error_count,
            warning_count,
            info_count,
            files,
            package_results,
        }
    }

    /// Transport form: per-issue detail payloads are dropped, counts and
    /// messages survive.
    pub fn strip_details(mut self) -> Self {
        for file in &mut self.files {
            for result in &mut file.results {
                result.details = None;
            }
        }
        for result in &mut self.package_results {
            result.details = None;
        }
        self
    }

    /// Labeled plain-text rendering for logs and QC reviewers.
    pub fn format_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Package validation: {}",
            if self.valid { "VALID" } else { "INVALID" }
        );
        let _ = writeln!(
            out,
            "Readiness: {}",
            if self.ready { "READY" } else { "NOT READY" }
        );
        let _ = writeln!(
            out,
            "{} error(s), {} warning(s), {} info",
            self.error_count, self.warning_count, self.info_count
        );

        self.render_group(&mut out, Severity::Error, "Errors");
        self.render_group(&mut out, Severity::Warning, "Warnings");
        self.render_group(&mut out, Severity::Info, "Info");
        out
    }

    fn render_group(&self, out: &mut String, severity: Severity, heading: &str) {
        let failed: Vec<(Option<&str>, &CheckResult)> = self
            .files
            .iter()
            .flat_map(|file| {
                file.results
                    .iter()
                    .map(move |result| (Some(file.target_path.as_str()), result))
            })
            .chain(
                self.package_results
                    .iter()
                    .map(|result| (None, result)),
            )
            .filter(|(_, result)| !result.passed && result.severity == severity)
            .collect();

        if failed.is_empty() {
            return;
        }
        let _ = writeln!(out, "\n{heading} ({}):", failed.len());
        for (path, result) in failed {
            match path {
                Some(path) => {
                    let _ = writeln!(out, "  [{}] {}: {}", result.rule, path, result.message);
                }
                None => {
                    let _ = writeln!(out, "  [{}] {}", result.rule, result.message);
                }
            }
        }
    }
}
