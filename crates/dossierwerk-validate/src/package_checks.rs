// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Package-level checks — pass/fail logic over the manifest as a whole.

use std::collections::HashMap;

use serde_json::json;

use dossierwerk_core::types::{HyperlinkReport, PackageManifest};

use crate::checks::CheckOutcome;

/// Everything a package-level check may look at.
pub struct PackageCheckContext<'a> {
    pub manifest: &'a PackageManifest,
    /// Aggregate link report from PDF processing, when one was produced.
    pub hyperlinks: Option<&'a HyperlinkReport>,
}

pub type PackageCheck = fn(&PackageCheckContext<'_>) -> CheckOutcome;

/// The package-level check registry, keyed by rule name.
pub fn package_checks() -> Vec<(&'static str, PackageCheck)> {
    vec![
        ("package-not-empty", check_not_empty),
        ("duplicate-target-paths", check_duplicate_targets),
        ("study-number-present", check_study_number),
        ("readiness", check_readiness),
        ("pending-documents", check_pending_documents),
        ("broken-links", check_broken_links),
    ]
}

// -- Checks -------------------------------------------------------------------

fn check_not_empty(ctx: &PackageCheckContext<'_>) -> CheckOutcome {
    let count = ctx.manifest.files.len();
    if count > 0 {
        CheckOutcome::pass(format!("{count} file(s)"))
    } else {
        CheckOutcome::fail("package contains no files")
    }
}

fn check_duplicate_targets(ctx: &PackageCheckContext<'_>) -> CheckOutcome {
    let mut seen: HashMap<&str, u32> = HashMap::new();
    for file in &ctx.manifest.files {
        *seen.entry(file.target_path.as_str()).or_default() += 1;
    }
    let duplicates: Vec<&str> = seen
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(path, _)| path)
        .collect();

    if duplicates.is_empty() {
        CheckOutcome::pass("all target paths unique")
    } else {
        CheckOutcome::fail(format!("{} duplicated target path(s)", duplicates.len()))
            .with_details(json!({ "paths": duplicates }))
    }
}

fn check_study_number(ctx: &PackageCheckContext<'_>) -> CheckOutcome {
    if ctx.manifest.study_number.trim().is_empty() {
        CheckOutcome::fail("study number is missing")
    } else {
        CheckOutcome::pass(format!("study {}", ctx.manifest.study_number))
    }
}

fn check_readiness(ctx: &PackageCheckContext<'_>) -> CheckOutcome {
    let readiness = &ctx.manifest.readiness;
    if readiness.ready {
        return CheckOutcome::pass("study is ready for export");
    }

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
    CheckOutcome::fail(parts.join(", ")).with_details(json!({
        "missingRequired": readiness.missing_required,
        "validationErrors": readiness.validation_errors,
        "unresolvedAnnotations": readiness.unresolved_annotations,
    }))
}

fn check_pending_documents(ctx: &PackageCheckContext<'_>) -> CheckOutcome {
    let pending = &ctx.manifest.readiness.pending_approval;
    if pending.is_empty() {
        CheckOutcome::pass("no documents pending review")
    } else {
        CheckOutcome::fail(format!("{} document(s) still in review", pending.len()))
            .with_details(json!({ "pending": pending }))
    }
}

fn check_broken_links(ctx: &PackageCheckContext<'_>) -> CheckOutcome {
    match ctx.hyperlinks {
        None => CheckOutcome::pass("no hyperlink report supplied"),
        Some(report) if report.broken_links.is_empty() => CheckOutcome::pass(format!(
            "{} cross-document link(s), all resolved",
            report.cross_document_count
        )),
        Some(report) => CheckOutcome::fail(format!(
            "{} broken cross-document link(s)",
            report.broken_links.len()
        ))
        .with_details(json!({ "brokenLinks": report.broken_links })),
    }
}
