// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Validation rules — severity and description live here, pass/fail logic
// lives in the check functions.
//
// The same check can back an ERROR rule in one submission context and a
// WARNING rule in another, so severity is a property of the rule, never of
// the check. The registry joins the two at construction time and treats a
// rule naming an unregistered check as a hard error — misconfiguration
// surfaces at startup, not mid-export.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use dossierwerk_core::error::{DossierError, Result};

use crate::checks::{FileCheck, file_checks};
use crate::package_checks::{PackageCheck, package_checks};

/// How a failed check counts against the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// One named rule: which check runs, and how its failure is bucketed.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub severity: Severity,
    pub description: &'static str,
}

/// Per-file rule set, in execution order.
pub const FILE_RULES: &[Rule] = &[
    Rule {
        name: "file-size-limit",
        severity: Severity::Error,
        description: "File must not exceed the submission size ceiling",
    },
    Rule {
        name: "pdf-parseable",
        severity: Severity::Error,
        description: "File must carry a PDF header and parse as PDF",
    },
    Rule {
        name: "pdf-version",
        severity: Severity::Error,
        description: "PDF version must be between 1.4 and 1.7",
    },
    Rule {
        name: "pdf-not-encrypted",
        severity: Severity::Error,
        description: "Documents must not be encrypted or password protected",
    },
    Rule {
        name: "pdf-fonts-embedded",
        severity: Severity::Warning,
        description: "All non-standard fonts should be embedded",
    },
    Rule {
        name: "pdfa-marker",
        severity: Severity::Info,
        description: "PDF/A conformance marker detection",
    },
    Rule {
        name: "pdf-bookmarks",
        severity: Severity::Warning,
        description: "Documents should carry an outline no deeper than four levels",
    },
    Rule {
        name: "ectd-file-naming",
        severity: Severity::Error,
        description: "File names must be lowercase eCTD-safe and end in .pdf",
    },
    Rule {
        name: "page-size",
        severity: Severity::Warning,
        description: "Pages should be Letter or A4 portrait",
    },
    Rule {
        name: "external-hyperlinks",
        severity: Severity::Warning,
        description: "Documents should not carry external hyperlinks",
    },
    Rule {
        name: "no-javascript",
        severity: Severity::Error,
        description: "Documents must not contain JavaScript or open actions",
    },
];

/// Package-level rule set, in execution order.
pub const PACKAGE_RULES: &[Rule] = &[
    Rule {
        name: "package-not-empty",
        severity: Severity::Error,
        description: "The package must contain at least one file",
    },
    Rule {
        name: "duplicate-target-paths",
        severity: Severity::Error,
        description: "No two files may share one target path",
    },
    Rule {
        name: "study-number-present",
        severity: Severity::Error,
        description: "The study must carry a study number",
    },
    Rule {
        name: "readiness",
        severity: Severity::Error,
        description: "The readiness gate must pass",
    },
    Rule {
        name: "pending-documents",
        severity: Severity::Warning,
        description: "Documents still in review at export time",
    },
    Rule {
        name: "broken-links",
        severity: Severity::Warning,
        description: "Cross-document links must resolve inside the package",
    },
];

/// Rules joined to their check functions, validated exhaustively.
pub struct Registry {
    file: Vec<(Rule, FileCheck)>,
    package: Vec<(Rule, PackageCheck)>,
}

impl Registry {
    /// Join the rule tables to the check registries.
    ///
    /// Fails when any rule names a check that does not exist, or any check
    /// is left without a rule — both are configuration defects.
    pub fn new() -> Result<Self> {
        let file = join(FILE_RULES, file_checks(), "file")?;
        let package = join(PACKAGE_RULES, package_checks(), "package")?;
        Ok(Self { file, package })
    }

    pub fn file_rules(&self) -> &[(Rule, FileCheck)] {
        &self.file
    }

    pub fn package_rules(&self) -> &[(Rule, PackageCheck)] {
        &self.package
    }
}

fn join<C: Copy>(
    rules: &[Rule],
    checks: Vec<(&'static str, C)>,
    tier: &str,
) -> Result<Vec<(Rule, C)>> {
    let mut by_name: HashMap<&'static str, C> = checks.into_iter().collect();

    let mut joined = Vec::with_capacity(rules.len());
    for rule in rules {
        let check = by_name.remove(rule.name).ok_or_else(|| {
            DossierError::Registry(format!(
                "{tier} rule '{}' names an unregistered check",
                rule.name
            ))
        })?;
        joined.push((*rule, check));
    }

    if let Some(orphan) = by_name.keys().next() {
        return Err(DossierError::Registry(format!(
            "{tier} check '{orphan}' has no rule"
        )));
    }
    Ok(joined)
}
