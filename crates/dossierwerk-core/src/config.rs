// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings for the packaging engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Root directory where export packages are materialised
    /// (`<exports_root>/<study_id>/<package_id>/...`).
    pub exports_root: PathBuf,
    /// Root directory the storage path resolver prepends to relative
    /// document paths.
    pub uploads_root: PathBuf,
    /// Compute MD5 checksums for XML leaf entries. Disabled for dry runs
    /// where backbone structure matters but digests do not.
    pub compute_checksums: bool,
    /// Run the package validator after artifact generation.
    pub validate_after_export: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            exports_root: PathBuf::from("./exports"),
            uploads_root: PathBuf::from("./uploads"),
            compute_checksums: true,
            validate_after_export: true,
        }
    }
}
