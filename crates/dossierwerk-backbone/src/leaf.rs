// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Leaf entry construction — one checksum-backed `<leaf>` per manifest file.
//
// Digests are taken over the files as they sit in the package tree, after
// bookmark and hyperlink processing; a checksum of the upload source would
// not match what the agency receives.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, instrument};

use dossierwerk_core::checksum::md5_file;
use dossierwerk_core::error::Result;
use dossierwerk_core::paths::compare_node_codes;
use dossierwerk_core::types::{LeafEntry, PackageManifest};

/// Options for leaf construction.
#[derive(Debug, Clone, Copy)]
pub struct LeafOptions {
    /// Skippable for dry runs where backbone structure matters but
    /// digests do not; the checksum attribute renders empty.
    pub compute_checksums: bool,
}

impl Default for LeafOptions {
    fn default() -> Self {
        Self {
            compute_checksums: true,
        }
    }
}

/// Build the sorted leaf entry list for a manifest, hashing each file
/// where it lies under `package_root`.
///
/// IDs are synthetic but stable: derived from the node code, with a
/// numeric suffix only when two files share one code.
#[instrument(skip_all, fields(files = manifest.files.len(), root = %package_root.display()))]
pub fn build_leaf_entries(
    manifest: &PackageManifest,
    package_root: &Path,
    options: LeafOptions,
) -> Result<Vec<LeafEntry>> {
    let mut used_ids: HashSet<String> = HashSet::new();
    let mut entries = Vec::with_capacity(manifest.files.len());

    for file in &manifest.files {
        let checksum = if options.compute_checksums {
            md5_file(package_root.join(&file.target_path))?
        } else {
            String::new()
        };

        entries.push(LeafEntry {
            id: unique_leaf_id(&file.node_code, &mut used_ids),
            href: file.target_path.clone(),
            checksum,
            checksum_type: "md5".to_string(),
            file_size: file.file_size,
            title: file.node_title.clone(),
            node_code: file.node_code.clone(),
        });
    }

    entries.sort_by(|a, b| compare_node_codes(&a.node_code, &b.node_code));
    debug!(leaves = entries.len(), "leaf entries built");
    Ok(entries)
}

/// `16.2.1` → `leaf-16-2-1`; a second file under the same code gets
/// `leaf-16-2-1-2`, and so on.
fn unique_leaf_id(node_code: &str, used: &mut HashSet<String>) -> String {
    let base = format!("leaf-{}", node_code.replace('.', "-"));
    if used.insert(base.clone()) {
        return base;
    }
    let mut attempt = 2usize;
    loop {
        let candidate = format!("{base}-{attempt}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        attempt += 1;
    }
}
