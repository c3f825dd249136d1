// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// eCTD path mapping — node codes to sanitized package-relative paths.
//
// Every path that reaches the filesystem assembler flows through this
// module first. Sanitization is lossy by design: regulators require
// lowercase `[a-z0-9-]` path components, and the assembler re-checks the
// result against traversal before any byte is copied.

use std::cmp::Ordering;

use crate::types::{FolderNode, PackageFile};

/// Maximum length of a sanitized file-name stem. The extension is not
/// counted against this limit.
pub const MAX_STEM_LEN: usize = 50;

/// Fallback stem when sanitization leaves nothing behind.
const FALLBACK_STEM: &str = "document";

/// Sanitize one path component: lowercase, collapse runs of disallowed
/// characters to a single hyphen, strip leading/trailing hyphens. The
/// result contains only `[a-z0-9-]`.
pub fn sanitize_path_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_lowercase() || lower.is_ascii_digit() {
            out.push(lower);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

/// Sanitize a file name: the stem follows component rules and is truncated
/// to [`MAX_STEM_LEN`]; the extension is lowercased and sanitized but never
/// truncated. An empty stem falls back to `"document"`.
pub fn sanitize_file_name(raw: &str) -> String {
    let (stem, extension) = match raw.rsplit_once('.') {
        // A leading dot (".hidden") is a stem, not an extension.
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (raw, None),
    };

    let mut stem = sanitize_path_component(stem);
    if stem.is_empty() {
        stem = FALLBACK_STEM.to_string();
    }
    stem.truncate(MAX_STEM_LEN);
    // Truncation can leave a trailing hyphen behind.
    let stem = stem.trim_end_matches('-');

    match extension.map(sanitize_path_component) {
        Some(ext) if !ext.is_empty() => format!("{stem}.{ext}"),
        _ => stem.to_string(),
    }
}

/// Map a dotted node code to its package directory:
/// `m5/<sanitized-study>/<hyphenated-code>`.
///
/// `code_to_folder_path("16.2.1", "STUDY-001") == "m5/study-001/16-2-1"`.
pub fn code_to_folder_path(code: &str, study_number: &str) -> String {
    format!(
        "m5/{}/{}",
        sanitize_path_component(study_number),
        sanitize_path_component(code)
    )
}

/// Full target path for a document: folder path plus sanitized file name.
pub fn target_path_for(code: &str, study_number: &str, file_name: &str) -> String {
    format!(
        "{}/{}",
        code_to_folder_path(code, study_number),
        sanitize_file_name(file_name)
    )
}

/// Split a target path into its directory and file-name portions.
/// Exact inverse of [`target_path_for`] for well-formed paths.
pub fn split_target_path(target_path: &str) -> (&str, &str) {
    match target_path.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", target_path),
    }
}

/// Numeric-aware comparison of dotted node codes: `16.1 < 16.2 < 16.10`.
///
/// Segments that both parse as integers compare numerically; anything else
/// compares lexicographically. A code that is a strict prefix of another
/// sorts first.
pub fn compare_node_codes(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(nx), Ok(ny)) => nx.cmp(&ny),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Group files into a directory tree by the directory portion of their
/// `target_path`. One node per path segment; files landing in the same
/// leaf folder are merged into it.
pub fn build_folder_tree(files: &[PackageFile]) -> Vec<FolderNode> {
    let mut roots: Vec<FolderNode> = Vec::new();

    for file in files {
        let (dir, name) = split_target_path(&file.target_path);
        if dir.is_empty() {
            continue;
        }

        let mut level = &mut roots;
        let mut walked = String::new();
        let segments: Vec<&str> = dir.split('/').collect();
        let last = segments.len() - 1;

        for (index, segment) in segments.iter().enumerate() {
            if !walked.is_empty() {
                walked.push('/');
            }
            walked.push_str(segment);

            let position = match level.iter().position(|node| node.name == *segment) {
                Some(position) => position,
                None => {
                    level.push(FolderNode {
                        name: (*segment).to_string(),
                        path: walked.clone(),
                        files: Vec::new(),
                        children: Vec::new(),
                    });
                    level.len() - 1
                }
            };

            let node = &mut level[position];
            if index == last {
                node.files.push(name.to_string());
            }
            level = &mut node.children;
        }
    }

    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn file_at(target_path: &str) -> PackageFile {
        PackageFile {
            source_document_id: Uuid::new_v4(),
            source_path: "src.pdf".into(),
            target_path: target_path.into(),
            node_code: "16.1".into(),
            node_title: "Protocol".into(),
            file_name: target_path.rsplit('/').next().unwrap().into(),
            version: 1,
            file_size: 10,
            page_count: None,
        }
    }

    #[test]
    fn sanitize_collapses_disallowed_runs() {
        assert_eq!(sanitize_path_component("Study  #001 (Final)"), "study-001-final");
        assert_eq!(sanitize_path_component("__--__"), "");
        assert_eq!(sanitize_path_component("16.2.1"), "16-2-1");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for raw in ["Protocol V2.0", "..//weird\\name", "ALL_CAPS"] {
            let once = sanitize_path_component(raw);
            assert_eq!(sanitize_path_component(&once), once);
        }
    }

    #[test]
    fn file_name_preserves_extension_and_truncates_stem() {
        let long = format!("{}.PDF", "a".repeat(80));
        let cleaned = sanitize_file_name(&long);
        assert!(cleaned.ends_with(".pdf"));
        assert_eq!(cleaned.len(), MAX_STEM_LEN + 4);
    }

    #[test]
    fn empty_stem_falls_back_to_document() {
        assert_eq!(sanitize_file_name("###.pdf"), "document.pdf");
        assert_eq!(sanitize_file_name(""), "document");
    }

    #[test]
    fn folder_path_for_node_code() {
        assert_eq!(
            code_to_folder_path("16.2.1", "STUDY-001"),
            "m5/study-001/16-2-1"
        );
    }

    #[test]
    fn target_path_round_trips() {
        let path = target_path_for("16.2.1", "STUDY-001", "Final Report.pdf");
        let (dir, file) = split_target_path(&path);
        assert_eq!(dir, "m5/study-001/16-2-1");
        assert_eq!(file, "final-report.pdf");
        assert_eq!(path, format!("{dir}/{file}"));
    }

    #[test]
    fn node_codes_compare_numerically() {
        assert_eq!(compare_node_codes("16.1", "16.2"), Ordering::Less);
        assert_eq!(compare_node_codes("16.2", "16.10"), Ordering::Less);
        assert_eq!(compare_node_codes("16.10", "16.9"), Ordering::Greater);
        assert_eq!(compare_node_codes("16", "16.1"), Ordering::Less);
        assert_eq!(compare_node_codes("16.1", "16.1"), Ordering::Equal);
    }

    #[test]
    fn folder_tree_merges_shared_directories() {
        let files = vec![
            file_at("m5/study-001/16-1/a.pdf"),
            file_at("m5/study-001/16-1/b.pdf"),
            file_at("m5/study-001/16-2/c.pdf"),
        ];
        let tree = build_folder_tree(&files);

        assert_eq!(tree.len(), 1);
        let study = &tree[0].children[0];
        assert_eq!(study.name, "study-001");
        assert_eq!(study.children.len(), 2);

        let leaf = study
            .children
            .iter()
            .find(|node| node.name == "16-1")
            .unwrap();
        assert_eq!(leaf.files, vec!["a.pdf", "b.pdf"]);
        assert_eq!(leaf.path, "m5/study-001/16-1");
    }
}
