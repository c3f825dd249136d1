// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF outline (bookmark) injection at the object level using `lopdf`.
//
// Builds the /Outlines dictionary tree from a nested entry list. Invalid
// page targets are dropped with a warning rather than failing the run —
// reviewers fix bad bookmarks after export, not before.

use lopdf::{Document, Object, ObjectId, dictionary};
use tracing::{debug, instrument, warn};

use dossierwerk_core::types::{BookmarkEntry, BookmarkInjection};

/// Inject an outline tree into `doc`, replacing any existing outline.
///
/// Page numbers are 1-based and validated against the page count; entries
/// outside `[1, page_count]` are dropped together with their subtree and
/// recorded as warnings. A document with no pages yields `success == false`
/// with an explicit error — the caller decides whether that sinks the
/// wider operation.
#[instrument(skip_all, fields(entries = entries.len()))]
pub fn inject_bookmarks(doc: &mut Document, entries: &[BookmarkEntry]) -> BookmarkInjection {
    let pages = doc.get_pages();
    let page_count = pages.len() as u32;

    if page_count == 0 {
        return BookmarkInjection {
            success: false,
            bookmark_count: 0,
            max_depth: 0,
            warnings: Vec::new(),
            error: Some("document has no pages".to_string()),
        };
    }

    let mut warnings = Vec::new();
    if remove_outline(doc) {
        warnings.push("replaced existing bookmarks".to_string());
    }

    let pruned = prune_invalid(entries, page_count, &mut warnings);
    if pruned.is_empty() {
        debug!("no valid bookmark entries to inject");
        return BookmarkInjection {
            success: true,
            bookmark_count: 0,
            max_depth: 0,
            warnings,
            error: None,
        };
    }

    let outlines_id = doc.new_object_id();
    let (first, last, visible, total) = build_level(doc, &pruned, outlines_id, &pages);

    doc.objects.insert(
        outlines_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => Object::Reference(first),
            "Last" => Object::Reference(last),
            "Count" => i64::from(visible),
        }),
    );

    if let Err(err) = attach_to_catalog(doc, outlines_id) {
        warn!(%err, "failed to attach outline to catalog");
        return BookmarkInjection {
            success: false,
            bookmark_count: 0,
            max_depth: 0,
            warnings,
            error: Some(err),
        };
    }

    let max_depth = depth_of(&pruned);
    debug!(bookmarks = total, max_depth, "outline injected");

    BookmarkInjection {
        success: true,
        bookmark_count: total,
        max_depth,
        warnings,
        error: None,
    }
}

/// Remove the document outline outright. Returns whether one existed.
pub fn remove_bookmarks(doc: &mut Document) -> bool {
    remove_outline(doc)
}

/// Whether the document currently carries an outline.
pub fn has_bookmarks(doc: &Document) -> bool {
    doc.catalog()
        .map(|catalog| catalog.has(b"Outlines"))
        .unwrap_or(false)
}

// -- Internals ----------------------------------------------------------------

fn remove_outline(doc: &mut Document) -> bool {
    let Ok(catalog_id) = catalog_id(doc) else {
        return false;
    };
    if let Ok(Object::Dictionary(catalog)) = doc.get_object_mut(catalog_id) {
        catalog.remove(b"Outlines").is_some()
    } else {
        false
    }
}

fn catalog_id(doc: &Document) -> Result<ObjectId, String> {
    doc.trailer
        .get(b"Root")
        .map_err(|err| format!("trailer has no /Root: {err}"))?
        .as_reference()
        .map_err(|err| format!("/Root is not a reference: {err}"))
}

fn attach_to_catalog(doc: &mut Document, outlines_id: ObjectId) -> Result<(), String> {
    let catalog_id = catalog_id(doc)?;
    match doc.get_object_mut(catalog_id) {
        Ok(Object::Dictionary(catalog)) => {
            catalog.set("Outlines", Object::Reference(outlines_id));
            // Open the bookmark panel by default; reviewers navigate
            // submissions through the outline.
            catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));
            Ok(())
        }
        _ => Err("catalog is not a dictionary".to_string()),
    }
}

/// Drop entries whose page target is outside `[1, page_count]`, subtree
/// included, appending one warning per dropped entry.
fn prune_invalid(
    entries: &[BookmarkEntry],
    page_count: u32,
    warnings: &mut Vec<String>,
) -> Vec<BookmarkEntry> {
    let mut kept = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.page_number == 0 || entry.page_number > page_count {
            warnings.push(format!(
                "bookmark '{}' targets page {} outside 1..={}, dropped",
                entry.title, entry.page_number, page_count
            ));
            continue;
        }
        let mut cleaned = entry.clone();
        cleaned.children = prune_invalid(&entry.children, page_count, warnings);
        kept.push(cleaned);
    }
    kept
}

fn depth_of(entries: &[BookmarkEntry]) -> u32 {
    entries
        .iter()
        .map(|entry| 1 + depth_of(&entry.children))
        .max()
        .unwrap_or(0)
}

/// Build one outline level, returning (first id, last id, visible count,
/// total node count). Visible count feeds /Count: children of a closed
/// entry do not contribute to their ancestors' counts.
fn build_level(
    doc: &mut Document,
    entries: &[BookmarkEntry],
    parent_id: ObjectId,
    pages: &std::collections::BTreeMap<u32, ObjectId>,
) -> (ObjectId, ObjectId, u32, u32) {
    let ids: Vec<ObjectId> = entries.iter().map(|_| doc.new_object_id()).collect();

    let mut visible = 0u32;
    let mut total = 0u32;

    for (index, entry) in entries.iter().enumerate() {
        let id = ids[index];
        // Pruning guarantees the page exists.
        let page_id = pages[&entry.page_number];

        let mut item = dictionary! {
            "Title" => Object::string_literal(entry.title.as_str()),
            "Parent" => Object::Reference(parent_id),
            "Dest" => vec![Object::Reference(page_id), Object::Name(b"Fit".to_vec())],
        };
        if index > 0 {
            item.set("Prev", Object::Reference(ids[index - 1]));
        }
        if index + 1 < ids.len() {
            item.set("Next", Object::Reference(ids[index + 1]));
        }

        total += 1;
        visible += 1;

        if !entry.children.is_empty() {
            let (first, last, child_visible, child_total) =
                build_level(doc, &entry.children, id, pages);
            item.set("First", Object::Reference(first));
            item.set("Last", Object::Reference(last));
            total += child_total;
            if entry.is_open {
                item.set("Count", i64::from(child_visible));
                visible += child_visible;
            } else {
                item.set("Count", -i64::from(entry.children.len() as u32));
            }
        }

        doc.objects.insert(id, Object::Dictionary(item));
    }

    (ids[0], ids[ids.len() - 1], visible, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testpdf::blank_document;

    fn entry(title: &str, page: u32) -> BookmarkEntry {
        BookmarkEntry {
            title: title.into(),
            page_number: page,
            children: Vec::new(),
            is_open: false,
        }
    }

    #[test]
    fn out_of_range_entries_dropped_with_warnings() {
        let mut doc = blank_document(10);
        let outcome =
            inject_bookmarks(&mut doc, &[entry("a", 1), entry("b", 0), entry("c", 100)]);
        assert!(outcome.success);
        assert_eq!(outcome.bookmark_count, 1);
        assert_eq!(outcome.warnings.len(), 2);
    }

    #[test]
    fn five_entry_variant_keeps_three() {
        let mut doc = blank_document(10);
        let entries = [
            entry("a", 1),
            entry("b", 5),
            entry("c", 0),
            entry("d", 100),
            entry("e", 10),
        ];
        let outcome = inject_bookmarks(&mut doc, &entries);
        assert_eq!(outcome.bookmark_count, 3);
        assert_eq!(outcome.warnings.len(), 2);
    }

    #[test]
    fn zero_page_document_fails_explicitly() {
        let mut doc = blank_document(0);
        let outcome = inject_bookmarks(&mut doc, &[entry("a", 1)]);
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("document has no pages"));
    }

    #[test]
    fn nested_entries_count_and_depth() {
        let mut doc = blank_document(10);
        let mut root = entry("section", 1);
        root.is_open = true;
        let mut sub = entry("subsection", 2);
        sub.children.push(entry("detail", 3));
        root.children.push(sub);

        let outcome = inject_bookmarks(&mut doc, &[root]);
        assert!(outcome.success);
        assert_eq!(outcome.bookmark_count, 3);
        assert_eq!(outcome.max_depth, 3);
        assert!(has_bookmarks(&doc));
    }

    #[test]
    fn invalid_parent_drops_whole_subtree() {
        let mut doc = blank_document(5);
        let mut bad = entry("bad", 99);
        bad.children.push(entry("orphan", 1));
        let outcome = inject_bookmarks(&mut doc, &[bad, entry("good", 2)]);
        assert_eq!(outcome.bookmark_count, 1);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn reinjection_replaces_and_warns() {
        let mut doc = blank_document(5);
        let first = inject_bookmarks(&mut doc, &[entry("a", 1)]);
        assert!(first.warnings.is_empty());

        let second = inject_bookmarks(&mut doc, &[entry("b", 2)]);
        assert!(second.success);
        assert!(
            second
                .warnings
                .iter()
                .any(|warning| warning.contains("replaced existing bookmarks"))
        );
    }

    #[test]
    fn remove_reports_prior_presence() {
        let mut doc = blank_document(5);
        assert!(!remove_bookmarks(&mut doc));
        inject_bookmarks(&mut doc, &[entry("a", 1)]);
        assert!(remove_bookmarks(&mut doc));
        assert!(!has_bookmarks(&doc));
    }
}
