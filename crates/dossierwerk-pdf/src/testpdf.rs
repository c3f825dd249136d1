// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test fixtures: minimal in-memory PDF documents built object by object.

use lopdf::{Document, Object, dictionary};

/// A letter-sized document with `page_count` empty pages and a valid
/// catalog/page-tree, enough structure for outline and annotation surgery.
pub fn blank_document(page_count: usize) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (0..page_count)
        .map(|_| {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            Object::Reference(page_id)
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Attach a URI link annotation to a 1-based page.
pub fn add_uri_link(doc: &mut Document, page_number: u32, uri: &str) {
    let action = dictionary! {
        "Type" => "Action",
        "S" => "URI",
        "URI" => Object::string_literal(uri),
    };
    let annot_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => vec![72.into(), 72.into(), 200.into(), 84.into()],
        "Border" => vec![0.into(), 0.into(), 0.into()],
        "A" => action,
    });
    push_annotation(doc, page_number, annot_id);
}

/// Attach a GoTo link annotation targeting a 1-based page of the same
/// document.
pub fn add_goto_link(doc: &mut Document, page_number: u32, target_page: u32) {
    let target_id = doc.get_pages()[&target_page];
    let annot_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => vec![72.into(), 100.into(), 200.into(), 112.into()],
        "Dest" => vec![Object::Reference(target_id), Object::Name(b"Fit".to_vec())],
    });
    push_annotation(doc, page_number, annot_id);
}

fn push_annotation(doc: &mut Document, page_number: u32, annot_id: lopdf::ObjectId) {
    let page_id = doc.get_pages()[&page_number];
    if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
        match page.get_mut(b"Annots") {
            Ok(Object::Array(annots)) => annots.push(Object::Reference(annot_id)),
            _ => page.set("Annots", vec![Object::Reference(annot_id)]),
        }
    }
}
