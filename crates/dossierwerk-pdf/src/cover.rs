// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cover page generation — a front-matter table of contents for the package.
//
// Layout is produced with `printpdf` 0.8 (data-oriented `Op` lists); link
// annotations and the outline are then injected with `lopdf`, because
// the cover must carry the same structural machinery the rest of the
// package gets.

use lopdf::{Document, Object, dictionary};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, TextItem,
};
use tracing::{debug, info, instrument};

use dossierwerk_core::error::{DossierError, Result};
use dossierwerk_core::paths::compare_node_codes;
use dossierwerk_core::types::{BookmarkEntry, BookmarkInjection, PackageManifest};

use crate::bookmarks::inject_bookmarks;
use crate::hyperlinks::relative_href;

/// Fixed location of the cover page inside the package.
pub const COVER_PATH: &str = "m1/us/cover.pdf";

/// Directory portion of [`COVER_PATH`]; link targets are made relative
/// to it.
pub const COVER_DIR: &str = "m1/us";

// US Letter in millimetres.
const PAGE_W_MM: f32 = 215.9;
const PAGE_H_MM: f32 = 279.4;
const MARGIN_MM: f32 = 20.0;
const FONT_SIZE_PT: f32 = 10.0;
const TITLE_SIZE_PT: f32 = 16.0;
const LINE_HEIGHT_PT: f32 = 14.0;
const INDENT_MM: f32 = 6.0;

/// One table-of-contents line.
#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    /// "16.2.1  Listing of Adverse Events".
    pub label: String,
    /// Dotted-code segment count minus one.
    pub level: u32,
    pub node_code: String,
    pub target_path: String,
}

/// Result of cover generation: the finished PDF plus its outline.
#[derive(Debug)]
pub struct CoverPage {
    pub bytes: Vec<u8>,
    pub toc: Vec<TocEntry>,
    /// The nested outline mirrored from the TOC, as injected.
    pub outline: Vec<BookmarkEntry>,
    pub bookmarks: BookmarkInjection,
}

/// Build the TOC line per manifest file, numerically ordered.
pub fn build_toc(manifest: &PackageManifest) -> Vec<TocEntry> {
    let mut entries: Vec<TocEntry> = manifest
        .files
        .iter()
        .map(|file| TocEntry {
            label: format!("{}  {}", file.node_code, file.node_title),
            level: file.node_code.split('.').count().saturating_sub(1) as u32,
            node_code: file.node_code.clone(),
            target_path: file.target_path.clone(),
        })
        .collect();
    entries.sort_by(|a, b| compare_node_codes(&a.node_code, &b.node_code));
    entries
}

/// Render the cover page for a manifest.
///
/// An empty manifest still produces a valid, link-free page — the cover
/// is part of the package skeleton, not of its content.
#[instrument(skip(manifest), fields(files = manifest.files.len()))]
pub fn generate_cover(manifest: &PackageManifest) -> Result<CoverPage> {
    let toc = build_toc(manifest);
    info!(entries = toc.len(), "generating cover page");

    let (bytes, placements) = layout_pages(manifest, &toc);
    let mut doc = Document::load_mem(&bytes)
        .map_err(|err| DossierError::Pdf(format!("generated cover failed to reload: {err}")))?;

    attach_links(&mut doc, &placements)?;
    let outline = toc_bookmarks(&toc, &placements);
    let bookmarks = inject_bookmarks(&mut doc, &outline);

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|err| DossierError::Pdf(format!("failed to serialise cover: {err}")))?;

    debug!(
        output_bytes = output.len(),
        links = placements.len(),
        "cover page complete"
    );
    Ok(CoverPage {
        bytes: output,
        toc,
        outline,
        bookmarks,
    })
}

// -- Layout -------------------------------------------------------------------

/// Where one TOC line landed: 1-based page, text box in PDF points.
struct Placement {
    page_number: u32,
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    href: String,
}

fn layout_pages(manifest: &PackageManifest, toc: &[TocEntry]) -> (Vec<u8>, Vec<Placement>) {
    let page_w = Mm(PAGE_W_MM);
    let page_h = Mm(PAGE_H_MM);
    let page_h_pt = page_h.into_pt().0;
    let margin_pt = Mm(MARGIN_MM).into_pt().0;
    let bottom_pt = margin_pt;

    let mut doc = PdfDocument::new("Submission Table of Contents");
    let mut pages: Vec<PdfPage> = Vec::new();
    let mut ops: Vec<Op> = Vec::new();
    let mut placements: Vec<Placement> = Vec::new();

    let mut y_pt = page_h_pt - margin_pt;

    // Header block, first page only.
    write_line(
        &mut ops,
        margin_pt,
        y_pt,
        TITLE_SIZE_PT,
        BuiltinFont::HelveticaBold,
        "Table of Contents",
    );
    y_pt -= 2.0 * LINE_HEIGHT_PT;
    write_line(
        &mut ops,
        margin_pt,
        y_pt,
        FONT_SIZE_PT,
        BuiltinFont::Helvetica,
        &format!("Study {}", manifest.study_number),
    );
    y_pt -= LINE_HEIGHT_PT;
    write_line(
        &mut ops,
        margin_pt,
        y_pt,
        FONT_SIZE_PT,
        BuiltinFont::Helvetica,
        &format!("Generated {}", manifest.generated_at.format("%Y-%m-%d")),
    );
    y_pt -= 2.0 * LINE_HEIGHT_PT;

    if toc.is_empty() {
        write_line(
            &mut ops,
            margin_pt,
            y_pt,
            FONT_SIZE_PT,
            BuiltinFont::Helvetica,
            "No documents in this package.",
        );
    }

    for entry in toc {
        if y_pt < bottom_pt + LINE_HEIGHT_PT {
            pages.push(PdfPage::new(page_w, page_h, std::mem::take(&mut ops)));
            y_pt = page_h_pt - margin_pt;
        }

        let x_pt = margin_pt + Mm(entry.level as f32 * INDENT_MM).into_pt().0;
        write_line(
            &mut ops,
            x_pt,
            y_pt,
            FONT_SIZE_PT,
            BuiltinFont::Helvetica,
            &entry.label,
        );

        // Helvetica averages roughly half the font size per glyph.
        let text_width_pt = entry.label.len() as f32 * 0.5 * FONT_SIZE_PT;
        placements.push(Placement {
            page_number: pages.len() as u32 + 1,
            x0: x_pt,
            y0: y_pt - 3.0,
            x1: x_pt + text_width_pt,
            y1: y_pt + FONT_SIZE_PT,
            href: relative_href(COVER_DIR, &entry.target_path),
        });

        y_pt -= LINE_HEIGHT_PT;
    }

    pages.push(PdfPage::new(page_w, page_h, ops));
    doc.with_pages(pages);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    (bytes, placements)
}

fn write_line(ops: &mut Vec<Op>, x_pt: f32, y_pt: f32, size_pt: f32, font: BuiltinFont, text: &str) {
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: Pt(x_pt),
            y: Pt(y_pt),
        },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(size_pt),
        font,
    });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(text.to_string())],
        font,
    });
    ops.push(Op::EndTextSection);
}

// -- Structural post-pass -----------------------------------------------------

fn attach_links(doc: &mut Document, placements: &[Placement]) -> Result<()> {
    let pages = doc.get_pages();
    for placement in placements {
        let page_id = *pages.get(&placement.page_number).ok_or_else(|| {
            DossierError::Pdf(format!(
                "cover page {} missing after layout",
                placement.page_number
            ))
        })?;

        let action = dictionary! {
            "Type" => "Action",
            "S" => "URI",
            "URI" => Object::string_literal(placement.href.as_str()),
        };
        let annot_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => vec![
                placement.x0.into(),
                placement.y0.into(),
                placement.x1.into(),
                placement.y1.into(),
            ],
            "Border" => vec![0.into(), 0.into(), 0.into()],
            "A" => action,
        });

        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
            match page.get_mut(b"Annots") {
                Ok(Object::Array(annots)) => annots.push(Object::Reference(annot_id)),
                _ => page.set("Annots", vec![Object::Reference(annot_id)]),
            }
        }
    }
    Ok(())
}

/// Mirror the TOC as a nested outline: deeper levels fold under the
/// nearest preceding shallower entry.
fn toc_bookmarks(toc: &[TocEntry], placements: &[Placement]) -> Vec<BookmarkEntry> {
    let mut roots: Vec<BookmarkEntry> = Vec::new();
    // (level, child index path) stack, rebuilt entry by entry.
    let mut stack: Vec<(u32, usize)> = Vec::new();

    for (index, entry) in toc.iter().enumerate() {
        let bookmark = BookmarkEntry {
            title: entry.label.clone(),
            page_number: placements
                .get(index)
                .map(|p| p.page_number)
                .unwrap_or(1),
            children: Vec::new(),
            is_open: true,
        };

        while let Some((level, _)) = stack.last() {
            if *level >= entry.level {
                stack.pop();
            } else {
                break;
            }
        }

        let siblings = {
            let mut current = &mut roots;
            for (_, child_index) in &stack {
                current = &mut current[*child_index].children;
            }
            current
        };
        siblings.push(bookmark);
        stack.push((entry.level, siblings.len() - 1));
    }

    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dossierwerk_core::types::{PackageFile, ReadinessCheck};
    use uuid::Uuid;

    fn manifest_with(codes: &[(&str, &str)]) -> PackageManifest {
        let files = codes
            .iter()
            .map(|(code, title)| PackageFile {
                source_document_id: Uuid::new_v4(),
                source_path: format!("uploads/{code}.pdf"),
                target_path: format!("m5/study-001/{}/doc.pdf", code.replace('.', "-")),
                node_code: (*code).to_string(),
                node_title: (*title).to_string(),
                file_name: "doc.pdf".into(),
                version: 1,
                file_size: 100,
                page_count: Some(1),
            })
            .collect();
        PackageManifest {
            study_id: Uuid::new_v4(),
            study_number: "STUDY-001".into(),
            generated_at: Utc::now(),
            files,
            folder_structure: Vec::new(),
            readiness: ReadinessCheck {
                ready: true,
                missing_required: Vec::new(),
                pending_approval: Vec::new(),
                validation_errors: 0,
                unresolved_annotations: 0,
                total_files: codes.len() as u32,
                total_required_nodes: 0,
            },
        }
    }

    #[test]
    fn toc_levels_follow_code_depth() {
        let manifest = manifest_with(&[("16", "Appendices"), ("16.2", "Listings"), ("16.2.1", "AE Listing")]);
        let toc = build_toc(&manifest);
        let levels: Vec<u32> = toc.iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![0, 1, 2]);
    }

    #[test]
    fn toc_is_numerically_sorted() {
        let manifest = manifest_with(&[("16.10", "J"), ("16.2", "B"), ("16.1", "A")]);
        let toc = build_toc(&manifest);
        let codes: Vec<&str> = toc.iter().map(|e| e.node_code.as_str()).collect();
        assert_eq!(codes, vec!["16.1", "16.2", "16.10"]);
    }

    #[test]
    fn cover_links_are_relative_to_cover_dir() {
        let manifest = manifest_with(&[("16.1", "Protocol")]);
        let cover = generate_cover(&manifest).unwrap();
        let doc = Document::load_mem(&cover.bytes).unwrap();
        let links = crate::hyperlinks::extract_links(&doc, COVER_PATH);
        assert_eq!(links.len(), 1);
        assert_eq!(
            links[0].target_uri.as_deref(),
            Some("../../m5/study-001/16-1/doc.pdf")
        );
    }

    #[test]
    fn cover_carries_mirrored_bookmarks() {
        let manifest = manifest_with(&[("16", "Appendices"), ("16.1", "Protocol")]);
        let cover = generate_cover(&manifest).unwrap();
        assert!(cover.bookmarks.success);
        assert_eq!(cover.bookmarks.bookmark_count, 2);
        assert_eq!(cover.bookmarks.max_depth, 2);
    }

    #[test]
    fn empty_manifest_yields_linkless_page() {
        let manifest = manifest_with(&[]);
        let cover = generate_cover(&manifest).unwrap();
        let doc = Document::load_mem(&cover.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert!(crate::hyperlinks::extract_links(&doc, COVER_PATH).is_empty());
        assert!(cover.bookmarks.success);
        assert_eq!(cover.bookmarks.bookmark_count, 0);
    }
}
