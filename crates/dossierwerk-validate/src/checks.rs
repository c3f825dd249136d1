// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-file checks — pure pass/fail logic over one packaged PDF.
//
// Checks never decide severity; the rule registry does. The document is
// parsed once by the validator and shared across all checks through the
// context.

use lopdf::{Dictionary, Document, Object};
use serde_json::json;

use dossierwerk_core::types::{LinkType, PackageFile};
use dossierwerk_pdf::extract_links;

/// Submission size ceiling per file.
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// PDF versions agencies accept.
const ALLOWED_PDF_VERSIONS: &[&str] = &["1.4", "1.5", "1.6", "1.7"];

/// Deepest outline level reviewers tolerate.
const MAX_BOOKMARK_DEPTH: u32 = 4;

/// Longest permitted file name, extension included.
const MAX_FILE_NAME_LEN: usize = 64;

/// The base-14 fonts every reader ships; these need no embedding.
const STANDARD_FONTS: &[&[u8]] = &[
    b"Helvetica",
    b"Helvetica-Bold",
    b"Helvetica-Oblique",
    b"Helvetica-BoldOblique",
    b"Courier",
    b"Courier-Bold",
    b"Courier-Oblique",
    b"Courier-BoldOblique",
    b"Times-Roman",
    b"Times-Bold",
    b"Times-Italic",
    b"Times-BoldItalic",
    b"Symbol",
    b"ZapfDingbats",
];

/// Everything a per-file check may look at.
pub struct FileCheckContext<'a> {
    pub file: &'a PackageFile,
    pub bytes: &'a [u8],
    /// `None` when the bytes did not parse as a PDF.
    pub document: Option<&'a Document>,
}

/// Outcome of one check: pass/fail plus a human message.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub passed: bool,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl CheckOutcome {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

pub type FileCheck = fn(&FileCheckContext<'_>) -> CheckOutcome;

/// The per-file check registry, keyed by rule name.
pub fn file_checks() -> Vec<(&'static str, FileCheck)> {
    vec![
        ("file-size-limit", check_file_size),
        ("pdf-parseable", check_pdf_parseable),
        ("pdf-version", check_pdf_version),
        ("pdf-not-encrypted", check_not_encrypted),
        ("pdf-fonts-embedded", check_fonts_embedded),
        ("pdfa-marker", check_pdfa_marker),
        ("pdf-bookmarks", check_bookmarks),
        ("ectd-file-naming", check_file_naming),
        ("page-size", check_page_size),
        ("external-hyperlinks", check_external_hyperlinks),
        ("no-javascript", check_no_javascript),
    ]
}

// -- Checks -------------------------------------------------------------------

fn check_file_size(ctx: &FileCheckContext<'_>) -> CheckOutcome {
    let size = ctx.bytes.len() as u64;
    if size <= MAX_FILE_SIZE {
        CheckOutcome::pass(format!("{size} bytes"))
    } else {
        CheckOutcome::fail(format!(
            "{size} bytes exceeds the {MAX_FILE_SIZE} byte ceiling"
        ))
        .with_details(json!({ "size": size, "limit": MAX_FILE_SIZE }))
    }
}

fn check_pdf_parseable(ctx: &FileCheckContext<'_>) -> CheckOutcome {
    if !ctx.bytes.starts_with(b"%PDF-") {
        return CheckOutcome::fail("missing %PDF- header");
    }
    match ctx.document {
        Some(_) => CheckOutcome::pass("parses as PDF"),
        None => CheckOutcome::fail("file has a PDF header but does not parse; it may be corrupt"),
    }
}

fn check_pdf_version(ctx: &FileCheckContext<'_>) -> CheckOutcome {
    let Some(version) = header_version(ctx.bytes) else {
        return CheckOutcome::fail("no PDF version in header");
    };
    if ALLOWED_PDF_VERSIONS.contains(&version.as_str()) {
        CheckOutcome::pass(format!("PDF {version}"))
    } else {
        CheckOutcome::fail(format!(
            "PDF {version} is outside the accepted range 1.4-1.7"
        ))
        .with_details(json!({ "version": version }))
    }
}

fn header_version(bytes: &[u8]) -> Option<String> {
    let header = bytes.get(..16)?;
    let text = std::str::from_utf8(header).ok()?;
    let version = text.strip_prefix("%PDF-")?;
    let end = version
        .find(|c: char| c != '.' && !c.is_ascii_digit())
        .unwrap_or(version.len());
    Some(version[..end].to_string())
}

fn check_not_encrypted(ctx: &FileCheckContext<'_>) -> CheckOutcome {
    let Some(doc) = ctx.document else {
        return CheckOutcome::fail("unparseable document cannot be checked for encryption");
    };
    if doc.trailer.has(b"Encrypt") {
        CheckOutcome::fail("document is encrypted")
    } else {
        CheckOutcome::pass("not encrypted")
    }
}

fn check_fonts_embedded(ctx: &FileCheckContext<'_>) -> CheckOutcome {
    let Some(doc) = ctx.document else {
        return CheckOutcome::fail("unparseable document cannot be checked for fonts");
    };

    let mut missing: Vec<String> = Vec::new();
    for object in doc.objects.values() {
        let Ok(dict) = object.as_dict() else { continue };
        if !matches!(dict.get(b"Type"), Ok(Object::Name(name)) if name == b"Font") {
            continue;
        }

        let base_font = match dict.get(b"BaseFont") {
            Ok(Object::Name(name)) => name.clone(),
            _ => Vec::new(),
        };
        if STANDARD_FONTS.contains(&base_font.as_slice()) {
            continue;
        }
        if !font_is_embedded(doc, dict) {
            missing.push(String::from_utf8_lossy(&base_font).into_owned());
        }
    }

    if missing.is_empty() {
        CheckOutcome::pass("all non-standard fonts embedded")
    } else {
        CheckOutcome::fail(format!("fonts not embedded: {}", missing.join(", ")))
            .with_details(json!({ "fonts": missing }))
    }
}

/// A font counts as embedded when its descriptor carries a font file
/// stream. Composite (Type0) fonts delegate to their descendants.
fn font_is_embedded(doc: &Document, font: &Dictionary) -> bool {
    if let Ok(descendants) = font.get(b"DescendantFonts") {
        let descendants = resolve(doc, descendants);
        if let Some(Object::Array(items)) = descendants {
            return items.iter().any(|item| {
                matches!(resolve(doc, item), Some(Object::Dictionary(child)) if font_is_embedded(doc, child))
            });
        }
    }

    let Some(Object::Dictionary(descriptor)) =
        font.get(b"FontDescriptor").ok().and_then(|d| resolve(doc, d))
    else {
        return false;
    };
    descriptor.has(b"FontFile") || descriptor.has(b"FontFile2") || descriptor.has(b"FontFile3")
}

fn resolve<'doc>(doc: &'doc Document, object: &'doc Object) -> Option<&'doc Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn check_pdfa_marker(ctx: &FileCheckContext<'_>) -> CheckOutcome {
    let Some(doc) = ctx.document else {
        return CheckOutcome::fail("unparseable document cannot be checked for PDF/A markers");
    };

    let has_output_intent = doc
        .catalog()
        .map(|catalog| catalog.has(b"OutputIntents"))
        .unwrap_or(false);
    let has_xmp_marker = doc.objects.values().any(|object| {
        matches!(object, Object::Stream(stream)
            if stream.content.windows(6).any(|window| window == b"pdfaid"))
    });

    if has_output_intent || has_xmp_marker {
        CheckOutcome::pass("PDF/A marker present")
    } else {
        CheckOutcome::fail("no PDF/A marker found")
    }
}

fn check_bookmarks(ctx: &FileCheckContext<'_>) -> CheckOutcome {
    let Some(doc) = ctx.document else {
        return CheckOutcome::fail("unparseable document cannot be checked for bookmarks");
    };

    let outlines = doc
        .catalog()
        .ok()
        .and_then(|catalog| catalog.get(b"Outlines").ok())
        .and_then(|obj| resolve(doc, obj));
    let Some(Object::Dictionary(outlines)) = outlines else {
        return CheckOutcome::fail("document has no bookmarks");
    };

    let depth = outline_depth(doc, outlines, 0);
    if depth > MAX_BOOKMARK_DEPTH {
        CheckOutcome::fail(format!(
            "bookmark depth {depth} exceeds the maximum of {MAX_BOOKMARK_DEPTH}"
        ))
        .with_details(json!({ "depth": depth }))
    } else {
        CheckOutcome::pass(format!("bookmarks present, depth {depth}"))
    }
}

/// Walk First/Next sibling chains. Depth is bounded to keep malformed
/// circular outlines from hanging the validator.
fn outline_depth(doc: &Document, node: &Dictionary, depth: u32) -> u32 {
    if depth > 32 {
        return depth;
    }
    let mut max_depth = depth;
    let mut child = node.get(b"First").ok().and_then(|obj| resolve(doc, obj));
    let mut hops = 0u32;
    while let Some(Object::Dictionary(item)) = child {
        max_depth = max_depth.max(outline_depth(doc, item, depth + 1));
        child = item.get(b"Next").ok().and_then(|obj| resolve(doc, obj));
        hops += 1;
        if hops > 4096 {
            break;
        }
    }
    max_depth
}

fn check_file_naming(ctx: &FileCheckContext<'_>) -> CheckOutcome {
    let name = ctx
        .file
        .target_path
        .rsplit('/')
        .next()
        .unwrap_or(&ctx.file.target_path);

    if name.len() > MAX_FILE_NAME_LEN {
        return CheckOutcome::fail(format!(
            "file name is {} chars, maximum is {MAX_FILE_NAME_LEN}",
            name.len()
        ));
    }
    if !name.ends_with(".pdf") {
        return CheckOutcome::fail("file name must end in .pdf");
    }
    let stem = &name[..name.len() - 4];
    let valid = !stem.is_empty()
        && stem
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        CheckOutcome::pass("file name is eCTD-safe")
    } else {
        CheckOutcome::fail(format!("file name '{name}' contains disallowed characters"))
    }
}

fn check_page_size(ctx: &FileCheckContext<'_>) -> CheckOutcome {
    let Some(doc) = ctx.document else {
        return CheckOutcome::fail("unparseable document cannot be checked for page size");
    };

    // Letter and A4 in PDF points, with a small tolerance for scanners.
    const ALLOWED: &[(f32, f32)] = &[(612.0, 792.0), (595.3, 841.9)];
    const TOLERANCE: f32 = 5.0;

    let mut offending: Vec<u32> = Vec::new();
    for (page_number, page_id) in doc.get_pages() {
        let Some(media_box) = media_box_for(doc, page_id) else {
            offending.push(page_number);
            continue;
        };
        let ok = ALLOWED.iter().any(|(w, h)| {
            (media_box.0 - w).abs() <= TOLERANCE && (media_box.1 - h).abs() <= TOLERANCE
        });
        if !ok {
            offending.push(page_number);
        }
    }

    if offending.is_empty() {
        CheckOutcome::pass("all pages Letter or A4")
    } else {
        CheckOutcome::fail(format!(
            "{} page(s) outside Letter/A4: {:?}",
            offending.len(),
            &offending[..offending.len().min(10)]
        ))
        .with_details(json!({ "pages": offending }))
    }
}

/// Width and height from the page's /MediaBox, following /Parent
/// inheritance.
fn media_box_for(doc: &Document, page_id: lopdf::ObjectId) -> Option<(f32, f32)> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..8 {
        if let Some(Object::Array(corners)) = current.get(b"MediaBox").ok().and_then(|obj| resolve(doc, obj))
        {
            let values: Vec<f32> = corners.iter().filter_map(number).collect();
            if values.len() == 4 {
                return Some((values[2] - values[0], values[3] - values[1]));
            }
            return None;
        }
        current = match current.get(b"Parent").ok().and_then(|obj| resolve(doc, obj)) {
            Some(Object::Dictionary(parent)) => parent,
            _ => return None,
        };
    }
    None
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn check_external_hyperlinks(ctx: &FileCheckContext<'_>) -> CheckOutcome {
    let Some(doc) = ctx.document else {
        return CheckOutcome::fail("unparseable document cannot be checked for hyperlinks");
    };

    let external: Vec<String> = extract_links(doc, &ctx.file.target_path)
        .into_iter()
        .filter(|link| link.link_type == LinkType::External)
        .filter_map(|link| link.target_uri)
        .collect();

    if external.is_empty() {
        CheckOutcome::pass("no external hyperlinks")
    } else {
        CheckOutcome::fail(format!("{} external hyperlink(s)", external.len()))
            .with_details(json!({ "targets": external }))
    }
}

fn check_no_javascript(ctx: &FileCheckContext<'_>) -> CheckOutcome {
    let Some(doc) = ctx.document else {
        return CheckOutcome::fail("unparseable document cannot be checked for JavaScript");
    };

    let has_js = doc.objects.values().any(|object| {
        object.as_dict().is_ok_and(|dict| {
            if dict.has(b"JS") || dict.has(b"JavaScript") {
                return true;
            }
            matches!(dict.get(b"S"), Ok(Object::Name(name)) if name == b"JavaScript")
        })
    });
    let has_open_action = doc
        .catalog()
        .map(|catalog| catalog.has(b"OpenAction") || catalog.has(b"AA"))
        .unwrap_or(false);

    match (has_js, has_open_action) {
        (false, false) => CheckOutcome::pass("no JavaScript or open actions"),
        (true, _) => CheckOutcome::fail("document contains JavaScript"),
        (false, true) => CheckOutcome::fail("document carries an OpenAction or AA entry"),
    }
}
