// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hyperlink processing — enumerate, classify, and rewrite PDF link
// annotations.
//
// Cross-document links in authored PDFs point at pre-submission paths or
// bare filenames. At export time every target must become a relative path
// inside the package, external links must be flagged or stripped, and the
// accounting invariant `updated + removed + kept == total` must hold.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tracing::{debug, instrument, warn};

use dossierwerk_core::types::{
    BrokenLink, ExtractedLink, HyperlinkReport, LinkType, PackageFile,
};

/// Options for one hyperlink processing run over a single document.
#[derive(Debug, Clone, Default)]
pub struct HyperlinkOptions {
    /// Pre-submission path (or bare filename) → package target path.
    pub path_map: HashMap<String, String>,
    /// Package directory of the document being processed; rewritten
    /// targets are made relative to it.
    pub base_dir: String,
    /// Delete `http`/`https`/`ftp` link annotations instead of flagging.
    pub remove_external: bool,
    /// Delete `mailto` link annotations instead of flagging.
    pub remove_mailto: bool,
}

/// Build the rewrite map for a manifest: each file is reachable by its
/// full source path and by its bare filename. Later files win collisions.
pub fn build_path_map(files: &[PackageFile]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for file in files {
        let source = normalize_target(&file.source_path);
        if let Some(name) = source.rsplit('/').next() {
            map.insert(name.to_string(), file.target_path.clone());
        }
        map.insert(source, file.target_path.clone());
    }
    map
}

/// Classify a link from its target fields. First match wins; a link with
/// no recognisable target keeps whatever classification it already has.
pub fn classify_link(link: &ExtractedLink) -> LinkType {
    if let Some(uri) = link.target_uri.as_deref() {
        let lower = uri.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("ftp://")
        {
            return LinkType::External;
        }
        if lower.starts_with("mailto:") {
            return LinkType::External;
        }
        let without_fragment = lower.split('#').next().unwrap_or(&lower);
        if without_fragment.ends_with(".pdf") {
            return LinkType::CrossDocument;
        }
    }
    if link.target_page.is_some() || link.target_destination.is_some() {
        return LinkType::Internal;
    }
    link.link_type
}

/// Compute a forward-slash relative path from `from_dir` to `to_path`.
pub fn relative_href(from_dir: &str, to_path: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = to_path.split('/').filter(|s| !s.is_empty()).collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::with_capacity(from.len() - common + to.len() - common);
    for _ in common..from.len() {
        parts.push("..");
    }
    parts.extend(&to[common..]);
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Enumerate every link annotation in the document.
pub fn extract_links(doc: &Document, source_file: &str) -> Vec<ExtractedLink> {
    collect_sites(doc, source_file)
        .into_iter()
        .map(|site| site.link)
        .collect()
}

/// Classify and rewrite every link annotation in `doc`.
#[instrument(skip(doc, options), fields(source_file))]
pub fn process_hyperlinks(
    doc: &mut Document,
    source_file: &str,
    options: &HyperlinkOptions,
) -> HyperlinkReport {
    let sites = collect_sites(doc, source_file);
    let mut report = HyperlinkReport {
        total_links: sites.len() as u32,
        ..Default::default()
    };

    // Decide first, mutate after: removal indexes are per-page positions
    // in the /Annots array and must be resolved against a stable snapshot.
    let mut updates: Vec<(ActionLocation, String)> = Vec::new();
    let mut removals: Vec<(u32, usize)> = Vec::new();

    for site in &sites {
        match site.link.link_type {
            LinkType::Internal => {
                report.internal_count += 1;
                report.kept_count += 1;
            }
            LinkType::Unknown => {
                report.unknown_count += 1;
                report.kept_count += 1;
            }
            LinkType::External => {
                report.external_count += 1;
                let uri = site.link.target_uri.as_deref().unwrap_or_default();
                let is_mailto = uri.to_ascii_lowercase().starts_with("mailto:");
                let remove = if is_mailto {
                    options.remove_mailto
                } else {
                    options.remove_external
                };
                if remove {
                    report.removed_count += 1;
                    removals.push((site.page_number, site.element_index));
                } else {
                    report.kept_count += 1;
                    report.external_links.push(site.link.clone());
                }
            }
            LinkType::CrossDocument => {
                report.cross_document_count += 1;
                let raw = site.link.target_uri.as_deref().unwrap_or_default();
                match resolve_target(raw, &options.path_map) {
                    Some((target_path, fragment)) => {
                        let mut href = relative_href(&options.base_dir, &target_path);
                        href.push_str(&fragment);
                        updates.push((site.action, href));
                        report.updated_count += 1;
                    }
                    None => {
                        report.kept_count += 1;
                        report.broken_links.push(BrokenLink {
                            source_file: site.link.source_file.clone(),
                            page_number: site.link.page_number,
                            target: raw.to_string(),
                            reason: "target not found in package".to_string(),
                        });
                    }
                }
            }
        }
    }

    for (location, href) in updates {
        if let Err(reason) = apply_update(doc, location, &href) {
            warn!(%reason, "failed to rewrite link target");
            report.warnings.push(reason);
        }
    }
    apply_removals(doc, &removals);

    debug!(
        total = report.total_links,
        updated = report.updated_count,
        removed = report.removed_count,
        kept = report.kept_count,
        broken = report.broken_links.len(),
        "hyperlinks processed"
    );
    report
}

// -- Annotation discovery -----------------------------------------------------

/// Where a link's action dictionary can be mutated.
#[derive(Debug, Clone, Copy)]
enum ActionLocation {
    /// /A is an indirect object of its own.
    ActionObject(ObjectId),
    /// /A lives inline in a referenced annotation dictionary.
    InAnnot(ObjectId),
    /// The whole annotation is inline in the page's /Annots array.
    Inline { page_number: u32, element: usize },
}

struct LinkSite {
    page_number: u32,
    element_index: usize,
    action: ActionLocation,
    link: ExtractedLink,
}

fn collect_sites(doc: &Document, source_file: &str) -> Vec<LinkSite> {
    let pages = doc.get_pages();
    let page_numbers: HashMap<ObjectId, u32> =
        pages.iter().map(|(number, id)| (*id, *number)).collect();

    let mut sites = Vec::new();
    for (page_number, page_id) in &pages {
        let Some(annots) = page_annotations(doc, *page_id) else {
            continue;
        };
        for (element_index, element) in annots.iter().enumerate() {
            let (annot, annot_id) = match element {
                Object::Reference(id) => match doc.get_object(*id) {
                    Ok(Object::Dictionary(dict)) => (dict, Some(*id)),
                    _ => continue,
                },
                Object::Dictionary(dict) => (dict, None),
                _ => continue,
            };
            if !is_link(annot) {
                continue;
            }

            let (mut link, action) =
                parse_annotation(doc, annot, annot_id, *page_number, element_index, source_file, &page_numbers);
            link.link_type = classify_link(&link);
            sites.push(LinkSite {
                page_number: *page_number,
                element_index,
                action,
                link,
            });
        }
    }
    sites
}

fn is_link(annot: &Dictionary) -> bool {
    matches!(annot.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Link")
}

/// Resolve the page's /Annots value, following a single indirection.
fn page_annotations(doc: &Document, page_id: ObjectId) -> Option<Vec<Object>> {
    let page = doc.get_dictionary(page_id).ok()?;
    match page.get(b"Annots").ok()? {
        Object::Array(annots) => Some(annots.clone()),
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Array(annots) => Some(annots.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn parse_annotation(
    doc: &Document,
    annot: &Dictionary,
    annot_id: Option<ObjectId>,
    page_number: u32,
    element_index: usize,
    source_file: &str,
    page_numbers: &HashMap<ObjectId, u32>,
) -> (ExtractedLink, ActionLocation) {
    let mut link = ExtractedLink {
        source_file: source_file.to_string(),
        page_number,
        target_uri: None,
        target_page: None,
        target_destination: None,
        link_type: LinkType::Unknown,
    };

    let mut action_location = match annot_id {
        Some(id) => ActionLocation::InAnnot(id),
        None => ActionLocation::Inline {
            page_number,
            element: element_index,
        },
    };

    match annot.get(b"A") {
        Ok(Object::Reference(action_id)) => {
            action_location = ActionLocation::ActionObject(*action_id);
            if let Ok(Object::Dictionary(action)) = doc.get_object(*action_id) {
                parse_action(action, &mut link, page_numbers);
            }
        }
        Ok(Object::Dictionary(action)) => parse_action(action, &mut link, page_numbers),
        _ => {
            // No action: a bare /Dest is always an in-document target.
            if let Ok(dest) = annot.get(b"Dest") {
                parse_destination(dest, &mut link, page_numbers);
            }
        }
    }

    (link, action_location)
}

fn parse_action(
    action: &Dictionary,
    link: &mut ExtractedLink,
    page_numbers: &HashMap<ObjectId, u32>,
) {
    let kind = match action.get(b"S") {
        Ok(Object::Name(name)) => name.as_slice(),
        _ => return,
    };
    match kind {
        b"URI" => {
            if let Ok(uri) = action.get(b"URI") {
                link.target_uri = object_text(uri);
            }
        }
        b"GoTo" => {
            if let Ok(dest) = action.get(b"D") {
                parse_destination(dest, link, page_numbers);
            }
        }
        b"GoToR" => {
            // Remote GoTo: the file spec is the target document.
            link.target_uri = match action.get(b"F") {
                Ok(Object::Dictionary(spec)) => spec
                    .get(b"UF")
                    .or_else(|_| spec.get(b"F"))
                    .ok()
                    .and_then(object_text),
                Ok(other) => object_text(other),
                Err(_) => None,
            };
        }
        _ => {}
    }
}

fn parse_destination(
    dest: &Object,
    link: &mut ExtractedLink,
    page_numbers: &HashMap<ObjectId, u32>,
) {
    match dest {
        Object::Array(parts) => {
            if let Some(Object::Reference(page_id)) = parts.first() {
                link.target_page = page_numbers.get(page_id).copied();
            }
        }
        Object::Name(name) => {
            link.target_destination = Some(String::from_utf8_lossy(name).into_owned());
        }
        Object::String(text, _) => {
            link.target_destination = Some(String::from_utf8_lossy(text).into_owned());
        }
        _ => {}
    }
}

fn object_text(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

// -- Target resolution --------------------------------------------------------

fn normalize_target(raw: &str) -> String {
    let forward = raw.replace('\\', "/");
    forward
        .strip_prefix("./")
        .unwrap_or(&forward)
        .to_string()
}

/// Look a cross-document target up in the path map, by full path first and
/// bare filename second. Returns the mapped package path and the original
/// `#fragment` (empty when absent).
fn resolve_target(raw: &str, path_map: &HashMap<String, String>) -> Option<(String, String)> {
    let (path_part, fragment) = match raw.split_once('#') {
        Some((path, fragment)) => (path, format!("#{fragment}")),
        None => (raw, String::new()),
    };
    let normalized = normalize_target(path_part);

    if let Some(target) = path_map.get(&normalized) {
        return Some((target.clone(), fragment));
    }
    let file_name = normalized.rsplit('/').next()?;
    path_map
        .get(file_name)
        .map(|target| (target.clone(), fragment))
}

// -- Mutation -----------------------------------------------------------------

fn apply_update(doc: &mut Document, location: ActionLocation, href: &str) -> Result<(), String> {
    match location {
        ActionLocation::ActionObject(action_id) => match doc.get_object_mut(action_id) {
            Ok(Object::Dictionary(action)) => {
                rewrite_action(action, href);
                Ok(())
            }
            _ => Err(format!("action object {action_id:?} is not a dictionary")),
        },
        ActionLocation::InAnnot(annot_id) => match doc.get_object_mut(annot_id) {
            Ok(Object::Dictionary(annot)) => {
                match annot.get_mut(b"A") {
                    Ok(Object::Dictionary(action)) => rewrite_action(action, href),
                    _ => annot.set("A", uri_action(href)),
                }
                Ok(())
            }
            _ => Err(format!("annotation {annot_id:?} is not a dictionary")),
        },
        ActionLocation::Inline {
            page_number,
            element,
        } => mutate_inline(doc, page_number, element, href),
    }
}

fn mutate_inline(
    doc: &mut Document,
    page_number: u32,
    element: usize,
    href: &str,
) -> Result<(), String> {
    let page_id = doc.get_pages()[&page_number];
    let holder = annots_holder(doc, page_id)?;
    let array = annots_array_mut(doc, page_id, holder)?;
    match array.get_mut(element) {
        Some(Object::Dictionary(annot)) => {
            match annot.get_mut(b"A") {
                Ok(Object::Dictionary(action)) => rewrite_action(action, href),
                _ => annot.set("A", uri_action(href)),
            }
            Ok(())
        }
        _ => Err(format!(
            "inline annotation {element} on page {page_number} disappeared"
        )),
    }
}

/// Rewrite an action in place. Remote GoTo actions keep their kind and get
/// a new file spec; everything else becomes a URI action.
fn rewrite_action(action: &mut Dictionary, href: &str) {
    let is_remote_goto = matches!(action.get(b"S"), Ok(Object::Name(name)) if name == b"GoToR");
    if is_remote_goto {
        action.set("F", Object::string_literal(href));
    } else {
        action.set("S", Object::Name(b"URI".to_vec()));
        action.set("URI", Object::string_literal(href));
        action.remove(b"D");
    }
}

fn uri_action(href: &str) -> Dictionary {
    dictionary! {
        "Type" => "Action",
        "S" => "URI",
        "URI" => Object::string_literal(href),
    }
}

/// Which object owns the /Annots array.
#[derive(Debug, Clone, Copy)]
enum AnnotsHolder {
    PageDict,
    ArrayObject(ObjectId),
}

fn annots_holder(doc: &Document, page_id: ObjectId) -> Result<AnnotsHolder, String> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|err| format!("page {page_id:?}: {err}"))?;
    match page.get(b"Annots") {
        Ok(Object::Array(_)) => Ok(AnnotsHolder::PageDict),
        Ok(Object::Reference(id)) => Ok(AnnotsHolder::ArrayObject(*id)),
        _ => Err(format!("page {page_id:?} has no /Annots")),
    }
}

fn annots_array_mut<'doc>(
    doc: &'doc mut Document,
    page_id: ObjectId,
    holder: AnnotsHolder,
) -> Result<&'doc mut Vec<Object>, String> {
    let target = match holder {
        AnnotsHolder::PageDict => doc
            .get_object_mut(page_id)
            .map_err(|err| format!("page {page_id:?}: {err}"))?,
        AnnotsHolder::ArrayObject(id) => doc
            .get_object_mut(id)
            .map_err(|err| format!("annots array {id:?}: {err}"))?,
    };
    match target {
        Object::Dictionary(page) => match page.get_mut(b"Annots") {
            Ok(Object::Array(annots)) => Ok(annots),
            _ => Err(format!("page {page_id:?} /Annots is not an array")),
        },
        Object::Array(annots) => Ok(annots),
        _ => Err(format!("unexpected /Annots holder for page {page_id:?}")),
    }
}

fn apply_removals(doc: &mut Document, removals: &[(u32, usize)]) {
    let mut by_page: HashMap<u32, Vec<usize>> = HashMap::new();
    for (page_number, element) in removals {
        by_page.entry(*page_number).or_default().push(*element);
    }

    for (page_number, elements) in by_page {
        let page_id = doc.get_pages()[&page_number];
        let Ok(holder) = annots_holder(doc, page_id) else {
            continue;
        };
        if let Ok(array) = annots_array_mut(doc, page_id, holder) {
            let mut index = 0usize;
            array.retain(|_| {
                let keep = !elements.contains(&index);
                index += 1;
                keep
            });
        }
    }
}
