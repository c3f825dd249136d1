// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Combined PDF processing — one entry point that runs bookmark injection
// and hyperlink rewriting over a document in memory.

use lopdf::Document;
use tracing::{debug, info, instrument};

use dossierwerk_core::error::{DossierError, Result};
use dossierwerk_core::types::{BookmarkEntry, BookmarkInjection, HyperlinkReport};

use crate::bookmarks;
use crate::hyperlinks::{self, HyperlinkOptions};

/// What to do to one document during export.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Outline to inject; `None` leaves any existing outline alone.
    pub bookmarks: Option<Vec<BookmarkEntry>>,
    /// Remove the outline outright instead of injecting.
    pub strip_bookmarks: bool,
    /// Hyperlink rewrite configuration.
    pub hyperlinks: Option<HyperlinkOptions>,
    /// Master switch: hyperlink processing can be disabled even when
    /// options are present.
    pub process_hyperlinks: bool,
}

/// Outcome of one combined processing run.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutcome {
    pub bookmarks: Option<BookmarkInjection>,
    pub hyperlinks: Option<HyperlinkReport>,
    /// Warnings from both phases, merged in phase order.
    pub warnings: Vec<String>,
}

/// Run the requested phases over `bytes` and return the re-serialized
/// document with the outcome.
///
/// A bookmark phase that fails (for instance on a zero-page document)
/// does not fail the overall operation: the failure is captured in the
/// outcome and the caller decides what it means.
#[instrument(skip(bytes, options), fields(source_file, bytes_len = bytes.len()))]
pub fn process_document(
    bytes: &[u8],
    source_file: &str,
    options: &ProcessOptions,
) -> Result<(Vec<u8>, ProcessOutcome)> {
    let mut doc = Document::load_mem(bytes)
        .map_err(|err| DossierError::Pdf(format!("failed to load {source_file}: {err}")))?;

    let mut outcome = ProcessOutcome::default();

    if options.strip_bookmarks {
        let removed = bookmarks::remove_bookmarks(&mut doc);
        debug!(removed, "outline strip requested");
    } else if let Some(entries) = &options.bookmarks {
        let injection = bookmarks::inject_bookmarks(&mut doc, entries);
        outcome.warnings.extend(injection.warnings.iter().cloned());
        outcome.bookmarks = Some(injection);
    }

    if options.process_hyperlinks {
        if let Some(link_options) = &options.hyperlinks {
            let report = hyperlinks::process_hyperlinks(&mut doc, source_file, link_options);
            outcome.warnings.extend(report.warnings.iter().cloned());
            outcome.hyperlinks = Some(report);
        }
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|err| DossierError::Pdf(format!("failed to serialise {source_file}: {err}")))?;

    info!(
        output_bytes = output.len(),
        bookmark_phase = outcome.bookmarks.is_some(),
        hyperlink_phase = outcome.hyperlinks.is_some(),
        "document processed"
    );
    Ok((output, outcome))
}
