// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dossierwerk — PDF structural processing.
//
// Operates on the in-memory object graph via `lopdf`: outline injection,
// link-annotation classification and rewriting, and cover-page generation
// (`printpdf` layout with a structural post-pass).

pub mod bookmarks;
pub mod cover;
pub mod hyperlinks;
pub mod processor;

#[cfg(test)]
pub(crate) mod testpdf;

pub use bookmarks::{has_bookmarks, inject_bookmarks, remove_bookmarks};
pub use cover::{COVER_PATH, CoverPage, generate_cover};
pub use hyperlinks::{
    HyperlinkOptions, build_path_map, classify_link, extract_links, process_hyperlinks,
    relative_href,
};
pub use processor::{ProcessOptions, ProcessOutcome, process_document};
