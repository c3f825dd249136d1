// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dossierwerk — eCTD XML backbone generation.
//
// Leaf entries (checksum-backed `<leaf>` elements), the `index.xml`
// backbone, the FDA `us-regional.xml`, and sequence-number helpers.

pub mod index_xml;
pub mod leaf;
pub mod regional_xml;
pub mod sequence;

pub use index_xml::{IndexParams, render_index_xml};
pub use leaf::{LeafOptions, build_leaf_entries};
pub use regional_xml::render_regional_xml;
pub use sequence::{format_sequence_number, next_sequence, sequence_info, submission_type};
