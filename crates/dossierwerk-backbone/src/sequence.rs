// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Submission sequence numbers — 4-digit zero-padded strings.
//
// Sequence "0000" is the original application. The padding never caps the
// value: "0999" increments to "1000" and the string simply grows.

use dossierwerk_core::error::{DossierError, Result};
use dossierwerk_core::types::{SequenceInfo, SubmissionType};

/// Format a sequence number as a 4-digit zero-padded string.
pub fn format_sequence_number(number: u32) -> String {
    format!("{number:04}")
}

/// Increment a sequence string and re-pad it.
pub fn next_sequence(current: &str) -> Result<String> {
    let number: u32 = current
        .parse()
        .map_err(|_| DossierError::Xml(format!("invalid sequence number '{current}'")))?;
    Ok(format_sequence_number(number + 1))
}

/// Sequence "0000" is the original submission; everything else amends it.
pub fn submission_type(sequence: &str) -> SubmissionType {
    if sequence == "0000" {
        SubmissionType::Original
    } else {
        SubmissionType::Amendment
    }
}

/// Bundle a sequence string with its derived type.
pub fn sequence_info(sequence: &str) -> SequenceInfo {
    SequenceInfo {
        number: sequence.to_string(),
        kind: submission_type(sequence),
    }
}
