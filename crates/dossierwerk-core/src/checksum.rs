// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Leaf checksums — MD5 digests for eCTD backbone integrity.
//
// The eCTD 3.2 specification fixes the leaf checksum algorithm as MD5;
// regional validators reject anything else, so this is a format constant
// rather than a security choice.

use std::fs::File;
use std::path::Path;

use md5::{Digest, Md5};

use crate::error::{DossierError, Result};

/// Compute the MD5 digest of `data` and return it as a 32-char lowercase
/// hex string.
///
/// Used to fingerprint every file referenced by an XML `<leaf>` element.
pub fn md5_hex(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the MD5 digest of a file by streaming it through the hasher.
///
/// Large submission PDFs are never buffered whole; `io::copy` reads in
/// chunks. A missing or unreadable file propagates as an I/O error.
pub fn md5_file(path: impl AsRef<Path>) -> Result<String> {
    let mut file = File::open(path.as_ref())?;
    let mut hasher = Md5::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Verify that `data` matches the expected MD5 hex digest.
///
/// Returns `Ok(())` when the digest matches, or
/// `Err(DossierError::ChecksumMismatch)` carrying both values when it
/// does not.
pub fn verify_md5(data: &[u8], expected_hex: &str) -> Result<()> {
    let actual = md5_hex(data);
    if actual == expected_hex {
        Ok(())
    } else {
        Err(DossierError::ChecksumMismatch {
            expected: expected_hex.to_owned(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// MD5 of the empty byte slice (well-known constant).
    const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";

    #[test]
    fn hash_empty_input() {
        assert_eq!(md5_hex(b""), EMPTY_MD5);
    }

    #[test]
    fn hash_known_value() {
        // MD5("abc") — verified against coreutils md5sum.
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn hash_is_deterministic() {
        let data = b"clinical study report";
        assert_eq!(md5_hex(data), md5_hex(data));
        assert_ne!(md5_hex(b"a"), md5_hex(b"b"));
    }

    #[test]
    fn file_hash_matches_buffer_hash() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"abc").unwrap();
        let from_file = md5_file(tmp.path()).unwrap();
        assert_eq!(from_file, md5_hex(b"abc"));
    }

    #[test]
    fn file_hash_missing_file_is_io_error() {
        let err = md5_file("/nonexistent/leaf.pdf").unwrap_err();
        assert!(matches!(err, DossierError::Io(_)));
    }

    #[test]
    fn verify_mismatched_digest() {
        let result = verify_md5(b"a", "0000");
        match result.unwrap_err() {
            DossierError::ChecksumMismatch { expected, actual } => {
                assert_eq!(expected, "0000");
                assert_eq!(actual, md5_hex(b"a"));
            }
            other => panic!("unexpected error variant: {other}"),
        }
    }
}
