// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Dossierwerk.

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for all Dossierwerk operations.
#[derive(Debug, Error)]
pub enum DossierError {
    // -- Manifest errors --
    #[error("study not found: {0}")]
    StudyNotFound(Uuid),

    #[error("study {0} has no active template")]
    NoActiveTemplate(Uuid),

    /// Readiness gate failed. Recoverable by exporting with `force`.
    #[error("study is not ready for export: {0}")]
    Readiness(String),

    // -- Path security --
    /// A target path attempted to escape the output root. Never forceable.
    #[error("Invalid target path: {0}")]
    PathSecurity(String),

    #[error("Cannot clean up directory outside exports folder: {0}")]
    Cleanup(String),

    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("XML generation failed: {0}")]
    Xml(String),

    #[error("checksum failed: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    // -- Archive / storage --
    #[error("archive operation failed: {0}")]
    Archive(String),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("validation registry error: {0}")]
    Registry(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DossierError>;
