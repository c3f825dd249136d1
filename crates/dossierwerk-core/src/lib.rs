// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dossierwerk — Core types, checksums, and path mapping shared across all crates.

pub mod checksum;
pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use config::ExportConfig;
pub use error::DossierError;
pub use types::*;
