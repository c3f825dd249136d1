// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dossierwerk — Manifest assembly and export readiness.

pub mod assembler;

pub use assembler::{ManifestAssembler, ManifestOptions};
