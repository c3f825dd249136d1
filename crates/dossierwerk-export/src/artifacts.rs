// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// QC artifact generation — backbone XML, report files, and the final ZIP.
//
// Artifact order is load-bearing: the XML and reports are written into
// the tree first so the archive pass picks them up.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use dossierwerk_backbone::{IndexParams, LeafOptions, build_leaf_entries, render_index_xml, render_regional_xml};
use dossierwerk_bridge::SponsorInfo;
use dossierwerk_core::error::Result;
use dossierwerk_core::types::{
    BookmarkManifest, HyperlinkReport, LinkType, PackageManifest, ReadinessCheck, SequenceInfo,
};

use crate::archive::create_zip_archive;

/// Everything artifact generation consumes from the earlier stages.
pub struct ArtifactInputs<'a> {
    pub manifest: &'a PackageManifest,
    pub sponsor: &'a SponsorInfo,
    pub sequence: SequenceInfo,
    pub study_title: &'a str,
    pub bookmark_manifest: &'a BookmarkManifest,
    pub hyperlinks: &'a HyperlinkReport,
    pub compute_checksums: bool,
}

/// Paths of everything written for one export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportArtifacts {
    pub zip_path: PathBuf,
    pub zip_size: u64,
    pub index_xml_path: PathBuf,
    pub regional_xml_path: PathBuf,
    pub bookmark_manifest_path: PathBuf,
    pub hyperlink_report_path: PathBuf,
    pub qc_summary_path: PathBuf,
}

/// The roll-up written to `qc-summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcSummary {
    pub study_id: Uuid,
    pub study_number: String,
    pub file_count: u32,
    pub total_size: u64,
    pub readiness: ReadinessCheck,
    pub bookmarks: QcBookmarks,
    pub hyperlinks: QcHyperlinks,
    pub xml: QcXml,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcBookmarks {
    pub total_count: u32,
    pub max_depth: u32,
    pub warning_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcHyperlinks {
    pub total_links: u32,
    pub internal_links: u32,
    pub cross_document_links: u32,
    pub external_links: u32,
    pub updated: u32,
    pub removed: u32,
    pub broken: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcXml {
    pub leaf_count: u32,
    pub sequence: String,
    pub submission_type: String,
    pub checksums_computed: bool,
}

/// Render and write every artifact, then archive the whole tree.
///
/// Leaf checksums are taken over the processed files already sitting in
/// `export_dir`, so this must run after the PDF stages.
#[instrument(skip_all, fields(root = %export_dir.display()))]
pub async fn generate_export_artifacts(
    inputs: &ArtifactInputs<'_>,
    export_dir: &Path,
) -> Result<ExportArtifacts> {
    let ectd_dir = export_dir.join("ectd");
    tokio::fs::create_dir_all(&ectd_dir).await?;

    let leaves = build_leaf_entries(
        inputs.manifest,
        export_dir,
        LeafOptions {
            compute_checksums: inputs.compute_checksums,
        },
    )?;

    let index_params = IndexParams {
        sequence: inputs.sequence.clone(),
        applicant_name: inputs.sponsor.applicant_name.clone(),
        study_number: inputs.manifest.study_number.clone(),
        study_title: inputs.study_title.to_string(),
        include_dtd_reference: true,
    };
    let index_xml_path = ectd_dir.join("index.xml");
    tokio::fs::write(&index_xml_path, render_index_xml(&index_params, &leaves)?).await?;

    let regional_xml_path = ectd_dir.join("us-regional.xml");
    tokio::fs::write(&regional_xml_path, render_regional_xml(inputs.sponsor)?).await?;

    let bookmark_manifest_path = export_dir.join("bookmark-manifest.json");
    tokio::fs::write(
        &bookmark_manifest_path,
        serde_json::to_vec_pretty(inputs.bookmark_manifest)?,
    )
    .await?;

    let hyperlink_report_path = export_dir.join("hyperlink-report.csv");
    tokio::fs::write(&hyperlink_report_path, hyperlink_csv(inputs.hyperlinks)).await?;

    let qc_summary_path = export_dir.join("qc-summary.json");
    let summary = qc_summary(inputs, leaves.len() as u32);
    tokio::fs::write(&qc_summary_path, serde_json::to_vec_pretty(&summary)?).await?;

    let zip_path = export_dir.join("package.zip");
    let zip_size = create_zip_archive(export_dir, &zip_path)?;

    info!(zip_size, leaves = leaves.len(), "export artifacts generated");
    Ok(ExportArtifacts {
        zip_path,
        zip_size,
        index_xml_path,
        regional_xml_path,
        bookmark_manifest_path,
        hyperlink_report_path,
        qc_summary_path,
    })
}

fn qc_summary(inputs: &ArtifactInputs<'_>, leaf_count: u32) -> QcSummary {
    let manifest = inputs.manifest;
    let links = inputs.hyperlinks;
    QcSummary {
        study_id: manifest.study_id,
        study_number: manifest.study_number.clone(),
        file_count: manifest.files.len() as u32,
        total_size: manifest.files.iter().map(|f| f.file_size).sum(),
        readiness: manifest.readiness.clone(),
        bookmarks: QcBookmarks {
            total_count: inputs.bookmark_manifest.total_count,
            max_depth: inputs.bookmark_manifest.max_depth,
            warning_count: inputs.bookmark_manifest.warnings.len() as u32,
        },
        hyperlinks: QcHyperlinks {
            total_links: links.total_links,
            internal_links: links.internal_count,
            cross_document_links: links.cross_document_count,
            external_links: links.external_count,
            updated: links.updated_count,
            removed: links.removed_count,
            broken: links.broken_links.len() as u32,
        },
        xml: QcXml {
            leaf_count,
            sequence: inputs.sequence.number.clone(),
            submission_type: inputs.sequence.kind.as_str().to_string(),
            checksums_computed: inputs.compute_checksums,
        },
    }
}

// -- CSV rendering ------------------------------------------------------------

/// `hyperlink-report.csv`: one row per broken or flagged external link,
/// then a summary block.
fn hyperlink_csv(report: &HyperlinkReport) -> String {
    let mut out = String::from("Source File,Page,Link Type,Target,Status,Error\n");

    for broken in &report.broken_links {
        out.push_str(&csv_row(&[
            &broken.source_file,
            &broken.page_number.to_string(),
            link_type_label(LinkType::CrossDocument),
            &broken.target,
            "BROKEN",
            &broken.reason,
        ]));
    }
    for external in &report.external_links {
        out.push_str(&csv_row(&[
            &external.source_file,
            &external.page_number.to_string(),
            link_type_label(external.link_type),
            external.target_uri.as_deref().unwrap_or(""),
            "FLAGGED",
            "",
        ]));
    }

    out.push('\n');
    out.push_str(&format!("Total Links,{}\n", report.total_links));
    out.push_str(&format!("Internal Links,{}\n", report.internal_count));
    out.push_str(&format!(
        "Cross-Document Links,{}\n",
        report.cross_document_count
    ));
    out
}

fn link_type_label(link_type: LinkType) -> &'static str {
    match link_type {
        LinkType::Internal => "internal",
        LinkType::CrossDocument => "cross-document",
        LinkType::External => "external",
        LinkType::Unknown => "unknown",
    }
}

fn csv_row(fields: &[&str]) -> String {
    let mut row = fields
        .iter()
        .map(|field| csv_field(field))
        .collect::<Vec<_>>()
        .join(",");
    row.push('\n');
    row
}

fn csv_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossierwerk_core::types::{BrokenLink, ExtractedLink};

    #[test]
    fn csv_header_rows_and_summary_block() {
        let report = HyperlinkReport {
            total_links: 3,
            internal_count: 1,
            cross_document_count: 1,
            external_count: 1,
            kept_count: 3,
            broken_links: vec![BrokenLink {
                source_file: "m5/s/16-1/a.pdf".into(),
                page_number: 2,
                target: "missing, with comma.pdf".into(),
                reason: "target not found in package".into(),
            }],
            external_links: vec![ExtractedLink {
                source_file: "m5/s/16-1/a.pdf".into(),
                page_number: 5,
                target_uri: Some("https://example.org".into()),
                target_page: None,
                target_destination: None,
                link_type: LinkType::External,
            }],
            ..Default::default()
        };

        let csv = hyperlink_csv(&report);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Source File,Page,Link Type,Target,Status,Error"
        );
        assert_eq!(
            lines.next().unwrap(),
            "m5/s/16-1/a.pdf,2,cross-document,\"missing, with comma.pdf\",BROKEN,target not found in package"
        );
        assert_eq!(
            lines.next().unwrap(),
            "m5/s/16-1/a.pdf,5,external,https://example.org,FLAGGED,"
        );
        assert!(csv.contains("Total Links,3\n"));
        assert!(csv.contains("Internal Links,1\n"));
        assert!(csv.contains("Cross-Document Links,1\n"));
    }

    #[test]
    fn csv_escapes_quotes() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
