// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// eCTD index.xml rendering.
//
// The backbone is written with quick-xml's event writer: attribute order
// is fixed, free text is escaped by the library, and the DTD reference is
// optional because validating agencies ship their own copy.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::{debug, instrument};

use dossierwerk_core::error::{DossierError, Result};
use dossierwerk_core::types::{LeafEntry, SequenceInfo};

const ECTD_NAMESPACE: &str = "http://www.ich.org/ectd";
const XLINK_NAMESPACE: &str = "http://www.w3c.org/1999/xlink";
const DTD_VERSION: &str = "3.2";
const DTD_REFERENCE: &str = r#"ectd:ectd SYSTEM "util/dtd/ich-ectd-3-2.dtd""#;

/// Submission-level metadata stamped into the index header.
#[derive(Debug, Clone)]
pub struct IndexParams {
    pub sequence: SequenceInfo,
    pub applicant_name: String,
    pub study_number: String,
    pub study_title: String,
    /// Omit when the receiving gateway resolves the DTD itself.
    pub include_dtd_reference: bool,
}

/// Render `index.xml` for a sorted leaf entry list.
#[instrument(skip_all, fields(leaves = leaves.len(), sequence = %params.sequence.number))]
pub fn render_index_xml(params: &IndexParams, leaves: &[LeafEntry]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    if params.include_dtd_reference {
        write(
            &mut writer,
            Event::DocType(BytesText::from_escaped(DTD_REFERENCE)),
        )?;
    }

    let mut root = BytesStart::new("ectd:ectd");
    root.push_attribute(("xmlns:ectd", ECTD_NAMESPACE));
    root.push_attribute(("xmlns:xlink", XLINK_NAMESPACE));
    root.push_attribute(("dtd-version", DTD_VERSION));
    write(&mut writer, Event::Start(root))?;

    let mut submission = BytesStart::new("submission");
    submission.push_attribute(("sequence", params.sequence.number.as_str()));
    submission.push_attribute(("type", params.sequence.kind.as_str()));
    write(&mut writer, Event::Empty(submission))?;

    text_element(&mut writer, "applicant", &params.applicant_name)?;

    let mut study = BytesStart::new("study");
    study.push_attribute(("number", params.study_number.as_str()));
    write(&mut writer, Event::Start(study))?;
    write(&mut writer, Event::Text(BytesText::new(&params.study_title)))?;
    write(&mut writer, Event::End(BytesEnd::new("study")))?;

    let section = BytesStart::new("m5-clinical-study-reports");
    write(&mut writer, Event::Start(section))?;
    for leaf in leaves {
        write_leaf(&mut writer, leaf)?;
    }
    write(&mut writer, Event::End(BytesEnd::new("m5-clinical-study-reports")))?;

    write(&mut writer, Event::End(BytesEnd::new("ectd:ectd")))?;

    let xml = String::from_utf8(writer.into_inner())
        .map_err(|err| DossierError::Xml(format!("index.xml is not UTF-8: {err}")))?;
    debug!(bytes = xml.len(), "index.xml rendered");
    Ok(xml)
}

fn write_leaf(writer: &mut Writer<Vec<u8>>, leaf: &LeafEntry) -> Result<()> {
    let mut element = BytesStart::new("leaf");
    element.push_attribute(("ID", leaf.id.as_str()));
    element.push_attribute(("xlink:href", leaf.href.as_str()));
    element.push_attribute(("checksum", leaf.checksum.as_str()));
    element.push_attribute(("checksum-type", leaf.checksum_type.as_str()));
    write(writer, Event::Start(element))?;
    text_element(writer, "title", &leaf.title)?;
    write(writer, Event::End(BytesEnd::new("leaf")))
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> Result<()> {
    write(writer, Event::Start(BytesStart::new(name)))?;
    write(writer, Event::Text(BytesText::new(value)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|err| DossierError::Xml(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::sequence_info;

    fn params() -> IndexParams {
        IndexParams {
            sequence: sequence_info("0000"),
            applicant_name: "Example Pharma Inc".into(),
            study_number: "STUDY-001".into(),
            study_title: "A Phase III pivotal study".into(),
            include_dtd_reference: true,
        }
    }

    fn leaf(id: &str, href: &str, title: &str) -> LeafEntry {
        LeafEntry {
            id: id.into(),
            href: href.into(),
            checksum: "d41d8cd98f00b204e9800998ecf8427e".into(),
            checksum_type: "md5".into(),
            file_size: 10,
            title: title.into(),
            node_code: "16.1".into(),
        }
    }

    #[test]
    fn renders_declaration_dtd_and_namespaces() {
        let xml = render_index_xml(&params(), &[]).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<!DOCTYPE ectd:ectd SYSTEM \"util/dtd/ich-ectd-3-2.dtd\">"));
        assert!(xml.contains("xmlns:ectd=\"http://www.ich.org/ectd\""));
        assert!(xml.contains("xmlns:xlink=\"http://www.w3c.org/1999/xlink\""));
        assert!(xml.contains("dtd-version=\"3.2\""));
    }

    #[test]
    fn dtd_reference_is_optional() {
        let mut p = params();
        p.include_dtd_reference = false;
        let xml = render_index_xml(&p, &[]).unwrap();
        assert!(!xml.contains("DOCTYPE"));
    }

    #[test]
    fn sequence_header_carries_number_and_type() {
        let xml = render_index_xml(&params(), &[]).unwrap();
        assert!(xml.contains("<submission sequence=\"0000\" type=\"original\"/>"));

        let mut p = params();
        p.sequence = sequence_info("0003");
        let xml = render_index_xml(&p, &[]).unwrap();
        assert!(xml.contains("<submission sequence=\"0003\" type=\"amendment\"/>"));
    }

    #[test]
    fn leaf_attributes_render_in_schema_order() {
        let xml = render_index_xml(
            &params(),
            &[leaf("leaf-16-1", "m5/study-001/16-1/doc.pdf", "Protocol")],
        )
        .unwrap();
        assert!(xml.contains(
            "<leaf ID=\"leaf-16-1\" xlink:href=\"m5/study-001/16-1/doc.pdf\" \
             checksum=\"d41d8cd98f00b204e9800998ecf8427e\" checksum-type=\"md5\">"
        ));
        assert!(xml.contains("<title>Protocol</title>"));
    }

    #[test]
    fn free_text_is_escaped() {
        let mut p = params();
        p.applicant_name = "Smith & Jones <Pharma>".into();
        let xml = render_index_xml(&p, &[leaf("l1", "a.pdf", "AE \"listing\" & more")]).unwrap();
        assert!(xml.contains("Smith &amp; Jones &lt;Pharma&gt;"));
        assert!(xml.contains("AE &quot;listing&quot; &amp; more"));
        assert!(!xml.contains("Smith & Jones"));
    }
}
