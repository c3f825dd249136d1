// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// FDA us-regional.xml rendering.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::{debug, instrument};

use dossierwerk_bridge::SponsorInfo;
use dossierwerk_core::error::{DossierError, Result};

const FDA_NAMESPACE: &str = "http://www.fda.gov/regional";
const XLINK_NAMESPACE: &str = "http://www.w3c.org/1999/xlink";
const DTD_VERSION: &str = "2.01";

/// Render `us-regional.xml` from sponsor metadata. Optional fields are
/// omitted entirely rather than rendered empty.
#[instrument(skip_all, fields(applicant = %sponsor.applicant_name))]
pub fn render_regional_xml(sponsor: &SponsorInfo) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("fda-regional:fda-regional");
    root.push_attribute(("xmlns:fda-regional", FDA_NAMESPACE));
    root.push_attribute(("xmlns:xlink", XLINK_NAMESPACE));
    root.push_attribute(("dtd-version", DTD_VERSION));
    write(&mut writer, Event::Start(root))?;

    write(&mut writer, Event::Start(BytesStart::new("admin")))?;
    write(&mut writer, Event::Start(BytesStart::new("applicant-info")))?;

    text_element(&mut writer, "company-name", &sponsor.applicant_name)?;
    if let Some(application_type) = &sponsor.application_type {
        text_element(&mut writer, "application-type", application_type)?;
    }
    if let Some(application_number) = &sponsor.application_number {
        text_element(&mut writer, "application-number", application_number)?;
    }
    if let Some(duns) = &sponsor.duns_number {
        text_element(&mut writer, "duns-number", duns)?;
    }

    write(&mut writer, Event::End(BytesEnd::new("applicant-info")))?;
    write(&mut writer, Event::End(BytesEnd::new("admin")))?;
    write(
        &mut writer,
        Event::End(BytesEnd::new("fda-regional:fda-regional")),
    )?;

    let xml = String::from_utf8(writer.into_inner())
        .map_err(|err| DossierError::Xml(format!("us-regional.xml is not UTF-8: {err}")))?;
    debug!(bytes = xml.len(), "us-regional.xml rendered");
    Ok(xml)
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
