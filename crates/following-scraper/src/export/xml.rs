use super::{create_file, RecordSink};
use crate::error::SinkError;
use crate::model::{FollowedProfile, StreamEnd};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const ROOT: &str = "following";

fn xml_err(e: impl std::fmt::Display) -> SinkError {
    SinkError::Xml(e.to_string())
}

/// `<following>` document with one `<profile>` element per record and a
/// closing `<summary>` element.
pub struct XmlSink {
    writer: Option<Writer<BufWriter<File>>>,
}

impl XmlSink {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let mut writer = Writer::new_with_indent(BufWriter::new(create_file(path)?), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_err)?;
        writer
            .write_event(Event::Start(BytesStart::new(ROOT)))
            .map_err(xml_err)?;
        Ok(Self {
            writer: Some(writer),
        })
    }
}

fn write_field(
    writer: &mut Writer<BufWriter<File>>,
    name: &str,
    value: &str,
) -> Result<(), SinkError> {
    if value.is_empty() {
        return writer
            .write_event(Event::Empty(BytesStart::new(name)))
            .map_err(xml_err);
    }
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::Text(BytesText::new(value)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)
}

impl RecordSink for XmlSink {
    fn emit(&mut self, record: &FollowedProfile) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::Finished)?;

        let mut start = BytesStart::new("profile");
        start.push_attribute(("id", record.id.as_str()));
        writer.write_event(Event::Start(start)).map_err(xml_err)?;

        write_field(writer, "title", &record.title)?;
        write_field(writer, "subtitle_text", &record.subtitle_text)?;
        write_field(writer, "url", &record.url)?;
        write_field(writer, "image", &record.image)?;
        if let Some(username) = &record.username {
            write_field(writer, "username", username)?;
        }
        if !record.profile_details.is_empty() {
            let details = serde_json::to_string(&record.profile_details)?;
            write_field(writer, "profile_details", &details)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("profile")))
            .map_err(xml_err)
    }

    fn finish(&mut self, end: &StreamEnd) -> Result<(), SinkError> {
        let mut writer = self.writer.take().ok_or(SinkError::Finished)?;

        let count = end.count.to_string();
        let status = end.status.to_string();
        let mut summary = BytesStart::new("summary");
        summary.push_attribute(("count", count.as_str()));
        summary.push_attribute(("status", status.as_str()));
        writer.write_event(Event::Empty(summary)).map_err(xml_err)?;
        writer
            .write_event(Event::End(BytesEnd::new(ROOT)))
            .map_err(xml_err)?;

        let mut out = writer.into_inner();
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::{example, uncut};
    use crate::model::{AbortReason, TerminalStatus};

    #[test]
    fn test_document_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xml");
        let mut sink = XmlSink::create(&path).unwrap();
        sink.emit(&uncut()).unwrap();
        sink.emit(&example()).unwrap();
        sink.finish(&StreamEnd {
            count: 2,
            status: TerminalStatus::Aborted(AbortReason::Cancelled),
        })
        .unwrap();

        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"<profile id="100064487118317">"#));
        assert!(xml.contains("<title>Uncut Magazine</title>"));
        assert!(xml.contains("<subtitle_text/>"));
        assert!(xml.contains("<username>UncutMagazine</username>"));
        assert!(xml.contains("&lt;b&gt;&amp;&lt;/b&gt;"));
        assert!(xml.contains(r#"<summary count="2" status="aborted:cancelled"/>"#));
        assert!(xml.trim_end().ends_with("</following>"));
    }
}
