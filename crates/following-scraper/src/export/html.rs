//! Standalone HTML table, one row per record, with a status footer.

use super::{create_file, row, RecordSink, COLUMNS};
use crate::error::SinkError;
use crate::model::{FollowedProfile, StreamEnd};
use quick_xml::escape::escape;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Following</title>
<style>
body { font-family: sans-serif; margin: 2em; }
table { border-collapse: collapse; }
th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: left; vertical-align: top; }
img { width: 40px; height: 40px; object-fit: cover; }
</style>
</head>
<body>
<table>
"#;

pub struct HtmlSink {
    out: Option<BufWriter<File>>,
}

impl HtmlSink {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let mut out = BufWriter::new(create_file(path)?);
        out.write_all(HEAD.as_bytes())?;
        write!(out, "<thead><tr>")?;
        for column in COLUMNS {
            write!(out, "<th>{column}</th>")?;
        }
        writeln!(out, "</tr></thead>\n<tbody>")?;
        Ok(Self { out: Some(out) })
    }
}

impl RecordSink for HtmlSink {
    fn emit(&mut self, record: &FollowedProfile) -> Result<(), SinkError> {
        let out = self.out.as_mut().ok_or(SinkError::Finished)?;
        let [id, image, title, subtitle, url, username, details] = row(record)?;

        write!(out, "<tr><td>{}</td>", escape(id.as_str()))?;
        if image.is_empty() {
            write!(out, "<td></td>")?;
        } else {
            write!(out, r#"<td><img src="{}" alt=""></td>"#, escape(image.as_str()))?;
        }
        write!(out, "<td>{}</td>", escape(title.as_str()))?;
        write!(out, "<td>{}</td>", escape(subtitle.as_str()))?;
        write!(
            out,
            r#"<td><a href="{0}">{0}</a></td>"#,
            escape(url.as_str())
        )?;
        write!(out, "<td>{}</td>", escape(username.as_str()))?;
        writeln!(out, "<td><code>{}</code></td></tr>", escape(details.as_str()))?;
        Ok(())
    }

    fn finish(&mut self, end: &StreamEnd) -> Result<(), SinkError> {
        let mut out = self.out.take().ok_or(SinkError::Finished)?;
        writeln!(out, "</tbody>\n</table>")?;
        writeln!(
            out,
            r#"<p class="summary">{} records &middot; {}</p>"#,
            end.count, end.status
        )?;
        writeln!(out, "</body>\n</html>")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::{example, uncut};
    use crate::model::TerminalStatus;

    #[test]
    fn test_rows_escaped_and_footer_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");
        let mut sink = HtmlSink::create(&path).unwrap();
        sink.emit(&uncut()).unwrap();
        sink.emit(&example()).unwrap();
        sink.finish(&StreamEnd {
            count: 2,
            status: TerminalStatus::LimitReached,
        })
        .unwrap();

        let html = std::fs::read_to_string(&path).unwrap();
        assert_eq!(html.matches("<tr><td>").count(), 2);
        assert!(html.contains("Example &quot;Profile&quot;"));
        assert!(html.contains("&lt;b&gt;&amp;&lt;/b&gt;"));
        assert!(html.contains("?a=1&amp;b=2"));
        assert!(html.contains("2 records &middot; limitReached"));
        assert!(html.trim_end().ends_with("</html>"));
    }
}
