//! Record sinks: where accepted records go as they stream out of the
//! controller.
//!
//! Every sink receives records in emission order followed by exactly one
//! [`StreamEnd`]. File sinks write incrementally where the format allows it
//! (JSON, JSON Lines, CSV, HTML, XML); XLSX is assembled on `finish`.

mod csv;
mod html;
mod json;
mod jsonl;
mod xlsx;
mod xml;

pub use self::csv::CsvSink;
pub use self::html::HtmlSink;
pub use self::json::JsonArraySink;
pub use self::jsonl::JsonLinesSink;
pub use self::xlsx::XlsxSink;
pub use self::xml::XmlSink;

use crate::error::{ConfigError, SinkError};
use crate::model::{FollowedProfile, StreamEnd};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

/// Consumer of the ordered record stream.
pub trait RecordSink: Send {
    fn emit(&mut self, record: &FollowedProfile) -> Result<(), SinkError>;

    /// Called once after the last record. Sinks flush and close here.
    fn finish(&mut self, end: &StreamEnd) -> Result<(), SinkError>;
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn emit(&mut self, record: &FollowedProfile) -> Result<(), SinkError> {
        (**self).emit(record)
    }

    fn finish(&mut self, end: &StreamEnd) -> Result<(), SinkError> {
        (**self).finish(end)
    }
}

/// Tabular column order shared by the CSV, HTML and XLSX writers.
pub(crate) const COLUMNS: &[&str] = &[
    "id",
    "image",
    "title",
    "subtitle_text",
    "url",
    "username",
    "profile_details",
];

/// One record flattened to [`COLUMNS`]; details are embedded as JSON.
pub(crate) fn row(record: &FollowedProfile) -> Result<[String; 7], SinkError> {
    let details = if record.profile_details.is_empty() {
        String::new()
    } else {
        serde_json::to_string(&record.profile_details)?
    };
    Ok([
        record.id.clone(),
        record.image.clone(),
        record.title.clone(),
        record.subtitle_text.clone(),
        record.url.clone(),
        record.username.clone().unwrap_or_default(),
        details,
    ])
}

/// Create `path` (and its parent directories), truncating any previous file.
pub(crate) fn create_file(path: &Path) -> Result<File, SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Jsonl,
    Csv,
    Html,
    Xml,
    Xlsx,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 6] = [
        OutputFormat::Json,
        OutputFormat::Jsonl,
        OutputFormat::Csv,
        OutputFormat::Html,
        OutputFormat::Xml,
        OutputFormat::Xlsx,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Jsonl => "jsonl",
            OutputFormat::Csv => "csv",
            OutputFormat::Html => "html",
            OutputFormat::Xml => "xml",
            OutputFormat::Xlsx => "xlsx",
        }
    }

    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "ndjson" => Ok(OutputFormat::Jsonl),
            "csv" => Ok(OutputFormat::Csv),
            "html" | "htm" => Ok(OutputFormat::Html),
            "xml" => Ok(OutputFormat::Xml),
            "xlsx" | "excel" => Ok(OutputFormat::Xlsx),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Open a file sink for `format` at `path`.
pub fn open_sink(format: OutputFormat, path: &Path) -> Result<Box<dyn RecordSink>, SinkError> {
    Ok(match format {
        OutputFormat::Json => Box::new(JsonArraySink::create(path)?),
        OutputFormat::Jsonl => Box::new(JsonLinesSink::create(path)?),
        OutputFormat::Csv => Box::new(CsvSink::create(path)?),
        OutputFormat::Html => Box::new(HtmlSink::create(path)?),
        OutputFormat::Xml => Box::new(XmlSink::create(path)?),
        OutputFormat::Xlsx => Box::new(XlsxSink::create(path)?),
    })
}

/// Fans each record out to several sinks.
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn RecordSink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn RecordSink>) {
        self.sinks.push(sink);
    }
}

impl RecordSink for MultiSink {
    fn emit(&mut self, record: &FollowedProfile) -> Result<(), SinkError> {
        for sink in &mut self.sinks {
            sink.emit(record)?;
        }
        Ok(())
    }

    /// Every sink is finished even if an earlier one fails; the first error
    /// is returned.
    fn finish(&mut self, end: &StreamEnd) -> Result<(), SinkError> {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.finish(end) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Collects the stream in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<FollowedProfile>,
    pub end: Option<StreamEnd>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for MemorySink {
    fn emit(&mut self, record: &FollowedProfile) -> Result<(), SinkError> {
        if self.end.is_some() {
            return Err(SinkError::Finished);
        }
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self, end: &StreamEnd) -> Result<(), SinkError> {
        if self.end.is_some() {
            return Err(SinkError::Finished);
        }
        self.end = Some(end.clone());
        Ok(())
    }
}
