use super::{create_file, RecordSink};
use crate::error::SinkError;
use crate::model::{FollowedProfile, StreamEnd};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A JSON array written one element at a time. The closing bracket lands
/// on `finish`, so an aborted run still leaves every emitted record on disk.
pub struct JsonArraySink {
    out: Option<BufWriter<File>>,
    written: usize,
}

impl JsonArraySink {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let mut out = BufWriter::new(create_file(path)?);
        out.write_all(b"[")?;
        Ok(Self {
            out: Some(out),
            written: 0,
        })
    }
}

impl RecordSink for JsonArraySink {
    fn emit(&mut self, record: &FollowedProfile) -> Result<(), SinkError> {
        let out = self.out.as_mut().ok_or(SinkError::Finished)?;
        let separator: &[u8] = if self.written == 0 { b"\n  " } else { b",\n  " };
        out.write_all(separator)?;
        serde_json::to_writer(&mut *out, record)?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self, _end: &StreamEnd) -> Result<(), SinkError> {
        let mut out = self.out.take().ok_or(SinkError::Finished)?;
        if self.written > 0 {
            out.write_all(b"\n")?;
        }
        out.write_all(b"]\n")?;
        out.flush()?;
        Ok(())
    }
}
