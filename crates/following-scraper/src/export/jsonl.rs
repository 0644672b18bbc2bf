//! JSON Lines: one record per line, flushed as it goes.

use super::{create_file, RecordSink};
use crate::error::SinkError;
use crate::model::{FollowedProfile, StreamEnd};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct JsonLinesSink {
    out: Option<BufWriter<File>>,
}

impl JsonLinesSink {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        Ok(Self {
            out: Some(BufWriter::new(create_file(path)?)),
        })
    }
}

impl RecordSink for JsonLinesSink {
    fn emit(&mut self, record: &FollowedProfile) -> Result<(), SinkError> {
        let out = self.out.as_mut().ok_or(SinkError::Finished)?;
        let json = serde_json::to_string(record)?;
        writeln!(out, "{json}")?;
        Ok(())
    }

    fn finish(&mut self, _end: &StreamEnd) -> Result<(), SinkError> {
        let mut out = self.out.take().ok_or(SinkError::Finished)?;
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
    fn test_one_record_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let mut sink = JsonLinesSink::create(&path).unwrap();
        sink.emit(&uncut()).unwrap();
        sink.emit(&example()).unwrap();
        sink.finish(&StreamEnd {
            count: 2,
            status: TerminalStatus::Aborted(AbortReason::Cancelled),
        })
        .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: FollowedProfile = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second, example());
    }
}
