use super::{create_file, row, RecordSink, COLUMNS};
use crate::error::SinkError;
use crate::model::{FollowedProfile, StreamEnd};
use std::fs::File;
use std::path::Path;

/// Fixed-column CSV with a header row; `profile_details` is a JSON cell.
pub struct CsvSink {
    writer: Option<::csv::Writer<File>>,
}

impl CsvSink {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let mut writer = ::csv::Writer::from_writer(create_file(path)?);
        writer.write_record(COLUMNS)?;
        Ok(Self {
            writer: Some(writer),
        })
    }
}

impl RecordSink for CsvSink {
    fn emit(&mut self, record: &FollowedProfile) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::Finished)?;
        writer.write_record(row(record)?)?;
        Ok(())
    }

    fn finish(&mut self, _end: &StreamEnd) -> Result<(), SinkError> {
        let mut writer = self.writer.take().ok_or(SinkError::Finished)?;
        writer.flush()?;
        Ok(())
    }
}
