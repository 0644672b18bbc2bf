//! Excel workbook. The worksheet runs in constant-memory mode: each row is
//! flushed to a temporary file as it is written and the xlsx container is
//! assembled on `finish`.

use super::{create_file, row, RecordSink, COLUMNS};
use crate::error::SinkError;
use crate::model::{FollowedProfile, StreamEnd};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::{Path, PathBuf};

const SHEET_NAME: &str = "Following";

pub struct XlsxSink {
    path: PathBuf,
    workbook: Workbook,
    bold: Format,
    /// Next row to write; row 0 is the header.
    next_row: u32,
    finished: bool,
}

impl XlsxSink {
    /// Claims `path` right away so an unwritable destination fails before
    /// the run starts.
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        create_file(path)?;
        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();
        let sheet = workbook.add_worksheet_with_constant_memory();
        sheet.set_name(SHEET_NAME)?;
        for (col, name) in COLUMNS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *name, &bold)?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            workbook,
            bold,
            next_row: 1,
            finished: false,
        })
    }

    fn sheet(&mut self) -> Result<&mut Worksheet, SinkError> {
        Ok(self.workbook.worksheet_from_index(0)?)
    }
}

impl RecordSink for XlsxSink {
    fn emit(&mut self, record: &FollowedProfile) -> Result<(), SinkError> {
        if self.finished {
            return Err(SinkError::Finished);
        }
        let cells = row(record)?;
        let r = self.next_row;
        let sheet = self.sheet()?;
        for (col, value) in cells.iter().enumerate() {
            sheet.write_string(r, col as u16, value)?;
        }
        self.next_row += 1;
        Ok(())
    }

    fn finish(&mut self, end: &StreamEnd) -> Result<(), SinkError> {
        if self.finished {
            return Err(SinkError::Finished);
        }
        self.finished = true;

        let footer = self.next_row + 1;
        let bold = self.bold.clone();
        let sheet = self.sheet()?;
        sheet.write_string_with_format(footer, 0, "status", &bold)?;
        sheet.write_string(footer, 1, end.status.to_string())?;
        sheet.write_string_with_format(footer + 1, 0, "count", &bold)?;
        sheet.write_number(footer + 1, 1, end.count as f64)?;

        self.workbook.save(&self.path)?;
        Ok(())
    }
}
