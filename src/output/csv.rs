use super::OutputHandler;
use crate::error::Result;
use crate::extract::BookRecord;
use async_trait::async_trait;
use std::path::PathBuf;

pub struct CsvOutput {
    writer: csv::Writer<std::fs::File>,
    headers_written: bool,
}

impl CsvOutput {
    pub fn new(path: PathBuf) -> Result<Self> {
        let writer = csv::Writer::from_path(path)?;

        Ok(Self {
            writer,
            headers_written: false,
        })
    }
}

#[async_trait]
impl OutputHandler for CsvOutput {
    async fn write(&mut self, book: &BookRecord) -> Result<()> {
        if !self.headers_written {
            self.writer.write_record(BookRecord::FIELD_NAMES)?;
            self.headers_written = true;
        }

        self.writer.write_record(book.to_row())?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.headers_written {
            self.writer.write_record(BookRecord::FIELD_NAMES)?;
            self.headers_written = true;
        }
        self.writer.flush()?;
        Ok(())
    }
}
