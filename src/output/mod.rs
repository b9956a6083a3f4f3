use crate::config::OutputConfig;
use crate::error::Result;
use crate::extract::BookRecord;
use async_trait::async_trait;
use indicatif::MultiProgress;
use std::path::PathBuf;
use std::sync::Arc;

pub mod console;
pub mod csv;
pub mod json;

#[async_trait]
pub trait OutputHandler: Send + Sync {
    async fn write(&mut self, book: &BookRecord) -> Result<()>;
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

pub fn create_handler(
    config: Option<&OutputConfig>,
    multi: Option<Arc<MultiProgress>>,
) -> Result<Box<dyn OutputHandler>> {
    Ok(match config {
        None | Some(OutputConfig::Console) => Box::new(console::ConsoleOutput::new(multi)),
        Some(OutputConfig::Json { path }) => Box::new(json::JsonOutput::new(PathBuf::from(path))?),
        Some(OutputConfig::Csv { path }) => Box::new(csv::CsvOutput::new(PathBuf::from(path))?),
    })
}

/// Writes every book in order, then closes the handler.
pub async fn write_all(handler: &mut dyn OutputHandler, books: &[BookRecord]) -> Result<()> {
    for book in books {
        handler.write(book).await?;
    }
    handler.close().await
}
