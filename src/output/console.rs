use super::OutputHandler;
use crate::error::{Error, Result};
use crate::extract::BookRecord;
use async_trait::async_trait;
use indicatif::MultiProgress;
use std::sync::Arc;

pub struct ConsoleOutput {
    multi: Option<Arc<MultiProgress>>,
}

impl ConsoleOutput {
    pub fn new(multi: Option<Arc<MultiProgress>>) -> Self {
        Self { multi }
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl OutputHandler for ConsoleOutput {
    async fn write(&mut self, book: &BookRecord) -> Result<()> {
        let output = serde_json::to_string_pretty(book)?;

        if let Some(multi) = &self.multi {
            for line in output.lines() {
                multi.println(line).map_err(|e| Error::Internal(e.to_string()))?;
            }
        } else {
            for line in output.lines() {
                println!("{}", line);
            }
        }
        Ok(())
    }
}
