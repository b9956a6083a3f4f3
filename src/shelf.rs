//! End-to-end extraction of one listing.

use crate::config::{Offset, ShelfConfig};
use crate::error::Result;
use crate::extract::{BookRecord, FieldExtractor};
use crate::load::LoadController;
use crate::locator::Locator;
use crate::progress::ProgressStatus;
use crate::session::BrowserSession;
use std::time::Duration;
use tokio::sync::watch;

/// `tr.bookalike` rows of the listing table.
pub fn item_locator() -> Locator {
    Locator::class("bookalike")
}

/// The "30 of 321 loaded" fragment.
pub fn status_locator() -> Locator {
    Locator::id("infiniteStatus")
}

pub struct ShelfScraper {
    page_timeout: Duration,
    status_timeout: Duration,
    overlay_offset: Offset,
    loader: LoadController,
    extractor: FieldExtractor,
}

impl ShelfScraper {
    pub fn new(config: &ShelfConfig) -> Self {
        let loader = LoadController::new(item_locator(), status_locator())
            .with_key(config.load_key)
            .with_timeouts(config.load_timeout(), config.status_timeout())
            .with_max_requests(config.max_load_requests);

        Self {
            page_timeout: config.page_timeout(),
            status_timeout: config.status_timeout(),
            overlay_offset: config.overlay_offset,
            loader,
            extractor: FieldExtractor::default(),
        }
    }

    pub fn watch_progress(&self) -> watch::Receiver<ProgressStatus> {
        self.loader.watch()
    }

    /// Scrapes `url` and closes `session` afterwards, whatever the outcome.
    pub async fn scrape<S: BrowserSession>(&self, session: S, url: &str) -> Result<Vec<BookRecord>> {
        let result = self.scrape_open(&session, url).await;
        let closed = session.close().await;

        match (result, closed) {
            (Ok(books), Ok(())) => Ok(books),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                log::warn!("Failed to close browser session: {}", close_err);
                Err(e)
            }
        }
    }

    async fn scrape_open<S: BrowserSession>(&self, session: &S, url: &str) -> Result<Vec<BookRecord>> {
        session.navigate(url).await?;

        let body = session.wait_for(&Locator::tag("body"), self.page_timeout).await?;

        let Offset { x, y } = self.overlay_offset;
        if let Err(e) = session.click_at_offset(x, y).await {
            log::debug!("Overlay dismissal click failed: {}", e);
        }

        let status = session.wait_for(&status_locator(), self.status_timeout).await?;
        let outcome = self.loader.run(session, &status, &body).await?;

        let items = session.find_all(&item_locator()).await?;
        if items.len() != outcome.status.total {
            log::warn!(
                "Listing reports {} items but {} are rendered",
                outcome.status.total,
                items.len()
            );
        }

        let mut books = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let book = self.extractor.extract(session, item).await?;
            log::debug!("Item {}: {}", index + 1, book.title);
            books.push(book);
        }

        log::info!("Extracted {} books from {}", books.len(), url);
        Ok(books)
    }
}
