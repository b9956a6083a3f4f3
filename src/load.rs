//! Incremental loading of a lazily rendered listing.

use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::progress::{parse_progress, ProgressStatus};
use crate::session::{wait_for_count_above, BrowserSession, Key};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    pub status: ProgressStatus,
    pub requests: usize,
}

/// Keeps asking the page for more items until its progress fragment reports
/// everything loaded.
pub struct LoadController {
    items: Locator,
    status: Locator,
    key: Key,
    load_timeout: Duration,
    status_timeout: Duration,
    max_requests: usize,
    progress: watch::Sender<ProgressStatus>,
}

impl LoadController {
    pub fn new(items: Locator, status: Locator) -> Self {
        let (progress, _) = watch::channel(ProgressStatus::default());
        Self {
            items,
            status,
            key: Key::End,
            load_timeout: Duration::from_secs(10),
            status_timeout: Duration::from_secs(5),
            max_requests: 1000,
            progress,
        }
    }

    pub fn with_key(mut self, key: Key) -> Self {
        self.key = key;
        self
    }

    pub fn with_timeouts(mut self, load_timeout: Duration, status_timeout: Duration) -> Self {
        self.load_timeout = load_timeout;
        self.status_timeout = status_timeout;
        self
    }

    pub fn with_max_requests(mut self, max_requests: usize) -> Self {
        self.max_requests = max_requests;
        self
    }

    /// Every freshly parsed status is published here.
    pub fn watch(&self) -> watch::Receiver<ProgressStatus> {
        self.progress.subscribe()
    }

    async fn read_status<S: BrowserSession>(
        &self,
        session: &S,
        fragment: &S::Element,
    ) -> Result<ProgressStatus> {
        let text = session.read_text(fragment).await?;
        let status = parse_progress(&text)?;
        self.progress.send_replace(status);
        Ok(status)
    }

    /// Drives the listing to `loaded >= total`.
    ///
    /// `status` is the progress fragment as first located; after every load
    /// request it is located again since the page replaces it.
    pub async fn run<S: BrowserSession>(
        &self,
        session: &S,
        status: &S::Element,
        container: &S::Element,
    ) -> Result<LoadOutcome> {
        let mut current = self.read_status(session, status).await?;
        let mut requests = 0;
        log::info!("Listing reports {}", current);

        while !current.is_complete() {
            if requests >= self.max_requests {
                return Err(Error::LoadLimit(requests));
            }

            session.send_key(container, self.key).await?;
            requests += 1;

            let rendered =
                wait_for_count_above(session, &self.items, current.loaded, self.load_timeout)
                    .await?;
            let fragment = session.wait_for(&self.status, self.status_timeout).await?;
            current = self.read_status(session, &fragment).await?;

            log::debug!(
                "Load request {}: {} items rendered, listing reports {}",
                requests,
                rendered,
                current
            );
        }

        log::info!("Listing fully loaded after {} load requests", requests);
        Ok(LoadOutcome {
            status: current,
            requests,
        })
    }
}
