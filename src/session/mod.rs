//! Browsing-session capability.
//!
//! The scraper never talks to a browser directly; it drives a
//! [`BrowserSession`]. Two backends exist: a live WebDriver client and an
//! in-memory snapshot document used for offline extraction and tests.

pub mod snapshot;
pub mod webdriver;

use crate::error::{Error, Result};
use crate::locator::Locator;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep, Instant};

pub use snapshot::{SnapshotElement, SnapshotCounters, SnapshotSession};
pub use webdriver::WebDriverSession;

/// Interval between polls in the generic bounded waits.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Keys the scraper may send to trigger lazy loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    #[default]
    End,
    PageDown,
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Element: Clone + Send + Sync;

    async fn navigate(&self, url: &str) -> Result<()>;

    /// First element matching `locator`, or `ElementNotFound`.
    async fn find_one(&self, locator: &Locator) -> Result<Self::Element>;

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Self::Element>>;

    async fn find_within(&self, scope: &Self::Element, locator: &Locator) -> Result<Self::Element>;

    /// Rendered text, honouring display rules.
    async fn read_text(&self, element: &Self::Element) -> Result<String>;

    /// Full `textContent`, trimmed, including content hidden from rendering.
    async fn read_raw_text(&self, element: &Self::Element) -> Result<String>;

    async fn read_attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    async fn send_key(&self, element: &Self::Element, key: Key) -> Result<()>;

    /// Pointer move by `(x, y)` from the origin followed by a left click.
    async fn click_at_offset(&self, x: i64, y: i64) -> Result<()>;

    /// Polls for `locator` until it appears or `timeout` elapses.
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<Self::Element> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find_one(locator).await {
                Ok(element) => return Ok(element),
                Err(Error::ElementNotFound(_)) if Instant::now() < deadline => {
                    sleep(POLL_INTERVAL).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Ends the session. Consumes it so it can only happen once.
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Blocks until more than `floor` elements match `locator`.
///
/// Returns the observed count, or `StallTimeout` once `timeout` elapses
/// without growth.
pub async fn wait_for_count_above<S: BrowserSession>(
    session: &S,
    locator: &Locator,
    floor: usize,
    timeout: Duration,
) -> Result<usize> {
    let start = Instant::now();
    loop {
        let count = session.find_all(locator).await?.len();
        if count > floor {
            return Ok(count);
        }
        if start.elapsed() >= timeout {
            return Err(Error::StallTimeout {
                loaded: count,
                waited_ms: timeout.as_millis() as u64,
            });
        }
        sleep(POLL_INTERVAL.min(timeout)).await;
    }
}
