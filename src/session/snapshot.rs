//! In-memory session over saved page snapshots.
//!
//! Each snapshot is a complete HTML document. Navigation shows the first
//! one; every key press advances to the next, which is how a lazily
//! loading listing looks from the outside. Handles obtained before an
//! advance are stale afterwards.

use super::{BrowserSession, Key};
use crate::error::{Error, Result};
use crate::locator::Locator;
use async_trait::async_trait;
use select::document::Document;
use select::node::Node;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotElement {
    generation: u64,
    node: usize,
}

/// Counters shared with the session, readable after the session is consumed.
#[derive(Debug, Default)]
pub struct SnapshotCounters {
    keys_sent: AtomicUsize,
    clicks: AtomicUsize,
    closed: AtomicBool,
}

impl SnapshotCounters {
    pub fn keys_sent(&self) -> usize {
        self.keys_sent.load(Ordering::SeqCst)
    }

    pub fn clicks(&self) -> usize {
        self.clicks.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct SnapshotState {
    current: Option<usize>,
    generation: u64,
}

pub struct SnapshotSession {
    snapshots: Vec<String>,
    state: Mutex<SnapshotState>,
    counters: Arc<SnapshotCounters>,
    fail_clicks: bool,
    fail_close: bool,
}

impl SnapshotSession {
    pub fn new(snapshots: Vec<String>) -> Self {
        Self {
            snapshots,
            state: Mutex::new(SnapshotState::default()),
            counters: Arc::new(SnapshotCounters::default()),
            fail_clicks: false,
            fail_close: false,
        }
    }

    /// Pointer clicks are counted and then rejected, as when the click
    /// target is gone or covered.
    pub fn fail_clicks(mut self) -> Self {
        self.fail_clicks = true;
        self
    }

    /// `close` is recorded and then reported as failed.
    pub fn fail_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let snapshots = paths
            .iter()
            .map(|p| {
                std::fs::read_to_string(p.as_ref())
                    .map_err(|e| Error::Config(format!("{}: {}", p.as_ref().display(), e)))
            })
            .collect::<Result<Vec<_>>>()?;
        if snapshots.is_empty() {
            return Err(Error::Config("No snapshot files given".to_string()));
        }
        Ok(Self::new(snapshots))
    }

    pub fn counters(&self) -> Arc<SnapshotCounters> {
        self.counters.clone()
    }

    /// Index of the snapshot currently shown, if a page has been loaded.
    pub fn current_snapshot(&self) -> Option<usize> {
        self.lock_state().ok().and_then(|s| s.current)
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, SnapshotState>> {
        self.state
            .lock()
            .map_err(|_| Error::Internal("snapshot state poisoned".to_string()))
    }

    fn with_document<T>(&self, f: impl FnOnce(&Document, u64) -> Result<T>) -> Result<T> {
        let state = self.lock_state()?;
        let index = state
            .current
            .ok_or_else(|| Error::Internal("no page loaded".to_string()))?;
        let doc = Document::from(self.snapshots[index].as_str());
        f(&doc, state.generation)
    }

    fn with_node<T>(
        &self,
        element: &SnapshotElement,
        f: impl FnOnce(Node<'_>, u64) -> Result<T>,
    ) -> Result<T> {
        self.with_document(|doc, generation| {
            let node = resolve(doc, generation, element)?;
            f(node, generation)
        })
    }
}

fn resolve<'a>(doc: &'a Document, generation: u64, element: &SnapshotElement) -> Result<Node<'a>> {
    if element.generation != generation {
        return Err(Error::StaleElement(format!(
            "node {} belongs to an earlier page state",
            element.node
        )));
    }
    doc.nth(element.node)
        .ok_or_else(|| Error::StaleElement(format!("node {} no longer exists", element.node)))
}

fn handle(node: Node<'_>, generation: u64) -> SnapshotElement {
    SnapshotElement {
        generation,
        node: node.index(),
    }
}

fn is_hidden(node: &Node<'_>) -> bool {
    if matches!(node.name(), Some("script") | Some("style") | Some("template")) {
        return true;
    }
    if node.attr("hidden").is_some() {
        return true;
    }
    node.attr("style")
        .map(|style| {
            let compact: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            compact.contains("display:none") || compact.contains("visibility:hidden")
        })
        .unwrap_or(false)
}

fn collect_visible(node: Node<'_>, out: &mut String) {
    if let Some(text) = node.as_text() {
        out.push_str(text);
        return;
    }
    if is_hidden(&node) {
        return;
    }
    for child in node.children() {
        collect_visible(child, out);
    }
}

/// Text as a renderer would show it: hidden subtrees dropped, whitespace collapsed.
fn visible_text(node: Node<'_>) -> String {
    if is_hidden(&node) {
        return String::new();
    }
    let mut raw = String::new();
    collect_visible(node, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl BrowserSession for SnapshotSession {
    type Element = SnapshotElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        if self.snapshots.is_empty() {
            return Err(Error::Internal("snapshot session has no pages".to_string()));
        }
        let mut state = self.lock_state()?;
        state.current = Some(0);
        state.generation += 1;
        log::debug!("Snapshot session showing page 1/{} for {}", self.snapshots.len(), url);
        Ok(())
    }

    async fn find_one(&self, locator: &Locator) -> Result<SnapshotElement> {
        self.with_document(|doc, generation| {
            doc.find(locator)
                .next()
                .map(|n| handle(n, generation))
                .ok_or_else(|| Error::ElementNotFound(locator.to_css_string()))
        })
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<SnapshotElement>> {
        self.with_document(|doc, generation| {
            Ok(doc.find(locator).map(|n| handle(n, generation)).collect())
        })
    }

    async fn find_within(&self, scope: &SnapshotElement, locator: &Locator) -> Result<SnapshotElement> {
        self.with_node(scope, |node, generation| {
            node.find(locator.within(&node))
                .next()
                .map(|n| handle(n, generation))
                .ok_or_else(|| Error::ElementNotFound(locator.to_css_string()))
        })
    }

    async fn read_text(&self, element: &SnapshotElement) -> Result<String> {
        self.with_node(element, |node, _| Ok(visible_text(node)))
    }

    async fn read_raw_text(&self, element: &SnapshotElement) -> Result<String> {
        self.with_node(element, |node, _| Ok(node.text().trim().to_string()))
    }

    async fn read_attribute(&self, element: &SnapshotElement, name: &str) -> Result<Option<String>> {
        self.with_node(element, |node, _| Ok(node.attr(name).map(str::to_string)))
    }

    // Key events go to the document, so the target handle is not checked for staleness.
    async fn send_key(&self, _element: &SnapshotElement, key: Key) -> Result<()> {
        let mut state = self.lock_state()?;
        self.counters.keys_sent.fetch_add(1, Ordering::SeqCst);
        if let Some(current) = state.current {
            if current + 1 < self.snapshots.len() {
                state.current = Some(current + 1);
                state.generation += 1;
                log::debug!("{:?} advanced snapshot to page {}", key, current + 2);
            }
        }
        Ok(())
    }

    async fn click_at_offset(&self, x: i64, y: i64) -> Result<()> {
        self.counters.clicks.fetch_add(1, Ordering::SeqCst);
        if self.fail_clicks {
            return Err(Error::Internal(format!("click at ({}, {}) rejected", x, y)));
        }
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.counters.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            return Err(Error::Internal("snapshot session already torn down".to_string()));
        }
        Ok(())
    }
}
