use crate::session::Key;
use crate::urls::DEFAULT_SHELF;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_target", skip_on_field_errors = false))]
pub struct ShelfConfig {
    /// Review listing to scrape, e.g. `https://www.goodreads.com/review/list/<id>?shelf=read`
    #[serde(default)]
    pub listing_url: Option<String>,

    /// Profile to derive the listing from when `listing_url` is absent
    #[serde(default)]
    pub profile_url: Option<String>,

    #[serde(default = "default_shelf")]
    #[validate(length(min = 1))]
    pub shelf: String,

    #[serde(default = "default_webdriver_url")]
    #[validate(url)]
    pub webdriver_url: String,

    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default = "default_page_timeout")]
    #[validate(range(min = 1))]
    pub page_timeout_ms: u64,

    #[serde(default = "default_status_timeout")]
    #[validate(range(min = 1))]
    pub status_timeout_ms: u64,

    #[serde(default = "default_load_timeout")]
    #[validate(range(min = 1))]
    pub load_timeout_ms: u64,

    #[serde(default = "default_max_load_requests")]
    #[validate(range(min = 1))]
    pub max_load_requests: usize,

    #[serde(default)]
    pub overlay_offset: Offset,

    #[serde(default)]
    pub load_key: Key,

    #[serde(default)]
    pub output: Option<OutputConfig>,

    /// Optional path to a parent configuration file to inherit from
    #[serde(default)]
    pub extends: Option<String>,
}

/// Pointer offset clicked once after load to dismiss the sign-in overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    pub x: i64,
    pub y: i64,
}

impl Default for Offset {
    fn default() -> Self {
        Self { x: 10, y: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputConfig {
    Console,
    Json { path: String },
    Csv { path: String },
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            listing_url: None,
            profile_url: None,
            shelf: default_shelf(),
            webdriver_url: default_webdriver_url(),
            headless: default_headless(),
            page_timeout_ms: default_page_timeout(),
            status_timeout_ms: default_status_timeout(),
            load_timeout_ms: default_load_timeout(),
            max_load_requests: default_max_load_requests(),
            overlay_offset: Offset::default(),
            load_key: Key::default(),
            output: None,
            extends: None,
        }
    }
}

impl ShelfConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// The listing URL to scrape, derived from the profile when needed.
    pub fn target_url(&self) -> crate::error::Result<url::Url> {
        match (&self.listing_url, &self.profile_url) {
            (Some(listing), _) => crate::urls::validate_listing_url(listing),
            (None, Some(profile)) => crate::urls::listing_url_from_profile(profile, &self.shelf),
            (None, None) => Err(crate::error::Error::Config(
                "no listing_url or profile_url configured".to_string(),
            )),
        }
    }
}

fn validate_target(config: &ShelfConfig) -> Result<(), ValidationError> {
    match (&config.listing_url, &config.profile_url) {
        (Some(_), Some(_)) => Err(ValidationError::new("listing_url_and_profile_url")),
        (None, None) => Err(ValidationError::new("missing_target")),
        _ => Ok(()),
    }
}

pub(crate) fn default_shelf() -> String {
    DEFAULT_SHELF.to_string()
}

pub(crate) fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_headless() -> bool {
    true
}

pub(crate) fn default_page_timeout() -> u64 {
    10_000
}

pub(crate) fn default_status_timeout() -> u64 {
    5_000
}

pub(crate) fn default_load_timeout() -> u64 {
    10_000
}

pub(crate) fn default_max_load_requests() -> usize {
    1000
}
