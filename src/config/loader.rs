use crate::config::schema::{
    default_load_timeout, default_max_load_requests, default_page_timeout, default_shelf,
    default_status_timeout, default_webdriver_url, Offset, OutputConfig, ShelfConfig,
};
use crate::error::{Error, Result};
use crate::session::Key;
use crate::urls;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use validator::Validate;

/// Values given on the command line; they win over file values.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Listing or profile URL
    pub url: Option<String>,
    pub shelf: Option<String>,
    pub webdriver_url: Option<String>,
    pub headless: Option<bool>,
    pub output: Option<OutputConfig>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ShelfConfig> {
        let config = Self::load_unvalidated(path.as_ref())?;
        Self::validate(config)
    }

    /// Loads `path` (if any), applies `overrides`, then validates the result.
    pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<ShelfConfig> {
        let base = match path {
            Some(path) => Self::load_unvalidated(path)?,
            None => ShelfConfig::default(),
        };
        Self::validate(Self::apply_overrides(base, overrides))
    }

    fn validate(config: ShelfConfig) -> Result<ShelfConfig> {
        config.validate().map_err(Error::Validation)?;
        Ok(config)
    }

    fn load_unvalidated(path: &Path) -> Result<ShelfConfig> {
        let mut visited = HashSet::new();
        Self::load_with_inheritance(path, &mut visited)
    }

    fn load_with_inheritance(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<ShelfConfig> {
        let path = fs::canonicalize(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        if visited.contains(&path) {
            return Err(Error::Config(format!(
                "Circular inheritance detected involving {}",
                path.display()
            )));
        }
        visited.insert(path.clone());

        let config = Self::load_file(&path)?;

        if let Some(parent_path_str) = &config.extends {
            let parent_path = path
                .parent()
                .ok_or_else(|| {
                    Error::Config(format!(
                        "Cannot determine parent directory for {}",
                        path.display()
                    ))
                })?
                .join(parent_path_str);

            let parent_config = Self::load_with_inheritance(&parent_path, visited)?;
            Ok(Self::merge_configs(parent_config, config))
        } else {
            Ok(config)
        }
    }

    fn load_file(path: &Path) -> Result<ShelfConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            Some("toml") => Ok(toml::from_str(&content)?),
            _ => Err(Error::Config(format!(
                "Unsupported file extension: {}",
                path.display()
            ))),
        }
    }

    // A child value equal to the default is treated as "not set".
    fn merge_configs(mut parent: ShelfConfig, child: ShelfConfig) -> ShelfConfig {
        if child.listing_url.is_some() || child.profile_url.is_some() {
            parent.listing_url = child.listing_url;
            parent.profile_url = child.profile_url;
        }
        if child.shelf != default_shelf() {
            parent.shelf = child.shelf;
        }
        if child.webdriver_url != default_webdriver_url() {
            parent.webdriver_url = child.webdriver_url;
        }
        if !child.headless {
            parent.headless = false;
        }
        if child.page_timeout_ms != default_page_timeout() {
            parent.page_timeout_ms = child.page_timeout_ms;
        }
        if child.status_timeout_ms != default_status_timeout() {
            parent.status_timeout_ms = child.status_timeout_ms;
        }
        if child.load_timeout_ms != default_load_timeout() {
            parent.load_timeout_ms = child.load_timeout_ms;
        }
        if child.max_load_requests != default_max_load_requests() {
            parent.max_load_requests = child.max_load_requests;
        }
        if child.overlay_offset != Offset::default() {
            parent.overlay_offset = child.overlay_offset;
        }
        if child.load_key != Key::default() {
            parent.load_key = child.load_key;
        }
        if child.output.is_some() {
            parent.output = child.output;
        }

        parent.extends = None;
        parent
    }

    fn apply_overrides(mut config: ShelfConfig, overrides: &ConfigOverrides) -> ShelfConfig {
        if let Some(shelf) = &overrides.shelf {
            config.shelf = shelf.clone();
        }
        if let Some(url) = &overrides.url {
            if urls::is_profile_url(url) {
                config.profile_url = Some(url.clone());
                config.listing_url = None;
            } else {
                config.listing_url = Some(url.clone());
                config.profile_url = None;
            }
        }
        if let Some(webdriver_url) = &overrides.webdriver_url {
            config.webdriver_url = webdriver_url.clone();
        }
        if let Some(headless) = overrides.headless {
            config.headless = headless;
        }
        if let Some(output) = &overrides.output {
            config.output = Some(output.clone());
        }
        config
    }
}
