//! Live browser session over a WebDriver endpoint (chromedriver, geckodriver).

use super::{BrowserSession, Key};
use crate::error::{Error, Result};
use crate::locator::Locator;
use async_trait::async_trait;
use fantoccini::actions::{InputSource, MouseActions, PointerAction, MOUSE_BUTTON_LEFT};
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::time::Duration;

const RAW_TEXT_SCRIPT: &str = "return arguments[0].textContent.trim();";

pub struct WebDriverSession {
    client: Client,
}

impl WebDriverSession {
    pub async fn connect(webdriver_url: &str, headless: bool) -> Result<Self> {
        let mut caps = serde_json::map::Map::new();
        if headless {
            caps.insert(
                "goog:chromeOptions".to_string(),
                json!({
                    "args": [
                        "--headless=new",
                        "--disable-gpu",
                        "--no-sandbox",
                        "--disable-dev-shm-usage",
                    ]
                }),
            );
            caps.insert(
                "moz:firefoxOptions".to_string(),
                json!({ "args": ["-headless"] }),
            );
        }

        log::info!("Connecting to WebDriver at {}", webdriver_url);
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(webdriver_url)
            .await?;

        Ok(Self { client })
    }
}

fn lookup_error(locator: &Locator, err: CmdError) -> Error {
    if err.is_no_such_element() || matches!(err, CmdError::WaitTimeout) {
        Error::ElementNotFound(locator.to_css_string())
    } else {
        Error::WebDriver(err)
    }
}

fn key_text(key: Key) -> String {
    let key = match key {
        Key::End => fantoccini::key::Key::End,
        Key::PageDown => fantoccini::key::Key::PageDown,
    };
    char::from(key).to_string()
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<()> {
        log::info!("Visiting: {}", url);
        self.client.goto(url).await?;
        Ok(())
    }

    async fn find_one(&self, locator: &Locator) -> Result<Element> {
        let css = locator.to_css_string();
        self.client
            .find(fantoccini::Locator::Css(&css))
            .await
            .map_err(|e| lookup_error(locator, e))
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Element>> {
        let css = locator.to_css_string();
        Ok(self.client.find_all(fantoccini::Locator::Css(&css)).await?)
    }

    async fn find_within(&self, scope: &Element, locator: &Locator) -> Result<Element> {
        let css = locator.to_css_string();
        scope
            .find(fantoccini::Locator::Css(&css))
            .await
            .map_err(|e| lookup_error(locator, e))
    }

    async fn read_text(&self, element: &Element) -> Result<String> {
        Ok(element.text().await?)
    }

    async fn read_raw_text(&self, element: &Element) -> Result<String> {
        let args = vec![serde_json::to_value(element)?];
        let value = self.client.execute(RAW_TEXT_SCRIPT, args).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    // Property first so `href` comes back absolute, attribute as fallback.
    async fn read_attribute(&self, element: &Element, name: &str) -> Result<Option<String>> {
        if let Some(value) = element.prop(name).await? {
            return Ok(Some(value));
        }
        Ok(element.attr(name).await?)
    }

    async fn send_key(&self, element: &Element, key: Key) -> Result<()> {
        element.send_keys(&key_text(key)).await?;
        Ok(())
    }

    async fn click_at_offset(&self, x: i64, y: i64) -> Result<()> {
        let mouse = MouseActions::new("mouse".to_string())
            .then(PointerAction::MoveBy {
                duration: None,
                x,
                y,
            })
            .then(PointerAction::Down {
                button: MOUSE_BUTTON_LEFT,
            })
            .then(PointerAction::Up {
                button: MOUSE_BUTTON_LEFT,
            });
        self.client.perform_actions(mouse).await?;
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<Element> {
        let css = locator.to_css_string();
        self.client
            .wait()
            .at_most(timeout)
            .for_element(fantoccini::Locator::Css(&css))
            .await
            .map_err(|e| lookup_error(locator, e))
    }

    async fn close(self) -> Result<()> {
        log::debug!("Closing WebDriver session");
        self.client.close().await?;
        Ok(())
    }
}
