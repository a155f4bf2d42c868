// src/driver/webdriver.rs

use crate::context::RunConfig;
use crate::driver::{ChatDriver, DriverError, Surface};
use reqwest::Method;
use reqwest::blocking::Client;
use serde_json::{Value, json};
use std::time::{Duration, Instant};

/// W3C key code for Enter.
const ENTER: &str = "\u{E007}";
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const WAIT_STEP: Duration = Duration::from_millis(250);

/// Talks to a W3C WebDriver endpoint (chromedriver, geckodriver, ...).
pub struct WebDriverClient {
    client: Client,
    base: String,
    session_id: Option<String>,
    input_selector: String,
    response_selector: String,
    input_timeout: Duration,
}

impl WebDriverClient {
    /// Starts a new browser session.
    pub fn connect(config: &RunConfig) -> Result<Self, DriverError> {
        let mut driver = Self {
            client: Client::new(),
            base: config.webdriver_url.trim_end_matches('/').to_string(),
            session_id: None,
            input_selector: config.input_selector.clone(),
            response_selector: config.response_selector.clone(),
            input_timeout: config.protocol.input_timeout(),
        };

        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": config.browser,
                    "goog:chromeOptions": {
                        "args": config.browser_args,
                        "excludeSwitches": ["enable-logging"]
                    }
                }
            }
        });
        let value = driver.command(Method::POST, "/session", Some(capabilities))?;
        let session_id = value
            .get("sessionId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| protocol_error("new session", "reply has no sessionId"))?;

        tracing::info!(session = session_id, url = %driver.base, "webdriver session started");
        driver.session_id = Some(session_id.to_string());
        Ok(driver)
    }

    fn session_path(&self, suffix: &str) -> Result<String, DriverError> {
        let id = self.session_id.as_deref().ok_or(DriverError::Closed)?;
        Ok(format!("/session/{id}{suffix}"))
    }

    /// Sends one command and returns the `value` member of the reply.
    fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, DriverError> {
        let url = format!("{}{}", self.base, path);
        let request = self.client.request(method.clone(), &url);
        let request = match body {
            Some(body) => request.json(&body),
            None => request,
        };

        let reply: Value = request.send()?.json()?;
        let value = reply.get("value").cloned().unwrap_or(Value::Null);

        if let Some(error) = value.get("error").and_then(|v| v.as_str()) {
            let message = value
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            if error == "no such element" {
                return Err(DriverError::ElementNotFound(message.to_string()));
            }
            return Err(protocol_error(&format!("{method} {path}"), &format!("{error}: {message}")));
        }
        Ok(value)
    }

    fn find_element(&self, selector: &str) -> Result<Surface, DriverError> {
        let path = self.session_path("/element")?;
        let value = self.command(
            Method::POST,
            &path,
            Some(json!({ "using": "css selector", "value": selector })),
        )?;
        element_id(&value)
            .map(Surface)
            .ok_or_else(|| DriverError::ElementNotFound(selector.to_string()))
    }

    fn element_text(&self, element: &str) -> Result<String, DriverError> {
        let path = self.session_path(&format!("/element/{element}/text"))?;
        let value = self.command(Method::GET, &path, None)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}

fn element_id(value: &Value) -> Option<String> {
    value.get(ELEMENT_KEY).and_then(|v| v.as_str()).map(str::to_string)
}

fn protocol_error(command: &str, message: &str) -> DriverError {
    DriverError::Protocol {
        command: command.to_string(),
        message: message.to_string(),
    }
}

impl ChatDriver for WebDriverClient {
    fn open(&mut self, url: &str) -> Result<(), DriverError> {
        let path = self.session_path("/url")?;
        self.command(Method::POST, &path, Some(json!({ "url": url })))?;
        Ok(())
    }

    fn locate_input(&mut self) -> Result<Surface, DriverError> {
        let selector = self.input_selector.clone();
        self.wait_until_present(&selector, self.input_timeout)
    }

    fn set_value(&mut self, surface: &Surface, text: &str) -> Result<(), DriverError> {
        let element = json!({ ELEMENT_KEY: surface.0 });
        let path = self.session_path("/execute/sync")?;
        self.command(
            Method::POST,
            &path,
            Some(json!({
                "script": "arguments[0].value = ''; if (arguments[0].isContentEditable) { arguments[0].textContent = ''; }",
                "args": [element]
            })),
        )?;

        let path = self.session_path(&format!("/element/{}/value", surface.0))?;
        self.command(Method::POST, &path, Some(json!({ "text": text })))?;
        Ok(())
    }

    fn submit(&mut self, surface: &Surface) -> Result<(), DriverError> {
        let path = self.session_path(&format!("/element/{}/value", surface.0))?;
        self.command(Method::POST, &path, Some(json!({ "text": ENTER })))?;
        Ok(())
    }

    fn rendered_responses(&mut self) -> Result<Vec<String>, DriverError> {
        let path = self.session_path("/elements")?;
        let value = self.command(
            Method::POST,
            &path,
            Some(json!({ "using": "css selector", "value": self.response_selector })),
        )?;

        let ids: Vec<String> = value
            .as_array()
            .map(|items| items.iter().filter_map(element_id).collect())
            .unwrap_or_default();

        ids.iter().map(|id| self.element_text(id)).collect()
    }

    fn refresh_page(&mut self) -> Result<(), DriverError> {
        let path = self.session_path("/refresh")?;
        self.command(Method::POST, &path, Some(json!({})))?;
        Ok(())
    }

    fn wait_until_present(&mut self, locator: &str, timeout: Duration) -> Result<Surface, DriverError> {
        let started = Instant::now();
        loop {
            match self.find_element(locator) {
                Ok(surface) => return Ok(surface),
                Err(DriverError::ElementNotFound(_)) if started.elapsed() < timeout => {
                    std::thread::sleep(WAIT_STEP);
                }
                Err(DriverError::ElementNotFound(_)) => {
                    return Err(DriverError::WaitTimeout {
                        locator: locator.to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn quit(&mut self) -> Result<(), DriverError> {
        let path = self.session_path("")?;
        self.command(Method::DELETE, &path, None)?;
        tracing::info!("webdriver session closed");
        self.session_id = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_w3c_element_reference() {
        let value = json!({ ELEMENT_KEY: "abc-123" });
        assert_eq!(element_id(&value), Some("abc-123".into()));
        assert_eq!(element_id(&json!({ "ELEMENT": "legacy" })), None);
    }

    #[test]
    fn commands_after_quit_are_refused() {
        let driver = WebDriverClient {
            client: Client::new(),
            base: "http://localhost:1".into(),
            session_id: None,
            input_selector: "#prompt-textarea".into(),
            response_selector: ".markdown".into(),
            input_timeout: Duration::ZERO,
        };
        assert!(matches!(driver.session_path("/url"), Err(DriverError::Closed)));
    }
}
