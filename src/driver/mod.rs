// src/driver/mod.rs

pub mod scripted;
pub mod webdriver;

pub use crate::error::DriverError;
pub use scripted::{ScriptedDriver, Step};
pub use webdriver::WebDriverClient;

use std::time::Duration;

/// Handle to the chat input element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface(pub String);

/// Browser automation seen from the interaction protocol. Every call may fail;
/// the protocol counts any failure as a failed attempt.
pub trait ChatDriver {
    /// Navigates to `url`.
    fn open(&mut self, url: &str) -> Result<(), DriverError>;

    fn locate_input(&mut self) -> Result<Surface, DriverError>;

    /// Replaces whatever is in the input with `text`.
    fn set_value(&mut self, surface: &Surface, text: &str) -> Result<(), DriverError>;

    fn submit(&mut self, surface: &Surface) -> Result<(), DriverError>;

    /// Text of every rendered reply on the page, oldest first.
    fn rendered_responses(&mut self) -> Result<Vec<String>, DriverError>;

    fn refresh_page(&mut self) -> Result<(), DriverError>;

    fn wait_until_present(&mut self, locator: &str, timeout: Duration) -> Result<Surface, DriverError>;

    fn quit(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

impl<D: ChatDriver + ?Sized> ChatDriver for &mut D {
    fn open(&mut self, url: &str) -> Result<(), DriverError> {
        (**self).open(url)
    }

    fn locate_input(&mut self) -> Result<Surface, DriverError> {
        (**self).locate_input()
    }

    fn set_value(&mut self, surface: &Surface, text: &str) -> Result<(), DriverError> {
        (**self).set_value(surface, text)
    }

    fn submit(&mut self, surface: &Surface) -> Result<(), DriverError> {
        (**self).submit(surface)
    }

    fn rendered_responses(&mut self) -> Result<Vec<String>, DriverError> {
        (**self).rendered_responses()
    }

    fn refresh_page(&mut self) -> Result<(), DriverError> {
        (**self).refresh_page()
    }

    fn wait_until_present(&mut self, locator: &str, timeout: Duration) -> Result<Surface, DriverError> {
        (**self).wait_until_present(locator, timeout)
    }

    fn quit(&mut self) -> Result<(), DriverError> {
        (**self).quit()
    }
}
