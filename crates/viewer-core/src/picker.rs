use crate::{ViewError, ViewResult};
use std::fmt;

type AcceptCallback = Box<dyn FnMut(u32)>;

/// Bounded page number selector, `[1, max]`.
pub struct PagePicker {
    max: u32,
    current: u32,
    on_accept: Option<AcceptCallback>,
}

impl Default for PagePicker {
    fn default() -> Self {
        Self { max: 1, current: 1, on_accept: None }
    }
}

impl fmt::Debug for PagePicker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagePicker")
            .field("max", &self.max)
            .field("current", &self.current)
            .field("on_accept", &self.on_accept.is_some())
            .finish()
    }
}

impl PagePicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn set_max(&mut self, max: i64) -> ViewResult<()> {
        let max = u32::try_from(max)
            .ok()
            .filter(|max| *max >= 1)
            .ok_or(ViewError::InvalidArgument { what: "page picker maximum", value: max })?;

        self.max = max;
        self.current = self.current.min(max);
        Ok(())
    }

    pub fn set_current(&mut self, current: i64) -> ViewResult<()> {
        if current < 1 || current > i64::from(self.max) {
            return Err(ViewError::InvalidArgument { what: "page", value: current });
        }

        self.current = current as u32;
        Ok(())
    }

    pub fn increment(&mut self) -> u32 {
        self.current = self.current.saturating_add(1).min(self.max);
        self.current
    }

    pub fn decrement(&mut self) -> u32 {
        self.current = self.current.saturating_sub(1).max(1);
        self.current
    }

    /// Text shown next to the scrubber.
    pub fn message(&self) -> String {
        format!("{}/{}", self.current, self.max)
    }

    pub fn on_accept<F>(&mut self, callback: F)
    where
        F: FnMut(u32) + 'static,
    {
        self.on_accept = Some(Box::new(callback));
    }

    /// Confirms the selection, notifying the accept callback.
    pub fn accept(&mut self) -> u32 {
        let page = self.current;
        if let Some(callback) = self.on_accept.as_mut() {
            callback(page);
        }
        page
    }
}
