//! Page view state machine, observation channels and the headless
//! controller that drives them.

mod config;
mod controller;
mod error;
pub mod events;
mod picker;
mod view;
mod zoom;

#[cfg(test)]
mod testing;

pub use config::{SavedView, ViewerConfig};
pub use controller::{parse_script, Command, ToolbarState, ViewerController, ZoomPreset};
pub use error::{ViewError, ViewResult};
pub use events::{Channel, LoadState, PageChanged, RenderState, SubscriptionId, ViewEvents};
pub use picker::PagePicker;
pub use view::{Offset, PageView, RenderOutcome, Size, BACKGROUND};
pub use zoom::{fit_width_scale, Zoom};
