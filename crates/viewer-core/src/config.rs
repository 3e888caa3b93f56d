use crate::Zoom;
use serde::{Deserialize, Serialize};

/// Host metrics and limits for a page view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub dpi_x: f32,
    pub dpi_y: f32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Largest page cache bitmap, in bytes, before falling back to slices.
    pub cache_budget_bytes: u64,
    /// Initial zoom; non-positive means fit-width.
    pub default_zoom: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            dpi_x: 160.0,
            dpi_y: 160.0,
            viewport_width: 480,
            viewport_height: 800,
            cache_budget_bytes: 64 * 1024 * 1024, // 64 MB
            default_zoom: 0.0,
        }
    }
}

impl ViewerConfig {
    pub fn zoom(&self) -> Zoom {
        Zoom::from_legacy(self.default_zoom)
    }
}

/// View state kept across suspend/resume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedView {
    pub page: u32,
    /// Scale, or a non-positive value for fit-width.
    pub zoom: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let json = r#"{ "dpi_x": 96.0, "cache_budget_bytes": 1024 }"#;
        let config: ViewerConfig = serde_json::from_str(json).expect("parse");

        assert_eq!(config.dpi_x, 96.0);
        assert_eq!(config.dpi_y, 160.0);
        assert_eq!(config.cache_budget_bytes, 1024);
        assert_eq!(config.zoom(), Zoom::FitWidth);
    }
}
