use leafview_engine::POINTS_PER_INCH;

/// Zoom requested for the page view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Zoom {
    /// Fixed scale, 1.0 = actual size at device DPI.
    Scale(f32),
    /// Scale recomputed from the viewport so the page fills its width.
    FitWidth,
}

impl Default for Zoom {
    fn default() -> Self {
        Self::Scale(1.0)
    }
}

impl Zoom {
    /// Decodes the persisted float form, where a non-positive value means fit-width.
    pub fn from_legacy(factor: f32) -> Self {
        if factor.is_finite() && factor > 0.0 {
            Self::Scale(factor)
        } else {
            Self::FitWidth
        }
    }

    pub fn to_legacy(self) -> f32 {
        match self {
            Self::Scale(factor) => factor,
            Self::FitWidth => -1.0,
        }
    }

    /// Effective scale for a page `page_width_pt` wide shown in `viewport_width_px`.
    pub fn resolve(self, viewport_width_px: u32, page_width_pt: f32, dpi_x: f32) -> f32 {
        match self {
            Self::Scale(factor) if factor.is_finite() && factor > 0.0 => factor,
            _ => fit_width_scale(viewport_width_px as f32, page_width_pt, dpi_x),
        }
    }
}

pub fn fit_width_scale(viewport_width_px: f32, page_width_pt: f32, dpi_x: f32) -> f32 {
    if viewport_width_px <= 0.0 || page_width_pt <= 0.0 || dpi_x <= 0.0 {
        return 1.0;
    }

    viewport_width_px * POINTS_PER_INCH / (page_width_pt * dpi_x)
}
