//! Single-page view over a document: page, zoom and scroll state plus a
//! full-page bitmap cache.
//!
//! Rendering prefers the cache, since touch scrolling produces many draw
//! passes for the same page. When the page at the current zoom is too big
//! for a cache bitmap, only the visible window is drawn, straight into the
//! frame, on every pass.

use crate::events::{LoadState, PageChanged, RenderState, ViewEvents};
use crate::{ViewError, ViewResult, ViewerConfig, Zoom};
use image::{imageops, Rgba};
use leafview_engine::{
    try_alloc_bitmap, Document, EngineError, OpenSource, Passwords, RenderBackend, RgbaImage,
    SliceRect,
};
use std::fmt;

/// Fill behind and around the page.
pub const BACKGROUND: Rgba<u8> = Rgba([64, 64, 64, 255]);

/// Scroll position of the viewport's top-left corner in content pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Offset {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// How a render pass produced its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    NoDocument,
    /// Blitted from the existing cache.
    Cached,
    /// Cache (re)allocated, page drawn into it, then blitted.
    Rebuilt,
    /// Cache unavailable; visible window drawn directly.
    Sliced,
}

impl fmt::Display for RenderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoDocument => "no-document",
            Self::Cached => "cached",
            Self::Rebuilt => "rebuilt",
            Self::Sliced => "sliced",
        })
    }
}

pub struct PageView<B: RenderBackend> {
    backend: B,
    document: Option<Document<B::Session>>,
    cache: Option<RgbaImage>,
    current_page: u32,
    zoom: Zoom,
    offset: Offset,
    viewport: Size,
    dpi_x: f32,
    dpi_y: f32,
    cache_budget: u64,
    passwords: Passwords,
    events: ViewEvents,
}

impl<B: RenderBackend> PageView<B> {
    pub fn new(backend: B, config: &ViewerConfig) -> Self {
        Self {
            backend,
            document: None,
            cache: None,
            current_page: 1,
            zoom: config.zoom(),
            offset: Offset::default(),
            viewport: Size::new(config.viewport_width, config.viewport_height),
            dpi_x: config.dpi_x,
            dpi_y: config.dpi_y,
            cache_budget: config.cache_budget_bytes,
            passwords: Passwords::none(),
            events: ViewEvents::default(),
        }
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn events_mut(&mut self) -> &mut ViewEvents {
        &mut self.events
    }

    /// Passwords used by subsequent [`PageView::open`] calls.
    pub fn set_passwords(&mut self, passwords: Passwords) {
        self.passwords = passwords;
    }

    /// Replaces the current document with one opened from `source`.
    ///
    /// On failure the view is left without a document and the error is
    /// published on the error channel as well as returned.
    pub fn open(&mut self, source: OpenSource) -> ViewResult<()> {
        self.release_cache();
        self.document = None;
        self.current_page = 1;
        self.offset = Offset::default();

        self.events.load_state.emit(&LoadState::Started);

        let document = match Document::open(&self.backend, source, &self.passwords) {
            Ok(document) => document,
            Err(err) => {
                tracing::error!(error = %err, "failed to open document");
                return Err(self.fail_load(ViewError::Open(err)));
            }
        };

        if !document.is_ok() {
            tracing::error!("renderer rejected document");
            return Err(self.fail_load(ViewError::InvalidDocument));
        }

        tracing::debug!(page_count = document.page_count(), "document loaded");
        self.document = Some(document);
        self.events.load_state.emit(&LoadState::Finished);

        self.page_changed();
        Ok(())
    }

    fn fail_load(&mut self, err: ViewError) -> ViewError {
        self.events.error.emit(&err);
        self.events.load_state.emit(&LoadState::Finished);
        err
    }

    /// Drops the document and its cache.
    pub fn close(&mut self) {
        self.release_cache();
        self.document = None;
        self.current_page = 1;
        self.offset = Offset::default();
    }

    pub fn document(&self) -> Option<&Document<B::Session>> {
        self.document.as_ref()
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Page count of the open document, 1 without one.
    pub fn page_count(&self) -> u32 {
        self.document.as_ref().map(|document| document.page_count()).unwrap_or(1)
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn device_dpi(&self) -> (f32, f32) {
        (self.dpi_x, self.dpi_y)
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    pub fn next_page(&mut self) -> bool {
        let Some(page_count) = self.document.as_ref().map(|document| document.page_count()) else {
            return false;
        };

        if self.current_page >= page_count {
            return false;
        }

        self.current_page += 1;
        self.page_changed();
        true
    }

    pub fn prev_page(&mut self) -> bool {
        if self.document.is_none() || self.current_page <= 1 {
            return false;
        }

        self.current_page -= 1;
        self.page_changed();
        true
    }

    /// Jumps to `page`; ignored when already there or outside `[1, page_count]`.
    pub fn goto_page(&mut self, page: u32) -> bool {
        let Some(document) = &self.document else {
            return false;
        };

        if page == self.current_page || page == 0 || page > document.page_count() {
            return false;
        }

        self.current_page = page;
        self.page_changed();
        true
    }

    /// Changes the zoom. The scroll offset is kept and re-clamped on the
    /// next render.
    pub fn set_zoom(&mut self, zoom: Zoom) -> bool {
        if self.zoom == zoom {
            return false;
        }

        tracing::debug!(?zoom, "zoom changed");
        self.zoom = zoom;
        self.release_cache();
        true
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        let viewport = Size::new(width, height);
        if self.viewport != viewport {
            self.viewport = viewport;
            self.release_cache();
        }
    }

    pub fn set_device_dpi(&mut self, dpi_x: f32, dpi_y: f32) {
        if self.dpi_x != dpi_x || self.dpi_y != dpi_y {
            self.dpi_x = dpi_x;
            self.dpi_y = dpi_y;
            self.release_cache();
        }
    }

    /// Scale actually applied to the current page.
    pub fn effective_zoom(&self) -> f32 {
        let Some(document) = &self.document else {
            return 1.0;
        };

        let page_width_pt =
            document.page_extent_pt(self.current_page).map(|(width, _)| width).unwrap_or(0.0);
        self.zoom.resolve(self.viewport.width, page_width_pt, self.dpi_x)
    }

    /// Pixel size of the current page at device DPI and effective zoom.
    pub fn content_size(&self) -> Size {
        let Some(document) = &self.document else {
            return Size::default();
        };

        let zoom = self.effective_zoom();
        document
            .page_pixel_size_at(self.current_page, self.dpi_x * zoom, self.dpi_y * zoom)
            .map(|(width, height)| Size::new(width, height))
            .unwrap_or_default()
    }

    /// Clamps each offset axis to `[0, max(0, content - viewport)]`.
    pub fn clamp_offset(&mut self) {
        if self.document.is_none() {
            return;
        }

        let content = self.content_size();
        let max_x = i64::from(content.width.saturating_sub(self.viewport.width));
        let max_y = i64::from(content.height.saturating_sub(self.viewport.height));

        self.offset.x = self.offset.x.clamp(0, max_x);
        self.offset.y = self.offset.y.clamp(0, max_y);
    }

    /// Moves the viewport by a drag distance.
    pub fn scroll_by(&mut self, dx: i64, dy: i64) -> bool {
        if self.document.is_none() {
            return false;
        }

        let before = self.offset;
        self.offset.x = self.offset.x.saturating_add(dx);
        self.offset.y = self.offset.y.saturating_add(dy);
        self.clamp_offset();

        self.offset != before
    }

    /// Draws the visible part of the current page into `frame`.
    ///
    /// The frame's dimensions become the viewport.
    pub fn render(&mut self, frame: &mut RgbaImage) -> ViewResult<RenderOutcome> {
        if self.document.is_none() {
            return Ok(RenderOutcome::NoDocument);
        }

        self.set_viewport(frame.width(), frame.height());
        self.events.render_state.emit(&RenderState::Started);

        let zoom = self.effective_zoom();
        let (dpi_x, dpi_y) = (self.dpi_x * zoom, self.dpi_y * zoom);
        if let Some(document) = self.document.as_mut() {
            document.set_dpi(dpi_x, dpi_y);
        }

        self.clamp_offset();

        for pixel in frame.pixels_mut() {
            *pixel = BACKGROUND;
        }

        let result = self.draw(frame);
        self.events.render_state.emit(&RenderState::Finished);

        result.map_err(|source| {
            tracing::error!(page = self.current_page, error = %source, "render failed");
            let err = ViewError::Render { page: self.current_page, source };
            self.events.error.emit(&err);
            err
        })
    }

    fn draw(&mut self, frame: &mut RgbaImage) -> Result<RenderOutcome, EngineError> {
        let content = self.content_size();
        let (x, y) = (self.offset.x, self.offset.y);

        let cache_fits = matches!(
            &self.cache,
            Some(cache) if cache.dimensions() == (content.width, content.height)
        );
        if cache_fits {
            if let Some(cache) = &self.cache {
                imageops::replace(frame, cache, -x, -y);
            }
            return Ok(RenderOutcome::Cached);
        }

        self.release_cache();

        let Some(document) = &self.document else {
            return Ok(RenderOutcome::NoDocument);
        };

        match try_alloc_bitmap(content.width, content.height, self.cache_budget) {
            Ok(mut bitmap) => {
                document.draw_page(&mut bitmap, self.current_page)?;
                imageops::replace(frame, &bitmap, -x, -y);

                tracing::debug!(
                    page = self.current_page,
                    width = content.width,
                    height = content.height,
                    "page cache rebuilt"
                );
                self.cache = Some(bitmap);
                Ok(RenderOutcome::Rebuilt)
            }
            Err(err) => {
                tracing::warn!(
                    page = self.current_page,
                    error = %err,
                    "page cache unavailable, drawing visible slice"
                );

                let slice =
                    SliceRect::new(x as u32, y as u32, self.viewport.width, self.viewport.height);
                document.draw_page_slice(frame, self.current_page, slice)?;
                Ok(RenderOutcome::Sliced)
            }
        }
    }

    fn page_changed(&mut self) {
        let event = PageChanged { page: self.current_page, page_count: self.page_count() };
        tracing::debug!(page = event.page, page_count = event.page_count, "page changed");

        self.events.page_changed.emit(&event);
        self.offset = Offset::default();
        self.release_cache();
    }

    fn release_cache(&mut self) {
        if self.cache.take().is_some() {
            tracing::trace!("page cache released");
        }
    }
}
