//! Backend over the system pdfium library.

use crate::{
    normalize_rotation, page_index, EngineError, OpenSource, PageGeometry, Passwords,
    RasterRequest, RenderBackend, RenderSession, RgbaImage, SliceRect,
};
use image::imageops;
use pdfium_render::prelude::*;

pub struct PdfiumBackend {
    pdfium: &'static Pdfium,
}

impl PdfiumBackend {
    /// Binds pdfium from the executable directory, the working directory,
    /// then the system library paths.
    pub fn from_system_library() -> Result<Self, EngineError> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|path| path.parent().map(|dir| dir.to_path_buf()));

        let bindings = exe_dir
            .and_then(|dir| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir)).ok()
            })
            .map(Ok)
            .unwrap_or_else(|| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                    .or_else(|_| Pdfium::bind_to_system_library())
            })
            .map_err(|err| {
                EngineError::Backend(format!("failed to bind pdfium system library: {err}"))
            })?;

        // Documents borrow the library for their whole life; one instance per process.
        let pdfium: &'static Pdfium = Box::leak(Box::new(Pdfium::new(bindings)));

        Ok(Self { pdfium })
    }
}

fn backend_error(err: PdfiumError) -> EngineError {
    EngineError::Backend(err.to_string())
}

impl RenderBackend for PdfiumBackend {
    type Session = PdfiumSession;

    fn open(
        &self,
        source: OpenSource,
        passwords: &Passwords,
    ) -> Result<PdfiumSession, EngineError> {
        let bytes = source.read()?;
        let document = self
            .pdfium
            .load_pdf_from_byte_vec(bytes, passwords.preferred())
            .map_err(backend_error)?;

        let mut pages = Vec::new();
        for page in document.pages().iter() {
            // `width()`/`height()` report the cropped, rotated display size; geometry keeps
            // the raw boxes and applies `/Rotate` in `PageGeometry::extent_pt`.
            let boundaries = page.boundaries();
            let (media_width_pt, media_height_pt) = boundaries
                .media()
                .map(|boundary| (boundary.bounds.width().value, boundary.bounds.height().value))
                .map_err(backend_error)?;
            let (crop_width_pt, crop_height_pt) = boundaries
                .crop()
                .map(|boundary| (boundary.bounds.width().value, boundary.bounds.height().value))
                .unwrap_or((media_width_pt, media_height_pt));
            let rotation = match page.rotation() {
                Ok(PdfPageRenderRotation::Degrees90) => 90,
                Ok(PdfPageRenderRotation::Degrees180) => 180,
                Ok(PdfPageRenderRotation::Degrees270) => 270,
                _ => 0,
            };

            pages.push(PageGeometry {
                media_width_pt,
                media_height_pt,
                crop_width_pt,
                crop_height_pt,
                rotation: normalize_rotation(rotation),
            });
        }

        Ok(PdfiumSession { pdfium: self.pdfium, document, pages })
    }
}

pub struct PdfiumSession {
    pdfium: &'static Pdfium,
    document: PdfDocument<'static>,
    pages: Vec<PageGeometry>,
}

/// Part of `window` that lies on a page of `page_width` x `page_height` pixels.
fn visible_window(window: SliceRect, page_width: u32, page_height: u32) -> Option<SliceRect> {
    let width = window.width.min(page_width.saturating_sub(window.x));
    let height = window.height.min(page_height.saturating_sub(window.y));

    if width == 0 || height == 0 {
        return None;
    }

    Some(SliceRect::new(window.x, window.y, width, height))
}

impl PdfiumSession {
    /// Renders only `window` of the page, scaled as if the whole page were
    /// `page_width` x `page_height` pixels. The bitmap is window-sized.
    fn render_window(
        &self,
        index: usize,
        request: &RasterRequest,
    ) -> Result<Option<RgbaImage>, EngineError> {
        let (page_width, page_height) = self.pages[index].pixel_size(
            request.dpi_x,
            request.dpi_y,
            request.use_crop_box,
            request.rotation,
        );
        let Some(window) = visible_window(request.window, page_width, page_height) else {
            return Ok(None);
        };

        let page = self.document.pages().get(index as u16).map_err(backend_error)?;

        let config = PdfRenderConfig::new()
            .set_target_width(page_width as i32)
            .set_target_height(page_height as i32);
        // Target size above already has the extra quarter turns applied.
        let config = match request.rotation {
            90 => config.rotate(PdfPageRenderRotation::Degrees90, false),
            180 => config.rotate(PdfPageRenderRotation::Degrees180, false),
            270 => config.rotate(PdfPageRenderRotation::Degrees270, false),
            _ => config,
        };
        // Shift the full-size page so the window's corner lands on the bitmap origin.
        let config = config
            .translate(PdfPoints::new(-(window.x as f32)), PdfPoints::new(-(window.y as f32)))
            .map_err(backend_error)?
            .clip(0, 0, window.width as i32, window.height as i32);

        let mut bitmap = PdfBitmap::empty(
            window.width as i32,
            window.height as i32,
            PdfBitmapFormat::BGRA,
            self.pdfium.bindings(),
        )
        .map_err(backend_error)?;
        page.render_into_bitmap_with_config(&mut bitmap, &config).map_err(backend_error)?;

        RgbaImage::from_raw(window.width, window.height, bitmap.as_rgba_bytes())
            .map(Some)
            .ok_or_else(|| EngineError::Backend("pdfium bitmap size mismatch".to_owned()))
    }
}

impl RenderSession for PdfiumSession {
    fn is_ok(&self) -> bool {
        !self.pages.is_empty()
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_geometry(&self, page: u32) -> Result<PageGeometry, EngineError> {
        let index = page_index(page, self.page_count())?;
        Ok(self.pages[index])
    }

    fn rasterize(
        &self,
        request: &RasterRequest,
        target: &mut RgbaImage,
    ) -> Result<(), EngineError> {
        let index = page_index(request.page, self.page_count())?;

        if let Some(region) = self.render_window(index, request)? {
            imageops::replace(target, &region, 0, 0);
        }

        Ok(())
    }
}
