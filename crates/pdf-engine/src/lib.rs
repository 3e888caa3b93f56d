//! Rendering backend contract and the document handle built on top of it.
//!
//! Parsing and rasterization happen inside a backend session; everything in
//! this crate is a thin proxy that sizes targets and forwards draw calls.

mod bitmap;
mod document;
#[cfg(feature = "pdfium")]
pub mod pdfium_backend;

pub use bitmap::{try_alloc_bitmap, AllocError};
pub use document::{Document, RenderParams};
pub use image::RgbaImage;

use image::Rgba;
use lopdf::{Dictionary, Object};
use std::fs;
use std::path::{Path, PathBuf};

/// Points per inch, the PDF user-space unit.
pub const POINTS_PER_INCH: f32 = 72.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub media_width_pt: f32,
    pub media_height_pt: f32,
    pub crop_width_pt: f32,
    pub crop_height_pt: f32,
    /// Page `/Rotate`, a multiple of 90 in `[0, 360)`.
    pub rotation: u16,
}

impl PageGeometry {
    pub fn letter() -> Self {
        Self {
            media_width_pt: 612.0,
            media_height_pt: 792.0,
            crop_width_pt: 612.0,
            crop_height_pt: 792.0,
            rotation: 0,
        }
    }

    /// Page extent in points for the chosen box, with quarter turns applied.
    pub fn extent_pt(&self, use_crop_box: bool, rotation: u16) -> (f32, f32) {
        let (width_pt, height_pt) = if use_crop_box {
            (self.crop_width_pt, self.crop_height_pt)
        } else {
            (self.media_width_pt, self.media_height_pt)
        };

        if normalize_rotation(i32::from(self.rotation) + i32::from(rotation)) % 180 == 90 {
            (height_pt, width_pt)
        } else {
            (width_pt, height_pt)
        }
    }

    /// Page extent in pixels for the given DPI, box selection and extra rotation.
    pub fn pixel_size(
        &self,
        dpi_x: f32,
        dpi_y: f32,
        use_crop_box: bool,
        rotation: u16,
    ) -> (u32, u32) {
        let (width_pt, height_pt) = self.extent_pt(use_crop_box, rotation);
        (points_to_pixels(width_pt, dpi_x), points_to_pixels(height_pt, dpi_y))
    }
}

/// Converts a length in points to whole pixels, truncating.
pub fn points_to_pixels(points: f32, dpi: f32) -> u32 {
    let pixels = f64::from(points) * f64::from(dpi) / f64::from(POINTS_PER_INCH);
    if pixels.is_finite() && pixels > 0.0 {
        pixels as u32
    } else {
        0
    }
}

/// Folds any angle in degrees onto `{0, 90, 180, 270}`.
pub fn normalize_rotation(degrees: i32) -> u16 {
    let snapped = (degrees / 90) * 90;
    snapped.rem_euclid(360) as u16
}

/// A pixel rectangle in page space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SliceRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// One rasterization call against a session.
///
/// `window` selects the page pixels to produce; they land in the target
/// starting at `(0, 0)`. Pixels outside the page are left untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterRequest {
    pub page: u32,
    pub dpi_x: f32,
    pub dpi_y: f32,
    pub use_crop_box: bool,
    pub rotation: u16,
    pub window: SliceRect,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Passwords {
    pub owner: Option<String>,
    pub user: Option<String>,
}

impl Passwords {
    pub fn none() -> Self {
        Self::default()
    }

    /// Password handed to backends that accept a single one.
    pub fn preferred(&self) -> Option<&str> {
        self.user.as_deref().or(self.owner.as_deref())
    }
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl OpenSource {
    pub fn read(self) -> Result<Vec<u8>, EngineError> {
        match self {
            Self::Path(path) => Ok(fs::read(path)?),
            Self::Bytes(bytes) => Ok(bytes),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("document has no pages")]
    NoPages,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Opens sessions on documents. The native library instance lives here.
pub trait RenderBackend {
    type Session: RenderSession;

    fn open(&self, source: OpenSource, passwords: &Passwords) -> Result<Self::Session, EngineError>;
}

/// An open document inside a backend. Dropping it releases the native session.
///
/// Pages are 1-based throughout.
pub trait RenderSession {
    fn is_ok(&self) -> bool;
    fn page_count(&self) -> u32;
    fn page_geometry(&self, page: u32) -> Result<PageGeometry, EngineError>;
    fn rasterize(&self, request: &RasterRequest, target: &mut RgbaImage) -> Result<(), EngineError>;
}

/// Maps a 1-based page onto an index, rejecting pages outside `[1, page_count]`.
pub fn page_index(page: u32, page_count: u32) -> Result<usize, EngineError> {
    if page == 0 || page > page_count {
        return Err(EngineError::PageOutOfRange { page, page_count });
    }

    Ok(page as usize - 1)
}

const PAGE_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);
const PAGE_EDGE: Rgba<u8> = Rgba([200, 200, 200, 255]);

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfBackend;

impl LopdfBackend {
    pub fn new() -> Self {
        Self
    }

    fn parse_geometry(bytes: &[u8]) -> Result<Vec<PageGeometry>, EngineError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(EngineError::EncryptedUnsupported);
        }

        let doc = lopdf::Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut geometry = Vec::with_capacity(pages.len());

        for (_, object_id) in pages {
            let dict = doc.get_dictionary(object_id)?;

            let (media_width_pt, media_height_pt) =
                inherited_box(&doc, dict, b"MediaBox").unwrap_or((612.0, 792.0));
            let (crop_width_pt, crop_height_pt) =
                inherited_box(&doc, dict, b"CropBox").unwrap_or((media_width_pt, media_height_pt));
            let rotation = inherited(&doc, dict, b"Rotate")
                .and_then(|obj| obj.as_i64().ok())
                .map(|degrees| normalize_rotation(degrees as i32))
                .unwrap_or(0);

            geometry.push(PageGeometry {
                media_width_pt,
                media_height_pt,
                crop_width_pt,
                crop_height_pt,
                rotation,
            });
        }

        if geometry.is_empty() {
            return Err(EngineError::NoPages);
        }

        Ok(geometry)
    }
}

/// Looks a page attribute up on the page, then on its `/Parent` chain.
fn inherited<'a>(doc: &'a lopdf::Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page);

    while let Some(dict) = current {
        if let Ok(value) = dict.get(key) {
            return match value {
                Object::Reference(id) => doc.get_object(*id).ok(),
                other => Some(other),
            };
        }

        current = dict
            .get(b"Parent")
            .and_then(|parent| parent.as_reference())
            .and_then(|id| doc.get_dictionary(id))
            .ok();
    }

    None
}

fn inherited_box(doc: &lopdf::Document, page: &Dictionary, key: &[u8]) -> Option<(f32, f32)> {
    let array = inherited(doc, page, key)?.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }

    let x0 = number(&array[0])?;
    let y0 = number(&array[1])?;
    let x1 = number(&array[2])?;
    let y1 = number(&array[3])?;

    Some(((x1 - x0).abs(), (y1 - y0).abs()))
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f as f32),
        _ => None,
    }
}

impl RenderBackend for LopdfBackend {
    type Session = LopdfSession;

    fn open(&self, source: OpenSource, passwords: &Passwords) -> Result<LopdfSession, EngineError> {
        let bytes = source.read()?;
        let pages = Self::parse_geometry(&bytes)?;

        tracing::debug!(
            page_count = pages.len(),
            password = passwords.preferred().is_some(),
            "opened document with lopdf backend"
        );

        Ok(LopdfSession { pages })
    }
}

/// Session of the default backend. Holds page geometry only and paints
/// placeholder pages: white fill with a one-pixel grey edge.
#[derive(Debug, Clone)]
pub struct LopdfSession {
    pages: Vec<PageGeometry>,
}

impl LopdfSession {
    pub fn from_geometry(pages: Vec<PageGeometry>) -> Self {
        Self { pages }
    }
}

impl RenderSession for LopdfSession {
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
        let geometry = self.page_geometry(request.page)?;
        let (page_width, page_height) = geometry.pixel_size(
            request.dpi_x,
            request.dpi_y,
            request.use_crop_box,
            request.rotation,
        );

        let window = request.window;
        let width = window.width.min(target.width());
        let height = window.height.min(target.height());

        for ty in 0..height {
            let py = window.y as u64 + ty as u64;
            if py >= page_height as u64 {
                break;
            }

            for tx in 0..width {
                let px = window.x as u64 + tx as u64;
                if px >= page_width as u64 {
                    break;
                }

                let on_edge = px == 0
                    || py == 0
                    || px + 1 == page_width as u64
                    || py + 1 == page_height as u64;

                target.put_pixel(tx, ty, if on_edge { PAGE_EDGE } else { PAGE_FILL });
            }
        }

        Ok(())
    }
}

pub fn default_backend() -> LopdfBackend {
    LopdfBackend::new()
}
