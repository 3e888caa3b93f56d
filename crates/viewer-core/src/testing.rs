//! In-memory backend for view and controller tests.

use leafview_engine::{
    EngineError, LopdfSession, OpenSource, PageGeometry, Passwords, RasterRequest, RenderBackend,
    RenderSession, RgbaImage,
};
use std::cell::Cell;
use std::io;
use std::rc::Rc;

pub struct FakeBackend {
    pages: Vec<PageGeometry>,
    valid: bool,
    fail_open: bool,
    raster_calls: Rc<Cell<usize>>,
}

impl FakeBackend {
    pub fn letter_pages(count: u32) -> Self {
        Self::from_geometry(vec![PageGeometry::letter(); count as usize])
    }

    pub fn with_pages(sizes: &[(f32, f32)]) -> Self {
        let pages = sizes
            .iter()
            .map(|&(width, height)| PageGeometry {
                media_width_pt: width,
                media_height_pt: height,
                crop_width_pt: width,
                crop_height_pt: height,
                rotation: 0,
            })
            .collect();

        Self::from_geometry(pages)
    }

    pub fn failing() -> Self {
        Self { fail_open: true, ..Self::from_geometry(Vec::new()) }
    }

    /// Sessions opened by this backend report `is_ok() == false`.
    pub fn invalid(self) -> Self {
        Self { valid: false, ..self }
    }

    pub fn raster_calls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.raster_calls)
    }

    fn from_geometry(pages: Vec<PageGeometry>) -> Self {
        Self { pages, valid: true, fail_open: false, raster_calls: Rc::new(Cell::new(0)) }
    }
}

impl RenderBackend for FakeBackend {
    type Session = FakeSession;

    fn open(
        &self,
        _source: OpenSource,
        _passwords: &Passwords,
    ) -> Result<FakeSession, EngineError> {
        if self.fail_open {
            let err = io::Error::new(io::ErrorKind::NotFound, "no such document");
            return Err(EngineError::Io(err));
        }

        Ok(FakeSession {
            inner: LopdfSession::from_geometry(self.pages.clone()),
            valid: self.valid,
            raster_calls: Rc::clone(&self.raster_calls),
        })
    }
}

pub struct FakeSession {
    inner: LopdfSession,
    valid: bool,
    raster_calls: Rc<Cell<usize>>,
}

impl RenderSession for FakeSession {
    fn is_ok(&self) -> bool {
        self.valid && self.inner.is_ok()
    }

    fn page_count(&self) -> u32 {
        self.inner.page_count()
    }

    fn page_geometry(&self, page: u32) -> Result<PageGeometry, EngineError> {
        self.inner.page_geometry(page)
    }

    fn rasterize(
        &self,
        request: &RasterRequest,
        target: &mut RgbaImage,
    ) -> Result<(), EngineError> {
        self.raster_calls.set(self.raster_calls.get() + 1);
        self.inner.rasterize(request, target)
    }
}
