use crate::{
    normalize_rotation, points_to_pixels, EngineError, OpenSource, Passwords, RasterRequest,
    RenderBackend, RenderSession, SliceRect, POINTS_PER_INCH,
};
use image::{imageops, RgbaImage};

/// Session-wide parameters applied to every draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub dpi_x: f32,
    pub dpi_y: f32,
    /// Render the crop box instead of the media box.
    pub crop: bool,
    /// Forces the media box even when `crop` is set.
    pub use_media_box: bool,
    /// Extra rotation on top of each page's own, in degrees.
    pub rotation: u16,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            dpi_x: POINTS_PER_INCH,
            dpi_y: POINTS_PER_INCH,
            crop: false,
            use_media_box: false,
            rotation: 0,
        }
    }
}

impl RenderParams {
    fn use_crop_box(&self) -> bool {
        self.crop && !self.use_media_box
    }
}

/// Handle on one open document. Owns the backend session; dropping the
/// handle closes it.
#[derive(Debug)]
pub struct Document<S> {
    session: S,
    params: RenderParams,
}

impl<S: RenderSession> Document<S> {
    /// Opens a session. A session that opens but reports itself invalid is
    /// still returned; check [`Document::is_ok`].
    pub fn open<B>(
        backend: &B,
        source: OpenSource,
        passwords: &Passwords,
    ) -> Result<Self, EngineError>
    where
        B: RenderBackend<Session = S>,
    {
        backend.open(source, passwords).map(Self::from_session)
    }

    pub fn from_session(session: S) -> Self {
        Self { session, params: RenderParams::default() }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn is_ok(&self) -> bool {
        self.session.is_ok()
    }

    pub fn page_count(&self) -> u32 {
        self.session.page_count()
    }

    pub fn media_width(&self, page: u32) -> Result<f32, EngineError> {
        Ok(self.session.page_geometry(page)?.media_width_pt)
    }

    pub fn media_height(&self, page: u32) -> Result<f32, EngineError> {
        Ok(self.session.page_geometry(page)?.media_height_pt)
    }

    pub fn crop_width(&self, page: u32) -> Result<f32, EngineError> {
        Ok(self.session.page_geometry(page)?.crop_width_pt)
    }

    pub fn crop_height(&self, page: u32) -> Result<f32, EngineError> {
        Ok(self.session.page_geometry(page)?.crop_height_pt)
    }

    pub fn rotation(&self, page: u32) -> Result<u16, EngineError> {
        Ok(self.session.page_geometry(page)?.rotation)
    }

    pub fn params(&self) -> RenderParams {
        self.params
    }

    pub fn set_dpi(&mut self, dpi_x: f32, dpi_y: f32) {
        self.params.dpi_x = dpi_x;
        self.params.dpi_y = dpi_y;
    }

    pub fn set_crop(&mut self, crop: bool) {
        self.params.crop = crop;
    }

    pub fn set_use_media_box(&mut self, use_media_box: bool) {
        self.params.use_media_box = use_media_box;
    }

    pub fn set_rotation(&mut self, degrees: i32) {
        self.params.rotation = normalize_rotation(degrees);
    }

    /// Page extent in points under the current box selection and rotation.
    pub fn page_extent_pt(&self, page: u32) -> Result<(f32, f32), EngineError> {
        let geometry = self.session.page_geometry(page)?;
        Ok(geometry.extent_pt(self.params.use_crop_box(), self.params.rotation))
    }

    /// Page extent in pixels under the current parameters.
    pub fn page_pixel_size(&self, page: u32) -> Result<(u32, u32), EngineError> {
        self.page_pixel_size_at(page, self.params.dpi_x, self.params.dpi_y)
    }

    /// Page extent in pixels at an explicit DPI, other parameters unchanged.
    pub fn page_pixel_size_at(
        &self,
        page: u32,
        dpi_x: f32,
        dpi_y: f32,
    ) -> Result<(u32, u32), EngineError> {
        let (width_pt, height_pt) = self.page_extent_pt(page)?;
        Ok((points_to_pixels(width_pt, dpi_x), points_to_pixels(height_pt, dpi_y)))
    }

    /// Draws the whole page into `target`, top-left aligned.
    pub fn draw_page(&self, target: &mut RgbaImage, page: u32) -> Result<(), EngineError> {
        let (width, height) = self.page_pixel_size(page)?;
        self.rasterize(target, page, SliceRect::new(0, 0, width, height))
    }

    /// Draws `first..=last` stacked top to bottom.
    pub fn draw_pages(
        &self,
        target: &mut RgbaImage,
        first: u32,
        last: u32,
    ) -> Result<(), EngineError> {
        let mut top: i64 = 0;

        for page in first..=last {
            let (width, height) = self.page_pixel_size(page)?;
            if width == 0 || height == 0 {
                continue;
            }

            let mut layer = RgbaImage::new(width, height);
            self.rasterize(&mut layer, page, SliceRect::new(0, 0, width, height))?;
            imageops::replace(target, &layer, 0, top);

            top += i64::from(height);
            if top >= i64::from(target.height()) {
                break;
            }
        }

        Ok(())
    }

    /// Draws only the page pixels inside `slice` into `target` at `(0, 0)`.
    pub fn draw_page_slice(
        &self,
        target: &mut RgbaImage,
        page: u32,
        slice: SliceRect,
    ) -> Result<(), EngineError> {
        self.rasterize(target, page, slice)
    }

    fn rasterize(
        &self,
        target: &mut RgbaImage,
        page: u32,
        window: SliceRect,
    ) -> Result<(), EngineError> {
        let request = RasterRequest {
            page,
            dpi_x: self.params.dpi_x,
            dpi_y: self.params.dpi_y,
            use_crop_box: self.params.use_crop_box(),
            rotation: self.params.rotation,
            window,
        };

        self.session.rasterize(&request, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fixtures, LopdfBackend, LopdfSession};
    use image::Rgba;

    fn open(pages: &[(i64, i64)]) -> Document<LopdfSession> {
        Document::open(
            &LopdfBackend::new(),
            OpenSource::Bytes(fixtures::pdf_with_pages(pages)),
            &Passwords::none(),
        )
        .expect("open should succeed")
    }

    #[test]
    fn geometry_getters_are_one_based() {
        let doc = open(&[(612, 792), (200, 100)]);

        assert!(doc.is_ok());
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.media_width(1).expect("page 1"), 612.0);
        assert_eq!(doc.media_height(2).expect("page 2"), 100.0);
        assert_eq!(doc.crop_width(2).expect("page 2"), 200.0);
        assert_eq!(doc.crop_height(1).expect("page 1"), 792.0);
        assert_eq!(doc.rotation(1).expect("page 1"), 0);
        assert!(doc.media_width(3).is_err());
    }

    #[test]
    fn dpi_drives_pixel_size() {
        let mut doc = open(&[(72, 144)]);
        assert_eq!(doc.page_pixel_size(1).expect("size"), (72, 144));

        doc.set_dpi(144.0, 36.0);
        assert_eq!(doc.page_pixel_size(1).expect("size"), (144, 72));
    }

    #[test]
    fn crop_flag_selects_crop_box_unless_media_box_forced() {
        let mut doc = Document::open(
            &LopdfBackend::new(),
            OpenSource::Bytes(fixtures::pdf_with_inherited_boxes()),
            &Passwords::none(),
        )
        .expect("open should succeed");

        assert_eq!(doc.page_pixel_size(2).expect("size"), (842, 595));

        doc.set_crop(true);
        assert_eq!(doc.page_pixel_size(2).expect("size"), (400, 300));

        doc.set_use_media_box(true);
        assert_eq!(doc.page_pixel_size(2).expect("size"), (842, 595));
    }

    #[test]
    fn slice_matches_the_same_region_of_a_full_draw() {
        let doc = open(&[(40, 30)]);

        let mut full = RgbaImage::new(40, 30);
        doc.draw_page(&mut full, 1).expect("draw page");

        let mut slice = RgbaImage::new(10, 10);
        doc.draw_page_slice(&mut slice, 1, SliceRect::new(30, 20, 10, 10)).expect("draw slice");

        let expected = imageops::crop_imm(&full, 30, 20, 10, 10).to_image();
        assert_eq!(slice, expected);
    }

    #[test]
    fn draw_pages_stacks_vertically() {
        let doc = open(&[(20, 10), (20, 10)]);

        let mut target = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 0]));
        doc.draw_pages(&mut target, 1, 2).expect("draw pages");

        // Bottom edge of page 1 and top edge of page 2 are adjacent rows.
        assert_eq!(*target.get_pixel(5, 9), Rgba([200, 200, 200, 255]));
        assert_eq!(*target.get_pixel(5, 10), Rgba([200, 200, 200, 255]));
        assert_eq!(*target.get_pixel(5, 15), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn rotation_parameter_is_normalized() {
        let mut doc = open(&[(100, 50)]);
        doc.set_rotation(-90);

        assert_eq!(doc.params().rotation, 270);
        assert_eq!(doc.page_pixel_size(1).expect("size"), (50, 100));
    }
}
