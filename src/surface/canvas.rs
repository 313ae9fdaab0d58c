use egui::{Color32, ColorImage, Pos2};
use image::RgbaImage;
use tiny_skia::{BlendMode, Color, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Transform};

use crate::stroke::{Stroke, StrokeStyle};

/// The color every canvas starts from and every eraser restores.
pub const BACKGROUND: Color32 = Color32::WHITE;

/// Opaque RGBA raster that strokes are composited onto.
///
/// Every pixel stays fully opaque: brushes paint opaque colors source-over
/// and erasers write the background with a source blend, so the
/// premultiplied pixmap bytes are also valid straight-alpha RGBA.
#[derive(Clone)]
pub struct Canvas {
    pixmap: Pixmap,
    anti_alias: bool,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("anti_alias", &self.anti_alias)
            .finish()
    }
}

impl Canvas {
    /// Allocates a white canvas. Returns `None` when the rasterizer refuses
    /// the dimensions (zero-sized or overflowing).
    pub(crate) fn new(width: u32, height: u32, anti_alias: bool) -> Option<Self> {
        let mut pixmap = Pixmap::new(width, height)?;
        pixmap.fill(background());
        Some(Self { pixmap, anti_alias })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Raw RGBA bytes, row-major, four bytes per pixel.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color32> {
        self.pixmap
            .pixel(x, y)
            .map(|c| Color32::from_rgba_premultiplied(c.red(), c.green(), c.blue(), c.alpha()))
    }

    pub(crate) fn fill_background(&mut self) {
        self.pixmap.fill(background());
    }

    /// Copies `other` onto this canvas at the origin without scaling.
    /// Anything outside this canvas is clipped.
    pub(crate) fn copy_from(&mut self, other: &Canvas) {
        let row_bytes = self.width().min(other.width()) as usize * 4;
        let rows = self.height().min(other.height()) as usize;
        let dst_stride = self.width() as usize * 4;
        let src_stride = other.width() as usize * 4;

        let src = other.pixmap.data();
        let dst = self.pixmap.data_mut();
        for row in 0..rows {
            let src_row = &src[row * src_stride..][..row_bytes];
            dst[row * dst_stride..][..row_bytes].copy_from_slice(src_row);
        }
    }

    pub(crate) fn paint_stroke(&mut self, stroke: &Stroke) {
        self.paint(stroke.points(), stroke.style());
    }

    /// Composites a polyline with round caps and joins.
    ///
    /// A polyline that never leaves its first point is drawn as a dot of the
    /// stroke's width.
    pub(crate) fn paint(&mut self, points: &[Pos2], style: &StrokeStyle) {
        let Some(first) = points.first().copied() else {
            return;
        };
        let width = style.width();

        let mut paint = Paint::default();
        paint.anti_alias = self.anti_alias;
        match *style {
            StrokeStyle::Brush { color, .. } => {
                let [r, g, b, _] = color.to_srgba_unmultiplied();
                paint.set_color_rgba8(r, g, b, u8::MAX);
                paint.blend_mode = BlendMode::SourceOver;
            }
            StrokeStyle::Eraser { .. } => {
                paint.set_color(background());
                paint.blend_mode = BlendMode::Source;
            }
        }

        if points.iter().all(|p| *p == first) {
            if let Some(dot) = PathBuilder::from_circle(first.x, first.y, width / 2.0) {
                self.pixmap
                    .fill_path(&dot, &paint, FillRule::Winding, Transform::identity(), None);
            }
            return;
        }

        let mut builder = PathBuilder::new();
        builder.move_to(first.x, first.y);
        for point in &points[1..] {
            builder.line_to(point.x, point.y);
        }
        let Some(path) = builder.finish() else {
            return;
        };

        let outline = tiny_skia::Stroke {
            width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Default::default()
        };
        self.pixmap
            .stroke_path(&path, &paint, &outline, Transform::identity(), None);
    }

    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width(), self.height(), self.pixmap.data().to_vec())
    }

    pub fn to_color_image(&self) -> ColorImage {
        ColorImage::from_rgba_premultiplied(
            [self.width() as usize, self.height() as usize],
            self.pixmap.data(),
        )
    }
}

fn background() -> Color {
    let [r, g, b, a] = BACKGROUND.to_array();
    Color::from_rgba8(r, g, b, a)
}
