//! The drawing engine: a raster canvas kept in sync with a replayable list of
//! strokes.
//!
//! The surface is a small state machine:
//!
//! ```text
//! ┌────────┐  begin_stroke   ┌──────────┐
//! │        ├────────────────►│          │◄──┐
//! │  Idle  │                 │ Drawing  │   │ extend_stroke
//! │        │◄────────────────┤          ├───┘
//! └────────┘   end_stroke    └──────────┘
//! ```
//!
//! `undo`, `redo`, `resize` and `clear` are only accepted while idle.
//! The canvas is always the rasterization of the committed strokes over a
//! white background, with one exception: content copied across a resize is
//! kept as pixels (clipped or padded with white) until the next full replay.

mod canvas;
mod strokes;

use egui::{ColorImage, Pos2};
use image::RgbaImage;
use thiserror::Error;

use crate::config::SurfaceConfig;
use crate::stroke::{MutableStroke, Stroke, StrokeStyle};

pub use canvas::{Canvas, BACKGROUND};
pub use strokes::StrokeHistory;

/// Errors raised by the drawing surface
#[derive(Debug, Error, PartialEq)]
pub enum SurfaceError {
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("stroke width must be positive and finite, got {0}")]
    InvalidWidth(f32),

    #[error("invalid canvas dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("cannot allocate a {width}x{height} canvas")]
    OutOfMemory { width: u32, height: u32 },

    #[error("the surface has not been sized yet")]
    NotSized,
}

pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// What the pointer is currently doing on the surface
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SurfaceState {
    /// No pointer is down
    #[default]
    Idle,
    /// A stroke is being drawn and has not been committed yet
    Drawing { stroke: MutableStroke },
}

impl SurfaceState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SurfaceState::Idle)
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self, SurfaceState::Drawing { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            SurfaceState::Idle => "idle",
            SurfaceState::Drawing { .. } => "drawing",
        }
    }
}

#[derive(Debug)]
pub struct DrawingSurface {
    config: SurfaceConfig,
    /// Absent until the host reports a size for the first time.
    canvas: Option<Canvas>,
    strokes: StrokeHistory,
    state: SurfaceState,
    needs_redraw: bool,
}

impl Default for DrawingSurface {
    fn default() -> Self {
        Self::new(SurfaceConfig::default())
    }
}

impl DrawingSurface {
    pub fn new(config: SurfaceConfig) -> Self {
        Self {
            config,
            canvas: None,
            strokes: StrokeHistory::new(),
            state: SurfaceState::Idle,
            needs_redraw: false,
        }
    }

    /// Creates a surface and sizes it right away.
    pub fn with_size(config: SurfaceConfig, width: u32, height: u32) -> SurfaceResult<Self> {
        let mut surface = Self::new(config);
        surface.resize(width, height)?;
        Ok(surface)
    }

    fn require_idle(&self, operation: &'static str) -> SurfaceResult<()> {
        if self.state.is_idle() {
            Ok(())
        } else {
            Err(SurfaceError::InvalidState {
                operation,
                state: self.state.name(),
            })
        }
    }

    pub fn begin_stroke(&mut self, point: Pos2, style: StrokeStyle) -> SurfaceResult<()> {
        self.require_idle("begin a stroke")?;
        if !style.is_valid() {
            return Err(SurfaceError::InvalidWidth(style.width()));
        }

        self.state = SurfaceState::Drawing {
            stroke: MutableStroke::new(point, style),
        };
        Ok(())
    }

    /// Adds a sample to the live stroke. Ignored when no stroke is active.
    pub fn extend_stroke(&mut self, point: Pos2) {
        if let SurfaceState::Drawing { stroke } = &mut self.state {
            stroke.add_point(point);
            self.needs_redraw = true;
        }
    }

    pub fn end_stroke(&mut self) -> SurfaceResult<()> {
        let SurfaceState::Drawing { stroke } = std::mem::take(&mut self.state) else {
            return Err(SurfaceError::InvalidState {
                operation: "end a stroke",
                state: SurfaceState::Idle.name(),
            });
        };

        let stroke = stroke.finish();
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.paint_stroke(&stroke);
        }
        log::debug!(
            "Committed {:?} stroke with {} points",
            stroke.style().kind(),
            stroke.points().len()
        );
        self.strokes.commit(stroke);
        self.needs_redraw = true;
        Ok(())
    }

    /// Takes back the newest stroke. Returns `false` when there was nothing
    /// to undo.
    pub fn undo(&mut self) -> SurfaceResult<bool> {
        self.require_idle("undo")?;
        if !self.strokes.undo() {
            return Ok(false);
        }

        // Erasing is not invertible, so rebuild from scratch.
        self.replay();
        log::debug!("Undo, {} strokes remain", self.strokes.committed().len());
        Ok(true)
    }

    /// Re-applies the most recently undone stroke. Returns `false` when there
    /// was nothing to redo.
    pub fn redo(&mut self) -> SurfaceResult<bool> {
        self.require_idle("redo")?;
        let Some(stroke) = self.strokes.redo() else {
            return Ok(false);
        };

        // Redo replays in original order, so painting on top is equivalent
        // to a full replay.
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.paint_stroke(stroke);
        }
        self.needs_redraw = true;
        log::debug!("Redo, {} strokes committed", self.strokes.committed().len());
        Ok(true)
    }

    /// Adapts the canvas to new host dimensions. Returns `false` when the
    /// size did not change, in which case nothing is touched.
    pub fn resize(&mut self, width: u32, height: u32) -> SurfaceResult<bool> {
        self.require_idle("resize")?;
        if self.size() == Some((width, height)) {
            return Ok(false);
        }
        if width == 0 || height == 0 {
            return Err(SurfaceError::InvalidDimensions { width, height });
        }
        if u64::from(width) * u64::from(height) > self.config.max_pixels {
            return Err(SurfaceError::OutOfMemory { width, height });
        }

        let mut canvas = Canvas::new(width, height, self.config.anti_alias)
            .ok_or(SurfaceError::OutOfMemory { width, height })?;
        match self.canvas.take() {
            Some(previous) => {
                log::info!(
                    "Resizing canvas {}x{} -> {width}x{height}",
                    previous.width(),
                    previous.height()
                );
                canvas.copy_from(&previous);
            }
            None => {
                log::info!("Allocating {width}x{height} canvas");
                for stroke in self.strokes.committed() {
                    canvas.paint_stroke(stroke);
                }
            }
        }

        self.canvas = Some(canvas);
        self.needs_redraw = true;
        Ok(true)
    }

    /// Drops every stroke and whitens the canvas.
    pub fn clear(&mut self) -> SurfaceResult<()> {
        self.require_idle("clear")?;
        self.strokes.clear();
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.fill_background();
        }
        self.needs_redraw = true;
        Ok(())
    }

    fn replay(&mut self) {
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.fill_background();
            for stroke in self.strokes.committed() {
                canvas.paint_stroke(stroke);
            }
        }
        self.needs_redraw = true;
    }

    /// Flattened copy of the canvas including the stroke being drawn, if any.
    pub fn export_raster(&self) -> SurfaceResult<RgbaImage> {
        let canvas = self.composed()?;
        canvas
            .to_rgba_image()
            .ok_or(SurfaceError::OutOfMemory {
                width: canvas.width(),
                height: canvas.height(),
            })
    }

    /// Same content as [`Self::export_raster`], ready to upload as a texture.
    pub fn display_image(&self) -> SurfaceResult<ColorImage> {
        Ok(self.composed()?.to_color_image())
    }

    fn composed(&self) -> SurfaceResult<std::borrow::Cow<'_, Canvas>> {
        let canvas = self.canvas.as_ref().ok_or(SurfaceError::NotSized)?;
        Ok(match &self.state {
            SurfaceState::Idle => std::borrow::Cow::Borrowed(canvas),
            SurfaceState::Drawing { stroke } => {
                let mut overlay = canvas.clone();
                overlay.paint(stroke.points(), stroke.style());
                std::borrow::Cow::Owned(overlay)
            }
        })
    }

    pub fn has_content(&self) -> bool {
        self.strokes.can_undo()
    }

    pub fn can_undo(&self) -> bool {
        self.strokes.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.strokes.can_redo()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_drawing()
    }

    pub fn state(&self) -> &SurfaceState {
        &self.state
    }

    /// The uncommitted stroke, for hosts that draw the live overlay themselves.
    pub fn live_stroke(&self) -> Option<&MutableStroke> {
        match &self.state {
            SurfaceState::Drawing { stroke } => Some(stroke),
            SurfaceState::Idle => None,
        }
    }

    pub fn committed(&self) -> &[Stroke] {
        self.strokes.committed()
    }

    pub fn strokes(&self) -> &StrokeHistory {
        &self.strokes
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.canvas.as_ref().map(Canvas::size)
    }

    /// Returns whether anything changed since the last call.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, Color32};

    fn sized(width: u32, height: u32) -> DrawingSurface {
        DrawingSurface::with_size(SurfaceConfig::default(), width, height).unwrap()
    }

    fn draw(surface: &mut DrawingSurface, points: &[Pos2], style: StrokeStyle) {
        surface.begin_stroke(points[0], style).unwrap();
        for point in &points[1..] {
            surface.extend_stroke(*point);
        }
        surface.end_stroke().unwrap();
    }

    #[test]
    fn test_begin_while_drawing_is_rejected() {
        let mut surface = sized(10, 10);
        let style = StrokeStyle::brush(2.0, Color32::BLACK);
        surface.begin_stroke(pos2(1.0, 1.0), style).unwrap();

        let err = surface.begin_stroke(pos2(2.0, 2.0), style).unwrap_err();
        assert!(matches!(err, SurfaceError::InvalidState { state: "drawing", .. }));
    }

    #[test]
    fn test_end_without_begin_is_rejected() {
        let mut surface = sized(10, 10);
        assert!(matches!(
            surface.end_stroke(),
            Err(SurfaceError::InvalidState { state: "idle", .. })
        ));
    }

    #[test]
    fn test_extend_while_idle_is_ignored() {
        let mut surface = sized(10, 10);
        surface.take_redraw_request();
        surface.extend_stroke(pos2(3.0, 3.0));
        assert!(!surface.is_active());
        assert!(!surface.take_redraw_request());
    }

    #[test]
    fn test_history_operations_require_idle() {
        let mut surface = sized(10, 10);
        surface
            .begin_stroke(pos2(1.0, 1.0), StrokeStyle::eraser(4.0))
            .unwrap();

        assert!(surface.undo().is_err());
        assert!(surface.redo().is_err());
        assert!(surface.resize(20, 20).is_err());
        assert!(surface.clear().is_err());
    }

    #[test]
    fn test_invalid_width_is_rejected() {
        let mut surface = sized(10, 10);
        assert_eq!(
            surface.begin_stroke(pos2(1.0, 1.0), StrokeStyle::eraser(0.0)),
            Err(SurfaceError::InvalidWidth(0.0))
        );
        assert!(!surface.is_active());
    }

    #[test]
    fn test_strokes_before_first_sizing_are_replayed() {
        let mut surface = DrawingSurface::default();
        draw(
            &mut surface,
            &[pos2(0.0, 5.0), pos2(10.0, 5.0)],
            StrokeStyle::brush(4.0, Color32::BLACK),
        );
        assert_eq!(surface.export_raster(), Err(SurfaceError::NotSized));

        surface.resize(10, 10).unwrap();
        let canvas = surface.canvas().unwrap();
        assert_eq!(canvas.pixel(5, 5), Some(Color32::BLACK));
    }

    #[test]
    fn test_zero_size_and_pixel_limit() {
        let mut surface = DrawingSurface::new(SurfaceConfig {
            max_pixels: 100,
            ..Default::default()
        });
        assert_eq!(
            surface.resize(0, 10),
            Err(SurfaceError::InvalidDimensions { width: 0, height: 10 })
        );
        assert_eq!(
            surface.resize(11, 10),
            Err(SurfaceError::OutOfMemory { width: 11, height: 10 })
        );
        assert_eq!(surface.resize(10, 10), Ok(true));
    }

    #[test]
    fn test_export_includes_live_stroke() {
        let mut surface = sized(20, 20);
        surface
            .begin_stroke(pos2(2.0, 10.0), StrokeStyle::brush(4.0, Color32::BLACK))
            .unwrap();
        surface.extend_stroke(pos2(18.0, 10.0));

        let live = surface.export_raster().unwrap();
        assert_eq!(live.get_pixel(10, 10).0, [0, 0, 0, 255]);
        // The committed canvas is untouched until the stroke ends.
        assert_eq!(surface.canvas().unwrap().pixel(10, 10), Some(Color32::WHITE));
        assert!(!surface.has_content());
    }
}
