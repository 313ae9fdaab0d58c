use egui::{Color32, Pos2};

/// The tool a stroke was drawn with, frozen at pointer-down together with
/// the settings that tool had at that moment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrokeStyle {
    /// Paints `color` over whatever is underneath.
    Brush { width: f32, color: Color32 },
    /// Restores the covered pixels to the canvas background.
    Eraser { width: f32 },
}

impl StrokeStyle {
    pub fn brush(width: f32, color: Color32) -> Self {
        Self::Brush { width, color }
    }

    pub fn eraser(width: f32) -> Self {
        Self::Eraser { width }
    }

    pub fn width(&self) -> f32 {
        match *self {
            Self::Brush { width, .. } | Self::Eraser { width } => width,
        }
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            Self::Brush { .. } => ToolKind::Brush,
            Self::Eraser { .. } => ToolKind::Eraser,
        }
    }

    /// Widths must be finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        let width = self.width();
        width.is_finite() && width > 0.0
    }
}

/// Tool selection as reported by the tool panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ToolKind {
    Brush,
    Eraser,
}

// Immutable stroke, as stored in the undo/redo stacks
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    points: Vec<Pos2>,
    style: StrokeStyle,
}

// Stroke under construction, between pointer-down and pointer-up
#[derive(Debug, Clone, PartialEq)]
pub struct MutableStroke {
    points: Vec<Pos2>,
    style: StrokeStyle,
}

impl Stroke {
    pub fn new(style: StrokeStyle, points: Vec<Pos2>) -> Self {
        Self { points, style }
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }
}

impl MutableStroke {
    /// Starts a stroke at `origin`; a stroke always has at least one point.
    pub fn new(origin: Pos2, style: StrokeStyle) -> Self {
        Self {
            points: vec![origin],
            style,
        }
    }

    pub fn add_point(&mut self, point: Pos2) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    /// Freeze the stroke. Consumes it, there is nothing left to edit afterwards.
    pub fn finish(self) -> Stroke {
        Stroke::new(self.style, self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    #[test]
    fn test_mutable_stroke_keeps_origin_and_order() {
        let mut stroke = MutableStroke::new(pos2(1.0, 1.0), StrokeStyle::eraser(20.0));
        stroke.add_point(pos2(2.0, 3.0));
        stroke.add_point(pos2(4.0, 5.0));

        let stroke = stroke.finish();
        assert_eq!(
            stroke.points(),
            &[pos2(1.0, 1.0), pos2(2.0, 3.0), pos2(4.0, 5.0)]
        );
        assert_eq!(stroke.style().kind(), ToolKind::Eraser);
        assert_eq!(stroke.style().width(), 20.0);
    }

    #[test]
    fn test_style_validation() {
        assert!(StrokeStyle::brush(5.0, Color32::BLACK).is_valid());
        assert!(!StrokeStyle::brush(0.0, Color32::BLACK).is_valid());
        assert!(!StrokeStyle::eraser(-1.0).is_valid());
        assert!(!StrokeStyle::eraser(f32::NAN).is_valid());
    }
}
