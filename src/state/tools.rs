use egui::Color32;

use crate::config::{ToolConfig, WidthSliderConfig};
use crate::slider::{Slider, SliderError, SliderEvent};
use crate::stroke::{StrokeStyle, ToolKind};
use crate::surface::SurfaceError;

/// Current tool plus the per-tool settings new strokes are drawn with.
///
/// Brush and eraser keep separate widths. Picking a color or a brush width
/// selects the brush; picking an eraser width selects the eraser.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    tool: ToolKind,
    brush_width: f32,
    brush_color: Color32,
    eraser_width: f32,
    brush_slider: Slider,
    eraser_slider: Slider,
    brush_mapping: WidthSliderConfig,
    eraser_mapping: WidthSliderConfig,
    palette: Vec<Color32>,
}

impl ToolSettings {
    pub fn from_config(config: &ToolConfig) -> Result<Self, SliderError> {
        let slider_for = |mapping: &WidthSliderConfig, width: f32| {
            Slider::new(mapping.min, mapping.max, mapping.progress_for(width))
        };

        Ok(Self {
            tool: ToolKind::Brush,
            brush_width: config.brush_width,
            brush_color: config.brush_color(),
            eraser_width: config.eraser_width,
            brush_slider: slider_for(&config.brush_slider, config.brush_width)?,
            eraser_slider: slider_for(&config.eraser_slider, config.eraser_width)?,
            brush_mapping: config.brush_slider,
            eraser_mapping: config.eraser_slider,
            palette: config.palette(),
        })
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
    }

    pub fn brush_color(&self) -> Color32 {
        self.brush_color
    }

    pub fn brush_width(&self) -> f32 {
        self.brush_width
    }

    pub fn eraser_width(&self) -> f32 {
        self.eraser_width
    }

    pub fn palette(&self) -> &[Color32] {
        &self.palette
    }

    /// Style that the next stroke will freeze.
    pub fn style(&self) -> StrokeStyle {
        match self.tool {
            ToolKind::Brush => StrokeStyle::brush(self.brush_width, self.brush_color),
            ToolKind::Eraser => StrokeStyle::eraser(self.eraser_width),
        }
    }

    pub fn set_color(&mut self, color: Color32) {
        self.brush_color = color;
        self.tool = ToolKind::Brush;
    }

    /// Sets the width of the current tool.
    pub fn set_width(&mut self, width: f32) -> Result<(), SurfaceError> {
        self.set_width_for(self.tool, width)
    }

    /// Sets the width of `tool` and selects it.
    pub fn set_width_for(&mut self, tool: ToolKind, width: f32) -> Result<(), SurfaceError> {
        if !(width.is_finite() && width > 0.0) {
            return Err(SurfaceError::InvalidWidth(width));
        }

        self.tool = tool;
        match tool {
            ToolKind::Brush => {
                self.brush_width = width;
                let progress = self.brush_mapping.progress_for(width);
                self.brush_slider.set_progress(progress);
            }
            ToolKind::Eraser => {
                self.eraser_width = width;
                let progress = self.eraser_mapping.progress_for(width);
                self.eraser_slider.set_progress(progress);
            }
        }
        Ok(())
    }

    pub fn slider(&self, tool: ToolKind) -> &Slider {
        match tool {
            ToolKind::Brush => &self.brush_slider,
            ToolKind::Eraser => &self.eraser_slider,
        }
    }

    pub fn slider_mut(&mut self, tool: ToolKind) -> &mut Slider {
        match tool {
            ToolKind::Brush => &mut self.brush_slider,
            ToolKind::Eraser => &mut self.eraser_slider,
        }
    }

    /// Applies a user drag on `tool`'s width slider. Programmatic changes are
    /// ignored, they already came from a width update. Returns whether the
    /// width changed.
    pub fn apply_slider_event(&mut self, tool: ToolKind, event: SliderEvent) -> bool {
        let SliderEvent::ValueChanged { value, from_user: true } = event else {
            return false;
        };

        self.tool = tool;
        match tool {
            ToolKind::Brush => self.brush_width = self.brush_mapping.width_for(value),
            ToolKind::Eraser => self.eraser_width = self.eraser_mapping.width_for(value),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> ToolSettings {
        ToolSettings::from_config(&ToolConfig::default()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let tools = ToolSettings::from_config(&ToolConfig::default()).unwrap();
        assert_eq!(tools.style(), StrokeStyle::brush(10.0, Color32::BLACK));
        assert_eq!(tools.slider(ToolKind::Brush).progress(), 9);
        assert_eq!(tools.slider(ToolKind::Eraser).progress(), 15);
    }

    #[test]
    fn test_color_selects_brush() {
        let mut tools = defaults();
        tools.set_tool(ToolKind::Eraser);
        tools.set_color(Color32::RED);
        assert_eq!(tools.style(), StrokeStyle::brush(10.0, Color32::RED));
    }

    #[test]
    fn test_each_tool_keeps_its_own_width() {
        let mut tools = defaults();
        tools.set_width_for(ToolKind::Eraser, 40.0).unwrap();
        assert_eq!(tools.style(), StrokeStyle::eraser(40.0));
        assert_eq!(tools.slider(ToolKind::Eraser).progress(), 35);

        tools.set_tool(ToolKind::Brush);
        assert_eq!(tools.style().width(), 10.0);
        assert_eq!(tools.set_width(-3.0), Err(SurfaceError::InvalidWidth(-3.0)));
    }

    #[test]
    fn test_user_slider_drag_sets_width() {
        let mut tools = defaults();
        let changed = tools.apply_slider_event(
            ToolKind::Eraser,
            SliderEvent::ValueChanged { value: 0, from_user: true },
        );
        assert!(changed);
        assert_eq!(tools.style(), StrokeStyle::eraser(5.0));

        let ignored = tools.apply_slider_event(
            ToolKind::Brush,
            SliderEvent::ValueChanged { value: 30, from_user: false },
        );
        assert!(!ignored);
        assert_eq!(tools.tool(), ToolKind::Eraser);
    }
}
