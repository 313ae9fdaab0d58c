//! Vertical value picker used for the brush and eraser widths.
//!
//! The slider only tracks values and reports what happened; drawing the
//! track and hiding the control after release are up to the owner.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SliderError {
    #[error("slider range is empty: min {min} > max {max}")]
    EmptyRange { min: i32, max: i32 },
}

/// Notifications for the owner of a slider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderEvent {
    ValueChanged { value: i32, from_user: bool },
    TrackingStarted,
    TrackingStopped,
}

/// On-screen geometry of the slider, in the same units as pointer positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackLayout {
    pub height: f32,
    pub padding_top: f32,
    pub padding_bottom: f32,
    pub thumb_radius: f32,
}

impl TrackLayout {
    pub fn new(height: f32) -> Self {
        Self {
            height,
            ..Default::default()
        }
    }

    fn top(&self) -> f32 {
        self.padding_top + self.thumb_radius
    }

    fn bottom(&self) -> f32 {
        self.height - self.padding_bottom - self.thumb_radius
    }

    fn length(&self) -> f32 {
        self.height - self.padding_top - self.padding_bottom - self.thumb_radius * 2.0
    }
}

impl Default for TrackLayout {
    fn default() -> Self {
        Self {
            height: 300.0,
            padding_top: 0.0,
            padding_bottom: 0.0,
            thumb_radius: 24.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slider {
    min: i32,
    max: i32,
    progress: i32,
    layout: TrackLayout,
    tracking: bool,
}

impl Slider {
    pub fn new(min: i32, max: i32, progress: i32) -> Result<Self, SliderError> {
        if min > max {
            return Err(SliderError::EmptyRange { min, max });
        }
        Ok(Self {
            min,
            max,
            progress: progress.clamp(min, max),
            layout: TrackLayout::default(),
            tracking: false,
        })
    }

    pub fn progress(&self) -> i32 {
        self.progress
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn layout(&self) -> &TrackLayout {
        &self.layout
    }

    pub fn set_layout(&mut self, layout: TrackLayout) {
        self.layout = layout;
    }

    /// Sets the value programmatically. Always reported, even when unchanged.
    pub fn set_progress(&mut self, progress: i32) -> SliderEvent {
        self.progress = progress.clamp(self.min, self.max);
        SliderEvent::ValueChanged {
            value: self.progress,
            from_user: false,
        }
    }

    pub fn set_max(&mut self, max: i32) -> Result<Option<SliderEvent>, SliderError> {
        if max < self.min {
            return Err(SliderError::EmptyRange { min: self.min, max });
        }
        self.max = max;
        Ok((self.progress > max).then(|| self.set_progress(max)))
    }

    pub fn set_min(&mut self, min: i32) -> Result<Option<SliderEvent>, SliderError> {
        if min > self.max {
            return Err(SliderError::EmptyRange { min, max: self.max });
        }
        self.min = min;
        Ok((self.progress < min).then(|| self.set_progress(min)))
    }

    /// Fraction of the range covered by the current value, 0 at `min`.
    pub fn ratio(&self) -> f32 {
        if self.max == self.min {
            return 0.0;
        }
        (f64::from(self.progress) - f64::from(self.min)) as f32 / self.span() as f32
    }

    /// Width of the range; wider than `i32` can hold for extreme bounds.
    fn span(&self) -> i64 {
        i64::from(self.max) - i64::from(self.min)
    }

    /// Vertical centre of the thumb. `None` while the track has no length.
    pub fn thumb_position(&self) -> Option<f32> {
        let length = self.layout.length();
        (length > 0.0).then(|| self.layout.top() + length * (1.0 - self.ratio()))
    }

    pub fn pointer_down(&mut self, y: f32) -> Vec<SliderEvent> {
        self.tracking = true;
        let mut events = vec![SliderEvent::TrackingStarted];
        events.extend(self.track_to(y));
        events
    }

    /// Ignored unless a drag started on this slider.
    pub fn pointer_move(&mut self, y: f32) -> Option<SliderEvent> {
        if !self.tracking {
            return None;
        }
        self.track_to(y)
    }

    /// Ends a drag; also used for cancelled gestures.
    pub fn pointer_up(&mut self) -> Option<SliderEvent> {
        std::mem::take(&mut self.tracking).then_some(SliderEvent::TrackingStopped)
    }

    fn track_to(&mut self, y: f32) -> Option<SliderEvent> {
        let length = self.layout.length();
        if length <= 0.0 {
            return None;
        }

        // The top of the track is the maximum.
        let y = y.clamp(self.layout.top(), self.layout.bottom());
        let ratio = 1.0 - (y - self.layout.top()) / length;
        let offset = (f64::from(ratio) * self.span() as f64) as i64;
        let value = (i64::from(self.min) + offset).clamp(i64::from(self.min), i64::from(self.max));
        let value = i32::try_from(value).unwrap_or(self.max);

        if value == self.progress {
            return None;
        }
        self.progress = value;
        Some(SliderEvent::ValueChanged {
            value,
            from_user: true,
        })
    }
}
