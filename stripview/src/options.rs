use crate::{Orientation, Size};

/// The default number of points on either side of each item.
///
/// The space between two neighbouring items is twice this value.
pub const DEFAULT_HORIZONTAL_MARGIN: f64 = 10.0;

/// Duration of an animated `move_to_item`.
pub const DEFAULT_ANIMATION_DURATION_MS: u64 = 300;

/// Configuration for [`crate::StripView`].
///
/// Everything here is plain data; callbacks are supplied through
/// [`crate::StripDataSource`] and [`crate::StripDelegate`] instead.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StripOptions {
    /// Points on either side of each page along the axis of travel.
    pub horizontal_margin: f64,
    pub orientation: Orientation,
    /// The viewport the strip starts with. Later changes go through the resize phases.
    pub initial_viewport: Size,
    /// How long an animated programmatic move takes.
    pub animation_duration_ms: u64,
}

impl Default for StripOptions {
    fn default() -> Self {
        Self {
            horizontal_margin: DEFAULT_HORIZONTAL_MARGIN,
            orientation: Orientation::Horizontal,
            initial_viewport: Size::default(),
            animation_duration_ms: DEFAULT_ANIMATION_DURATION_MS,
        }
    }
}

impl StripOptions {
    pub fn new(initial_viewport: Size) -> Self {
        Self {
            initial_viewport,
            ..Self::default()
        }
    }

    pub fn with_horizontal_margin(mut self, margin: f64) -> Self {
        self.horizontal_margin = margin.max(0.0);
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_initial_viewport(mut self, viewport: Size) -> Self {
        self.initial_viewport = viewport;
        self
    }

    pub fn with_animation_duration_ms(mut self, duration_ms: u64) -> Self {
        self.animation_duration_ms = duration_ms;
        self
    }
}
