/// The axis the strip travels along.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// Viewport dimensions in points.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Extent along the axis of travel.
    pub fn main(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.width,
            Orientation::Vertical => self.height,
        }
    }

    /// Extent across the axis of travel.
    pub fn cross(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.height,
            Orientation::Vertical => self.width,
        }
    }
}

/// An item frame in content coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a rect from main/cross axis components.
    pub fn from_axes(
        orientation: Orientation,
        main_origin: f64,
        main_size: f64,
        cross_size: f64,
    ) -> Self {
        match orientation {
            Orientation::Horizontal => Self::new(main_origin, 0.0, main_size, cross_size),
            Orientation::Vertical => Self::new(0.0, main_origin, cross_size, main_size),
        }
    }

    pub fn main_origin(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.x,
            Orientation::Vertical => self.y,
        }
    }

    pub fn main_size(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.width,
            Orientation::Vertical => self.height,
        }
    }
}

/// An inclusive range of item indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemRange {
    pub first: usize,
    pub last: usize, // inclusive
}

impl ItemRange {
    pub fn contains(&self, index: usize) -> bool {
        index >= self.first && index <= self.last
    }

    /// Number of indices in the range (never zero).
    pub fn count(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn iter(&self) -> core::ops::RangeInclusive<usize> {
        self.first..=self.last
    }
}
