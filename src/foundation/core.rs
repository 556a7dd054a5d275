use std::fmt;

use crate::foundation::error::{ScenecropError, ScenecropResult};

/// Identifier of one rigid part of a simulated body.
///
/// Link ids live in the decoded segmentation space: `0` is the base link and the
/// simulator's articulated link `i` appears as `i + 1`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct PartKey {
    /// Simulator body id.
    pub body: i32,
    /// Link id within the body.
    pub link: i32,
}

impl PartKey {
    /// Link id of a body's base (non-articulated) link.
    pub const BASE_LINK: i32 = 0;

    /// Key assigned to pixels that show no body at all.
    pub const BACKGROUND: PartKey = PartKey {
        body: -1,
        link: Self::BASE_LINK,
    };

    /// Construct a key from body and link ids.
    pub const fn new(body: i32, link: i32) -> Self {
        Self { body, link }
    }

    /// Base-link key of `body`.
    pub const fn base(body: i32) -> Self {
        Self::new(body, Self::BASE_LINK)
    }
}

impl fmt::Display for PartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.body, self.link)
    }
}

/// Pixel dimensions of a rendered frame; both sides are non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> ScenecropResult<Self> {
        if width == 0 || height == 0 {
            return Err(ScenecropError::validation(format!(
                "canvas must be non-empty, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    pub fn width(self) -> u32 {
        self.width
    }

    pub fn height(self) -> u32 {
        self.height
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Straight RGB8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgb8(pub [u8; 3]);

impl Rgb8 {
    /// Background shared by every composited artifact.
    pub const BACKGROUND: Rgb8 = Rgb8([178, 178, 204]);
}

impl Default for Rgb8 {
    fn default() -> Self {
        Self::BACKGROUND
    }
}

/// Inclusive axis-aligned bounds of a mask's true pixels.
///
/// Points are `(x, y)` = `(column, row)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub lower: (u32, u32),
    pub upper: (u32, u32),
}

impl BoundingBox {
    /// Horizontal extent (`upper.x - lower.x`).
    pub fn extent_x(self) -> u32 {
        self.upper.0 - self.lower.0
    }

    /// Vertical extent (`upper.y - lower.y`).
    pub fn extent_y(self) -> u32 {
        self.upper.1 - self.lower.1
    }

    pub fn center(self) -> (f64, f64) {
        (
            (f64::from(self.lower.0) + f64::from(self.upper.0)) / 2.0,
            (f64::from(self.lower.1) + f64::from(self.upper.1)) / 2.0,
        )
    }
}

/// Crop window in pixel coordinates (right/bottom exclusive).
///
/// Always satisfies `left < right <= width` and `top < bottom <= height` for the
/// canvas it was computed against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    /// Whether the cropped region must be scaled to the target size.
    pub needs_resize: bool,
}

impl CropRect {
    pub fn width(self) -> u32 {
        self.right - self.left
    }

    pub fn height(self) -> u32 {
        self.bottom - self.top
    }

    pub fn fits(self, canvas: Canvas) -> bool {
        self.left < self.right
            && self.right <= canvas.width()
            && self.top < self.bottom
            && self.bottom <= canvas.height()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
