use std::collections::BTreeMap;

use crate::foundation::{
    core::{Canvas, PartKey},
    error::{ScenecropError, ScenecropResult},
};

const BODY_MASK: i32 = 0x00FF_FFFF;
const LINK_SHIFT: u32 = 24;

/// Pixel coordinate as `(row, col)`.
pub type Pixel = (u32, u32);

/// Pixels per part key, ordered by key.
pub type SegmentMap = BTreeMap<PartKey, Vec<Pixel>>;

/// Composite per-pixel body/link codes for one rendered camera pose.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentationBuffer {
    canvas: Canvas,
    /// Row-major codes, `width * height` entries.
    codes: Vec<i32>,
}

impl SegmentationBuffer {
    pub fn new(width: u32, height: u32, codes: Vec<i32>) -> ScenecropResult<Self> {
        let canvas = Canvas::new(width, height)?;
        if codes.len() != canvas.pixel_count() {
            return Err(ScenecropError::validation(format!(
                "segmentation buffer has {} codes, expected {width}x{height}",
                codes.len()
            )));
        }
        Ok(Self { canvas, codes })
    }

    /// Buffer where every pixel shows `code`.
    pub fn filled(width: u32, height: u32, code: i32) -> ScenecropResult<Self> {
        let canvas = Canvas::new(width, height)?;
        Self::new(width, height, vec![code; canvas.pixel_count()])
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn codes(&self) -> &[i32] {
        &self.codes
    }

    pub fn code_at(&self, row: u32, col: u32) -> Option<i32> {
        if row >= self.canvas.height() || col >= self.canvas.width() {
            return None;
        }
        self.codes
            .get(row as usize * self.canvas.width() as usize + col as usize)
            .copied()
    }
}

/// Split one composite code into its part key.
///
/// Negative codes mark pixels with no body.
pub fn split_code(code: i32) -> PartKey {
    if code < 0 {
        return PartKey::BACKGROUND;
    }
    PartKey::new(code & BODY_MASK, code >> LINK_SHIFT)
}

/// Inverse of [`split_code`] for in-range ids.
pub fn join_code(key: PartKey) -> i32 {
    if key == PartKey::BACKGROUND {
        return -1;
    }
    (key.link << LINK_SHIFT) | (key.body & BODY_MASK)
}

/// Group every pixel of `buffer` under the part key its code decodes to.
///
/// Each pixel lands in exactly one entry. Codes are not checked for physical
/// plausibility.
pub fn decode(buffer: &SegmentationBuffer) -> SegmentMap {
    let mut out = SegmentMap::new();
    let width = buffer.canvas.width() as usize;
    for (idx, &code) in buffer.codes.iter().enumerate() {
        let row = (idx / width) as u32;
        let col = (idx % width) as u32;
        out.entry(split_code(code)).or_default().push((row, col));
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/segment/decode.rs"]
mod tests;
