use crate::{
    foundation::core::{BoundingBox, Canvas},
    resolve::resolver::PartKeySet,
    segment::decode::SegmentMap,
};

/// Per-pixel visibility of one object, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    canvas: Canvas,
    bits: Vec<bool>,
}

impl Mask {
    pub fn empty(canvas: Canvas) -> Self {
        Self {
            canvas,
            bits: vec![false; canvas.pixel_count()],
        }
    }

    /// Mark every pixel of every key in `keys`.
    ///
    /// Keys missing from `map` are not visible from this pose and contribute
    /// nothing. Pixels outside `canvas` are ignored.
    pub fn from_keys(map: &SegmentMap, keys: &PartKeySet, canvas: Canvas) -> Self {
        let mut mask = Self::empty(canvas);
        for key in keys {
            let Some(pixels) = map.get(key) else {
                tracing::trace!(%key, "part key not visible");
                continue;
            };
            for &(row, col) in pixels {
                mask.set(row, col, true);
            }
        }
        mask
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn get(&self, row: u32, col: u32) -> bool {
        self.index(row, col).is_some_and(|i| self.bits[i])
    }

    pub fn set(&mut self, row: u32, col: u32, value: bool) {
        if let Some(i) = self.index(row, col) {
            self.bits[i] = value;
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|&b| b)
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Minimal inclusive box around the true pixels, `None` when nothing is set.
    ///
    /// Row and column extrema are taken independently, which is exact for an
    /// indicator grid.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let width = self.canvas.width() as usize;
        let mut rows: Option<(u32, u32)> = None;
        let mut cols: Option<(u32, u32)> = None;

        for (row, line) in self.bits.chunks_exact(width).enumerate() {
            let Some(first) = line.iter().position(|&b| b) else {
                continue;
            };
            // `position` found a set bit, so `rposition` does too.
            let last = line.iter().rposition(|&b| b).unwrap_or(first);
            let row = row as u32;
            rows = Some(rows.map_or((row, row), |(lo, _)| (lo, row)));
            cols = Some(cols.map_or((first as u32, last as u32), |(lo, hi)| {
                (lo.min(first as u32), hi.max(last as u32))
            }));
        }

        let ((y0, y1), (x0, x1)) = (rows?, cols?);
        Some(BoundingBox {
            lower: (x0, y0),
            upper: (x1, y1),
        })
    }

    fn index(&self, row: u32, col: u32) -> Option<usize> {
        if row >= self.canvas.height() || col >= self.canvas.width() {
            return None;
        }
        Some(row as usize * self.canvas.width() as usize + col as usize)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/mask.rs"]
mod tests;
