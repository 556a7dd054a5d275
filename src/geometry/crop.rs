use crate::foundation::core::{BoundingBox, Canvas, CropRect};

/// Parameters of the adaptive square crop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropParams {
    /// Output side length; objects that fit are cropped at exactly this size.
    pub target_size: u32,
    /// Margin added on each side of objects larger than `target_size`.
    pub padding: u32,
}

impl Default for CropParams {
    fn default() -> Self {
        Self {
            target_size: 224,
            padding: 30,
        }
    }
}

/// Square crop window around `bbox`, kept inside `canvas`.
///
/// - No box: a `target_size` window centered on the canvas.
/// - Box larger than `target_size`: its longer side plus padding, capped at the
///   canvas height (re-centered vertically when capped) and flagged for resize.
/// - Otherwise: a `target_size` window centered on the box.
///
/// Windows overflowing the right or bottom edge are shifted back inside. The
/// side never exceeds the shorter canvas dimension; a canvas smaller than
/// `target_size` yields a smaller window flagged for resize.
pub fn crop_rectangle(bbox: Option<BoundingBox>, canvas: Canvas, params: CropParams) -> CropRect {
    let w = i64::from(canvas.width());
    let h = i64::from(canvas.height());
    let target = i64::from(params.target_size.max(1));
    let limit = w.min(h);

    let Some(bb) = bbox else {
        let side = target.min(limit);
        return square(
            (w - side) / 2,
            (h - side) / 2,
            side,
            side != target,
        );
    };

    let (cx, mut cy) = bb.center();
    let dmax = i64::from(bb.extent_x().max(bb.extent_y()));

    let mut side = target;
    let mut needs_resize = false;
    if dmax > target {
        side = dmax + 2 * i64::from(params.padding);
        if side > h {
            side = h;
            cy = h as f64 / 2.0;
        }
        needs_resize = true;
    }
    side = side.min(limit);
    needs_resize |= side != target;

    let half = side as f64 / 2.0;
    let mut left = ((cx - half) as i64).max(0);
    let mut top = ((cy - half) as i64).max(0);
    if left + side > w {
        left = w - side;
    }
    if top + side > h {
        top = h - side;
    }
    square(left, top, side, needs_resize)
}

fn square(left: i64, top: i64, side: i64, needs_resize: bool) -> CropRect {
    let left = left.max(0);
    let top = top.max(0);
    CropRect {
        left: left as u32,
        top: top as u32,
        right: (left + side) as u32,
        bottom: (top + side) as u32,
        needs_resize,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/crop.rs"]
mod tests;
