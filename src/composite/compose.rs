use std::path::Path;

use anyhow::Context as _;
use image::{Rgb, RgbImage, imageops::FilterType};

use crate::{
    foundation::core::{Canvas, CropRect, Rgb8},
    foundation::error::{ScenecropError, ScenecropResult},
    foundation::fs::write_atomic,
    geometry::mask::Mask,
};

/// Outcome of [`write_artifact`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactWrite {
    Written,
    /// Target already existed and was left untouched.
    Skipped,
}

/// Keep `rgb` where `mask` is set and `background` elsewhere, then crop.
///
/// Crops flagged `needs_resize` are scaled (bilinear) to `target_size` squared.
/// Output depends only on the inputs.
pub fn compose(
    rgb: &RgbImage,
    mask: &Mask,
    background: Rgb8,
    crop: Option<CropRect>,
    target_size: u32,
) -> ScenecropResult<RgbImage> {
    let (width, height) = rgb.dimensions();
    let canvas = mask.canvas();
    if (width, height) != (canvas.width(), canvas.height()) {
        return Err(ScenecropError::validation(format!(
            "rgb is {width}x{height} but mask is {}x{}",
            canvas.width(),
            canvas.height()
        )));
    }

    let mut out = RgbImage::from_pixel(width, height, Rgb(background.0));
    for (x, y, px) in out.enumerate_pixels_mut() {
        if mask.get(y, x) {
            *px = *rgb.get_pixel(x, y);
        }
    }

    let Some(rect) = crop else {
        return Ok(out);
    };
    crop_to(&out, rect, canvas, target_size)
}

fn crop_to(
    img: &RgbImage,
    rect: CropRect,
    canvas: Canvas,
    target_size: u32,
) -> ScenecropResult<RgbImage> {
    if !rect.fits(canvas) {
        return Err(ScenecropError::validation(format!(
            "crop {rect:?} exceeds {}x{} canvas",
            canvas.width(),
            canvas.height()
        )));
    }
    let cropped =
        image::imageops::crop_imm(img, rect.left, rect.top, rect.width(), rect.height()).to_image();
    if !rect.needs_resize {
        return Ok(cropped);
    }
    if target_size == 0 {
        return Err(ScenecropError::validation("target_size must be > 0"));
    }
    Ok(image::imageops::resize(
        &cropped,
        target_size,
        target_size,
        FilterType::Triangle,
    ))
}

/// Save `img` as PNG at `path` unless a file is already there.
pub fn write_artifact(path: &Path, img: &RgbImage) -> ScenecropResult<ArtifactWrite> {
    if path.exists() {
        return Ok(ArtifactWrite::Skipped);
    }
    write_atomic(path, |tmp| {
        img.save_with_format(tmp, image::ImageFormat::Png)
            .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    })?;
    Ok(ArtifactWrite::Written)
}

#[cfg(test)]
#[path = "../../tests/unit/composite/compose.rs"]
mod tests;
