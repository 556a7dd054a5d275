use std::path::Path;

use image::RgbImage;

use crate::{
    composite::artifact::ArtifactKind,
    foundation::error::{ScenecropError, ScenecropResult},
    resolve::resolver::Articulation,
    segment::decode::SegmentationBuffer,
};

/// What to render for one scene directory.
#[derive(Clone, Copy, Debug)]
pub struct RenderRequest<'a> {
    pub scene_dir: &'a Path,
    /// Artifact kind being produced; decides e.g. whether doors are see-through.
    pub kind: ArtifactKind,
    /// Camera pose from the planning record, passed through uninterpreted.
    pub camera_pose: Option<&'a serde_json::Value>,
}

/// One rendered camera view: pixel-aligned RGB and segmentation plus the
/// articulation topology of the loaded scene.
pub struct RenderedScene {
    pub rgb: RgbImage,
    pub segmentation: SegmentationBuffer,
    pub articulation: Box<dyn Articulation>,
}

impl RenderedScene {
    pub fn new(
        rgb: RgbImage,
        segmentation: SegmentationBuffer,
        articulation: Box<dyn Articulation>,
    ) -> ScenecropResult<Self> {
        let canvas = segmentation.canvas();
        if rgb.dimensions() != (canvas.width(), canvas.height()) {
            return Err(ScenecropError::validation(format!(
                "rgb is {}x{} but segmentation is {}x{}",
                rgb.width(),
                rgb.height(),
                canvas.width(),
                canvas.height()
            )));
        }
        Ok(Self {
            rgb,
            segmentation,
            articulation,
        })
    }
}

/// Handle on the external simulator.
///
/// The simulator keeps one loaded world at a time. Callers render a directory
/// and then call [`SceneSession::reset`] before moving on; one session is
/// never shared between threads.
pub trait SceneSession {
    fn render(&mut self, request: &RenderRequest<'_>) -> ScenecropResult<RenderedScene>;

    /// Drop whatever world is loaded.
    fn reset(&mut self);
}

impl<S: SceneSession + ?Sized> SceneSession for Box<S> {
    fn render(&mut self, request: &RenderRequest<'_>) -> ScenecropResult<RenderedScene> {
        (**self).render(request)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}
