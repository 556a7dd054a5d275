use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    foundation::error::{ScenecropError, ScenecropResult},
    resolve::resolver::StaticArticulation,
    scene::session::{RenderRequest, RenderedScene, SceneSession},
    segment::decode::SegmentationBuffer,
};

/// Sub-directory of a scene holding pre-rendered simulator output.
pub const SNAPSHOT_DIR: &str = "snapshot";

/// On-disk form of a segmentation buffer.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SegmentationRecord {
    pub width: u32,
    pub height: u32,
    pub codes: Vec<i32>,
}

impl SegmentationRecord {
    pub fn from_buffer(buffer: &SegmentationBuffer) -> Self {
        let canvas = buffer.canvas();
        Self {
            width: canvas.width(),
            height: canvas.height(),
            codes: buffer.codes().to_vec(),
        }
    }

    pub fn into_buffer(self) -> ScenecropResult<SegmentationBuffer> {
        SegmentationBuffer::new(self.width, self.height, self.codes)
    }
}

/// Session that reads frames the simulator already rendered into
/// `<scene>/snapshot/`:
///
/// - `rgb.png`, `segmentation.json`
/// - `rgb_transparent.png`, `segmentation_transparent.json` (optional, used for
///   see-through door kinds)
/// - `articulation.json` (optional): `{"(body, joint)": [link, ...]}`
#[derive(Debug, Default)]
pub struct SnapshotSession {
    loaded: Option<PathBuf>,
}

impl SnapshotSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scene directory currently loaded, if any.
    pub fn loaded(&self) -> Option<&Path> {
        self.loaded.as_deref()
    }
}

impl SceneSession for SnapshotSession {
    fn render(&mut self, request: &RenderRequest<'_>) -> ScenecropResult<RenderedScene> {
        if let Some(current) = &self.loaded
            && current != request.scene_dir
        {
            return Err(ScenecropError::validation(format!(
                "session still holds '{}'; reset before rendering '{}'",
                current.display(),
                request.scene_dir.display()
            )));
        }
        self.loaded = Some(request.scene_dir.to_path_buf());

        let snap = request.scene_dir.join(SNAPSHOT_DIR);
        let transparent = request.kind.transparent_doors();
        let rgb_path = variant(&snap, "rgb", "png", transparent);
        let seg_path = variant(&snap, "segmentation", "json", transparent);

        let rgb = image::open(&rgb_path)
            .with_context(|| format!("read rgb '{}'", rgb_path.display()))?
            .to_rgb8();
        let segmentation = read_json::<SegmentationRecord>(&seg_path)?.into_buffer()?;

        let art_path = snap.join("articulation.json");
        let articulation = if art_path.is_file() {
            StaticArticulation::from_keyed(&read_json::<BTreeMap<String, Vec<i32>>>(&art_path)?)?
        } else {
            StaticArticulation::new()
        };

        RenderedScene::new(rgb, segmentation, Box::new(articulation))
    }

    fn reset(&mut self) {
        self.loaded = None;
    }
}

fn variant(dir: &Path, stem: &str, ext: &str, transparent: bool) -> PathBuf {
    if transparent {
        let p = dir.join(format!("{stem}_transparent.{ext}"));
        if p.is_file() {
            return p;
        }
    }
    dir.join(format!("{stem}.{ext}"))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> ScenecropResult<T> {
    let f = File::open(path).with_context(|| format!("open '{}'", path.display()))?;
    serde_json::from_reader(BufReader::new(f))
        .map_err(|e| ScenecropError::serde(format!("parse '{}': {e}", path.display())))
}

#[cfg(test)]
#[path = "../../tests/unit/scene/snapshot.rs"]
mod tests;
