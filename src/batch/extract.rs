use std::{ops::AddAssign, path::Path};

use anyhow::Context as _;

use crate::{
    composite::artifact::ArtifactKind,
    composite::compose::{ArtifactWrite, compose, write_artifact},
    foundation::core::{Canvas, Rgb8},
    foundation::error::{ScenecropError, ScenecropResult},
    geometry::crop::{CropParams, crop_rectangle},
    geometry::mask::Mask,
    resolve::resolver::{ObjectGroup, ObjectIndex, PartKeySet, resolve_group},
    scene::session::RenderedScene,
    segment::decode::{SegmentMap, decode},
};

/// Artifact counters for one kind (or a whole directory when summed).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub written: usize,
    pub skipped: usize,
    /// Objects that could not be produced.
    pub failed: usize,
}

impl ExtractStats {
    fn record(&mut self, write: ArtifactWrite) {
        match write {
            ArtifactWrite::Written => self.written += 1,
            ArtifactWrite::Skipped => self.skipped += 1,
        }
    }
}

impl AddAssign for ExtractStats {
    fn add_assign(&mut self, rhs: Self) {
        self.written += rhs.written;
        self.skipped += rhs.skipped;
        self.failed += rhs.failed;
    }
}

/// Everything needed to produce one kind of artifact for one directory.
#[derive(Clone, Copy, Debug)]
pub struct ExtractJob<'a> {
    pub scene_dir: &'a Path,
    pub kind: ArtifactKind,
    pub index: &'a ObjectIndex,
    pub groups: &'a [ObjectGroup],
    pub background: Rgb8,
    pub crop: CropParams,
}

struct Frame<'a> {
    scene: &'a RenderedScene,
    map: SegmentMap,
    canvas: Canvas,
}

/// Write the scene overview and one composite per object and group.
///
/// A failure on one object is logged and counted; the remaining objects are
/// still produced. Only errors writing the scene overview abort the kind.
pub fn extract_kind(scene: &RenderedScene, job: &ExtractJob<'_>) -> ScenecropResult<ExtractStats> {
    let out_dir = job.kind.dir(job.scene_dir);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("create '{}'", out_dir.display()))?;

    let mut stats = ExtractStats::default();
    stats.record(write_artifact(
        &out_dir.join(job.kind.scene_file_name()),
        &scene.rgb,
    )?);

    let frame = Frame {
        scene,
        map: decode(&scene.segmentation),
        canvas: scene.segmentation.canvas(),
    };
    let resolved = job.index.resolve_all(&frame.map, scene.articulation.as_ref());

    for (key, err) in job.index.rejected() {
        tracing::warn!(kind = %job.kind, %key, error = %err, "skipping malformed object key");
        stats.failed += 1;
    }

    for obj in job.index.objects() {
        let path = out_dir.join(job.kind.object_file_name(&obj.key, &obj.name));
        let result = resolved
            .get(&obj.key)
            .ok_or_else(|| ScenecropError::reference(format!("'{}' was not resolved", obj.key)))
            .and_then(|keys| render_object(&frame, keys, &path, job));
        match result {
            Ok(write) => stats.record(write),
            Err(e) => {
                tracing::warn!(kind = %job.kind, key = %obj.key, name = %obj.name, error = %e, "object failed");
                stats.failed += 1;
            }
        }
    }

    for group in job.groups {
        let path = out_dir.join(job.kind.object_file_name(&group.key, &group.name));
        let result = resolve_group(group, &resolved)
            .and_then(|keys| render_object(&frame, &keys, &path, job));
        match result {
            Ok(write) => stats.record(write),
            Err(e) => {
                tracing::warn!(kind = %job.kind, group = %group.name, error = %e, "group failed");
                stats.failed += 1;
            }
        }
    }

    tracing::debug!(
        kind = %job.kind,
        written = stats.written,
        skipped = stats.skipped,
        failed = stats.failed,
        "kind extracted"
    );
    Ok(stats)
}

fn render_object(
    frame: &Frame<'_>,
    keys: &PartKeySet,
    path: &Path,
    job: &ExtractJob<'_>,
) -> ScenecropResult<ArtifactWrite> {
    if path.exists() {
        return Ok(ArtifactWrite::Skipped);
    }
    let mask = Mask::from_keys(&frame.map, keys, frame.canvas);
    let crop = job
        .kind
        .crops()
        .then(|| crop_rectangle(mask.bounding_box(), frame.canvas, job.crop));
    let img = compose(
        &frame.scene.rgb,
        &mask,
        job.background,
        crop,
        job.crop.target_size,
    )?;
    write_artifact(path, &img)
}

#[cfg(test)]
#[path = "../../tests/unit/batch/extract.rs"]
mod tests;
