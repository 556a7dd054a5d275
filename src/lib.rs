//! Scenecrop turns rendered simulation scenes into per-object training images.
//!
//! For every scene directory it renders (or loads) an RGB view with a
//! pixel-aligned segmentation buffer, resolves each indexed object to the body
//! and link ids that make it up, and writes one composite per object on a flat
//! background, optionally cropped to a fixed square.
//!
//! # Pipeline overview
//!
//! 1. **Decode**: `SegmentationBuffer -> SegmentMap` (pixels grouped by part)
//! 2. **Resolve**: `ObjectRef + SegmentMap + Articulation -> PartKeySet`
//! 3. **Mask / crop**: `PartKeySet -> Mask -> CropRect`
//! 4. **Compose**: write `<kind>_[<index>]_<name>.png` once, atomically
//!
//! [`run_batch`] drives the pipeline over many directories, skipping those whose
//! version marker and artifact counts are both current, and stamps the marker
//! only after a directory completes without failures.
#![forbid(unsafe_code)]

mod batch;
mod composite;
mod foundation;
mod geometry;
mod resolve;
mod scene;
mod segment;

pub use batch::extract::{ExtractJob, ExtractStats, extract_kind};
pub use batch::gate::{GateDecision, KindStatus, MarkerStatus, VersionGate, expected_artifacts};
pub use batch::orchestrator::{
    BatchOptions, BatchReport, DirOutcome, DirPlan, DirReport, discover_scene_dirs, plan_dir,
    process_dir, run_batch, tidy_scene_dir,
};
pub use composite::artifact::{ArtifactKind, count_artifacts, first_artifact};
pub use composite::compose::{ArtifactWrite, compose, write_artifact};
pub use foundation::config::{CURRENT_VERSION_KEY, PipelineConfig};
pub use foundation::core::{BoundingBox, Canvas, CropRect, PartKey, Rgb8};
pub use foundation::error::{ScenecropError, ScenecropResult};
pub use foundation::fs::write_atomic;
pub use geometry::crop::{CropParams, crop_rectangle};
pub use geometry::mask::Mask;
pub use resolve::reference::{GROUP_SEPARATOR, ObjectRef};
pub use resolve::resolver::{
    Articulation, IndexedObject, ObjectGroup, ObjectIndex, PartKeySet, StaticArticulation,
    resolve, resolve_group,
};
pub use scene::config::{
    PLANNING_CONFIG_BACKUP_FILE, PLANNING_CONFIG_FILE, PlanningConfig, stamp_version,
};
pub use scene::session::{RenderRequest, RenderedScene, SceneSession};
pub use scene::snapshot::{SNAPSHOT_DIR, SegmentationRecord, SnapshotSession};
pub use segment::decode::{Pixel, SegmentMap, SegmentationBuffer, decode, join_code, split_code};
