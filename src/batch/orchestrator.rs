use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::Context as _;
use rayon::prelude::*;

use crate::{
    batch::extract::{ExtractJob, ExtractStats, extract_kind},
    batch::gate::{GateDecision, MarkerStatus, VersionGate, expected_artifacts},
    composite::artifact::ArtifactKind,
    foundation::config::PipelineConfig,
    foundation::error::{ScenecropError, ScenecropResult},
    geometry::crop::CropParams,
    resolve::resolver::{ObjectGroup, ObjectIndex},
    scene::config::{PLANNING_CONFIG_BACKUP_FILE, PLANNING_CONFIG_FILE, PlanningConfig, stamp_version},
    scene::problem,
    scene::session::{RenderRequest, SceneSession},
};

/// Planner scratch directories removed when empty.
const EMPTY_SCRATCH_DIRS: [&str; 2] = ["constraint_networks", "stream_plans"];
/// Outputs of older pipeline versions, removed unconditionally.
const OBSOLETE_OUTPUT_DIRS: [&str; 3] = ["rgbs", "masked_rgbs", "rgb_images"];

#[derive(Clone, Debug)]
pub struct BatchOptions {
    pub pipeline: PipelineConfig,
    /// Regenerate every directory regardless of marker and counts.
    pub force: bool,
    /// Clean scratch and obsolete output directories before extraction.
    pub tidy: bool,
    pub parallel: bool,
    /// Worker count for parallel batches; `None` uses one per CPU.
    pub threads: Option<usize>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            force: false,
            tidy: true,
            parallel: false,
            threads: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirOutcome {
    /// Marker and counts were current; no artifact was written.
    Skipped {
        /// Set when artifacts were trusted by recency alone and the marker was
        /// recorded for them.
        stamped: bool,
    },
    Processed {
        stats: ExtractStats,
        /// Whether the version marker was written by this run.
        stamped: bool,
    },
    /// Aborted before completing; the directory stays stale.
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirReport {
    pub scene_dir: PathBuf,
    pub outcome: DirOutcome,
}

impl DirReport {
    pub fn failed_objects(&self) -> usize {
        match &self.outcome {
            DirOutcome::Processed { stats, .. } => stats.failed,
            _ => 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub dirs: Vec<DirReport>,
}

impl BatchReport {
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DirOutcome::Skipped { .. }))
    }

    pub fn processed(&self) -> usize {
        self.count(|o| matches!(o, DirOutcome::Processed { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DirOutcome::Failed(_)))
    }

    /// Artifacts written across all directories.
    pub fn written(&self) -> usize {
        self.dirs
            .iter()
            .map(|d| match &d.outcome {
                DirOutcome::Processed { stats, .. } => stats.written,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, f: impl Fn(&DirOutcome) -> bool) -> usize {
        self.dirs.iter().filter(|d| f(&d.outcome)).count()
    }
}

/// Everything known about a directory before any work is done.
#[derive(Debug)]
pub struct DirPlan {
    pub record: PlanningConfig,
    pub index: ObjectIndex,
    pub groups: Vec<ObjectGroup>,
    pub decision: GateDecision,
}

/// Read the planning record of `scene_dir` and judge its artifacts. Writes nothing.
pub fn plan_dir(
    scene_dir: &Path,
    pipeline: &PipelineConfig,
    now: SystemTime,
) -> ScenecropResult<DirPlan> {
    let record = PlanningConfig::load(scene_dir)?;
    let index = ObjectIndex::from_names(&record.body_to_name);
    let groups = if pipeline.pairwise {
        index.find_groups(&problem::init_facts(scene_dir, &record)?)
    } else {
        Vec::new()
    };
    let expected = expected_artifacts(index.len(), groups.len());
    let decision = VersionGate::from_config(pipeline).decide(
        scene_dir,
        &record,
        &pipeline.kinds,
        expected,
        now,
    )?;
    Ok(DirPlan {
        record,
        index,
        groups,
        decision,
    })
}

/// Bring one scene directory up to date.
///
/// Never fails: errors become [`DirOutcome::Failed`]. The session is reset on
/// every path so the next directory starts from an empty world.
#[tracing::instrument(skip_all, fields(dir = %scene_dir.display()))]
pub fn process_dir<S: SceneSession + ?Sized>(
    session: &mut S,
    scene_dir: &Path,
    opts: &BatchOptions,
) -> DirReport {
    let outcome = match regenerate(session, scene_dir, opts) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(error = %e, "scene directory failed");
            DirOutcome::Failed(e.to_string())
        }
    };
    session.reset();
    DirReport {
        scene_dir: scene_dir.to_path_buf(),
        outcome,
    }
}

fn regenerate<S: SceneSession + ?Sized>(
    session: &mut S,
    scene_dir: &Path,
    opts: &BatchOptions,
) -> ScenecropResult<DirOutcome> {
    if opts.tidy {
        tidy_scene_dir(scene_dir)?;
    }
    let plan = plan_dir(scene_dir, &opts.pipeline, SystemTime::now())?;
    if plan.decision.is_skip() && !opts.force {
        tracing::debug!(marker = ?plan.decision.marker, "up to date");
        // An accepted marker is left untouched; a recent unmarked set gets one.
        let stamped = match plan.decision.marker {
            MarkerStatus::RecentlyGenerated => {
                stamp_version(scene_dir, &opts.pipeline.version_key)?
            }
            _ => false,
        };
        return Ok(DirOutcome::Skipped { stamped });
    }

    let pending = if opts.force {
        opts.pipeline.kinds.clone()
    } else {
        plan.decision.pending_kinds()
    };
    tracing::info!(
        marker = ?plan.decision.marker,
        expected = plan.decision.expected,
        kinds = ?pending,
        "regenerating"
    );

    // A partial set is rebuilt from scratch, never repaired.
    for kind in &pending {
        remove_dir_if_present(&kind.dir(scene_dir))?;
    }

    let crop = CropParams {
        target_size: opts.pipeline.target_size,
        padding: opts.pipeline.padding,
    };
    let mut stats = ExtractStats::default();
    for kind in pending {
        stats += extract_one(session, scene_dir, kind, &plan, &opts.pipeline, crop)?;
    }

    if stats.failed > 0 {
        tracing::warn!(failed = stats.failed, "objects failed; leaving directory unstamped");
        return Ok(DirOutcome::Processed {
            stats,
            stamped: false,
        });
    }
    let stamped = stamp_version(scene_dir, &opts.pipeline.version_key)?;
    Ok(DirOutcome::Processed { stats, stamped })
}

fn extract_one<S: SceneSession + ?Sized>(
    session: &mut S,
    scene_dir: &Path,
    kind: ArtifactKind,
    plan: &DirPlan,
    pipeline: &PipelineConfig,
    crop: CropParams,
) -> ScenecropResult<ExtractStats> {
    let request = RenderRequest {
        scene_dir,
        kind,
        camera_pose: plan.record.camera_pose(),
    };
    let scene = session.render(&request)?;
    let job = ExtractJob {
        scene_dir,
        kind,
        index: &plan.index,
        groups: &plan.groups,
        background: pipeline.background,
        crop,
    };
    let out = extract_kind(&scene, &job);
    // Each kind renders with its own world settings.
    session.reset();
    out
}

/// Remove empty planner scratch directories and obsolete outputs.
pub fn tidy_scene_dir(scene_dir: &Path) -> ScenecropResult<()> {
    for name in EMPTY_SCRATCH_DIRS {
        let dir = scene_dir.join(name);
        if dir.is_dir() && is_empty_dir(&dir)? {
            std::fs::remove_dir(&dir).with_context(|| format!("remove '{}'", dir.display()))?;
        }
    }
    for name in OBSOLETE_OUTPUT_DIRS {
        remove_dir_if_present(&scene_dir.join(name))?;
    }
    Ok(())
}

fn is_empty_dir(dir: &Path) -> ScenecropResult<bool> {
    let mut entries =
        std::fs::read_dir(dir).with_context(|| format!("read dir '{}'", dir.display()))?;
    Ok(entries.next().is_none())
}

fn remove_dir_if_present(dir: &Path) -> ScenecropResult<()> {
    if dir.is_dir() {
        std::fs::remove_dir_all(dir).with_context(|| format!("remove '{}'", dir.display()))?;
        tracing::debug!(dir = %dir.display(), "removed");
    }
    Ok(())
}

/// Process every directory, one session per worker.
///
/// Directory failures are recorded in the report; only invalid options fail the
/// batch itself.
pub fn run_batch<S, F>(
    dirs: &[PathBuf],
    make_session: F,
    opts: &BatchOptions,
) -> ScenecropResult<BatchReport>
where
    S: SceneSession,
    F: Fn() -> S + Sync,
{
    opts.pipeline.validate()?;

    if !opts.parallel {
        let mut session = make_session();
        let dirs = dirs
            .iter()
            .map(|dir| process_dir(&mut session, dir, opts))
            .collect();
        return Ok(BatchReport { dirs });
    }

    let pool = build_thread_pool(opts.threads)?;
    let dirs = pool.install(|| {
        dirs.par_iter()
            .map_init(&make_session, |session, dir| process_dir(session, dir, opts))
            .collect::<Vec<_>>()
    });
    Ok(BatchReport { dirs })
}

fn build_thread_pool(threads: Option<usize>) -> ScenecropResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(ScenecropError::validation(
            "batch 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| ScenecropError::config(format!("failed to build rayon thread pool: {e}")))
}

/// Scene directories under `root`, sorted by path.
///
/// `root` itself is returned when it holds a planning record. A non-empty
/// `cases` keeps only sub-directories with those names.
pub fn discover_scene_dirs(root: &Path, cases: &[String]) -> ScenecropResult<Vec<PathBuf>> {
    if has_planning_record(root) {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut out = Vec::new();
    for entry in std::fs::read_dir(root).with_context(|| format!("read dir '{}'", root.display()))? {
        let path = entry
            .with_context(|| format!("read entry in '{}'", root.display()))?
            .path();
        if !path.is_dir() || !has_planning_record(&path) {
            continue;
        }
        let selected = cases.is_empty()
            || path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| cases.iter().any(|c| c == n));
        if selected {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn has_planning_record(dir: &Path) -> bool {
    dir.join(PLANNING_CONFIG_FILE).is_file() || dir.join(PLANNING_CONFIG_BACKUP_FILE).is_file()
}

#[cfg(test)]
#[path = "../../tests/unit/batch/orchestrator.rs"]
mod tests;
