use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::foundation::{
    error::{ScenecropError, ScenecropResult},
    fs::write_atomic,
};

/// Per-scene planning record.
pub const PLANNING_CONFIG_FILE: &str = "planning_config.json";
/// Copy of the previous record kept before each rewrite.
pub const PLANNING_CONFIG_BACKUP_FILE: &str = "planning_config_tmp.json";

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// The scene directory's planning record, as far as extraction cares.
///
/// Fields this crate does not interpret are kept in `extra` and written back
/// unchanged.
pub struct PlanningConfig {
    /// Pipeline version that last completed this directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_key: Option<String>,
    /// Object index: string-encoded reference -> display name.
    #[serde(default)]
    pub body_to_name: BTreeMap<String, String>,
    /// Camera pose used when planning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obs_camera_pose: Option<serde_json::Value>,
    /// Camera pose used for artifact rendering, when it differs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_camera_pose: Option<serde_json::Value>,
    /// Initial-state facts, each a predicate followed by its arguments.
    ///
    /// Only read when the scene has no `problem.pddl`; see [`crate::scene::problem`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init_facts: Vec<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PlanningConfig {
    pub fn path(scene_dir: &Path) -> PathBuf {
        scene_dir.join(PLANNING_CONFIG_FILE)
    }

    pub fn backup_path(scene_dir: &Path) -> PathBuf {
        scene_dir.join(PLANNING_CONFIG_BACKUP_FILE)
    }

    /// Read the record of `scene_dir`.
    ///
    /// Falls back to the backup when the primary record is missing, which only
    /// happens when an older tool moved it aside and stopped before rewriting.
    pub fn load(scene_dir: &Path) -> ScenecropResult<Self> {
        let primary = Self::path(scene_dir);
        let path = if primary.is_file() {
            primary
        } else {
            let backup = Self::backup_path(scene_dir);
            if !backup.is_file() {
                return Err(ScenecropError::config(format!(
                    "no {PLANNING_CONFIG_FILE} in '{}'",
                    scene_dir.display()
                )));
            }
            tracing::warn!(dir = %scene_dir.display(), "using backup planning record");
            backup
        };
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> ScenecropResult<Self> {
        let f = File::open(path).with_context(|| format!("open '{}'", path.display()))?;
        serde_json::from_reader(BufReader::new(f))
            .map_err(|e| ScenecropError::serde(format!("parse '{}': {e}", path.display())))
    }

    /// Camera pose to render artifacts from.
    pub fn camera_pose(&self) -> Option<&serde_json::Value> {
        self.img_camera_pose
            .as_ref()
            .or(self.obs_camera_pose.as_ref())
    }

    /// Replace the record of `scene_dir` with `self`.
    ///
    /// The current record is copied to the backup path first; the new record is
    /// written to a temp file and renamed into place.
    pub fn save(&self, scene_dir: &Path) -> ScenecropResult<()> {
        let path = Self::path(scene_dir);
        if path.is_file() {
            let backup = Self::backup_path(scene_dir);
            std::fs::copy(&path, &backup).with_context(|| {
                format!("back up '{}' to '{}'", path.display(), backup.display())
            })?;
        }
        write_atomic(&path, |tmp| {
            let f = File::create(tmp).with_context(|| format!("create '{}'", tmp.display()))?;
            let mut w = BufWriter::new(f);
            serde_json::to_writer_pretty(&mut w, self)
                .map_err(|e| ScenecropError::serde(format!("encode planning record: {e}")))?;
            w.write_all(b"\n")
                .and_then(|_| w.flush())
                .with_context(|| format!("flush '{}'", tmp.display()))?;
            Ok(())
        })
    }
}

/// Record `version_key` as the completed version of `scene_dir`.
///
/// Returns `false` without touching the disk when the marker is already current.
pub fn stamp_version(scene_dir: &Path, version_key: &str) -> ScenecropResult<bool> {
    let mut cfg = PlanningConfig::load(scene_dir)?;
    if cfg.version_key.as_deref() == Some(version_key) {
        return Ok(false);
    }
    cfg.version_key = Some(version_key.to_string());
    cfg.save(scene_dir)?;
    Ok(true)
}

#[cfg(test)]
#[path = "../../tests/unit/scene/config.rs"]
mod tests;
