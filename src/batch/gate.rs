use std::{
    path::Path,
    time::{Duration, SystemTime},
};

use anyhow::Context as _;

use crate::{
    composite::artifact::{ArtifactKind, count_artifacts, first_artifact},
    foundation::config::PipelineConfig,
    foundation::error::ScenecropResult,
    scene::config::PlanningConfig,
};

/// Artifacts a complete directory holds per kind: one per object, one per
/// object group, plus the scene overview.
pub fn expected_artifacts(objects: usize, groups: usize) -> usize {
    objects + 1 + groups
}

/// What the version marker (or its absence) says about a directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkerStatus {
    /// Marker present and in the accepted list.
    Accepted(String),
    /// Marker present but obsolete.
    Obsolete(String),
    /// No marker; an artifact was written within the recency window.
    RecentlyGenerated,
    /// No marker and no recent artifact.
    Unmarked,
}

impl MarkerStatus {
    pub fn is_current(&self) -> bool {
        matches!(self, Self::Accepted(_) | Self::RecentlyGenerated)
    }
}

/// Artifact count of one kind against the expected count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KindStatus {
    pub kind: ArtifactKind,
    pub existing: usize,
}

/// Staleness verdict for one scene directory.
///
/// Marker and artifact counts are independent signals; a directory is skipped
/// only when both pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateDecision {
    pub marker: MarkerStatus,
    pub expected: usize,
    pub kinds: Vec<KindStatus>,
}

impl GateDecision {
    pub fn is_skip(&self) -> bool {
        self.marker.is_current() && self.kinds.iter().all(|k| k.existing >= self.expected)
    }

    /// Kinds that must be (re)extracted.
    ///
    /// With a stale marker every kind is pending since its outputs are wiped.
    pub fn pending_kinds(&self) -> Vec<ArtifactKind> {
        let stale = !self.marker.is_current();
        self.kinds
            .iter()
            .filter(|k| stale || k.existing < self.expected)
            .map(|k| k.kind)
            .collect()
    }
}

/// Decides per directory whether artifacts are current.
#[derive(Clone, Debug)]
pub struct VersionGate {
    current: String,
    accepted: Vec<String>,
    recency_window: Duration,
}

impl VersionGate {
    pub fn new(
        current: impl Into<String>,
        accepted: Vec<String>,
        recency_window: Duration,
    ) -> Self {
        Self {
            current: current.into(),
            accepted,
            recency_window,
        }
    }

    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self::new(
            cfg.version_key.clone(),
            cfg.accepted_version_keys.clone(),
            cfg.recency_window(),
        )
    }

    /// Marker written after a directory completes.
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Judge the marker of `scene_dir`.
    ///
    /// Without a marker, the first existing artifact of any of `kinds` decides:
    /// written within the recency window means the directory was just processed.
    pub fn marker_status(
        &self,
        scene_dir: &Path,
        record: &PlanningConfig,
        kinds: &[ArtifactKind],
        now: SystemTime,
    ) -> ScenecropResult<MarkerStatus> {
        if let Some(key) = &record.version_key {
            return Ok(if self.accepted.contains(key) {
                MarkerStatus::Accepted(key.clone())
            } else {
                MarkerStatus::Obsolete(key.clone())
            });
        }

        for kind in kinds {
            let Some(path) = first_artifact(&kind.dir(scene_dir))? else {
                continue;
            };
            let modified = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .with_context(|| format!("stat '{}'", path.display()))?;
            // A timestamp in the future counts as fresh.
            let age = now.duration_since(modified).unwrap_or_default();
            return Ok(if age < self.recency_window {
                MarkerStatus::RecentlyGenerated
            } else {
                MarkerStatus::Unmarked
            });
        }
        Ok(MarkerStatus::Unmarked)
    }

    pub fn decide(
        &self,
        scene_dir: &Path,
        record: &PlanningConfig,
        kinds: &[ArtifactKind],
        expected: usize,
        now: SystemTime,
    ) -> ScenecropResult<GateDecision> {
        let marker = self.marker_status(scene_dir, record, kinds, now)?;
        let kinds = kinds
            .iter()
            .map(|&kind| {
                Ok(KindStatus {
                    kind,
                    existing: count_artifacts(&kind.dir(scene_dir))?,
                })
            })
            .collect::<ScenecropResult<Vec<_>>>()?;
        Ok(GateDecision {
            marker,
            expected,
            kinds,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/batch/gate.rs"]
mod tests;
