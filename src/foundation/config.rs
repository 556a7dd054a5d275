use std::{fs::File, io::BufReader, path::Path, time::Duration};

use anyhow::Context as _;

use crate::{
    composite::artifact::ArtifactKind,
    foundation::core::Rgb8,
    foundation::error::{ScenecropError, ScenecropResult},
};

/// Version marker written by this release after a directory completes.
pub const CURRENT_VERSION_KEY: &str = "meraki";

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
/// Pipeline-wide settings shared by every scene directory in a batch.
///
/// Every field has a default so a JSON file only needs to name what it overrides.
pub struct PipelineConfig {
    /// Side length in pixels of every cropped artifact.
    pub target_size: u32,
    /// Padding added on each side of a bounding box larger than `target_size`.
    pub padding: u32,
    /// Background color composited behind each object.
    pub background: Rgb8,
    /// Version marker stamped after a successful directory.
    pub version_key: String,
    /// Markers whose artifacts are still considered current.
    pub accepted_version_keys: Vec<String>,
    /// Window used to trust unmarked directories with fresh artifacts.
    pub recency_window_secs: u64,
    /// Artifact kinds produced per directory.
    pub kinds: Vec<ArtifactKind>,
    /// Include one artifact per object group found in the initial facts.
    pub pairwise: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_size: 224,
            padding: 30,
            background: Rgb8::BACKGROUND,
            version_key: CURRENT_VERSION_KEY.to_string(),
            accepted_version_keys: vec![
                CURRENT_VERSION_KEY.to_string(),
                "crop_fix".to_string(),
                "rgb".to_string(),
            ],
            recency_window_secs: 6000,
            kinds: vec![ArtifactKind::TranspImage],
            pairwise: true,
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file and validate it.
    pub fn from_path(path: &Path) -> ScenecropResult<Self> {
        let f = File::open(path)
            .with_context(|| format!("open pipeline config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| ScenecropError::serde(format!("parse '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> ScenecropResult<()> {
        if self.target_size == 0 {
            return Err(ScenecropError::config("target_size must be > 0"));
        }
        if self.version_key.is_empty() {
            return Err(ScenecropError::config("version_key must be non-empty"));
        }
        if !self.accepted_version_keys.contains(&self.version_key) {
            return Err(ScenecropError::config(format!(
                "accepted_version_keys must contain the current key '{}'",
                self.version_key
            )));
        }
        if self.kinds.is_empty() {
            return Err(ScenecropError::config("at least one artifact kind is required"));
        }
        Ok(())
    }

    pub fn recency_window(&self) -> Duration {
        Duration::from_secs(self.recency_window_secs)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
