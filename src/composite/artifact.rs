use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context as _;

use crate::foundation::error::{ScenecropError, ScenecropResult};

/// Kind of composited artifact produced per scene directory.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Full-canvas object composites.
    SegImage,
    /// Cropped object composites.
    CropImage,
    /// Cropped composites rendered with see-through doors.
    TranspImage,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [Self::SegImage, Self::CropImage, Self::TranspImage];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SegImage => "seg_image",
            Self::CropImage => "crop_image",
            Self::TranspImage => "transp_image",
        }
    }

    /// Whether object composites of this kind are cropped to the target size.
    pub fn crops(self) -> bool {
        !matches!(self, Self::SegImage)
    }

    /// Whether the scene must be rendered with transparent doors.
    pub fn transparent_doors(self) -> bool {
        matches!(self, Self::TranspImage)
    }

    /// Output sub-directory of `scene_dir` holding this kind.
    pub fn dir(self, scene_dir: &Path) -> PathBuf {
        scene_dir.join(format!("{}s", self.as_str()))
    }

    pub fn scene_file_name(self) -> String {
        format!("{}_scene.png", self.as_str())
    }

    /// `<kind>_[<index>]_<name>.png`
    pub fn object_file_name(self, index_key: &str, name: &str) -> String {
        format!("{}_[{index_key}]_{name}.png", self.as_str())
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = ScenecropError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ScenecropError::validation(format!("unknown artifact kind '{s}'")))
    }
}

fn is_artifact(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|e| e == "png")
}

fn artifact_paths(dir: &Path) -> ScenecropResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read dir '{}'", dir.display()))? {
        let path = entry
            .with_context(|| format!("read entry in '{}'", dir.display()))?
            .path();
        if is_artifact(&path) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Number of finished artifacts in `dir` (0 when it does not exist).
pub fn count_artifacts(dir: &Path) -> ScenecropResult<usize> {
    Ok(artifact_paths(dir)?.len())
}

/// First finished artifact in `dir` by file name.
pub fn first_artifact(dir: &Path) -> ScenecropResult<Option<PathBuf>> {
    Ok(artifact_paths(dir)?.into_iter().next())
}

#[cfg(test)]
#[path = "../../tests/unit/composite/artifact.rs"]
mod tests;
