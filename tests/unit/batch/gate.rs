use std::path::PathBuf;

use super::*;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "scenecrop_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn gate() -> VersionGate {
    VersionGate::from_config(&PipelineConfig::default())
}

fn touch_artifacts(dir: &Path, kind: ArtifactKind, n: usize) -> PathBuf {
    let out = kind.dir(dir);
    std::fs::create_dir_all(&out).unwrap();
    for i in 0..n {
        std::fs::write(out.join(format!("{kind}_{i}.png")), b"png").unwrap();
    }
    out
}

fn marked(key: &str) -> PlanningConfig {
    PlanningConfig {
        version_key: Some(key.to_string()),
        ..PlanningConfig::default()
    }
}

#[test]
fn expected_count_adds_scene_and_groups() {
    assert_eq!(expected_artifacts(4, 2), 7);
    assert_eq!(expected_artifacts(0, 0), 1);
}

#[test]
fn marker_allow_list_decides_when_present() {
    let dir = temp_dir("gate_marker");
    let kinds = [ArtifactKind::CropImage];
    let now = SystemTime::now();
    assert_eq!(
        gate().marker_status(&dir, &marked("crop_fix"), &kinds, now).unwrap(),
        MarkerStatus::Accepted("crop_fix".to_string())
    );
    assert_eq!(
        gate().marker_status(&dir, &marked("v0"), &kinds, now).unwrap(),
        MarkerStatus::Obsolete("v0".to_string())
    );
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn unmarked_directory_uses_recency_window() {
    let dir = temp_dir("gate_recency");
    let kinds = [ArtifactKind::CropImage];
    let record = PlanningConfig::default();

    assert_eq!(
        gate().marker_status(&dir, &record, &kinds, SystemTime::now()).unwrap(),
        MarkerStatus::Unmarked
    );

    let out = touch_artifacts(&dir, ArtifactKind::CropImage, 1);
    let modified = std::fs::metadata(out.join("crop_image_0.png"))
        .unwrap()
        .modified()
        .unwrap();

    let soon = modified + Duration::from_secs(10);
    assert_eq!(
        gate().marker_status(&dir, &record, &kinds, soon).unwrap(),
        MarkerStatus::RecentlyGenerated
    );

    let later = modified + Duration::from_secs(10_000);
    assert_eq!(
        gate().marker_status(&dir, &record, &kinds, later).unwrap(),
        MarkerStatus::Unmarked
    );
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn low_count_is_stale_even_with_accepted_marker() {
    let dir = temp_dir("gate_count");
    touch_artifacts(&dir, ArtifactKind::TranspImage, 3);
    let kinds = [ArtifactKind::TranspImage];

    let decision = gate()
        .decide(&dir, &marked("meraki"), &kinds, 4, SystemTime::now())
        .unwrap();
    assert!(decision.marker.is_current());
    assert!(!decision.is_skip());
    assert_eq!(decision.pending_kinds(), vec![ArtifactKind::TranspImage]);

    let full = gate()
        .decide(&dir, &marked("meraki"), &kinds, 3, SystemTime::now())
        .unwrap();
    assert!(full.is_skip());
    assert!(full.pending_kinds().is_empty());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn obsolete_marker_makes_every_kind_pending() {
    let dir = temp_dir("gate_obsolete");
    touch_artifacts(&dir, ArtifactKind::CropImage, 5);
    touch_artifacts(&dir, ArtifactKind::SegImage, 5);
    let kinds = [ArtifactKind::SegImage, ArtifactKind::CropImage];

    let decision = gate()
        .decide(&dir, &marked("v0"), &kinds, 5, SystemTime::now())
        .unwrap();
    assert!(!decision.is_skip());
    assert_eq!(decision.pending_kinds(), kinds.to_vec());
    std::fs::remove_dir_all(&dir).ok();
}
