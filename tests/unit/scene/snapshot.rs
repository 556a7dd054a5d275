use super::*;
use crate::{composite::artifact::ArtifactKind, resolve::resolver::Articulation as _};

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "scenecrop_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(dir.join(SNAPSHOT_DIR)).unwrap();
    dir
}

fn write_snapshot(dir: &Path, suffix: &str, shade: u8) {
    let snap = dir.join(SNAPSHOT_DIR);
    image::RgbImage::from_pixel(3, 2, image::Rgb([shade, shade, shade]))
        .save(snap.join(format!("rgb{suffix}.png")))
        .unwrap();
    let seg = SegmentationRecord::from_buffer(
        &SegmentationBuffer::new(3, 2, vec![-1, 4, 4, (1 << 24) | 4, -1, -1]).unwrap(),
    );
    std::fs::write(
        snap.join(format!("segmentation{suffix}.json")),
        serde_json::to_vec(&seg).unwrap(),
    )
    .unwrap();
}

fn request(dir: &Path, kind: ArtifactKind) -> RenderRequest<'_> {
    RenderRequest {
        scene_dir: dir,
        kind,
        camera_pose: None,
    }
}

#[test]
fn renders_snapshot_files() {
    let dir = temp_dir("snapshot_render");
    write_snapshot(&dir, "", 10);
    std::fs::write(
        dir.join(SNAPSHOT_DIR).join("articulation.json"),
        r#"{ "(4, 0)": [1] }"#,
    )
    .unwrap();

    let mut session = SnapshotSession::new();
    let scene = session.render(&request(&dir, ArtifactKind::CropImage)).unwrap();
    assert_eq!(scene.rgb.dimensions(), (3, 2));
    assert_eq!(scene.segmentation.codes().len(), 6);
    assert_eq!(scene.articulation.links_actuated_by(4, 0), vec![1]);
    assert_eq!(session.loaded(), Some(dir.as_path()));

    session.reset();
    assert_eq!(session.loaded(), None);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn transparent_kind_prefers_transparent_variant() {
    let dir = temp_dir("snapshot_transparent");
    write_snapshot(&dir, "", 10);
    write_snapshot(&dir, "_transparent", 200);

    let mut session = SnapshotSession::new();
    let opaque = session.render(&request(&dir, ArtifactKind::CropImage)).unwrap();
    let clear = session.render(&request(&dir, ArtifactKind::TranspImage)).unwrap();
    assert_eq!(opaque.rgb.get_pixel(0, 0).0, [10, 10, 10]);
    assert_eq!(clear.rgb.get_pixel(0, 0).0, [200, 200, 200]);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn switching_scenes_requires_reset() {
    let a = temp_dir("snapshot_a");
    let b = temp_dir("snapshot_b");
    write_snapshot(&a, "", 1);
    write_snapshot(&b, "", 2);

    let mut session = SnapshotSession::new();
    session.render(&request(&a, ArtifactKind::SegImage)).unwrap();
    assert!(session.render(&request(&b, ArtifactKind::SegImage)).is_err());
    session.reset();
    session.render(&request(&b, ArtifactKind::SegImage)).unwrap();

    std::fs::remove_dir_all(&a).ok();
    std::fs::remove_dir_all(&b).ok();
}

#[test]
fn mismatched_buffers_are_rejected() {
    let dir = temp_dir("snapshot_mismatch");
    write_snapshot(&dir, "", 10);
    let seg = SegmentationRecord {
        width: 2,
        height: 2,
        codes: vec![0; 4],
    };
    std::fs::write(
        dir.join(SNAPSHOT_DIR).join("segmentation.json"),
        serde_json::to_vec(&seg).unwrap(),
    )
    .unwrap();

    let mut session = SnapshotSession::new();
    assert!(session.render(&request(&dir, ArtifactKind::CropImage)).is_err());
    std::fs::remove_dir_all(&dir).ok();
}
