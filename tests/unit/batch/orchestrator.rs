use std::time::SystemTime;

use image::{Rgb, RgbImage};

use super::*;
use crate::{
    resolve::resolver::StaticArticulation, scene::session::RenderedScene,
    segment::decode::SegmentationBuffer,
};

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "scenecrop_{name}_{}_{}",
        std::process::id(),
        SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[derive(Default)]
struct MockSession {
    renders: Vec<ArtifactKind>,
    resets: usize,
    fail: bool,
}

impl SceneSession for MockSession {
    fn render(&mut self, request: &RenderRequest<'_>) -> ScenecropResult<RenderedScene> {
        if self.fail {
            return Err(ScenecropError::validation("simulator could not load scene"));
        }
        self.renders.push(request.kind);
        // Body 2 on the left half, body 5 in the lower right corner.
        let codes = (0..64)
            .map(|i| match (i / 8, i % 8) {
                (_, col) if col < 4 => 2,
                (row, col) if row >= 6 && col >= 6 => 5,
                _ => -1,
            })
            .collect();
        RenderedScene::new(
            RgbImage::from_pixel(8, 8, Rgb([9, 9, 9])),
            SegmentationBuffer::new(8, 8, codes).unwrap(),
            Box::new(StaticArticulation::new()),
        )
    }

    fn reset(&mut self) {
        self.resets += 1;
    }
}

fn write_record(dir: &Path, record: serde_json::Value) {
    std::fs::write(
        dir.join(PLANNING_CONFIG_FILE),
        serde_json::to_vec_pretty(&record).unwrap(),
    )
    .unwrap();
}

fn scene_dir(name: &str) -> PathBuf {
    let dir = temp_dir(name);
    write_record(
        &dir,
        serde_json::json!({
            "body_to_name": { "2": "shelf", "5": "cup" },
            "init_facts": [["on", "cup", "shelf"]],
            "obs_camera_pose": [[1.0, 2.0, 3.0], [0.0, 0.0, 0.0, 1.0]],
        }),
    );
    dir
}

fn opts() -> BatchOptions {
    let mut pipeline = PipelineConfig::default();
    pipeline.target_size = 4;
    pipeline.padding = 1;
    BatchOptions {
        pipeline,
        ..BatchOptions::default()
    }
}

#[test]
fn fresh_directory_is_extracted_and_stamped() {
    let dir = scene_dir("orch_fresh");
    let mut session = MockSession::default();

    let report = process_dir(&mut session, &dir, &opts());
    let DirOutcome::Processed { stats, stamped } = report.outcome else {
        panic!("unexpected outcome {:?}", report.outcome);
    };
    assert_eq!(stats.written, 4);
    assert_eq!(stats.failed, 0);
    assert!(stamped);
    assert!(session.resets >= 1);
    assert_eq!(
        crate::composite::artifact::count_artifacts(&ArtifactKind::TranspImage.dir(&dir)).unwrap(),
        4
    );

    let record = PlanningConfig::load(&dir).unwrap();
    assert_eq!(record.version_key.as_deref(), Some("meraki"));
    assert!(PlanningConfig::backup_path(&dir).is_file());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn complete_directory_is_skipped_without_rendering() {
    let dir = scene_dir("orch_skip");
    let mut session = MockSession::default();
    process_dir(&mut session, &dir, &opts());
    let record_before = std::fs::read(PlanningConfig::path(&dir)).unwrap();

    let mut again = MockSession::default();
    let report = process_dir(&mut again, &dir, &opts());
    assert_eq!(report.outcome, DirOutcome::Skipped { stamped: false });
    assert!(again.renders.is_empty());
    assert_eq!(again.resets, 1);
    assert_eq!(std::fs::read(PlanningConfig::path(&dir)).unwrap(), record_before);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn force_regenerates_a_complete_directory() {
    let dir = scene_dir("orch_force");
    process_dir(&mut MockSession::default(), &dir, &opts());

    let mut forced = opts();
    forced.force = true;
    let report = process_dir(&mut MockSession::default(), &dir, &forced);
    let DirOutcome::Processed { stats, stamped } = report.outcome else {
        panic!("unexpected outcome {:?}", report.outcome);
    };
    assert_eq!(stats.written, 4);
    assert!(!stamped, "marker was already current");
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn render_failure_fails_only_that_directory() {
    let dir = scene_dir("orch_render_fail");
    let mut session = MockSession {
        fail: true,
        ..MockSession::default()
    };

    let report = process_dir(&mut session, &dir, &opts());
    assert!(matches!(report.outcome, DirOutcome::Failed(_)));
    assert_eq!(session.resets, 1);
    assert_eq!(PlanningConfig::load(&dir).unwrap().version_key, None);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn object_failures_leave_directory_unstamped_and_stale() {
    let dir = temp_dir("orch_object_fail");
    write_record(
        &dir,
        serde_json::json!({ "body_to_name": { "5": "cup", "cup?": "broken" } }),
    );

    let report = process_dir(&mut MockSession::default(), &dir, &opts());
    assert_eq!(report.failed_objects(), 1);
    assert!(matches!(
        report.outcome,
        DirOutcome::Processed { stamped: false, .. }
    ));

    let plan = plan_dir(&dir, &opts().pipeline, SystemTime::now()).unwrap();
    assert!(!plan.decision.is_skip());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn problem_init_facts_drive_group_discovery() {
    let dir = temp_dir("orch_problem_facts");
    write_record(
        &dir,
        serde_json::json!({
            "body_to_name": { "2": "shelf", "5": "cup" },
            "init_facts": [["on", "shelf", "floor"]],
        }),
    );
    std::fs::write(
        dir.join(crate::scene::problem::PROBLEM_FILE),
        "(define (problem p) (:init (on cup shelf) (clear cup)))",
    )
    .unwrap();

    let plan = plan_dir(&dir, &opts().pipeline, SystemTime::now()).unwrap();
    assert_eq!(plan.groups.len(), 1);
    assert_eq!(plan.groups[0].name, "cup+shelf");
    assert_eq!(plan.groups[0].key, "5+2");
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn obsolete_marker_discards_previous_artifacts() {
    let dir = temp_dir("orch_obsolete");
    write_record(
        &dir,
        serde_json::json!({ "version_key": "v0", "body_to_name": { "5": "cup" } }),
    );
    let out = ArtifactKind::TranspImage.dir(&dir);
    std::fs::create_dir_all(&out).unwrap();
    std::fs::write(out.join("transp_image_[9]_stale.png"), b"old").unwrap();

    let report = process_dir(&mut MockSession::default(), &dir, &opts());
    assert!(matches!(
        report.outcome,
        DirOutcome::Processed { stamped: true, .. }
    ));
    assert!(!out.join("transp_image_[9]_stale.png").exists());
    assert!(out.join("transp_image_[5]_cup.png").is_file());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn every_requested_kind_is_rendered_with_a_reset_between() {
    let dir = scene_dir("orch_kinds");
    let mut o = opts();
    o.pipeline.kinds = vec![ArtifactKind::SegImage, ArtifactKind::CropImage];
    let mut session = MockSession::default();

    process_dir(&mut session, &dir, &o);
    assert_eq!(
        session.renders,
        vec![ArtifactKind::SegImage, ArtifactKind::CropImage]
    );
    assert!(session.resets >= 2);
    assert!(ArtifactKind::SegImage.dir(&dir).join("seg_image_scene.png").is_file());
    assert!(ArtifactKind::CropImage.dir(&dir).join("crop_image_scene.png").is_file());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn tidy_removes_empty_scratch_and_obsolete_outputs() {
    let dir = temp_dir("orch_tidy");
    std::fs::create_dir_all(dir.join("constraint_networks")).unwrap();
    std::fs::create_dir_all(dir.join("stream_plans")).unwrap();
    std::fs::write(dir.join("stream_plans").join("plan.txt"), b"keep").unwrap();
    std::fs::create_dir_all(dir.join("masked_rgbs")).unwrap();
    std::fs::write(dir.join("masked_rgbs").join("a.png"), b"x").unwrap();

    tidy_scene_dir(&dir).unwrap();
    assert!(!dir.join("constraint_networks").exists());
    assert!(dir.join("stream_plans").join("plan.txt").is_file());
    assert!(!dir.join("masked_rgbs").exists());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn discover_filters_cases_and_sorts() {
    let root = temp_dir("orch_discover");
    for name in ["b_case", "a_case", "c_case"] {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        write_record(&dir, serde_json::json!({}));
    }
    std::fs::create_dir_all(root.join("no_record")).unwrap();

    let all = discover_scene_dirs(&root, &[]).unwrap();
    let names: Vec<_> = all
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a_case", "b_case", "c_case"]);

    let picked = discover_scene_dirs(&root, &["c_case".to_string()]).unwrap();
    assert_eq!(picked, vec![root.join("c_case")]);

    let single = discover_scene_dirs(&root.join("a_case"), &[]).unwrap();
    assert_eq!(single, vec![root.join("a_case")]);
    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn parallel_batch_processes_every_directory() {
    let dirs: Vec<PathBuf> = (0..3).map(|i| scene_dir(&format!("orch_par_{i}"))).collect();
    let mut o = opts();
    o.parallel = true;
    o.threads = Some(2);

    let report = run_batch(&dirs, MockSession::default, &o).unwrap();
    assert_eq!(report.dirs.len(), 3);
    assert_eq!(report.processed(), 3);
    assert_eq!(report.written(), 12);
    for (dir, r) in dirs.iter().zip(&report.dirs) {
        assert_eq!(&r.scene_dir, dir);
    }

    let rerun = run_batch(&dirs, MockSession::default, &o).unwrap();
    assert_eq!(rerun.skipped(), 3);
    for dir in dirs {
        std::fs::remove_dir_all(&dir).ok();
    }
}

#[test]
fn zero_threads_is_rejected() {
    let mut o = opts();
    o.parallel = true;
    o.threads = Some(0);
    assert!(run_batch(&[], MockSession::default, &o).is_err());
}

#[test]
fn sequential_batch_continues_after_failed_directory() {
    let good = scene_dir("orch_seq_good");
    let missing = temp_dir("orch_seq_missing");

    let report = run_batch(
        &[missing.clone(), good.clone()],
        MockSession::default,
        &opts(),
    )
    .unwrap();
    assert_eq!(report.failed(), 1);
    assert_eq!(report.processed(), 1);
    std::fs::remove_dir_all(&good).ok();
    std::fs::remove_dir_all(&missing).ok();
}
