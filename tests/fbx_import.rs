mod common;

use fbx_viewer::progress::LoadingIndicator;
use fbx_viewer::upload::{import_file, ImportOutcome, ImportWorker, UploadQueue};
use fbx_viewer::validate::{header_hex, validate_file, validate_header, HEADER_LEN, KNOWN_SIGNATURES};
use fbx_viewer::ViewerError;
use glam::Vec3;
use std::path::{Path, PathBuf};

fn names(outcomes: &[ImportOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .map(|outcome| match outcome {
            ImportOutcome::Imported { name, .. } => format!("ok:{name}"),
            ImportOutcome::Rejected { path, .. } => {
                format!("err:{}", path.file_name().expect("file name").to_string_lossy())
            }
        })
        .collect()
}

fn mixed_batch(dir: &Path) -> Vec<PathBuf> {
    vec![
        common::write_file(dir, "a.fbx", b"definitely not a model"),
        common::write_file(dir, "b.fbx", &common::cube_document([0.0; 3], [1.0, 1.0, 1.0])),
        common::write_file(dir, "c.fbx", &common::cube_document([5.0, 0.0, 0.0], [0.0, 1.0, 0.0])),
    ]
}

#[test]
fn binary_header_is_accepted_and_junk_is_not() {
    let document = common::cube_document([0.0; 3], [1.0; 3]);
    assert!(validate_header(&document));
    assert!(validate_header(b"; FBX 7.4.0 project file"));
    assert!(!validate_header(b"\x89PNG\r\n\x1a\n"));
    assert!(!validate_header(&[]));

    let dir = tempfile::tempdir().expect("temp dir");
    assert!(validate_file(&common::write_file(dir.path(), "cube.fbx", &document)));
    assert!(!validate_file(&dir.path().join("missing.fbx")));
}

#[test]
fn files_starting_with_any_known_signature_pass_validation() {
    let dir = tempfile::tempdir().expect("temp dir");
    for (index, signature) in KNOWN_SIGNATURES.iter().enumerate() {
        let mut bytes: Vec<u8> = (0..signature.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&signature[i..i + 2], 16).expect("hex pair"))
            .collect();
        bytes.resize(HEADER_LEN * 3, 0x11);
        let path = common::write_file(dir.path(), &format!("signature-{index}.fbx"), &bytes);
        assert!(validate_file(&path), "{signature}");
        assert!(header_hex(&bytes).starts_with(signature));
    }

    let renamed_image = common::write_file(dir.path(), "photo.fbx", b"\xff\xd8\xff\xe0\x00\x10JFIF\x00");
    assert!(!validate_file(&renamed_image));
}

#[test]
fn cube_imports_in_world_space_with_its_material() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = common::write_file(dir.path(), "crate.fbx", &common::cube_document([10.0, 0.0, 0.0], [1.0, 0.0, 0.0]));
    let indicator = LoadingIndicator::new();

    let outcome = import_file(&path, &indicator);
    let ImportOutcome::Imported { name, model, .. } = outcome else {
        panic!("cube should import: {outcome:?}");
    };
    assert_eq!(name, "crate.fbx");
    assert_eq!(model.name, "crate.fbx");
    assert_eq!(model.meshes.len(), 1);

    let mesh = &model.meshes[0];
    assert_eq!(mesh.name, "Cube");
    assert_eq!(mesh.geometry.indices.len(), 36, "six quads become twelve triangles");
    let bounds = model.bounds();
    assert!((bounds.min - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-5, "min {:?}", bounds.min);
    assert!((bounds.max - Vec3::new(11.0, 1.0, 1.0)).length() < 1e-5, "max {:?}", bounds.max);

    assert_eq!(mesh.materials.len(), 1);
    assert_eq!(mesh.materials[0].label, "Paint");
    assert_eq!(mesh.materials[0].base_color, [1.0, 0.0, 0.0, 1.0]);
    assert!(!indicator.snapshot().visible, "indicator hidden once the load finishes");
}

#[test]
fn rejections_carry_user_facing_errors() {
    let dir = tempfile::tempdir().expect("temp dir");
    let indicator = LoadingIndicator::new();

    let junk = common::write_file(dir.path(), "notes.txt", b"plain text notes");
    match import_file(&junk, &indicator) {
        ImportOutcome::Rejected { error: ViewerError::InvalidFormat { name }, .. } => assert_eq!(name, "notes.txt"),
        other => panic!("expected invalid format, got {other:?}"),
    }

    let empty = common::write_file(dir.path(), "empty.fbx", &common::empty_document());
    match import_file(&empty, &indicator) {
        ImportOutcome::Rejected { error: error @ ViewerError::Parse { .. }, .. } => {
            assert!(error.to_string().starts_with("Failed to load model empty.fbx"), "{error}");
        }
        other => panic!("expected parse failure, got {other:?}"),
    }

    let truncated = common::cube_document([0.0; 3], [1.0; 3]);
    let truncated = common::write_file(dir.path(), "cut.fbx", &truncated[..64]);
    assert!(matches!(
        import_file(&truncated, &indicator),
        ImportOutcome::Rejected { error: ViewerError::Parse { .. }, .. }
    ));
}

#[test]
fn inline_queue_keeps_submission_order_past_failures() {
    let dir = tempfile::tempdir().expect("temp dir");
    let indicator = LoadingIndicator::new();
    let mut queue = UploadQueue::new();
    queue.enqueue(mixed_batch(dir.path()));
    assert_eq!(queue.len(), 3);

    let first = queue.process_next(&indicator).expect("first outcome");
    assert_eq!(names(&[first]), vec!["err:a.fbx"]);
    queue.enqueue([common::write_file(dir.path(), "d.fbx", b"still junk")]);

    let rest = queue.process_all(&indicator);
    assert_eq!(names(&rest), vec!["ok:b.fbx", "ok:c.fbx", "err:d.fbx"]);
    assert!(queue.is_empty());
}

#[test]
fn worker_returns_outcomes_in_submission_order() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut worker = ImportWorker::new(LoadingIndicator::new()).expect("import worker");
    worker.submit(mixed_batch(dir.path())).expect("worker accepts batch");
    let late = common::write_file(dir.path(), "e.fbx", &common::cube_document([0.0; 3], [1.0; 3]));
    worker.submit([late]).expect("second batch");
    assert_eq!(worker.pending(), 4);

    let outcomes: Vec<ImportOutcome> = (0..4).map(|_| worker.recv().expect("outcome")).collect();
    assert_eq!(names(&outcomes), vec!["err:a.fbx", "ok:b.fbx", "ok:c.fbx", "ok:e.fbx"]);
    assert_eq!(worker.pending(), 0);
    assert!(worker.drain().is_empty());
}
