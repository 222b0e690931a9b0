use flashcopy_core::{
    CoordinatorConfig, DispatchError, ExclusionPolicy, ImageInfoOutcome, ImageProcessOutcome,
    OperationKind, OperationRequest, Outcome, ProgressSnapshot, ValidationOutcome, percent_of,
};
use std::path::PathBuf;

#[test]
fn test_request_constructors() {
    let copy = OperationRequest::copy("/src/a.img", "/dst/new/b.img", Some("/tmp/stage1".into()));
    match &copy {
        OperationRequest::Copy {
            source,
            destination,
            temp_dir,
        } => {
            assert_eq!(source, &PathBuf::from("/src/a.img"));
            assert_eq!(destination, &PathBuf::from("/dst/new/b.img"));
            assert_eq!(temp_dir.as_deref(), Some(std::path::Path::new("/tmp/stage1")));
        }
        other => panic!("unexpected request: {other:?}"),
    }

    assert_eq!(
        OperationRequest::validate_image("/a.img").kind(),
        OperationKind::ValidateImage
    );
    assert_eq!(
        OperationRequest::extract_info("/a.img").kind(),
        OperationKind::ExtractInfo
    );
}

#[test]
fn test_request_json_roundtrip_preserves_variant() {
    let request = OperationRequest::delete("/tmp/stale.img");
    let json = serde_json::to_string(&request).unwrap();
    assert!(json.contains("Delete"));

    let parsed: OperationRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, request);
}

#[test]
fn test_kind_display() {
    assert_eq!(OperationKind::Copy.to_string(), "Copy");
    assert_eq!(
        OperationKind::ExtractAndValidate.to_string(),
        "Extract and validate image"
    );
}

#[test]
fn test_snapshot_percent_scenario() {
    let mut snapshot = ProgressSnapshot::default();
    let mut seen = Vec::new();

    for (copied, total) in [(0, 0), (512, 1024), (1024, 1024)] {
        snapshot.copied_bytes = copied;
        snapshot.total_bytes = total;
        seen.push(snapshot.percent());
    }

    assert_eq!(seen, vec![0, 50, 100]);
}

#[test]
fn test_percent_never_exceeds_bounds() {
    for total in [1u64, 3, 7, 100, 1023, 4096] {
        for copied in 0..=total {
            let pct = percent_of(copied, total);
            assert!(pct <= 100);
            assert_eq!(u64::from(pct), copied * 100 / total);
        }
    }
}

#[test]
fn test_outcome_constructors() {
    let ok = Outcome::succeeded("done");
    assert!(ok.success);
    assert_eq!(ok.message, "done");

    let failed = ValidationOutcome::failed("checksum mismatch");
    assert!(!failed.success);
    assert!(failed.tar_path.is_none());

    let info = ImageInfoOutcome::succeeded("rk3588", "13");
    assert!(info.success);
    assert!(info.error_message.is_empty());

    let processed = ImageProcessOutcome::failed("bad image");
    assert!(!processed.success);
    assert_eq!(processed.message, "bad image");
}

#[test]
fn test_default_config_is_compatible() {
    let config = CoordinatorConfig::default();
    assert_eq!(config.exclusion, ExclusionPolicy::Compatible);
    assert!(config.cleanup_temp_dirs);
}

#[test]
fn test_invalid_request_error() {
    let err = DispatchError::invalid("empty source");
    assert!(!err.is_busy());
    assert_eq!(err.to_string(), "Invalid request: empty source");
}
