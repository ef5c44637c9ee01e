//! Replacement executor tests

mod common;
use common::*;

use refit_core::CancelToken;
use refit_engine::ReplacementExecutor;

#[tokio::test]
async fn test_same_line_edits_apply_in_any_input_order() {
    // Two same-line edits, one growing and one shrinking the text. The
    // executor applies rightmost-first, so the input order is irrelevant.
    let line = "a: myorg/app:1.2.0 b: myorg/app:1.2.0";
    let grown = "myorg/app:1.10.0";
    let shrunk = "myorg/app:1.3.0";

    let first = manual_replacement("f.txt", 0, 3, "myorg/app:1.2.0", grown);
    let second = manual_replacement("f.txt", 0, 22, "myorg/app:1.2.0", shrunk);

    for plan in [
        vec![first.clone(), second.clone()],
        vec![second.clone(), first.clone()],
    ] {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_root(&dir);
        let file = write_file(&root, "f.txt", line);

        let report = ReplacementExecutor::new()
            .execute(&root, plan, &CancelToken::new())
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.replacements_applied, 2);
        assert_eq!(
            read_file(&file),
            "a: myorg/app:1.10.0 b: myorg/app:1.3.0"
        );
    }
}

#[tokio::test]
async fn test_untouched_lines_stay_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let root = utf8_root(&dir);
    let content = "first\nmyorg/app:1.0.0\n\ttabbed\ntrailing space \n";
    let file = write_file(&root, "f.txt", content);

    let plan = vec![manual_replacement(
        "f.txt",
        1,
        0,
        "myorg/app:1.0.0",
        "myorg/app:1.1.0",
    )];

    ReplacementExecutor::new()
        .execute(&root, plan, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(
        read_file(&file),
        "first\nmyorg/app:1.1.0\n\ttabbed\ntrailing space \n"
    );
}

#[tokio::test]
async fn test_files_without_replacements_are_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let root = utf8_root(&dir);
    write_file(&root, "target.txt", "myorg/app:1.0.0");
    write_file(&root, "bystander.txt", "myorg/app:1.0.0");

    let plan = vec![manual_replacement(
        "target.txt",
        0,
        0,
        "myorg/app:1.0.0",
        "myorg/app:1.1.0",
    )];

    ReplacementExecutor::new()
        .execute(&root, plan, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(read_file(&root.join("bystander.txt")), "myorg/app:1.0.0");
    // No temp files left behind anywhere
    let leftovers: Vec<_> = std::fs::read_dir(root.as_std_path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains(".refit-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_missing_file_fails_without_aborting_others() {
    let dir = tempfile::tempdir().unwrap();
    let root = utf8_root(&dir);
    write_file(&root, "present.txt", "myorg/app:1.0.0");

    let plan = vec![
        manual_replacement("absent.txt", 0, 0, "myorg/app:1.0.0", "myorg/app:1.1.0"),
        manual_replacement("present.txt", 0, 0, "myorg/app:1.0.0", "myorg/app:1.1.0"),
    ];

    let report = ReplacementExecutor::new()
        .execute(&root, plan, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.files_changed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "absent.txt");
    assert_eq!(read_file(&root.join("present.txt")), "myorg/app:1.1.0");
}

#[tokio::test]
async fn test_drifted_file_fails_safely() {
    let dir = tempfile::tempdir().unwrap();
    let root = utf8_root(&dir);
    // The file no longer holds the text the plan was computed against
    let file = write_file(&root, "f.txt", "myorg/app:9.9.9");

    let plan = vec![manual_replacement(
        "f.txt",
        0,
        0,
        "myorg/app:1.0.0",
        "myorg/app:1.1.0",
    )];

    let report = ReplacementExecutor::new()
        .execute(&root, plan, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.files_changed, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(read_file(&file), "myorg/app:9.9.9");
}

#[tokio::test]
async fn test_overlapping_plan_is_rejected_outright() {
    let dir = tempfile::tempdir().unwrap();
    let root = utf8_root(&dir);
    let file = write_file(&root, "f.txt", "myorg/app:1.0.0");

    let plan = vec![
        manual_replacement("f.txt", 0, 0, "myorg/app:1.0.0", "myorg/app:1.1.0"),
        manual_replacement("f.txt", 0, 6, "app:1.0.0", "app:1.1.0"),
    ];

    let result = ReplacementExecutor::new()
        .execute(&root, plan, &CancelToken::new())
        .await;

    assert!(result.is_err(), "overlap is a defect, not a per-file failure");
    assert_eq!(read_file(&file), "myorg/app:1.0.0");
}

#[tokio::test]
async fn test_cancellation_starts_no_new_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = utf8_root(&dir);
    let file = write_file(&root, "f.txt", "myorg/app:1.0.0");

    let cancel = CancelToken::new();
    cancel.cancel();

    let plan = vec![manual_replacement(
        "f.txt",
        0,
        0,
        "myorg/app:1.0.0",
        "myorg/app:1.1.0",
    )];

    let report = ReplacementExecutor::new()
        .execute(&root, plan, &cancel)
        .await
        .unwrap();

    assert_eq!(report.files_changed, 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(read_file(&file), "myorg/app:1.0.0");
}

#[tokio::test]
async fn test_line_beyond_end_of_file_is_a_per_file_failure() {
    let dir = tempfile::tempdir().unwrap();
    let root = utf8_root(&dir);
    let file = write_file(&root, "f.txt", "only one line");

    let plan = vec![manual_replacement(
        "f.txt",
        7,
        0,
        "myorg/app:1.0.0",
        "myorg/app:1.1.0",
    )];

    let report = ReplacementExecutor::new()
        .execute(&root, plan, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(read_file(&file), "only one line");
}
