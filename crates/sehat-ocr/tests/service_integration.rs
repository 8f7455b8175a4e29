//! Integration tests for OcrService using MockEngine
//!
//! Real files are created in a temp dir so the existence check runs against
//! the host filesystem; recognition itself is scripted.

use sehat_ocr::engine::mock::{MockEngine, MockOutcome};
use sehat_ocr::engine::RecognitionLevel;
use sehat_ocr::{
    Candidate, ErrorCode, Observation, OcrFailure, OcrRequest, OcrService, SecurityScope,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Helper to create an image file the existence check will accept
fn image(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"\x89PNG\r\n\x1a\n").unwrap();
    path
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[derive(Default)]
struct CountingScope {
    begun: AtomicUsize,
    ended: AtomicUsize,
}

impl SecurityScope for CountingScope {
    fn begin_access(&self, _path: &Path) -> bool {
        self.begun.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn end_access(&self, _path: &Path) {
        self.ended.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_missing_image_path_is_bad_args() {
    let service = OcrService::new(Arc::new(MockEngine::new()));

    let failure = service.extract_text_from_args(&json!({})).await.unwrap_err();

    assert_eq!(
        serde_json::to_value(&failure).unwrap(),
        json!({"code": "bad_args", "message": "Missing imagePath"})
    );
}

#[tokio::test]
async fn test_absent_file_is_not_found_with_verbatim_path() {
    let temp_dir = TempDir::new().unwrap();
    let missing = format!("{}/doc.png", temp_dir.path().display());
    let engine = Arc::new(MockEngine::new());
    let service = OcrService::new(engine.clone());

    let failure = service
        .extract_text_from_args(&json!({ "imagePath": missing }))
        .await
        .unwrap_err();

    assert_eq!(failure.code, ErrorCode::NotFound);
    assert_eq!(failure.message, "Image not found");
    assert_eq!(failure.details.as_deref(), Some(missing.as_str()));
    assert_eq!(engine.call_count(), 0);
}

#[tokio::test]
async fn test_directory_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let service = OcrService::new(Arc::new(MockEngine::new()));

    let failure = service
        .extract_text(OcrRequest::new(path_str(temp_dir.path())))
        .await
        .unwrap_err();

    assert_eq!(failure.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn test_blank_image_is_empty_success() {
    let temp_dir = TempDir::new().unwrap();
    let blank = image(&temp_dir, "blank.png");
    let service = OcrService::new(Arc::new(MockEngine::new()));

    let response = service
        .extract_text(OcrRequest::new(path_str(&blank)))
        .await
        .unwrap();

    assert_eq!(response.text, "");
    assert_eq!(response.line_count(), 0);
}

#[tokio::test]
async fn test_one_line_per_region_with_top_candidate() {
    let temp_dir = TempDir::new().unwrap();
    let scan = image(&temp_dir, "lab_report.png");
    let engine = Arc::new(MockEngine::new().with_observations(vec![
        Observation::new(vec![
            Candidate::new("Hemoglobin 13.2 g/dL", 0.97),
            Candidate::new("Hemoglobin 13.2 g/dl", 0.52),
        ]),
        Observation::new(vec![
            Candidate::new("WBC 6.1", 0.40),
            Candidate::new("WBC 6.7", 0.88),
        ]),
        Observation::single("Platelets 250", 0.91),
    ]));
    let service = OcrService::new(engine.clone());

    let response = service
        .extract_text(OcrRequest::new(path_str(&scan)))
        .await
        .unwrap();

    assert_eq!(response.line_count(), 3);
    assert_eq!(response.text, "Hemoglobin 13.2 g/dL\nWBC 6.7\nPlatelets 250");
    assert_eq!(engine.seen_paths(), vec![scan]);
}

#[tokio::test]
async fn test_engine_error_is_vision_error_without_text() {
    let temp_dir = TempDir::new().unwrap();
    let scan = image(&temp_dir, "scan.png");
    let service = OcrService::new(Arc::new(
        MockEngine::new().with_error("The operation couldn't be completed"),
    ));

    let failure = service
        .extract_text(OcrRequest::new(path_str(&scan)))
        .await
        .unwrap_err();

    assert_eq!(
        failure,
        OcrFailure::vision("The operation couldn't be completed")
    );
}

#[tokio::test]
async fn test_engine_panic_is_vision_error() {
    let temp_dir = TempDir::new().unwrap();
    let scan = image(&temp_dir, "scan.png");
    let service = OcrService::new(Arc::new(MockEngine::new().with_panic("request dispatch failed")));

    let failure = service
        .extract_text(OcrRequest::new(path_str(&scan)))
        .await
        .unwrap_err();

    assert_eq!(failure.code, ErrorCode::VisionError);
    assert_eq!(failure.message, "request dispatch failed");
}

#[tokio::test]
async fn test_recognition_requested_at_accurate_level() {
    let temp_dir = TempDir::new().unwrap();
    let scan = image(&temp_dir, "scan.png");
    let engine = Arc::new(MockEngine::new().with_lines(&["ok"]));
    let service = OcrService::new(engine.clone());

    service
        .extract_text(OcrRequest::new(path_str(&scan)))
        .await
        .unwrap();

    let options = engine.last_options().unwrap();
    assert_eq!(options.level, RecognitionLevel::Accurate);
    assert!(options.language_correction);
}

#[tokio::test]
async fn test_scoped_access_released_on_every_exit() {
    let temp_dir = TempDir::new().unwrap();
    let ok = image(&temp_dir, "ok.png");
    let err = image(&temp_dir, "err.png");
    let boom = image(&temp_dir, "boom.png");

    let scope = Arc::new(CountingScope::default());
    let engine = MockEngine::new()
        .for_path(&ok, MockOutcome::lines(&["fine"]))
        .for_path(&err, MockOutcome::Error("decode failed".to_string()))
        .for_path(&boom, MockOutcome::Panic("boom".to_string()));
    let service = OcrService::new(Arc::new(engine)).with_security_scope(scope.clone());

    assert!(service.extract_text(OcrRequest::new(path_str(&ok))).await.is_ok());
    assert!(service.extract_text(OcrRequest::new(path_str(&err))).await.is_err());
    assert!(service.extract_text(OcrRequest::new(path_str(&boom))).await.is_err());

    assert_eq!(scope.begun.load(Ordering::SeqCst), 3);
    assert_eq!(scope.ended.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_scoped_access_not_requested_for_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let scope = Arc::new(CountingScope::default());
    let service = OcrService::new(Arc::new(MockEngine::new())).with_security_scope(scope.clone());

    let missing = temp_dir.path().join("gone.png");
    let _ = service.extract_text(OcrRequest::new(path_str(&missing))).await;

    assert_eq!(scope.begun.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_requests_get_their_own_text() {
    let temp_dir = TempDir::new().unwrap();
    let slow = image(&temp_dir, "prescription.png");
    let fast = image(&temp_dir, "insurance_card.png");

    let engine = MockEngine::new()
        .for_path_delayed(
            &slow,
            MockOutcome::lines(&["Amoxicillin 500mg", "3x daily"]),
            Duration::from_millis(150),
        )
        .for_path(&fast, MockOutcome::lines(&["Policy No. 8842-19"]));
    let service = OcrService::new(Arc::new(engine));

    let slow_handle = service.extract_text(OcrRequest::new(path_str(&slow)));
    let fast_handle = service.extract_text(OcrRequest::new(path_str(&fast)));

    let fast_text = fast_handle.await.unwrap().text;
    let slow_text = slow_handle.await.unwrap().text;

    assert_eq!(fast_text, "Policy No. 8842-19");
    assert_eq!(slow_text, "Amoxicillin 500mg\n3x daily");
}

#[tokio::test]
async fn test_dropped_handle_still_releases_access() {
    let temp_dir = TempDir::new().unwrap();
    let scan = image(&temp_dir, "scan.png");
    let scope = Arc::new(CountingScope::default());
    let engine = Arc::new(
        MockEngine::new()
            .with_lines(&["detached"])
            .with_delay(Duration::from_millis(20)),
    );
    let service = OcrService::new(engine.clone()).with_security_scope(scope.clone());

    drop(service.extract_text(OcrRequest::new(path_str(&scan))));

    for _ in 0..100 {
        if scope.ended.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(engine.call_count(), 1);
    assert_eq!(scope.ended.load(Ordering::SeqCst), 1);
}
