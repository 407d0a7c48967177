//! HTTP Server & Routing Integration Tests
//!
//! Drives the router with a scripted assessor standing in for the speech
//! service, so call counts and staged-file lifetimes can be observed.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use pronounce_api::models::{
    ErrorType, Granularity, GranularityResult, OverallScores, PhonemeDetail, SyllableDetail,
    WordDetail,
};
use pronounce_api::services::{
    AssessError, AudioStager, PassRequest, PronunciationAssessor, RecognitionFailure,
};
use pronounce_api::{build_router, AppState};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "pronounce-test-boundary";

/// Scripted assessor: records every pass and the staged path it was given
struct MockAssessor {
    configured: bool,
    fail_on: Option<Granularity>,
    calls: Mutex<Vec<(Granularity, PathBuf, bool)>>,
    passes: Mutex<Vec<PassRequest>>,
}

impl MockAssessor {
    fn new() -> Self {
        Self {
            configured: true,
            fail_on: None,
            calls: Mutex::new(Vec::new()),
            passes: Mutex::new(Vec::new()),
        }
    }

    fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    fn failing_on(granularity: Granularity) -> Self {
        Self {
            fail_on: Some(granularity),
            ..Self::new()
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn granularities(&self) -> Vec<Granularity> {
        self.calls.lock().unwrap().iter().map(|c| c.0).collect()
    }
}

fn word(text: &str, granularity: Granularity) -> WordDetail {
    let syllables = match granularity {
        Granularity::Syllable => vec![SyllableDetail {
            syllable: format!("{}-syl", text),
            accuracy_score: 70.0,
            offset_sec: 0.1,
            duration_sec: 0.2,
        }],
        _ => Vec::new(),
    };
    let phonemes = match granularity {
        Granularity::Phoneme => vec![PhonemeDetail {
            phoneme: format!("{}-ph", text),
            accuracy_score: 60.0,
            offset_sec: 0.1,
            duration_sec: 0.05,
        }],
        _ => Vec::new(),
    };

    WordDetail {
        word: text.to_string(),
        accuracy_score: 80.0,
        error_type: ErrorType::None,
        offset_sec: 0.1,
        duration_sec: 0.4,
        syllables,
        phonemes,
    }
}

#[async_trait]
impl PronunciationAssessor for MockAssessor {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn assess(
        &self,
        audio: &Path,
        pass: &PassRequest,
    ) -> Result<GranularityResult, AssessError> {
        self.calls
            .lock()
            .unwrap()
            .push((pass.granularity, audio.to_path_buf(), audio.exists()));
        self.passes.lock().unwrap().push(pass.clone());

        if self.fail_on == Some(pass.granularity) {
            return Err(
                RecognitionFailure::no_match(pass.granularity, "InitialSilenceTimeout").into(),
            );
        }

        Ok(GranularityResult {
            granularity: pass.granularity,
            scores: OverallScores {
                pronunciation_score: 90.0,
                accuracy_score: 85.0,
                fluency_score: 80.0,
                completeness_score: 95.0,
                prosody_score: None,
            },
            recognized_text: "Hello world.".to_string(),
            offset_sec: 0.1,
            duration_sec: 1.2,
            words: vec![
                word("Hello", pass.granularity),
                word("world", pass.granularity),
            ],
        })
    }
}

fn test_app(assessor: Arc<MockAssessor>, staging: &TempDir) -> axum::Router {
    let state = AppState::new(
        assessor,
        AudioStager::new(Some(staging.path().to_path_buf())),
    );
    build_router(state)
}

/// Build a multipart/form-data body; `audio` is sent as a file part
fn multipart_body(fields: &[(&str, &str)], audio: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((file_name, bytes)) = audio {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"audio\"; filename=\"{}\"\r\n",
                file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn assess_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/assess")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn staged_files(staging: &TempDir) -> usize {
    std::fs::read_dir(staging.path()).unwrap().count()
}

#[tokio::test]
async fn test_health_endpoint() {
    let staging = TempDir::new().unwrap();
    let app = test_app(Arc::new(MockAssessor::unconfigured()), &staging);

    let (status, body) = send(
        app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "pronounce-api");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_assess_success_returns_merged_report() {
    let staging = TempDir::new().unwrap();
    let assessor = Arc::new(MockAssessor::new());
    let app = test_app(assessor.clone(), &staging);

    let body = multipart_body(
        &[("text", "Hello world"), ("proficiency", "Advanced")],
        Some(("clip.wav", &b"RIFF....WAVE"[..])),
    );
    let (status, json) = send(app, assess_request(body)).await;

    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["recognizedText"], "Hello world.");
    assert_eq!(json["durationSec"], 1.2);
    assert_eq!(json["overall"]["combined"]["score"], 88.0);
    assert_eq!(json["overall"]["combined"]["proficiencyTag"], "Advanced");
    assert_eq!(json["overall"]["word"]["pronunciationScore"], 90.0);
    assert!(json["overall"]["syllable"].is_object());
    assert!(json["overall"]["phoneme"].is_object());

    let words = json["words"].as_array().unwrap();
    assert_eq!(words.len(), 2);
    assert_eq!(words[0]["word"], "Hello");
    assert_eq!(words[0]["syllables"][0]["syllable"], "Hello-syl");
    assert_eq!(words[1]["phonemes"][0]["phoneme"], "world-ph");

    assert_eq!(assessor.granularities(), Granularity::ALL.to_vec());
    // Every pass saw the same staged file while it still existed
    let calls = assessor.calls.lock().unwrap().clone();
    assert!(calls.iter().all(|(_, path, existed)| *existed && path == &calls[0].1));
    assert!(calls[0].1.starts_with(staging.path()));
    assert_eq!(staged_files(&staging), 0);
}

#[tokio::test]
async fn test_defaults_applied_to_passes() {
    let staging = TempDir::new().unwrap();
    let assessor = Arc::new(MockAssessor::new());
    let app = test_app(assessor.clone(), &staging);

    let body = multipart_body(&[("text", "Hello world")], Some(("clip.wav", &b"RIFF"[..])));
    let (status, json) = send(app, assess_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["overall"]["combined"]["proficiencyTag"], "General");
    let passes = assessor.passes.lock().unwrap().clone();
    assert!(passes
        .iter()
        .all(|p| p.locale == "en-US" && !p.enable_prosody && p.enable_miscue));
}

#[tokio::test]
async fn test_prosody_flag_and_locale_forwarded() {
    let staging = TempDir::new().unwrap();
    let assessor = Arc::new(MockAssessor::new());
    let app = test_app(assessor.clone(), &staging);

    let body = multipart_body(
        &[
            ("text", "Hello world"),
            ("language", "en-US"),
            ("enable_prosody", "yes"),
        ],
        Some(("clip.wav", &b"RIFF"[..])),
    );
    let (status, _) = send(app, assess_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    let passes = assessor.passes.lock().unwrap().clone();
    assert!(passes
        .iter()
        .all(|p| p.enable_prosody && p.phoneme_alphabet == Some("IPA")));
}

#[tokio::test]
async fn test_empty_text_rejected_without_external_call() {
    for text in ["", "   \t\n"] {
        let staging = TempDir::new().unwrap();
        let assessor = Arc::new(MockAssessor::new());
        let app = test_app(assessor.clone(), &staging);

        let body = multipart_body(&[("text", text)], Some(("clip.wav", &b"RIFF"[..])));
        let (status, json) = send(app, assess_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
        assert_eq!(json["error"]["message"], "Reference text must not be empty.");
        assert_eq!(assessor.call_count(), 0);
        assert_eq!(staged_files(&staging), 0);
    }
}

#[tokio::test]
async fn test_missing_text_field_rejected() {
    let staging = TempDir::new().unwrap();
    let assessor = Arc::new(MockAssessor::new());
    let app = test_app(assessor.clone(), &staging);

    let body = multipart_body(&[], Some(("clip.wav", &b"RIFF"[..])));
    let (status, _) = send(app, assess_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(assessor.call_count(), 0);
}

#[tokio::test]
async fn test_missing_audio_rejected() {
    let staging = TempDir::new().unwrap();
    let assessor = Arc::new(MockAssessor::new());
    let app = test_app(assessor.clone(), &staging);

    let body = multipart_body(&[("text", "Hello world")], None);
    let (status, json) = send(app, assess_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert_eq!(assessor.call_count(), 0);
}

#[tokio::test]
async fn test_invalid_prosody_flag_rejected() {
    let staging = TempDir::new().unwrap();
    let assessor = Arc::new(MockAssessor::new());
    let app = test_app(assessor.clone(), &staging);

    let body = multipart_body(
        &[("text", "Hello world"), ("enable_prosody", "perhaps")],
        Some(("clip.wav", &b"RIFF"[..])),
    );
    let (status, _) = send(app, assess_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(assessor.call_count(), 0);
}

#[tokio::test]
async fn test_missing_credentials_is_server_error_without_call() {
    let staging = TempDir::new().unwrap();
    let assessor = Arc::new(MockAssessor::unconfigured());
    let app = test_app(assessor.clone(), &staging);

    let body = multipart_body(&[("text", "Hello world")], Some(("clip.wav", &b"RIFF"[..])));
    let (status, json) = send(app, assess_request(body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "CONFIG_ERROR");
    assert_eq!(assessor.call_count(), 0);
    assert_eq!(staged_files(&staging), 0);
}

#[tokio::test]
async fn test_recognition_failure_aborts_and_cleans_up() {
    let staging = TempDir::new().unwrap();
    let assessor = Arc::new(MockAssessor::failing_on(Granularity::Syllable));
    let app = test_app(assessor.clone(), &staging);

    let body = multipart_body(&[("text", "Hello world")], Some(("clip.wav", &b"RIFF"[..])));
    let (status, json) = send(app, assess_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "RECOGNITION_FAILED");
    assert_eq!(json["error"]["details"]["reason"], "NoMatch");
    assert_eq!(json["error"]["details"]["granularity"], "syllable");
    assert_eq!(
        json["error"]["details"]["noMatchDetails"],
        "InitialSilenceTimeout"
    );
    assert!(json.get("words").is_none());

    assert_eq!(
        assessor.granularities(),
        vec![Granularity::Word, Granularity::Syllable]
    );
    assert_eq!(staged_files(&staging), 0);
}

#[tokio::test]
async fn test_staging_failure_is_server_error() {
    let staging = TempDir::new().unwrap();
    let missing_dir = staging.path().join("does-not-exist");
    let assessor = Arc::new(MockAssessor::new());
    let state = AppState::new(assessor.clone(), AudioStager::new(Some(missing_dir)));
    let app = build_router(state);

    let body = multipart_body(&[("text", "Hello world")], Some(("clip.wav", &b"RIFF"[..])));
    let (status, json) = send(app, assess_request(body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "AUDIO_STAGING_FAILED");
    assert_eq!(assessor.call_count(), 0);
}

#[tokio::test]
async fn test_upload_suffix_preserved_for_staged_file() {
    let staging = TempDir::new().unwrap();
    let assessor = Arc::new(MockAssessor::new());
    let app = test_app(assessor.clone(), &staging);

    let body = multipart_body(&[("text", "Hello world")], Some(("memo.OGG", &b"OggS"[..])));
    let (status, _) = send(app, assess_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    let calls = assessor.calls.lock().unwrap().clone();
    assert_eq!(
        calls[0].1.extension().and_then(|e| e.to_str()),
        Some("ogg")
    );
}

#[tokio::test]
async fn test_upload_over_limit_rejected() {
    let staging = TempDir::new().unwrap();
    let assessor = Arc::new(MockAssessor::new());
    let state = AppState::new(
        assessor.clone(),
        AudioStager::new(Some(staging.path().to_path_buf())),
    )
    .with_max_upload_bytes(1024);
    let app = build_router(state);

    let audio = vec![0u8; 4096];
    let body = multipart_body(&[("text", "Hello world")], Some(("clip.wav", &audio[..])));
    let (status, _) = send(app, assess_request(body)).await;

    assert!(status.is_client_error(), "status: {}", status);
    assert_eq!(assessor.call_count(), 0);
}
