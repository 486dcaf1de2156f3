use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use voxrelay_types::Turn;
use voxrelay_voice::{
    Generator, LlmConfig, LlmService, SttConfig, SttService, Synthesizer, Transcriber, TtsConfig,
    TtsService, VoiceError,
};

/// Serves `router` on an ephemeral local port and returns its base URL.
async fn spawn_mock(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn tts_config(base_url: &str) -> TtsConfig {
    TtsConfig {
        base_url: base_url.to_string(),
        ..TtsConfig::default()
    }
}

// ── Synthesis ──

#[tokio::test]
async fn tts_returns_audio_url() {
    let router = Router::new().route(
        "/v1/speech/generate",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            assert_eq!(headers.get("api-key").unwrap(), "murf-key");
            assert_eq!(body["text"], "Hello there");
            assert_eq!(body["voiceId"], "en-US-terrell");
            assert_eq!(body["format"], "mp3");
            assert_eq!(body["sampleRate"], "24000");
            assert_eq!(body["channelType"], "STEREO");
            Json(json!({"audioFile": "https://cdn.example/audio.mp3"}))
        }),
    );
    let base = spawn_mock(router).await;

    let tts = TtsService::new(tts_config(&base), Some("murf-key".into())).unwrap();
    let url = tts.synthesize("Hello there").await.unwrap();
    assert_eq!(url, "https://cdn.example/audio.mp3");
}

#[tokio::test]
async fn tts_reports_remote_status() {
    let router = Router::new().route(
        "/v1/speech/generate",
        post(|| async { (StatusCode::UNAUTHORIZED, "invalid api key") }),
    );
    let base = spawn_mock(router).await;

    let tts = TtsService::new(tts_config(&base), Some("bad".into())).unwrap();
    match tts.synthesize("Hello").await {
        Err(VoiceError::Status { status, body, .. }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("expected Status error, got {:?}", other),
    }
}

#[tokio::test]
async fn tts_requires_audio_file_in_response() {
    let router = Router::new().route(
        "/v1/speech/generate",
        post(|| async { Json(json!({"audioLengthInSeconds": 1.2})) }),
    );
    let base = spawn_mock(router).await;

    let tts = TtsService::new(tts_config(&base), Some("murf-key".into())).unwrap();
    let err = tts.synthesize("Hello").await.unwrap_err();
    assert!(matches!(err, VoiceError::MissingAudioUrl));
    assert_eq!(err.to_string(), "No audio URL in response");
}

#[tokio::test]
async fn missing_credentials_fail_before_any_request() {
    // Nothing listens on this address; a network attempt would surface as Http.
    let unreachable = "http://127.0.0.1:9";

    let tts = TtsService::new(tts_config(unreachable), None).unwrap();
    assert!(!tts.is_configured());
    let err = tts.synthesize("Hello").await.unwrap_err();
    assert!(matches!(err, VoiceError::MissingCredential("Murf")));
    assert_eq!(err.to_string(), "Murf API key not configured");

    let llm = LlmService::new(
        LlmConfig {
            base_url: unreachable.into(),
            ..LlmConfig::default()
        },
        None,
    )
    .unwrap();
    assert!(matches!(
        llm.generate("hi", &[]).await,
        Err(VoiceError::MissingCredential("Gemini"))
    ));

    let stt = SttService::new(
        SttConfig {
            base_url: unreachable.into(),
            ..SttConfig::default()
        },
        None,
    )
    .unwrap();
    assert!(matches!(
        stt.transcribe(b"RIFF").await,
        Err(VoiceError::MissingCredential("AssemblyAI"))
    ));
}

// ── Generation ──

fn llm_config(base_url: &str) -> LlmConfig {
    LlmConfig {
        base_url: base_url.to_string(),
        ..LlmConfig::default()
    }
}

#[tokio::test]
async fn llm_sends_rendered_history() {
    let router = Router::new().route(
        "/v1beta/models/{action}",
        post(
            |Path(action): Path<String>,
             Query(query): Query<HashMap<String, String>>,
             headers: HeaderMap,
             Json(body): Json<Value>| async move {
                assert_eq!(action, "gemini-1.5-flash:generateContent");
                assert_eq!(headers["x-goog-api-key"], "gemini-key");
                assert!(query.is_empty(), "credential leaked into url: {:?}", query);
                assert_eq!(
                    body["contents"][0]["parts"][0]["text"],
                    "User: first\nAssistant: reply\nUser: second\nAssistant:"
                );
                Json(json!({
                    "candidates": [{"content": {"parts": [{"text": "Sure thing."}]}}]
                }))
            },
        ),
    );
    let base = spawn_mock(router).await;

    let llm = LlmService::new(llm_config(&base), Some("gemini-key".into())).unwrap();
    let history = vec![Turn::user("first"), Turn::assistant("reply")];
    let reply = llm.generate("second", &history).await.unwrap();
    assert_eq!(reply, "Sure thing.");
}

#[tokio::test]
async fn llm_empty_answer_is_an_error() {
    let router = Router::new().route(
        "/v1beta/models/{action}",
        post(|| async { Json(json!({"candidates": []})) }),
    );
    let base = spawn_mock(router).await;

    let llm = LlmService::new(llm_config(&base), Some("gemini-key".into())).unwrap();
    let err = llm.generate("hello", &[]).await.unwrap_err();
    assert!(matches!(err, VoiceError::EmptyResult("LLM")));
}

#[tokio::test]
async fn llm_transport_error_does_not_expose_key() {
    // Nothing listens on port 1.
    let llm = LlmService::new(
        llm_config("http://127.0.0.1:1"),
        Some("SUPER-SECRET-KEY".into()),
    )
    .unwrap();
    assert!(!format!("{:?}", llm).contains("SUPER-SECRET-KEY"));

    let err = llm.generate("hello", &[]).await.unwrap_err();
    assert!(matches!(err, VoiceError::Http { service: "Gemini", .. }));
    assert!(!err.to_string().contains("SUPER-SECRET-KEY"), "{}", err);
    assert!(!format!("{:?}", err).contains("SUPER-SECRET-KEY"));
}

#[tokio::test]
async fn llm_malformed_body_does_not_expose_key() {
    let router = Router::new().route(
        "/v1beta/models/{action}",
        post(|| async { "not json" }),
    );
    let base = spawn_mock(router).await;

    let llm = LlmService::new(llm_config(&base), Some("SUPER-SECRET-KEY".into())).unwrap();
    let err = llm.generate("hello", &[]).await.unwrap_err();
    assert!(matches!(err, VoiceError::Http { .. }));
    assert!(!err.to_string().contains("SUPER-SECRET-KEY"), "{}", err);
}

// ── Transcription ──

fn stt_config(base_url: &str, max_wait_secs: u64) -> SttConfig {
    SttConfig {
        base_url: base_url.to_string(),
        poll_interval_ms: 10,
        max_wait_secs,
        ..SttConfig::default()
    }
}

/// Mock AssemblyAI that reports `processing` for `pending_polls` polls and then
/// finishes with `final_job`.
fn assemblyai_mock(polls: Arc<AtomicUsize>, pending_polls: usize, final_job: Value) -> Router {
    Router::new()
        .route(
            "/v2/upload",
            post(|headers: HeaderMap, body: axum::body::Bytes| async move {
                assert_eq!(headers.get("authorization").unwrap(), "aai-key");
                assert_eq!(&body[..], b"fake-audio");
                Json(json!({"upload_url": "https://cdn.assemblyai.example/upload/1"}))
            }),
        )
        .route(
            "/v2/transcript",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["audio_url"], "https://cdn.assemblyai.example/upload/1");
                Json(json!({"id": "job-1", "status": "queued"}))
            }),
        )
        .route(
            "/v2/transcript/{id}",
            get(
                move |State(polls): State<Arc<AtomicUsize>>, Path(id): Path<String>| {
                    let final_job = final_job.clone();
                    async move {
                        assert_eq!(id, "job-1");
                        let seen = polls.fetch_add(1, Ordering::SeqCst);
                        if seen < pending_polls {
                            Json(json!({"id": "job-1", "status": "processing"}))
                        } else {
                            Json(final_job)
                        }
                    }
                },
            ),
        )
        .with_state(polls)
}

#[tokio::test]
async fn stt_polls_until_completed() {
    let polls = Arc::new(AtomicUsize::new(0));
    let router = assemblyai_mock(
        polls.clone(),
        2,
        json!({"id": "job-1", "status": "completed", "text": "turn on the lights"}),
    );
    let base = spawn_mock(router).await;

    let stt = SttService::new(stt_config(&base, 10), Some("aai-key".into())).unwrap();
    let text = stt.transcribe(b"fake-audio").await.unwrap();
    assert_eq!(text, "turn on the lights");
    assert_eq!(polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn stt_surfaces_job_error() {
    let router = assemblyai_mock(
        Arc::new(AtomicUsize::new(0)),
        0,
        json!({"id": "job-1", "status": "error", "error": "audio too short"}),
    );
    let base = spawn_mock(router).await;

    let stt = SttService::new(stt_config(&base, 10), Some("aai-key".into())).unwrap();
    match stt.transcribe(b"fake-audio").await {
        Err(VoiceError::Transcription(reason)) => assert_eq!(reason, "audio too short"),
        other => panic!("expected Transcription error, got {:?}", other),
    }
}

#[tokio::test]
async fn stt_completed_without_text_is_empty_result() {
    let router = assemblyai_mock(
        Arc::new(AtomicUsize::new(0)),
        0,
        json!({"id": "job-1", "status": "completed", "text": null}),
    );
    let base = spawn_mock(router).await;

    let stt = SttService::new(stt_config(&base, 10), Some("aai-key".into())).unwrap();
    let err = stt.transcribe(b"fake-audio").await.unwrap_err();
    assert_eq!(err.to_string(), "Transcription returned empty result");
}

#[tokio::test]
async fn stt_gives_up_after_max_wait() {
    let router = assemblyai_mock(
        Arc::new(AtomicUsize::new(0)),
        usize::MAX,
        json!({}),
    );
    let base = spawn_mock(router).await;

    let stt = SttService::new(stt_config(&base, 0), Some("aai-key".into())).unwrap();
    let err = stt.transcribe(b"fake-audio").await.unwrap_err();
    assert!(matches!(
        err,
        VoiceError::Timeout {
            service: "AssemblyAI",
            secs: 0
        }
    ));
}
