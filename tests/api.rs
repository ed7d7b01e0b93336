//! HTTP client tests against a mock OpenAI API
//!
//! Exercises the request/response handling of the three remote
//! collaborators without real network access.

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use retell::audio::{AudioClip, SAMPLE_RATE};
use retell::enhance::{Enhancer, OpenAiEnhancer};
use retell::stt::{Transcriber, Transcription, WhisperTranscriber};
use retell::tts::TextToSpeech;

fn test_clip() -> AudioClip {
    AudioClip {
        samples: vec![0.1; SAMPLE_RATE as usize / 4],
        sample_rate: SAMPLE_RATE,
    }
}

fn key() -> SecretString {
    SecretString::from("sk-test".to_string())
}

#[tokio::test]
async fn whisper_transcribes_speech() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "hello world"})))
        .expect(1)
        .mount(&server)
        .await;

    let transcriber = WhisperTranscriber::new(key(), "whisper-1".to_string())
        .unwrap()
        .with_api_base(server.uri());

    let result = transcriber.transcribe(&test_clip()).await.unwrap();
    assert_eq!(result, Transcription::Text("hello world".to_string()));
}

#[tokio::test]
async fn whisper_blank_text_is_unintelligible() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "  "})))
        .mount(&server)
        .await;

    let transcriber = WhisperTranscriber::new(key(), "whisper-1".to_string())
        .unwrap()
        .with_api_base(server.uri());

    let result = transcriber.transcribe(&test_clip()).await.unwrap();
    assert_eq!(result, Transcription::Unintelligible);
}

#[tokio::test]
async fn whisper_api_failure_is_a_service_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let transcriber = WhisperTranscriber::new(key(), "whisper-1".to_string())
        .unwrap()
        .with_api_base(server.uri());

    let err = transcriber.transcribe(&test_clip()).await.unwrap_err();
    assert!(matches!(err, retell::Error::Stt(_)));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn enhancer_sends_the_fixed_prompt_and_returns_the_reply_verbatim() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_string_contains("enhances speech transcripts"))
        .and(body_string_contains(
            "Please enhance and improve the following speech transcript",
        ))
        .and(body_string_contains("hello world"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Hello, world!"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let enhancer = OpenAiEnhancer::new(key(), "gpt-4".to_string())
        .unwrap()
        .with_api_base(server.uri());

    let enhanced = enhancer.enhance("hello world ").await.unwrap();
    assert_eq!(enhanced, "Hello, world!");
}

#[tokio::test]
async fn enhancer_sends_fixed_sampling_constants() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("\"max_tokens\":1000"))
        .and(body_string_contains("\"temperature\":0.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "ok"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let enhancer = OpenAiEnhancer::new(key(), "gpt-4".to_string())
        .unwrap()
        .with_api_base(server.uri());

    enhancer.enhance("anything").await.unwrap();
}

#[tokio::test]
async fn enhancer_api_failure_is_a_service_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let enhancer = OpenAiEnhancer::new(key(), "gpt-4".to_string())
        .unwrap()
        .with_api_base(server.uri());

    let err = enhancer.enhance("hello").await.unwrap_err();
    assert!(matches!(err, retell::Error::Enhance(_)));
    assert!(err.to_string().contains("429"));
}

#[tokio::test]
async fn tts_synthesize_returns_audio_bytes() {
    let server = MockServer::start().await;

    let mp3_bytes = vec![0xFF, 0xF3, 0x44, 0x00];
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_string_contains("\"voice\":\"alloy\""))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(mp3_bytes.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let tts = TextToSpeech::new(key(), "tts-1".to_string(), "alloy".to_string(), 1.0)
        .unwrap()
        .with_api_base(server.uri());

    let audio = tts.synthesize("hello").await.unwrap();
    assert_eq!(audio, mp3_bytes);
}

#[tokio::test]
async fn tts_api_failure_is_a_service_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad voice"))
        .mount(&server)
        .await;

    let tts = TextToSpeech::new(key(), "tts-1".to_string(), "nope".to_string(), 1.0)
        .unwrap()
        .with_api_base(server.uri());

    let err = tts.synthesize("hello").await.unwrap_err();
    assert!(matches!(err, retell::Error::Tts(_)));
}
