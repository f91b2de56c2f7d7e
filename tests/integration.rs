// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0

//! Integration tests for LLM providers and the formatting pipeline.
//!
//! Uses `wiremock` to mock HTTP endpoints so no real LLM servers are needed.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lazym::config::{Config, Provider};
use lazym::error::Error;
use lazym::services::formatter::{FormatOptions, format_commit_message};
use lazym::services::llm::LlmProvider;
use lazym::services::llm::lines::LineBuffer;
use lazym::services::llm::ollama::OllamaProvider;
use lazym::services::llm::openai::OpenAiProvider;

// ─── Test helpers ────────────────────────────────────────────────────────────

fn ollama_config(server_url: &str) -> Config {
    Config {
        provider: Provider::Ollama,
        model: "llama3.1:8b".into(),
        ollama_host: server_url.to_string(),
        timeout_secs: 5,
        ..Config::default()
    }
}

fn groq_config(server_url: &str) -> Config {
    Config {
        provider: Provider::Groq,
        model: "llama-3.1-8b-instant".into(),
        openai_base_url: Some(server_url.to_string()),
        api_key: Some("test-key".into()),
        timeout_secs: 5,
        max_retries: 0,
        ..Config::default()
    }
}

/// Drain the token receiver and return all collected tokens.
async fn drain_tokens(mut rx: mpsc::Receiver<String>) -> Vec<String> {
    let mut tokens = Vec::new();
    while let Some(tok) = rx.recv().await {
        tokens.push(tok);
    }
    tokens
}

fn sse_body(chunks: &[&str]) -> String {
    let mut body = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let finish = if i + 1 == chunks.len() {
            r#""stop""#
        } else {
            "null"
        };
        let content = serde_json::to_string(chunk).unwrap();
        body.push_str(&format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":{content}}},\"finish_reason\":{finish}}}]}}\n\n"
        ));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

// ─── Ollama verification ─────────────────────────────────────────────────────

#[tokio::test]
async fn ollama_health_check_lists_models() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{"name": "llama3.1:8b"}, {"name": "qwen2.5:latest"}]
        })))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(&ollama_config(&server.uri()));
    let models = provider.health_check().await.unwrap();
    assert_eq!(models, vec!["llama3.1:8b", "qwen2.5:latest"]);
    provider.verify().await.unwrap();
}

#[tokio::test]
async fn ollama_verify_accepts_latest_suffix() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{"name": "qwen2.5:latest"}]
        })))
        .mount(&server)
        .await;

    let config = Config {
        model: "qwen2.5".into(),
        ..ollama_config(&server.uri())
    };
    OllamaProvider::new(&config).verify().await.unwrap();
}

#[tokio::test]
async fn ollama_connection_refused() {
    let provider = OllamaProvider::new(&ollama_config("http://127.0.0.1:1"));
    let err = provider.verify().await.unwrap_err();
    assert!(
        matches!(err, Error::OllamaNotRunning { .. }),
        "expected OllamaNotRunning, got: {err:?}"
    );
}

#[tokio::test]
async fn ollama_model_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{"name": "codellama:7b"}]
        })))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(&ollama_config(&server.uri()));
    match provider.verify().await.unwrap_err() {
        Error::ModelNotFound { model, available } => {
            assert_eq!(model, "llama3.1:8b");
            assert_eq!(available, vec!["codellama:7b"]);
        }
        other => panic!("expected ModelNotFound, got: {other:?}"),
    }
}

// ─── Ollama generation ───────────────────────────────────────────────────────

#[tokio::test]
async fn ollama_streaming_response() {
    let server = MockServer::start().await;

    let body = [
        r#"{"response":"Add","done":false}"#,
        r#"{"response":" tag push","done":false}"#,
        r#"{"response":" confirmation.","done":true}"#,
    ]
    .join("\n");

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama3.1:8b",
            "stream": true,
            "options": {"num_predict": 256}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(&ollama_config(&server.uri()));
    let (tx, rx) = mpsc::channel(32);

    let raw = provider
        .generate("prompt", tx, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(raw, "Add tag push confirmation.");

    let tokens = drain_tokens(rx).await;
    assert_eq!(tokens.len(), 3);

    let message = format_commit_message(&raw, &FormatOptions::default()).unwrap();
    assert_eq!(message, "add tag push confirmation");
}

#[tokio::test]
async fn ollama_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(&ollama_config(&server.uri()));
    let (tx, _rx) = mpsc::channel(32);

    match provider
        .generate("prompt", tx, CancellationToken::new())
        .await
        .unwrap_err()
    {
        Error::Provider { provider, message } => {
            assert_eq!(provider, "ollama");
            assert!(message.contains("500"), "got: {message}");
        }
        other => panic!("expected Provider error, got: {other:?}"),
    }
}

#[tokio::test]
async fn cancelled_generation_returns_cancelled() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"response":"late","done":true}"#)
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(&ollama_config(&server.uri()));
    let (tx, _rx) = mpsc::channel(32);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = provider.generate("prompt", tx, cancel).await;
    assert!(matches!(result, Err(Error::Cancelled)), "got: {result:?}");
}

// ─── OpenAI-compatible (Groq) ────────────────────────────────────────────────

#[tokio::test]
async fn groq_streaming_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama-3.1-8b-instant",
            "stream": true
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(sse_body(&["Skip", " index lines"])),
        )
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(&groq_config(&server.uri()));
    assert_eq!(provider.name(), "groq");

    let (tx, rx) = mpsc::channel(32);
    let raw = provider
        .generate("prompt", tx, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(raw, "Skip index lines");
    assert_eq!(drain_tokens(rx).await, vec!["Skip", " index lines"]);
}

#[tokio::test]
async fn openai_compatible_retries_transient_failures() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse_body(&["fix retry"])))
        .mount(&server)
        .await;

    let config = Config {
        max_retries: 1,
        ..groq_config(&server.uri())
    };
    let provider = OpenAiProvider::new(&config);
    let (tx, _rx) = mpsc::channel(32);

    let raw = provider
        .generate("prompt", tx, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(raw, "fix retry");
}

#[tokio::test]
async fn openai_compatible_gives_up_after_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(&groq_config(&server.uri()));
    let (tx, _rx) = mpsc::channel(32);

    match provider
        .generate("prompt", tx, CancellationToken::new())
        .await
        .unwrap_err()
    {
        Error::Provider { provider, message } => {
            assert_eq!(provider, "groq");
            assert!(message.contains("429"), "got: {message}");
        }
        other => panic!("expected Provider error, got: {other:?}"),
    }
}

#[tokio::test]
async fn openai_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let config = Config {
        provider: Provider::OpenAI,
        ..groq_config(&server.uri())
    };
    let err = OpenAiProvider::new(&config).verify().await.unwrap_err();
    assert!(
        matches!(err, Error::Provider { ref message, .. } if message.contains("invalid API key")),
        "got: {err:?}"
    );
}

// ─── Stream line splitting ───────────────────────────────────────────────────

#[test]
fn line_buffer_keeps_multibyte_chars_split_across_chunks() {
    let line = "{\"response\":\"修复 🚀\",\"done\":false}\n".as_bytes();
    let mut lines = LineBuffer::new();

    // Split inside the emoji's four-byte sequence.
    let emoji = "🚀".as_bytes();
    let split = line.windows(emoji.len()).position(|w| w == emoji).unwrap() + 2;
    lines.push(&line[..split]);
    assert_eq!(lines.next_line(), None);
    lines.push(&line[split..]);

    assert_eq!(
        lines.next_line().as_deref(),
        Some("{\"response\":\"修复 🚀\",\"done\":false}")
    );
    assert_eq!(lines.next_line(), None);
    assert_eq!(lines.finish(), None);
}

#[test]
fn line_buffer_byte_at_a_time() {
    let body = "data: {\"x\":\"é\"}\n\ndata: [DONE]";
    let mut lines = LineBuffer::new();
    let mut collected = Vec::new();
    for byte in body.as_bytes() {
        lines.push(std::slice::from_ref(byte));
        while let Some(line) = lines.next_line() {
            collected.push(line);
        }
    }
    collected.extend(lines.finish());
    assert_eq!(collected, vec!["data: {\"x\":\"é\"}", "", "data: [DONE]"]);
}

#[tokio::test]
async fn ollama_streams_non_ascii_tokens() {
    let server = MockServer::start().await;

    let body = [
        r#"{"response":"Ajoute l'","done":false}"#,
        r#"{"response":"étiquette 🚀","done":true}"#,
    ]
    .join("\n");

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(&ollama_config(&server.uri()));
    let (tx, _rx) = mpsc::channel(32);
    let raw = provider
        .generate("prompt", tx, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(raw, "Ajoute l'étiquette 🚀");
}
