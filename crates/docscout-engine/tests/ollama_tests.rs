use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use docscout_core::traits::{Embedder, Generator};
use docscout_engine::ollama::OllamaClient;

// The blocking client must not run on the async test runtime's worker.
async fn blocking<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    tokio::task::spawn_blocking(f).await.expect("blocking task")
}

#[tokio::test(flavor = "multi_thread")]
async fn embed_posts_model_and_inputs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "model": "nomic-embed-text", "input": ["alpha", "beta"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "nomic-embed-text",
            "embeddings": [[0.1, 0.2], [0.3, 0.4]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let base = format!("{}/", server.uri());
    let vectors = blocking(move || {
        let client = OllamaClient::new(&base, "nomic-embed-text").unwrap();
        assert_eq!(client.model_id(), "ollama:nomic-embed-text");
        client.embed_batch(&["alpha".to_string(), "beta".to_string()])
    })
    .await
    .unwrap();

    assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
}

#[tokio::test(flavor = "multi_thread")]
async fn embed_rejects_short_responses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[1.0]] })))
        .mount(&server)
        .await;

    let base = server.uri();
    let result = blocking(move || {
        OllamaClient::new(&base, "m").unwrap().embed_batch(&["a".to_string(), "b".to_string()])
    })
    .await;
    assert!(result.unwrap_err().to_string().contains("1 embeddings for 2 inputs"));
}

#[tokio::test(flavor = "multi_thread")]
async fn generate_is_non_streaming() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "model": "llama3.2:1b", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2:1b",
            "response": "The invoice is due in March.",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let base = server.uri();
    let text = blocking(move || OllamaClient::new(&base, "llama3.2:1b").unwrap().generate("when is it due"))
        .await
        .unwrap();
    assert_eq!(text, "The invoice is due in March.");
}

#[tokio::test(flavor = "multi_thread")]
async fn server_errors_surface_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model 'missing' not found"))
        .mount(&server)
        .await;

    let base = server.uri();
    let err = blocking(move || OllamaClient::new(&base, "missing").unwrap().generate("hi"))
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("404"), "{message}");
    assert!(message.contains("not found"), "{message}");
}
