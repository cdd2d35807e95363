use std::future::IntoFuture;

use axum::{
	Json, Router,
	http::{HeaderMap, StatusCode},
	response::IntoResponse,
	routing,
};
use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};
use tokio::{
	net::TcpListener,
	sync::{oneshot, oneshot::Sender},
};

use dops_config::{EmbeddingProviderConfig, LlmProviderConfig};
use dops_providers::Error;

async fn start_server() -> (String, Sender<()>) {
	let app = Router::new()
		.route("/v1/embeddings", routing::post(embed_handler))
		.route("/v1/chat/completions", routing::post(chat_handler))
		.route("/v1/broken", routing::post(broken_handler));
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind mock server.");
	let addr = listener.local_addr().expect("Failed to read mock server address.");
	let (tx, rx) = oneshot::channel();
	let server = axum::serve(listener, app).with_graceful_shutdown(async move {
		let _ = rx.await;
	});

	tokio::spawn(async move {
		let _ = server.into_future().await;
	});

	(format!("http://{addr}"), tx)
}

fn authorized(headers: &HeaderMap) -> bool {
	headers.get("authorization").and_then(|value| value.to_str().ok()) == Some("Bearer test-key")
}

async fn embed_handler(headers: HeaderMap, Json(payload): Json<Value>) -> impl IntoResponse {
	if !authorized(&headers) {
		return StatusCode::UNAUTHORIZED.into_response();
	}

	let inputs =
		payload.get("input").and_then(|value| value.as_array()).cloned().unwrap_or_default();
	let data: Vec<_> = inputs
		.iter()
		.enumerate()
		.rev()
		.map(|(index, _)| serde_json::json!({ "index": index, "embedding": [index as f32, 1.0] }))
		.collect();

	(StatusCode::OK, Json(serde_json::json!({ "data": data }))).into_response()
}

async fn chat_handler(headers: HeaderMap, Json(payload): Json<Value>) -> impl IntoResponse {
	if !authorized(&headers) {
		return StatusCode::UNAUTHORIZED.into_response();
	}

	let turns = payload.get("messages").and_then(|value| value.as_array()).map(Vec::len);
	let content = format!("{{\"turns\": {}}}", turns.unwrap_or(0));

	let body = serde_json::json!({ "choices": [{ "message": { "content": content } }] });

	(StatusCode::OK, Json(body)).into_response()
}

async fn broken_handler() -> impl IntoResponse {
	StatusCode::INTERNAL_SERVER_ERROR
}

fn embedding_config(api_base: &str) -> EmbeddingProviderConfig {
	EmbeddingProviderConfig {
		provider_id: "mock".to_string(),
		api_base: api_base.to_string(),
		api_key: "test-key".to_string(),
		api_key_env: None,
		path: "/v1/embeddings".to_string(),
		model: "m".to_string(),
		dimensions: 2,
		timeout_ms: 5_000,
		default_headers: Map::new(),
	}
}

fn llm_config(api_base: &str, path: &str) -> LlmProviderConfig {
	LlmProviderConfig {
		provider_id: "mock".to_string(),
		api_base: api_base.to_string(),
		api_key: "test-key".to_string(),
		api_key_env: None,
		path: path.to_string(),
		model: "m".to_string(),
		temperature: 0.0,
		timeout_ms: 5_000,
		default_headers: Map::new(),
	}
}

#[test]
fn builds_bearer_auth_header() {
	let headers =
		dops_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[tokio::test]
async fn embeds_in_input_order() {
	let (api_base, shutdown) = start_server().await;
	let texts = vec!["flood".to_string(), "fire".to_string(), "quake".to_string()];
	let vectors = dops_providers::embedding::embed(&embedding_config(&api_base), &texts)
		.await
		.expect("Embedding must succeed.");

	assert_eq!(vectors, vec![vec![0.0, 1.0], vec![1.0, 1.0], vec![2.0, 1.0]]);

	let _ = shutdown.send(());
}

#[tokio::test]
async fn completion_returns_message_text() {
	let (api_base, shutdown) = start_server().await;
	let messages = vec![
		serde_json::json!({ "role": "system", "content": "s" }),
		serde_json::json!({ "role": "user", "content": "u" }),
	];
	let content = dops_providers::completion::complete(
		&llm_config(&api_base, "/v1/chat/completions"),
		&messages,
	)
	.await
	.expect("Completion must succeed.");

	assert_eq!(content, "{\"turns\": 2}");

	let _ = shutdown.send(());
}

#[tokio::test]
async fn http_errors_propagate() {
	let (api_base, shutdown) = start_server().await;
	let result =
		dops_providers::completion::complete(&llm_config(&api_base, "/v1/broken"), &[]).await;

	assert!(matches!(result, Err(Error::Reqwest(_))));

	let _ = shutdown.send(());
}

#[tokio::test]
async fn missing_key_fails_before_any_request() {
	let mut cfg = llm_config("http://127.0.0.1:9", "/v1/chat/completions");

	cfg.api_key = String::new();
	cfg.api_key_env = Some("DOPS_TEST_KEY_THAT_IS_NEVER_SET".to_string());

	let result = dops_providers::completion::complete(&cfg, &[]).await;

	assert!(matches!(result, Err(Error::MissingApiKey { .. })));
}
