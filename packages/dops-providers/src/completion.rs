use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Sends one chat-completions request and returns the first choice's message text.
pub async fn complete(cfg: &dops_config::LlmProviderConfig, messages: &[Value]) -> Result<String> {
	let api_key = crate::resolve_api_key(&cfg.api_key, cfg.api_key_env.as_deref())?;
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});
	let res = client
		.post(&url)
		.headers(crate::auth_headers(&api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion_content(&json)
}

pub(crate) fn parse_completion_content(json: &Value) -> Result<String> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.map(str::to_string)
		.ok_or_else(|| Error::InvalidResponse {
			message: "Completion response is missing choices[0].message.content.".to_string(),
		})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reads_first_choice_content() {
		let json = serde_json::json!({
			"choices": [
				{
					"message": {
						"role": "assistant",
						"content": "```json\n{\"hazards\": []}\n```"
					}
				},
				{ "message": { "content": "ignored" } }
			]
		});

		assert_eq!(
			parse_completion_content(&json).expect("parse failed"),
			"```json\n{\"hazards\": []}\n```"
		);
	}

	#[test]
	fn missing_content_is_an_invalid_response() {
		let json = serde_json::json!({ "choices": [] });

		assert!(matches!(parse_completion_content(&json), Err(Error::InvalidResponse { .. })));
	}
}
