pub mod completion;
pub mod embedding;

mod error;

pub use error::{Error, Result};

use std::env;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// The inline key wins; otherwise the key is read from the named environment variable.
pub fn resolve_api_key(api_key: &str, api_key_env: Option<&str>) -> Result<String> {
	if !api_key.trim().is_empty() {
		return Ok(api_key.to_string());
	}

	let Some(name) = api_key_env else {
		return Err(Error::MissingApiKey {
			message: "No API key configured and no api_key_env given.".to_string(),
		});
	};

	env::var(name).ok().filter(|key| !key.trim().is_empty()).ok_or_else(|| Error::MissingApiKey {
		message: format!("Environment variable {name} is not set."),
	})
}
