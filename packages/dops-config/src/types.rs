use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub corpus: Corpus,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub pipeline: Pipeline,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Corpus {
	pub chunks_path: PathBuf,
	pub embeddings_path: PathBuf,
	/// Optional. When absent the lexical index is built in memory from the chunk texts.
	pub lexical_index_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	/// May be blank; resolved from `api_key_env` at first use.
	#[serde(default)]
	pub api_key: String,
	pub api_key_env: Option<String>,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	pub api_key_env: Option<String>,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	/// Weight of the dense signal in the fused score; the lexical signal gets the rest.
	pub dense_weight: f32,
	pub per_query_k: u32,
	pub max_evidence: u32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self { dense_weight: 0.5, per_query_k: 5, max_evidence: 15 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Pipeline {
	pub planner_evidence_chunks: u32,
	pub evidence_excerpt_chars: u32,
	pub verifier_citation_sample: u32,
	pub summary_citation_ids: u32,
}
impl Default for Pipeline {
	fn default() -> Self {
		Self {
			planner_evidence_chunks: 10,
			evidence_excerpt_chars: 500,
			verifier_citation_sample: 10,
			summary_citation_ids: 20,
		}
	}
}
