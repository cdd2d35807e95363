pub mod responses;

mod error;

pub use error::{Error, Result};

use std::{
	fs,
	path::{Path, PathBuf},
};

use serde_json::Map;
use uuid::Uuid;

use dops_config::{
	Config, Corpus as CorpusPaths, EmbeddingProviderConfig, LlmProviderConfig, Pipeline, Providers,
	Retrieval, Service,
};
use dops_corpus::{Chunk, Corpus};

pub const DIMENSIONS: u32 = 32;

const FIXTURE_CHUNKS: [(&str, &str); 14] = [
	(
		"fema-flood-001",
		"Flood response procedures: establish incident command, monitor water levels, and close flooded roads.",
	),
	(
		"fema-flood-002",
		"Flash flood warnings require moving residents to higher ground and avoiding walking through moving water.",
	),
	(
		"cert-triage-001",
		"Medical triage sorts victims using START: walking wounded, delayed, immediate, and deceased.",
	),
	(
		"cert-triage-002",
		"Set up the medical triage area upwind and uphill of hazards with clear entry and exit points.",
	),
	(
		"fema-infra-001",
		"Infrastructure damage assessment covers buildings, bridges, utilities, and roads affected by the event.",
	),
	(
		"fema-infra-002",
		"Structural damage to buildings must be inspected by qualified engineers before re-entry.",
	),
	(
		"ready-evac-001",
		"Evacuation procedures: follow designated routes, bring emergency kits, and check in at shelters.",
	),
	(
		"ready-evac-002",
		"Safety protocols for responders include personal protective equipment and buddy systems.",
	),
	(
		"ics-resource-001",
		"Resource allocation in emergency response planning uses ICS 215 to match tactics to resources.",
	),
	(
		"ics-resource-002",
		"Request additional resources through the emergency operations center when local capacity is exceeded.",
	),
	(
		"fema-fire-001",
		"Wildfire smoke degrades air quality; residents with breathing difficulties should stay indoors.",
	),
	(
		"cert-hazmat-001",
		"Hazmat incidents require isolating the area, denying entry, and staying upwind of the release.",
	),
	("fema-quake-001", "After an earthquake expect aftershocks; drop, cover, and hold on."),
	(
		"ready-shelter-001",
		"Emergency shelters provide food, water, cots, and medical screening for displaced residents.",
	),
];

/// A scratch directory holding corpus files. Removed on drop.
pub struct FixtureDir {
	path: PathBuf,
}
impl FixtureDir {
	pub fn new() -> Result<Self> {
		let path = std::env::temp_dir().join(format!("dops_test_{}", Uuid::new_v4().simple()));

		fs::create_dir_all(&path).map_err(|err| Error::Write { path: path.clone(), source: err })?;

		Ok(Self { path })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Writes the fixture chunks and their hash embeddings, returning the matching paths.
	pub fn write_corpus(&self) -> Result<CorpusPaths> {
		let chunks_path = self.path.join("all_chunks.json");
		let embeddings_path = self.path.join("embeddings.json");
		let chunks = fixture_chunks();
		let embeddings = chunks
			.iter()
			.map(|chunk| hash_embed(&chunk.text, DIMENSIONS as usize))
			.collect::<Vec<_>>();

		write(&chunks_path, &serde_json::to_vec_pretty(&chunks)?)?;
		write(&embeddings_path, &serde_json::to_vec(&embeddings)?)?;

		Ok(CorpusPaths { chunks_path, embeddings_path, lexical_index_path: None })
	}
}
impl Drop for FixtureDir {
	fn drop(&mut self) {
		let _ = fs::remove_dir_all(&self.path);
	}
}

pub fn fixture_chunks() -> Vec<Chunk> {
	FIXTURE_CHUNKS
		.iter()
		.map(|(citation_id, text)| Chunk {
			citation_id: citation_id.to_string(),
			text: text.to_string(),
			word_count: text.split_whitespace().count() as u32,
		})
		.collect()
}

/// The fixture chunks with hash embeddings and an in-memory lexical index.
pub fn fixture_corpus() -> Result<Corpus> {
	let chunks = fixture_chunks();
	let embeddings =
		chunks.iter().map(|chunk| hash_embed(&chunk.text, DIMENSIONS as usize)).collect();

	Ok(Corpus::from_parts(chunks, embeddings, None, DIMENSIONS)?)
}

/// Deterministic bag-of-words embedding: each token is hashed into a signed bucket and the
/// result is L2-normalized.
pub fn hash_embed(text: &str, dimensions: usize) -> Vec<f32> {
	if dimensions == 0 {
		return Vec::new();
	}

	let mut vector = vec![0.0_f32; dimensions];

	for token in text.to_lowercase().split_whitespace() {
		let token = token.trim_matches(|c: char| !c.is_alphanumeric());

		if token.is_empty() {
			continue;
		}

		let hash = blake3::hash(token.as_bytes());
		let bytes = hash.as_bytes();
		let bucket = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
		let sign = if bytes[4] & 1 == 0 { 1.0 } else { -1.0 };

		vector[bucket % dimensions] += sign;
	}

	let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();

	if norm > 0.0 {
		vector.iter_mut().for_each(|value| *value /= norm);
	}

	vector
}

/// A complete config pointing at `corpus`. Provider endpoints are unreachable placeholders.
pub fn test_config(corpus: CorpusPaths) -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		corpus,
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:9".to_string(),
				api_key: "test-key".to_string(),
				api_key_env: None,
				path: "/v1/embeddings".to_string(),
				model: "hash".to_string(),
				dimensions: DIMENSIONS,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			llm: LlmProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:9".to_string(),
				api_key: "test-key".to_string(),
				api_key_env: None,
				path: "/v1/chat/completions".to_string(),
				model: "scripted".to_string(),
				temperature: 0.0,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		retrieval: Retrieval::default(),
		pipeline: Pipeline::default(),
	}
}

/// Corpus paths that do not exist, for tests that inject a preloaded corpus.
pub fn unused_corpus_paths() -> CorpusPaths {
	CorpusPaths {
		chunks_path: PathBuf::from("/nonexistent/dops/all_chunks.json"),
		embeddings_path: PathBuf::from("/nonexistent/dops/embeddings.json"),
		lexical_index_path: None,
	}
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
	fs::write(path, bytes).map_err(|err| Error::Write { path: path.to_path_buf(), source: err })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hash_embedding_is_deterministic_and_normalized() {
		let first = hash_embed("Flood response procedures", 32);
		let second = hash_embed("flood RESPONSE procedures.", 32);
		let norm = first.iter().map(|value| value * value).sum::<f32>().sqrt();

		assert_eq!(first, second);
		assert!((norm - 1.0).abs() < 1e-5);
	}

	#[test]
	fn fixture_corpus_is_aligned() {
		let corpus = fixture_corpus().expect("Fixture corpus must assemble.");

		assert_eq!(corpus.len(), FIXTURE_CHUNKS.len());
		assert_eq!(corpus.dimensions(), DIMENSIONS as usize);
	}
}
