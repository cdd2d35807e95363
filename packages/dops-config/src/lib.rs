mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Corpus, EmbeddingProviderConfig, LlmProviderConfig, Pipeline, Providers, Retrieval,
	Service,
};

use std::{fs, path::Path};

/// Upper bound on the evidence set kept per run.
pub const MAX_EVIDENCE_LIMIT: u32 = 15;
/// Upper bound on citation ids listed in a run's evidence summary.
pub const SUMMARY_CITATION_IDS_LIMIT: u32 = 20;
/// Upper bound on citation ids shown to the verifier.
pub const VERIFIER_CITATION_SAMPLE_LIMIT: u32 = 10;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } =>
			Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}

	for (label, path) in [
		("corpus.chunks_path", &cfg.corpus.chunks_path),
		("corpus.embeddings_path", &cfg.corpus.embeddings_path),
	] {
		if path.as_os_str().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if !cfg.retrieval.dense_weight.is_finite() {
		return Err(Error::Validation {
			message: "retrieval.dense_weight must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.retrieval.dense_weight) {
		return Err(Error::Validation {
			message: "retrieval.dense_weight must be in the range 0.0-1.0.".to_string(),
		});
	}

	for (label, value) in [
		("retrieval.per_query_k", cfg.retrieval.per_query_k),
		("retrieval.max_evidence", cfg.retrieval.max_evidence),
		("pipeline.planner_evidence_chunks", cfg.pipeline.planner_evidence_chunks),
		("pipeline.evidence_excerpt_chars", cfg.pipeline.evidence_excerpt_chars),
		("pipeline.verifier_citation_sample", cfg.pipeline.verifier_citation_sample),
		("pipeline.summary_citation_ids", cfg.pipeline.summary_citation_ids),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	for (label, value, limit) in [
		("retrieval.max_evidence", cfg.retrieval.max_evidence, MAX_EVIDENCE_LIMIT),
		(
			"pipeline.summary_citation_ids",
			cfg.pipeline.summary_citation_ids,
			SUMMARY_CITATION_IDS_LIMIT,
		),
		(
			"pipeline.verifier_citation_sample",
			cfg.pipeline.verifier_citation_sample,
			VERIFIER_CITATION_SAMPLE_LIMIT,
		),
	] {
		if value > limit {
			return Err(Error::Validation {
				message: format!("{label} must be {limit} or less."),
			});
		}
	}

	if !cfg.providers.llm.temperature.is_finite() || cfg.providers.llm.temperature < 0.0 {
		return Err(Error::Validation {
			message: "providers.llm.temperature must be a finite number, zero or greater."
				.to_string(),
		});
	}

	for (label, timeout_ms) in [
		("providers.embedding.timeout_ms", cfg.providers.embedding.timeout_ms),
		("providers.llm.timeout_ms", cfg.providers.llm.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.corpus.lexical_index_path.as_deref().is_some_and(|path| path.as_os_str().is_empty()) {
		cfg.corpus.lexical_index_path = None;
	}
	if blank(cfg.providers.embedding.api_key_env.as_deref()) {
		cfg.providers.embedding.api_key_env = None;
	}
	if blank(cfg.providers.llm.api_key_env.as_deref()) {
		cfg.providers.llm.api_key_env = None;
	}
}

fn blank(value: Option<&str>) -> bool {
	value.is_some_and(|value| value.trim().is_empty())
}
