//! Hybrid dense + lexical evidence retrieval.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{DopsService, Error, Result};
use dops_corpus::Corpus;
use dops_domain::schema::StructuredIncident;

pub const SCORE_EPSILON: f32 = 1e-8;
pub const DEFAULT_TOP_K: usize = 10;

const MEDICAL_QUERY: &str = "medical triage treatment procedures emergency";
const NO_INJURY_MEDICAL_QUERY: &str = "medical triage setup procedures no injuries";
const EVACUATION_QUERY: &str = "evacuation procedures safety protocols";
const RESOURCE_QUERY: &str = "resource allocation emergency response planning";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceChunk {
	pub citation_id: String,
	pub text: String,
	pub score: f32,
	pub word_count: u32,
	/// The query that first retrieved this chunk.
	pub query: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	pub top_k: Option<u32>,
	pub dense_weight: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
	pub query: String,
	pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
	pub index: usize,
	pub citation_id: String,
	pub text: String,
	pub score: f32,
}

impl DopsService {
	/// Runs every incident query and merges the results into one evidence list.
	pub async fn retrieve(&self, incident: &StructuredIncident) -> Result<Vec<EvidenceChunk>> {
		let corpus = self.corpus().await?;

		self.retrieve_from(&corpus, incident).await
	}

	pub(crate) async fn retrieve_from(
		&self,
		corpus: &Corpus,
		incident: &StructuredIncident,
	) -> Result<Vec<EvidenceChunk>> {
		if corpus.is_empty() {
			return Ok(Vec::new());
		}

		let queries = build_queries(incident);
		let vectors = self.embed_queries(&queries).await?;
		let retrieval = &self.cfg.retrieval;
		let mut per_query = Vec::with_capacity(queries.len());

		for (query, vector) in queries.into_iter().zip(vectors.iter()) {
			let hits = hybrid_search(
				corpus,
				&query,
				vector,
				retrieval.per_query_k as usize,
				retrieval.dense_weight,
			)?;

			per_query.push((query, hits));
		}

		Ok(accumulate_evidence(corpus, per_query, retrieval.max_evidence as usize))
	}

	/// Ad-hoc hybrid search over the corpus for a single query.
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let query = req.query.trim().to_string();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}

		let top_k = req.top_k.map(|top_k| top_k as usize).unwrap_or(DEFAULT_TOP_K);

		if top_k == 0 {
			return Err(Error::InvalidRequest {
				message: "top_k must be greater than zero.".to_string(),
			});
		}

		let dense_weight = req.dense_weight.unwrap_or(self.cfg.retrieval.dense_weight);

		if !dense_weight.is_finite() || !(0.0..=1.0).contains(&dense_weight) {
			return Err(Error::InvalidRequest {
				message: "dense_weight must be in the range 0.0-1.0.".to_string(),
			});
		}

		let corpus = self.corpus().await?;

		if corpus.is_empty() {
			return Ok(SearchResponse { query, hits: Vec::new() });
		}

		let vectors = self.embed_queries(std::slice::from_ref(&query)).await?;
		let Some(vector) = vectors.first() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};
		let hits = hybrid_search(&corpus, &query, vector, top_k, dense_weight)?
			.into_iter()
			.filter_map(|(index, score)| {
				corpus.chunk(index).map(|chunk| SearchHit {
					index,
					citation_id: chunk.citation_id.clone(),
					text: chunk.text.clone(),
					score,
				})
			})
			.collect();

		Ok(SearchResponse { query, hits })
	}

	async fn embed_queries(&self, queries: &[String]) -> Result<Vec<Vec<f32>>> {
		let vectors =
			self.providers.embedding.embed(&self.cfg.providers.embedding, queries).await?;

		if vectors.len() != queries.len() {
			return Err(Error::Provider {
				message: format!(
					"Embedding provider returned {} vectors for {} queries.",
					vectors.len(),
					queries.len()
				),
			});
		}

		Ok(vectors)
	}
}

/// Template queries in fixed order: hazards, medical, infrastructure, evacuation, resources.
pub fn build_queries(incident: &StructuredIncident) -> Vec<String> {
	let mut queries = Vec::with_capacity(5);

	if !incident.hazards.is_empty() {
		queries.push(format!(
			"{} response procedures emergency management",
			incident.hazards.join(", ")
		));
	}

	if incident.has_injuries() {
		queries.push(MEDICAL_QUERY.to_string());
	} else {
		queries.push(NO_INJURY_MEDICAL_QUERY.to_string());
	}

	if !incident.infrastructure_status.is_empty() {
		queries.push(format!(
			"infrastructure damage assessment {}",
			incident.infrastructure_status.join(", ")
		));
	}
	if !incident.hazards.is_empty() {
		queries.push(EVACUATION_QUERY.to_string());
	}

	queries.push(RESOURCE_QUERY.to_string());

	queries
}

/// `(score - min) / (max - min + eps)`. A flat input maps to all zeros.
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
	let (min, max) = scores
		.iter()
		.fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), score| {
			(min.min(*score), max.max(*score))
		});

	scores.iter().map(|score| (score - min) / (max - min + SCORE_EPSILON)).collect()
}

/// Top `k` corpus indices by fused score, descending. Ties go to the lower index.
pub fn hybrid_search(
	corpus: &Corpus,
	query: &str,
	query_vector: &[f32],
	k: usize,
	dense_weight: f32,
) -> Result<Vec<(usize, f32)>> {
	let dense = corpus.dense_scores(query_vector).map_err(|err| Error::Provider {
		message: format!("Embedding vector does not match the corpus: {err}"),
	})?;
	let lexical = corpus.lexical_scores(query);

	Ok(rank(&fuse(&dense, &lexical, dense_weight), k))
}

pub fn fuse(dense: &[f32], lexical: &[f32], dense_weight: f32) -> Vec<f32> {
	let dense = min_max_normalize(dense);
	let lexical = min_max_normalize(lexical);

	dense
		.iter()
		.zip(lexical.iter())
		.map(|(dense, lexical)| dense_weight * dense + (1.0 - dense_weight) * lexical)
		.collect()
}

pub fn rank(fused: &[f32], k: usize) -> Vec<(usize, f32)> {
	let mut ranked = fused.iter().copied().enumerate().collect::<Vec<_>>();

	ranked.sort_by(|(lhs_index, lhs), (rhs_index, rhs)| {
		rhs.total_cmp(lhs).then_with(|| lhs_index.cmp(rhs_index))
	});
	ranked.truncate(k);

	ranked
}

/// Merges per-query hits in query order. A citation is kept the first time it is seen, even
/// if a later query scores it higher. The merged list is stably sorted by score and capped.
pub fn accumulate_evidence(
	corpus: &Corpus,
	per_query: Vec<(String, Vec<(usize, f32)>)>,
	max_evidence: usize,
) -> Vec<EvidenceChunk> {
	let mut seen = HashSet::new();
	let mut evidence = Vec::new();

	for (query, hits) in per_query {
		for (index, score) in hits {
			let Some(chunk) = corpus.chunk(index) else {
				continue;
			};

			if !seen.insert(chunk.citation_id.clone()) {
				continue;
			}

			evidence.push(EvidenceChunk {
				citation_id: chunk.citation_id.clone(),
				text: chunk.text.clone(),
				score,
				word_count: chunk.word_count,
				query: query.clone(),
			});
		}
	}

	evidence.sort_by(|lhs, rhs| rhs.score.total_cmp(&lhs.score));
	evidence.truncate(max_evidence);

	evidence
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn flat_scores_normalize_to_zero() {
		assert_eq!(min_max_normalize(&[0.4, 0.4, 0.4]), vec![0.0, 0.0, 0.0]);
	}

	#[test]
	fn normalized_scores_stay_in_unit_range() {
		let normalized = min_max_normalize(&[-2.0, 0.0, 3.0]);

		assert_eq!(normalized[0], 0.0);
		assert!(normalized[2] <= 1.0 && normalized[2] > 0.999);
	}

	#[test]
	fn nan_scores_do_not_break_the_order() {
		let ranked = rank(&[0.2, f32::NAN, 0.9, 0.5], 4);
		let indices = ranked.iter().map(|(index, _)| *index).collect::<Vec<_>>();

		assert_eq!(indices, vec![1, 2, 3, 0]);
	}

	#[test]
	fn ties_rank_by_index() {
		assert_eq!(rank(&[0.5, 0.9, 0.5, 0.1], 3), vec![(1, 0.9), (0, 0.5), (2, 0.5)]);
	}

	#[test]
	fn weight_selects_the_signal() {
		let dense = [1.0, 0.0];
		let lexical = [0.0, 1.0];

		assert!(fuse(&dense, &lexical, 1.0)[0] > 0.99);
		assert_eq!(fuse(&dense, &lexical, 1.0)[1], 0.0);
		assert!(fuse(&dense, &lexical, 0.0)[1] > 0.99);
	}
}
