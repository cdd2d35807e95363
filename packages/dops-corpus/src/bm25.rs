//! Okapi BM25 over whitespace tokens.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

pub const DEFAULT_K1: f64 = 1.5;
pub const DEFAULT_B: f64 = 0.75;
pub const DEFAULT_EPSILON: f64 = 0.25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bm25Index {
	pub k1: f64,
	pub b: f64,
	pub epsilon: f64,
	pub avgdl: f64,
	pub doc_len: Vec<u32>,
	pub doc_freqs: Vec<AHashMap<String, u32>>,
	pub idf: AHashMap<String, f64>,
}
impl Bm25Index {
	pub fn build<D, T>(documents: D) -> Self
	where
		D: IntoIterator<Item = T>,
		T: AsRef<str>,
	{
		let mut doc_len = Vec::new();
		let mut doc_freqs = Vec::new();
		let mut doc_counts: AHashMap<String, u32> = AHashMap::new();
		let mut total_len = 0_u64;

		for document in documents {
			let tokens = tokenize(document.as_ref());
			let mut freqs: AHashMap<String, u32> = AHashMap::new();

			for token in tokens.iter() {
				*freqs.entry(token.clone()).or_default() += 1;
			}
			for token in freqs.keys() {
				*doc_counts.entry(token.clone()).or_default() += 1;
			}

			total_len += tokens.len() as u64;

			doc_len.push(tokens.len() as u32);
			doc_freqs.push(freqs);
		}

		let avgdl = if doc_len.is_empty() { 0.0 } else { total_len as f64 / doc_len.len() as f64 };
		let idf = inverse_document_frequencies(doc_len.len(), &doc_counts, DEFAULT_EPSILON);

		Self {
			k1: DEFAULT_K1,
			b: DEFAULT_B,
			epsilon: DEFAULT_EPSILON,
			avgdl,
			doc_len,
			doc_freqs,
			idf,
		}
	}

	pub fn len(&self) -> usize {
		self.doc_len.len()
	}

	pub fn is_empty(&self) -> bool {
		self.doc_len.is_empty()
	}

	/// One score per document, in index order. Repeated query terms contribute repeatedly.
	pub fn scores<S>(&self, query_terms: &[S]) -> Vec<f32>
	where
		S: AsRef<str>,
	{
		let avgdl = if self.avgdl > 0.0 { self.avgdl } else { 1.0 };
		let mut scores = vec![0.0_f64; self.len()];

		for term in query_terms {
			let term = term.as_ref();
			let Some(idf) = self.idf.get(term).copied() else {
				continue;
			};

			for (score, (freqs, len)) in
				scores.iter_mut().zip(self.doc_freqs.iter().zip(self.doc_len.iter()))
			{
				let tf = freqs.get(term).copied().unwrap_or(0) as f64;

				if tf == 0.0 {
					continue;
				}

				let norm = self.k1 * (1.0 - self.b + self.b * f64::from(*len) / avgdl);

				*score += idf * (tf * (self.k1 + 1.0)) / (tf + norm);
			}
		}

		scores.into_iter().map(|score| score as f32).collect()
	}
}

/// Lower-cased whitespace split, the same rule for documents and queries.
pub fn tokenize(text: &str) -> Vec<String> {
	text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// Negative idf values (terms in more than half the documents) are floored to
/// `epsilon * mean idf`.
fn inverse_document_frequencies(
	corpus_size: usize,
	doc_counts: &AHashMap<String, u32>,
	epsilon: f64,
) -> AHashMap<String, f64> {
	let mut idf = AHashMap::with_capacity(doc_counts.len());
	let mut idf_sum = 0.0;
	let mut negative = Vec::new();

	for (term, count) in doc_counts {
		let count = f64::from(*count);
		let value = (corpus_size as f64 - count + 0.5).ln() - (count + 0.5).ln();

		idf_sum += value;

		if value < 0.0 {
			negative.push(term.clone());
		}

		idf.insert(term.clone(), value);
	}

	if !idf.is_empty() {
		let floor = epsilon * idf_sum / idf.len() as f64;

		for term in negative {
			idf.insert(term, floor);
		}
	}

	idf
}

#[cfg(test)]
mod tests {
	use super::*;

	fn index() -> Bm25Index {
		Bm25Index::build([
			"flood response procedures for flood zones",
			"medical triage setup",
			"evacuation routes and shelters",
			"shelter staffing plan",
		])
	}

	#[test]
	fn scores_favor_matching_documents() {
		let index = index();
		let scores = index.scores(&tokenize("Flood response"));

		assert_eq!(scores.len(), 4);
		assert!(scores[0] > 0.0);
		assert!(scores[1..].iter().all(|score| *score == 0.0));
	}

	#[test]
	fn unknown_terms_score_zero() {
		assert!(index().scores(&["volcano"]).iter().all(|score| *score == 0.0));
	}

	#[test]
	fn common_terms_get_the_epsilon_floor() {
		let index = Bm25Index::build(["a b", "a c", "a d"]);
		let common = 0.5_f64.ln() - 3.5_f64.ln();
		let rare = 2.5_f64.ln() - 1.5_f64.ln();
		let expected = DEFAULT_EPSILON * (common + 3.0 * rare) / 4.0;
		let floored = index.idf.get("a").copied().expect("Term must be indexed.");

		assert!((floored - expected).abs() < 1e-9);
		assert_eq!(index.idf.get("b").copied(), Some(rare));
	}

	#[test]
	fn empty_corpus_has_no_scores() {
		let index = Bm25Index::build(Vec::<String>::new());

		assert!(index.is_empty());
		assert!(index.scores(&["flood"]).is_empty());
	}
}
