use std::{
	fs,
	path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
	Error, Result,
	bm25::{self, Bm25Index},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
	pub citation_id: String,
	pub text: String,
	#[serde(default)]
	pub word_count: u32,
}

/// Read-only retrieval resources. Chunks, embedding rows and lexical documents share one
/// index space.
#[derive(Debug)]
pub struct Corpus {
	chunks: Vec<Chunk>,
	embeddings: Vec<Vec<f32>>,
	lexical: Bm25Index,
	dimensions: usize,
	fingerprint: String,
}
impl Corpus {
	pub fn load(cfg: &dops_config::Corpus, dimensions: u32) -> Result<Self> {
		let raw_chunks = read(&cfg.chunks_path)?;
		let fingerprint = blake3::hash(&raw_chunks).to_hex().to_string();
		let chunks: Vec<Chunk> = parse(&cfg.chunks_path, &raw_chunks)?;
		let embeddings: Vec<Vec<f32>> =
			parse(&cfg.embeddings_path, &read(&cfg.embeddings_path)?)?;
		let lexical = match cfg.lexical_index_path.as_deref() {
			Some(path) => parse(path, &read(path)?)?,
			None => Bm25Index::build(chunks.iter().map(|chunk| chunk.text.as_str())),
		};
		let corpus = Self::assemble(chunks, embeddings, lexical, dimensions as usize, fingerprint)?;

		tracing::info!(
			chunks = corpus.len(),
			dimensions = corpus.dimensions,
			fingerprint = %corpus.fingerprint,
			"Corpus loaded."
		);

		Ok(corpus)
	}

	/// Builds a corpus from in-memory parts. The lexical index is built from the chunk texts
	/// when none is given.
	pub fn from_parts(
		chunks: Vec<Chunk>,
		embeddings: Vec<Vec<f32>>,
		lexical: Option<Bm25Index>,
		dimensions: u32,
	) -> Result<Self> {
		let encoded = serde_json::to_vec(&chunks)
			.map_err(|err| Error::Parse { path: PathBuf::new(), source: err })?;
		let fingerprint = blake3::hash(&encoded).to_hex().to_string();
		let lexical = lexical
			.unwrap_or_else(|| Bm25Index::build(chunks.iter().map(|chunk| chunk.text.as_str())));

		Self::assemble(chunks, embeddings, lexical, dimensions as usize, fingerprint)
	}

	pub fn len(&self) -> usize {
		self.chunks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chunks.is_empty()
	}

	pub fn dimensions(&self) -> usize {
		self.dimensions
	}

	/// BLAKE3 hex digest of the chunk source.
	pub fn fingerprint(&self) -> &str {
		&self.fingerprint
	}

	pub fn chunk(&self, index: usize) -> Option<&Chunk> {
		self.chunks.get(index)
	}

	/// Dot product of the query vector with every chunk embedding.
	pub fn dense_scores(&self, query: &[f32]) -> Result<Vec<f32>> {
		if query.len() != self.dimensions {
			return Err(Error::Misaligned(format!(
				"query vector has {} dimensions, corpus has {}.",
				query.len(),
				self.dimensions
			)));
		}

		Ok(self
			.embeddings
			.iter()
			.map(|row| row.iter().zip(query.iter()).map(|(lhs, rhs)| lhs * rhs).sum())
			.collect())
	}

	pub fn lexical_scores(&self, query: &str) -> Vec<f32> {
		self.lexical.scores(&bm25::tokenize(query))
	}

	fn assemble(
		chunks: Vec<Chunk>,
		embeddings: Vec<Vec<f32>>,
		lexical: Bm25Index,
		dimensions: usize,
		fingerprint: String,
	) -> Result<Self> {
		if embeddings.len() != chunks.len() {
			return Err(Error::Misaligned(format!(
				"{} chunks but {} embedding rows.",
				chunks.len(),
				embeddings.len()
			)));
		}
		if lexical.len() != chunks.len() {
			return Err(Error::Misaligned(format!(
				"{} chunks but {} lexical index documents.",
				chunks.len(),
				lexical.len()
			)));
		}
		if lexical.doc_freqs.len() != lexical.doc_len.len() {
			return Err(Error::Misaligned(format!(
				"lexical index has {} document lengths but {} term frequency rows.",
				lexical.doc_len.len(),
				lexical.doc_freqs.len()
			)));
		}
		if let Some((row, embedding)) =
			embeddings.iter().enumerate().find(|(_, embedding)| embedding.len() != dimensions)
		{
			return Err(Error::Misaligned(format!(
				"embedding row {row} has {} dimensions, expected {dimensions}.",
				embedding.len()
			)));
		}

		Ok(Self { chunks, embeddings, lexical, dimensions, fingerprint })
	}
}

fn read(path: &Path) -> Result<Vec<u8>> {
	fs::read(path).map_err(|err| Error::Read { path: path.to_path_buf(), source: err })
}

fn parse<T>(path: &Path, raw: &[u8]) -> Result<T>
where
	T: for<'de> Deserialize<'de>,
{
	serde_json::from_slice(raw)
		.map_err(|err| Error::Parse { path: path.to_path_buf(), source: err })
}
