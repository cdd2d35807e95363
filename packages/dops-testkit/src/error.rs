use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to write fixture file at {path:?}.")]
	Write { path: PathBuf, source: std::io::Error },

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Corpus(#[from] dops_corpus::Error),
}
