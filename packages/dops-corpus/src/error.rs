use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read corpus file at {path:?}.")]
	Read { path: PathBuf, source: std::io::Error },
	#[error("Failed to parse corpus file at {path:?}.")]
	Parse { path: PathBuf, source: serde_json::Error },
	#[error("Corpus is misaligned: {0}")]
	Misaligned(String),
}
