use std::{fs, path::PathBuf};

use dops_corpus::{Bm25Index, Chunk, Corpus, Error};

fn chunk(citation_id: &str, text: &str) -> Chunk {
	Chunk { citation_id: citation_id.to_string(), text: text.to_string(), word_count: 0 }
}

fn scratch_dir(name: &str) -> PathBuf {
	let dir = std::env::temp_dir().join(format!("dops-corpus-{}-{name}", std::process::id()));

	fs::create_dir_all(&dir).expect("Failed to create scratch directory.");

	dir
}

#[test]
fn dense_scores_are_dot_products() {
	let corpus = Corpus::from_parts(
		vec![chunk("a", "flood"), chunk("b", "fire")],
		vec![vec![1.0, 0.0], vec![0.5, 0.5]],
		None,
		2,
	)
	.expect("Corpus must assemble.");
	let scores = corpus.dense_scores(&[2.0, 4.0]).expect("Query must match dimensions.");

	assert_eq!(scores, vec![2.0, 3.0]);
}

#[test]
fn query_dimension_mismatch_is_rejected() {
	let corpus = Corpus::from_parts(vec![chunk("a", "flood")], vec![vec![1.0, 0.0]], None, 2)
		.expect("Corpus must assemble.");

	assert!(matches!(corpus.dense_scores(&[1.0]), Err(Error::Misaligned(_))));
}

#[test]
fn misaligned_rows_are_rejected() {
	let result = Corpus::from_parts(
		vec![chunk("a", "flood"), chunk("b", "fire")],
		vec![vec![1.0, 0.0]],
		None,
		2,
	);

	assert!(matches!(result, Err(Error::Misaligned(_))));
}

#[test]
fn wrong_row_width_is_rejected() {
	let result = Corpus::from_parts(vec![chunk("a", "flood")], vec![vec![1.0, 0.0, 0.0]], None, 2);

	assert!(matches!(result, Err(Error::Misaligned(_))));
}

#[test]
fn lexical_index_must_cover_every_chunk() {
	let lexical = Bm25Index::build(["flood"]);
	let result = Corpus::from_parts(
		vec![chunk("a", "flood"), chunk("b", "fire")],
		vec![vec![1.0], vec![0.0]],
		Some(lexical),
		1,
	);

	assert!(matches!(result, Err(Error::Misaligned(_))));
}

#[test]
fn lexical_index_rows_must_agree() {
	let mut lexical = Bm25Index::build(["flood", "fire"]);

	lexical.doc_freqs.pop();

	let result = Corpus::from_parts(
		vec![chunk("a", "flood"), chunk("b", "fire")],
		vec![vec![1.0], vec![0.0]],
		Some(lexical),
		1,
	);

	assert!(matches!(result, Err(Error::Misaligned(_))));
}

#[test]
fn empty_corpus_is_valid() {
	let corpus =
		Corpus::from_parts(Vec::new(), Vec::new(), None, 3).expect("Empty corpus must assemble.");

	assert!(corpus.is_empty());
	assert!(
		corpus.dense_scores(&[0.0, 0.0, 0.0]).expect("Query must match dimensions.").is_empty()
	);
	assert!(corpus.lexical_scores("flood").is_empty());
}

#[test]
fn loads_files_and_fingerprints_the_chunk_source() {
	let dir = scratch_dir("load");
	let chunks_path = dir.join("chunks.json");
	let embeddings_path = dir.join("embeddings.json");
	let chunks_raw = r#"[
		{"citation_id": "fema-1", "text": "Flood response procedures", "word_count": 3, "source": "fema"},
		{"citation_id": "cert-1", "text": "Medical triage setup"},
		{"citation_id": "ready-1", "text": "Evacuation routes and shelters"}
	]"#;

	fs::write(&chunks_path, chunks_raw).expect("Failed to write chunks.");
	fs::write(&embeddings_path, "[[1.0, 0.0], [0.0, 1.0], [0.5, 0.5]]")
		.expect("Failed to write embeddings.");

	let cfg = dops_config::Corpus { chunks_path, embeddings_path, lexical_index_path: None };
	let corpus = Corpus::load(&cfg, 2).expect("Corpus must load.");

	assert_eq!(corpus.len(), 3);
	assert_eq!(corpus.chunk(0).map(|chunk| chunk.word_count), Some(3));
	assert_eq!(corpus.chunk(1).map(|chunk| chunk.word_count), Some(0));
	assert_eq!(corpus.fingerprint(), blake3::hash(chunks_raw.as_bytes()).to_hex().to_string());

	let lexical = corpus.lexical_scores("flood");

	assert!(lexical[0] > 0.0);
	assert_eq!(lexical[1..], [0.0, 0.0]);

	let _ = fs::remove_dir_all(dir);
}

#[test]
fn loads_a_serialized_lexical_index() {
	let dir = scratch_dir("lexical");
	let chunks_path = dir.join("chunks.json");
	let embeddings_path = dir.join("embeddings.json");
	let lexical_path = dir.join("bm25.json");
	let index = Bm25Index::build(["flood response", "medical triage", "shelter staffing"]);

	fs::write(
		&chunks_path,
		r#"[
			{"citation_id": "a", "text": "flood response"},
			{"citation_id": "b", "text": "medical triage"},
			{"citation_id": "c", "text": "shelter staffing"}
		]"#,
	)
	.expect("Failed to write chunks.");
	fs::write(&embeddings_path, "[[1.0], [0.0], [0.5]]").expect("Failed to write embeddings.");
	fs::write(&lexical_path, serde_json::to_vec(&index).expect("Failed to encode index."))
		.expect("Failed to write lexical index.");

	let cfg = dops_config::Corpus {
		chunks_path,
		embeddings_path,
		lexical_index_path: Some(lexical_path),
	};
	let corpus = Corpus::load(&cfg, 1).expect("Corpus must load.");

	let scores = corpus.lexical_scores("medical");

	assert_eq!(scores, index.scores(&["medical"]));
	assert!(scores[1] > 0.0);

	let _ = fs::remove_dir_all(dir);
}

#[test]
fn missing_files_report_their_path() {
	let cfg = dops_config::Corpus {
		chunks_path: PathBuf::from("/nonexistent/dops/chunks.json"),
		embeddings_path: PathBuf::from("/nonexistent/dops/embeddings.json"),
		lexical_index_path: None,
	};

	match Corpus::load(&cfg, 2) {
		Err(Error::Read { path, .. }) => assert_eq!(path, cfg.chunks_path),
		other => panic!("Expected a read error, got {other:?}."),
	}
}
