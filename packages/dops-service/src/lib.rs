pub mod pipeline;
pub mod prompts;
pub mod retrieval;
pub mod verify;

mod error;

pub use error::{Error, Result};
pub use pipeline::{
	PipelineRun, PipelineState, RunRequest, RunStatus, Stage, StageOutcome, StageReport,
};
pub use retrieval::{EvidenceChunk, SearchHit, SearchRequest, SearchResponse};
pub use verify::{EvidenceSummary, FinalOutput, GroundingSignals};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;
use tokio::sync::OnceCell;

use dops_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use dops_corpus::Corpus;
use dops_domain::completion::{self, Completion};
use dops_providers::{completion as chat, embedding};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Text-completion collaborator. Returns the raw reply text; parsing happens in the stages.
pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<String>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub completion: Arc<dyn CompletionProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		completion: Arc<dyn CompletionProvider>,
	) -> Self {
		Self { embedding, completion }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), completion: provider }
	}
}

/// Process-wide context: config, collaborators and the lazily loaded corpus.
pub struct DopsService {
	pub cfg: Config,
	pub providers: Providers,
	corpus: OnceCell<Arc<Corpus>>,
}
impl DopsService {
	pub fn new(cfg: Config) -> Self {
		Self::with_providers(cfg, Providers::default())
	}

	pub fn with_providers(cfg: Config, providers: Providers) -> Self {
		Self { cfg, providers, corpus: OnceCell::new() }
	}

	/// Skips the file loader; `corpus` is used as-is for every run.
	pub fn with_corpus(cfg: Config, providers: Providers, corpus: Corpus) -> Self {
		Self { cfg, providers, corpus: OnceCell::new_with(Some(Arc::new(corpus))) }
	}

	/// Loads the corpus on first use. A failed load is retried on the next call.
	pub async fn corpus(&self) -> Result<Arc<Corpus>> {
		let corpus = self
			.corpus
			.get_or_try_init(|| async {
				let paths = self.cfg.corpus.clone();
				let dimensions = self.cfg.providers.embedding.dimensions;
				let corpus =
					tokio::task::spawn_blocking(move || Corpus::load(&paths, dimensions))
						.await
						.map_err(|err| Error::MissingResource {
							message: format!("Corpus loader task failed: {err}."),
						})??;

				Ok::<_, Error>(Arc::new(corpus))
			})
			.await?;

		Ok(corpus.clone())
	}

	pub(crate) async fn complete_json(&self, messages: &[Value]) -> Result<Completion> {
		let raw = self.providers.completion.complete(&self.cfg.providers.llm, messages).await?;

		Ok(completion::parse_completion(&raw))
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}
impl CompletionProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(chat::complete(cfg, messages).await?) })
	}
}
