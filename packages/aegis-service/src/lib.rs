pub mod admin;
pub mod filter;
pub mod fusion;
pub mod lexical;
pub mod provision;
pub mod search;
pub mod vector;

use std::{future::Future, pin::Pin, sync::Arc, sync::RwLock};

use bson::{Bson, Document};

pub use admin::IndexReport;
use aegis_config::{Config, EmbeddingProviderConfig};
use aegis_storage::{classify::BackendFailure, store::Store};
pub use provision::{FailedBatch, ProvisionPreview, ProvisionReport};
pub use search::{
	Degradation, HybridSearchRequest, SearchEnvelope, SearchItem, SourceScore,
};
pub use vector::VectorSearchOutcome;

pub type ServiceResult<T> = Result<T, ServiceError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Seam for the embedding provider so tests can stub or observe the call.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, aegis_providers::Result<Vec<Vec<f32>>>>;
}

/// Production provider backed by the HTTP embedding client.
pub struct HttpEmbeddingProvider;
impl EmbeddingProvider for HttpEmbeddingProvider {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, aegis_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(aegis_providers::embedding::embed(cfg, texts))
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}

/// Seam for staged pipeline execution. The driver's command errors cannot be
/// constructed outside the driver, so executors branch on the classification
/// this seam attaches instead of re-inspecting driver internals; tests stub
/// it to drive the degraded paths.
pub trait QueryBackend
where
	Self: Send + Sync,
{
	fn aggregate<'a>(
		&'a self,
		pipeline: Vec<Document>,
	) -> BoxFuture<'a, Result<Vec<Document>, QueryError>>;
}
impl QueryBackend for Store {
	fn aggregate<'a>(
		&'a self,
		pipeline: Vec<Document>,
	) -> BoxFuture<'a, Result<Vec<Document>, QueryError>> {
		Box::pin(async move { Store::aggregate(self, pipeline).await.map_err(QueryError::from) })
	}
}

/// A failed pipeline execution, carrying its classification.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct QueryError {
	pub failure: BackendFailure,
	#[source]
	pub source: aegis_storage::Error,
}
impl From<aegis_storage::Error> for QueryError {
	fn from(source: aegis_storage::Error) -> Self {
		let failure = match &source {
			aegis_storage::Error::Mongo(err) => aegis_storage::classify::classify(err),
		};

		Self { failure, source }
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
	#[error("{message}")]
	InvalidRequest { message: String },
	#[error(transparent)]
	Embedding(#[from] aegis_providers::Error),
	#[error(transparent)]
	Storage(#[from] aegis_storage::Error),
	#[error("Lexical and vector sub-queries both failed: lexical: {lexical}; vector: {vector}")]
	AllSourcesFailed { lexical: String, vector: String },
}
impl From<mongodb::error::Error> for ServiceError {
	fn from(err: mongodb::error::Error) -> Self {
		Self::Storage(err.into())
	}
}
impl From<QueryError> for ServiceError {
	fn from(err: QueryError) -> Self {
		Self::Storage(err.source)
	}
}

/// One entry of a source's ranked list: document identifier plus the
/// source's native score, ordered descending.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RankedHit {
	pub doc_id: String,
	pub score: f64,
}

pub struct SearchService {
	pub cfg: Config,
	pub store: Arc<Store>,
	pub providers: Providers,
	pub(crate) backend: Arc<dyn QueryBackend>,
	/// Capability cache: whether the backend's native rank-fusion stage is
	/// usable. Resolved once (from config, or probed on first hybrid query
	/// when the mode is `auto`) and flipped off permanently on an
	/// unsupported-feature failure. Never re-probed per query.
	native_fusion: RwLock<Option<bool>>,
}
impl SearchService {
	pub fn new(cfg: Config, store: Store, providers: Providers) -> Self {
		let store = Arc::new(store);

		Self::with_backend(cfg, store.clone(), providers, store)
	}

	pub fn with_backend(
		cfg: Config,
		store: Arc<Store>,
		providers: Providers,
		backend: Arc<dyn QueryBackend>,
	) -> Self {
		let native_fusion = match cfg.search.native_rank_fusion.as_str() {
			"always" => Some(true),
			"never" => Some(false),
			_ => None,
		};

		Self { cfg, store, providers, backend, native_fusion: RwLock::new(native_fusion) }
	}

	pub(crate) fn native_fusion_enabled(&self) -> Option<bool> {
		*self.native_fusion.read().unwrap_or_else(|err| err.into_inner())
	}

	pub(crate) fn set_native_fusion(&self, supported: bool) {
		*self.native_fusion.write().unwrap_or_else(|err| err.into_inner()) = Some(supported);
	}

	pub(crate) async fn embed_query(&self, query: &str) -> ServiceResult<Vec<f32>> {
		let texts = vec![query.to_string()];
		let mut embeddings =
			self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await?;

		if embeddings.is_empty() {
			return Err(ServiceError::Embedding(aegis_providers::Error::InvalidResponse {
				message: "Embedding provider returned no vectors.".to_string(),
			}));
		}

		Ok(embeddings.swap_remove(0))
	}
}

/// Canonical string form of a document identifier, used for fusion merging
/// and deterministic tie-breaks.
pub(crate) fn doc_id_string(id: &Bson) -> String {
	match id {
		Bson::ObjectId(oid) => oid.to_hex(),
		Bson::String(text) => text.clone(),
		other => other.to_string(),
	}
}
