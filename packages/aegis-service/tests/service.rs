use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use bson::{Document, doc};

use aegis_config::{Config, EmbeddingProviderConfig};
use aegis_domain::AccessGrant;
use aegis_service::{
	BoxFuture, Degradation, EmbeddingProvider, Providers, QueryBackend, QueryError, SearchService,
	ServiceError,
};
use aegis_storage::{classify::BackendFailure, store::Store};

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_config() -> Config {
	let cfg: Config = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");

	aegis_config::validate(&cfg).expect("Sample config must validate.");

	cfg
}

/// Counts invocations and returns a fixed vector, so tests can assert that
/// request validation happens before the provider is ever consulted.
struct CountingProvider {
	calls: AtomicUsize,
	dimensions: usize,
}
impl CountingProvider {
	fn new(dimensions: usize) -> Arc<Self> {
		Arc::new(Self { calls: AtomicUsize::new(0), dimensions })
	}

	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl EmbeddingProvider for CountingProvider {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, aegis_providers::Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let vectors = texts.iter().map(|_| vec![0.1; self.dimensions]).collect();

		Box::pin(async move { Ok(vectors) })
	}
}

/// Always fails, standing in for a provider outage.
struct FailingProvider;
impl EmbeddingProvider for FailingProvider {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		_texts: &'a [String],
	) -> BoxFuture<'a, aegis_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(async {
			Err(aegis_providers::Error::InvalidResponse {
				message: "provider offline".to_string(),
			})
		})
	}
}

// Constructing the driver client performs no I/O, so services built this way
// are safe in tests that must fail before any backend round-trip.
async fn offline_service(provider: Arc<dyn EmbeddingProvider>) -> SearchService {
	let cfg = sample_config();
	let store = Store::connect(&cfg.storage.mongo).await.expect("URI must parse.");

	SearchService::new(cfg, store, Providers { embedding: provider })
}

/// A backend that rejects native fusion and filtered vector queries as
/// unsupported, answers unfiltered vector queries with one hit, and answers
/// lexical queries with another, while counting what it saw.
struct ScriptedBackend {
	fusion_attempts: AtomicUsize,
	filtered_vector_attempts: AtomicUsize,
}
impl ScriptedBackend {
	fn new() -> Arc<Self> {
		Arc::new(Self {
			fusion_attempts: AtomicUsize::new(0),
			filtered_vector_attempts: AtomicUsize::new(0),
		})
	}
}
impl QueryBackend for ScriptedBackend {
	fn aggregate<'a>(
		&'a self,
		pipeline: Vec<Document>,
	) -> BoxFuture<'a, Result<Vec<Document>, QueryError>> {
		Box::pin(async move {
			let first = &pipeline[0];

			if first.contains_key("$rankFusion") {
				self.fusion_attempts.fetch_add(1, Ordering::SeqCst);

				return Err(unsupported("unrecognized pipeline stage"));
			}
			if let Ok(stage) = first.get_document("$vectorSearch") {
				if stage.contains_key("filter") {
					self.filtered_vector_attempts.fetch_add(1, Ordering::SeqCst);

					return Err(unsupported("filter is not allowed on this index"));
				}

				return Ok(vec![doc! { "_id": "vec-only", "score": 0.9 }]);
			}

			Ok(vec![doc! { "_id": "lex-only", "score": 3.0 }])
		})
	}
}

fn unsupported(message: &str) -> QueryError {
	QueryError {
		failure: BackendFailure::Unsupported,
		source: mongodb::error::Error::custom(message.to_string()).into(),
	}
}

async fn scripted_service(backend: Arc<ScriptedBackend>) -> SearchService {
	let cfg = sample_config();
	let store = Store::connect(&cfg.storage.mongo).await.expect("URI must parse.");

	SearchService::with_backend(
		cfg,
		Arc::new(store),
		Providers { embedding: CountingProvider::new(1536) },
		backend,
	)
}

fn restricted_grant() -> AccessGrant {
	let mut grant = AccessGrant::new();

	grant.require("ACL1", 17);

	grant
}

#[tokio::test]
async fn vector_search_rejects_bad_candidates_before_embedding() {
	let provider = CountingProvider::new(1536);
	let service = offline_service(provider.clone()).await;
	let err = service
		.vector_search("gang war", &AccessGrant::new(), Some(10), Some(5))
		.await
		.expect_err("Validation must fail.");

	assert!(matches!(err, ServiceError::InvalidRequest { .. }));
	assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn hybrid_search_rejects_bad_candidates_before_embedding() {
	let provider = CountingProvider::new(1536);
	let service = offline_service(provider.clone()).await;
	let request = aegis_service::HybridSearchRequest {
		query: "gang war".to_string(),
		grant: AccessGrant::new(),
		top_k: Some(10),
		num_candidates: Some(5),
	};
	let err = service.hybrid_search(&request).await.expect_err("Validation must fail.");

	assert!(matches!(err, ServiceError::InvalidRequest { .. }));
	assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn empty_query_never_reaches_the_provider() {
	let provider = CountingProvider::new(1536);
	let service = offline_service(provider.clone()).await;
	let err = service
		.vector_search("   ", &AccessGrant::new(), None, None)
		.await
		.expect_err("Validation must fail.");

	assert!(matches!(err, ServiceError::InvalidRequest { .. }));
	assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn rejected_vector_filter_falls_back_unfiltered_and_is_reported() {
	let backend = ScriptedBackend::new();
	let service = scripted_service(backend.clone()).await;
	let envelope = service
		.vector_search("gang war", &restricted_grant(), None, None)
		.await
		.expect("Fallback must produce results.");

	assert_eq!(backend.filtered_vector_attempts.load(Ordering::SeqCst), 1);
	assert_eq!(envelope.items.len(), 1);
	assert_eq!(envelope.items[0].doc_id, "vec-only");
	assert_eq!(envelope.degradations, vec![Degradation::VectorFilterNotApplied]);
}

#[tokio::test]
async fn hybrid_reports_every_degradation_it_took() {
	let backend = ScriptedBackend::new();
	let service = scripted_service(backend.clone()).await;
	let request = aegis_service::HybridSearchRequest {
		query: "gang war".to_string(),
		grant: restricted_grant(),
		top_k: None,
		num_candidates: None,
	};
	let envelope = service.hybrid_search(&request).await.expect("Hybrid must degrade, not fail.");

	// Both sources contribute rank 1, so the fused scores tie and the id
	// tie-break orders the items.
	assert_eq!(envelope.items.len(), 2);
	assert_eq!(envelope.items[0].doc_id, "lex-only");
	assert_eq!(envelope.items[1].doc_id, "vec-only");
	assert!(envelope.items[0].lexical.is_some());
	assert!(envelope.items[1].vector.is_some());
	assert_eq!(
		envelope.degradations,
		vec![Degradation::NativeFusionUnavailable, Degradation::VectorFilterNotApplied],
	);
}

#[tokio::test]
async fn native_fusion_support_is_probed_once_not_per_query() {
	let backend = ScriptedBackend::new();
	let service = scripted_service(backend.clone()).await;
	let request = aegis_service::HybridSearchRequest {
		query: "gang war".to_string(),
		grant: restricted_grant(),
		top_k: None,
		num_candidates: None,
	};

	service.hybrid_search(&request).await.expect("First query must succeed.");
	service.hybrid_search(&request).await.expect("Second query must succeed.");

	assert_eq!(backend.fusion_attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn vector_search_surfaces_provider_outage_distinctly() {
	let service = offline_service(Arc::new(FailingProvider)).await;
	let err = service
		.vector_search("gang war", &AccessGrant::new(), None, None)
		.await
		.expect_err("Provider outage must surface.");

	assert!(matches!(err, ServiceError::Embedding(_)));
}

#[test]
fn envelope_serializes_with_stable_field_names() {
	let envelope = aegis_service::SearchEnvelope {
		items: vec![aegis_service::SearchItem {
			doc_id: "573a1390f29313caabcd42e8".to_string(),
			score: 0.032_258,
			lexical: Some(aegis_service::SourceScore { rank: 1, score: 9.5 }),
			vector: None,
		}],
		degradations: vec![aegis_service::Degradation::NativeFusionUnavailable],
	};
	let json = serde_json::to_value(&envelope).expect("Serialization failed.");

	assert_eq!(json["items"][0]["doc_id"], "573a1390f29313caabcd42e8");
	assert_eq!(json["items"][0]["lexical"]["rank"], 1);
	assert!(json["items"][0]["vector"].is_null());
	assert_eq!(json["degradations"][0]["kind"], "native_fusion_unavailable");
}

#[test]
fn request_deserializes_with_grant_defaulting_to_unrestricted() {
	let request: aegis_service::HybridSearchRequest =
		serde_json::from_str(r#"{ "query": "heist", "top_k": 3, "num_candidates": null }"#)
			.expect("Deserialization failed.");

	assert!(request.grant.is_empty());
	assert_eq!(request.top_k, Some(3));
}
