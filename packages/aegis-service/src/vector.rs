use bson::{Bson, Document, doc};

use aegis_domain::AclFilter;
use aegis_storage::classify::BackendFailure;

use crate::{
	QueryError, RankedHit, SearchService, ServiceError, ServiceResult,
	filter::vector_search_filter,
	lexical::parse_hits,
};

/// Result of the vector sub-query. `filter_applied` is false only when the
/// backend rejected the filtered form and the query was re-issued
/// unfiltered; callers must surface that.
#[derive(Debug, Clone)]
pub struct VectorSearchOutcome {
	pub hits: Vec<RankedHit>,
	pub filter_applied: bool,
}

/// `num_candidates < top_k` is a caller error (config defect), checked
/// before any network round-trip is issued.
pub(crate) fn validate_candidates(top_k: u32, num_candidates: u32) -> ServiceResult<()> {
	if num_candidates < top_k {
		return Err(ServiceError::InvalidRequest {
			message: format!(
				"num_candidates ({num_candidates}) must be at least top_k ({top_k})."
			),
		});
	}

	Ok(())
}

pub(crate) fn vector_pipeline(
	cfg: &aegis_config::Config,
	query_vector: &[f32],
	filter: Option<&Document>,
	top_k: u32,
	num_candidates: u32,
) -> Vec<Document> {
	let vector: Vec<Bson> = query_vector.iter().map(|value| Bson::Double(*value as f64)).collect();
	let mut stage = doc! {
		"index": cfg.indexes.vector.name.clone(),
		"path": cfg.indexes.vector.embedding_field.clone(),
		"queryVector": vector,
		"numCandidates": num_candidates as i32,
		"limit": top_k as i32,
	};

	if let Some(filter) = filter {
		stage.insert("filter", filter.clone());
	}

	vec![
		doc! { "$vectorSearch": stage },
		doc! { "$project": { "score": { "$meta": "vectorSearchScore" } } },
	]
}

/// Runs the vector sub-query: embeds the query text, then issues an
/// approximate-nearest-neighbor query constrained by the ACL filter. If the
/// backend rejects the filtered form as unsupported, the query is re-issued
/// unfiltered and the outcome is marked accordingly.
pub async fn search_vector(
	service: &SearchService,
	query: &str,
	filter: &AclFilter,
	top_k: u32,
	num_candidates: u32,
) -> ServiceResult<VectorSearchOutcome> {
	validate_candidates(top_k, num_candidates)?;

	let query_vector = service.embed_query(query).await?;

	search_vector_embedded(service, &query_vector, filter, top_k, num_candidates).await
}

/// Same as [`search_vector`] but with an already-obtained query embedding,
/// so the hybrid path embeds exactly once.
pub(crate) async fn search_vector_embedded(
	service: &SearchService,
	query_vector: &[f32],
	filter: &AclFilter,
	top_k: u32,
	num_candidates: u32,
) -> ServiceResult<VectorSearchOutcome> {
	validate_candidates(top_k, num_candidates)?;

	let rendered = vector_search_filter(filter);
	let filtered =
		vector_pipeline(&service.cfg, query_vector, rendered.as_ref(), top_k, num_candidates);

	match aggregate_with_transient_retry(service, filtered).await {
		Ok(documents) => Ok(VectorSearchOutcome { hits: parse_hits(documents), filter_applied: true }),
		Err(err) if rendered.is_some() && err.failure == BackendFailure::Unsupported => {
			tracing::warn!(
				error = %err,
				"Vector index rejected the filtered query; re-issuing unfiltered."
			);

			let unfiltered =
				vector_pipeline(&service.cfg, query_vector, None, top_k, num_candidates);
			let documents = aggregate_with_transient_retry(service, unfiltered).await?;

			Ok(VectorSearchOutcome { hits: parse_hits(documents), filter_applied: false })
		},
		Err(err) => Err(err.into()),
	}
}

async fn aggregate_with_transient_retry(
	service: &SearchService,
	pipeline: Vec<Document>,
) -> Result<Vec<Document>, QueryError> {
	match service.backend.aggregate(pipeline.clone()).await {
		Ok(documents) => Ok(documents),
		Err(err) if err.failure == BackendFailure::Transient => {
			tracing::warn!(error = %err, "Vector query failed transiently; retrying once.");

			service.backend.aggregate(pipeline).await
		},
		Err(err) => Err(err),
	}
}
