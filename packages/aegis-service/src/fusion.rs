use bson::{Document, doc};

use aegis_domain::{AclFilter, FusedDoc, RankedDoc, reciprocal_rank_fusion};
use aegis_storage::classify::BackendFailure;

use crate::{
	RankedHit, SearchService, ServiceResult, doc_id_string,
	lexical::lexical_pipeline,
	vector::vector_pipeline,
};

/// Builds the backend's native rank-fusion pipeline over the same filtered
/// lexical and vector sub-pipelines the executors issue standalone.
pub(crate) fn rank_fusion_pipeline(
	cfg: &aegis_config::Config,
	query: &str,
	filter: &AclFilter,
	query_vector: &[f32],
	top_k: u32,
) -> Vec<Document> {
	let source_limit = cfg.search.source_limit;
	let rendered = crate::filter::vector_search_filter(filter);
	let vector_stages = vector_pipeline(
		cfg,
		query_vector,
		rendered.as_ref(),
		source_limit,
		cfg.search.num_candidates.max(source_limit),
	);
	let mut lexical_stages = lexical_pipeline(cfg, query, filter, source_limit);

	// The fusion input pipelines carry only selection stages; scoring
	// projections stay outside.
	lexical_stages.remove(1);

	let vector_search = vector_stages[0].clone();

	vec![
		doc! {
			"$rankFusion": {
				"input": {
					"pipelines": {
						"vectorSearch": [vector_search],
						"textSearch": lexical_stages,
					},
				},
				"scoreDetails": true,
			},
		},
		doc! { "$project": { "score": { "$meta": "scoreDetails" } } },
		doc! { "$limit": top_k as i64 },
	]
}

/// Attempts the backend's native fusion. `Ok(None)` means the stage is
/// unsupported on this deployment; the caller falls back to the in-process
/// combiner and records the degradation.
pub(crate) async fn fuse_native(
	service: &SearchService,
	query: &str,
	filter: &AclFilter,
	query_vector: &[f32],
	top_k: u32,
) -> ServiceResult<Option<Vec<RankedHit>>> {
	let pipeline = rank_fusion_pipeline(&service.cfg, query, filter, query_vector, top_k);
	let documents = match service.backend.aggregate(pipeline.clone()).await {
		Ok(documents) => documents,
		Err(err) if err.failure == BackendFailure::Unsupported => {
			tracing::warn!(error = %err, "Native rank fusion is unsupported on this backend.");

			return Ok(None);
		},
		Err(err) if err.failure == BackendFailure::Transient => {
			tracing::warn!(error = %err, "Native fusion failed transiently; retrying once.");

			service.backend.aggregate(pipeline).await?
		},
		Err(err) => return Err(err.into()),
	};
	let rank_constant = service.cfg.search.rrf_rank_constant;
	let hits = documents
		.into_iter()
		.enumerate()
		.filter_map(|(index, document)| {
			let id = document.get("_id")?;
			// The fused score rides in scoreDetails.value; if a deployment
			// omits it, fall back to the reciprocal of the output rank so
			// ordering still carries a monotone score.
			let score = document
				.get_document("score")
				.ok()
				.and_then(|details| details.get("value"))
				.and_then(bson::Bson::as_f64)
				.unwrap_or_else(|| 1.0 / (rank_constant + (index + 1) as f64));

			Some(RankedHit { doc_id: doc_id_string(id), score })
		})
		.collect();

	Ok(Some(hits))
}

/// In-process reciprocal-rank fusion over the two raw ranked lists. Defined
/// for empty sources: with one empty list the output equals ranking by the
/// surviving list alone.
pub(crate) fn fuse_in_process(
	lexical: &[RankedHit],
	vector: &[RankedHit],
	rank_constant: f64,
	top_k: u32,
) -> Vec<FusedDoc> {
	let sources = [to_ranked_docs(lexical), to_ranked_docs(vector)];

	reciprocal_rank_fusion(&sources, rank_constant, top_k as usize)
}

fn to_ranked_docs(hits: &[RankedHit]) -> Vec<RankedDoc> {
	hits.iter().map(|hit| RankedDoc { id: hit.doc_id.clone(), score: hit.score }).collect()
}
