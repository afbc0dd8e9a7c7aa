use bson::{Bson, Document, doc};

use aegis_domain::AclFilter;
use aegis_storage::classify::BackendFailure;

use crate::{RankedHit, SearchService, ServiceResult, doc_id_string, filter::search_must_clauses};

/// Ceiling on the number of candidates a single lexical query may request.
/// A larger `top_k` is clamped rather than failed.
pub(crate) const MAX_LEXICAL_LIMIT: u32 = 10_000;

/// Builds the staged pipeline for a fuzzy lexical query constrained by the
/// ACL filter. The filter clauses are hard `must` constraints; the fuzzy
/// text match is a `should` scoring signal.
pub(crate) fn lexical_pipeline(
	cfg: &aegis_config::Config,
	query: &str,
	filter: &AclFilter,
	limit: u32,
) -> Vec<Document> {
	let fuzzy = &cfg.search.fuzzy;
	let text = doc! {
		"query": query,
		"path": cfg.indexes.search.text_field.clone(),
		"fuzzy": {
			"maxEdits": fuzzy.max_edits as i32,
			"prefixLength": fuzzy.prefix_length as i32,
			"maxExpansions": fuzzy.max_expansions as i32,
		},
	};
	let must = search_must_clauses(filter);
	let search = if must.is_empty() {
		doc! {
			"$search": {
				"index": cfg.indexes.search.name.clone(),
				"text": text,
			},
		}
	} else {
		doc! {
			"$search": {
				"index": cfg.indexes.search.name.clone(),
				"compound": {
					"must": must,
					"should": [{ "text": text }],
				},
			},
		}
	};

	vec![
		search,
		doc! { "$project": { "score": { "$meta": "searchScore" } } },
		doc! { "$limit": limit.min(MAX_LEXICAL_LIMIT) as i64 },
	]
}

/// Runs the lexical sub-query: fuzzy relevance over the declared text field,
/// hard-constrained to documents passing the filter, truncated to `top_k`.
/// A transient failure is retried once; the filter is never dropped on retry.
pub async fn search_lexical(
	service: &SearchService,
	query: &str,
	filter: &AclFilter,
	top_k: u32,
) -> ServiceResult<Vec<RankedHit>> {
	let pipeline = lexical_pipeline(&service.cfg, query, filter, top_k);
	let documents = match service.backend.aggregate(pipeline.clone()).await {
		Ok(documents) => documents,
		Err(err) if err.failure == BackendFailure::Transient => {
			tracing::warn!(error = %err, "Lexical query failed transiently; retrying once.");

			service.backend.aggregate(pipeline).await?
		},
		Err(err) => return Err(err.into()),
	};

	Ok(parse_hits(documents))
}

pub(crate) fn parse_hits(documents: Vec<Document>) -> Vec<RankedHit> {
	documents
		.into_iter()
		.filter_map(|document| {
			let id = document.get("_id")?;
			let score = document.get("score").and_then(Bson::as_f64).unwrap_or(0.0);

			Some(RankedHit { doc_id: doc_id_string(id), score })
		})
		.collect()
}
