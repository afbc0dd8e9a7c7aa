use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use aegis_domain::AccessGrant;

use crate::{
	RankedHit, SearchService, ServiceError, ServiceResult,
	fusion::{fuse_in_process, fuse_native},
	lexical::search_lexical,
	vector::{search_vector, search_vector_embedded, validate_candidates},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridSearchRequest {
	pub query: String,
	#[serde(default)]
	pub grant: AccessGrant,
	pub top_k: Option<u32>,
	pub num_candidates: Option<u32>,
}

/// Per-source placement of a fused result: 1-based rank in that source's
/// list plus the source's native score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceScore {
	pub rank: u32,
	pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchItem {
	pub doc_id: String,
	pub score: f64,
	pub lexical: Option<SourceScore>,
	pub vector: Option<SourceScore>,
}

/// Every degraded path a query took. An empty list means the fully filtered
/// hybrid query ran as requested; anything else is visible to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
	/// The vector backend rejected the filtered form; results were produced
	/// without the ACL filter applied on the vector side.
	VectorFilterNotApplied,
	/// The backend has no native fusion stage; ranking was computed
	/// in-process from the two raw lists.
	NativeFusionUnavailable,
	/// The lexical sub-query definitively failed; results come from the
	/// vector source alone.
	LexicalUnavailable { reason: String },
	/// The vector sub-query definitively failed (including embedding
	/// provider outage); results come from the lexical source alone.
	VectorUnavailable { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEnvelope {
	pub items: Vec<SearchItem>,
	pub degradations: Vec<Degradation>,
}

impl SearchService {
	/// Lexical-only query: fuzzy relevance constrained by the grant.
	pub async fn lexical_search(
		&self,
		query: &str,
		grant: &AccessGrant,
		top_k: Option<u32>,
	) -> ServiceResult<SearchEnvelope> {
		let query = validated_query(query)?;
		let top_k = top_k.unwrap_or(self.cfg.search.top_k);
		let hits = search_lexical(self, query, &grant.to_filter(), top_k).await?;
		let items = hits
			.iter()
			.enumerate()
			.map(|(index, hit)| SearchItem {
				doc_id: hit.doc_id.clone(),
				score: hit.score,
				lexical: Some(SourceScore { rank: index as u32 + 1, score: hit.score }),
				vector: None,
			})
			.collect();

		Ok(SearchEnvelope { items, degradations: Vec::new() })
	}

	/// Vector-only query: embeds the text, then ANN search constrained by
	/// the grant.
	pub async fn vector_search(
		&self,
		query: &str,
		grant: &AccessGrant,
		top_k: Option<u32>,
		num_candidates: Option<u32>,
	) -> ServiceResult<SearchEnvelope> {
		let query = validated_query(query)?;
		let top_k = top_k.unwrap_or(self.cfg.search.top_k);
		let num_candidates = num_candidates.unwrap_or(self.cfg.search.num_candidates);
		let outcome =
			search_vector(self, query, &grant.to_filter(), top_k, num_candidates).await?;
		let items = outcome
			.hits
			.iter()
			.enumerate()
			.map(|(index, hit)| SearchItem {
				doc_id: hit.doc_id.clone(),
				score: hit.score,
				lexical: None,
				vector: Some(SourceScore { rank: index as u32 + 1, score: hit.score }),
			})
			.collect();
		let degradations = if outcome.filter_applied {
			Vec::new()
		} else {
			vec![Degradation::VectorFilterNotApplied]
		};

		Ok(SearchEnvelope { items, degradations })
	}

	/// Hybrid query: both sub-queries under one ACL filter, merged by rank
	/// fusion. The lexical and vector sub-queries run concurrently; fusion
	/// waits for both to complete or definitively fail. A total failure of
	/// both sources is an error, never an empty result set.
	pub async fn hybrid_search(
		&self,
		request: &HybridSearchRequest,
	) -> ServiceResult<SearchEnvelope> {
		let query = validated_query(&request.query)?;
		let top_k = request.top_k.unwrap_or(self.cfg.search.top_k);
		let num_candidates = request.num_candidates.unwrap_or(self.cfg.search.num_candidates);

		validate_candidates(top_k, num_candidates)?;

		let filter = request.grant.to_filter();
		let mut degradations = Vec::new();

		// The embedding round-trip happens exactly once, before the
		// sub-queries fan out. Provider outage disables the vector source
		// but neither the lexical source nor fusion over it.
		let query_vector = match self.embed_query(query).await {
			Ok(vector) => Some(vector),
			Err(err) => {
				tracing::warn!(error = %err, "Embedding failed; vector source disabled.");
				degradations.push(Degradation::VectorUnavailable { reason: err.to_string() });

				None
			},
		};

		if let Some(query_vector) = query_vector.as_deref()
			&& self.native_fusion_enabled() != Some(false)
		{
			match fuse_native(self, query, &filter, query_vector, top_k).await? {
				Some(hits) => {
					self.set_native_fusion(true);

					let items = hits
						.into_iter()
						.map(|hit| SearchItem {
							doc_id: hit.doc_id,
							score: hit.score,
							lexical: None,
							vector: None,
						})
						.collect();

					return Ok(SearchEnvelope { items, degradations });
				},
				None => {
					self.set_native_fusion(false);
					degradations.push(Degradation::NativeFusionUnavailable);
				},
			}
		}

		let source_limit = self.cfg.search.source_limit.max(top_k);
		let lexical_fut = search_lexical(self, query, &filter, source_limit);
		let vector_fut = async {
			match query_vector.as_deref() {
				Some(vector) => search_vector_embedded(
					self,
					vector,
					&filter,
					source_limit,
					num_candidates.max(source_limit),
				)
				.await
				.map(Some),
				None => Ok(None),
			}
		};
		let (lexical_result, vector_result) = tokio::join!(lexical_fut, vector_fut);
		let lexical_hits = match lexical_result {
			Ok(hits) => Some(hits),
			Err(err) => {
				tracing::warn!(error = %err, "Lexical sub-query failed.");
				degradations.push(Degradation::LexicalUnavailable { reason: err.to_string() });

				None
			},
		};
		let vector_hits = match vector_result {
			Ok(Some(outcome)) => {
				if !outcome.filter_applied {
					degradations.push(Degradation::VectorFilterNotApplied);
				}

				Some(outcome.hits)
			},
			Ok(None) => None,
			Err(err) => {
				tracing::warn!(error = %err, "Vector sub-query failed.");
				degradations.push(Degradation::VectorUnavailable { reason: err.to_string() });

				None
			},
		};

		if lexical_hits.is_none() && vector_hits.is_none() {
			return Err(all_sources_failed(&degradations));
		}

		let lexical_hits = lexical_hits.unwrap_or_default();
		let vector_hits = vector_hits.unwrap_or_default();
		let fused = fuse_in_process(
			&lexical_hits,
			&vector_hits,
			self.cfg.search.rrf_rank_constant,
			top_k,
		);
		let lexical_ranks = source_ranks(&lexical_hits);
		let vector_ranks = source_ranks(&vector_hits);
		let items = fused
			.into_iter()
			.map(|doc| SearchItem {
				lexical: lexical_ranks.get(doc.id.as_str()).copied(),
				vector: vector_ranks.get(doc.id.as_str()).copied(),
				doc_id: doc.id,
				score: doc.score,
			})
			.collect();

		Ok(SearchEnvelope { items, degradations })
	}
}

fn validated_query(query: &str) -> ServiceResult<&str> {
	let trimmed = query.trim();

	if trimmed.is_empty() {
		return Err(ServiceError::InvalidRequest {
			message: "Query text must be non-empty.".to_string(),
		});
	}

	Ok(trimmed)
}

fn source_ranks(hits: &[RankedHit]) -> HashMap<&str, SourceScore> {
	hits.iter()
		.enumerate()
		.map(|(index, hit)| {
			(hit.doc_id.as_str(), SourceScore { rank: index as u32 + 1, score: hit.score })
		})
		.collect()
}

fn all_sources_failed(degradations: &[Degradation]) -> ServiceError {
	let mut lexical = "not attempted".to_string();
	let mut vector = "not attempted".to_string();

	for degradation in degradations {
		match degradation {
			Degradation::LexicalUnavailable { reason } => lexical = reason.clone(),
			Degradation::VectorUnavailable { reason } => vector = reason.clone(),
			_ => {},
		}
	}

	ServiceError::AllSourcesFailed { lexical, vector }
}
