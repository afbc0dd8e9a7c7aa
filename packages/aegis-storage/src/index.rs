use std::time::{Duration, Instant};

use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::{SearchIndexModel, SearchIndexType};
use tokio::time as tokio_time;

use crate::{
	Result,
	classify::{BackendFailure, classify},
	store::Store,
};

/// Named, typed declaration of an index shape, in the backend's persisted
/// definition format.
#[derive(Debug, Clone)]
pub struct IndexDescriptor {
	pub name: String,
	pub index_type: SearchIndexType,
	pub definition: Document,
}

/// Outcome of an idempotent create. `Created` only means the build was
/// submitted; completion is observed separately via [`await_queryable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureIndexOutcome {
	Created,
	AlreadyExists,
}

#[derive(Debug, Clone)]
pub struct IndexStatus {
	pub name: String,
	pub index_type: String,
	pub status: String,
	pub queryable: bool,
}

/// Lexical index: the text field is searchable through the dynamic mapping;
/// the ACL attributes are mapped as numbers so membership predicates can
/// constrain the candidate set.
pub fn search_descriptor(indexes: &aegis_config::Indexes) -> IndexDescriptor {
	let mut fields = Document::new();

	for acl_field in &indexes.acl_fields {
		fields.insert(acl_field, doc! { "type": "number" });
	}

	IndexDescriptor {
		name: indexes.search.name.clone(),
		index_type: SearchIndexType::Search,
		definition: doc! {
			"mappings": {
				"dynamic": true,
				"fields": fields,
			},
		},
	}
}

/// Vector index: one vector field with declared dimensionality and
/// similarity, plus one filter-only entry per ACL attribute.
pub fn vector_descriptor(indexes: &aegis_config::Indexes) -> IndexDescriptor {
	let mut fields = vec![doc! {
		"type": "vector",
		"path": indexes.vector.embedding_field.clone(),
		"numDimensions": indexes.vector.dimensions as i32,
		"similarity": indexes.vector.similarity.clone(),
	}];

	for acl_field in &indexes.acl_fields {
		fields.push(doc! { "type": "filter", "path": acl_field });
	}

	IndexDescriptor {
		name: indexes.vector.name.clone(),
		index_type: SearchIndexType::VectorSearch,
		definition: doc! { "fields": fields },
	}
}

/// Idempotent create: success when an index with the same name and kind is
/// already declared, otherwise submits the create request and returns
/// without waiting for the asynchronous build. A hard failure is surfaced
/// as-is and not retried; the caller decides whether to proceed with
/// whatever indexes exist.
pub async fn ensure_index(store: &Store, descriptor: &IndexDescriptor) -> Result<EnsureIndexOutcome> {
	let existing = index_statuses(store).await?;
	let kind = index_type_label(&descriptor.index_type);

	if existing.iter().any(|status| status.name == descriptor.name && status.index_type == kind) {
		return Ok(EnsureIndexOutcome::AlreadyExists);
	}

	let model = SearchIndexModel::builder()
		.definition(descriptor.definition.clone())
		.name(descriptor.name.clone())
		.index_type(descriptor.index_type.clone())
		.build();

	match store.documents().create_search_index(model).await {
		Ok(name) => {
			tracing::info!(index = %name, "Submitted search index creation.");

			Ok(EnsureIndexOutcome::Created)
		},
		Err(err) if classify(&err) == BackendFailure::AlreadyExists =>
			Ok(EnsureIndexOutcome::AlreadyExists),
		Err(err) => Err(err.into()),
	}
}

pub async fn index_statuses(store: &Store) -> Result<Vec<IndexStatus>> {
	let mut cursor = store.documents().list_search_indexes().await?;
	let mut out = Vec::new();

	while let Some(document) = cursor.try_next().await? {
		out.push(IndexStatus {
			name: document.get_str("name").unwrap_or_default().to_string(),
			// Older servers omit the type on lexical indexes.
			index_type: document.get_str("type").unwrap_or("search").to_string(),
			status: document.get_str("status").unwrap_or("UNKNOWN").to_string(),
			queryable: document.get_bool("queryable").unwrap_or(false),
		});
	}

	Ok(out)
}

/// Polls index status until every named index is queryable or `timeout`
/// elapses. Returns the names still not ready; empty means all are
/// serving. This is the only readiness wait in the system, and it is
/// explicit and caller-bounded.
pub async fn await_queryable(
	store: &Store,
	names: &[String],
	timeout: Duration,
	poll_interval: Duration,
) -> Result<Vec<String>> {
	let started = Instant::now();

	loop {
		let statuses = index_statuses(store).await?;
		let not_ready: Vec<String> = names
			.iter()
			.filter(|name| {
				!statuses.iter().any(|status| status.name == **name && status.queryable)
			})
			.cloned()
			.collect();

		if not_ready.is_empty() {
			return Ok(Vec::new());
		}

		for status in &statuses {
			if names.contains(&status.name) && !status.queryable {
				tracing::info!(
					index = %status.name,
					status = %status.status,
					"Index is not queryable yet."
				);
			}
		}

		if started.elapsed() >= timeout {
			return Ok(not_ready);
		}

		tokio_time::sleep(poll_interval.min(timeout.saturating_sub(started.elapsed()))).await;
	}
}

fn index_type_label(index_type: &SearchIndexType) -> &'static str {
	match index_type {
		SearchIndexType::VectorSearch => "vectorSearch",
		_ => "search",
	}
}
