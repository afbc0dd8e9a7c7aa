use std::time::Duration;

use aegis_storage::index::{
	self, EnsureIndexOutcome, IndexStatus, search_descriptor, vector_descriptor,
};

use crate::{SearchService, ServiceResult};

/// Per-index outcome of an idempotent ensure pass. `Created` means the build
/// was submitted, not that the index is queryable.
#[derive(Debug, Clone)]
pub struct IndexReport {
	pub search: (String, EnsureIndexOutcome),
	pub vector: (String, EnsureIndexOutcome),
}

impl SearchService {
	/// Declares both indexes the query paths depend on. Existing indexes of
	/// the same name and kind are left untouched.
	pub async fn ensure_indexes(&self) -> ServiceResult<IndexReport> {
		let search = search_descriptor(&self.cfg.indexes);
		let vector = vector_descriptor(&self.cfg.indexes);
		let search_outcome = index::ensure_index(&self.store, &search).await?;

		tracing::info!(index = %search.name, outcome = ?search_outcome, "Ensured lexical index.");

		let vector_outcome = index::ensure_index(&self.store, &vector).await?;

		tracing::info!(index = %vector.name, outcome = ?vector_outcome, "Ensured vector index.");

		Ok(IndexReport {
			search: (search.name, search_outcome),
			vector: (vector.name, vector_outcome),
		})
	}

	pub async fn index_statuses(&self) -> ServiceResult<Vec<IndexStatus>> {
		Ok(index::index_statuses(&self.store).await?)
	}

	/// Waits until both declared indexes are queryable or `timeout` elapses.
	/// Returns the names still not serving; empty means ready.
	pub async fn await_queryable(&self, timeout: Duration) -> ServiceResult<Vec<String>> {
		let names =
			vec![self.cfg.indexes.search.name.clone(), self.cfg.indexes.vector.name.clone()];

		Ok(index::await_queryable(&self.store, &names, timeout, Duration::from_secs(5)).await?)
	}
}
