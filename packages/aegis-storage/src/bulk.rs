use std::collections::BTreeMap;

use bson::{Bson, Document, doc};
use mongodb::{
	Cursor,
	options::{UpdateOneModel, WriteModel},
};

use crate::{Result, store::Store};

/// One batch-update unit: replace the document's ACL attribute sets with
/// `sets` (sorted unique integer sequences), matched by identifier.
#[derive(Debug, Clone)]
pub struct AclUpdate {
	pub id: Bson,
	pub sets: BTreeMap<String, Vec<i32>>,
}

/// Writes one batch of ACL assignments as an unordered bulk update and
/// returns the number of documents modified. The batch either commits on the
/// backend or fails as a unit from the caller's perspective; callers isolate
/// failures per batch and never roll back earlier batches.
pub async fn assign_acl_batch(store: &Store, updates: &[AclUpdate]) -> Result<u64> {
	if updates.is_empty() {
		return Ok(0);
	}

	let namespace = store.namespace();
	let models: Vec<WriteModel> = updates
		.iter()
		.map(|update| {
			let mut set = Document::new();

			for (attribute, values) in &update.sets {
				set.insert(attribute, values.clone());
			}

			WriteModel::UpdateOne(
				UpdateOneModel::builder()
					.namespace(namespace.clone())
					.filter(doc! { "_id": update.id.clone() })
					.update(doc! { "$set": set })
					.build(),
			)
		})
		.collect();
	let result = store.client.bulk_write(models).ordered(false).await?;

	Ok(result.modified_count as u64)
}

/// Streams the identifiers of every document in the corpus, projecting away
/// everything else to keep the provisioning job's memory bounded.
pub async fn id_cursor(store: &Store) -> Result<Cursor<Document>> {
	Ok(store.documents().find(doc! {}).projection(doc! { "_id": 1 }).await?)
}
