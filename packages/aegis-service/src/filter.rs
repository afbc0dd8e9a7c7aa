use bson::{Document, doc};

use aegis_domain::AclFilter;

/// Renders the ACL filter for `$vectorSearch`: an `$and` of one `$in`
/// predicate per membership clause. An empty filter renders to `None`,
/// never "deny all".
pub fn vector_search_filter(filter: &AclFilter) -> Option<Document> {
	if filter.is_empty() {
		return None;
	}

	let clauses: Vec<Document> = filter
		.clauses
		.iter()
		.map(|clause| doc! { clause.attribute.clone(): { "$in": [clause.value] } })
		.collect();

	Some(doc! { "$and": clauses })
}

/// One compound `must` clause per membership, each an `in` operator on the
/// attribute path.
pub fn search_must_clauses(filter: &AclFilter) -> Vec<Document> {
	filter
		.clauses
		.iter()
		.map(|clause| {
			doc! {
				"in": {
					"value": clause.value,
					"path": clause.attribute.clone(),
				},
			}
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use aegis_domain::AccessGrant;

	use super::*;

	#[test]
	fn empty_filter_constrains_nothing_on_either_backend() {
		let filter = AccessGrant::new().to_filter();

		assert_eq!(vector_search_filter(&filter), None);
		assert!(search_must_clauses(&filter).is_empty());
	}

	#[test]
	fn both_renderings_share_the_same_clause_structure() {
		let mut grant = AccessGrant::new();

		grant.require_all("ACL1", [17, 556]);
		grant.require_all("ACL2", [83, 358]);

		let filter = grant.to_filter();

		assert_eq!(
			vector_search_filter(&filter),
			Some(doc! {
				"$and": [
					{ "ACL1": { "$in": [17] } },
					{ "ACL1": { "$in": [556] } },
					{ "ACL2": { "$in": [83] } },
					{ "ACL2": { "$in": [358] } },
				],
			}),
		);
		assert_eq!(
			search_must_clauses(&filter),
			vec![
				doc! { "in": { "value": 17, "path": "ACL1" } },
				doc! { "in": { "value": 556, "path": "ACL1" } },
				doc! { "in": { "value": 83, "path": "ACL2" } },
				doc! { "in": { "value": 358, "path": "ACL2" } },
			],
		);
	}
}
