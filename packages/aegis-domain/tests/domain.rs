use std::collections::BTreeMap;

use rand::{Rng, SeedableRng, rngs::StdRng};

use aegis_domain::{AccessGrant, document_visible, generate_assignment};

#[test]
fn generated_corpus_respects_grant_semantics() {
	let attributes = vec!["ACL1".to_string(), "ACL2".to_string(), "ACL3".to_string()];
	let mut rng = StdRng::seed_from_u64(4_242);
	let corpus: Vec<BTreeMap<String, Vec<i32>>> =
		(0..50).map(|_| generate_assignment(&mut rng, &attributes)).collect();

	for document in &corpus {
		// A grant drawn from the document's own sets always matches.
		let mut granted = AccessGrant::new();

		for (attribute, values) in document {
			if let Some(value) = values.first() {
				granted.require(attribute.clone(), *value);
			}
		}

		assert!(document_visible(&granted, document));

		// Requiring a value outside the value domain can never match a
		// non-empty requirement.
		let mut denied = AccessGrant::new();

		denied.require("ACL1", aegis_domain::ACL_VALUE_MAX + 1);

		assert!(!document_visible(&denied, document));
	}
}

#[test]
fn random_grants_partition_the_corpus_consistently() {
	let attributes = vec!["ACL1".to_string(), "ACL2".to_string()];
	let mut rng = StdRng::seed_from_u64(77);
	let corpus: Vec<BTreeMap<String, Vec<i32>>> =
		(0..30).map(|_| generate_assignment(&mut rng, &attributes)).collect();

	for _ in 0..20 {
		let mut grant = AccessGrant::new();

		grant.require("ACL1", rng.gen_range(1..=32_767));

		let filter = grant.to_filter();

		assert_eq!(filter.clauses.len(), 1);

		for document in &corpus {
			let visible = document_visible(&grant, document);
			let contains = document
				.get("ACL1")
				.map(|values| values.binary_search(&filter.clauses[0].value).is_ok())
				.unwrap_or(false);

			assert_eq!(visible, contains);
		}
	}
}
