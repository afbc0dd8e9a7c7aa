use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// The attribute values a requester is authorized under, keyed by attribute
/// name. An empty grant places no restriction on the search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant(BTreeMap<String, BTreeSet<i32>>);
impl AccessGrant {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn require(&mut self, attribute: impl Into<String>, value: i32) -> &mut Self {
		self.0.entry(attribute.into()).or_default().insert(value);

		self
	}

	pub fn require_all(
		&mut self,
		attribute: impl Into<String>,
		values: impl IntoIterator<Item = i32>,
	) -> &mut Self {
		self.0.entry(attribute.into()).or_default().extend(values);

		self
	}

	pub fn is_empty(&self) -> bool {
		self.0.values().all(BTreeSet::is_empty)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<i32>)> {
		self.0.iter().map(|(attribute, values)| (attribute.as_str(), values))
	}

	/// One membership predicate per required value, ANDed across and within
	/// attributes. Clause order is deterministic: attribute ascending, then
	/// value ascending.
	pub fn to_filter(&self) -> AclFilter {
		let clauses = self
			.iter()
			.flat_map(|(attribute, values)| {
				values.iter().map(move |value| MembershipClause {
					attribute: attribute.to_string(),
					value: *value,
				})
			})
			.collect();

		AclFilter { clauses }
	}
}

/// One required membership: the document's `attribute` set must contain
/// `value`. Membership, not equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipClause {
	pub attribute: String,
	pub value: i32,
}

/// Backend-neutral ACL filter expression. Each executor translates the same
/// clause list into its own predicate syntax.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclFilter {
	pub clauses: Vec<MembershipClause>,
}
impl AclFilter {
	/// A no-op filter: search is unrestricted. Never "deny all".
	pub fn is_empty(&self) -> bool {
		self.clauses.is_empty()
	}
}

/// Reference visibility semantics: every required value, for every attribute
/// the grant names, must be a member of the document's corresponding set.
pub fn document_visible(grant: &AccessGrant, document_sets: &BTreeMap<String, Vec<i32>>) -> bool {
	grant.iter().all(|(attribute, required)| {
		let Some(values) = document_sets.get(attribute) else {
			return required.is_empty();
		};

		required.iter().all(|value| values.binary_search(value).is_ok())
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn doc(sets: &[(&str, &[i32])]) -> BTreeMap<String, Vec<i32>> {
		sets.iter().map(|(name, values)| (name.to_string(), values.to_vec())).collect()
	}

	#[test]
	fn empty_grant_builds_empty_filter_and_matches_everything() {
		let grant = AccessGrant::new();

		assert!(grant.to_filter().is_empty());
		assert!(document_visible(&grant, &doc(&[("ACL1", &[1, 2, 3])])));
		assert!(document_visible(&grant, &doc(&[])));
	}

	#[test]
	fn filter_emits_one_clause_per_required_value_in_order() {
		let mut grant = AccessGrant::new();

		grant.require_all("ACL2", [83, 358]);
		grant.require_all("ACL1", [556, 17]);

		let filter = grant.to_filter();

		assert_eq!(
			filter.clauses,
			vec![
				MembershipClause { attribute: "ACL1".to_string(), value: 17 },
				MembershipClause { attribute: "ACL1".to_string(), value: 556 },
				MembershipClause { attribute: "ACL2".to_string(), value: 83 },
				MembershipClause { attribute: "ACL2".to_string(), value: 358 },
			],
		);
	}

	#[test]
	fn membership_is_and_of_required_values_within_an_attribute() {
		let mut grant = AccessGrant::new();

		grant.require_all("A", [1, 2]);

		assert!(document_visible(&grant, &doc(&[("A", &[1, 2, 9])])));
		assert!(!document_visible(&grant, &doc(&[("A", &[1])])));
		assert!(!document_visible(&grant, &doc(&[("A", &[3, 4])])));
	}

	#[test]
	fn visibility_matches_reference_scenario() {
		// Document D: ACL1 = {17, 556, 999}, ACL2 = {83}.
		let d = doc(&[("ACL1", &[17, 556, 999]), ("ACL2", &[83])]);

		let mut included = AccessGrant::new();

		included.require_all("ACL1", [17, 556]);
		included.require("ACL2", 83);

		assert!(document_visible(&included, &d));

		let mut excluded = AccessGrant::new();

		excluded.require("ACL2", 358);

		assert!(!document_visible(&excluded, &d));
	}

	#[test]
	fn empty_attribute_set_matches_nothing_required() {
		let mut grant = AccessGrant::new();

		grant.require("A", 1);

		// Empty set means "visible under no values", not "visible under all".
		assert!(!document_visible(&grant, &doc(&[("A", &[])])));
		assert!(!document_visible(&grant, &doc(&[])));
	}
}
