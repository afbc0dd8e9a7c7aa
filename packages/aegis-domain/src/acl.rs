use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

/// Smallest value an ACL attribute may contain.
pub const ACL_VALUE_MIN: i32 = 1;
/// Largest value an ACL attribute may contain.
pub const ACL_VALUE_MAX: i32 = 32_767;
/// Largest number of values a single attribute set may hold.
pub const ACL_MAX_LEN: usize = 500;

/// Generates one per-document attribute set: a strictly ascending sequence of
/// unique values, with a length sampled uniformly from `0..=ACL_MAX_LEN`.
///
/// An empty set means the document is visible under no value of this
/// attribute; callers must not treat it as unrestricted.
pub fn generate_attribute_set<R: Rng + ?Sized>(rng: &mut R) -> Vec<i32> {
	let target_len = rng.gen_range(0..=ACL_MAX_LEN);
	let mut values = BTreeSet::new();

	while values.len() < target_len {
		values.insert(rng.gen_range(ACL_VALUE_MIN..=ACL_VALUE_MAX));
	}

	values.into_iter().collect()
}

/// Generates one attribute set per named attribute, each sampled
/// independently so attributes on the same document stay uncorrelated.
pub fn generate_assignment<R: Rng + ?Sized>(
	rng: &mut R,
	attributes: &[String],
) -> BTreeMap<String, Vec<i32>> {
	attributes
		.iter()
		.map(|attribute| (attribute.clone(), generate_attribute_set(rng)))
		.collect()
}
