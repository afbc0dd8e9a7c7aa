use std::{cmp::Ordering, collections::HashMap};

use serde::{Deserialize, Serialize};

/// Rank constant of the reciprocal-rank formula. Matches the backend's
/// native rank-fusion default so the in-process fallback scores identically.
pub const DEFAULT_RRF_RANK_CONSTANT: f64 = 60.0;

/// One entry of a source's ranked list, ordered descending by the source's
/// native score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDoc {
	pub id: String,
	pub score: f64,
}

/// One entry of the fused list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedDoc {
	pub id: String,
	pub score: f64,
	/// Best (lowest) 1-based rank this document held in any source.
	pub best_rank: usize,
}

/// Merges ranked lists by reciprocal-rank fusion: each source contributes
/// `1 / (rank_constant + rank)` for a document it ranks (1-based), zero
/// otherwise; a document's fused score is the sum of its contributions.
///
/// Ordering is fully deterministic: fused score descending, then best rank
/// in any source ascending, then document id ascending. Commutative in its
/// sources; with a single non-empty source the output order equals that
/// source's order.
pub fn reciprocal_rank_fusion(
	sources: &[Vec<RankedDoc>],
	rank_constant: f64,
	top_k: usize,
) -> Vec<FusedDoc> {
	let mut fused: HashMap<&str, FusedDoc> = HashMap::new();

	for source in sources {
		for (index, doc) in source.iter().enumerate() {
			let rank = index + 1;
			let contribution = 1.0 / (rank_constant + rank as f64);

			match fused.get_mut(doc.id.as_str()) {
				Some(entry) => {
					entry.score += contribution;
					entry.best_rank = entry.best_rank.min(rank);
				},
				None => {
					fused.insert(
						doc.id.as_str(),
						FusedDoc { id: doc.id.clone(), score: contribution, best_rank: rank },
					);
				},
			}
		}
	}

	let mut out: Vec<FusedDoc> = fused.into_values().collect();

	out.sort_by(|left, right| {
		cmp_f64_desc(left.score, right.score)
			.then_with(|| left.best_rank.cmp(&right.best_rank))
			.then_with(|| left.id.cmp(&right.id))
	});
	out.truncate(top_k);

	out
}

fn cmp_f64_desc(a: f64, b: f64) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
