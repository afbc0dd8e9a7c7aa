pub mod acl;
pub mod fusion;
pub mod grant;

pub use acl::{ACL_MAX_LEN, ACL_VALUE_MAX, ACL_VALUE_MIN, generate_assignment, generate_attribute_set};
pub use fusion::{DEFAULT_RRF_RANK_CONSTANT, FusedDoc, RankedDoc, reciprocal_rank_fusion};
pub use grant::{AccessGrant, AclFilter, MembershipClause, document_visible};
