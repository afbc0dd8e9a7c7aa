use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub indexes: Indexes,
	pub search: Search,
	pub provision: Provision,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub mongo: Mongo,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Mongo {
	pub uri: String,
	pub database: String,
	pub collection: String,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Indexes {
	/// ACL attribute fields, declared filterable on both indexes.
	#[serde(default = "default_acl_fields")]
	pub acl_fields: Vec<String>,
	pub search: SearchIndex,
	pub vector: VectorIndex,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchIndex {
	pub name: String,
	pub text_field: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorIndex {
	pub name: String,
	pub embedding_field: String,
	pub dimensions: u32,
	pub similarity: String,
}

#[derive(Debug, Deserialize)]
pub struct Search {
	#[serde(default = "default_top_k")]
	pub top_k: u32,
	#[serde(default = "default_num_candidates")]
	pub num_candidates: u32,
	/// Depth of each source list fed into rank fusion.
	#[serde(default = "default_source_limit")]
	pub source_limit: u32,
	#[serde(default = "default_rrf_rank_constant")]
	pub rrf_rank_constant: f64,
	/// One of auto, always, or never.
	#[serde(default = "default_native_rank_fusion")]
	pub native_rank_fusion: String,
	#[serde(default)]
	pub fuzzy: Fuzzy,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Fuzzy {
	pub max_edits: u32,
	pub prefix_length: u32,
	pub max_expansions: u32,
}
impl Default for Fuzzy {
	fn default() -> Self {
		Self { max_edits: 2, prefix_length: 3, max_expansions: 50 }
	}
}

#[derive(Debug, Deserialize)]
pub struct Provision {
	#[serde(default = "default_batch_size")]
	pub batch_size: u32,
}

fn default_acl_fields() -> Vec<String> {
	vec!["ACL1".to_string(), "ACL2".to_string(), "ACL3".to_string()]
}

fn default_top_k() -> u32 {
	5
}

fn default_num_candidates() -> u32 {
	100
}

fn default_source_limit() -> u32 {
	20
}

fn default_rrf_rank_constant() -> f64 {
	60.0
}

fn default_native_rank_fusion() -> String {
	"auto".to_string()
}

fn default_batch_size() -> u32 {
	1_000
}
