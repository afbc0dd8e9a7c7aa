mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Fuzzy, Indexes, Mongo, Providers, Provision, Search,
	SearchIndex, Service, Storage, VectorIndex,
};

use std::{collections::HashSet, fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("storage.mongo.uri", &cfg.storage.mongo.uri),
		("storage.mongo.database", &cfg.storage.mongo.database),
		("storage.mongo.collection", &cfg.storage.mongo.collection),
		("indexes.search.name", &cfg.indexes.search.name),
		("indexes.search.text_field", &cfg.indexes.search.text_field),
		("indexes.vector.name", &cfg.indexes.vector.name),
		("indexes.vector.embedding_field", &cfg.indexes.vector.embedding_field),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.embedding.api_key must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.indexes.vector.dimensions {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match indexes.vector.dimensions."
				.to_string(),
		});
	}
	if !matches!(cfg.indexes.vector.similarity.as_str(), "cosine" | "euclidean" | "dotProduct") {
		return Err(Error::Validation {
			message: "indexes.vector.similarity must be one of cosine, euclidean, or dotProduct."
				.to_string(),
		});
	}

	if cfg.indexes.acl_fields.is_empty() {
		return Err(Error::Validation {
			message: "indexes.acl_fields must be non-empty.".to_string(),
		});
	}

	let mut seen = HashSet::new();

	for field in &cfg.indexes.acl_fields {
		if field.trim().is_empty() {
			return Err(Error::Validation {
				message: "indexes.acl_fields entries must be non-empty.".to_string(),
			});
		}
		if !seen.insert(field.as_str()) {
			return Err(Error::Validation {
				message: format!("indexes.acl_fields contains duplicate field {field:?}."),
			});
		}
	}

	if cfg.search.top_k == 0 {
		return Err(Error::Validation {
			message: "search.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.search.num_candidates < cfg.search.top_k {
		return Err(Error::Validation {
			message: "search.num_candidates must be at least search.top_k.".to_string(),
		});
	}
	if cfg.search.source_limit < cfg.search.top_k {
		return Err(Error::Validation {
			message: "search.source_limit must be at least search.top_k.".to_string(),
		});
	}
	if !cfg.search.rrf_rank_constant.is_finite() || cfg.search.rrf_rank_constant <= 0.0 {
		return Err(Error::Validation {
			message: "search.rrf_rank_constant must be a finite number greater than zero."
				.to_string(),
		});
	}
	if !matches!(cfg.search.native_rank_fusion.as_str(), "auto" | "always" | "never") {
		return Err(Error::Validation {
			message: "search.native_rank_fusion must be one of auto, always, or never."
				.to_string(),
		});
	}
	if cfg.search.fuzzy.max_edits > 2 {
		return Err(Error::Validation {
			message: "search.fuzzy.max_edits must be 2 or less.".to_string(),
		});
	}
	if cfg.search.fuzzy.max_expansions == 0 {
		return Err(Error::Validation {
			message: "search.fuzzy.max_expansions must be greater than zero.".to_string(),
		});
	}

	if cfg.provision.batch_size == 0 {
		return Err(Error::Validation {
			message: "provision.batch_size must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for field in &mut cfg.indexes.acl_fields {
		*field = field.trim().to_string();
	}
	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}
}
