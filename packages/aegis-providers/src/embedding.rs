use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::{Error, Result};

/// Obtains one embedding per input text, in input order.
///
/// The call is synchronous from the caller's perspective; the provider client
/// enforces `cfg.timeout_ms` so a provider outage never blocks without bound.
pub async fn embed(
	cfg: &aegis_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let status = res.status();

	if let Some(classified) = classify_status(status) {
		let message = res.text().await.unwrap_or_default();

		return Err(apply_status(classified, status, message));
	}

	let json: Value = res.error_for_status()?.json().await?;
	let embeddings = parse_embedding_response(json)?;

	for embedding in &embeddings {
		if embedding.len() != cfg.dimensions as usize {
			return Err(Error::DimensionMismatch {
				expected: cfg.dimensions,
				actual: embedding.len(),
			});
		}
	}

	Ok(embeddings)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusClass {
	Authentication,
	RateLimited,
	InvalidInput,
}

pub(crate) fn classify_status(status: StatusCode) -> Option<StatusClass> {
	match status.as_u16() {
		401 | 403 => Some(StatusClass::Authentication),
		429 => Some(StatusClass::RateLimited),
		400 | 422 => Some(StatusClass::InvalidInput),
		_ => None,
	}
}

fn apply_status(class: StatusClass, status: StatusCode, message: String) -> Error {
	match class {
		StatusClass::Authentication => Error::Authentication { status: status.as_u16() },
		StatusClass::RateLimited => Error::RateLimited,
		StatusClass::InvalidInput =>
			Error::InvalidInput { status: status.as_u16(), message },
	}
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json.get("data").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Embedding response is missing data array.".to_string() }
	})?;

	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item.get("embedding").and_then(|v| v.as_array()).ok_or_else(|| {
			Error::InvalidResponse { message: "Embedding item missing embedding array.".to_string() }
		})?;
		let mut vec = Vec::with_capacity(embedding.len());

		for value in embedding {
			let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
				message: "Embedding value must be numeric.".to_string(),
			})?;

			vec.push(number as f32);
		}

		indexed.push((index, vec));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_embeddings_in_index_order() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(json).expect("parse failed");

		assert_eq!(parsed.len(), 2);
		assert_eq!(parsed[0], vec![0.5, 1.5]);
		assert_eq!(parsed[1], vec![2.0, 3.0]);
	}

	#[test]
	fn missing_data_array_is_an_invalid_response() {
		let json = serde_json::json!({ "object": "list" });
		let err = parse_embedding_response(json).expect_err("parse must fail");

		assert!(matches!(err, Error::InvalidResponse { .. }));
	}

	#[test]
	fn classifies_provider_status_codes_distinctly() {
		assert_eq!(
			classify_status(StatusCode::UNAUTHORIZED),
			Some(StatusClass::Authentication),
		);
		assert_eq!(classify_status(StatusCode::FORBIDDEN), Some(StatusClass::Authentication));
		assert_eq!(
			classify_status(StatusCode::TOO_MANY_REQUESTS),
			Some(StatusClass::RateLimited),
		);
		assert_eq!(classify_status(StatusCode::BAD_REQUEST), Some(StatusClass::InvalidInput));
		assert_eq!(classify_status(StatusCode::OK), None);
		assert_eq!(classify_status(StatusCode::INTERNAL_SERVER_ERROR), None);
	}
}
