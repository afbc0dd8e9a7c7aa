pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Embedding failures are surfaced distinctly so callers can tell a provider
/// outage apart from a backend query failure. None of these are retried
/// internally, and none fall back to a stale or zero vector.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("Embedding provider rejected the credentials (status {status}).")]
	Authentication { status: u16 },
	#[error("Embedding provider rate limited the request.")]
	RateLimited,
	#[error("Embedding provider rejected the input (status {status}): {message}")]
	InvalidInput { status: u16, message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
	#[error("Embedding has {actual} dimensions, index expects {expected}.")]
	DimensionMismatch { expected: u32, actual: usize },
	#[error("{message}")]
	InvalidConfig { message: String },
}
