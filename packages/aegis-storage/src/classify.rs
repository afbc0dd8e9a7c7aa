use mongodb::error::{Error as MongoError, ErrorKind};

/// Structured view of a backend failure. Callers branch on this instead of
/// matching error-message substrings; the server command codes live in one
/// place so a backend-version audit touches one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFailure {
	/// Index with the same name and kind already exists.
	AlreadyExists,
	/// The server does not support the requested feature (pipeline stage or
	/// query option), e.g. native rank fusion or filtered vector search on
	/// an older deployment.
	Unsupported,
	/// Network-level or server-selection failure; safe to retry once with
	/// identical semantics.
	Transient,
	Other,
}

const CODE_INDEX_ALREADY_EXISTS: i32 = 68;
const CODE_INDEX_OPTIONS_CONFLICT: i32 = 85;
const CODE_UNRECOGNIZED_PIPELINE_STAGE: i32 = 40_324;
const CODE_FAILED_TO_PARSE: i32 = 9;

pub fn classify(err: &MongoError) -> BackendFailure {
	match err.kind.as_ref() {
		ErrorKind::Command(command) => classify_command(command.code, &command.code_name),
		ErrorKind::Io(_) => BackendFailure::Transient,
		ErrorKind::ServerSelection { .. } => BackendFailure::Transient,
		ErrorKind::ConnectionPoolCleared { .. } => BackendFailure::Transient,
		_ => BackendFailure::Other,
	}
}

pub fn classify_command(code: i32, code_name: &str) -> BackendFailure {
	match code {
		CODE_INDEX_ALREADY_EXISTS | CODE_INDEX_OPTIONS_CONFLICT => BackendFailure::AlreadyExists,
		CODE_UNRECOGNIZED_PIPELINE_STAGE => BackendFailure::Unsupported,
		// Stage parse errors carry code 9 with a stage-specific code name on
		// some server versions.
		CODE_FAILED_TO_PARSE if code_name == "FailedToParse" => BackendFailure::Unsupported,
		_ => match code_name {
			"IndexAlreadyExists" | "IndexOptionsConflict" => BackendFailure::AlreadyExists,
			"QueryFeatureNotAllowed" => BackendFailure::Unsupported,
			_ => BackendFailure::Other,
		},
	}
}
