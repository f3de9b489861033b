use thiserror::Error;

use crate::checks::Check;

/// Longest response body excerpt carried in an error message.
pub const BODY_EXCERPT_LIMIT: usize = 512;

#[derive(Debug, Error)]
pub enum SmokeError {
	#[error("missing configuration: set {0}")]
	MissingConfig(&'static str),
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),
	#[error("[{check}] {request}: expected {expected}, got {actual}: {body}")]
	UnexpectedStatus {
		check: Check,
		request: String,
		expected: String,
		actual: u16,
		body: String,
	},
	#[error("[{check}] {field} mismatch: expected {expected}, got {actual}")]
	FieldMismatch {
		check: Check,
		field: &'static str,
		expected: String,
		actual: String,
	},
	#[error("invalid date range: {0}")]
	DateRange(String),
	#[error(transparent)]
	Http(#[from] reqwest::Error),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	#[error(transparent)]
	DateFormat(#[from] time::error::Format),
	#[error(transparent)]
	Prompt(#[from] dialoguer::Error),
}

impl SmokeError {
	/// The check that failed, if the error came from an expectation rather than setup or transport.
	pub fn check(&self) -> Option<Check> {
		match self {
			SmokeError::UnexpectedStatus { check, .. } | SmokeError::FieldMismatch { check, .. } => Some(*check),
			_ => None,
		}
	}
}

pub fn excerpt(body: &str) -> String {
	let body = body.trim();
	if body.is_empty() { return "<empty body>".into(); }
	match body.char_indices().nth(BODY_EXCERPT_LIMIT) {
		Some((idx, _)) => format!("{}…", &body[..idx]),
		None => body.to_string(),
	}
}

pub type SmokeResult<T> = Result<T, SmokeError>;
