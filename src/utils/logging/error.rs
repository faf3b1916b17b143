//! Error context shared by every error type in the crate.
//!
//! [`ErrorContext`] carries a message, an optional source, free-form metadata, an RFC 3339
//! timestamp and a trace id. Wrapping one error context inside another keeps the inner
//! trace id, so a failure can be followed from the chain client up to the scanner loop.

use chrono::Utc;
use std::{collections::HashMap, fmt};
use uuid::Uuid;

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Context attached to every domain error.
#[derive(Debug)]
pub struct ErrorContext {
	/// Human readable message
	pub message: String,
	/// Underlying cause, if any
	pub source: Option<BoxedSource>,
	/// Extra key/value pairs, rendered sorted by key
	pub metadata: Option<HashMap<String, String>>,
	/// Creation time in RFC 3339 format
	pub timestamp: String,
	/// Trace id, inherited from the source chain when one is found
	pub trace_id: String,
}

impl ErrorContext {
	/// Creates a new error context.
	///
	/// # Arguments
	///
	/// * `message` - A descriptive error message
	/// * `source` - An optional source error that caused this error
	/// * `metadata` - Optional key-value pairs providing additional context
	pub fn new(
		message: impl Into<String>,
		source: Option<BoxedSource>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let trace_id = match source.as_ref() {
			Some(src) => TraceableError::trace_id(src.as_ref()),
			None => Uuid::new_v4().to_string(),
		};

		Self {
			message: message.into(),
			source,
			metadata,
			timestamp: Utc::now().to_rfc3339(),
			trace_id,
		}
	}

	/// Creates a new error context and emits it as a structured `error` event.
	pub fn new_with_log(
		message: impl Into<String>,
		source: Option<BoxedSource>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let context = Self::new(message, source, metadata);
		log_error(&context);
		context
	}

	/// Adds one metadata pair, creating the map on first use.
	pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.metadata
			.get_or_insert_with(HashMap::new)
			.insert(key.into(), value.into());
		self
	}

	/// Renders `"message [k1=v1, k2=v2]"` with keys in alphabetical order.
	pub fn format_with_metadata(&self) -> String {
		let Some(metadata) = self.metadata.as_ref().filter(|m| !m.is_empty()) else {
			return self.message.clone();
		};

		let mut pairs: Vec<_> = metadata.iter().collect();
		pairs.sort_by(|a, b| a.0.cmp(b.0));
		let rendered: Vec<String> = pairs
			.into_iter()
			.map(|(key, value)| format!("{}={}", key, value))
			.collect();

		format!("{} [{}]", self.message, rendered.join(", "))
	}
}

impl fmt::Display for ErrorContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_with_metadata())
	}
}

impl std::error::Error for ErrorContext {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		self.source
			.as_ref()
			.map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
	}
}

/// Errors that expose a trace id
pub trait TraceableError: std::error::Error + Send + Sync {
	fn trace_id(&self) -> String;
}

impl TraceableError for dyn std::error::Error + Send + Sync + 'static {
	fn trace_id(&self) -> String {
		if let Some(id) = try_extract_trace_id(self) {
			return id;
		}

		const MAX_DEPTH: usize = 3;
		let mut source = self.source();
		let mut depth = 0;
		while let Some(err) = source {
			depth += 1;
			if depth > MAX_DEPTH {
				break;
			}
			if let Some(id) = try_extract_trace_id(err) {
				return id;
			}
			source = err.source();
		}

		Uuid::new_v4().to_string()
	}
}

fn try_extract_trace_id(err: &(dyn std::error::Error + 'static)) -> Option<String> {
	if let Some(ctx) = err.downcast_ref::<ErrorContext>() {
		return Some(ctx.trace_id.clone());
	}

	macro_rules! try_downcast {
		($($ty:path),*) => {
			$(
				if let Some(e) = err.downcast_ref::<$ty>() {
					return Some(e.trace_id());
				}
			)*
		}
	}

	try_downcast!(
		crate::services::blockchain::BlockChainError,
		crate::services::blockchain::TransportError,
		crate::services::decoder::DecodeError,
		crate::services::scanner::ScannerServiceError,
		crate::services::pipeline::PipelineError,
		crate::services::cache::CacheError,
		crate::services::churn::ChurnError,
		crate::services::store::StoreError,
		crate::models::ConfigError
	);

	None
}

/// Cuts proxy error pages down to the text before the first tag
fn sanitize_error_message(message: &str) -> String {
	if message.contains("<html>") || message.contains("<head>") || message.contains("<body>") {
		if let Some(pos) = message.find('<') {
			return message[..pos].trim().to_string();
		}
	}
	message.to_string()
}

fn format_error_chain(err: &dyn std::error::Error) -> String {
	let mut result = sanitize_error_message(&err.to_string());
	let mut source = err.source();
	while let Some(err) = source {
		result.push_str("\n\tCaused by: ");
		result.push_str(&sanitize_error_message(&err.to_string()));
		source = err.source();
	}
	result
}

fn log_error(error: &ErrorContext) {
	match &error.source {
		Some(err) => tracing::error!(
			message = error.format_with_metadata(),
			trace_id = %error.trace_id,
			timestamp = %error.timestamp,
			error.chain = %format_error_chain(&**err),
			"Error occurred"
		),
		None => tracing::error!(
			message = error.format_with_metadata(),
			trace_id = %error.trace_id,
			timestamp = %error.timestamp,
			"Error occurred"
		),
	}
}
