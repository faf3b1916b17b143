//! Chain client error types.
//!
//! These cover failures to talk to the node. A node that answers with a typed refusal for
//! a height (not produced yet, pruned) is not an error here; it is returned as
//! [`BlockPayload::Error`](crate::models::BlockPayload).

use crate::{
	services::blockchain::TransportError,
	utils::logging::error::{ErrorContext, TraceableError},
};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Represents possible errors of a chain client call
#[derive(ThisError, Debug)]
pub enum BlockChainError {
	/// The node could not be reached
	#[error("Connection error: {0}")]
	ConnectionError(ErrorContext),

	/// The node rejected the request
	#[error("Request error: {0}")]
	RequestError(ErrorContext),

	/// The node answered with something that is not the expected shape
	#[error("Response error: {0}")]
	ResponseError(ErrorContext),

	/// Internal errors within the client
	#[error("Internal error: {0}")]
	InternalError(ErrorContext),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl BlockChainError {
	pub fn connection_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ConnectionError(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn request_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::RequestError(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn response_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ResponseError(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn internal_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::InternalError(ErrorContext::new_with_log(msg, source, metadata))
	}

	/// Wraps a transport failure of the request to `path`.
	pub fn from_transport(path: &str, error: TransportError) -> Self {
		let metadata = Some(HashMap::from([("path".to_string(), path.to_string())]));
		match error {
			TransportError::Network(_) | TransportError::UrlRotation(_) => Self::connection_error(
				"node unreachable",
				Some(Box::new(error)),
				metadata,
			),
			TransportError::ResponseParse(_) => {
				Self::response_error("unreadable node response", Some(Box::new(error)), metadata)
			}
			_ => Self::request_error("node request failed", Some(Box::new(error)), metadata),
		}
	}
}

impl TraceableError for BlockChainError {
	fn trace_id(&self) -> String {
		match self {
			Self::ConnectionError(ctx)
			| Self::RequestError(ctx)
			| Self::ResponseError(ctx)
			| Self::InternalError(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
