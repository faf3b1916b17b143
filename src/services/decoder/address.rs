//! Native address rendering.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bech32::{Bech32, Hrp};

use crate::services::decoder::DecodeError;

/// Renders raw address bytes as a bech32 string under `prefix`.
///
/// Bytes that already hold the ASCII form (they start with `prefix`) pass through unchanged.
pub fn parse_thor_address(bytes: &[u8], prefix: &str) -> Result<String, DecodeError> {
	if bytes.starts_with(prefix.as_bytes()) {
		if let Ok(text) = std::str::from_utf8(bytes) {
			return Ok(text.to_string());
		}
	}

	let hrp = Hrp::parse(prefix).map_err(|e| {
		DecodeError::invalid_address(
			format!("invalid address prefix '{}'", prefix),
			Some(Box::new(e)),
			None,
		)
	})?;
	bech32::encode::<Bech32>(hrp, bytes).map_err(|e| {
		DecodeError::invalid_address("failed to encode address", Some(Box::new(e)), None)
	})
}

/// Normalizes an address field from a JSON payload.
///
/// Fields holding the human-readable form are returned as they are; anything else is read
/// as base64 address bytes.
pub fn normalize_address(field: &str, prefix: &str) -> Result<String, DecodeError> {
	if field.is_empty() || field.starts_with(prefix) {
		return Ok(field.to_string());
	}
	let bytes = STANDARD.decode(field).map_err(|e| {
		DecodeError::invalid_address(
			format!("address '{}' is neither bech32 nor base64", field),
			Some(Box::new(e)),
			None,
		)
	})?;
	parse_thor_address(&bytes, prefix)
}

/// True if `address` is a checksummed bech32 string with human-readable part `prefix`.
pub fn is_valid_address(address: &str, prefix: &str) -> bool {
	bech32::decode(address)
		.map(|(hrp, _)| hrp.as_str().eq_ignore_ascii_case(prefix))
		.unwrap_or(false)
}
