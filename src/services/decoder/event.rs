//! Event attribute decoding.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::{BTreeMap, HashMap};

use crate::{
	models::{AttributeEncoding, DecodedEvent, RawEvent},
	services::decoder::{amount::parse_amount, DecodeError},
};

/// Attribute keys whose value is an amount field
const AMOUNT_KEYS: [&str; 2] = ["amount", "coin"];

fn decode_base64_text(text: &str) -> Option<String> {
	let bytes = STANDARD.decode(text).ok()?;
	String::from_utf8(bytes).ok()
}

fn is_printable(text: &str) -> bool {
	!text.chars().any(char::is_control)
}

/// Decodes one attribute key or value according to `encoding`.
///
/// [`AttributeEncoding::Auto`] guesses per string: plain text that is also valid base64 of
/// printable UTF-8 (for example `"YWJj"`) comes out decoded. Networks with a known encoding
/// should set it explicitly.
pub fn decode_attribute_text(text: &str, encoding: AttributeEncoding) -> Result<String, DecodeError> {
	match encoding {
		AttributeEncoding::Plain => Ok(text.to_string()),
		AttributeEncoding::Base64 => decode_base64_text(text).ok_or_else(|| {
			DecodeError::invalid_event(
				"attribute is not base64 encoded UTF-8",
				None,
				Some(HashMap::from([("text".to_string(), text.to_string())])),
			)
		}),
		AttributeEncoding::Auto => Ok(decode_base64_text(text)
			.filter(|decoded| !decoded.is_empty() && is_printable(decoded))
			.unwrap_or_else(|| text.to_string())),
	}
}

/// Decodes the attributes of `raw`.
///
/// When an `amount` or `coin` attribute is present its first coin fills `amount` and
/// `asset`; an amount that does not parse leaves both empty without failing the event.
pub fn decode_event(raw: &RawEvent, encoding: AttributeEncoding) -> Result<DecodedEvent, DecodeError> {
	if raw.kind.is_empty() {
		return Err(DecodeError::invalid_event("event without type", None, None));
	}

	let mut event = DecodedEvent {
		kind: raw.kind.clone(),
		attributes: BTreeMap::new(),
		amount: None,
		asset: None,
	};

	for attribute in &raw.attributes {
		let key = decode_attribute_text(&attribute.key, encoding)
			.map_err(|e| with_event_kind(e, &raw.kind))?;
		let value = match attribute.value.as_deref() {
			Some(value) => {
				decode_attribute_text(value, encoding).map_err(|e| with_event_kind(e, &raw.kind))?
			}
			None => String::new(),
		};

		if AMOUNT_KEYS.contains(&key.as_str()) {
			let first = value.split(',').next().unwrap_or_default();
			match parse_amount(first) {
				Ok((amount, asset)) => {
					event.amount = Some(amount);
					event.asset = Some(asset);
				}
				Err(e) => tracing::debug!(event = %raw.kind, "Unparsed amount attribute: {}", e),
			}
		}
		event.attributes.insert(key, value);
	}

	Ok(event)
}

fn with_event_kind(error: DecodeError, kind: &str) -> DecodeError {
	match error {
		DecodeError::InvalidEvent(ctx) => DecodeError::InvalidEvent(ctx.with_metadata("event", kind)),
		other => other,
	}
}
