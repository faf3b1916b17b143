//! Amount fields such as `"114731984rune"`.

use std::collections::HashMap;

use crate::{models::Coin, services::decoder::DecodeError};

fn amount_metadata(input: &str) -> Option<HashMap<String, String>> {
	Some(HashMap::from([("input".to_string(), input.to_string())]))
}

/// Splits an amount field into its integer value and upper-cased denomination.
///
/// The value is the leading run of ASCII digits; everything after the first non-digit is
/// the denomination, so `"1000000 thor.rune"` gives `(1000000, "THOR.RUNE")`.
///
/// # Errors
/// Empty input, a missing number, a missing denomination, or a number wider than `u128`.
pub fn parse_amount(input: &str) -> Result<(u128, String), DecodeError> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err(DecodeError::invalid_amount("empty amount", None, None));
	}

	let split = trimmed
		.find(|c: char| !c.is_ascii_digit())
		.unwrap_or(trimmed.len());
	let (digits, denom) = trimmed.split_at(split);
	let denom = denom.trim();

	if denom.is_empty() {
		return Err(DecodeError::invalid_amount(
			"missing denomination",
			None,
			amount_metadata(input),
		));
	}
	if digits.is_empty() {
		return Err(DecodeError::invalid_amount(
			"missing amount",
			None,
			amount_metadata(input),
		));
	}

	let amount = digits.parse::<u128>().map_err(|e| {
		DecodeError::invalid_amount("amount out of range", Some(Box::new(e)), amount_metadata(input))
	})?;

	Ok((amount, denom.to_uppercase()))
}

/// Parses an amount field into a [`Coin`].
pub fn parse_coin(input: &str) -> Result<Coin, DecodeError> {
	let (amount, asset) = parse_amount(input)?;
	Ok(Coin { asset, amount })
}

/// Parses a comma separated list such as `"100rune,5btc/btc"`.
pub fn parse_coins(input: &str) -> Result<Vec<Coin>, DecodeError> {
	input
		.split(',')
		.filter(|part| !part.trim().is_empty())
		.map(parse_coin)
		.collect()
}
