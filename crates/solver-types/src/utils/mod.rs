//! Utility functions for common type conversions and transformations.

/// Test fixture builders.
pub mod builders;

/// Truncates an identifier for log output.
///
/// Identifiers longer than 8 characters are cut to their first 8 characters
/// with a trailing "..".
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 8 {
		id.to_string()
	} else {
		format!("{}..", &id[..8])
	}
}

/// Ensures a hex string carries a 0x prefix.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Serde adapter serializing byte vectors as 0x-prefixed hex strings.
pub mod hex_bytes {
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&super::with_0x_prefix(&hex::encode(bytes)))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		hex::decode(s.trim_start_matches("0x"))
			.map_err(|e| serde::de::Error::custom(format!("Invalid hex bytes: {}", e)))
	}
}
