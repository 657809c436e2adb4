//! Configuration module for the signed-authorization relay.
//!
//! This module provides the configuration structures for the relay and the
//! logic to load them from TOML. Environment variables referenced as
//! `${VAR}` or `${VAR:-default}` are resolved before parsing, and the parsed
//! configuration is validated before it is handed to the builder.

use regex::Regex;
use relay_types::{Address, DEFAULT_LEGACY_MARKER};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep only the message, not the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the relay.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this relay instance.
	pub relay: RelayConfig,
	/// Token ledger implementations.
	pub ledger: LedgerConfig,
	/// Signature verifier implementations.
	pub signature: SignatureConfig,
	/// Payment channel ledger settings.
	pub channel: ChannelConfig,
	/// Cheque settings.
	#[serde(default)]
	pub cheque: ChequeConfig,
	/// Event bus settings.
	#[serde(default)]
	pub events: EventsConfig,
}

/// Configuration specific to the relay instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
	/// Unique identifier for this relay instance, used in logs.
	pub id: String,
}

/// Configuration for the token ledger collaborator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Map of ledger implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for signature recovery.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignatureConfig {
	/// Which verifier implementation to use.
	pub primary: String,
	/// Map of verifier implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the payment channel ledger.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
	/// Identity the channel ledger binds withdrawal signatures to.
	pub address: Address,
	/// Pay out at most the payer's current balance instead of failing.
	///
	/// When enabled, the unpaid remainder of a signature stays redeemable.
	#[serde(default)]
	pub cap_to_payer_balance: bool,
}

/// Configuration for cheque redemption.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChequeConfig {
	/// Text appended to the signed message of legacy-encoded cheques.
	#[serde(default = "default_legacy_marker")]
	pub legacy_marker: String,
}

impl Default for ChequeConfig {
	fn default() -> Self {
		Self {
			legacy_marker: default_legacy_marker(),
		}
	}
}

fn default_legacy_marker() -> String {
	DEFAULT_LEGACY_MARKER.to_string()
}

/// Configuration for the settlement event bus.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsConfig {
	/// Number of events buffered per subscriber before the oldest are dropped.
	#[serde(default = "default_event_capacity")]
	pub capacity: usize,
}

impl Default for EventsConfig {
	fn default() -> Self {
		Self {
			capacity: default_event_capacity(),
		}
	}
}

fn default_event_capacity() -> usize {
	1000
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving environment variables.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path.as_ref()).await?;
		content.parse()
	}

	/// Returns the raw configuration table of the primary ledger implementation.
	pub fn primary_ledger(&self) -> Option<&toml::Value> {
		self.ledger.implementations.get(&self.ledger.primary)
	}

	/// Returns the raw configuration table of the primary signature verifier.
	pub fn primary_signature(&self) -> Option<&toml::Value> {
		self.signature.implementations.get(&self.signature.primary)
	}

	/// Validates the configuration to ensure all required fields are properly set.
	///
	/// - Relay id is not empty
	/// - Ledger and signature primaries name configured implementations
	/// - Channel ledger identity is set and distinct from the token identity
	/// - Legacy marker and event capacity are non-empty
	fn validate(&self) -> Result<(), ConfigError> {
		if self.relay.id.is_empty() {
			return Err(ConfigError::Validation("Relay ID cannot be empty".into()));
		}

		if self.ledger.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Ledger primary implementation cannot be empty".into(),
			));
		}
		let ledger = self.primary_ledger().ok_or_else(|| {
			ConfigError::Validation(format!(
				"Primary ledger '{}' not found in implementations",
				self.ledger.primary
			))
		})?;

		if self.signature.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Signature primary implementation cannot be empty".into(),
			));
		}
		if self.primary_signature().is_none() {
			return Err(ConfigError::Validation(format!(
				"Primary signature verifier '{}' not found in implementations",
				self.signature.primary
			)));
		}

		if self.channel.address == Address::ZERO {
			return Err(ConfigError::Validation(
				"Channel ledger address cannot be the zero address".into(),
			));
		}
		if let Some(token) = ledger
			.get("address")
			.and_then(|v| v.as_str())
			.and_then(|s| s.parse::<Address>().ok())
		{
			if token == self.channel.address {
				return Err(ConfigError::Validation(
					"Channel ledger address must differ from the token address".into(),
				));
			}
		}

		if self.cheque.legacy_marker.is_empty() {
			return Err(ConfigError::Validation(
				"Cheque legacy_marker cannot be empty".into(),
			));
		}
		if self.events.capacity == 0 {
			return Err(ConfigError::Validation(
				"Event capacity must be greater than 0".into(),
			));
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const BASE_CONFIG: &str = r#"
[relay]
id = "relay-test"

[ledger]
primary = "memory"
[ledger.implementations.memory]
address = "0x1000000000000000000000000000000000000001"

[signature]
primary = "ecdsa"
[signature.implementations.ecdsa]

[channel]
address = "0x2000000000000000000000000000000000000002"
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("RELAY_TEST_HOST", "localhost");
		std::env::set_var("RELAY_TEST_PORT", "5432");

		let input = "host = \"${RELAY_TEST_HOST}:${RELAY_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("RELAY_TEST_HOST");
		std::env::remove_var("RELAY_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${RELAY_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${RELAY_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("RELAY_MISSING_VAR"));
	}

	#[test]
	fn test_parse_base_config_with_defaults() {
		let config: Config = BASE_CONFIG.parse().unwrap();
		assert_eq!(config.relay.id, "relay-test");
		assert_eq!(config.ledger.primary, "memory");
		assert!(!config.channel.cap_to_payer_balance);
		assert_eq!(config.cheque.legacy_marker, "ERC20Compat");
		assert_eq!(config.events.capacity, 1000);
		assert!(config.primary_ledger().is_some());
	}

	#[test]
	fn test_config_with_env_vars() {
		std::env::set_var("RELAY_TEST_ID", "from-env");
		let config_str = BASE_CONFIG.replace("relay-test", "${RELAY_TEST_ID}");

		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.relay.id, "from-env");

		std::env::remove_var("RELAY_TEST_ID");
	}

	#[test]
	fn test_unknown_primary_ledger_rejected() {
		let config_str = BASE_CONFIG.replace("primary = \"memory\"", "primary = \"redis\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary ledger 'redis' not found in implementations"));
	}

	#[test]
	fn test_channel_address_must_differ_from_token() {
		let config_str = BASE_CONFIG.replace(
			"0x2000000000000000000000000000000000000002",
			"0x1000000000000000000000000000000000000001",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("must differ from the token address"));
	}

	#[test]
	fn test_zero_channel_address_rejected() {
		let config_str = BASE_CONFIG.replace(
			"0x2000000000000000000000000000000000000002",
			"0x0000000000000000000000000000000000000000",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("zero address"));
	}

	#[test]
	fn test_empty_legacy_marker_rejected() {
		let config_str = format!("{}\n[cheque]\nlegacy_marker = \"\"\n", BASE_CONFIG);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("legacy_marker"));
	}

	#[test]
	fn test_invalid_toml_reports_parse_error() {
		let err = Config::from_str("[relay\nid = ").unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}

	#[tokio::test]
	async fn test_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(BASE_CONFIG.as_bytes()).unwrap();

		let config = Config::from_file(file.path()).await.unwrap();
		assert_eq!(config.relay.id, "relay-test");
	}

	#[tokio::test]
	async fn test_from_missing_file() {
		let result = Config::from_file("/nonexistent/relay.toml").await;
		assert!(matches!(result, Err(ConfigError::Io(_))));
	}
}
