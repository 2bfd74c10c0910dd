//! Server settings read from the process environment.

use std::net::{AddrParseError, IpAddr, Ipv4Addr, SocketAddr};
use std::num::ParseIntError;
use std::path::PathBuf;

pub const DEFAULT_MODEL_PATH: &str = "models/crop_model.pkl";
pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

pub const MODEL_PATH_VAR: &str = "MODEL_PATH";
pub const PORT_VAR: &str = "PORT";
pub const HOST_VAR: &str = "HOST";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("invalid PORT {value:?}: {source}")]
	InvalidPort { value: String, source: ParseIntError },

	#[error("invalid HOST {value:?}: {source}")]
	InvalidHost { value: String, source: AddrParseError },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
	pub model_path: PathBuf,
	pub host: IpAddr,
	pub port: u16,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			model_path: PathBuf::from(DEFAULT_MODEL_PATH),
			host: DEFAULT_HOST,
			port: DEFAULT_PORT,
		}
	}
}

impl ServerConfig {
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Builds the config from an arbitrary variable source. Unset or blank
	/// variables fall back to the defaults.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
		let mut config = Self::default();

		if let Some(path) = get(MODEL_PATH_VAR) {
			config.model_path = PathBuf::from(path);
		}

		if let Some(value) = get(PORT_VAR) {
			config.port = value
				.trim()
				.parse()
				.map_err(|source| ConfigError::InvalidPort { value, source })?;
		}

		if let Some(value) = get(HOST_VAR) {
			config.host = value
				.trim()
				.parse()
				.map_err(|source| ConfigError::InvalidHost { value, source })?;
		}

		Ok(config)
	}

	pub fn addr(&self) -> SocketAddr {
		SocketAddr::new(self.host, self.port)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect::<HashMap<_, _>>();
		move |key: &str| vars.get(key).cloned()
	}

	#[test]
	fn defaults_apply_when_unset() {
		let config = ServerConfig::from_lookup(lookup(&[])).unwrap();

		assert_eq!(config, ServerConfig::default());
		assert_eq!(config.addr().to_string(), "0.0.0.0:5001");
		assert_eq!(config.model_path, PathBuf::from("models/crop_model.pkl"));
	}

	#[test]
	fn variables_override_defaults() {
		let config = ServerConfig::from_lookup(lookup(&[
			("MODEL_PATH", "/srv/crops.bin"),
			("PORT", "8080"),
			("HOST", "127.0.0.1"),
		])).unwrap();

		assert_eq!(config.model_path, PathBuf::from("/srv/crops.bin"));
		assert_eq!(config.addr().to_string(), "127.0.0.1:8080");
	}

	#[test]
	fn blank_values_are_ignored() {
		let config = ServerConfig::from_lookup(lookup(&[("PORT", "  ")])).unwrap();
		assert_eq!(config.port, DEFAULT_PORT);
	}

	#[test]
	fn bad_port_is_an_error() {
		let err = ServerConfig::from_lookup(lookup(&[("PORT", "http")])).unwrap_err();
		assert!(matches!(err, ConfigError::InvalidPort { .. }));
		assert!(err.to_string().starts_with("invalid PORT \"http\""));
	}
}
