// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for Docket.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`DOCKET_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use docket_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("permission cache ttl: {:?}", config.authz.cache_ttl());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use docket_common_secret::load_secret_env;
use tracing::{debug, info};

/// Minimum signing secret length accepted in production.
pub const MIN_PRODUCTION_SECRET_BYTES: usize = 32;

const SECRET_ENV: &str = "DOCKET_SERVER_CREDENTIALS_SECRET";

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub credentials: CredentialsConfig,
	pub authz: AuthzConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`DOCKET_SERVER_*`)
/// 2. Config file (`/etc/docket/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![Box::new(DefaultsSource), Box::new(EnvSource)])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	let secret = load_secret_env(SECRET_ENV).map_err(|e| ConfigError::Secret(e.to_string()))?;
	finalize(merged, secret)
}

/// Finalize configuration layer into resolved config.
fn finalize(
	layer: ServerConfigLayer,
	secret: Option<docket_common_secret::SecretString>,
) -> Result<ServerConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let credentials = layer.credentials.unwrap_or_default().finalize(secret);
	let authz = layer.authz.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&credentials, &authz)?;

	info!(
		database = %database.url,
		environment = %authz.environment,
		cache_enabled = authz.cache_enabled,
		cache_ttl_secs = authz.cache_ttl_secs,
		signing_secret_configured = credentials.secret.is_some(),
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		database,
		credentials,
		authz,
		logging,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(credentials: &CredentialsConfig, authz: &AuthzConfig) -> Result<(), ConfigError> {
	if credentials.access_ttl_secs == 0 || credentials.refresh_ttl_secs == 0 {
		return Err(ConfigError::Validation(
			"credential TTLs must be greater than zero".to_string(),
		));
	}

	if credentials.refresh_ttl_secs < credentials.access_ttl_secs {
		return Err(ConfigError::Validation(
			"DOCKET_SERVER_CREDENTIALS_REFRESH_TTL_SECS must not be shorter than the access TTL"
				.to_string(),
		));
	}

	if credentials.access_cookie_name.is_empty()
		|| credentials.refresh_cookie_name.is_empty()
		|| credentials.access_cookie_name == credentials.refresh_cookie_name
	{
		return Err(ConfigError::Validation(
			"access and refresh cookie names must be set and distinct".to_string(),
		));
	}

	if authz.cache_enabled && authz.cache_ttl_secs == 0 {
		return Err(ConfigError::Validation(
			"DOCKET_SERVER_AUTHZ_CACHE_TTL_SECS must be greater than zero when the cache is enabled"
				.to_string(),
		));
	}

	if authz.is_production() {
		if !authz.cache_enabled {
			return Err(ConfigError::Validation(
				"the permission cache must be enabled when DOCKET_SERVER_ENV=production".to_string(),
			));
		}

		let secret_len = credentials.secret.as_ref().map_or(0, |s| s.len());
		if secret_len < MIN_PRODUCTION_SECRET_BYTES {
			return Err(ConfigError::Validation(format!(
				"{SECRET_ENV} must be at least {MIN_PRODUCTION_SECRET_BYTES} bytes when \
				 DOCKET_SERVER_ENV=production"
			)));
		}
	}

	Ok(())
}
