// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session credential configuration.
//!
//! The signing secret is never read from the TOML file; it comes from
//! `DOCKET_SERVER_CREDENTIALS_SECRET` or `DOCKET_SERVER_CREDENTIALS_SECRET_FILE`
//! and is passed to [`CredentialsConfigLayer::finalize`].

use docket_common_secret::SecretString;
use serde::Deserialize;

pub const DEFAULT_ISSUER: &str = "docket";
pub const DEFAULT_ACCESS_TTL_SECS: u64 = 15 * 60;
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 7 * 24 * 60 * 60;
pub const DEFAULT_ACCESS_COOKIE: &str = "docket_access";
pub const DEFAULT_REFRESH_COOKIE: &str = "docket_refresh";

/// Credential configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct CredentialsConfig {
	pub secret: Option<SecretString>,
	pub issuer: String,
	pub access_ttl_secs: u64,
	pub refresh_ttl_secs: u64,
	pub access_cookie_name: String,
	pub refresh_cookie_name: String,
}

impl Default for CredentialsConfig {
	fn default() -> Self {
		CredentialsConfigLayer::default().finalize(None)
	}
}

/// Credential configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsConfigLayer {
	#[serde(default)]
	pub issuer: Option<String>,
	#[serde(default)]
	pub access_ttl_secs: Option<u64>,
	#[serde(default)]
	pub refresh_ttl_secs: Option<u64>,
	#[serde(default)]
	pub access_cookie_name: Option<String>,
	#[serde(default)]
	pub refresh_cookie_name: Option<String>,
}

impl CredentialsConfigLayer {
	pub fn merge(&mut self, other: CredentialsConfigLayer) {
		if other.issuer.is_some() {
			self.issuer = other.issuer;
		}
		if other.access_ttl_secs.is_some() {
			self.access_ttl_secs = other.access_ttl_secs;
		}
		if other.refresh_ttl_secs.is_some() {
			self.refresh_ttl_secs = other.refresh_ttl_secs;
		}
		if other.access_cookie_name.is_some() {
			self.access_cookie_name = other.access_cookie_name;
		}
		if other.refresh_cookie_name.is_some() {
			self.refresh_cookie_name = other.refresh_cookie_name;
		}
	}

	pub fn finalize(self, secret: Option<SecretString>) -> CredentialsConfig {
		CredentialsConfig {
			secret,
			issuer: self.issuer.unwrap_or_else(|| DEFAULT_ISSUER.to_string()),
			access_ttl_secs: self.access_ttl_secs.unwrap_or(DEFAULT_ACCESS_TTL_SECS),
			refresh_ttl_secs: self.refresh_ttl_secs.unwrap_or(DEFAULT_REFRESH_TTL_SECS),
			access_cookie_name: self
				.access_cookie_name
				.unwrap_or_else(|| DEFAULT_ACCESS_COOKIE.to_string()),
			refresh_cookie_name: self
				.refresh_cookie_name
				.unwrap_or_else(|| DEFAULT_REFRESH_COOKIE.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = CredentialsConfig::default();
		assert!(config.secret.is_none());
		assert_eq!(config.issuer, "docket");
		assert_eq!(config.access_ttl_secs, 900);
		assert_eq!(config.refresh_ttl_secs, 604_800);
		assert_eq!(config.access_cookie_name, "docket_access");
		assert_eq!(config.refresh_cookie_name, "docket_refresh");
	}

	#[test]
	fn test_secret_is_redacted_in_debug() {
		let config = CredentialsConfigLayer::default()
			.finalize(Some(SecretString::new("hunter2-hunter2".to_string())));
		assert!(!format!("{config:?}").contains("hunter2"));
	}

	#[test]
	fn test_merge_keeps_unset_fields() {
		let mut layer = CredentialsConfigLayer {
			issuer: Some("docket-staging".to_string()),
			access_ttl_secs: Some(600),
			..Default::default()
		};
		layer.merge(CredentialsConfigLayer {
			access_ttl_secs: Some(300),
			..Default::default()
		});
		let config = layer.finalize(None);
		assert_eq!(config.issuer, "docket-staging");
		assert_eq!(config.access_ttl_secs, 300);
	}
}
