// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization engine configuration.

use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Authorization configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct AuthzConfig {
	/// When false the permission cache always misses.
	pub cache_enabled: bool,
	pub cache_ttl_secs: u64,
	pub cache_max_entries: usize,
	/// Deployment environment (`development`, `staging`, `production`).
	pub environment: String,
}

impl Default for AuthzConfig {
	fn default() -> Self {
		AuthzConfigLayer::default().finalize()
	}
}

impl AuthzConfig {
	pub fn is_production(&self) -> bool {
		self.environment.eq_ignore_ascii_case("production")
	}

	pub fn cache_ttl(&self) -> Duration {
		Duration::from_secs(self.cache_ttl_secs)
	}
}

/// Authorization configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthzConfigLayer {
	#[serde(default)]
	pub cache_enabled: Option<bool>,
	#[serde(default)]
	pub cache_ttl_secs: Option<u64>,
	#[serde(default)]
	pub cache_max_entries: Option<usize>,
	#[serde(default)]
	pub environment: Option<String>,
}

impl AuthzConfigLayer {
	pub fn merge(&mut self, other: AuthzConfigLayer) {
		if other.cache_enabled.is_some() {
			self.cache_enabled = other.cache_enabled;
		}
		if other.cache_ttl_secs.is_some() {
			self.cache_ttl_secs = other.cache_ttl_secs;
		}
		if other.cache_max_entries.is_some() {
			self.cache_max_entries = other.cache_max_entries;
		}
		if other.environment.is_some() {
			self.environment = other.environment;
		}
	}

	pub fn finalize(self) -> AuthzConfig {
		AuthzConfig {
			cache_enabled: self.cache_enabled.unwrap_or(true),
			cache_ttl_secs: self.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS),
			cache_max_entries: self.cache_max_entries.unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
			environment: self
				.environment
				.unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
		}
	}
}
