// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use anyhow::{anyhow, Context};
use docket_common_secret::SecretString;
use docket_server_authz::{
	Authorizer, CredentialCookies, CredentialSigner, IdentityVerifier, InMemoryCache,
	PermissionAggregator, PermissionCache, ResourceAccessResolver,
};
use docket_server_config::ServerConfig;
use docket_server_db::{create_pool, ensure_authz_schema, AuthzRepository};
use tracing::debug;

/// Engine components wired from configuration.
pub struct CliContext {
	pub config: ServerConfig,
	pub repo: AuthzRepository,
	pub authorizer: Authorizer,
}

impl CliContext {
	/// Connect to the configured database and build the authorizer.
	pub async fn connect(config: ServerConfig) -> anyhow::Result<Self> {
		let pool = create_pool(&config.database.url)
			.await
			.with_context(|| format!("failed to open database {}", config.database.url))?;
		let repo = AuthzRepository::new(pool);
		let authorizer = build_authorizer(&config, &repo);

		debug!(database = %config.database.url, "cli context ready");
		Ok(Self {
			config,
			repo,
			authorizer,
		})
	}

	pub async fn init_schema(&self) -> anyhow::Result<()> {
		ensure_authz_schema(self.repo.pool())
			.await
			.context("failed to create authorization tables")
	}

	pub fn signer(&self) -> anyhow::Result<CredentialSigner> {
		let credentials = &self.config.credentials;
		Ok(CredentialSigner::new(self.secret()?)
			.with_issuer(credentials.issuer.clone())
			.with_access_ttl(chrono::Duration::seconds(ttl_secs(credentials.access_ttl_secs)))
			.with_refresh_ttl(chrono::Duration::seconds(ttl_secs(credentials.refresh_ttl_secs))))
	}

	pub fn verifier(&self) -> anyhow::Result<IdentityVerifier> {
		Ok(IdentityVerifier::new(self.secret()?).with_issuer(&self.config.credentials.issuer))
	}

	/// Cookie names from `[credentials]`.
	pub fn cookies(&self) -> CredentialCookies {
		let credentials = &self.config.credentials;
		CredentialCookies::new(
			credentials.access_cookie_name.clone(),
			credentials.refresh_cookie_name.clone(),
		)
	}

	fn secret(&self) -> anyhow::Result<&SecretString> {
		self.config.credentials.secret.as_ref().ok_or_else(|| {
			anyhow!("no signing secret configured; set DOCKET_SERVER_CREDENTIALS_SECRET or DOCKET_SERVER_CREDENTIALS_SECRET_FILE")
		})
	}
}

/// Ten years; keeps `chrono::Duration` arithmetic in range.
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn ttl_secs(secs: u64) -> i64 {
	secs.min(MAX_TTL_SECS) as i64
}

pub fn build_authorizer(config: &ServerConfig, repo: &AuthzRepository) -> Authorizer {
	let cache = if config.authz.cache_enabled {
		PermissionCache::new(
			Arc::new(InMemoryCache::with_max_entries(config.authz.cache_max_entries)),
			config.authz.cache_ttl(),
		)
	} else {
		PermissionCache::disabled()
	};

	let store = Arc::new(repo.clone());
	Authorizer::new(
		PermissionAggregator::new(store.clone(), cache),
		ResourceAccessResolver::new(store.clone()),
		store,
	)
}
