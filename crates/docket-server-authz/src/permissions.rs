// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Effective global permissions.
//!
//! A member's effective set is the union of their role's permission keys and
//! their custom overrides:
//!
//! ```text
//! cache hit? ──yes──▶ cached set
//!    │ no
//!    ▼
//! membership ──none / no role──▶ ∅
//!    │
//!    ▼
//! join-table keys ──zero rows──▶ legacy inline Role.permissions
//!    │                               │
//!    └──────────────┬────────────────┘
//!                   ▼
//!        ∪ custom_permissions ─▶ cache (TTL) ─▶ set
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::cache::PermissionCache;
use crate::error::{AuthzError, AuthzResult, StoreError};
use crate::store::{PermissionStore, Role};
use crate::types::{keys, FirmId, RoleId, UserId};

/// A deduplicated set of permission keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_keys<I, S>(keys: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self(keys.into_iter().map(Into::into).collect())
	}

	pub fn extend<I, S>(&mut self, keys: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.0.extend(keys.into_iter().map(Into::into));
	}

	/// Exact membership, ignoring wildcards.
	pub fn contains(&self, key: &str) -> bool {
		self.0.contains(key)
	}

	pub fn has_wildcard(&self) -> bool {
		keys::WILDCARDS.iter().any(|w| self.0.contains(*w))
	}

	/// Returns true if `key` is granted directly or through a wildcard.
	pub fn allows(&self, key: &str) -> bool {
		self.contains(key) || self.has_wildcard()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}
}

/// Where a role's permission keys came from.
///
/// Join-table rows always win; the inline list is consulted only when the
/// role has no join rows at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolePermissions {
	JoinTable(Vec<String>),
	LegacyInline(Vec<String>),
}

impl RolePermissions {
	/// Pick the source for a role given its join rows and (lazily) its record.
	pub fn resolve(join_keys: Vec<String>, role: Option<&Role>) -> Self {
		if !join_keys.is_empty() {
			return RolePermissions::JoinTable(join_keys);
		}
		RolePermissions::LegacyInline(role.map(|r| r.permissions.clone()).unwrap_or_default())
	}

	pub fn keys(&self) -> &[String] {
		match self {
			RolePermissions::JoinTable(keys) | RolePermissions::LegacyInline(keys) => keys,
		}
	}

	pub fn is_legacy(&self) -> bool {
		matches!(self, RolePermissions::LegacyInline(_))
	}
}

/// Computes effective permission sets, caching the result per (firm, user).
#[derive(Clone)]
pub struct PermissionAggregator {
	store: Arc<dyn PermissionStore>,
	cache: PermissionCache,
}

impl PermissionAggregator {
	pub fn new(store: Arc<dyn PermissionStore>, cache: PermissionCache) -> Self {
		Self { store, cache }
	}

	pub fn cache(&self) -> &PermissionCache {
		&self.cache
	}

	/// Effective global permissions of `user_id` within `firm_id`.
	///
	/// Store and cache failures surface as `InfrastructureUnavailable`; they
	/// never degrade into an empty set. A failed cache write is logged and
	/// does not fail the call since the set came from the store.
	#[instrument(level = "debug", skip_all, fields(user_id = %user_id, firm_id = %firm_id))]
	pub async fn effective_permissions(
		&self,
		user_id: &UserId,
		firm_id: &FirmId,
	) -> AuthzResult<PermissionSet> {
		if let Some(cached) = self
			.cache
			.get(firm_id, user_id)
			.await
			.map_err(|e| infrastructure("permission cache", e))?
		{
			debug!(count = cached.len(), "permission set served from cache");
			return Ok(cached);
		}

		let Some(membership) = self
			.store
			.get_membership(user_id, firm_id)
			.await
			.map_err(|e| infrastructure("permission store", e))?
		else {
			debug!("no membership for firm");
			return Ok(PermissionSet::new());
		};

		let Some(role_id) = membership.role_id else {
			debug!("membership has no role");
			return Ok(PermissionSet::new());
		};

		let role_permissions = self.load_role_permissions(firm_id, &role_id).await?;
		if role_permissions.is_legacy() {
			debug!(role_id = %role_id, "using legacy inline role permissions");
		}

		let mut set = PermissionSet::from_keys(role_permissions.keys().iter().cloned());
		set.extend(membership.custom_permissions);

		if let Err(e) = self.cache.put(firm_id, user_id, &set).await {
			warn!(error = %e, "failed to cache permission set");
		}

		debug!(count = set.len(), "permission set resolved");
		Ok(set)
	}

	/// Drop the cached set so the next call reads the store.
	#[instrument(level = "debug", skip_all, fields(user_id = %user_id, firm_id = %firm_id))]
	pub async fn invalidate(&self, user_id: &UserId, firm_id: &FirmId) -> AuthzResult<()> {
		self
			.cache
			.invalidate(firm_id, user_id)
			.await
			.map_err(|e| infrastructure("permission cache", e))
	}

	async fn load_role_permissions(
		&self,
		firm_id: &FirmId,
		role_id: &RoleId,
	) -> AuthzResult<RolePermissions> {
		let join_keys = self
			.store
			.list_role_permission_keys(firm_id, role_id)
			.await
			.map_err(|e| infrastructure("permission store", e))?;

		if !join_keys.is_empty() {
			return Ok(RolePermissions::resolve(join_keys, None));
		}

		let role = self
			.store
			.get_role(firm_id, role_id)
			.await
			.map_err(|e| infrastructure("permission store", e))?;
		Ok(RolePermissions::resolve(join_keys, role.as_ref()))
	}
}

pub(crate) fn infrastructure(component: &'static str, err: StoreError) -> AuthzError {
	warn!(component, error = %err, "authorization backend failure");
	AuthzError::from(err)
}
