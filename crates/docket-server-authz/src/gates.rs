// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Enforcement gates.
//!
//! Three independent checks run in front of a protected operation:
//!
//! 1. [`Authorizer::require_permission`]: global capability from the
//!    effective permission set.
//! 2. [`Authorizer::require_resource_access`]: per-instance grant, with
//!    case→client inheritance.
//! 3. [`Authorizer::require_ownership`]: the row belongs to the caller's
//!    firm.
//!
//! Firm owners and admins pass every gate without any store reads.
//!
//! Every gate returns the identity it was given on success so checks can be
//! chained with `?`.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::error::{AuthzError, AuthzResult, ForbiddenReason};
use crate::identity::Identity;
use crate::permissions::{infrastructure, PermissionAggregator, PermissionSet};
use crate::resource::ResourceAccessResolver;
use crate::store::{OwnedTable, OwnershipStore};
use crate::types::{AccessLevel, ResourceId, ResourceType};

#[derive(Clone)]
pub struct Authorizer {
	aggregator: PermissionAggregator,
	resolver: ResourceAccessResolver,
	ownership: Arc<dyn OwnershipStore>,
}

impl Authorizer {
	pub fn new(
		aggregator: PermissionAggregator,
		resolver: ResourceAccessResolver,
		ownership: Arc<dyn OwnershipStore>,
	) -> Self {
		Self {
			aggregator,
			resolver,
			ownership,
		}
	}

	pub fn aggregator(&self) -> &PermissionAggregator {
		&self.aggregator
	}

	pub fn resolver(&self) -> &ResourceAccessResolver {
		&self.resolver
	}

	/// Effective permissions for the identity within its own firm.
	pub async fn effective_permissions(&self, identity: &Identity) -> AuthzResult<PermissionSet> {
		self
			.aggregator
			.effective_permissions(&identity.user_id, &identity.firm_id)
			.await
	}

	/// Require a global permission key.
	///
	/// Passes when the identity is an owner or admin, when the key is in the
	/// effective set, or when the set holds a wildcard (`*` or `all`).
	#[instrument(
		level = "debug",
		skip_all,
		fields(user_id = %identity.user_id, firm_id = %identity.firm_id, permission = %key)
	)]
	pub async fn require_permission<'a>(
		&self,
		identity: &'a Identity,
		key: &str,
	) -> AuthzResult<&'a Identity> {
		if identity.is_privileged() {
			debug!(role = %identity.role, "privileged role bypass");
			return Ok(identity);
		}

		let permissions = self.effective_permissions(identity).await?;
		if permissions.allows(key) {
			debug!("permission granted");
			return Ok(identity);
		}

		info!("permission denied");
		Err(AuthzError::missing_permission(key))
	}

	/// Require at least `min_level` on one resource instance.
	///
	/// Global permissions are not consulted; holding `cases:view` does not
	/// open a case the caller has no grant on.
	#[instrument(
		level = "debug",
		skip_all,
		fields(
			user_id = %identity.user_id,
			firm_id = %identity.firm_id,
			resource_type = %resource_type,
			resource_id = %resource_id,
			min_level = %min_level,
		)
	)]
	pub async fn require_resource_access<'a>(
		&self,
		identity: &'a Identity,
		resource_type: ResourceType,
		resource_id: &ResourceId,
		min_level: AccessLevel,
	) -> AuthzResult<&'a Identity> {
		if identity.is_privileged() {
			debug!(role = %identity.role, "privileged role bypass");
			return Ok(identity);
		}

		let allowed = self
			.resolver
			.has_resource_access(
				&identity.user_id,
				&identity.firm_id,
				resource_type,
				resource_id,
				min_level,
			)
			.await?;

		if allowed {
			debug!("resource access granted");
			return Ok(identity);
		}

		info!("resource access denied");
		Err(AuthzError::resource_forbidden(resource_type, *resource_id))
	}

	/// Require that the row in `table` belongs to the identity's firm.
	///
	/// Owners and admins pass without the row being loaded, so this gate
	/// gives no tenant isolation for them.
	#[instrument(
		level = "debug",
		skip_all,
		fields(
			user_id = %identity.user_id,
			firm_id = %identity.firm_id,
			table = table.table,
			resource_id = %resource_id,
		)
	)]
	pub async fn require_ownership<'a>(
		&self,
		identity: &'a Identity,
		table: OwnedTable,
		resource_id: &ResourceId,
	) -> AuthzResult<&'a Identity> {
		if identity.is_privileged() {
			debug!(role = %identity.role, "privileged role bypass");
			return Ok(identity);
		}

		let owner = self
			.ownership
			.get_owning_firm(table, resource_id)
			.await
			.map_err(|e| infrastructure("ownership store", e))?;

		match owner {
			None => {
				info!("row not found");
				Err(AuthzError::NotFound {
					table: table.table,
					resource_id: *resource_id,
				})
			}
			Some(firm_id) if firm_id == identity.firm_id => {
				debug!("ownership confirmed");
				Ok(identity)
			}
			Some(owner_firm) => {
				info!(owner_firm = %owner_firm, "cross-tenant access refused");
				Err(AuthzError::Forbidden(ForbiddenReason::CrossTenant {
					table: table.table,
					resource_id: *resource_id,
				}))
			}
		}
	}
}
