// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-resource access resolution.
//!
//! Resolution checks the exact grant first and falls back to the parent
//! resource for types that have one:
//!
//! | Resource  | Parent  |
//! |-----------|---------|
//! | case      | client  |
//! | client, document, firm, report | none |
//!
//! The parent table is an explicit match on [`ResourceType`], so resolution
//! is at most two grant lookups and one parent lookup. An explicit `none`
//! grant on the exact resource ends resolution before the parent is
//! consulted. Documents inherit nothing yet; a document→case edge would be
//! another arm in [`ResourceAccessResolver::parent_of`].

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::AuthzResult;
use crate::permissions::infrastructure;
use crate::store::ResourceAccessStore;
use crate::types::{AccessLevel, FirmId, ResourceId, ResourceType, UserId};

/// Outcome of looking at a single resource's own grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectGrant {
	ExplicitDeny,
	Sufficient,
	Insufficient,
	Absent,
}

impl DirectGrant {
	fn classify(level: Option<AccessLevel>, required: AccessLevel) -> Self {
		match level {
			None => DirectGrant::Absent,
			Some(AccessLevel::None) => DirectGrant::ExplicitDeny,
			Some(level) if level.satisfies(required) => DirectGrant::Sufficient,
			Some(_) => DirectGrant::Insufficient,
		}
	}
}

#[derive(Clone)]
pub struct ResourceAccessResolver {
	store: Arc<dyn ResourceAccessStore>,
}

impl ResourceAccessResolver {
	pub fn new(store: Arc<dyn ResourceAccessStore>) -> Self {
		Self { store }
	}

	/// Whether `user_id` holds at least `min_level` on the resource.
	#[instrument(
		level = "debug",
		skip_all,
		fields(
			user_id = %user_id,
			firm_id = %firm_id,
			resource_type = %resource_type,
			resource_id = %resource_id,
			min_level = %min_level,
		)
	)]
	pub async fn has_resource_access(
		&self,
		user_id: &UserId,
		firm_id: &FirmId,
		resource_type: ResourceType,
		resource_id: &ResourceId,
		min_level: AccessLevel,
	) -> AuthzResult<bool> {
		match self
			.direct_grant(user_id, firm_id, resource_type, resource_id, min_level)
			.await?
		{
			DirectGrant::ExplicitDeny => {
				debug!("explicit deny on resource");
				return Ok(false);
			}
			DirectGrant::Sufficient => return Ok(true),
			DirectGrant::Insufficient | DirectGrant::Absent => {}
		}

		let Some((parent_type, parent_id)) = self.parent_of(firm_id, resource_type, resource_id).await? else {
			return Ok(false);
		};

		let inherited = self
			.direct_grant(user_id, firm_id, parent_type, &parent_id, min_level)
			.await?
			== DirectGrant::Sufficient;

		debug!(
			parent_type = %parent_type,
			parent_id = %parent_id,
			inherited,
			"resolved through parent resource"
		);
		Ok(inherited)
	}

	async fn direct_grant(
		&self,
		user_id: &UserId,
		firm_id: &FirmId,
		resource_type: ResourceType,
		resource_id: &ResourceId,
		min_level: AccessLevel,
	) -> AuthzResult<DirectGrant> {
		let level = self
			.store
			.get_grant(user_id, firm_id, resource_type, resource_id)
			.await
			.map_err(|e| infrastructure("resource access store", e))?;
		Ok(DirectGrant::classify(level, min_level))
	}

	/// The parent resource, for types that have one.
	async fn parent_of(
		&self,
		firm_id: &FirmId,
		resource_type: ResourceType,
		resource_id: &ResourceId,
	) -> AuthzResult<Option<(ResourceType, ResourceId)>> {
		match resource_type {
			ResourceType::Case => {
				let client_id = self
					.store
					.get_case_client_id(firm_id, resource_id)
					.await
					.map_err(|e| infrastructure("resource access store", e))?;
				Ok(client_id.map(|id| (ResourceType::Client, id)))
			}
			ResourceType::Client | ResourceType::Document | ResourceType::Firm | ResourceType::Report => {
				Ok(None)
			}
		}
	}
}
