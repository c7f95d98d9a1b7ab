// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read-only data access the engine depends on.
//!
//! The engine never writes these records; they are managed by the admin
//! surfaces. Adapters implement the traits over a concrete store
//! (`docket-server-db` provides the SQLite implementation).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::{AccessLevel, FirmId, ResourceId, ResourceType, RoleId, UserId};

/// Binding of a user to a firm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
	pub user_id: UserId,
	pub firm_id: FirmId,
	/// `None` when the member has not been assigned a role yet.
	pub role_id: Option<RoleId>,
	/// Allow-list overlay on top of the role's permissions.
	pub custom_permissions: Vec<String>,
}

/// A firm-scoped role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
	pub id: RoleId,
	pub firm_id: FirmId,
	pub name: String,
	/// Inline permission keys from before the join table existed.
	pub permissions: Vec<String>,
}

/// A single explicit grant (or deny, when `access_level` is `None`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAccessGrant {
	pub user_id: UserId,
	pub firm_id: FirmId,
	pub resource_type: ResourceType,
	pub resource_id: ResourceId,
	pub access_level: AccessLevel,
}

/// Queries against memberships, roles and role-permission rows.
#[async_trait]
pub trait PermissionStore: Send + Sync {
	async fn get_membership(
		&self,
		user_id: &UserId,
		firm_id: &FirmId,
	) -> Result<Option<Membership>, StoreError>;

	/// Permission keys attached to the role through the join table. Empty
	/// when the role belongs to another firm.
	async fn list_role_permission_keys(
		&self,
		firm_id: &FirmId,
		role_id: &RoleId,
	) -> Result<Vec<String>, StoreError>;

	/// The role, if it exists within `firm_id`.
	async fn get_role(&self, firm_id: &FirmId, role_id: &RoleId) -> Result<Option<Role>, StoreError>;
}

/// Queries against per-resource grants and the resource hierarchy.
#[async_trait]
pub trait ResourceAccessStore: Send + Sync {
	async fn get_grant(
		&self,
		user_id: &UserId,
		firm_id: &FirmId,
		resource_type: ResourceType,
		resource_id: &ResourceId,
	) -> Result<Option<AccessLevel>, StoreError>;

	/// The client owning a case, scoped to the firm.
	async fn get_case_client_id(
		&self,
		firm_id: &FirmId,
		case_id: &ResourceId,
	) -> Result<Option<ResourceId>, StoreError>;
}

/// A table holding firm-scoped rows, paired with its firm column.
///
/// Both names are `'static` so only compile-time identifiers ever reach a
/// query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnedTable {
	pub table: &'static str,
	pub firm_column: &'static str,
}

impl OwnedTable {
	pub const CASES: OwnedTable = OwnedTable::new("cases", "firm_id");
	pub const CLIENTS: OwnedTable = OwnedTable::new("clients", "firm_id");
	pub const DOCUMENTS: OwnedTable = OwnedTable::new("documents", "firm_id");
	pub const HEARINGS: OwnedTable = OwnedTable::new("hearings", "firm_id");
	pub const INVOICES: OwnedTable = OwnedTable::new("invoices", "firm_id");
	pub const ROLES: OwnedTable = OwnedTable::new("roles", "firm_id");

	pub const ALL: &'static [OwnedTable] = &[
		OwnedTable::CASES,
		OwnedTable::CLIENTS,
		OwnedTable::DOCUMENTS,
		OwnedTable::HEARINGS,
		OwnedTable::INVOICES,
		OwnedTable::ROLES,
	];

	pub const fn new(table: &'static str, firm_column: &'static str) -> Self {
		Self { table, firm_column }
	}

	/// Look up a known table by name. Unknown names never map to a table.
	pub fn by_name(name: &str) -> Option<OwnedTable> {
		Self::ALL.iter().copied().find(|t| t.table == name)
	}
}

/// Row lookups for tenant-isolation checks.
#[async_trait]
pub trait OwnershipStore: Send + Sync {
	/// The firm owning the row, or `None` when the row does not exist.
	async fn get_owning_firm(
		&self,
		table: OwnedTable,
		resource_id: &ResourceId,
	) -> Result<Option<FirmId>, StoreError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn known_tables_resolve_by_name() {
		for table in OwnedTable::ALL {
			assert_eq!(OwnedTable::by_name(table.table), Some(*table));
			assert_eq!(table.firm_column, "firm_id");
		}
	}

	#[test]
	fn unknown_names_do_not_resolve() {
		assert_eq!(OwnedTable::by_name("users"), None);
		assert_eq!(OwnedTable::by_name("cases; DROP TABLE cases"), None);
		assert_eq!(OwnedTable::by_name("CASES"), None);
	}
}
