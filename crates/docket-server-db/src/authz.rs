// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite repository behind the authorization engine's store traits.
//!
//! Read methods back [`PermissionStore`], [`ResourceAccessStore`] and
//! [`OwnershipStore`]. The write methods exist for provisioning and tests;
//! the engine itself never calls them.

use async_trait::async_trait;
use chrono::Utc;
use docket_server_authz::{
	AccessLevel, FirmId, Membership, OwnedTable, OwnershipStore, PermissionStore, ResourceAccessGrant,
	ResourceAccessStore, ResourceId, ResourceType, Role, RoleId, StoreError, UserId,
};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::DbError;

/// Repository for memberships, roles, grants and tenant-owned rows.
#[derive(Clone)]
pub struct AuthzRepository {
	pool: SqlitePool,
}

impl AuthzRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	// =========================================================================
	// Reads
	// =========================================================================

	#[tracing::instrument(skip(self), fields(user_id = %user_id, firm_id = %firm_id))]
	pub async fn get_membership(
		&self,
		user_id: &UserId,
		firm_id: &FirmId,
	) -> Result<Option<Membership>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT user_id, firm_id, role_id, custom_permissions
			FROM firm_users
			WHERE user_id = ? AND firm_id = ?
			"#,
		)
		.bind(user_id.to_string())
		.bind(firm_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_membership(&r)).transpose()
	}

	/// Keys attached to the role through `role_permissions`, limited to roles
	/// of `firm_id`.
	#[tracing::instrument(skip(self), fields(firm_id = %firm_id, role_id = %role_id))]
	pub async fn list_role_permission_keys(
		&self,
		firm_id: &FirmId,
		role_id: &RoleId,
	) -> Result<Vec<String>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT p.key
			FROM role_permissions rp
			JOIN roles r ON r.id = rp.role_id
			JOIN permissions p ON p.id = rp.permission_id
			WHERE rp.role_id = ? AND r.firm_id = ?
			ORDER BY p.key
			"#,
		)
		.bind(role_id.to_string())
		.bind(firm_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.iter()
			.map(|r| r.try_get::<String, _>("key").map_err(DbError::from))
			.collect()
	}

	#[tracing::instrument(skip(self), fields(firm_id = %firm_id, role_id = %role_id))]
	pub async fn get_role(&self, firm_id: &FirmId, role_id: &RoleId) -> Result<Option<Role>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, firm_id, name, permissions
			FROM roles
			WHERE id = ? AND firm_id = ?
			"#,
		)
		.bind(role_id.to_string())
		.bind(firm_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_role(&r)).transpose()
	}

	#[tracing::instrument(
		skip(self),
		fields(user_id = %user_id, firm_id = %firm_id, resource_type = %resource_type, resource_id = %resource_id)
	)]
	pub async fn get_grant(
		&self,
		user_id: &UserId,
		firm_id: &FirmId,
		resource_type: ResourceType,
		resource_id: &ResourceId,
	) -> Result<Option<AccessLevel>, DbError> {
		let level: Option<String> = sqlx::query_scalar(
			r#"
			SELECT access_level
			FROM resource_access
			WHERE user_id = ? AND firm_id = ? AND resource_type = ? AND resource_id = ?
			"#,
		)
		.bind(user_id.to_string())
		.bind(firm_id.to_string())
		.bind(resource_type.as_str())
		.bind(resource_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		level
			.map(|l| {
				l.parse::<AccessLevel>()
					.map_err(|e| DbError::Internal(format!("Invalid access_level: {e}")))
			})
			.transpose()
	}

	/// The client owning a case, scoped to the firm so a case id from another
	/// tenant never resolves.
	#[tracing::instrument(skip(self), fields(firm_id = %firm_id, case_id = %case_id))]
	pub async fn get_case_client_id(
		&self,
		firm_id: &FirmId,
		case_id: &ResourceId,
	) -> Result<Option<ResourceId>, DbError> {
		let client_id: Option<Option<String>> =
			sqlx::query_scalar("SELECT client_id FROM cases WHERE id = ? AND firm_id = ?")
				.bind(case_id.to_string())
				.bind(firm_id.to_string())
				.fetch_optional(&self.pool)
				.await?;

		client_id
			.flatten()
			.map(|id| parse_uuid(&id, "client_id").map(ResourceId::new))
			.transpose()
	}

	/// Firm column of a tenant-owned row.
	///
	/// Table and column names come from [`OwnedTable`] constants, never from
	/// request input, so they are safe to splice into the statement.
	#[tracing::instrument(skip(self), fields(table = table.table, resource_id = %resource_id))]
	pub async fn get_owning_firm(
		&self,
		table: OwnedTable,
		resource_id: &ResourceId,
	) -> Result<Option<FirmId>, DbError> {
		let query = format!(
			"SELECT {} FROM {} WHERE id = ?",
			table.firm_column, table.table
		);
		let firm_id: Option<String> = sqlx::query_scalar(&query)
			.bind(resource_id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		firm_id
			.map(|id| parse_uuid(&id, table.firm_column).map(FirmId::new))
			.transpose()
	}

	// =========================================================================
	// Provisioning
	// =========================================================================

	/// Insert or replace the membership for its (user, firm) pair.
	#[tracing::instrument(skip(self, membership), fields(user_id = %membership.user_id, firm_id = %membership.firm_id))]
	pub async fn upsert_membership(&self, membership: &Membership) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		let custom = serde_json::to_string(&membership.custom_permissions)?;

		sqlx::query(
			r#"
			INSERT INTO firm_users (user_id, firm_id, role_id, custom_permissions, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?)
			ON CONFLICT (user_id, firm_id) DO UPDATE SET
				role_id = excluded.role_id,
				custom_permissions = excluded.custom_permissions,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(membership.user_id.to_string())
		.bind(membership.firm_id.to_string())
		.bind(membership.role_id.map(|id| id.to_string()))
		.bind(custom)
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[tracing::instrument(skip(self, role), fields(role_id = %role.id, firm_id = %role.firm_id))]
	pub async fn insert_role(&self, role: &Role) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO roles (id, firm_id, name, permissions, created_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(role.id.to_string())
		.bind(role.firm_id.to_string())
		.bind(&role.name)
		.bind(serde_json::to_string(&role.permissions)?)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	/// Attach a permission key to a role, creating the catalogue entry if
	/// needed. The category is the namespace before the first `:`.
	#[tracing::instrument(skip(self), fields(role_id = %role_id))]
	pub async fn attach_permission(&self, role_id: &RoleId, key: &str) -> Result<(), DbError> {
		let category = key.split_once(':').map(|(ns, _)| ns);

		let mut tx = self.pool.begin().await?;
		sqlx::query("INSERT INTO permissions (id, key, category) VALUES (?, ?, ?) ON CONFLICT (key) DO NOTHING")
			.bind(Uuid::new_v4().to_string())
			.bind(key)
			.bind(category)
			.execute(&mut *tx)
			.await?;

		let permission_id: String = sqlx::query_scalar("SELECT id FROM permissions WHERE key = ?")
			.bind(key)
			.fetch_one(&mut *tx)
			.await?;

		sqlx::query(
			"INSERT INTO role_permissions (role_id, permission_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
		)
		.bind(role_id.to_string())
		.bind(permission_id)
		.execute(&mut *tx)
		.await?;
		tx.commit().await?;

		Ok(())
	}

	/// Insert or replace a grant. A level of `none` records an explicit deny.
	#[tracing::instrument(
		skip(self, grant),
		fields(user_id = %grant.user_id, resource_type = %grant.resource_type, resource_id = %grant.resource_id)
	)]
	pub async fn upsert_grant(&self, grant: &ResourceAccessGrant) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO resource_access (user_id, firm_id, resource_type, resource_id, access_level, created_at)
			VALUES (?, ?, ?, ?, ?, ?)
			ON CONFLICT (user_id, firm_id, resource_type, resource_id) DO UPDATE SET
				access_level = excluded.access_level
			"#,
		)
		.bind(grant.user_id.to_string())
		.bind(grant.firm_id.to_string())
		.bind(grant.resource_type.as_str())
		.bind(grant.resource_id.to_string())
		.bind(grant.access_level.as_str())
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn insert_client(&self, firm_id: &FirmId, client_id: &ResourceId) -> Result<(), DbError> {
		sqlx::query("INSERT INTO clients (id, firm_id, created_at) VALUES (?, ?, ?)")
			.bind(client_id.to_string())
			.bind(firm_id.to_string())
			.bind(Utc::now().to_rfc3339())
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn insert_case(
		&self,
		firm_id: &FirmId,
		case_id: &ResourceId,
		client_id: Option<&ResourceId>,
	) -> Result<(), DbError> {
		sqlx::query("INSERT INTO cases (id, firm_id, client_id, created_at) VALUES (?, ?, ?, ?)")
			.bind(case_id.to_string())
			.bind(firm_id.to_string())
			.bind(client_id.map(|id| id.to_string()))
			.bind(Utc::now().to_rfc3339())
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	// =========================================================================
	// Row mapping
	// =========================================================================

	fn row_to_membership(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Membership, DbError> {
		let user_id: String = row.try_get("user_id")?;
		let firm_id: String = row.try_get("firm_id")?;
		let role_id: Option<String> = row.try_get("role_id")?;
		let custom: Option<String> = row.try_get("custom_permissions")?;

		Ok(Membership {
			user_id: UserId::new(parse_uuid(&user_id, "user_id")?),
			firm_id: FirmId::new(parse_uuid(&firm_id, "firm_id")?),
			role_id: role_id
				.map(|id| parse_uuid(&id, "role_id").map(RoleId::new))
				.transpose()?,
			custom_permissions: parse_keys(custom)?,
		})
	}

	fn row_to_role(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Role, DbError> {
		let id: String = row.try_get("id")?;
		let firm_id: String = row.try_get("firm_id")?;
		let permissions: Option<String> = row.try_get("permissions")?;

		Ok(Role {
			id: RoleId::new(parse_uuid(&id, "id")?),
			firm_id: FirmId::new(parse_uuid(&firm_id, "firm_id")?),
			name: row.try_get("name")?,
			permissions: parse_keys(permissions)?,
		})
	}
}

fn parse_uuid(value: &str, column: &str) -> Result<Uuid, DbError> {
	Uuid::parse_str(value).map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
}

/// JSON array column; NULL and empty text read as no keys.
fn parse_keys(value: Option<String>) -> Result<Vec<String>, DbError> {
	match value.as_deref().map(str::trim) {
		None | Some("") => Ok(Vec::new()),
		Some(json) => Ok(serde_json::from_str(json)?),
	}
}

#[async_trait]
impl PermissionStore for AuthzRepository {
	async fn get_membership(
		&self,
		user_id: &UserId,
		firm_id: &FirmId,
	) -> Result<Option<Membership>, StoreError> {
		Ok(self.get_membership(user_id, firm_id).await?)
	}

	async fn list_role_permission_keys(
		&self,
		firm_id: &FirmId,
		role_id: &RoleId,
	) -> Result<Vec<String>, StoreError> {
		Ok(self.list_role_permission_keys(firm_id, role_id).await?)
	}

	async fn get_role(&self, firm_id: &FirmId, role_id: &RoleId) -> Result<Option<Role>, StoreError> {
		Ok(self.get_role(firm_id, role_id).await?)
	}
}

#[async_trait]
impl ResourceAccessStore for AuthzRepository {
	async fn get_grant(
		&self,
		user_id: &UserId,
		firm_id: &FirmId,
		resource_type: ResourceType,
		resource_id: &ResourceId,
	) -> Result<Option<AccessLevel>, StoreError> {
		Ok(self
			.get_grant(user_id, firm_id, resource_type, resource_id)
			.await?)
	}

	async fn get_case_client_id(
		&self,
		firm_id: &FirmId,
		case_id: &ResourceId,
	) -> Result<Option<ResourceId>, StoreError> {
		Ok(self.get_case_client_id(firm_id, case_id).await?)
	}
}

#[async_trait]
impl OwnershipStore for AuthzRepository {
	async fn get_owning_firm(
		&self,
		table: OwnedTable,
		resource_id: &ResourceId,
	) -> Result<Option<FirmId>, StoreError> {
		Ok(self.get_owning_firm(table, resource_id).await?)
	}
}
