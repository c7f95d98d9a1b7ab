// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tables read by the authorization engine.
//!
//! IDs are UUIDs stored as TEXT. JSON array columns (`roles.permissions`,
//! `firm_users.custom_permissions`) hold permission keys. Every tenant-owned
//! table carries a `firm_id` column, which is what ownership checks read.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const STATEMENTS: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS firms (
		id TEXT PRIMARY KEY NOT NULL,
		name TEXT NOT NULL,
		created_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS roles (
		id TEXT PRIMARY KEY NOT NULL,
		firm_id TEXT NOT NULL,
		name TEXT NOT NULL,
		permissions TEXT NOT NULL DEFAULT '[]',
		created_at TEXT NOT NULL,
		UNIQUE (firm_id, name)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS permissions (
		id TEXT PRIMARY KEY NOT NULL,
		key TEXT NOT NULL UNIQUE,
		category TEXT
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS role_permissions (
		role_id TEXT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
		permission_id TEXT NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
		PRIMARY KEY (role_id, permission_id)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS firm_users (
		user_id TEXT NOT NULL,
		firm_id TEXT NOT NULL,
		role_id TEXT REFERENCES roles(id) ON DELETE SET NULL,
		custom_permissions TEXT NOT NULL DEFAULT '[]',
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		PRIMARY KEY (user_id, firm_id)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS resource_access (
		user_id TEXT NOT NULL,
		firm_id TEXT NOT NULL,
		resource_type TEXT NOT NULL
			CHECK (resource_type IN ('case', 'client', 'document', 'firm', 'report')),
		resource_id TEXT NOT NULL,
		access_level TEXT NOT NULL
			CHECK (access_level IN ('none', 'view', 'edit', 'manage')),
		created_at TEXT NOT NULL,
		PRIMARY KEY (user_id, firm_id, resource_type, resource_id)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS clients (
		id TEXT PRIMARY KEY NOT NULL,
		firm_id TEXT NOT NULL,
		name TEXT,
		created_at TEXT
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS cases (
		id TEXT PRIMARY KEY NOT NULL,
		firm_id TEXT NOT NULL,
		client_id TEXT REFERENCES clients(id) ON DELETE SET NULL,
		title TEXT,
		created_at TEXT
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS documents (
		id TEXT PRIMARY KEY NOT NULL,
		firm_id TEXT NOT NULL,
		case_id TEXT REFERENCES cases(id) ON DELETE CASCADE,
		name TEXT,
		created_at TEXT
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS hearings (
		id TEXT PRIMARY KEY NOT NULL,
		firm_id TEXT NOT NULL,
		case_id TEXT REFERENCES cases(id) ON DELETE CASCADE,
		scheduled_at TEXT,
		created_at TEXT
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS invoices (
		id TEXT PRIMARY KEY NOT NULL,
		firm_id TEXT NOT NULL,
		client_id TEXT REFERENCES clients(id) ON DELETE SET NULL,
		amount_cents INTEGER,
		created_at TEXT
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_role_permissions_role ON role_permissions(role_id)",
	"CREATE INDEX IF NOT EXISTS idx_firm_users_firm ON firm_users(firm_id)",
	"CREATE INDEX IF NOT EXISTS idx_cases_firm ON cases(firm_id)",
];

/// Create every table the engine reads, if missing. Idempotent.
#[tracing::instrument(skip(pool))]
pub async fn ensure_authz_schema(pool: &SqlitePool) -> Result<(), DbError> {
	let mut tx = pool.begin().await?;
	for statement in STATEMENTS {
		sqlx::query(statement).execute(&mut *tx).await?;
	}
	tx.commit().await?;

	tracing::debug!(statements = STATEMENTS.len(), "authz schema ensured");
	Ok(())
}
