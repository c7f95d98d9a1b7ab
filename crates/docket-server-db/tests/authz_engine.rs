// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The authorization engine running against a SQLite database.

use std::sync::Arc;

use docket_server_authz::{
	keys, AccessLevel, Authorizer, AuthzError, FirmId, ForbiddenReason, Identity, IdentityRole,
	Membership, OwnedTable, PermissionAggregator, PermissionCache, ResourceAccessGrant,
	ResourceAccessResolver, ResourceId, ResourceType, Role, RoleId, UserId, DEFAULT_PERMISSION_TTL,
};
use docket_server_db::{create_pool, ensure_authz_schema, AuthzRepository};
use tempfile::TempDir;

struct Harness {
	_dir: TempDir,
	repo: AuthzRepository,
	authz: Authorizer,
	firm: FirmId,
}

async fn harness() -> Harness {
	let dir = tempfile::tempdir().unwrap();
	let url = format!("sqlite:{}", dir.path().join("docket.db").display());
	let pool = create_pool(&url).await.unwrap();
	ensure_authz_schema(&pool).await.unwrap();

	let repo = AuthzRepository::new(pool);
	let store = Arc::new(repo.clone());
	let authz = Authorizer::new(
		PermissionAggregator::new(store.clone(), PermissionCache::in_memory(DEFAULT_PERMISSION_TTL)),
		ResourceAccessResolver::new(store.clone()),
		store,
	);

	Harness {
		_dir: dir,
		repo,
		authz,
		firm: FirmId::generate(),
	}
}

impl Harness {
	async fn role(&self, inline: &[&str], joined: &[&str]) -> RoleId {
		let role = Role {
			id: RoleId::generate(),
			firm_id: self.firm,
			name: format!("role-{}", RoleId::generate()),
			permissions: inline.iter().map(|s| s.to_string()).collect(),
		};
		self.repo.insert_role(&role).await.unwrap();
		for key in joined {
			self.repo.attach_permission(&role.id, key).await.unwrap();
		}
		role.id
	}

	async fn member(&self, role_id: Option<RoleId>, custom: &[&str]) -> Identity {
		let identity = Identity::new(
			UserId::generate(),
			self.firm,
			IdentityRole::parse("associate"),
		);
		self
			.repo
			.upsert_membership(&Membership {
				user_id: identity.user_id,
				firm_id: self.firm,
				role_id,
				custom_permissions: custom.iter().map(|s| s.to_string()).collect(),
			})
			.await
			.unwrap();
		identity
	}

	async fn grant(&self, identity: &Identity, resource_type: ResourceType, id: ResourceId, level: AccessLevel) {
		self
			.repo
			.upsert_grant(&ResourceAccessGrant {
				user_id: identity.user_id,
				firm_id: identity.firm_id,
				resource_type,
				resource_id: id,
				access_level: level,
			})
			.await
			.unwrap();
	}
}

#[tokio::test]
async fn member_can_edit_case_through_client_grant() {
	let h = harness().await;
	let role = h.role(&[], &[keys::CASES_VIEW, keys::CASES_EDIT]).await;
	let identity = h.member(Some(role), &[]).await;

	let client = ResourceId::generate();
	let case = ResourceId::generate();
	h.repo.insert_client(&h.firm, &client).await.unwrap();
	h.repo.insert_case(&h.firm, &case, Some(&client)).await.unwrap();
	h.grant(&identity, ResourceType::Client, client, AccessLevel::Edit).await;

	h.authz
		.require_ownership(&identity, OwnedTable::CASES, &case)
		.await
		.unwrap();
	h.authz.require_permission(&identity, keys::CASES_EDIT).await.unwrap();
	h.authz
		.require_resource_access(&identity, ResourceType::Case, &case, AccessLevel::Edit)
		.await
		.unwrap();

	assert!(matches!(
		h.authz.require_permission(&identity, keys::CASES_DELETE).await,
		Err(AuthzError::Forbidden(ForbiddenReason::MissingPermission(_)))
	));
	assert!(matches!(
		h.authz
			.require_resource_access(&identity, ResourceType::Case, &case, AccessLevel::Manage)
			.await,
		Err(AuthzError::Forbidden(ForbiddenReason::Resource { .. }))
	));
}

#[tokio::test]
async fn member_with_empty_role_and_custom_view() {
	let h = harness().await;
	let role = h.role(&[], &[]).await;
	let identity = Identity::new(UserId::generate(), h.firm, IdentityRole::parse("member"));
	h.repo
		.upsert_membership(&Membership {
			user_id: identity.user_id,
			firm_id: h.firm,
			role_id: Some(role),
			custom_permissions: vec!["cases:view".to_string()],
		})
		.await
		.unwrap();

	h.authz.require_permission(&identity, "cases:view").await.unwrap();
	let err = h
		.authz
		.require_permission(&identity, "cases:edit")
		.await
		.unwrap_err();
	assert_eq!(
		err,
		AuthzError::Forbidden(ForbiddenReason::MissingPermission("cases:edit".to_string()))
	);
}

#[tokio::test]
async fn explicit_case_deny_overrides_client_manage() {
	let h = harness().await;
	let identity = h.member(None, &[]).await;
	let client = ResourceId::generate();
	let case = ResourceId::generate();
	h.repo.insert_client(&h.firm, &client).await.unwrap();
	h.repo.insert_case(&h.firm, &case, Some(&client)).await.unwrap();
	h.grant(&identity, ResourceType::Client, client, AccessLevel::Manage).await;
	h.grant(&identity, ResourceType::Case, case, AccessLevel::None).await;

	let err = h
		.authz
		.require_resource_access(&identity, ResourceType::Case, &case, AccessLevel::View)
		.await
		.unwrap_err();
	assert_eq!(err, AuthzError::resource_forbidden(ResourceType::Case, case));
}

#[tokio::test]
async fn legacy_inline_permissions_apply_only_without_join_rows() {
	let h = harness().await;
	let legacy = h.role(&[keys::BILLING_VIEW], &[]).await;
	let migrated = h.role(&[keys::BILLING_VIEW], &[keys::CASES_VIEW]).await;
	let old = h.member(Some(legacy), &[]).await;
	let new = h.member(Some(migrated), &[]).await;

	h.authz.require_permission(&old, keys::BILLING_VIEW).await.unwrap();
	assert!(h.authz.require_permission(&new, keys::BILLING_VIEW).await.is_err());
	h.authz.require_permission(&new, keys::CASES_VIEW).await.unwrap();
}

#[tokio::test]
async fn custom_permissions_extend_role() {
	let h = harness().await;
	let role = h.role(&[], &[keys::CASES_VIEW]).await;
	let identity = h.member(Some(role), &[keys::REPORTS_VIEW]).await;

	let set = h.authz.effective_permissions(&identity).await.unwrap();
	assert!(set.contains(keys::CASES_VIEW));
	assert!(set.contains(keys::REPORTS_VIEW));
	assert_eq!(set.len(), 2);
}

#[tokio::test]
async fn role_of_another_firm_is_ignored() {
	let h = harness().await;
	let foreign_role = Role {
		id: RoleId::generate(),
		firm_id: FirmId::generate(),
		name: "partner".to_string(),
		permissions: vec![keys::BILLING_VIEW.to_string()],
	};
	h.repo.insert_role(&foreign_role).await.unwrap();
	h.repo.attach_permission(&foreign_role.id, keys::CASES_VIEW).await.unwrap();
	let identity = h.member(Some(foreign_role.id), &[]).await;

	assert!(h.authz.effective_permissions(&identity).await.unwrap().is_empty());
	assert!(h.authz.require_permission(&identity, keys::CASES_VIEW).await.is_err());
}

#[tokio::test]
async fn rows_of_other_firms_are_not_reachable() {
	let h = harness().await;
	let identity = h.member(None, &[]).await;
	let foreign_firm = FirmId::generate();
	let foreign_client = ResourceId::generate();
	h.repo.insert_client(&foreign_firm, &foreign_client).await.unwrap();

	let err = h
		.authz
		.require_ownership(&identity, OwnedTable::CLIENTS, &foreign_client)
		.await
		.unwrap_err();
	assert!(matches!(
		err,
		AuthzError::Forbidden(ForbiddenReason::CrossTenant { table: "clients", .. })
	));

	let missing = ResourceId::generate();
	let err = h
		.authz
		.require_ownership(&identity, OwnedTable::CLIENTS, &missing)
		.await
		.unwrap_err();
	assert_eq!(err.status_code().as_u16(), 404);
}

#[tokio::test]
async fn foreign_case_does_not_leak_client_grant() {
	let h = harness().await;
	let identity = h.member(None, &[]).await;
	let client = ResourceId::generate();
	h.repo.insert_client(&h.firm, &client).await.unwrap();
	h.grant(&identity, ResourceType::Client, client, AccessLevel::Manage).await;

	let foreign_firm = FirmId::generate();
	let foreign_case = ResourceId::generate();
	h.repo
		.insert_case(&foreign_firm, &foreign_case, Some(&client))
		.await
		.unwrap();

	assert!(h
		.authz
		.require_resource_access(&identity, ResourceType::Case, &foreign_case, AccessLevel::View)
		.await
		.is_err());
}

#[tokio::test]
async fn cached_set_survives_membership_edit_until_invalidated() {
	let h = harness().await;
	let role = h.role(&[], &[keys::CASES_VIEW]).await;
	let identity = h.member(Some(role), &[]).await;
	h.authz.require_permission(&identity, keys::CASES_VIEW).await.unwrap();

	h.repo
		.upsert_membership(&Membership {
			user_id: identity.user_id,
			firm_id: identity.firm_id,
			role_id: None,
			custom_permissions: Vec::new(),
		})
		.await
		.unwrap();
	h.authz.require_permission(&identity, keys::CASES_VIEW).await.unwrap();

	h.authz
		.aggregator()
		.invalidate(&identity.user_id, &identity.firm_id)
		.await
		.unwrap();
	assert!(h.authz.require_permission(&identity, keys::CASES_VIEW).await.is_err());
}

#[tokio::test]
async fn privileged_roles_need_no_rows() {
	let h = harness().await;
	let admin = Identity::new(UserId::generate(), h.firm, IdentityRole::parse("ADMIN"));

	h.authz.require_permission(&admin, keys::ROLES_MANAGE).await.unwrap();
	h.authz
		.require_resource_access(&admin, ResourceType::Report, &ResourceId::generate(), AccessLevel::Manage)
		.await
		.unwrap();
}

#[tokio::test]
async fn owners_pass_ownership_on_any_row() {
	let h = harness().await;
	let foreign_case = ResourceId::generate();
	h.repo
		.insert_case(&FirmId::generate(), &foreign_case, None)
		.await
		.unwrap();
	let owner = Identity::new(UserId::generate(), h.firm, IdentityRole::parse("owner"));

	h.authz
		.require_ownership(&owner, OwnedTable::CASES, &foreign_case)
		.await
		.unwrap();
	h.authz
		.require_ownership(&owner, OwnedTable::HEARINGS, &ResourceId::generate())
		.await
		.unwrap();
}

#[tokio::test]
async fn closed_database_fails_closed() {
	let h = harness().await;
	let identity = h.member(None, &[keys::CASES_VIEW]).await;
	h.repo.pool().close().await;

	let err = h
		.authz
		.require_permission(&identity, keys::CASES_VIEW)
		.await
		.unwrap_err();
	assert!(err.is_retryable());
}
