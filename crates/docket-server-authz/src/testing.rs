// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory store for engine tests.
//!
//! Implements every store trait over plain maps, counts reads so tests can
//! assert how often the engine hit the store, and can be switched into an
//! "unavailable" mode to exercise fail-closed behaviour.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::{Membership, OwnedTable, OwnershipStore, PermissionStore, ResourceAccessStore, Role};
use crate::types::{AccessLevel, FirmId, ResourceId, ResourceType, RoleId, UserId};

type GrantKey = (UserId, FirmId, ResourceType, ResourceId);

#[derive(Default)]
struct State {
	memberships: HashMap<(UserId, FirmId), Membership>,
	roles: HashMap<RoleId, Role>,
	role_keys: HashMap<RoleId, Vec<String>>,
	grants: HashMap<GrantKey, AccessLevel>,
	case_clients: HashMap<(FirmId, ResourceId), ResourceId>,
	owned_rows: HashMap<(&'static str, ResourceId), FirmId>,
}

#[derive(Default)]
pub struct InMemoryAuthzStore {
	state: Mutex<State>,
	unavailable: AtomicBool,
	membership_reads: AtomicUsize,
	role_reads: AtomicUsize,
	role_key_reads: AtomicUsize,
	grant_reads: AtomicUsize,
	parent_reads: AtomicUsize,
}

impl InMemoryAuthzStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn state(&self) -> std::sync::MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(|e| e.into_inner())
	}

	fn check_available(&self) -> Result<(), StoreError> {
		if self.unavailable.load(Ordering::SeqCst) {
			return Err(StoreError::Unavailable("in-memory store switched off".to_string()));
		}
		Ok(())
	}

	/// Insert or replace the membership for its (user, firm) pair.
	pub fn insert_membership(&self, membership: Membership) {
		self
			.state()
			.memberships
			.insert((membership.user_id, membership.firm_id), membership);
	}

	pub fn insert_role(&self, role: Role) {
		self.state().roles.insert(role.id, role);
	}

	/// Replace the join-table rows of a role.
	pub fn set_role_permission_keys(&self, role_id: RoleId, keys: &[&str]) {
		self
			.state()
			.role_keys
			.insert(role_id, keys.iter().map(|k| k.to_string()).collect());
	}

	pub fn insert_grant(
		&self,
		user_id: UserId,
		firm_id: FirmId,
		resource_type: ResourceType,
		resource_id: ResourceId,
		level: AccessLevel,
	) {
		self
			.state()
			.grants
			.insert((user_id, firm_id, resource_type, resource_id), level);
	}

	pub fn set_case_client(&self, firm_id: FirmId, case_id: ResourceId, client_id: ResourceId) {
		self.state().case_clients.insert((firm_id, case_id), client_id);
	}

	pub fn insert_owned_row(&self, table: OwnedTable, resource_id: ResourceId, firm_id: FirmId) {
		self
			.state()
			.owned_rows
			.insert((table.table, resource_id), firm_id);
	}

	pub fn set_unavailable(&self, unavailable: bool) {
		self.unavailable.store(unavailable, Ordering::SeqCst);
	}

	pub fn membership_reads(&self) -> usize {
		self.membership_reads.load(Ordering::SeqCst)
	}

	pub fn role_reads(&self) -> usize {
		self.role_reads.load(Ordering::SeqCst)
	}

	pub fn role_key_reads(&self) -> usize {
		self.role_key_reads.load(Ordering::SeqCst)
	}

	pub fn grant_reads(&self) -> usize {
		self.grant_reads.load(Ordering::SeqCst)
	}

	pub fn parent_reads(&self) -> usize {
		self.parent_reads.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl PermissionStore for InMemoryAuthzStore {
	async fn get_membership(
		&self,
		user_id: &UserId,
		firm_id: &FirmId,
	) -> Result<Option<Membership>, StoreError> {
		self.membership_reads.fetch_add(1, Ordering::SeqCst);
		self.check_available()?;
		Ok(self.state().memberships.get(&(*user_id, *firm_id)).cloned())
	}

	async fn list_role_permission_keys(
		&self,
		firm_id: &FirmId,
		role_id: &RoleId,
	) -> Result<Vec<String>, StoreError> {
		self.role_key_reads.fetch_add(1, Ordering::SeqCst);
		self.check_available()?;
		let state = self.state();
		if !state.roles.get(role_id).is_some_and(|r| r.firm_id == *firm_id) {
			return Ok(Vec::new());
		}
		Ok(state.role_keys.get(role_id).cloned().unwrap_or_default())
	}

	async fn get_role(&self, firm_id: &FirmId, role_id: &RoleId) -> Result<Option<Role>, StoreError> {
		self.role_reads.fetch_add(1, Ordering::SeqCst);
		self.check_available()?;
		Ok(self
			.state()
			.roles
			.get(role_id)
			.filter(|r| r.firm_id == *firm_id)
			.cloned())
	}
}

#[async_trait]
impl ResourceAccessStore for InMemoryAuthzStore {
	async fn get_grant(
		&self,
		user_id: &UserId,
		firm_id: &FirmId,
		resource_type: ResourceType,
		resource_id: &ResourceId,
	) -> Result<Option<AccessLevel>, StoreError> {
		self.grant_reads.fetch_add(1, Ordering::SeqCst);
		self.check_available()?;
		Ok(self
			.state()
			.grants
			.get(&(*user_id, *firm_id, resource_type, *resource_id))
			.copied())
	}

	async fn get_case_client_id(
		&self,
		firm_id: &FirmId,
		case_id: &ResourceId,
	) -> Result<Option<ResourceId>, StoreError> {
		self.parent_reads.fetch_add(1, Ordering::SeqCst);
		self.check_available()?;
		Ok(self.state().case_clients.get(&(*firm_id, *case_id)).copied())
	}
}

#[async_trait]
impl OwnershipStore for InMemoryAuthzStore {
	async fn get_owning_firm(
		&self,
		table: OwnedTable,
		resource_id: &ResourceId,
	) -> Result<Option<FirmId>, StoreError> {
		self.check_available()?;
		Ok(self.state().owned_rows.get(&(table.table, *resource_id)).copied())
	}
}
