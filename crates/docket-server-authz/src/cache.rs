// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission cache.
//!
//! The engine needs only GET and SET-with-TTL on string keys (plus DELETE
//! for early invalidation). [`CacheService`] is that protocol; back ends:
//!
//! - [`InMemoryCache`]: process-local map with per-entry expiry
//! - [`NullCache`]: always misses; used when no cache is configured so the
//!   aggregator runs the same code path with or without a cache
//!
//! [`PermissionCache`] layers the key scheme (`permissions:{firm}:{user}`)
//! and JSON encoding of permission sets on top.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::StoreError;
use crate::permissions::PermissionSet;
use crate::types::{FirmId, UserId};

/// Default lifetime of a cached permission set.
pub const DEFAULT_PERMISSION_TTL: Duration = Duration::from_secs(300);

pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// String key-value cache with per-entry TTL.
#[async_trait]
pub trait CacheService: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
	async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;
	async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// A cache that stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

#[async_trait]
impl CacheService for NullCache {
	async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
		Ok(None)
	}

	async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), StoreError> {
		Ok(())
	}

	async fn delete(&self, _key: &str) -> Result<(), StoreError> {
		Ok(())
	}
}

#[derive(Debug, Clone)]
struct CacheEntry {
	value: String,
	expires_at: Instant,
}

impl CacheEntry {
	fn is_live(&self, now: Instant) -> bool {
		self.expires_at > now
	}
}

/// Process-local cache.
///
/// Expired entries are never returned. When full, expired entries are
/// purged first; if that frees nothing, the entry closest to expiry goes.
#[derive(Debug)]
pub struct InMemoryCache {
	entries: RwLock<HashMap<String, CacheEntry>>,
	max_entries: usize,
}

impl Default for InMemoryCache {
	fn default() -> Self {
		Self::new()
	}
}

impl InMemoryCache {
	pub fn new() -> Self {
		Self::with_max_entries(DEFAULT_MAX_ENTRIES)
	}

	pub fn with_max_entries(max_entries: usize) -> Self {
		Self {
			entries: RwLock::new(HashMap::new()),
			max_entries: max_entries.max(1),
		}
	}

	pub async fn len(&self) -> usize {
		self.entries.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.entries.read().await.is_empty()
	}

	fn make_room(entries: &mut HashMap<String, CacheEntry>, max_entries: usize, now: Instant) {
		if entries.len() < max_entries {
			return;
		}
		entries.retain(|_, entry| entry.is_live(now));
		if entries.len() < max_entries {
			return;
		}
		if let Some(victim) = entries
			.iter()
			.min_by_key(|(_, entry)| entry.expires_at)
			.map(|(key, _)| key.clone())
		{
			trace!(key = %victim, "evicting cache entry");
			entries.remove(&victim);
		}
	}
}

#[async_trait]
impl CacheService for InMemoryCache {
	async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		let now = Instant::now();
		{
			let entries = self.entries.read().await;
			match entries.get(key) {
				Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
				Some(_) => {}
				None => return Ok(None),
			}
		}

		let mut entries = self.entries.write().await;
		if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
			entries.remove(key);
		}
		Ok(None)
	}

	async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
		let now = Instant::now();
		let mut entries = self.entries.write().await;
		if !entries.contains_key(key) {
			Self::make_room(&mut entries, self.max_entries, now);
		}
		entries.insert(
			key.to_string(),
			CacheEntry {
				value,
				expires_at: now + ttl,
			},
		);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StoreError> {
		self.entries.write().await.remove(key);
		Ok(())
	}
}

/// Typed view over a [`CacheService`] for resolved permission sets.
#[derive(Clone)]
pub struct PermissionCache {
	service: Arc<dyn CacheService>,
	ttl: Duration,
}

impl PermissionCache {
	pub fn new(service: Arc<dyn CacheService>, ttl: Duration) -> Self {
		Self { service, ttl }
	}

	/// A cache that never hits.
	pub fn disabled() -> Self {
		Self::new(Arc::new(NullCache), DEFAULT_PERMISSION_TTL)
	}

	pub fn in_memory(ttl: Duration) -> Self {
		Self::new(Arc::new(InMemoryCache::new()), ttl)
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	pub fn key(firm_id: &FirmId, user_id: &UserId) -> String {
		format!("permissions:{firm_id}:{user_id}")
	}

	/// Look up a cached set.
	///
	/// A value that no longer decodes is reported as a miss so the caller
	/// recomputes and overwrites it.
	pub async fn get(&self, firm_id: &FirmId, user_id: &UserId) -> Result<Option<PermissionSet>, StoreError> {
		let key = Self::key(firm_id, user_id);
		let Some(raw) = self.service.get(&key).await? else {
			return Ok(None);
		};

		match serde_json::from_str::<PermissionSet>(&raw) {
			Ok(set) => Ok(Some(set)),
			Err(e) => {
				warn!(%key, error = %e, "discarding undecodable cached permission set");
				Ok(None)
			}
		}
	}

	pub async fn put(
		&self,
		firm_id: &FirmId,
		user_id: &UserId,
		permissions: &PermissionSet,
	) -> Result<(), StoreError> {
		let key = Self::key(firm_id, user_id);
		let value = serde_json::to_string(permissions)
			.map_err(|e| StoreError::Corrupt(format!("failed to encode permission set: {e}")))?;
		self.service.set(&key, value, self.ttl).await?;
		debug!(%key, ttl_secs = self.ttl.as_secs(), "permission set cached");
		Ok(())
	}

	pub async fn invalidate(&self, firm_id: &FirmId, user_id: &UserId) -> Result<(), StoreError> {
		let key = Self::key(firm_id, user_id);
		self.service.delete(&key).await?;
		debug!(%key, "permission cache entry invalidated");
		Ok(())
	}
}
