// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for the authorization engine.
//!
//! - **ID newtypes**: type-safe wrappers around UUIDs ([`UserId`], [`FirmId`],
//!   [`RoleId`], [`ResourceId`]) so a firm id can never be passed as a user id
//! - **Identity role**: the coarse role tag carried by a credential
//!   ([`IdentityRole`])
//! - **Resource model**: the closed set of protected resource types
//!   ([`ResourceType`]) and the totally ordered [`AccessLevel`]
//! - **Permission keys**: the catalogue of known keys in [`keys`]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}

			/// Get a reference to the inner UUID.
			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Uuid::parse_str(s).map(Self)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user.");
define_id_type!(FirmId, "Unique identifier for a firm (tenant).");
define_id_type!(RoleId, "Unique identifier for a firm-scoped role.");
define_id_type!(
	ResourceId,
	"Unique identifier for a protected resource instance (case, client, document, ...)."
);

// =============================================================================
// Identity Role
// =============================================================================

/// The coarse role tag carried in a verified credential.
///
/// `owner` and `admin` are recognised case-insensitively and bypass every
/// permission and resource check. Any other tag is kept verbatim; its actual
/// rights come from the firm membership, not from the tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityRole {
	Owner,
	Admin,
	Other(String),
}

impl IdentityRole {
	pub fn parse(tag: &str) -> Self {
		if tag.eq_ignore_ascii_case("owner") {
			IdentityRole::Owner
		} else if tag.eq_ignore_ascii_case("admin") {
			IdentityRole::Admin
		} else {
			IdentityRole::Other(tag.to_string())
		}
	}

	/// Returns true for roles that bypass all permission and resource checks.
	pub fn is_privileged(&self) -> bool {
		matches!(self, IdentityRole::Owner | IdentityRole::Admin)
	}

	pub fn as_str(&self) -> &str {
		match self {
			IdentityRole::Owner => "owner",
			IdentityRole::Admin => "admin",
			IdentityRole::Other(tag) => tag,
		}
	}
}

impl fmt::Display for IdentityRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Serialize for IdentityRole {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for IdentityRole {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let tag = String::deserialize(deserializer)?;
		Ok(IdentityRole::parse(&tag))
	}
}

// =============================================================================
// Resources
// =============================================================================

/// Error returned when parsing a resource type or access level fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseEnumError {
	pub kind: &'static str,
	pub value: String,
}

/// Types of resources that can carry per-instance access grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
	Case,
	Client,
	Document,
	Firm,
	Report,
}

impl ResourceType {
	pub fn all() -> &'static [ResourceType] {
		&[
			ResourceType::Case,
			ResourceType::Client,
			ResourceType::Document,
			ResourceType::Firm,
			ResourceType::Report,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			ResourceType::Case => "case",
			ResourceType::Client => "client",
			ResourceType::Document => "document",
			ResourceType::Firm => "firm",
			ResourceType::Report => "report",
		}
	}
}

impl fmt::Display for ResourceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ResourceType {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		ResourceType::all()
			.iter()
			.copied()
			.find(|t| t.as_str() == s)
			.ok_or_else(|| ParseEnumError {
				kind: "resource type",
				value: s.to_string(),
			})
	}
}

/// Access level on a single resource instance.
///
/// The order is total: `None < View < Edit < Manage`. A grant at one level
/// implies every lower level. `None` recorded as a grant is an explicit deny.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
	None,
	View,
	Edit,
	Manage,
}

impl AccessLevel {
	pub fn all() -> &'static [AccessLevel] {
		&[
			AccessLevel::None,
			AccessLevel::View,
			AccessLevel::Edit,
			AccessLevel::Manage,
		]
	}

	/// Returns true if a grant at this level satisfies `required`.
	///
	/// An explicit `None` grant satisfies nothing, not even a `None` requirement.
	pub fn satisfies(&self, required: AccessLevel) -> bool {
		*self != AccessLevel::None && *self >= required
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			AccessLevel::None => "none",
			AccessLevel::View => "view",
			AccessLevel::Edit => "edit",
			AccessLevel::Manage => "manage",
		}
	}
}

impl fmt::Display for AccessLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AccessLevel {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		AccessLevel::all()
			.iter()
			.copied()
			.find(|l| l.as_str() == s)
			.ok_or_else(|| ParseEnumError {
				kind: "access level",
				value: s.to_string(),
			})
	}
}

// =============================================================================
// Permission Keys
// =============================================================================

/// Known permission keys.
///
/// The engine treats keys as opaque strings; this list exists so call sites
/// do not spell them by hand.
pub mod keys {
	pub const CASES_VIEW: &str = "cases:view";
	pub const CASES_CREATE: &str = "cases:create";
	pub const CASES_EDIT: &str = "cases:edit";
	pub const CASES_DELETE: &str = "cases:delete";
	pub const CASES_VIEW_SENSITIVE: &str = "cases:view_sensitive";
	pub const CLIENTS_VIEW: &str = "clients:view";
	pub const CLIENTS_EDIT: &str = "clients:edit";
	pub const DOCUMENTS_VIEW: &str = "documents:view";
	pub const DOCUMENTS_UPLOAD: &str = "documents:upload";
	pub const HEARINGS_VIEW: &str = "hearings:view";
	pub const HEARINGS_MANAGE: &str = "hearings:manage";
	pub const BILLING_VIEW: &str = "billing:view";
	pub const BILLING_MANAGE: &str = "billing:manage";
	pub const REPORTS_VIEW: &str = "reports:view";
	pub const FIRM_SETTINGS_MANAGE: &str = "firm_settings:manage";
	pub const ROLES_MANAGE: &str = "roles:manage";
	pub const USERS_MANAGE: &str = "users:manage";

	/// Wildcards that grant every key.
	pub const WILDCARDS: &[&str] = &["*", "all"];
}
