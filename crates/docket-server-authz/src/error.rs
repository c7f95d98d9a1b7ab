// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization failures.
//!
//! Every gate either succeeds or returns exactly one [`AuthzError`]. Mapping
//! to transport responses is the caller's job; [`AuthzError::status_code`]
//! gives the conventional mapping for HTTP callers.

use http::StatusCode;
use thiserror::Error;

use crate::types::{ResourceId, ResourceType};

/// Why an authenticated request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForbiddenReason {
	/// The effective permission set lacks this key.
	MissingPermission(String),
	/// No sufficient grant on this resource instance.
	Resource {
		resource_type: ResourceType,
		resource_id: ResourceId,
	},
	/// The row exists but belongs to another firm.
	CrossTenant {
		table: &'static str,
		resource_id: ResourceId,
	},
}

impl std::fmt::Display for ForbiddenReason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ForbiddenReason::MissingPermission(key) => write!(f, "missing permission {key}"),
			ForbiddenReason::Resource {
				resource_type,
				resource_id,
			} => write!(f, "no access to {resource_type} {resource_id}"),
			ForbiddenReason::CrossTenant { table, resource_id } => {
				write!(f, "{table} {resource_id} belongs to another firm")
			}
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
	/// No credential, or one that cannot be parsed.
	#[error("authentication required")]
	Unauthenticated,

	/// Signature did not verify or the validity window has elapsed.
	#[error("credential expired or invalid")]
	CredentialExpired,

	#[error("forbidden: {0}")]
	Forbidden(ForbiddenReason),

	/// The row does not exist. Rows of another firm surface as
	/// [`ForbiddenReason::CrossTenant`] instead.
	#[error("{table} {resource_id} not found")]
	NotFound {
		table: &'static str,
		resource_id: ResourceId,
	},

	/// A store or the cache could not be reached. Treated as a denial.
	#[error("authorization backend unavailable: {0}")]
	InfrastructureUnavailable(String),
}

pub type AuthzResult<T> = std::result::Result<T, AuthzError>;

impl AuthzError {
	pub fn missing_permission(key: impl Into<String>) -> Self {
		Self::Forbidden(ForbiddenReason::MissingPermission(key.into()))
	}

	pub fn resource_forbidden(resource_type: ResourceType, resource_id: ResourceId) -> Self {
		Self::Forbidden(ForbiddenReason::Resource {
			resource_type,
			resource_id,
		})
	}

	/// Only infrastructure failures are worth retrying.
	pub fn is_retryable(&self) -> bool {
		matches!(self, AuthzError::InfrastructureUnavailable(_))
	}

	pub fn status_code(&self) -> StatusCode {
		match self {
			AuthzError::Unauthenticated | AuthzError::CredentialExpired => StatusCode::UNAUTHORIZED,
			AuthzError::Forbidden(_) => StatusCode::FORBIDDEN,
			AuthzError::NotFound { .. } => StatusCode::NOT_FOUND,
			AuthzError::InfrastructureUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
		}
	}
}

/// Failure reported by a store adapter or cache back end.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
	#[error("store unavailable: {0}")]
	Unavailable(String),

	/// A row exists but cannot be decoded into the engine's model.
	#[error("corrupt record: {0}")]
	Corrupt(String),
}

impl From<StoreError> for AuthzError {
	fn from(err: StoreError) -> Self {
		AuthzError::InfrastructureUnavailable(err.to_string())
	}
}
