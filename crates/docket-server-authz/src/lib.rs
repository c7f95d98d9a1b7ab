// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization resolution for Docket.
//!
//! This crate provides:
//! - Credential verification ([`IdentityVerifier`]) and issuance ([`CredentialSigner`])
//! - Effective permission aggregation with a TTL cache ([`PermissionAggregator`])
//! - Per-resource grant resolution with case→client inheritance ([`ResourceAccessResolver`])
//! - The enforcement gates ([`Authorizer`])
//!
//! Stores are traits ([`PermissionStore`], [`ResourceAccessStore`],
//! [`OwnershipStore`]); `docket-server-db` implements them over SQLite.
//!
//! # Usage
//!
//! ```ignore
//! let identity = verifier.verify(extract_access_credential(&headers).as_deref())?;
//! authorizer
//! 	.require_ownership(&identity, OwnedTable::CASES, &case_id)
//! 	.await?;
//! authorizer.require_permission(&identity, keys::CASES_EDIT).await?;
//! authorizer
//! 	.require_resource_access(&identity, ResourceType::Case, &case_id, AccessLevel::Edit)
//! 	.await?;
//! ```

pub mod cache;
pub mod credentials;
pub mod error;
pub mod gates;
pub mod identity;
pub mod permissions;
pub mod resource;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cache::{CacheService, InMemoryCache, NullCache, PermissionCache, DEFAULT_PERMISSION_TTL};
pub use credentials::{
	extract_access_credential, extract_access_credential_with_cookie, extract_bearer_token,
	extract_cookie, extract_refresh_credential, extract_refresh_credential_with_cookie,
	CredentialCookies, ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME,
};
pub use error::{AuthzError, AuthzResult, ForbiddenReason, StoreError};
pub use gates::Authorizer;
pub use identity::{CredentialKind, CredentialSigner, Identity, IdentityVerifier, IssuedCredential};
pub use permissions::{PermissionAggregator, PermissionSet, RolePermissions};
pub use resource::ResourceAccessResolver;
pub use store::{
	Membership, OwnedTable, OwnershipStore, PermissionStore, ResourceAccessGrant, ResourceAccessStore,
	Role,
};
pub use types::{keys, AccessLevel, FirmId, IdentityRole, ResourceId, ResourceType, RoleId, UserId};
