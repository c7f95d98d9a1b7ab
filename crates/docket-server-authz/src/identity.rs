// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential verification and issuance.
//!
//! Credentials are HS256 JWTs carrying the three claims the engine consumes
//! (`sub`, `firm_id`, `role`) plus a credential kind and validity window.
//!
//! ```text
//! credential ─▶ decode + verify signature ─▶ check kind/issuer/expiry ─▶ Identity
//!                   │                              │
//!                   ├── garbled ─▶ Unauthenticated  └── expired ─▶ CredentialExpired
//!                   └── bad signature ─▶ CredentialExpired
//! ```
//!
//! Verification is pure: no I/O, no clock other than `Utc::now`.

use chrono::{DateTime, Duration, Utc};
use docket_common_secret::SecretString;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{AuthzError, AuthzResult};
use crate::types::{FirmId, IdentityRole, UserId};

/// Default lifetime of an access credential (15 minutes).
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;

/// Default lifetime of a refresh credential (7 days).
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Default `iss` claim.
pub const DEFAULT_ISSUER: &str = "docket";

/// The verified caller of a request. Built per request and then discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	pub user_id: UserId,
	pub firm_id: FirmId,
	pub role: IdentityRole,
}

impl Identity {
	pub fn new(user_id: UserId, firm_id: FirmId, role: IdentityRole) -> Self {
		Self {
			user_id,
			firm_id,
			role,
		}
	}

	/// Returns true if the role tag bypasses permission and resource checks.
	pub fn is_privileged(&self) -> bool {
		self.role.is_privileged()
	}
}

/// Distinguishes short-lived access credentials from refresh credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
	Access,
	Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
	sub: UserId,
	firm_id: FirmId,
	role: IdentityRole,
	kind: CredentialKind,
	iss: String,
	iat: i64,
	exp: i64,
}

/// A freshly signed credential and the moment it stops being valid.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
	pub token: String,
	pub expires_at: DateTime<Utc>,
}

/// Signs access and refresh credentials.
#[derive(Clone)]
pub struct CredentialSigner {
	key: EncodingKey,
	issuer: String,
	access_ttl: Duration,
	refresh_ttl: Duration,
}

impl CredentialSigner {
	pub fn new(secret: &SecretString) -> Self {
		Self {
			key: EncodingKey::from_secret(secret.expose().as_bytes()),
			issuer: DEFAULT_ISSUER.to_string(),
			access_ttl: Duration::seconds(DEFAULT_ACCESS_TTL_SECS),
			refresh_ttl: Duration::seconds(DEFAULT_REFRESH_TTL_SECS),
		}
	}

	pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
		self.issuer = issuer.into();
		self
	}

	pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
		self.access_ttl = ttl;
		self
	}

	pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
		self.refresh_ttl = ttl;
		self
	}

	pub fn issue_access(&self, identity: &Identity) -> AuthzResult<IssuedCredential> {
		self.issue_at(identity, CredentialKind::Access, Utc::now())
	}

	pub fn issue_refresh(&self, identity: &Identity) -> AuthzResult<IssuedCredential> {
		self.issue_at(identity, CredentialKind::Refresh, Utc::now())
	}

	/// Sign a credential as if it were issued at `issued_at`.
	#[instrument(
		level = "debug",
		skip_all,
		fields(user_id = %identity.user_id, firm_id = %identity.firm_id, kind = ?kind)
	)]
	pub fn issue_at(
		&self,
		identity: &Identity,
		kind: CredentialKind,
		issued_at: DateTime<Utc>,
	) -> AuthzResult<IssuedCredential> {
		let ttl = match kind {
			CredentialKind::Access => self.access_ttl,
			CredentialKind::Refresh => self.refresh_ttl,
		};
		let expires_at = issued_at + ttl;

		let claims = Claims {
			sub: identity.user_id,
			firm_id: identity.firm_id,
			role: identity.role.clone(),
			kind,
			iss: self.issuer.clone(),
			iat: issued_at.timestamp(),
			exp: expires_at.timestamp(),
		};

		let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key).map_err(|e| {
			AuthzError::InfrastructureUnavailable(format!("failed to sign credential: {e}"))
		})?;

		debug!(expires_at = %expires_at, "credential issued");
		Ok(IssuedCredential { token, expires_at })
	}
}

/// Validates inbound credentials and extracts the [`Identity`].
#[derive(Clone)]
pub struct IdentityVerifier {
	key: DecodingKey,
	validation: Validation,
}

impl IdentityVerifier {
	pub fn new(secret: &SecretString) -> Self {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.set_issuer(&[DEFAULT_ISSUER]);
		validation.set_required_spec_claims(&["exp", "iss", "sub"]);
		validation.leeway = 0;

		Self {
			key: DecodingKey::from_secret(secret.expose().as_bytes()),
			validation,
		}
	}

	pub fn with_issuer(mut self, issuer: &str) -> Self {
		self.validation.set_issuer(&[issuer]);
		self
	}

	/// Allowed clock skew when checking expiry.
	pub fn with_leeway_secs(mut self, leeway: u64) -> Self {
		self.validation.leeway = leeway;
		self
	}

	/// Verify an access credential.
	///
	/// Fails with `Unauthenticated` when the credential is missing, garbled or
	/// not an access credential, and with `CredentialExpired` when the
	/// signature does not verify or the validity window has elapsed.
	#[instrument(level = "trace", skip_all, fields(present = credential.is_some()))]
	pub fn verify(&self, credential: Option<&str>) -> AuthzResult<Identity> {
		self.verify_kind(credential, CredentialKind::Access)
	}

	/// Verify a refresh credential. Access credentials are rejected.
	#[instrument(level = "trace", skip_all, fields(present = credential.is_some()))]
	pub fn verify_refresh(&self, credential: Option<&str>) -> AuthzResult<Identity> {
		self.verify_kind(credential, CredentialKind::Refresh)
	}

	fn verify_kind(&self, credential: Option<&str>, expected: CredentialKind) -> AuthzResult<Identity> {
		let token = match credential.map(str::trim) {
			Some(token) if !token.is_empty() => token,
			_ => return Err(AuthzError::Unauthenticated),
		};

		let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
			let err = classify(e.kind());
			debug!(error = %e, outcome = ?err, "credential rejected");
			err
		})?;

		if data.claims.kind != expected {
			debug!(kind = ?data.claims.kind, expected = ?expected, "credential kind mismatch");
			return Err(AuthzError::Unauthenticated);
		}

		Ok(Identity {
			user_id: data.claims.sub,
			firm_id: data.claims.firm_id,
			role: data.claims.role,
		})
	}
}

fn classify(kind: &ErrorKind) -> AuthzError {
	match kind {
		ErrorKind::InvalidSignature | ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => {
			AuthzError::CredentialExpired
		}
		_ => AuthzError::Unauthenticated,
	}
}
