// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::io::Write;
use std::process::ExitCode;

use anyhow::anyhow;
use clap::{Args, Subcommand};
use docket_server_authz::{
	AccessLevel, AuthzError, FirmId, Identity, IdentityRole, OwnedTable, ResourceId, ResourceType,
	UserId,
};
use http::header::{HeaderValue, COOKIE};
use http::HeaderMap;
use tracing::{info, instrument};

use crate::context::CliContext;

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Create the authorization tables if they do not exist
	InitSchema,

	/// Sign an access (or refresh) credential for a user in a firm
	IssueToken {
		#[command(flatten)]
		subject: SubjectArgs,

		/// Issue a refresh credential instead of an access credential
		#[arg(long)]
		refresh: bool,
	},

	/// Check a global permission key
	CheckPermission {
		#[command(flatten)]
		identity: IdentityArgs,

		/// Permission key, e.g. `cases:edit`
		#[arg(long)]
		permission: String,
	},

	/// Check access to one resource instance
	CheckResource {
		#[command(flatten)]
		identity: IdentityArgs,

		/// Resource type (case, client, document, firm, report)
		#[arg(long = "type")]
		resource_type: ResourceType,

		/// Resource id
		#[arg(long)]
		id: ResourceId,

		/// Minimum access level (none, view, edit, manage)
		#[arg(long, default_value = "view")]
		level: AccessLevel,
	},

	/// Check that a row belongs to the identity's firm
	CheckOwnership {
		#[command(flatten)]
		identity: IdentityArgs,

		/// Table name (cases, clients, documents, hearings, invoices, roles)
		#[arg(long)]
		table: String,

		/// Row id
		#[arg(long)]
		id: ResourceId,
	},

	/// Print the effective permission set of a user in a firm
	EffectivePermissions {
		#[command(flatten)]
		identity: IdentityArgs,

		/// Print as a JSON array
		#[arg(long)]
		json: bool,
	},
}

/// The identity a credential is issued for.
#[derive(Debug, Clone, Args)]
pub struct SubjectArgs {
	/// User id
	#[arg(long)]
	pub user: UserId,

	/// Firm id
	#[arg(long)]
	pub firm: FirmId,

	/// Coarse role tag (owner, admin, or any other value)
	#[arg(long, default_value = "member")]
	pub role: String,
}

impl SubjectArgs {
	fn identity(&self) -> Identity {
		Identity::new(self.user, self.firm, IdentityRole::parse(&self.role))
	}
}

/// Who to run a check as: an access credential, a browser cookie header, or
/// explicit ids.
#[derive(Debug, Clone, Args)]
pub struct IdentityArgs {
	/// Access credential to verify and check as
	#[arg(long, env = "DOCKET_TOKEN", conflicts_with_all = ["user", "firm"])]
	pub token: Option<String>,

	/// Cookie header as a browser sends it; the access credential is read
	/// from the configured access cookie
	#[arg(long, conflicts_with_all = ["token", "user", "firm"])]
	pub cookie: Option<String>,

	/// User id
	#[arg(long, required_unless_present_any = ["token", "cookie"])]
	pub user: Option<UserId>,

	/// Firm id
	#[arg(long, required_unless_present_any = ["token", "cookie"])]
	pub firm: Option<FirmId>,

	/// Coarse role tag (owner, admin, or any other value)
	#[arg(long, default_value = "member")]
	pub role: String,
}

/// Result of a command, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Allowed,
	Denied,
}

impl Outcome {
	pub fn exit_code(self) -> ExitCode {
		match self {
			Outcome::Allowed => ExitCode::SUCCESS,
			Outcome::Denied => ExitCode::from(1),
		}
	}
}

/// Run one command, writing human output to `out`.
///
/// Denials are an [`Outcome`], not an error; only infrastructure failures
/// and bad invocations return `Err`.
pub async fn run(command: Command, ctx: &CliContext, out: &mut dyn Write) -> anyhow::Result<Outcome> {
	match command {
		Command::InitSchema => {
			ctx.init_schema().await?;
			writeln!(out, "authorization schema ready")?;
			Ok(Outcome::Allowed)
		}
		Command::IssueToken { subject, refresh } => issue_token(ctx, &subject, refresh, out),
		Command::CheckPermission {
			identity,
			permission,
		} => {
			let decision = match resolve_identity(ctx, &identity) {
				Ok(identity) => ctx
					.authorizer
					.require_permission(&identity, &permission)
					.await
					.map(|_| ()),
				Err(e) => Err(e),
			};
			report(decision, out)
		}
		Command::CheckResource {
			identity,
			resource_type,
			id,
			level,
		} => {
			let decision = match resolve_identity(ctx, &identity) {
				Ok(identity) => ctx
					.authorizer
					.require_resource_access(&identity, resource_type, &id, level)
					.await
					.map(|_| ()),
				Err(e) => Err(e),
			};
			report(decision, out)
		}
		Command::CheckOwnership {
			identity,
			table,
			id,
		} => {
			let table = OwnedTable::by_name(&table).ok_or_else(|| {
				let known: Vec<&str> = OwnedTable::ALL.iter().map(|t| t.table).collect();
				anyhow!("unknown table '{table}'; expected one of {}", known.join(", "))
			})?;
			let decision = match resolve_identity(ctx, &identity) {
				Ok(identity) => ctx
					.authorizer
					.require_ownership(&identity, table, &id)
					.await
					.map(|_| ()),
				Err(e) => Err(e),
			};
			report(decision, out)
		}
		Command::EffectivePermissions { identity, json } => {
			let identity = match resolve_identity(ctx, &identity) {
				Ok(identity) => identity,
				Err(e) => return report(Err(e), out),
			};
			let permissions = ctx.authorizer.effective_permissions(&identity).await?;
			if json {
				writeln!(out, "{}", serde_json::to_string(&permissions)?)?;
			} else {
				for key in permissions.iter() {
					writeln!(out, "{key}")?;
				}
			}
			Ok(Outcome::Allowed)
		}
	}
}

#[instrument(skip_all, fields(user_id = %subject.user, firm_id = %subject.firm, refresh = refresh))]
fn issue_token(
	ctx: &CliContext,
	subject: &SubjectArgs,
	refresh: bool,
	out: &mut dyn Write,
) -> anyhow::Result<Outcome> {
	let signer = ctx.signer()?;
	let identity = subject.identity();
	let issued = if refresh {
		signer.issue_refresh(&identity)?
	} else {
		signer.issue_access(&identity)?
	};

	info!(expires_at = %issued.expires_at, "credential issued");
	writeln!(out, "{}", issued.token)?;
	writeln!(out, "expires_at: {}", issued.expires_at.to_rfc3339())?;
	Ok(Outcome::Allowed)
}

fn resolve_identity(ctx: &CliContext, args: &IdentityArgs) -> Result<Identity, AuthzError> {
	if let Some(token) = &args.token {
		return verify_access(ctx, Some(token));
	}

	if let Some(cookie) = &args.cookie {
		let value = HeaderValue::from_str(cookie).map_err(|_| AuthzError::Unauthenticated)?;
		let mut headers = HeaderMap::new();
		headers.insert(COOKIE, value);
		let token = ctx.cookies().access_credential(&headers);
		return verify_access(ctx, token.as_deref());
	}

	match (args.user, args.firm) {
		(Some(user), Some(firm)) => Ok(Identity::new(user, firm, IdentityRole::parse(&args.role))),
		_ => Err(AuthzError::Unauthenticated),
	}
}

fn verify_access(ctx: &CliContext, token: Option<&str>) -> Result<Identity, AuthzError> {
	let verifier = ctx
		.verifier()
		.map_err(|e| AuthzError::InfrastructureUnavailable(e.to_string()))?;
	verifier.verify(token)
}

fn report(decision: Result<(), AuthzError>, out: &mut dyn Write) -> anyhow::Result<Outcome> {
	match decision {
		Ok(()) => {
			writeln!(out, "allowed")?;
			Ok(Outcome::Allowed)
		}
		Err(e) if e.is_retryable() => Err(e.into()),
		Err(e) => {
			writeln!(out, "denied ({}): {e}", e.status_code().as_u16())?;
			Ok(Outcome::Denied)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use docket_common_secret::SecretString;
	use docket_server_authz::{keys, Membership, ResourceAccessGrant, Role, RoleId};
	use docket_server_config::ServerConfig;

	struct Harness {
		_dir: tempfile::TempDir,
		ctx: CliContext,
	}

	async fn harness() -> Harness {
		let dir = tempfile::tempdir().unwrap();
		let mut config = ServerConfig::default();
		config.database.url = format!("sqlite:{}", dir.path().join("docket.db").display());
		config.credentials.secret = Some(SecretString::new("k".repeat(32)));

		let ctx = CliContext::connect(config).await.unwrap();
		let mut out = Vec::new();
		run(Command::InitSchema, &ctx, &mut out).await.unwrap();
		Harness { _dir: dir, ctx }
	}

	async fn seed_member(ctx: &CliContext, firm: FirmId, keys: &[&str]) -> UserId {
		let role = Role {
			id: RoleId::generate(),
			firm_id: firm,
			name: "associate".to_string(),
			permissions: Vec::new(),
		};
		ctx.repo.insert_role(&role).await.unwrap();
		for key in keys {
			ctx.repo.attach_permission(&role.id, key).await.unwrap();
		}
		let user = UserId::generate();
		ctx.repo
			.upsert_membership(&Membership {
				user_id: user,
				firm_id: firm,
				role_id: Some(role.id),
				custom_permissions: Vec::new(),
			})
			.await
			.unwrap();
		user
	}

	fn ids(user: UserId, firm: FirmId) -> IdentityArgs {
		IdentityArgs {
			token: None,
			cookie: None,
			user: Some(user),
			firm: Some(firm),
			role: "member".to_string(),
		}
	}

	async fn run_to_string(ctx: &CliContext, command: Command) -> (Outcome, String) {
		let mut out = Vec::new();
		let outcome = run(command, ctx, &mut out).await.unwrap();
		(outcome, String::from_utf8(out).unwrap())
	}

	#[tokio::test]
	async fn check_permission_reports_allow_and_deny() {
		let h = harness().await;
		let firm = FirmId::generate();
		let user = seed_member(&h.ctx, firm, &[keys::CASES_VIEW]).await;

		let (outcome, text) = run_to_string(
			&h.ctx,
			Command::CheckPermission {
				identity: ids(user, firm),
				permission: keys::CASES_VIEW.to_string(),
			},
		)
		.await;
		assert_eq!(outcome, Outcome::Allowed);
		assert_eq!(text.trim(), "allowed");

		let (outcome, text) = run_to_string(
			&h.ctx,
			Command::CheckPermission {
				identity: ids(user, firm),
				permission: keys::CASES_DELETE.to_string(),
			},
		)
		.await;
		assert_eq!(outcome, Outcome::Denied);
		assert!(text.contains("403"));
		assert!(text.contains(keys::CASES_DELETE));
	}

	#[tokio::test]
	async fn issued_token_can_be_checked() {
		let h = harness().await;
		let firm = FirmId::generate();
		let user = seed_member(&h.ctx, firm, &[keys::REPORTS_VIEW]).await;

		let (_, text) = run_to_string(
			&h.ctx,
			Command::IssueToken {
				subject: SubjectArgs {
					user,
					firm,
					role: "member".to_string(),
				},
				refresh: false,
			},
		)
		.await;
		let token = text.lines().next().unwrap().to_string();

		let (outcome, _) = run_to_string(
			&h.ctx,
			Command::CheckPermission {
				identity: IdentityArgs {
					token: Some(token),
					cookie: None,
					user: None,
					firm: None,
					role: "member".to_string(),
				},
				permission: keys::REPORTS_VIEW.to_string(),
			},
		)
		.await;
		assert_eq!(outcome, Outcome::Allowed);
	}

	#[tokio::test]
	async fn refresh_token_is_not_an_access_credential() {
		let h = harness().await;
		let firm = FirmId::generate();
		let user = seed_member(&h.ctx, firm, &[keys::REPORTS_VIEW]).await;

		let (_, text) = run_to_string(
			&h.ctx,
			Command::IssueToken {
				subject: SubjectArgs {
					user,
					firm,
					role: "owner".to_string(),
				},
				refresh: true,
			},
		)
		.await;
		let token = text.lines().next().unwrap().to_string();

		let (outcome, text) = run_to_string(
			&h.ctx,
			Command::CheckPermission {
				identity: IdentityArgs {
					token: Some(token),
					cookie: None,
					user: None,
					firm: None,
					role: "member".to_string(),
				},
				permission: keys::REPORTS_VIEW.to_string(),
			},
		)
		.await;
		assert_eq!(outcome, Outcome::Denied);
		assert!(text.contains("401"));
	}

	#[tokio::test]
	async fn check_resource_follows_client_grant() {
		let h = harness().await;
		let firm = FirmId::generate();
		let user = seed_member(&h.ctx, firm, &[]).await;
		let client = ResourceId::generate();
		let case = ResourceId::generate();
		h.ctx.repo.insert_client(&firm, &client).await.unwrap();
		h.ctx.repo.insert_case(&firm, &case, Some(&client)).await.unwrap();
		h.ctx
			.repo
			.upsert_grant(&ResourceAccessGrant {
				user_id: user,
				firm_id: firm,
				resource_type: ResourceType::Client,
				resource_id: client,
				access_level: AccessLevel::View,
			})
			.await
			.unwrap();

		let check = |level| Command::CheckResource {
			identity: ids(user, firm),
			resource_type: ResourceType::Case,
			id: case,
			level,
		};
		assert_eq!(run_to_string(&h.ctx, check(AccessLevel::View)).await.0, Outcome::Allowed);
		assert_eq!(run_to_string(&h.ctx, check(AccessLevel::Edit)).await.0, Outcome::Denied);
	}

	#[tokio::test]
	async fn check_ownership_rejects_unknown_tables() {
		let h = harness().await;
		let mut out = Vec::new();
		let result = run(
			Command::CheckOwnership {
				identity: ids(UserId::generate(), FirmId::generate()),
				table: "users".to_string(),
				id: ResourceId::generate(),
			},
			&h.ctx,
			&mut out,
		)
		.await;
		assert!(result.unwrap_err().to_string().contains("unknown table"));
	}

	#[tokio::test]
	async fn check_ownership_reports_not_found() {
		let h = harness().await;
		let (outcome, text) = run_to_string(
			&h.ctx,
			Command::CheckOwnership {
				identity: ids(UserId::generate(), FirmId::generate()),
				table: "cases".to_string(),
				id: ResourceId::generate(),
			},
		)
		.await;
		assert_eq!(outcome, Outcome::Denied);
		assert!(text.contains("404"));
	}

	#[tokio::test]
	async fn effective_permissions_as_json() {
		let h = harness().await;
		let firm = FirmId::generate();
		let user = seed_member(&h.ctx, firm, &[keys::CASES_VIEW, keys::CLIENTS_VIEW]).await;

		let (_, text) = run_to_string(
			&h.ctx,
			Command::EffectivePermissions {
				identity: ids(user, firm),
				json: true,
			},
		)
		.await;
		let keys: Vec<String> = serde_json::from_str(text.trim()).unwrap();
		assert_eq!(keys, vec!["cases:view".to_string(), "clients:view".to_string()]);
	}

	#[tokio::test]
	async fn issue_token_without_secret_fails() {
		let dir = tempfile::tempdir().unwrap();
		let mut config = ServerConfig::default();
		config.database.url = format!("sqlite:{}", dir.path().join("docket.db").display());
		let ctx = CliContext::connect(config).await.unwrap();

		let mut out = Vec::new();
		let result = run(
			Command::IssueToken {
				subject: SubjectArgs {
					user: UserId::generate(),
					firm: FirmId::generate(),
					role: "member".to_string(),
				},
				refresh: false,
			},
			&ctx,
			&mut out,
		)
		.await;
		assert!(result.is_err());
	}

	#[tokio::test]
	async fn cookie_header_uses_configured_cookie_name() {
		let dir = tempfile::tempdir().unwrap();
		let mut config = ServerConfig::default();
		config.database.url = format!("sqlite:{}", dir.path().join("docket.db").display());
		config.credentials.secret = Some(SecretString::new("k".repeat(32)));
		config.credentials.access_cookie_name = "firm_session".to_string();
		let ctx = CliContext::connect(config).await.unwrap();
		run(Command::InitSchema, &ctx, &mut Vec::new()).await.unwrap();

		let firm = FirmId::generate();
		let user = seed_member(&ctx, firm, &[keys::CASES_VIEW]).await;
		let token = ctx
			.signer()
			.unwrap()
			.issue_access(&Identity::new(user, firm, IdentityRole::parse("member")))
			.unwrap()
			.token;

		let check = |cookie: String| Command::CheckPermission {
			identity: IdentityArgs {
				token: None,
				cookie: Some(cookie),
				user: None,
				firm: None,
				role: "member".to_string(),
			},
			permission: keys::CASES_VIEW.to_string(),
		};

		let (outcome, _) = run_to_string(&ctx, check(format!("theme=dark; firm_session={token}"))).await;
		assert_eq!(outcome, Outcome::Allowed);

		let (outcome, text) = run_to_string(&ctx, check(format!("docket_access={token}"))).await;
		assert_eq!(outcome, Outcome::Denied);
		assert!(text.contains("401"));
	}
}
