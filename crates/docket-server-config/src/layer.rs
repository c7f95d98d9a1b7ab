// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

use crate::sections::{AuthzConfigLayer, CredentialsConfigLayer, DatabaseConfigLayer, LoggingConfigLayer};

/// Partial configuration from one source. Later layers override earlier ones
/// field by field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub credentials: Option<CredentialsConfigLayer>,
	#[serde(default)]
	pub authz: Option<AuthzConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

fn merge_section<T>(target: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	let Some(incoming) = other else {
		return;
	};
	if let Some(existing) = target.as_mut() {
		merge(existing, incoming);
	} else {
		*target = Some(incoming);
	}
}

impl ServerConfigLayer {
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.credentials, other.credentials, CredentialsConfigLayer::merge);
		merge_section(&mut self.authz, other.authz, AuthzConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn later_layer_overrides_set_fields_only() {
		let mut base: ServerConfigLayer = toml::from_str(
			r#"
			[database]
			url = "sqlite:/srv/docket.db"

			[authz]
			cache_ttl_secs = 120
			environment = "staging"
			"#,
		)
		.unwrap();

		let overlay = ServerConfigLayer {
			authz: Some(AuthzConfigLayer {
				environment: Some("production".to_string()),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(overlay);

		let authz = base.authz.unwrap();
		assert_eq!(authz.cache_ttl_secs, Some(120));
		assert_eq!(authz.environment.as_deref(), Some("production"));
		assert_eq!(base.database.unwrap().url.as_deref(), Some("sqlite:/srv/docket.db"));
	}

	#[test]
	fn empty_overlay_changes_nothing() {
		let mut base = ServerConfigLayer {
			logging: Some(LoggingConfigLayer {
				level: Some("debug".to_string()),
			}),
			..Default::default()
		};
		base.merge(ServerConfigLayer::default());
		assert_eq!(base.logging.unwrap().level.as_deref(), Some("debug"));
	}
}
