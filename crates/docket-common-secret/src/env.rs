// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loading secrets from the environment.
//!
//! A secret named `FOO` can be provided either inline as `FOO=value` or as a
//! path in `FOO_FILE=/run/secrets/foo`. Setting both is an error.

use std::path::PathBuf;

use tracing::debug;

use crate::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum SecretEnvError {
	#[error("both {name} and {name}_FILE are set; use only one")]
	Conflict { name: String },

	#[error("failed to read secret file {path} for {name}: {source}")]
	FileRead {
		name: String,
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

/// Load a secret from `name` or `name_FILE`.
///
/// Returns `Ok(None)` when neither variable is set. Trailing newlines are
/// stripped from file contents.
pub fn load_secret_env(name: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{name}_FILE");
	let inline = std::env::var(name).ok().filter(|v| !v.is_empty());
	let file = std::env::var(&file_var).ok().filter(|v| !v.is_empty());

	match (inline, file) {
		(Some(_), Some(_)) => Err(SecretEnvError::Conflict {
			name: name.to_string(),
		}),
		(Some(value), None) => {
			debug!(name, "secret loaded from environment");
			Ok(Some(SecretString::new(value)))
		}
		(None, Some(path)) => {
			let path = PathBuf::from(path);
			let content = std::fs::read_to_string(&path).map_err(|source| SecretEnvError::FileRead {
				name: name.to_string(),
				path: path.clone(),
				source,
			})?;
			debug!(name, path = %path.display(), "secret loaded from file");
			Ok(Some(SecretString::new(
				content.trim_end_matches(['\n', '\r']).to_string(),
			)))
		}
		(None, None) => Ok(None),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use std::sync::Mutex;

	static ENV_MUTEX: Mutex<()> = Mutex::new(());

	#[test]
	fn returns_none_when_unset() {
		let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
		std::env::remove_var("DOCKET_TEST_SECRET_UNSET");
		std::env::remove_var("DOCKET_TEST_SECRET_UNSET_FILE");
		assert!(load_secret_env("DOCKET_TEST_SECRET_UNSET").unwrap().is_none());
	}

	#[test]
	fn loads_inline_value() {
		let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
		std::env::set_var("DOCKET_TEST_SECRET_INLINE", "inline-value");
		let secret = load_secret_env("DOCKET_TEST_SECRET_INLINE").unwrap().unwrap();
		assert_eq!(secret.expose(), "inline-value");
		std::env::remove_var("DOCKET_TEST_SECRET_INLINE");
	}

	#[test]
	fn loads_file_value_without_trailing_newline() {
		let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "file-value").unwrap();
		std::env::set_var("DOCKET_TEST_SECRET_FROM_FILE_FILE", file.path());
		let secret = load_secret_env("DOCKET_TEST_SECRET_FROM_FILE").unwrap().unwrap();
		assert_eq!(secret.expose(), "file-value");
		std::env::remove_var("DOCKET_TEST_SECRET_FROM_FILE_FILE");
	}

	#[test]
	fn both_set_is_conflict() {
		let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
		std::env::set_var("DOCKET_TEST_SECRET_BOTH", "a");
		std::env::set_var("DOCKET_TEST_SECRET_BOTH_FILE", "/nonexistent");
		let result = load_secret_env("DOCKET_TEST_SECRET_BOTH");
		assert!(matches!(result, Err(SecretEnvError::Conflict { .. })));
		std::env::remove_var("DOCKET_TEST_SECRET_BOTH");
		std::env::remove_var("DOCKET_TEST_SECRET_BOTH_FILE");
	}
}
