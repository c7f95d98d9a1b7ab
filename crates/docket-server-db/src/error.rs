// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use docket_server_authz::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Internal: {0}")]
	Internal(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Connection and query failures mean the store is unreachable; anything
/// that fails while decoding a row means the row itself is bad.
impl From<DbError> for StoreError {
	fn from(err: DbError) -> Self {
		match err {
			DbError::Sqlx(sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_)) => {
				StoreError::Corrupt(err.to_string())
			}
			DbError::Sqlx(_) | DbError::NotFound(_) => StoreError::Unavailable(err.to_string()),
			DbError::Internal(_) | DbError::Serialization(_) => StoreError::Corrupt(err.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pool_failures_are_unavailable() {
		let err: StoreError = DbError::Sqlx(sqlx::Error::PoolTimedOut).into();
		assert!(matches!(err, StoreError::Unavailable(_)));
	}

	#[test]
	fn bad_rows_are_corrupt() {
		let err: StoreError = DbError::Internal("Invalid user_id".to_string()).into();
		assert!(matches!(err, StoreError::Corrupt(_)));

		let json = serde_json::from_str::<Vec<String>>("{").unwrap_err();
		let err: StoreError = DbError::Serialization(json).into();
		assert!(matches!(err, StoreError::Corrupt(_)));
	}
}
