// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite storage for the Docket authorization engine.

pub mod authz;
pub mod error;
pub mod pool;
pub mod schema;

#[cfg(test)]
mod testing;

pub use authz::AuthzRepository;
pub use error::{DbError, Result};
pub use pool::create_pool;
pub use schema::ensure_authz_schema;
