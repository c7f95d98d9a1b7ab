// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod authz;
mod credentials;
mod database;
mod logging;

pub use authz::{AuthzConfig, AuthzConfigLayer};
pub use credentials::{CredentialsConfig, CredentialsConfigLayer};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
