// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Operator commands for the `docket-authz` binary.

pub mod commands;
pub mod context;

pub use commands::{run, Command, Outcome};
pub use context::CliContext;
