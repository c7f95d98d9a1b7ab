// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Docket authorization operator tool.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use docket_cli_authz::{run, CliContext, Command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Issue credentials and run authorization checks against a Docket database.
#[derive(Parser, Debug)]
#[command(
	name = "docket-authz",
	about = "Docket authorization operator tool",
	version
)]
struct Args {
	/// Server configuration file
	#[arg(long, env = "DOCKET_SERVER_CONFIG", default_value = "/etc/docket/server.toml")]
	config: PathBuf,

	#[command(subcommand)]
	command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
	let args = Args::parse();

	let config = docket_server_config::load_config_with_file(&args.config)?;

	// Logs go to stderr so stdout carries only command output.
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	tracing::debug!(
		config = %args.config.display(),
		database = %config.database.url,
		"starting docket-authz"
	);

	let ctx = CliContext::connect(config).await?;
	let mut stdout = std::io::stdout();
	let outcome = run(args.command, &ctx, &mut stdout).await?;
	Ok(outcome.exit_code())
}
