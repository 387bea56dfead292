use std::process::ExitCode;

use anyhow::Context;
use lr_core::{open_platform_signal, DesktopResolver, ReaperConfig, Reconciler};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "info,lr_core=debug,lr_fs_watcher=debug,lr_known_folder=debug";

#[tokio::main]
async fn main() -> ExitCode {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr).with_target(false))
		.init();

	match run().await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{e:?}");
			ExitCode::FAILURE
		}
	}
}

async fn run() -> anyhow::Result<()> {
	let config = ReaperConfig::from_env();

	let signal = open_platform_signal().context("Unable to watch the known folder configuration")?;

	let reconciler = Reconciler::start(config, DesktopResolver, signal)
		.await
		.context("Unable to start watching the desktop")?;

	info!("Deleting shortcuts as they happen, press Ctrl-C to stop");

	tokio::signal::ctrl_c()
		.await
		.context("Unable to listen for the shutdown signal")?;

	info!("Shutting down");

	reconciler
		.shutdown()
		.await
		.context("Shortcut reaper failed while running")
}
