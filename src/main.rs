//! `hl7v2-dispatch`: send a directory of HL7v2 files to a Cloud Healthcare HL7v2 store.

// std
use std::sync::Arc;
// crates.io
use clap::Parser;
use color_eyre::{Result, eyre::eyre};
// self
use hl7v2_dispatch::{cli::Cli, dispatch::Dispatcher, obs, store::MessageStoreClient};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	obs::init_tracing();

	let cli = Cli::parse();
	let client = Arc::new(MessageStoreClient::new(cli.client_config()?).await?);

	tracing::info!(store = %client.address(), "Dispatching to HL7v2 store.");

	let report = Dispatcher::new(client, cli.dispatch_options()).run(&cli.root).await?;

	tracing::info!(delivered = report.delivered(), failed = report.failed(), "Dispatch finished.");

	if report.failed() > 0 {
		let total = report.outcomes.len();

		return Err(eyre!("{} of {total} messages were not delivered.", report.failed()));
	}

	Ok(())
}
