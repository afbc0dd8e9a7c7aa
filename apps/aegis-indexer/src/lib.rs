use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use aegis_service::{HttpEmbeddingProvider, Providers, SearchService};
use aegis_storage::{index::EnsureIndexOutcome, store::Store};

#[derive(Debug, Parser)]
#[command(
	version = aegis_cli::VERSION,
	rename_all = "kebab",
	styles = aegis_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Wait up to this many seconds for both indexes to become queryable.
	/// Without it the command returns as soon as the builds are submitted.
	#[arg(long, value_name = "SECS")]
	pub wait_secs: Option<u64>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = aegis_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let store = Store::connect(&config.storage.mongo).await?;
	let service =
		SearchService::new(config, store, Providers { embedding: Arc::new(HttpEmbeddingProvider) });
	let report = service.ensure_indexes().await?;

	print_outcome(&report.search.0, report.search.1);
	print_outcome(&report.vector.0, report.vector.1);

	if let Some(wait_secs) = args.wait_secs {
		let not_ready = service.await_queryable(Duration::from_secs(wait_secs)).await?;

		if !not_ready.is_empty() {
			return Err(eyre::eyre!(
				"Indexes not queryable after {wait_secs}s: {}.",
				not_ready.join(", ")
			));
		}
	}

	for status in service.index_statuses().await? {
		println!(
			"{} ({}): {}{}",
			status.name,
			status.index_type,
			status.status,
			if status.queryable { ", queryable" } else { "" },
		);
	}

	Ok(())
}

fn print_outcome(name: &str, outcome: EnsureIndexOutcome) {
	match outcome {
		EnsureIndexOutcome::Created => println!("{name}: creation submitted"),
		EnsureIndexOutcome::AlreadyExists => println!("{name}: already exists"),
	}
}
