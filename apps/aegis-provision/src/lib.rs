use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use aegis_service::{HttpEmbeddingProvider, Providers, SearchService};
use aegis_storage::store::Store;

#[derive(Debug, Parser)]
#[command(
	version = aegis_cli::VERSION,
	rename_all = "kebab",
	styles = aegis_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Actually write the assignments. Without this flag the job is a dry
	/// run: it reports the scope and prints sample assignments only.
	#[arg(long)]
	pub run: bool,
	/// Seed for reproducible assignment. Omit for a fresh random run.
	#[arg(long)]
	pub seed: Option<u64>,
	/// Sample assignments to print in dry-run mode.
	#[arg(long, default_value_t = 3)]
	pub samples: usize,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = aegis_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let store = Store::connect(&config.storage.mongo).await?;
	let service =
		SearchService::new(config, store, Providers { embedding: Arc::new(HttpEmbeddingProvider) });

	if !args.run {
		let preview = service.preview_acls(args.seed, args.samples).await?;

		println!(
			"Dry run: would assign ACLs to {} documents in {} batches of {}.",
			preview.total, preview.batches, preview.batch_size,
		);
		println!("Sample assignments:");
		println!("{}", serde_json::to_string_pretty(&preview.samples)?);
		println!("Pass --run to execute.");

		return Ok(());
	}

	let report = service.assign_acls(args.seed).await?;

	println!(
		"Assigned ACLs: {} of {} documents updated in {:.1}s.",
		report.updated,
		report.total,
		report.elapsed.as_secs_f64(),
	);

	if !report.fully_succeeded() {
		for failed in &report.failed_batches {
			tracing::error!(
				batch = failed.ordinal,
				size = failed.size,
				error = %failed.error,
				"Batch did not commit."
			);
		}

		return Err(eyre::eyre!(
			"{} of the batches failed; re-run to converge.",
			report.failed_batches.len()
		));
	}

	Ok(())
}
