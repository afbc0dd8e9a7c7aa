use std::{path::PathBuf, sync::Arc};

use clap::{Parser, ValueEnum};
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use aegis_domain::AccessGrant;
use aegis_service::{
	HttpEmbeddingProvider, HybridSearchRequest, Providers, SearchEnvelope, SearchService,
};
use aegis_storage::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
	Hybrid,
	Lexical,
	Vector,
}

#[derive(Debug, Parser)]
#[command(
	version = aegis_cli::VERSION,
	rename_all = "kebab",
	styles = aegis_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Query text.
	#[arg(long, short = 'q')]
	pub query: String,
	/// Access grant entry, `ATTR=v1,v2,...`; repeat per attribute. No grants
	/// means an unrestricted search.
	#[arg(long, short = 'g', value_name = "ATTR=V1,V2")]
	pub grant: Vec<String>,
	#[arg(long, short = 'm', value_enum, default_value_t = Mode::Hybrid)]
	pub mode: Mode,
	/// Result count; defaults to the configured value.
	#[arg(long, short = 'k')]
	pub top_k: Option<u32>,
	/// Vector candidate pool size; defaults to the configured value.
	#[arg(long)]
	pub num_candidates: Option<u32>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = aegis_config::load(&args.config)?;

	init_tracing(&config);

	let grant = parse_grants(&args.grant)?;
	let store = Store::connect(&config.storage.mongo).await?;
	let service =
		SearchService::new(config, store, Providers { embedding: Arc::new(HttpEmbeddingProvider) });
	let envelope: SearchEnvelope = match args.mode {
		Mode::Hybrid => {
			let request = HybridSearchRequest {
				query: args.query,
				grant,
				top_k: args.top_k,
				num_candidates: args.num_candidates,
			};

			service.hybrid_search(&request).await?
		},
		Mode::Lexical => service.lexical_search(&args.query, &grant, args.top_k).await?,
		Mode::Vector =>
			service.vector_search(&args.query, &grant, args.top_k, args.num_candidates).await?,
	};

	println!("{}", serde_json::to_string_pretty(&envelope)?);

	Ok(())
}

/// Parses repeated `ATTR=v1,v2` flags into one grant. Repeating an attribute
/// unions its values.
fn parse_grants(entries: &[String]) -> color_eyre::Result<AccessGrant> {
	let mut grant = AccessGrant::new();

	for entry in entries {
		let (attribute, values) = entry
			.split_once('=')
			.ok_or_else(|| eyre::eyre!("Invalid grant `{entry}`; expected `ATTR=v1,v2`."))?;
		let attribute = attribute.trim();

		if attribute.is_empty() {
			return Err(eyre::eyre!("Invalid grant `{entry}`; attribute name is empty."));
		}

		for value in values.split(',') {
			let value = value.trim();

			if value.is_empty() {
				continue;
			}

			let value: i32 = value
				.parse()
				.map_err(|_| eyre::eyre!("Invalid grant value `{value}` in `{entry}`."))?;

			grant.require(attribute, value);
		}
	}

	Ok(grant)
}

fn init_tracing(config: &aegis_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}
