use clap::Parser;

use aegis_indexer::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	aegis_indexer::run(args).await
}
