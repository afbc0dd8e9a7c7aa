use clap::Parser;

use aegis_search::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	aegis_search::run(args).await
}
