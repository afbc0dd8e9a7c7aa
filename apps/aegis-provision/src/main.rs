use clap::Parser;

use aegis_provision::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	aegis_provision::run(args).await
}
