use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = dops_api::Args::parse();

	dops_api::run(args).await
}
