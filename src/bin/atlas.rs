use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = atlas_api::cli::Cli::parse();
    atlas_api::cli::run(cli).await
}
