use clap::Parser;

use jarvio::cli::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    jarvio::run(args).await
}
