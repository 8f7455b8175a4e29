use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    sehat_cli::run().await
}
