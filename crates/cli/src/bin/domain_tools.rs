use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    domain_cli::main_entry().await
}
