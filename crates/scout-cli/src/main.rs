//! scout - discover the pages of a site worth auditing

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    scout_cli::run().await
}
