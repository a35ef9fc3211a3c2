use anyhow::{Result, anyhow};
use tokio::io::AsyncWriteExt;

use feedgrab_client::{FetchConfig, FetchOutcome, Fetcher};
use feedgrab_core::AppConfig;

pub async fn run(config: &AppConfig, url: &str) -> Result<()> {
    let fetcher = Fetcher::new(FetchConfig::from(config))?;

    let body = match fetcher.fetch(url).await {
        FetchOutcome::Fetched(fetched) => fetched.bytes,
        FetchOutcome::Failed(failure) => return Err(anyhow!("{url}: {failure}")),
    };

    let mut stdout = tokio::io::stdout();
    stdout.write_all(&body).await?;
    stdout.flush().await?;
    Ok(())
}
