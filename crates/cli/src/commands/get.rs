use anyhow::{Result, bail};
use tokio::io::AsyncWriteExt;

use feedgrab_client::CacheSession;
use feedgrab_core::AppConfig;

pub async fn run(config: &AppConfig, session_name: &str, url: &str) -> Result<()> {
    let mut session = CacheSession::from_config(session_name, config)?;
    let body = session.get_cached(url).await?;
    session.close();

    let Some(body) = body else {
        bail!("no result for {url}");
    };

    let mut stdout = tokio::io::stdout();
    stdout.write_all(&body).await?;
    stdout.flush().await?;
    Ok(())
}
