use anyhow::Result;

use feedgrab_client::{CacheSession, CleanupReport};
use feedgrab_core::AppConfig;

/// Cleanup with nothing requested, which empties the store.
pub async fn run(config: &AppConfig, session_name: &str) -> Result<()> {
    let report = purge(config, session_name).await?;

    if report.removed.is_empty() {
        println!("Nothing stored for {session_name}.");
    } else {
        println!("Removed {} entries from {}.", report.removed.len(), session_name);
    }
    Ok(())
}

async fn purge(config: &AppConfig, session_name: &str) -> Result<CleanupReport> {
    let mut session = CacheSession::from_config(session_name, config)?;

    // opening the store would create it
    if !session.store_path().exists() {
        session.close();
        return Ok(CleanupReport::default());
    }

    let report = session.cleanup().await?;
    session.close();
    Ok(report)
}
