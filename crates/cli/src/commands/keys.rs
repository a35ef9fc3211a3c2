use anyhow::Result;

use feedgrab_client::CacheSession;
use feedgrab_core::AppConfig;

pub async fn run(config: &AppConfig, session_name: &str) -> Result<()> {
    let session = CacheSession::from_config(session_name, config)?;

    if !session.store_path().exists() {
        println!("[]");
        return Ok(());
    }

    let entries = session.entries().await?;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
