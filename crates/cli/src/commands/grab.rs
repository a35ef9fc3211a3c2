//! `grab`: one complete session run.
//!
//! The primary resource (usually the feed document) is fetched uncached and
//! a failure there aborts the run. Secondary resources go through the
//! session cache; a failed one is reported and skipped. Cleanup runs last.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use feedgrab_client::{CacheSession, CleanupReport};
use feedgrab_core::AppConfig;

/// Per-resource line of the run report.
#[derive(Debug, Serialize)]
struct ResourceReport {
    url: String,
    ok: bool,
    bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct GrabReport {
    session: String,
    primary: ResourceReport,
    secondary: Vec<ResourceReport>,
    cleanup: CleanupReport,
}

pub async fn run(
    config: &AppConfig, session_name: &str, primary: &str, mut secondary: Vec<String>, read_stdin: bool,
    out_dir: Option<&Path>,
) -> Result<()> {
    if read_stdin {
        secondary.extend(read_urls(BufReader::new(tokio::io::stdin())).await?);
    }

    if let Some(dir) = out_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut session = CacheSession::from_config(session_name, config)?;

    let outcome = session.get_uncached(primary).await?;
    let Some(body) = outcome.body() else {
        let reason = outcome.failure().map(|f| f.to_string()).unwrap_or_default();
        session.close();
        bail!("primary resource {primary} unavailable: {reason}");
    };
    let file = write_body(out_dir, "primary.body", body).await?;
    let primary_report = ResourceReport { url: primary.to_string(), ok: true, bytes: body.len(), file };

    let mut secondary_reports = Vec::with_capacity(secondary.len());
    for (index, url) in secondary.iter().enumerate() {
        let report = match session.get_cached(url).await? {
            Some(body) => {
                let file = write_body(out_dir, &format!("{index:04}.body"), &body).await?;
                ResourceReport { url: url.clone(), ok: true, bytes: body.len(), file }
            }
            None => {
                tracing::info!("skipping {}: no result", url);
                ResourceReport { url: url.clone(), ok: false, bytes: 0, file: None }
            }
        };
        secondary_reports.push(report);
    }

    let cleanup = session.cleanup().await?;
    session.close();

    let report = GrabReport {
        session: session_name.to_string(),
        primary: primary_report,
        secondary: secondary_reports,
        cleanup,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Read URLs one per line, skipping blank lines and `#` comments.
async fn read_urls<R: AsyncBufRead + Unpin>(reader: R) -> Result<Vec<String>> {
    let mut lines = reader.lines();
    let mut urls = Vec::new();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        urls.push(line.to_string());
    }
    Ok(urls)
}

async fn write_body(out_dir: Option<&Path>, file_name: &str, body: &[u8]) -> Result<Option<PathBuf>> {
    let Some(dir) = out_dir else {
        return Ok(None);
    };
    let path = dir.join(file_name);
    tokio::fs::write(&path, body)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(Some(path))
}
