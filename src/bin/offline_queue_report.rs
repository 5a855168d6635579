use anyhow::{Context, Result, bail};
use chrono::Utc;
use offline_sync::{
    AppConfig, ConnectionPool, ProgressSnapshot, SqliteLeaseLock, SqliteLocalStore, SyncEventBus,
    SyncQueues,
};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

#[derive(Debug, Clone)]
struct CliOptions {
    pretty: bool,
    database_url: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct FileSummary {
    id: String,
    project_id: String,
    original_name: String,
    status: &'static str,
    bytes: usize,
    uploaded_to_s3: bool,
    error: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct LockSummary {
    name: String,
    holder: String,
    expires_at_ms: i64,
    expired: bool,
}

#[derive(Debug, serde::Serialize)]
struct QueueReport {
    generated_at_ms: i64,
    database_url: String,
    snapshot: ProgressSnapshot,
    files: Vec<FileSummary>,
    lock: Option<LockSummary>,
}

fn usage() -> &'static str {
    "Usage: offline_queue_report [--database-url <url>] [--pretty]"
}

fn main() -> Result<()> {
    offline_sync::init_logging();

    let args: Vec<String> = env::args().skip(1).collect();
    let options = parse_args(args.into_iter())?;

    let config = AppConfig::from_env();
    let database_url = options
        .database_url
        .clone()
        .unwrap_or_else(|| config.database.url.clone());

    let rt = Runtime::new().context("Failed to create Tokio runtime")?;
    let report = rt.block_on(async {
        collect_report(&config, &database_url)
            .await
            .with_context(|| format!("Failed to read offline queues from {database_url}"))
    })?;

    let payload = if options.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{payload}");
    Ok(())
}

async fn collect_report(config: &AppConfig, database_url: &str) -> Result<QueueReport> {
    let pool = ConnectionPool::open_read_only(database_url).await?;

    let store = Arc::new(SqliteLocalStore::new(pool.clone()));
    let queues = SyncQueues::new(store, SyncEventBus::new(1));
    let snapshot = queues.snapshot().await?;
    let files = queues
        .files
        .all()
        .await?
        .into_iter()
        .map(|file| FileSummary {
            id: file.id.to_string(),
            project_id: file.project_id.to_string(),
            original_name: file.original_name().to_string(),
            status: file.status.as_str(),
            bytes: file.byte_size(),
            uploaded_to_s3: file.uploaded_to_s3,
            error: file.metadata.error.clone(),
        })
        .collect();

    let now = Utc::now().timestamp_millis();
    let lock = SqliteLeaseLock::new(
        pool.clone(),
        Duration::from_secs(config.sync.lock_lease_secs),
    )
    .current(&config.sync.lock_name)
    .await?
    .map(|row| LockSummary {
        name: row.name,
        holder: row.holder,
        expires_at_ms: row.expires_at,
        expired: row.expires_at <= now,
    });

    pool.close().await;
    Ok(QueueReport {
        generated_at_ms: now,
        database_url: database_url.to_string(),
        snapshot,
        files,
        lock,
    })
}

fn parse_args<I>(args: I) -> Result<CliOptions>
where
    I: IntoIterator<Item = String>,
{
    let mut pretty = false;
    let mut database_url: Option<String> = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--pretty" => {
                pretty = true;
            }
            "--database-url" => {
                let value = iter.next().ok_or_else(|| {
                    anyhow::anyhow!("--database-url requires a value\n{}", usage())
                })?;
                database_url = Some(value);
            }
            "-h" | "--help" => {
                println!("{}", usage());
                std::process::exit(0);
            }
            other => {
                bail!("Unknown argument: {other}\n{}", usage());
            }
        }
    }

    Ok(CliOptions {
        pretty,
        database_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_flags() {
        let options = parse_args(
            ["--pretty", "--database-url", "sqlite::memory:"]
                .into_iter()
                .map(String::from),
        )
        .unwrap();
        assert!(options.pretty);
        assert_eq!(options.database_url.as_deref(), Some("sqlite::memory:"));
    }

    #[test]
    fn rejects_unknown_flags_and_missing_values() {
        assert!(parse_args(["--verbose".to_string()]).is_err());
        assert!(parse_args(["--database-url".to_string()]).is_err());
    }

    #[tokio::test]
    async fn report_leaves_a_mistyped_path_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offlne.db");
        let url = format!("sqlite:{}", path.display());

        assert!(collect_report(&AppConfig::default(), &url).await.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn report_reads_an_existing_store() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("offline.db").display());
        let pool = ConnectionPool::new(&url, 1).await.unwrap();
        pool.migrate().await.unwrap();
        pool.close().await;

        let report = collect_report(&AppConfig::default(), &url).await.unwrap();

        assert_eq!(report.snapshot.total(), 0);
        assert!(report.files.is_empty());
        assert!(report.lock.is_none());
    }
}
