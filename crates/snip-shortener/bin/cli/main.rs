mod cli;

use crate::cli::{Command, LogFormat, CLI};
use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use snip_shortener::{BatchItem, Resolution, ServiceConfig, ShortId, Shortener, ShortenerService};
use snip_storage::{open_repository, StorageConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize)]
struct BatchOutput {
    correlation_id: String,
    short_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(
        storage_backend = %config.storage,
        base_url = %config.base_url,
        deleted_url_policy = %config.deleted_url_policy,
        "starting snip"
    );

    let storage = StorageConfig::builder()
        .kind(config.storage.into())
        .file_path(config.file_storage_path.clone());
    let storage = match config.database_dsn.clone() {
        Some(dsn) => storage.database_dsn(dsn).build(),
        None => storage.build(),
    };
    let repository = open_repository(&storage)
        .await
        .with_context(|| format!("failed to open {} storage", storage.kind()))?;

    let service_config = ServiceConfig::builder()
        .resolve_min_latency(Duration::from_millis(config.resolve_min_latency_ms))
        .delete_chunk_size(usize::try_from(config.delete_chunk_size).unwrap_or(usize::MAX))
        .deleted_url_policy(config.deleted_url_policy.into())
        .build();
    let service = ShortenerService::new(Arc::clone(&repository), service_config);

    let outcome = match service.health_check().await {
        Ok(()) => run(&service, &config).await,
        Err(e) => Err(e).context("storage is not healthy"),
    };

    repository.close().await;
    outcome
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

async fn run(service: &ShortenerService, config: &CLI) -> anyhow::Result<()> {
    match &config.command {
        Command::Shorten { urls } => {
            for url in urls {
                let short_id = service.shorten(url).await?;
                println!("{}", short_id.to_url(&config.base_url));
            }
        }
        Command::Batch { file } => {
            let raw = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let items: Vec<BatchItem> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a batch request", file.display()))?;

            let output: Vec<BatchOutput> = service
                .shorten_batch(items)
                .await?
                .into_iter()
                .map(|shortened| BatchOutput {
                    short_url: shortened.short_id.to_url(&config.base_url),
                    correlation_id: shortened.correlation_id,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Resolve { short_id } => {
            let deadline = Instant::now() + Duration::from_millis(config.resolve_timeout_ms);
            match service.resolve(&ShortId::new(short_id.as_str()), deadline).await {
                Resolution::Found(url) => println!("{url}"),
                Resolution::NotFound => bail!("short id {short_id} not found"),
                Resolution::Gone => bail!("short id {short_id} has been deleted"),
                Resolution::DeadlineExceeded => bail!("timed out resolving {short_id}"),
            }
        }
        Command::Delete { short_ids } => {
            let short_ids: Vec<ShortId> = short_ids.iter().map(|id| ShortId::new(id.as_str())).collect();
            let count = short_ids.len();
            service.delete_batch(short_ids).await?;
            info!(count, "deleted short ids");
        }
        Command::Ping => println!("{} ok", service.backend_name()),
    }

    Ok(())
}
