use clap::{Parser, Subcommand, ValueEnum};
use snip_core::BackendKind;
use snip_shortener::DeletedUrlPolicy;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const STORAGE_TYPE_ENV: &str = "SNIP_STORAGE_TYPE";
pub const FILE_STORAGE_PATH_ENV: &str = "SNIP_FILE_STORAGE_PATH";
pub const DATABASE_DSN_ENV: &str = "SNIP_DATABASE_DSN";
pub const BASE_URL_ENV: &str = "SNIP_BASE_URL";
pub const RESOLVE_MIN_LATENCY_ENV: &str = "SNIP_RESOLVE_MIN_LATENCY_MS";
pub const RESOLVE_TIMEOUT_ENV: &str = "SNIP_RESOLVE_TIMEOUT_MS";
pub const DELETE_CHUNK_SIZE_ENV: &str = "SNIP_DELETE_CHUNK_SIZE";
pub const DELETED_URL_POLICY_ENV: &str = "SNIP_DELETED_URL_POLICY";

pub const DEFAULT_FILE_STORAGE_PATH: &str = snip_storage::factory::DEFAULT_FILE_STORAGE_PATH;
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    Memory,
    File,
    Sqlite,
    Postgres,
}

impl From<StorageBackendArg> for BackendKind {
    fn from(arg: StorageBackendArg) -> Self {
        match arg {
            StorageBackendArg::Memory => BackendKind::Memory,
            StorageBackendArg::File => BackendKind::File,
            StorageBackendArg::Sqlite => BackendKind::Sqlite,
            StorageBackendArg::Postgres => BackendKind::Postgres,
        }
    }
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", BackendKind::from(*self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeletedUrlPolicyArg {
    Reuse,
    Reject,
}

impl From<DeletedUrlPolicyArg> for DeletedUrlPolicy {
    fn from(arg: DeletedUrlPolicyArg) -> Self {
        match arg {
            DeletedUrlPolicyArg::Reuse => DeletedUrlPolicy::Reuse,
            DeletedUrlPolicyArg::Reject => DeletedUrlPolicy::Reject,
        }
    }
}

impl Display for DeletedUrlPolicyArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", DeletedUrlPolicy::from(*self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "snip", about = "Shorten, resolve and delete URLs")]
pub struct CLI {
    #[arg(
        long,
        env = STORAGE_TYPE_ENV,
        value_enum,
        default_value_t = StorageBackendArg::Sqlite
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = FILE_STORAGE_PATH_ENV, default_value = DEFAULT_FILE_STORAGE_PATH)]
    pub file_storage_path: PathBuf,

    /// Connection string for the SQL backends. Defaults to a local SQLite
    /// file; required for postgres.
    #[arg(long, env = DATABASE_DSN_ENV, required_if_eq("storage", "postgres"))]
    pub database_dsn: Option<String>,

    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, env = RESOLVE_MIN_LATENCY_ENV, default_value_t = 100)]
    pub resolve_min_latency_ms: u64,

    #[arg(long, env = RESOLVE_TIMEOUT_ENV, default_value_t = 1000)]
    pub resolve_timeout_ms: u64,

    #[arg(
        long,
        env = DELETE_CHUNK_SIZE_ENV,
        default_value_t = 2,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub delete_chunk_size: u64,

    #[arg(
        long,
        env = DELETED_URL_POLICY_ENV,
        value_enum,
        default_value_t = DeletedUrlPolicyArg::Reuse
    )]
    pub deleted_url_policy: DeletedUrlPolicyArg,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shorten one or more URLs and print their short URLs.
    Shorten {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Shorten every entry of a JSON array of `{correlation_id, original_url}`.
    Batch { file: PathBuf },
    /// Print the original URL behind a short id.
    Resolve { short_id: String },
    /// Soft-delete one or more short ids.
    Delete {
        #[arg(required = true)]
        short_ids: Vec<String>,
    },
    /// Check that the storage backend is reachable.
    Ping,
}
