use crate::{Result, TestInfraError};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

const POSTGRES_PORT: u16 = 5432;
const READY_ATTEMPTS: u32 = 20;
const READY_BACKOFF: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, TypedBuilder)]
pub struct PostgresConfig {
    #[builder(default = "snip".to_string(), setter(into))]
    database: String,
    #[builder(default = "snip".to_string(), setter(into))]
    username: String,
    #[builder(default = "snip".to_string(), setter(into))]
    password: String,
    #[builder(default = 5)]
    max_connections: u32,
}

/// Disposable PostgreSQL server that only hands out pools once it accepts
/// queries.
pub struct PostgresServer {
    _container: ContainerAsync<GenericImage>,
    config: PostgresConfig,
    database_url: String,
}

impl PostgresServer {
    pub async fn new(config: PostgresConfig) -> Result<Self> {
        let container = GenericImage::new("postgres", "17-alpine")
            .with_exposed_port(POSTGRES_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_env_var("POSTGRES_DB", config.database.as_str())
            .with_env_var("POSTGRES_USER", config.username.as_str())
            .with_env_var("POSTGRES_PASSWORD", config.password.as_str())
            .start()
            .await?;

        // sqlx resolves "localhost" to ::1 first, which the port mapping may not cover.
        let host = match container.get_host().await?.to_string().as_str() {
            "localhost" => "127.0.0.1".to_string(),
            other => other.to_string(),
        };
        let port = container.get_host_port_ipv4(POSTGRES_PORT).await?;
        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            config.username, config.password, host, port, config.database
        );

        Ok(Self {
            _container: container,
            config,
            database_url,
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Opens a pool once the server answers `SELECT 1`.
    ///
    /// The image logs its readiness line during the init run as well, so the
    /// container wait alone can return while the server restarts.
    pub async fn connect(&self) -> Result<PgPool> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_connect().await {
                Ok(pool) => return Ok(pool),
                Err(source) if attempt >= READY_ATTEMPTS => {
                    return Err(TestInfraError::NotReady {
                        attempts: attempt,
                        source,
                    })
                }
                Err(_) => tokio::time::sleep(READY_BACKOFF).await,
            }
        }
    }

    async fn try_connect(&self) -> std::result::Result<PgPool, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(Duration::from_secs(2))
            .connect(&self.database_url)
            .await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(pool)
    }
}
