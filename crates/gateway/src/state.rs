//! Gateway state
//!
//! Process-wide shared state: the connection pool, the live route table
//! behind its atomic reference, the schema loader, and the flattened
//! configuration the pipeline consults on every request.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use pgway_config::Config;
use pgway_schema::{RouteTable, SchemaLoader};
use tokio_postgres::config::SslMode;
use tokio_postgres::NoTls;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::info;

use crate::access_log::AccessLog;
use crate::error::{GatewayError, Result};
use crate::tls::postgres_tls;

/// Request-pipeline settings, flattened out of the config file
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub url_prefix: String,
    pub search_path: String,
    pub context_parameter_name: String,
    pub fts_function: String,
    pub statement_timeout_secs: u32,
    pub default_client_cn: String,
    pub update_forwarded_for: bool,
    pub max_body_bytes: usize,
    pub max_response_bytes: usize,
    pub filter_parameter: String,
    pub sort_parameter: String,
    pub limit_parameter: String,
    pub default_context: HashMap<String, String>,
    pub binary_formats: HashMap<String, String>,
    pub updates_channel: String,
}

impl GatewayOptions {
    fn from_config(config: &Config) -> Self {
        Self {
            url_prefix: config.http.url_prefix.clone(),
            search_path: config.postgres.search_path.clone(),
            context_parameter_name: config.postgres.context_parameter_name.clone(),
            fts_function: config.postgres.fts_function.clone(),
            statement_timeout_secs: config.postgres.statement_timeout_secs,
            default_client_cn: config.http.default_client_cn.clone(),
            update_forwarded_for: config.http.update_forwarded_for,
            max_body_bytes: config.http.max_body_bytes(),
            max_response_bytes: config.http.max_response_bytes(),
            filter_parameter: config.protocol.filter_parameter.clone(),
            sort_parameter: config.protocol.sort_parameter.clone(),
            limit_parameter: config.protocol.limit_parameter.clone(),
            default_context: config.default_context.clone(),
            binary_formats: config.binary_format_table(),
            updates_channel: config.postgres.updates_channel.clone(),
        }
    }
}

/// Shared gateway state
pub struct Gateway {
    pub options: GatewayOptions,
    pool: Pool,
    pg_config: tokio_postgres::Config,
    pg_tls: Option<MakeRustlsConnect>,
    loader: SchemaLoader,
    table: ArcSwap<RouteTable>,
    access_log: Option<AccessLog>,
}

impl Gateway {
    /// Connect to the database, open the access log, and load the initial
    /// route table. Credentials come from `PG_USER` / `PG_PASSWORD`; TCP
    /// hosts require TLS per the `[postgres]` certificate settings.
    pub async fn connect(config: &Config) -> Result<Arc<Self>> {
        let pg_tls = postgres_tls(&config.postgres)?;
        let pg_config = pg_config(config, pg_tls.is_some());

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let manager = match &pg_tls {
            Some(connector) => {
                Manager::from_config(pg_config.clone(), connector.clone(), manager_config)
            }
            None => Manager::from_config(pg_config.clone(), NoTls, manager_config),
        };
        let pool = Pool::builder(manager)
            .max_size(config.postgres.max_connections)
            .build()
            .map_err(|e| GatewayError::internal(format!("failed to create pool: {e}")))?;

        let access_log = match config.http.requests_log_file.as_str() {
            "" => None,
            path => Some(AccessLog::open(path).map_err(|e| {
                GatewayError::internal(format!("cannot open requests log '{path}': {e}"))
            })?),
        };

        let gateway = Arc::new(Self {
            options: GatewayOptions::from_config(config),
            pool,
            pg_config,
            pg_tls,
            loader: SchemaLoader {
                routes_table: config.postgres.routes_table.clone(),
                cookies_domain: config.http.cookies_domain.clone(),
                cookies_path: config.http.cookies_path.clone(),
                cookies_disable_secure: config.http.cookies_disable_secure,
            },
            table: ArcSwap::from_pointee(RouteTable::default()),
            access_log,
        });

        gateway.reload().await?;
        Ok(gateway)
    }

    /// Current route table snapshot; never blocks
    pub fn table(&self) -> Guard<Arc<RouteTable>> {
        self.table.load()
    }

    /// Check out a pooled connection
    pub async fn client(&self) -> Result<Object> {
        Ok(self.pool.get().await?)
    }

    /// Connection parameters, for the dedicated reload listener
    pub fn pg_config(&self) -> &tokio_postgres::Config {
        &self.pg_config
    }

    /// TLS connector for database connections; `None` on Unix sockets
    pub fn pg_tls(&self) -> Option<&MakeRustlsConnect> {
        self.pg_tls.as_ref()
    }

    /// The request log, when configured
    pub fn access_log(&self) -> Option<&AccessLog> {
        self.access_log.as_ref()
    }

    /// Rebuild the route table from the registry and publish it.
    ///
    /// The new table becomes visible to readers only once fully built;
    /// in-flight requests keep the snapshot they loaded.
    pub async fn reload(&self) -> Result<usize> {
        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let routes = self
            .loader
            .load_routes(&tx, &self.options.search_path)
            .await?;
        tx.rollback().await?;

        let table = RouteTable::build(routes)?;
        let count = table.len();
        self.table.store(Arc::new(table));

        info!(routes = count, "route table published");
        Ok(count)
    }

    /// Load routes without publishing, for documentation generation
    pub async fn load_routes(&self) -> Result<Vec<pgway_schema::Route>> {
        let mut client = self.client().await?;
        let tx = client.transaction().await?;
        let routes = self
            .loader
            .load_routes(&tx, &self.options.search_path)
            .await?;
        tx.rollback().await?;
        Ok(routes)
    }
}

/// Driver configuration from the config file plus credential environment
fn pg_config(config: &Config, tls: bool) -> tokio_postgres::Config {
    let user = std::env::var("PG_USER")
        .or_else(|_| std::env::var("USER"))
        .unwrap_or_else(|_| "postgres".to_string());

    let mut pg = tokio_postgres::Config::new();
    pg.host(&config.postgres.host)
        .port(config.postgres.port)
        .dbname(&config.postgres.database)
        .user(&user)
        .application_name("pgway");

    if tls {
        // no plaintext fallback on TCP hosts
        pg.ssl_mode(SslMode::Require);
    }

    if let Ok(password) = std::env::var("PG_PASSWORD") {
        pg.password(&password);
    }

    pg
}
