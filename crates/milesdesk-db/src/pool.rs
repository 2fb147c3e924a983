//! # Database Pool Management
//!
//! Opens the SQLite pool that every repository and the conversion service
//! share.
//!
//! ## Writers and the Lock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Agent A: "Convert to sale"          Agent B: "Convert to sale"         │
//! │       │                                    │                            │
//! │       ▼                                    ▼                            │
//! │  BEGIN; INSERT sale ──► holds the      BEGIN; INSERT sale               │
//! │       │                 write lock          │                           │
//! │       │                                     ▼                           │
//! │       │                              waits up to busy_timeout           │
//! │       ▼                                     │                           │
//! │  UPDATE quote ... IS NULL; COMMIT ──────────┤                           │
//! │                                             ▼                           │
//! │                              UNIQUE(quote_id) fails → already converted │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! WAL lets quote screens keep reading while a conversion writes. SQLite
//! still allows one writer at a time, so `busy_timeout` decides how long a
//! losing writer waits before the attempt surfaces as "database is locked"
//! instead of the typed duplicate.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::conversion::ConversionService;
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::interest::InterestConfigRepository;
use crate::repository::quote::QuoteRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::ticket::TicketRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/srv/milesdesk/milesdesk.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DbConfig {
    /// SQLite file, created on first connect. `:memory:` for tests.
    pub database_path: PathBuf,

    /// Default: 5
    pub max_connections: u32,

    /// How long to wait for a free pooled connection.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// How long a writer waits for another writer to commit.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Private in-memory database on a single connection.
    ///
    /// Every connection to `:memory:` opens a separate database, so code
    /// running inside a transaction must use the transaction, never the
    /// pool, or it waits forever.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };

        Ok(options
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the pool. Cheap to clone; repositories are created on demand.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, applies pending migrations.
    ///
    /// File databases run in WAL mode. The in-memory pool never retires its
    /// only connection, since closing it would drop the data.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Opening database"
        );

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout);
        if config.is_in_memory() {
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Database pool created");

        if config.run_migrations {
            migrations::run_migrations(&pool).await?;
            info!("Migrations applied");
        }

        Ok(Database { pool })
    }

    /// Raw pool, for callers with a query no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn quotes(&self) -> QuoteRepository {
        QuoteRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn tickets(&self) -> TicketRepository {
        TicketRepository::new(self.pool.clone())
    }

    /// Card surcharge table.
    pub fn interest_configs(&self) -> InterestConfigRepository {
        InterestConfigRepository::new(self.pool.clone())
    }

    /// Quote → sale conversion with the convert-once guard.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let outcome = db
    ///     .conversions()
    ///     .convert_quote(&quote_id, &ConversionOptions::default())
    ///     .await?;
    /// ```
    pub fn conversions(&self) -> ConversionService {
        ConversionService::new(self.pool.clone())
    }

    /// Closes the pool. Later operations fail.
    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
