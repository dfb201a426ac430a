//! Connection pooling and transactions for the SQLite store.
//!
//! The store never shares a single connection between threads. Instead a
//! pool of connections is checked out one transaction at a time; the
//! checkout is returned to the pool on every exit path because it is an
//! RAII guard. Every connection handed out by the pool has foreign keys
//! enabled, so `ON DELETE CASCADE` works for every caller.

use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// The underlying r2d2 pool type.
pub type SqlitePool = Pool<SqliteConnectionManager>;

/// Tuning knobs for the pool.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Maximum number of open connections (default: 8).
    pub max_size: u32,
    /// How long a connection waits on a locked database, in ms (default: 30000).
    pub busy_timeout_ms: u32,
    /// How long a checkout waits for a free connection (default: 5s).
    pub connection_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            busy_timeout_ms: 30_000,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

/// Where the pool's connections point.
#[derive(Clone, Debug)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Runs on every new connection before it is handed out.
#[derive(Debug)]
struct PragmaCustomizer {
    busy_timeout_ms: u32,
    wal: bool,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&format!(
            "PRAGMA busy_timeout = {};\
             PRAGMA foreign_keys = ON;",
            self.busy_timeout_ms
        ))?;
        if self.wal {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        Ok(())
    }
}

/// A pool of SQLite connections plus the transaction wrapper the store uses.
///
/// The pool can be closed and rebuilt in place (see [`ConnectionPool::reopen`]),
/// which is how a full reset removes the database file without any
/// connection still holding it open.
pub struct ConnectionPool {
    location: Location,
    config: PoolConfig,
    inner: RwLock<Option<SqlitePool>>,
}

impl ConnectionPool {
    /// Opens a file-backed pool, creating the parent directory and the
    /// database file if they don't exist yet.
    pub fn open(path: &Path, config: PoolConfig) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create storage directory {}", parent.display())
                })?;
            }
        }

        let location = Location::File(path.to_path_buf());
        let pool = Self::build(&location, &config)?;
        Ok(Self {
            location,
            config,
            inner: RwLock::new(Some(pool)),
        })
    }

    /// Opens a private in-memory database.
    ///
    /// Every in-memory connection is its own database, so the pool is
    /// capped at a single connection.
    pub fn in_memory() -> Result<Self> {
        let config = PoolConfig {
            max_size: 1,
            ..PoolConfig::default()
        };
        let location = Location::Memory;
        let pool = Self::build(&location, &config)?;
        Ok(Self {
            location,
            config,
            inner: RwLock::new(Some(pool)),
        })
    }

    /// Path of the database file, or `None` for an in-memory pool.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    fn build(location: &Location, config: &PoolConfig) -> Result<SqlitePool> {
        let (manager, wal) = match location {
            Location::File(path) => (SqliteConnectionManager::file(path), true),
            Location::Memory => (SqliteConnectionManager::memory(), false),
        };

        Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .connection_customizer(Box::new(PragmaCustomizer {
                busy_timeout_ms: config.busy_timeout_ms,
                wal,
            }))
            .build(manager)
            .context("Failed to open database connection pool")
    }

    fn read_pool(&self) -> Result<RwLockReadGuard<'_, Option<SqlitePool>>> {
        self.inner
            .read()
            .map_err(|_| anyhow!("Connection pool lock poisoned"))
    }

    /// Read access to the pool, rebuilding it first if an earlier
    /// [`ConnectionPool::reopen`] could not.
    fn open_pool(&self) -> Result<RwLockReadGuard<'_, Option<SqlitePool>>> {
        let guard = self.read_pool()?;
        if guard.is_some() {
            return Ok(guard);
        }
        drop(guard);

        {
            let mut guard = self
                .inner
                .write()
                .map_err(|_| anyhow!("Connection pool lock poisoned"))?;
            if guard.is_none() {
                tracing::info!("Rebuilding closed connection pool");
                *guard = Some(Self::build(&self.location, &self.config)?);
            }
        }

        self.read_pool()
    }

    /// Runs `work` inside a deferred transaction.
    ///
    /// Commits when `work` returns `Ok`, rolls back and returns the error
    /// unchanged when it returns `Err`.
    pub fn with_transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        self.run(TransactionBehavior::Deferred, work)
    }

    /// Runs `work` inside an immediate transaction.
    ///
    /// The write lock is taken up front, so read-then-write sequences in
    /// `work` see no interleaved writer.
    pub fn with_write_transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        self.run(TransactionBehavior::Immediate, work)
    }

    fn run<T, F>(&self, behavior: TransactionBehavior, work: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let guard = self.open_pool()?;
        let pool = guard
            .as_ref()
            .ok_or_else(|| anyhow!("Connection pool is closed"))?;

        let mut conn = pool.get().context("Failed to check out a database connection")?;
        let tx = conn.transaction_with_behavior(behavior)?;

        match work(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!("Rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    /// Closes every pooled connection, runs `between` while nothing holds
    /// the database open, then builds a fresh pool at the same location.
    ///
    /// Waits for in-flight transactions to finish first. The pool is rebuilt
    /// even when `between` fails, and `between`'s error is returned. If the
    /// rebuild itself fails, the next transaction tries again.
    pub fn reopen<F>(&self, between: F) -> Result<()>
    where
        F: FnOnce(Option<&Path>) -> Result<()>,
    {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| anyhow!("Connection pool lock poisoned"))?;

        // Dropping the pool closes its idle connections.
        drop(guard.take());

        let result = between(self.path());

        match Self::build(&self.location, &self.config) {
            Ok(pool) => *guard = Some(pool),
            Err(e) if result.is_err() => {
                tracing::warn!("Could not rebuild connection pool: {:#}", e);
            }
            Err(e) => return Err(e),
        }
        result
    }

    /// Reports whether connections from this pool enforce foreign keys.
    pub fn foreign_keys_enabled(&self) -> Result<bool> {
        self.with_transaction(|tx| {
            let enabled: i32 = tx.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
            Ok(enabled == 1)
        })
    }
}
