//! Redis hash backend.
//!
//! Every namespace maps to one Redis hash. Commands:
//!
//! | Operation | Command |
//! |-----------|---------|
//! | list keys | `HKEYS ns` |
//! | read one | `HGET ns key` |
//! | read all | `HGETALL ns` |
//! | read matching | `HSCAN ns cursor MATCH pattern` (repeated) |
//! | insert | `HSET ns key value` |
//! | delete | `HDEL ns key` |
//!
//! # Connections
//!
//! [`ConnectionStrategy`] decides how a session gets its connection:
//!
//! - **Dial**: a fresh connection per operation, authenticated with `AUTH`
//!   when a password is set, closed when the session drops.
//! - **Shared**: one caller-owned connection reused by every operation and
//!   never closed by the store.
//! - **Pool**: a `deadpool-redis` checkout per operation, returned to the
//!   pool when the session drops.
//!
//! Use [`open`], [`open_pooled`], [`with_connection`] or [`with_pool`] to
//! build a store.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionLike, MultiplexedConnection};
use redis::{Cmd, ErrorKind, FromRedisValue, IntoConnectionInfo, RedisError, Value};
use tracing::{debug, info};

use crate::backend::{HashBackend, HashSession, ScanPage};
use crate::error::{StorageError, StorageResult};
use crate::namespace::Namespace;
use crate::store::HashStore;

pub use deadpool_redis::Pool;

/// A [`HashStore`] over Redis.
pub type RedisStore<C = MultiplexedConnection> = HashStore<RedisBackend<C>>;

/// Build a store that dials `address` for every operation.
///
/// `address` is either a `redis://` / `rediss://` URL or a bare `host:port`.
/// Nothing is dialed until the first operation.
///
/// # Errors
///
/// Returns [`StorageError::Connection`] if the address cannot be parsed.
pub fn open(
    namespace: Namespace,
    address: &str,
    password: Option<String>,
) -> StorageResult<RedisStore> {
    Ok(HashStore::new(namespace, RedisBackend::dial(address, password)?))
}

/// Build a store backed by a new pool of up to `max_size` connections to
/// `address`.
///
/// Pooled connections authenticate with `password` when they are created.
/// `wait_timeout` bounds how long an operation waits for a free connection;
/// `None` waits indefinitely.
///
/// # Errors
///
/// Returns [`StorageError::Connection`] if the address cannot be parsed or
/// the pool cannot be built.
pub fn open_pooled(
    namespace: Namespace,
    address: &str,
    password: Option<String>,
    max_size: usize,
    wait_timeout: Option<Duration>,
) -> StorageResult<RedisStore> {
    let mut info = normalize_address(address)
        .into_connection_info()
        .map_err(connection_err)?;
    if let Some(password) = password.filter(|p| !p.is_empty()) {
        info.redis.password = Some(password);
    }

    let mut config = deadpool_redis::Config::from_connection_info(info);
    let mut pool_config = deadpool_redis::PoolConfig::new(max_size.max(1));
    pool_config.timeouts.wait = wait_timeout;
    config.pool = Some(pool_config);

    let pool = config
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .map_err(connection_err)?;
    info!(address, max_size, "created redis pool");
    Ok(with_pool(namespace, pool))
}

/// Build a store that issues every command over `conn`.
///
/// The connection is cloned per operation and never closed by the store.
/// With a connection type that does not support concurrent commands, callers
/// must not run operations on the store concurrently.
#[must_use]
pub fn with_connection<C>(namespace: Namespace, conn: C) -> RedisStore<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    HashStore::new(namespace, RedisBackend::shared(conn))
}

/// Build a store that checks a connection out of `pool` per operation.
#[must_use]
pub fn with_pool(namespace: Namespace, pool: Pool) -> RedisStore {
    HashStore::new(namespace, RedisBackend::pooled(pool))
}

/// How a [`RedisBackend`] obtains the connection for one operation.
pub enum ConnectionStrategy<C> {
    /// Dial, authenticate, and close after use.
    Dial {
        /// Client holding the parsed connection info.
        client: redis::Client,
        /// Password sent with `AUTH` after dialing.
        password: Option<String>,
    },
    /// Reuse a held connection; never closed here.
    Shared(C),
    /// Check out of a pool; returned on drop.
    Pool(Pool),
}

impl<C> std::fmt::Debug for ConnectionStrategy<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dial { client, password } => f
                .debug_struct("Dial")
                .field("addr", &client.get_connection_info().addr)
                .field("has_password", &password.is_some())
                .finish(),
            Self::Shared(_) => f.write_str("Shared"),
            Self::Pool(pool) => f
                .debug_struct("Pool")
                .field("status", &pool.status())
                .finish(),
        }
    }
}

/// [`HashBackend`] speaking the Redis hash commands.
pub struct RedisBackend<C = MultiplexedConnection> {
    strategy: ConnectionStrategy<C>,
}

impl<C> std::fmt::Debug for RedisBackend<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl RedisBackend {
    /// Dial `address` per operation.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the address cannot be parsed.
    pub fn dial(address: &str, password: Option<String>) -> StorageResult<Self> {
        let client = redis::Client::open(normalize_address(address))
            .map_err(connection_err)?;
        Ok(Self {
            strategy: ConnectionStrategy::Dial {
                client,
                password: password.filter(|p| !p.is_empty()),
            },
        })
    }

    /// Check connections out of `pool`.
    #[must_use]
    pub fn pooled(pool: Pool) -> Self {
        Self {
            strategy: ConnectionStrategy::Pool(pool),
        }
    }
}

impl<C> RedisBackend<C> {
    /// Reuse `conn` for every operation.
    #[must_use]
    pub fn shared(conn: C) -> Self {
        Self {
            strategy: ConnectionStrategy::Shared(conn),
        }
    }

    /// The connection strategy in use.
    #[must_use]
    pub fn strategy(&self) -> &ConnectionStrategy<C> {
        &self.strategy
    }
}

/// Accept bare `host:port` addresses as well as URLs.
fn normalize_address(address: &str) -> String {
    if address.contains("://") || address.starts_with("unix:") {
        address.to_owned()
    } else {
        format!("redis://{address}")
    }
}

/// Wrap a dial, auth or pool failure, keeping the original error.
fn connection_err<E>(e: E) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StorageError::connection(e.to_string()).with_source(e)
}

/// Classify a Redis error, keeping its message and the error itself.
fn map_redis_err(e: RedisError) -> StorageError {
    let err = if e.is_io_error()
        || e.is_connection_refusal()
        || e.is_connection_dropped()
        || e.is_timeout()
        || e.kind() == ErrorKind::AuthenticationFailed
    {
        StorageError::connection(e.to_string())
    } else if e.kind() == ErrorKind::TypeError {
        StorageError::decode(e.to_string())
    } else {
        StorageError::command(e.to_string())
    };
    err.with_source(e)
}

#[async_trait]
impl<C> HashBackend for RedisBackend<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    type Session = RedisSession<C>;

    async fn session(&self) -> StorageResult<RedisSession<C>> {
        match &self.strategy {
            ConnectionStrategy::Shared(conn) => Ok(RedisSession::Shared(conn.clone())),
            ConnectionStrategy::Dial { client, password } => {
                let mut conn = client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(connection_err)?;
                if let Some(password) = password {
                    let _: () = redis::cmd("AUTH")
                        .arg(password)
                        .query_async(&mut conn)
                        .await
                        .map_err(connection_err)?;
                }
                debug!(addr = %client.get_connection_info().addr, "dialed redis");
                Ok(RedisSession::Dialed(conn))
            },
            ConnectionStrategy::Pool(pool) => {
                let conn = pool
                    .get()
                    .await
                    .map_err(connection_err)?;
                Ok(RedisSession::Pooled(conn))
            },
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Connection held for one operation.
///
/// Dropping a `Dialed` session closes its connection; dropping a `Pooled`
/// session returns the connection to the pool; dropping a `Shared` session
/// only drops a handle clone.
pub enum RedisSession<C> {
    /// Handle to the caller's shared connection.
    Shared(C),
    /// Connection dialed for this operation.
    Dialed(MultiplexedConnection),
    /// Connection checked out of the pool.
    Pooled(deadpool_redis::Connection),
}

impl<C> std::fmt::Debug for RedisSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Shared(_) => "Shared",
            Self::Dialed(_) => "Dialed",
            Self::Pooled(_) => "Pooled",
        };
        f.debug_tuple("RedisSession").field(&kind).finish()
    }
}

impl<C> RedisSession<C>
where
    C: ConnectionLike + Send,
{
    async fn query<T: FromRedisValue>(&mut self, cmd: &Cmd) -> StorageResult<T> {
        let result: redis::RedisResult<T> = match self {
            Self::Shared(conn) => cmd.query_async(conn).await,
            Self::Dialed(conn) => cmd.query_async(conn).await,
            Self::Pooled(conn) => cmd.query_async(conn).await,
        };
        result.map_err(map_redis_err)
    }
}

/// Decode an `HSCAN` reply: `[cursor, [field, value, ...]]`.
///
/// A nil or empty reply yields `None`.
fn decode_scan_reply(reply: &Value) -> StorageResult<Option<ScanPage>> {
    let parts = match reply {
        Value::Nil => return Ok(None),
        Value::Array(parts) if parts.is_empty() => return Ok(None),
        Value::Array(parts) => parts,
        other => {
            return Err(StorageError::decode(format!(
                "HSCAN reply is not an array: {other:?}"
            )));
        },
    };

    let [cursor, items] = parts.as_slice() else {
        return Err(StorageError::decode(format!(
            "HSCAN reply has {} elements, expected 2",
            parts.len()
        )));
    };

    let cursor: u64 = redis::from_redis_value(cursor)
        .map_err(|e| StorageError::decode(format!("HSCAN cursor: {e}")).with_source(e))?;
    let items: Vec<String> = redis::from_redis_value(items)
        .map_err(|e| StorageError::decode(format!("HSCAN items: {e}")).with_source(e))?;
    Ok(Some(ScanPage::new(cursor, items)))
}

#[async_trait]
impl<C> HashSession for RedisSession<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    async fn field_names(&mut self, bucket: &str) -> StorageResult<Vec<String>> {
        self.query(redis::cmd("HKEYS").arg(bucket)).await
    }

    async fn field(&mut self, bucket: &str, field: &str) -> StorageResult<Option<String>> {
        self.query(redis::cmd("HGET").arg(bucket).arg(field)).await
    }

    async fn all_fields(&mut self, bucket: &str) -> StorageResult<HashMap<String, String>> {
        self.query(redis::cmd("HGETALL").arg(bucket)).await
    }

    async fn scan_fields(
        &mut self,
        bucket: &str,
        cursor: u64,
        pattern: &str,
    ) -> StorageResult<Option<ScanPage>> {
        let reply: Value = self
            .query(
                redis::cmd("HSCAN")
                    .arg(bucket)
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern),
            )
            .await?;
        decode_scan_reply(&reply)
    }

    async fn set_field(&mut self, bucket: &str, field: &str, value: &str) -> StorageResult<()> {
        self.query(redis::cmd("HSET").arg(bucket).arg(field).arg(value))
            .await
    }

    async fn delete_field(&mut self, bucket: &str, field: &str) -> StorageResult<u64> {
        self.query(redis::cmd("HDEL").arg(bucket).arg(field)).await
    }
}
