//! Distributed backend over an external key-value service.
//!
//! The cache is an optimisation, never a dependency for correct reads: every
//! backend failure is logged and turned into a miss or a dropped write.

use crate::cache::EntityCache;
use redis::IntoConnectionInfo;
use repobridge_core::{Error, Result, Row, Value};
use std::io::{self, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Minimal key-value operations the distributed cache needs.
pub trait KvBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    fn exists(&self, key: &str) -> Result<bool>;

    fn delete(&self, key: &str) -> Result<()>;

    /// Delete every key starting with `prefix`. Returns how many were deleted.
    fn delete_prefix(&self, prefix: &str) -> Result<u64>;
}

/// `EntityCache` over any `KvBackend`, with rows stored as JSON.
///
/// Keys are `{prefix}:{region}:{key}`.
#[derive(Debug)]
pub struct DistributedCache<B> {
    backend: B,
    prefix: String,
    ttl: Option<Duration>,
}

impl<B: KvBackend> DistributedCache<B> {
    pub fn new(backend: B, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn region_prefix(&self, region: &str) -> String {
        format!("{}:{}:", self.prefix, region)
    }

    fn key(&self, region: &str, key: &Value) -> String {
        format!("{}{}", self.region_prefix(region), key.key_string())
    }

    fn swallow<T>(&self, op: &'static str, key: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    target: "repobridge::cache",
                    op,
                    key,
                    error = %e,
                    "Cache backend unavailable, continuing without it"
                );
                None
            }
        }
    }
}

impl<B: KvBackend> EntityCache for DistributedCache<B> {
    fn name(&self) -> &'static str {
        "distributed"
    }

    fn get(&self, region: &str, key: &Value) -> Option<Row> {
        let key = self.key(region, key);
        let raw = self.swallow("get", &key, self.backend.get(&key))??;
        match serde_json::from_str::<Row>(&raw) {
            Ok(row) => Some(row),
            Err(e) => {
                tracing::warn!(
                    target: "repobridge::cache",
                    key = %key,
                    error = %e,
                    "Undecodable cache entry, dropping it"
                );
                self.swallow("delete", &key, self.backend.delete(&key));
                None
            }
        }
    }

    fn store(&self, region: &str, key: &Value, row: Row) {
        let key = self.key(region, key);
        match serde_json::to_string(&row) {
            Ok(encoded) => {
                self.swallow("set", &key, self.backend.set(&key, &encoded, self.ttl));
            }
            Err(e) => tracing::warn!(
                target: "repobridge::cache",
                key = %key,
                error = %e,
                "Row could not be encoded for the cache"
            ),
        }
    }

    fn contains(&self, region: &str, key: &Value) -> bool {
        let key = self.key(region, key);
        self.swallow("exists", &key, self.backend.exists(&key))
            .unwrap_or(false)
    }

    fn invalidate(&self, region: &str, key: &Value) {
        let key = self.key(region, key);
        self.swallow("delete", &key, self.backend.delete(&key));
    }

    fn invalidate_all(&self, region: &str) {
        let prefix = self.region_prefix(region);
        self.swallow("delete_prefix", &prefix, self.backend.delete_prefix(&prefix));
    }

    fn clear(&self) {
        let prefix = format!("{}:", self.prefix);
        self.swallow("delete_prefix", &prefix, self.backend.delete_prefix(&prefix));
    }
}

/// Redis over plain TCP, with one idle connection kept between calls.
///
/// Every network step is bounded by the configured timeout: connecting and
/// the AUTH/SELECT handshake share one deadline, and each later command
/// gets the timeout as its socket read and write limit. The idle connection
/// is taken out of its slot for the duration of a call, so no lock is held
/// across network I/O and a stalled server only delays its own caller.
pub struct RedisBackend {
    host: String,
    port: u16,
    redis: redis::RedisConnectionInfo,
    timeout: Duration,
    idle: Mutex<Option<RedisConnection>>,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db", &self.redis.db)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn cache_error(e: &redis::RedisError) -> Error {
    Error::Cache(e.to_string())
}

fn timed_out(what: &str) -> redis::RedisError {
    io::Error::new(io::ErrorKind::TimedOut, format!("redis {what} timed out")).into()
}

/// Escape glob metacharacters for SCAN MATCH.
fn glob_escape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl RedisBackend {
    /// Parse `url`. No connection is made until the first command.
    ///
    /// Only `redis://` URLs are supported.
    pub fn open(url: &str, timeout: Duration) -> Result<Self> {
        let info = url
            .into_connection_info()
            .map_err(|e| Error::configuration("cache", format!("invalid redis url: {e}")))?;
        let (host, port) = match info.addr {
            redis::ConnectionAddr::Tcp(host, port) => (host, port),
            other => {
                return Err(Error::configuration(
                    "cache",
                    format!("unsupported redis address `{other}`, expected redis://"),
                ));
            }
        };
        Ok(Self {
            host,
            port,
            redis: info.redis,
            timeout: timeout.max(Duration::from_millis(1)),
            idle: Mutex::new(None),
        })
    }

    fn connect(&self) -> redis::RedisResult<RedisConnection> {
        let deadline = Instant::now() + self.timeout;
        let mut last_error = None;
        for addr in (self.host.as_str(), self.port).to_socket_addrs()? {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match TcpStream::connect_timeout(&addr, remaining) {
                Ok(stream) => {
                    let mut connection = RedisConnection::new(stream, self.redis.db)?;
                    connection.handshake(&self.redis, deadline)?;
                    connection.limit(self.timeout)?;
                    tracing::debug!(target: "repobridge::cache", %addr, "Connected to redis");
                    return Ok(connection);
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.map_or_else(|| timed_out("connect"), redis::RedisError::from))
    }

    /// Run `f` on a connection, connecting first if none is idle. A failed
    /// command drops its connection so a later call reconnects.
    fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut RedisConnection) -> redis::RedisResult<T>,
    ) -> Result<T> {
        let idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner).take();
        let mut connection = match idle {
            Some(connection) => connection,
            None => self.connect().map_err(|e| cache_error(&e))?,
        };
        let value = f(&mut connection).map_err(|e| cache_error(&e))?;
        let mut slot = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(connection);
        }
        Ok(value)
    }
}

/// A synchronous RESP connection whose socket timeouts are set before the
/// first byte is exchanged.
struct RedisConnection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    parser: redis::Parser,
    db: i64,
    open: bool,
}

impl RedisConnection {
    fn new(stream: TcpStream, db: i64) -> redis::RedisResult<Self> {
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            reader,
            writer: stream,
            parser: redis::Parser::new(),
            db,
            open: true,
        })
    }

    fn limit(&self, timeout: Duration) -> io::Result<()> {
        self.writer.set_read_timeout(Some(timeout))?;
        self.writer.set_write_timeout(Some(timeout))
    }

    fn handshake(
        &mut self,
        info: &redis::RedisConnectionInfo,
        deadline: Instant,
    ) -> redis::RedisResult<()> {
        if let Some(password) = &info.password {
            self.limit_until(deadline)?;
            let mut auth = redis::cmd("AUTH");
            if let Some(username) = &info.username {
                auth.arg(username);
            }
            auth.arg(password).query::<()>(self)?;
        }
        if info.db != 0 {
            self.limit_until(deadline)?;
            redis::cmd("SELECT").arg(info.db).query::<()>(self)?;
        }
        Ok(())
    }

    fn limit_until(&self, deadline: Instant) -> redis::RedisResult<()> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(timed_out("handshake"));
        }
        Ok(self.limit(remaining)?)
    }

    fn send(&mut self, packed: &[u8]) -> redis::RedisResult<()> {
        self.writer.write_all(packed).map_err(|e| {
            self.open = false;
            redis::RedisError::from(e)
        })
    }

    fn receive(&mut self) -> redis::RedisResult<redis::Value> {
        self.parser.parse_value(&mut self.reader).inspect_err(|e| {
            if e.is_io_error() {
                self.open = false;
            }
        })
    }
}

impl redis::ConnectionLike for RedisConnection {
    fn req_packed_command(&mut self, cmd: &[u8]) -> redis::RedisResult<redis::Value> {
        self.send(cmd)?;
        self.receive()
    }

    fn req_packed_commands(
        &mut self,
        cmd: &[u8],
        offset: usize,
        count: usize,
    ) -> redis::RedisResult<Vec<redis::Value>> {
        self.send(cmd)?;
        let mut values = Vec::with_capacity(count);
        for index in 0..offset + count {
            let value = self.receive()?;
            if index >= offset {
                values.push(value);
            }
        }
        Ok(values)
    }

    fn get_db(&self) -> i64 {
        self.db
    }

    fn check_connection(&mut self) -> bool {
        redis::cmd("PING").query::<String>(self).is_ok()
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

impl KvBackend for RedisBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|con| redis::cmd("GET").arg(key).query(con))
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        self.with_connection(|con| {
            let mut cmd = redis::cmd("SET");
            cmd.arg(key).arg(value);
            if let Some(ttl) = ttl {
                let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
                cmd.arg("PX").arg(millis);
            }
            cmd.query(con)
        })
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.with_connection(|con| redis::cmd("EXISTS").arg(key).query(con))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.with_connection(|con| redis::cmd("DEL").arg(key).query(con))
    }

    fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        self.with_connection(|con| {
            let pattern = format!("{}*", glob_escape(prefix));
            let mut cursor: u64 = 0;
            let mut deleted: u64 = 0;
            loop {
                let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(256)
                    .query(con)?;
                if !keys.is_empty() {
                    let removed: u64 = redis::cmd("DEL").arg(&keys).query(con)?;
                    deleted += removed;
                }
                if next == 0 {
                    break;
                }
                cursor = next;
            }
            Ok(deleted)
        })
    }
}
