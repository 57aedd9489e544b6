//! Memcached Backend Module
//!
//! Speaks the memcached text protocol (`get`, `set`, `delete`) over pooled
//! TCP connections.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

use crate::cache::{validate_key, CacheBackend};
use crate::error::{CacheError, CacheResult};

/// Idle connections kept for reuse.
const MAX_IDLE_CONNECTIONS: usize = 16;

type Connection = BufStream<TcpStream>;

// == Memcached Backend ==
/// [`CacheBackend`] backed by a memcached server.
///
/// Each operation checks out a connection (dialing a new one if none is idle)
/// and returns it only after a complete reply was read. A connection that saw
/// an error or a timeout is dropped.
#[derive(Debug)]
pub struct MemcachedBackend {
    /// Server address, `host:port`
    addr: String,
    /// Upper bound for one operation, connect included
    op_timeout: Duration,
    /// Largest value accepted by `set`
    max_value_size: usize,
    /// Connections ready for reuse
    idle: Mutex<Vec<Connection>>,
}

impl MemcachedBackend {
    /// Creates a backend. No connection is made until the first operation.
    pub fn new(addr: impl Into<String>, op_timeout: Duration, max_value_size: usize) -> Self {
        Self {
            addr: addr.into(),
            op_timeout,
            max_value_size,
            idle: Mutex::new(Vec::new()),
        }
    }

    async fn checkout(&self) -> CacheResult<Connection> {
        if let Some(conn) = self.idle.lock().await.pop() {
            return Ok(conn);
        }

        debug!(addr = %self.addr, "Opening memcached connection");
        let stream = TcpStream::connect(&self.addr).await?;
        stream.set_nodelay(true)?;
        Ok(BufStream::new(stream))
    }

    async fn checkin(&self, conn: Connection) {
        let mut idle = self.idle.lock().await;
        if idle.len() < MAX_IDLE_CONNECTIONS {
            idle.push(conn);
        }
    }
}

#[async_trait]
impl CacheBackend for MemcachedBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        validate_key(key)?;

        timeout(self.op_timeout, async {
            let mut conn = self.checkout().await?;
            write_command(&mut conn, format!("get {}\r\n", key).as_bytes(), None).await?;
            let value = read_get_reply(&mut conn, key, self.max_value_size).await?;
            self.checkin(conn).await;
            Ok::<_, CacheError>(value)
        })
        .await?
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> CacheResult<()> {
        validate_key(key)?;
        if value.len() > self.max_value_size {
            return Err(CacheError::ValueTooLarge {
                size: value.len(),
                limit: self.max_value_size,
            });
        }

        timeout(self.op_timeout, async {
            let mut conn = self.checkout().await?;
            let header = format!("set {} 0 0 {}\r\n", key, value.len());
            write_command(&mut conn, header.as_bytes(), Some(value.as_slice())).await?;
            read_set_reply(&mut conn).await?;
            self.checkin(conn).await;
            Ok::<_, CacheError>(())
        })
        .await?
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        validate_key(key)?;

        timeout(self.op_timeout, async {
            let mut conn = self.checkout().await?;
            write_command(&mut conn, format!("delete {}\r\n", key).as_bytes(), None).await?;
            let deleted = read_delete_reply(&mut conn).await?;
            self.checkin(conn).await;
            Ok::<_, CacheError>(deleted)
        })
        .await?
    }
}

// == Protocol ==

async fn write_command<W>(w: &mut W, header: &[u8], data: Option<&[u8]>) -> CacheResult<()>
where
    W: AsyncWrite + Unpin,
{
    w.write_all(header).await?;
    if let Some(data) = data {
        w.write_all(data).await?;
        w.write_all(b"\r\n").await?;
    }
    w.flush().await?;
    Ok(())
}

/// Reads one `\r\n` terminated line, without the terminator.
async fn read_line<R>(r: &mut R) -> CacheResult<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = r.read_line(&mut line).await?;
    if n == 0 {
        return Err(CacheError::Unavailable("connection closed by server".to_string()));
    }
    if !line.ends_with("\r\n") {
        return Err(CacheError::Protocol(format!("unterminated reply '{}'", line)));
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

fn unexpected(line: &str) -> CacheError {
    if line.starts_with("SERVER_ERROR") || line.starts_with("CLIENT_ERROR") || line == "ERROR" {
        CacheError::Protocol(line.to_string())
    } else {
        CacheError::Protocol(format!("unexpected reply '{}'", line))
    }
}

/// `VALUE <key> <flags> <bytes>\r\n<data>\r\nEND\r\n`, or just `END\r\n`.
///
/// A value longer than `max_len` is refused before its data is read.
async fn read_get_reply<R>(r: &mut R, key: &str, max_len: usize) -> CacheResult<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(r).await?;
    if line == "END" {
        return Ok(None);
    }

    let mut parts = line.split(' ');
    if parts.next() != Some("VALUE") {
        return Err(unexpected(&line));
    }
    if parts.next() != Some(key) {
        return Err(CacheError::Protocol(format!("reply for wrong key: '{}'", line)));
    }
    let len: usize = parts
        .nth(1)
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| CacheError::Protocol(format!("malformed VALUE line '{}'", line)))?;
    if len > max_len {
        return Err(CacheError::ValueTooLarge {
            size: len,
            limit: max_len,
        });
    }

    let mut data = vec![0u8; len + 2];
    r.read_exact(&mut data).await?;
    if !data.ends_with(b"\r\n") {
        return Err(CacheError::Protocol("data block not terminated".to_string()));
    }
    data.truncate(len);

    let end = read_line(r).await?;
    if end != "END" {
        return Err(unexpected(&end));
    }
    Ok(Some(data))
}

async fn read_set_reply<R>(r: &mut R) -> CacheResult<()>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(r).await?;
    match line.as_str() {
        "STORED" => Ok(()),
        _ => Err(unexpected(&line)),
    }
}

async fn read_delete_reply<R>(r: &mut R) -> CacheResult<bool>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(r).await?;
    match line.as_str() {
        "DELETED" => Ok(true),
        "NOT_FOUND" => Ok(false),
        _ => Err(unexpected(&line)),
    }
}
