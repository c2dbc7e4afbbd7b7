//! A scripted RESP server for connection-lifecycle tests.
//!
//! Speaks just enough of the Redis protocol for a client to dial it,
//! authenticate, and issue hash commands. Every command is recorded so tests
//! can assert on ordering, and every accepted connection is counted so tests
//! can tell dialing from pool reuse.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// `HGET` on this field replies with an error.
pub const FAILING_FIELD: &str = "fail";

type CommandLog = Arc<Mutex<Vec<Vec<String>>>>;

/// A local TCP server answering RESP2 commands from a fixed script.
///
/// | Command | Reply |
/// |---------|-------|
/// | `AUTH [user] pw` | `+OK` if `pw` matches, otherwise `-WRONGPASS` |
/// | `PING [msg]` | `msg` as a bulk string, or `+PONG` |
/// | `HKEYS` | `["key1"]` |
/// | `HGET ns fail` | `-ERR forced failure` |
/// | `HGET` | nil |
/// | anything else | `+OK` |
///
/// The server stops when dropped.
#[derive(Debug)]
pub struct FakeRedisServer {
    addr: SocketAddr,
    commands: CommandLog,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl FakeRedisServer {
    /// Bind to an ephemeral port on localhost and start accepting.
    ///
    /// # Errors
    ///
    /// Returns the bind error if no local port is available.
    pub async fn start(password: Option<&str>) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let commands = CommandLog::default();
        let connections = Arc::new(AtomicUsize::new(0));
        let password = password.map(str::to_owned);

        let task = {
            let commands = Arc::clone(&commands);
            let connections = Arc::clone(&connections);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    connections.fetch_add(1, Ordering::SeqCst);
                    let commands = Arc::clone(&commands);
                    let password = password.clone();
                    tokio::spawn(async move {
                        let _ = serve(stream, password, commands).await;
                    });
                }
            })
        };

        Ok(Self {
            addr,
            commands,
            connections,
            task,
        })
    }

    /// `host:port` to dial.
    #[must_use]
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Every command received so far, across all connections, in arrival
    /// order.
    #[must_use]
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Upper-cased command names received so far.
    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter_map(|args| args.first().map(|name| name.to_ascii_uppercase()))
            .collect()
    }

    /// Number of TCP connections accepted so far.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for FakeRedisServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    stream: TcpStream,
    password: Option<String>,
    commands: CommandLog,
) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);

    while let Some(args) = read_command(&mut reader).await? {
        let reply = respond(&args, password.as_deref());
        commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(args);
        write.write_all(reply.as_bytes()).await?;
    }

    Ok(())
}

/// Read one RESP array of bulk strings. `None` on a clean EOF.
async fn read_command<R>(reader: &mut R) -> std::io::Result<Option<Vec<String>>>
where
    R: AsyncBufRead + Unpin,
{
    let Some(header) = read_line(reader).await? else {
        return Ok(None);
    };
    let count = parse_prefixed(&header, '*')?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let line = read_line(reader)
            .await?
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::UnexpectedEof))?;
        let len = parse_prefixed(&line, '$')?;
        let mut buf = vec![0; len.saturating_add(2)];
        reader.read_exact(&mut buf).await?;
        buf.truncate(len);
        args.push(String::from_utf8_lossy(&buf).into_owned());
    }

    Ok(Some(args))
}

async fn read_line<R>(reader: &mut R) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
}

fn parse_prefixed(line: &str, prefix: char) -> std::io::Result<usize> {
    line.strip_prefix(prefix)
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unexpected RESP line: {line:?}"),
            )
        })
}

fn bulk_reply(s: &str) -> String {
    format!("${}\r\n{s}\r\n", s.len())
}

fn respond(args: &[String], password: Option<&str>) -> String {
    let name = args
        .first()
        .map(|s| s.to_ascii_uppercase())
        .unwrap_or_default();

    match name.as_str() {
        "AUTH" => {
            let given = args.last().map(String::as_str);
            if password.is_some() && given == password {
                "+OK\r\n".to_owned()
            } else {
                "-WRONGPASS invalid username-password pair\r\n".to_owned()
            }
        },
        "PING" => args
            .get(1)
            .map_or_else(|| "+PONG\r\n".to_owned(), |msg| bulk_reply(msg)),
        "HKEYS" => format!("*1\r\n{}", bulk_reply("key1")),
        "HGET" if args.get(2).is_some_and(|field| field == FAILING_FIELD) => {
            "-ERR forced failure\r\n".to_owned()
        },
        "HGET" => "$-1\r\n".to_owned(),
        _ => "+OK\r\n".to_owned(),
    }
}
