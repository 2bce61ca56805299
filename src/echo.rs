//! Line-oriented echo server and client.
//!
//! Small companions to the scanner: the server gives it something to find,
//! the client talks to the server. Messages are newline-terminated UTF-8
//! lines; every message gets exactly one reply line.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info, warn};

/// Address both sides use unless told otherwise.
pub const DEFAULT_ADDR: &str = "127.0.0.1:65432";

/// Reply sent when a client asks to disconnect.
pub const QUIT_ACK: &str = "ACK - Server closing connection.";

/// Echo errors.
#[derive(Debug, thiserror::Error)]
pub enum EchoError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("failed to connect to {addr}: {source}")]
    Connect { addr: String, source: io::Error },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Whether `message` asks to end the conversation.
pub fn is_quit(message: &str) -> bool {
    message.trim().eq_ignore_ascii_case("quit")
}

/// The server's reply to an ordinary message.
pub fn acknowledge(message: &str) -> String {
    let head: String = message.chars().take(20).collect();
    format!("ACK: Received your message '{head}...'")
}

/// Bind a listener, wrapping failures with the address.
pub async fn bind(addr: &str) -> Result<TcpListener, EchoError> {
    TcpListener::bind(addr).await.map_err(|source| EchoError::Bind {
        addr: addr.to_string(),
        source,
    })
}

/// Accept clients one at a time until `shutdown` resolves.
///
/// A failure while talking to one client is logged and the server moves on
/// to the next.
pub async fn serve<F>(listener: TcpListener, shutdown: F) -> Result<(), EchoError>
where
    F: Future<Output = ()>,
{
    info!(addr = %listener.local_addr()?, "echo server listening");
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => accepted?,
        };

        info!(%peer, "client connected");
        match handle_client(stream, peer).await {
            Ok(()) => info!(%peer, "client disconnected"),
            Err(e) => warn!(%peer, error = %e, "client session failed"),
        }
    }

    info!("echo server stopped");
    Ok(())
}

async fn handle_client(stream: TcpStream, peer: SocketAddr) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(message) = lines.next_line().await? {
        debug!(%peer, %message, "received");

        if is_quit(&message) {
            writer.write_all(format!("{QUIT_ACK}\n").as_bytes()).await?;
            break;
        }

        let reply = acknowledge(&message);
        writer.write_all(format!("{reply}\n").as_bytes()).await?;
    }

    writer.shutdown().await
}

/// A connected echo client.
pub struct EchoClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl EchoClient {
    pub async fn connect<A>(addr: A) -> Result<Self, EchoError>
    where
        A: ToSocketAddrs + std::fmt::Display,
    {
        let label = addr.to_string();
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| EchoError::Connect {
                addr: label,
                source,
            })?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(reader).lines(),
            writer,
        })
    }

    /// Send one message and wait for the reply.
    ///
    /// Returns `None` if the server closed the connection.
    pub async fn send(&mut self, message: &str) -> Result<Option<String>, EchoError> {
        let line = message.replace('\n', " ");
        self.writer.write_all(format!("{line}\n").as_bytes()).await?;
        Ok(self.lines.next_line().await?)
    }

    /// Send the quit command and close the connection.
    pub async fn quit(mut self) -> Result<Option<String>, EchoError> {
        let reply = self.send("quit").await?;
        self.writer.shutdown().await?;
        Ok(reply)
    }
}
