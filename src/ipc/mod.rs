//! Line-framed JSON over a Unix socket.
//!
//! One JSON document per `\n`-terminated line. Each request gets exactly one
//! response, in order; the server never pushes.

pub mod server;

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;

/// Reply sent for lines that are not a valid request.
pub const INVALID_REQUEST: &str = "invalid request";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Opaque context payload for `add_context`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl Request {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            error: None,
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
            data: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("socket: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection closed")]
    Closed,
}

/// Both halves of a framed connection.
pub struct FramedConn<R, W> {
    reader: R,
    writer: W,
    line: Vec<u8>,
}

impl<R, W> FramedConn<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            line: Vec::new(),
        }
    }

    /// Next frame. `Ok(None)` at EOF; the inner `Err` is a frame that did not
    /// parse, including one that is not UTF-8.
    pub async fn recv<T: DeserializeOwned>(
        &mut self,
    ) -> std::io::Result<Option<Result<T, serde_json::Error>>> {
        self.line.clear();
        if self.reader.read_until(b'\n', &mut self.line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(self.line.trim_ascii_end())))
    }

    /// Write one frame and flush.
    pub async fn send<T: Serialize>(&mut self, msg: &T) -> Result<(), IpcError> {
        let mut buf = serde_json::to_vec(msg)?;
        buf.push(b'\n');
        self.writer.write_all(&buf).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Client side of the daemon protocol.
pub struct Client {
    conn: FramedConn<BufReader<OwnedReadHalf>, OwnedWriteHalf>,
}

impl Client {
    pub async fn connect(socket_path: &Path) -> Result<Self, IpcError> {
        let stream = UnixStream::connect(socket_path).await?;
        let (r, w) = stream.into_split();
        Ok(Self {
            conn: FramedConn::new(BufReader::new(r), w),
        })
    }

    /// Send one request and wait for its response.
    pub async fn call(&mut self, req: &Request) -> Result<Response, IpcError> {
        self.conn.send(req).await?;
        match self.conn.recv::<Response>().await? {
            Some(resp) => Ok(resp?),
            None => Err(IpcError::Closed),
        }
    }

    /// Send a raw line, for protocol tests and debugging.
    pub async fn call_raw(&mut self, line: impl AsRef<[u8]>) -> Result<Response, IpcError> {
        let w = &mut self.conn.writer;
        w.write_all(line.as_ref()).await?;
        w.write_all(b"\n").await?;
        w.flush().await?;
        match self.conn.recv::<Response>().await? {
            Some(resp) => Ok(resp?),
            None => Err(IpcError::Closed),
        }
    }
}
