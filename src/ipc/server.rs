//! Unix socket server: one task per connection.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};

use super::{FramedConn, Request, Response, INVALID_REQUEST};

/// Answers one request.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, req: Request) -> Response;
}

/// Remove any stale socket, bind, and restrict it to the owner.
pub fn bind(socket_path: &Path) -> std::io::Result<UnixListener> {
    match std::fs::remove_file(socket_path) {
        Ok(()) => tracing::debug!(path = %socket_path.display(), "removed stale socket"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    if let Some(dir) = socket_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let listener = UnixListener::bind(socket_path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
    }
    tracing::info!(path = %socket_path.display(), "daemon listening");
    Ok(listener)
}

/// Bind and serve forever.
pub async fn serve<H: Handler>(socket_path: &Path, handler: Arc<H>) -> std::io::Result<()> {
    let listener = bind(socket_path)?;
    accept_loop(listener, handler).await
}

/// Accept connections until the listener fails.
pub async fn accept_loop<H: Handler>(listener: UnixListener, handler: Arc<H>) -> std::io::Result<()> {
    loop {
        let (stream, _addr) = listener.accept().await?;
        tracing::debug!("client connected");
        let handler = handler.clone();
        tokio::spawn(async move {
            handle_conn(stream, handler).await;
            tracing::debug!("client disconnected");
        });
    }
}

async fn handle_conn<H: Handler>(stream: UnixStream, handler: Arc<H>) {
    let (r, w) = stream.into_split();
    let mut conn = FramedConn::new(BufReader::new(r), w);
    loop {
        let resp = match conn.recv::<Request>().await {
            Ok(None) => return,
            Err(e) => {
                tracing::debug!("read failed, closing connection: {e}");
                return;
            }
            Ok(Some(Err(e))) => {
                tracing::debug!("malformed request: {e}");
                Response::failure(INVALID_REQUEST)
            }
            Ok(Some(Ok(req))) => handler.handle(req).await,
        };
        if let Err(e) = conn.send(&resp).await {
            tracing::debug!("write failed, closing connection: {e}");
            return;
        }
    }
}
