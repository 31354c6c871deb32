use super::types::{Request, Response};
use std::path::Path;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection closed before a response was received")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Unix socket transport for IPC communication.
pub struct UnixSocketTransport {
    socket_path: String,
}

impl UnixSocketTransport {
    pub fn new(socket_path: impl Into<String>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &str {
        &self.socket_path
    }

    /// Binds to the Unix socket, replacing any stale socket file.
    pub async fn bind(&self) -> Result<UnixListener> {
        if Path::new(&self.socket_path).exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.socket_path, perms)?;
        }

        Ok(listener)
    }

    /// Removes the socket file.
    pub fn cleanup(&self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Reads one request line from the stream.
pub async fn read_line(stream: &mut UnixStream) -> Result<String> {
    let (reader, _) = stream.split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;
    Ok(line)
}

/// Writes one response line to the stream.
pub async fn write_response(stream: &mut UnixStream, response: &Response) -> Result<()> {
    let json = serde_json::to_string(response)?;
    stream.write_all(json.as_bytes()).await?;
    stream.write_all(b"\n").await?;
    stream.flush().await?;
    Ok(())
}

/// Sends `request` to the server at `socket_path` and waits for its response.
pub async fn send_request(socket_path: impl AsRef<Path>, request: &Request) -> Result<Response> {
    let mut stream = UnixStream::connect(socket_path).await?;
    let json = serde_json::to_string(request)?;
    stream.write_all(json.as_bytes()).await?;
    stream.write_all(b"\n").await?;
    stream.flush().await?;

    let line = read_line(&mut stream).await?;
    if line.trim().is_empty() {
        return Err(TransportError::Closed);
    }
    Ok(serde_json::from_str(&line)?)
}
