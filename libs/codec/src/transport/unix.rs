use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::{UnixListener, UnixStream};
use tracing::debug;

use crate::codec::{ClientCodec, ClientCodecBuilder, ServerCodec, ServerCodecBuilder};
use crate::error::{Error, Result};
use crate::serializer::{BincodeSerializer, Serializer};
use crate::transport::CodecListener;

/// Builder for dialing a Unix socket and wrapping the stream in a [`ClientCodec`]
#[derive(Debug, Clone)]
pub struct UnixConnector<S = BincodeSerializer> {
    path: Option<PathBuf>,
    connect_timeout: Option<Duration>,
    codec: ClientCodecBuilder<S>,
}

impl UnixConnector {
    /// Create a new connector with a default codec configuration
    pub fn new() -> Self {
        Self::with_codec(ClientCodecBuilder::new())
    }
}

impl Default for UnixConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Serializer> UnixConnector<S> {
    /// Create a connector that builds codecs from `codec`
    pub fn with_codec(codec: ClientCodecBuilder<S>) -> Self {
        Self {
            path: None,
            connect_timeout: None,
            codec,
        }
    }

    /// Set the path to connect to
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Connect with the configured settings
    pub async fn connect(self) -> Result<ClientCodec<UnixStream, S>> {
        let path = self
            .path
            .ok_or_else(|| Error::custom("Path not set"))?;

        let connect_op = UnixStream::connect(&path);

        let stream = if let Some(timeout) = self.connect_timeout {
            tokio::time::timeout(timeout, connect_op)
                .await
                .map_err(|_| Error::custom("Connect timeout exceeded"))??
        } else {
            connect_op.await?
        };

        debug!(path = %path.display(), "connected");
        Ok(self.codec.build(stream))
    }
}

/// Unix socket listener handing out a [`ServerCodec`] per connection
///
/// The socket file is removed when the listener is closed or dropped
pub struct UnixCodecListener<S = BincodeSerializer> {
    listener: UnixListener,
    path: PathBuf,
    codec: ServerCodecBuilder<S>,
}

impl UnixCodecListener {
    /// Bind to a socket path with a default codec configuration
    pub async fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with(path, ServerCodecBuilder::new()).await
    }
}

impl<S: Serializer + Clone> UnixCodecListener<S> {
    /// Bind to a socket path, building codecs from `codec`
    pub async fn bind_with(path: impl AsRef<Path>, codec: ServerCodecBuilder<S>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let listener = UnixListener::bind(&path)?;
        Ok(Self {
            listener,
            path,
            codec,
        })
    }

    /// Accept an incoming connection
    pub async fn accept(&self) -> Result<ServerCodec<UnixStream, S>> {
        let (stream, _) = self.listener.accept().await?;
        Ok(self.codec.clone().build(stream))
    }

    /// Get the path this listener is bound to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the listener and remove the socket file
    pub async fn close(&mut self) -> Result<()> {
        std::fs::remove_file(&self.path)?;
        Ok(())
    }
}

impl<S> Drop for UnixCodecListener<S> {
    fn drop(&mut self) {
        // Clean up socket file on drop
        let _ = std::fs::remove_file(&self.path);
    }
}

#[async_trait::async_trait]
impl<S: Serializer + Clone> CodecListener for UnixCodecListener<S> {
    type Stream = UnixStream;
    type Serializer = S;

    async fn accept(&self) -> Result<ServerCodec<UnixStream, S>> {
        UnixCodecListener::accept(self).await
    }

    async fn close(&mut self) -> Result<()> {
        UnixCodecListener::close(self).await
    }
}
