use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::debug;

use crate::codec::{ClientCodec, ClientCodecBuilder, ServerCodec, ServerCodecBuilder};
use crate::error::{Error, Result};
use crate::serializer::{BincodeSerializer, Serializer};
use crate::transport::CodecListener;

/// Builder for dialing a TCP peer and wrapping the stream in a [`ClientCodec`]
#[derive(Debug, Clone)]
pub struct TcpConnector<S = BincodeSerializer> {
    address: Option<SocketAddr>,
    connect_timeout: Option<Duration>,
    nodelay: bool,
    codec: ClientCodecBuilder<S>,
}

impl TcpConnector {
    /// Create a new connector with a default codec configuration
    pub fn new() -> Self {
        Self::with_codec(ClientCodecBuilder::new())
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Serializer> TcpConnector<S> {
    /// Create a connector that builds codecs from `codec`
    pub fn with_codec(codec: ClientCodecBuilder<S>) -> Self {
        Self {
            address: None,
            connect_timeout: None,
            nodelay: true,
            codec,
        }
    }

    /// Set the address to connect to
    pub fn address(mut self, addr: SocketAddr) -> Self {
        self.address = Some(addr);
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Enable or disable `TCP_NODELAY` (on by default)
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Connect with the configured settings
    pub async fn connect(self) -> Result<ClientCodec<TcpStream, S>> {
        let addr = self
            .address
            .ok_or_else(|| Error::custom("Address not set"))?;

        let connect_op = TcpStream::connect(addr);

        let stream = if let Some(timeout) = self.connect_timeout {
            tokio::time::timeout(timeout, connect_op)
                .await
                .map_err(|_| Error::custom("Connect timeout exceeded"))??
        } else {
            connect_op.await?
        };
        stream.set_nodelay(self.nodelay)?;

        debug!(%addr, "connected");
        Ok(self.codec.build(stream))
    }
}

/// TCP listener handing out a [`ServerCodec`] per connection
pub struct TcpCodecListener<S = BincodeSerializer> {
    listener: TcpListener,
    codec: ServerCodecBuilder<S>,
}

impl TcpCodecListener {
    /// Bind to a local address with a default codec configuration
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        Self::bind_with(addr, ServerCodecBuilder::new()).await
    }
}

impl<S: Serializer + Clone> TcpCodecListener<S> {
    /// Bind to a local address, building codecs from `codec`
    pub async fn bind_with(addr: SocketAddr, codec: ServerCodecBuilder<S>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, codec })
    }

    /// Accept an incoming connection
    pub async fn accept(&self) -> Result<(ServerCodec<TcpStream, S>, SocketAddr)> {
        let (stream, addr) = self.listener.accept().await?;
        debug!(peer = %addr, "accepted");
        Ok((self.codec.clone().build(stream), addr))
    }

    /// Get the local address this listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(Into::into)
    }
}

#[async_trait::async_trait]
impl<S: Serializer + Clone> CodecListener for TcpCodecListener<S> {
    type Stream = TcpStream;
    type Serializer = S;

    async fn accept(&self) -> Result<ServerCodec<TcpStream, S>> {
        let (codec, _) = TcpCodecListener::accept(self).await?;
        Ok(codec)
    }

    async fn close(&mut self) -> Result<()> {
        // TcpListener cleanup happens on drop
        Ok(())
    }
}
