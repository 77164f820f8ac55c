use tokio::io::{AsyncRead, AsyncWrite};

use crate::codec::ServerCodec;
use crate::error::Result;
use crate::serializer::Serializer;

pub mod tcp;
pub mod unix;

pub use self::tcp::{TcpCodecListener, TcpConnector};
pub use self::unix::{UnixCodecListener, UnixConnector};

/// Listener trait for accepting connections as server codecs
///
/// Each accepted codec owns a single connection
#[async_trait::async_trait]
pub trait CodecListener: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin;
    type Serializer: Serializer;

    /// Accept the next connection
    async fn accept(&self) -> Result<ServerCodec<Self::Stream, Self::Serializer>>;

    /// Stop accepting connections
    async fn close(&mut self) -> Result<()>;
}
