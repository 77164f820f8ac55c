use std::future::Future;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use wirecall_core::checksum;

use crate::error::{Error, Result};

pub mod client;
pub mod server;

pub use self::client::{ClientCodec, ClientCodecBuilder};
pub use self::server::{ServerCodec, ServerCodecBuilder};

/// Largest header frame accepted unless configured otherwise
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

/// Largest body read into memory unless configured otherwise
pub const DEFAULT_MAX_BODY_LEN: usize = 100 * 1024 * 1024;

/// What the client learns from a response header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    /// Sequence number the request was written with
    pub seq: u64,
    /// Method recovered from the pending table
    pub method: String,
    /// Error reported by the service; empty on success
    pub error: String,
}

/// What the server learns from a request header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    /// Server-local sequence number to hand back to `write_response`
    pub seq: u64,
    pub method: String,
}

/// Client half of the runtime contract
#[async_trait]
pub trait RpcClientCodec: Send + Sync {
    /// Frame and send one request, with an empty body for `None` args
    async fn write_request<A>(&self, seq: u64, method: &str, args: Option<&A>) -> Result<()>
    where
        A: Serialize + Sync + ?Sized;

    /// Read the next response header and resolve its method
    async fn read_response_header(&self) -> Result<ResponseMeta>;

    /// Read the body announced by the last header, draining it for `None`
    async fn read_response_body<R>(&self, out: Option<&mut R>) -> Result<()>
    where
        R: DeserializeOwned + Send;

    async fn close(&self) -> Result<()>;
}

/// Server half of the runtime contract
#[async_trait]
pub trait RpcServerCodec: Send + Sync {
    /// Read the next request header and register its context
    async fn read_request_header(&self) -> Result<RequestMeta>;

    /// Read the body announced by the last header, draining it for `None`
    async fn read_request_body<A>(&self, out: Option<&mut A>) -> Result<()>
    where
        A: DeserializeOwned + Send;

    /// Answer the request registered under `seq`
    ///
    /// A non-empty `error` suppresses the reply body.
    async fn write_response<R>(&self, seq: u64, error: &str, reply: Option<&R>) -> Result<()>
    where
        R: Serialize + Sync + ?Sized;

    async fn close(&self) -> Result<()>;
}

/// Compare a body against its header checksum; zero disables the check
pub(crate) fn verify_checksum(expected: u32, body: &[u8]) -> Result<()> {
    if expected == 0 {
        return Ok(());
    }
    let actual = checksum(body);
    if actual != expected {
        warn!(expected, actual, len = body.len(), "body checksum mismatch");
        return Err(Error::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

/// Run a stream operation, abandoning it with [`Error::ConnectionClosed`]
/// once the codec is closed
pub(crate) async fn until_closed<T, F>(closed: &CancellationToken, op: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = closed.cancelled() => Err(Error::ConnectionClosed),
        result = op => result,
    }
}

/// Mark the codec closed, returning whether this call did it
pub(crate) fn mark_closed(closed: &CancellationToken) -> bool {
    if closed.is_cancelled() {
        return false;
    }
    closed.cancel();
    true
}

/// Body length as carried in a header
pub(crate) fn body_len(body: &[u8]) -> Result<u32> {
    u32::try_from(body.len()).map_err(|_| Error::FrameTooLarge {
        size: body.len() as u64,
        max: u32::MAX as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closing_abandons_a_pending_operation() {
        let closed = CancellationToken::new();
        let pending = until_closed(&closed, std::future::pending::<Result<()>>());
        let close = async {
            tokio::task::yield_now().await;
            assert!(mark_closed(&closed));
        };
        let (result, ()) = tokio::join!(pending, close);
        assert!(matches!(result, Err(Error::ConnectionClosed)));

        assert!(!mark_closed(&closed));
        let result = until_closed(&closed, async { Ok::<_, Error>(7) }).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn open_codec_runs_the_operation() {
        let closed = CancellationToken::new();
        assert_eq!(until_closed(&closed, async { Ok::<_, Error>(7) }).await.unwrap(), 7);
    }

    #[test]
    fn zero_checksum_skips_verification() {
        verify_checksum(0, b"anything at all").unwrap();
    }

    #[test]
    fn wrong_checksum_is_reported() {
        let good = checksum(b"payload");
        verify_checksum(good, b"payload").unwrap();
        assert!(matches!(
            verify_checksum(good, b"pAyload"),
            Err(Error::ChecksumMismatch { expected, .. }) if expected == good
        ));
    }
}
