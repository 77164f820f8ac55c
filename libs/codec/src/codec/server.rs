use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{
    split, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter, ReadHalf, WriteHalf,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use wirecall_core::{checksum, CompressType, Header, RequestHeader, RESPONSE_POOL};

use crate::codec::{
    body_len, mark_closed, until_closed, verify_checksum, RequestMeta, RpcServerCodec,
    DEFAULT_MAX_BODY_LEN, DEFAULT_MAX_FRAME_LEN,
};
use crate::compressor::CompressorRegistry;
use crate::error::{Error, Result};
use crate::frame::{discard, read_full, receive_frame, send_frame, write_full};
use crate::serializer::{BincodeSerializer, Serializer};

/// Server side of one connection
///
/// Every decoded request is registered under a fresh server-local sequence
/// number. The context remembers the client's own id and the compressor the
/// client used, and is consumed by exactly one `write_response`
pub struct ServerCodec<T, S = BincodeSerializer> {
    reader: Mutex<RequestReader<T>>,
    writer: Mutex<BufWriter<WriteHalf<T>>>,
    serializer: S,
    registry: Arc<CompressorRegistry>,
    max_frame_len: usize,
    max_body_len: usize,
    pending: StdMutex<PendingContexts>,
    closed: CancellationToken,
}

struct RequestReader<T> {
    stream: BufReader<ReadHalf<T>>,
    request: RequestHeader,
}

#[derive(Debug, Clone, Copy)]
struct RequestContext {
    id: u64,
    compress_type: CompressType,
}

#[derive(Default)]
struct PendingContexts {
    /// Last sequence number handed out; the first request gets 1
    seq: u64,
    contexts: HashMap<u64, RequestContext>,
}

impl PendingContexts {
    fn admit(&mut self, context: RequestContext) -> u64 {
        self.seq += 1;
        self.contexts.insert(self.seq, context);
        self.seq
    }
}

impl<T> ServerCodec<T>
where
    T: AsyncRead + AsyncWrite + Send + Unpin,
{
    /// Create a codec with bincode bodies and the default compressors
    pub fn new(stream: T) -> Self {
        ServerCodecBuilder::new().build(stream)
    }
}

impl<T, S> ServerCodec<T, S> {
    /// Number of requests read but not yet answered
    pub fn pending_len(&self) -> usize {
        self.pending_contexts().contexts.len()
    }

    fn pending_contexts(&self) -> MutexGuard<'_, PendingContexts> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<T, S> RpcServerCodec for ServerCodec<T, S>
where
    T: AsyncRead + AsyncWrite + Send + Unpin,
    S: Serializer,
{
    async fn read_request_header(&self) -> Result<RequestMeta> {
        let mut guard = self.reader.lock().await;
        let reader = &mut *guard;

        reader.request.reset();
        let frame = until_closed(
            &self.closed,
            receive_frame(&mut reader.stream, self.max_frame_len),
        )
        .await?;
        reader.request.unmarshal(&frame)?;

        let context = RequestContext {
            id: reader.request.id,
            compress_type: reader.request.compress_type,
        };
        let seq = self.pending_contexts().admit(context);

        debug!(
            seq,
            id = context.id,
            method = %reader.request.method,
            compress = %context.compress_type,
            "request header read"
        );
        Ok(RequestMeta {
            seq,
            method: reader.request.method.clone(),
        })
    }

    async fn read_request_body<A>(&self, out: Option<&mut A>) -> Result<()>
    where
        A: DeserializeOwned + Send,
    {
        let mut guard = self.reader.lock().await;
        let reader = &mut *guard;
        let len = reader.request.request_len;

        let Some(out) = out else {
            if len > 0 {
                trace!(id = reader.request.id, len, "draining request body");
                until_closed(&self.closed, discard(&mut reader.stream, u64::from(len))).await?;
            }
            return Ok(());
        };

        if len as usize > self.max_body_len {
            warn!(id = reader.request.id, len, max = self.max_body_len, "request body too large");
            until_closed(&self.closed, discard(&mut reader.stream, u64::from(len))).await?;
            return Err(Error::FrameTooLarge {
                size: u64::from(len),
                max: self.max_body_len,
            });
        }

        let mut body = vec![0u8; len as usize];
        until_closed(&self.closed, read_full(&mut reader.stream, &mut body)).await?;
        let declared = reader.request.compress_type;
        let expected_checksum = reader.request.checksum;
        drop(guard);

        verify_checksum(expected_checksum, &body)?;
        let body = self.registry.get(declared)?.unzip(&body)?;
        if body.is_empty() {
            return Ok(());
        }
        self.serializer.decode_into(&body, Some(out))
    }

    async fn write_response<R>(&self, seq: u64, error: &str, reply: Option<&R>) -> Result<()>
    where
        R: Serialize + Sync + ?Sized,
    {
        let context = self.pending_contexts().contexts.remove(&seq);
        let Some(context) = context else {
            warn!(seq, "response for a sequence number with no pending request");
            return Err(Error::InvalidSequence(seq));
        };

        // An erroring call carries no body.
        let reply = if error.is_empty() { reply } else { None };

        let compressor = self.registry.get(context.compress_type)?;
        let body = self.serializer.encode_opt(reply)?;
        let body = compressor.zip(&body)?;

        let frame = {
            let mut header = RESPONSE_POOL.acquire();
            header.compress_type = context.compress_type;
            header.id = context.id;
            header.error.push_str(error);
            header.response_len = body_len(&body)?;
            header.checksum = checksum(&body);
            header.marshal()
        };

        let mut writer = self.writer.lock().await;
        until_closed(&self.closed, async {
            send_frame(&mut *writer, &frame).await?;
            write_full(&mut *writer, &body).await?;
            writer.flush().await?;
            Ok::<_, Error>(())
        })
        .await?;

        debug!(seq, id = context.id, len = body.len(), error, "response written");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !mark_closed(&self.closed) {
            return Ok(());
        }
        self.writer.lock().await.shutdown().await?;
        Ok(())
    }
}

/// Builder for configuring a [`ServerCodec`]
#[derive(Debug, Clone)]
pub struct ServerCodecBuilder<S = BincodeSerializer> {
    serializer: S,
    registry: Arc<CompressorRegistry>,
    max_frame_len: usize,
    max_body_len: usize,
}

impl ServerCodecBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            serializer: BincodeSerializer,
            registry: Arc::new(CompressorRegistry::default()),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_body_len: DEFAULT_MAX_BODY_LEN,
        }
    }
}

impl Default for ServerCodecBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Serializer> ServerCodecBuilder<S> {
    /// Set the body serializer
    pub fn serializer<S2: Serializer>(self, serializer: S2) -> ServerCodecBuilder<S2> {
        ServerCodecBuilder {
            serializer,
            registry: self.registry,
            max_frame_len: self.max_frame_len,
            max_body_len: self.max_body_len,
        }
    }

    /// Set the compressors this side understands
    pub fn registry(self, registry: CompressorRegistry) -> Self {
        self.shared_registry(Arc::new(registry))
    }

    /// Share one registry between many codecs
    pub fn shared_registry(mut self, registry: Arc<CompressorRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Set the largest header frame accepted from the peer
    pub fn max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Set the largest request body read into memory
    pub fn max_body_len(mut self, max_body_len: usize) -> Self {
        self.max_body_len = max_body_len;
        self
    }

    /// Wrap `stream` in a codec with the configured settings
    pub fn build<T>(self, stream: T) -> ServerCodec<T, S>
    where
        T: AsyncRead + AsyncWrite + Send + Unpin,
    {
        let (read_half, write_half) = split(stream);
        ServerCodec {
            reader: Mutex::new(RequestReader {
                stream: BufReader::new(read_half),
                request: RequestHeader::default(),
            }),
            writer: Mutex::new(BufWriter::new(write_half)),
            serializer: self.serializer,
            registry: self.registry,
            max_frame_len: self.max_frame_len,
            max_body_len: self.max_body_len,
            pending: StdMutex::new(PendingContexts::default()),
            closed: CancellationToken::new(),
        }
    }
}
