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
use wirecall_core::{checksum, CompressType, Header, ResponseHeader, REQUEST_POOL};

use crate::codec::{
    body_len, mark_closed, until_closed, verify_checksum, ResponseMeta, RpcClientCodec,
    DEFAULT_MAX_BODY_LEN, DEFAULT_MAX_FRAME_LEN,
};
use crate::compressor::CompressorRegistry;
use crate::error::{Error, Result};
use crate::frame::{discard, read_full, receive_frame, send_frame, write_full};
use crate::serializer::{BincodeSerializer, Serializer};

/// Client side of one connection
///
/// Requests are compressed with the configured [`CompressType`]; responses
/// must come back with the same one
pub struct ClientCodec<T, S = BincodeSerializer> {
    reader: Mutex<ResponseReader<T>>,
    writer: Mutex<BufWriter<WriteHalf<T>>>,
    compress_type: CompressType,
    serializer: S,
    registry: Arc<CompressorRegistry>,
    max_frame_len: usize,
    max_body_len: usize,
    /// sequence number -> method, for requests written but not yet answered
    pending: StdMutex<HashMap<u64, String>>,
    closed: CancellationToken,
}

struct ResponseReader<T> {
    stream: BufReader<ReadHalf<T>>,
    response: ResponseHeader,
}

impl<T> ClientCodec<T>
where
    T: AsyncRead + AsyncWrite + Send + Unpin,
{
    /// Create a codec with bincode bodies and the default compressors
    pub fn new(stream: T, compress_type: CompressType) -> Self {
        ClientCodecBuilder::new()
            .compress_type(compress_type)
            .build(stream)
    }
}

impl<T, S> ClientCodec<T, S> {
    pub fn compress_type(&self) -> CompressType {
        self.compress_type
    }

    /// Number of requests still waiting for a response
    pub fn pending_len(&self) -> usize {
        self.pending_table().len()
    }

    fn pending_table(&self) -> MutexGuard<'_, HashMap<u64, String>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<T, S> RpcClientCodec for ClientCodec<T, S>
where
    T: AsyncRead + AsyncWrite + Send + Unpin,
    S: Serializer,
{
    async fn write_request<A>(&self, seq: u64, method: &str, args: Option<&A>) -> Result<()>
    where
        A: Serialize + Sync + ?Sized,
    {
        // Left in place on failure below; the caller abandons the sequence.
        self.pending_table().insert(seq, method.to_owned());

        let compressor = self.registry.get(self.compress_type)?;
        let body = self.serializer.encode_opt(args)?;
        let body = compressor.zip(&body)?;

        let frame = {
            let mut header = REQUEST_POOL.acquire();
            header.compress_type = self.compress_type;
            header.method.push_str(method);
            header.id = seq;
            header.request_len = body_len(&body)?;
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

        debug!(seq, method, len = body.len(), compress = %self.compress_type, "request written");
        Ok(())
    }

    async fn read_response_header(&self) -> Result<ResponseMeta> {
        let mut guard = self.reader.lock().await;
        let reader = &mut *guard;

        reader.response.reset();
        let frame = until_closed(
            &self.closed,
            receive_frame(&mut reader.stream, self.max_frame_len),
        )
        .await?;
        reader.response.unmarshal(&frame)?;

        let seq = reader.response.id;
        let method = self.pending_table().remove(&seq);
        let Some(method) = method else {
            warn!(seq, "response for a sequence number that is not pending");
            // Keep the stream aligned for the next header.
            let len = u64::from(reader.response.response_len);
            until_closed(&self.closed, discard(&mut reader.stream, len)).await?;
            reader.response.response_len = 0;
            return Err(Error::UnexpectedSequence(seq));
        };

        debug!(seq, method = %method, error = %reader.response.error, "response header read");
        Ok(ResponseMeta {
            seq,
            method,
            error: reader.response.error.clone(),
        })
    }

    async fn read_response_body<R>(&self, out: Option<&mut R>) -> Result<()>
    where
        R: DeserializeOwned + Send,
    {
        let mut guard = self.reader.lock().await;
        let reader = &mut *guard;
        let len = reader.response.response_len;

        let Some(out) = out else {
            if len > 0 {
                trace!(seq = reader.response.id, len, "draining response body");
                until_closed(&self.closed, discard(&mut reader.stream, u64::from(len))).await?;
            }
            return Ok(());
        };

        if len as usize > self.max_body_len {
            warn!(seq = reader.response.id, len, max = self.max_body_len, "response body too large");
            until_closed(&self.closed, discard(&mut reader.stream, u64::from(len))).await?;
            return Err(Error::FrameTooLarge {
                size: u64::from(len),
                max: self.max_body_len,
            });
        }

        let mut body = vec![0u8; len as usize];
        until_closed(&self.closed, read_full(&mut reader.stream, &mut body)).await?;
        let declared = reader.response.compress_type;
        let expected_checksum = reader.response.checksum;
        drop(guard);

        verify_checksum(expected_checksum, &body)?;
        let compressor = self.registry.get(declared)?;
        if declared != self.compress_type {
            warn!(expected = %self.compress_type, actual = %declared, "response compressor mismatch");
            return Err(Error::CompressorMismatch {
                expected: self.compress_type,
                actual: declared,
            });
        }

        let body = compressor.unzip(&body)?;
        if body.is_empty() {
            return Ok(());
        }
        self.serializer.decode_into(&body, Some(out))
    }

    async fn close(&self) -> Result<()> {
        if !mark_closed(&self.closed) {
            return Ok(());
        }
        self.writer.lock().await.shutdown().await?;
        Ok(())
    }
}

/// Builder for configuring a [`ClientCodec`]
#[derive(Debug, Clone)]
pub struct ClientCodecBuilder<S = BincodeSerializer> {
    compress_type: CompressType,
    serializer: S,
    registry: Arc<CompressorRegistry>,
    max_frame_len: usize,
    max_body_len: usize,
}

impl ClientCodecBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            compress_type: CompressType::RAW,
            serializer: BincodeSerializer,
            registry: Arc::new(CompressorRegistry::default()),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_body_len: DEFAULT_MAX_BODY_LEN,
        }
    }
}

impl Default for ClientCodecBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Serializer> ClientCodecBuilder<S> {
    /// Set the compressor used for requests and expected on responses
    pub fn compress_type(mut self, compress_type: CompressType) -> Self {
        self.compress_type = compress_type;
        self
    }

    /// Set the body serializer
    pub fn serializer<S2: Serializer>(self, serializer: S2) -> ClientCodecBuilder<S2> {
        ClientCodecBuilder {
            compress_type: self.compress_type,
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

    /// Set the largest response body read into memory
    pub fn max_body_len(mut self, max_body_len: usize) -> Self {
        self.max_body_len = max_body_len;
        self
    }

    /// Wrap `stream` in a codec with the configured settings
    pub fn build<T>(self, stream: T) -> ClientCodec<T, S>
    where
        T: AsyncRead + AsyncWrite + Send + Unpin,
    {
        let (read_half, write_half) = split(stream);
        ClientCodec {
            reader: Mutex::new(ResponseReader {
                stream: BufReader::new(read_half),
                response: ResponseHeader::default(),
            }),
            writer: Mutex::new(BufWriter::new(write_half)),
            compress_type: self.compress_type,
            serializer: self.serializer,
            registry: self.registry,
            max_frame_len: self.max_frame_len,
            max_body_len: self.max_body_len,
            pending: StdMutex::new(HashMap::new()),
            closed: CancellationToken::new(),
        }
    }
}
