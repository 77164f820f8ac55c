use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use wirecall_core::varint::{put_uvarint, MAX_VARINT_LEN};

use crate::error::{Error, Result};

/// Write one frame; an empty payload is a lone zero length
pub async fn send_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut prefix = Vec::with_capacity(MAX_VARINT_LEN);
    put_uvarint(&mut prefix, payload.len() as u64);
    write_full(writer, &prefix).await?;
    if !payload.is_empty() {
        write_full(writer, payload).await?;
    }
    Ok(())
}

/// Read one frame, refusing payloads longer than `max_len`
///
/// A stream that ends cleanly before the first length byte yields
/// [`Error::ConnectionClosed`]; one that ends inside the frame yields an
/// `UnexpectedEof` I/O error
pub async fn receive_frame<R>(reader: &mut R, max_len: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let len = read_uvarint(reader).await?;
    if len > max_len as u64 {
        return Err(Error::FrameTooLarge { size: len, max: max_len });
    }

    let mut payload = vec![0u8; len as usize];
    read_full(reader, &mut payload).await?;
    Ok(payload)
}

/// Write all of `data`, retrying short writes and interruptions
pub async fn write_full<W>(writer: &mut W, data: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut written = 0;
    while written < data.len() {
        match writer.write(&data[written..]).await {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("stream accepted {written} of {} bytes", data.len()),
                )
                .into())
            }
            Ok(n) => written += n,
            Err(e) if is_transient(&e) => tokio::task::yield_now().await,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Fill `buf` completely, retrying short reads and interruptions
pub async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("stream ended after {filled} of {} bytes", buf.len()),
                )
                .into())
            }
            Ok(n) => filled += n,
            Err(e) if is_transient(&e) => tokio::task::yield_now().await,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Consume and drop exactly `len` bytes
pub async fn discard<R>(reader: &mut R, len: u64) -> Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut scratch = [0u8; 4096];
    let mut remaining = len;
    while remaining > 0 {
        let chunk = remaining.min(scratch.len() as u64) as usize;
        read_full(reader, &mut scratch[..chunk]).await?;
        remaining -= chunk as u64;
    }
    Ok(())
}

async fn read_uvarint<R>(reader: &mut R) -> Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut value: u64 = 0;
    let mut byte = [0u8; 1];
    for i in 0..MAX_VARINT_LEN {
        if i == 0 {
            read_first_byte(reader, &mut byte).await?;
        } else {
            read_full(reader, &mut byte).await?;
        }
        let b = byte[0];
        if b < 0x80 {
            if i == MAX_VARINT_LEN - 1 && b > 1 {
                break;
            }
            return Ok(value | (u64::from(b) << (7 * i)));
        }
        value |= u64::from(b & 0x7f) << (7 * i);
    }
    Err(io::Error::new(io::ErrorKind::InvalidData, "frame length overflows u64").into())
}

async fn read_first_byte<R>(reader: &mut R, byte: &mut [u8; 1]) -> Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    loop {
        match reader.read(byte).await {
            Ok(0) => return Err(Error::ConnectionClosed),
            Ok(_) => return Ok(()),
            Err(e) if is_transient(&e) => tokio::task::yield_now().await,
            Err(e) => return Err(e.into()),
        }
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::ReadBuf;

    use super::*;

    /// Hands out one byte per read and fails every other poll with `Interrupted`
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        interrupt: bool,
    }

    impl Trickle {
        fn new(data: Vec<u8>) -> Self {
            Self {
                data,
                pos: 0,
                interrupt: true,
            }
        }
    }

    impl AsyncRead for Trickle {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Poll::Ready(Err(io::ErrorKind::Interrupted.into()));
            }
            if self.pos < self.data.len() {
                let pos = self.pos;
                buf.put_slice(&self.data[pos..pos + 1]);
                self.pos += 1;
            }
            Poll::Ready(Ok(()))
        }
    }

    /// Accepts at most two bytes per write
    struct Narrow(Vec<u8>);

    impl AsyncWrite for Narrow {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let n = buf.len().min(2);
            self.0.extend_from_slice(&buf[..n]);
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn empty_payload_is_a_single_zero_byte() {
        let mut wire = Vec::new();
        send_frame(&mut wire, &[]).await.unwrap();
        assert_eq!(wire, vec![0x00]);

        let mut reader = wire.as_slice();
        assert!(receive_frame(&mut reader, 16).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn frames_survive_short_reads_and_writes() {
        let payload: Vec<u8> = (0..=255u8).collect();

        let mut narrow = Narrow(Vec::new());
        send_frame(&mut narrow, &payload).await.unwrap();
        assert_eq!(&narrow.0[..2], &[0x80, 0x02]);

        let mut trickle = Trickle::new(narrow.0);
        let received = receive_frame(&mut trickle, 1024).await.unwrap();
        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn eof_before_frame_is_connection_closed() {
        let mut reader: &[u8] = &[];
        assert!(matches!(
            receive_frame(&mut reader, 16).await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn eof_inside_frame_is_io_error() {
        let mut reader: &[u8] = &[0x05, 1, 2];
        match receive_frame(&mut reader, 16).await {
            Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected UnexpectedEof, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected_before_reading() {
        let mut reader: &[u8] = &[0x80, 0x08];
        assert!(matches!(
            receive_frame(&mut reader, 512).await,
            Err(Error::FrameTooLarge { size: 1024, max: 512 })
        ));
    }

    #[tokio::test]
    async fn overlong_length_is_invalid_data() {
        let mut reader: &[u8] = &[0xff; 11];
        match receive_frame(&mut reader, usize::MAX).await {
            Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::InvalidData),
            other => panic!("expected InvalidData, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn discard_consumes_exactly_len() {
        let data: Vec<u8> = (0..10_000u32).map(|i| i as u8).collect();
        let mut reader = data.as_slice();
        discard(&mut reader, 9_000).await.unwrap();
        assert_eq!(reader.len(), 1_000);
        assert_eq!(reader[0], (9_000u32 % 256) as u8);
    }
}
