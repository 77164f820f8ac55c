//! Wirecall Codec - request/response codecs over byte streams
//!
//! Frames binary headers, compresses and checksums bodies, and pairs
//! responses with the requests that produced them, so a generic RPC runtime
//! can run over any tokio stream (TCP, Unix sockets, in-memory pipes).
//!
//! # Example
//!
//! ```no_run
//! use wirecall_codec::codec::{RpcClientCodec, RpcServerCodec};
//! use wirecall_codec::transport::{TcpCodecListener, TcpConnector};
//! use wirecall_core::CompressType;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct AddArgs { a: i32, b: i32 }
//!
//! #[derive(Serialize, Deserialize, Default)]
//! struct AddReply { c: i32 }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let listener = TcpCodecListener::bind("127.0.0.1:0".parse()?).await?;
//! let addr = listener.local_addr()?;
//!
//! tokio::spawn(async move {
//!     let (server, _peer) = listener.accept().await?;
//!     let request = server.read_request_header().await?;
//!     let mut args = AddArgs { a: 0, b: 0 };
//!     server.read_request_body(Some(&mut args)).await?;
//!     let reply = AddReply { c: args.a + args.b };
//!     server.write_response(request.seq, "", Some(&reply)).await?;
//!     Ok::<_, wirecall_codec::Error>(())
//! });
//!
//! let client = TcpConnector::new().address(addr).connect().await?;
//! client.write_request(1, "Calc.Add", Some(&AddArgs { a: 1, b: 2 })).await?;
//! let response = client.read_response_header().await?;
//! let mut reply = AddReply::default();
//! client.read_response_body(Some(&mut reply)).await?;
//! assert_eq!((response.seq, reply.c), (1, 3));
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod compressor;
pub mod error;
pub mod frame;
pub mod serializer;
pub mod transport;

// Re-exports for convenience
pub use codec::{
    ClientCodec, ClientCodecBuilder, RequestMeta, ResponseMeta, RpcClientCodec, RpcServerCodec,
    ServerCodec, ServerCodecBuilder,
};
pub use compressor::{Compressor, CompressorRegistry};
pub use error::{Error, Result};
pub use serializer::Serializer;
pub use wirecall_core::CompressType;
