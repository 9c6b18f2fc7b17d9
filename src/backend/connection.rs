//! Connection establishment for the chat gateway.
//!
//! The gateway speaks plain line-oriented IRC over TCP; the stream is wrapped
//! in a line codec so the rest of the backend deals in whole lines only.

use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};

use crate::error::ClientError;

/// Framed line transport over the gateway TCP stream.
pub type Transport = Framed<TcpStream, LinesCodec>;

/// Maximum accepted inbound line length. Gateway lines (including tag
/// segments) fit well within this.
const MAX_LINE_LEN: usize = 8192;

/// Open a TCP connection to the gateway and wrap it in a line codec.
pub async fn establish_connection(server: &str, port: u16) -> Result<Transport, ClientError> {
    let addr = format!("{}:{}", server, port);

    let stream = TcpStream::connect(&addr)
        .await
        .map_err(|e| ClientError::Connect(format!("TCP connection to {} failed: {}", addr, e)))?;

    Ok(Framed::new(
        stream,
        LinesCodec::new_with_max_length(MAX_LINE_LEN),
    ))
}

/// Write one raw line to the transport, flushing it to the socket.
pub async fn send_line(transport: &mut Transport, line: &str) -> Result<(), ClientError> {
    transport
        .send(line)
        .await
        .map_err(|e| ClientError::Write(e.to_string()))
}
