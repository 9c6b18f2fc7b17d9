//! Client error taxonomy.
//!
//! None of these cross the consumer boundary as values; the backend converts
//! every failure into a status event before it reaches the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// A credential field was blank; no connection was attempted
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The TCP connection could not be established
    #[error("failed to connect: {0}")]
    Connect(String),
    /// I/O failure while reading from an established connection
    #[error("error while reading IRC input: {0}")]
    Read(String),
    /// I/O failure while writing to an established connection
    #[error("error while writing IRC output: {0}")]
    Write(String),
}
