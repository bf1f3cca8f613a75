use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid address `{0}`")]
    InvalidAddress(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] baronbft_codec::Error),

    #[error("failed to connect to {addr} within {timeout:?}")]
    DialTimeout { addr: String, timeout: Duration },

    #[error("echo handshake did not complete in time")]
    EchoTimeout,

    #[error("server returned an exception: {0}")]
    Exception(String),

    #[error("unexpected response: expected {expected}, got {got}")]
    UnexpectedResponse {
        expected: &'static str,
        got: &'static str,
    },

    /// The connection failed earlier; the original error is shared by every
    /// handle that was in flight.
    #[error("client stopped: {0}")]
    Stopped(SharedError),

    #[error("request queue closed")]
    ChannelClosed,
}

/// A connection-level error latched by the client and handed to every
/// in-flight and subsequent request.
#[derive(Clone, Debug, Error)]
#[error(transparent)]
pub struct SharedError(pub Arc<Error>);

impl SharedError {
    pub fn new(error: Error) -> Self {
        Self(Arc::new(error))
    }
}
