//! ABCI transport: the request/response bridge between the replication
//! engine (client side) and the deterministic application (server side).
//!
//! Two transports are provided: a stream socket transport (TCP or Unix)
//! using length-delimited framing, and an in-process local transport that
//! short-circuits the stream and invokes the application directly under the
//! same mutex discipline.

mod application;
mod client;
mod error;
mod handle;
mod server;
mod transport;

pub use application::{dispatch, Application};
pub use client::{Client, ClientOptions, GlobalCallback, LocalClient, SocketClient};
pub use error::{Error, SharedError};
pub use handle::ReqRes;
pub use server::{Server, ServerOptions};

/// Default ABCI listen address.
pub const DEFAULT_LISTEN_ADDR: &str = "tcp://127.0.0.1:26658";
