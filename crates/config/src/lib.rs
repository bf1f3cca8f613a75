//! Configuration options for the baronbft replication engine.
//!
//! All options are plain struct values handed to the subsystems at
//! construction time; nothing here is a process-wide singleton.

use core::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use bytesize::ByteSize;
use config as config_rs;
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// A custom human-readable name for this node.
    pub moniker: String,

    /// Chain this node participates in.
    pub chain_id: String,

    /// ABCI connection options.
    pub abci: AbciConfig,

    /// Block-sync options.
    pub sync: SyncConfig,

    /// Wire codec options.
    pub codec: CodecConfig,
}

/// Parse the given config file, then layer prefixed environment variables
/// (e.g. `BARONBFT_ABCI__ADDRESS`) on top.
pub fn load_config(config_file_path: &Path, prefix: Option<&str>) -> Result<Config, String> {
    config_rs::Config::builder()
        .add_source(config_rs::File::from(config_file_path))
        .add_source(
            config_rs::Environment::with_prefix(prefix.unwrap_or("BARONBFT")).separator("__"),
        )
        .build()
        .map_err(|error| error.to_string())?
        .try_deserialize()
        .map_err(|error| error.to_string())
}

/// Which ABCI transport the replica uses to reach the application.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbciTransport {
    /// Stream socket (TCP or Unix) with length-delimited framing.
    #[default]
    Socket,
    /// In-process application, no wire in between.
    Local,
}

impl AbciTransport {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Socket => "socket",
            Self::Local => "local",
        }
    }
}

impl FromStr for AbciTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "socket" => Ok(Self::Socket),
            "local" => Ok(Self::Local),
            e => Err(format!("unknown ABCI transport: {e}, available: socket, local")),
        }
    }
}

impl fmt::Display for AbciTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// ABCI connection options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbciConfig {
    /// Application address: `tcp://host:port` or `unix:///path.sock`.
    pub address: String,

    /// Transport to use.
    pub transport: AbciTransport,

    /// How long one dial attempt may take.
    #[serde(with = "humantime_serde")]
    pub dial_timeout: Duration,

    /// Bound on the echo handshake after connecting.
    #[serde(with = "humantime_serde")]
    pub echo_timeout: Duration,

    /// Grace period for open connections at server shutdown.
    #[serde(with = "humantime_serde")]
    pub grace: Duration,
}

impl Default for AbciConfig {
    fn default() -> Self {
        Self {
            address: "tcp://127.0.0.1:26658".to_string(),
            transport: AbciTransport::default(),
            dial_timeout: Duration::from_secs(3),
            echo_timeout: Duration::from_secs(1),
            grace: Duration::from_secs(5),
        }
    }
}

/// Block-sync options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How long a peer may sit on a block request.
    #[serde(with = "humantime_serde")]
    pub peer_timeout: Duration,

    /// Size of the request window ahead of the next height to append.
    pub window_size: usize,

    /// Maximum concurrent outstanding requests per peer.
    pub max_pending_per_peer: usize,

    /// Interval between status broadcasts.
    #[serde(with = "humantime_serde")]
    pub status_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            peer_timeout: Duration::from_secs(15),
            window_size: 400,
            max_pending_per_peer: 50,
            status_interval: Duration::from_secs(10),
        }
    }
}

/// Wire codec options.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Maximum size of a single length-delimited record.
    pub max_record_size: ByteSize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_record_size: ByteSize::mib(100),
        }
    }
}
