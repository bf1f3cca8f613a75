//! Block synchronization: catch a lagging replica up to the chain tip by
//! downloading blocks from peers in parallel and appending them in strict
//! order.
//!
//! The [`BlockPool`] is a value-oriented state machine over a sliding window
//! of per-height request slots; the [`Reactor`] drives it from peer events
//! and timers, verifies each block with the *next* block's last-commit, and
//! appends through the block store.

mod pool;
mod reactor;
mod types;

pub use pool::{AddBlockError, BlockPool};
pub use reactor::{Reactor, ReactorError, SyncEvent};
pub use types::{Envelope, Message, PeerError, PeerFault};

use std::time::Duration;

/// Tuning knobs of the block-sync subsystem.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// How long a peer may sit on a block request before it is dropped.
    pub peer_timeout: Duration,

    /// Size of the request window ahead of the next height to append.
    pub window_size: usize,

    /// Maximum concurrent outstanding requests per peer.
    pub max_pending_per_peer: usize,

    /// Interval between status broadcasts.
    pub status_interval: Duration,

    /// Interval between timeout sweeps and request refills.
    pub retry_interval: Duration,

    /// Consecutive status ticks at the tip before declaring catch-up done.
    pub caught_up_dwell: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            peer_timeout: Duration::from_secs(15),
            window_size: 400,
            max_pending_per_peer: 50,
            status_interval: Duration::from_secs(10),
            retry_interval: Duration::from_secs(1),
            caught_up_dwell: 2,
        }
    }
}
