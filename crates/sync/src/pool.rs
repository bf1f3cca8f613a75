use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rand::seq::IteratorRandom;
use thiserror::Error;
use tracing::debug;

use baronbft_core_types::{Block, Height, PeerId};

use crate::SyncConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddBlockError {
    #[error("block at height {height} was not requested")]
    Unsolicited { height: Height },

    #[error("block at height {height} was requested from {expected}, received from {got}")]
    WrongPeer {
        height: Height,
        expected: PeerId,
        got: PeerId,
    },

    #[error("block at height {height} was already received")]
    Duplicate { height: Height },
}

/// One height of the request window.
#[derive(Clone, Debug)]
enum Slot {
    /// Requested from `peer` at `since`; the timeout clock runs from there.
    Pending { peer: PeerId, since: Instant },

    /// Received from `peer`, waiting for its successor so it can be
    /// verified and popped.
    Received { peer: PeerId, block: Box<Block> },
}

impl Slot {
    fn peer(&self) -> &PeerId {
        match self {
            Slot::Pending { peer, .. } | Slot::Received { peer, .. } => peer,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct PoolPeer {
    base: Height,
    height: Height,
    num_pending: usize,
}

/// The sliding window `[height, height + window)` of in-flight and
/// completed block requests, plus per-peer accounting.
///
/// The pool is a plain state machine: the reactor owns it, injects times,
/// and performs all I/O. Blocks leave in strictly ascending height order,
/// and only once the *next* height is also present (two-block lookahead),
/// because only block H+1's last-commit certifies block H.
pub struct BlockPool {
    /// Next height to append.
    height: Height,
    slots: BTreeMap<u64, Slot>,
    peers: BTreeMap<PeerId, PoolPeer>,
    max_peer_height: Height,

    peer_timeout: Duration,
    window_size: usize,
    max_pending_per_peer: usize,

    rng: Box<dyn rand::RngCore + Send + Sync>,
}

impl BlockPool {
    pub fn new(start_height: Height, config: &SyncConfig) -> Self {
        Self::new_with_rng(
            start_height,
            config,
            Box::new(rand::rngs::OsRng),
        )
    }

    pub fn new_with_rng(
        start_height: Height,
        config: &SyncConfig,
        rng: Box<dyn rand::RngCore + Send + Sync>,
    ) -> Self {
        Self {
            height: start_height,
            slots: BTreeMap::new(),
            peers: BTreeMap::new(),
            max_peer_height: Height::ZERO,
            peer_timeout: config.peer_timeout,
            window_size: config.window_size,
            max_pending_per_peer: config.max_pending_per_peer,
            rng,
        }
    }

    /// Next height to append.
    pub fn height(&self) -> Height {
        self.height
    }

    /// Highest height any known peer claims to have.
    pub fn max_peer_height(&self) -> Height {
        self.max_peer_height
    }

    pub fn num_peers(&self) -> usize {
        self.peers.len()
    }

    pub fn num_pending(&self) -> usize {
        self.slots
            .values()
            .filter(|s| matches!(s, Slot::Pending { .. }))
            .count()
    }

    pub fn num_received(&self) -> usize {
        self.slots
            .values()
            .filter(|s| matches!(s, Slot::Received { .. }))
            .count()
    }

    /// Record a peer's reported (base, height) range.
    pub fn set_peer_status(&mut self, peer: PeerId, base: Height, height: Height) {
        let entry = self.peers.entry(peer).or_default();
        entry.base = base;
        entry.height = height;

        if height > self.max_peer_height {
            self.max_peer_height = height;
        }
    }

    /// Drop a peer and revert every slot assigned to it, pending or
    /// received: a faulty peer's blocks are not trusted either.
    pub fn remove_peer(&mut self, peer: &PeerId) {
        let reverted: Vec<u64> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.peer() == peer)
            .map(|(&h, _)| h)
            .collect();

        for h in &reverted {
            self.slots.remove(h);
        }

        if !reverted.is_empty() {
            debug!(%peer, slots = reverted.len(), "Reverted slots of removed peer");
        }

        self.peers.remove(peer);
        self.recompute_max_peer_height();
    }

    fn recompute_max_peer_height(&mut self) {
        self.max_peer_height = self
            .peers
            .values()
            .map(|p| p.height)
            .max()
            .unwrap_or(Height::ZERO);
    }

    /// Empty heights of the window, lowest first, that some peer could
    /// serve; at most `max` of them.
    pub fn next_request_heights(&self, max: usize) -> Vec<Height> {
        let start = self.height.as_u64();
        let end = start + self.window_size as u64;

        (start..end)
            .filter(|h| !self.slots.contains_key(h))
            .map(Height::new)
            .filter(|h| *h <= self.max_peer_height)
            .take(max)
            .collect()
    }

    /// Pick an eligible peer for `height` and mark the slot requested.
    /// Returns `None` when the slot is taken or no peer qualifies.
    pub fn try_request(&mut self, height: Height, now: Instant) -> Option<PeerId> {
        if self.slots.contains_key(&height.as_u64()) {
            return None;
        }

        let peer = self
            .peers
            .iter()
            .filter(|(_, p)| {
                p.base <= height && height <= p.height && p.num_pending < self.max_pending_per_peer
            })
            .map(|(peer, _)| peer.clone())
            .choose_stable(&mut self.rng)?;

        self.slots.insert(
            height.as_u64(),
            Slot::Pending {
                peer: peer.clone(),
                since: now,
            },
        );

        if let Some(p) = self.peers.get_mut(&peer) {
            p.num_pending += 1;
        }

        Some(peer)
    }

    /// Accept a block from `peer` into its pending slot.
    pub fn add_block(&mut self, peer: &PeerId, block: Block) -> Result<Height, AddBlockError> {
        let height = block.height();

        match self.slots.get(&height.as_u64()) {
            None => Err(AddBlockError::Unsolicited { height }),

            Some(Slot::Received { .. }) => Err(AddBlockError::Duplicate { height }),

            Some(Slot::Pending { peer: expected, .. }) => {
                if expected != peer {
                    return Err(AddBlockError::WrongPeer {
                        height,
                        expected: expected.clone(),
                        got: peer.clone(),
                    });
                }

                if let Some(p) = self.peers.get_mut(peer) {
                    p.num_pending = p.num_pending.saturating_sub(1);
                }

                self.slots.insert(
                    height.as_u64(),
                    Slot::Received {
                        peer: peer.clone(),
                        block: Box::new(block),
                    },
                );

                Ok(height)
            }
        }
    }

    /// A peer answered that it lacks `height`: revert the slot so another
    /// peer can be asked. Returns whether anything was reverted.
    pub fn mark_no_block(&mut self, peer: &PeerId, height: Height) -> bool {
        match self.slots.get(&height.as_u64()) {
            Some(Slot::Pending { peer: expected, .. }) if expected == peer => {
                self.slots.remove(&height.as_u64());
                if let Some(p) = self.peers.get_mut(peer) {
                    p.num_pending = p.num_pending.saturating_sub(1);
                }
                true
            }
            _ => false,
        }
    }

    /// The blocks at `height` and `height + 1`, if received.
    pub fn peek_two_blocks(&self) -> (Option<&Block>, Option<&Block>) {
        (
            self.received_at(self.height.as_u64()),
            self.received_at(self.height.as_u64() + 1),
        )
    }

    fn received_at(&self, height: u64) -> Option<&Block> {
        match self.slots.get(&height) {
            Some(Slot::Received { block, .. }) => Some(block),
            _ => None,
        }
    }

    /// Free the slot at the current height and advance the base by one.
    ///
    /// Refuses to pop unless the successor is also present: block H's
    /// certificate lives in block H+1, so popping without it would hand an
    /// unverifiable block downstream.
    pub fn pop_request(&mut self) -> Option<(PeerId, Block)> {
        let h = self.height.as_u64();

        if self.received_at(h + 1).is_none() {
            return None;
        }

        match self.slots.remove(&h) {
            Some(Slot::Received { peer, block }) => {
                self.height = self.height.increment();
                Some((peer, *block))
            }
            Some(slot) => {
                // Not received after all; put it back untouched.
                self.slots.insert(h, slot);
                None
            }
            None => None,
        }
    }

    /// Mark the peer that filled `height` faulty: drop it and revert every
    /// slot it touched. Returns the punished peer, if the slot was filled.
    pub fn redo_request(&mut self, height: Height) -> Option<PeerId> {
        let peer = self.slots.get(&height.as_u64()).map(|s| s.peer().clone())?;
        self.remove_peer(&peer);
        Some(peer)
    }

    /// Peers with a request outstanding longer than the peer timeout.
    pub fn timed_out_peers(&self, now: Instant) -> Vec<PeerId> {
        let mut timed_out: Vec<PeerId> = Vec::new();

        for slot in self.slots.values() {
            if let Slot::Pending { peer, since } = slot {
                if now.duration_since(*since) >= self.peer_timeout && !timed_out.contains(peer) {
                    timed_out.push(peer.clone());
                }
            }
        }

        timed_out
    }

    /// Whether the pool has reached the network tip: every height below the
    /// maximum peer-reported height has been appended.
    pub fn is_caught_up(&self) -> bool {
        !self.peers.is_empty() && self.height >= self.max_peer_height
    }
}

impl std::fmt::Debug for BlockPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockPool")
            .field("height", &self.height)
            .field("max_peer_height", &self.max_peer_height)
            .field("slots", &self.slots.len())
            .field("peers", &self.peers.len())
            .finish()
    }
}
