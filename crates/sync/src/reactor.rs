use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use baronbft_core_types::{Block, BlockId, Commit, PartSet, PeerId, ValidatorSet};
use baronbft_store::{BlockStore, StoreError};

use crate::{BlockPool, Envelope, Message, PeerError, PeerFault, SyncConfig};

/// How many fresh requests one refill pass may dispatch.
const MAX_REQUESTS_PER_FILL: usize = 64;

#[derive(Debug, Error)]
pub enum ReactorError {
    /// The block store refused a save; fatal to the replica.
    #[error("block store failure: {0}")]
    Store(#[from] StoreError),

    #[error("outbound channel closed")]
    OutboundClosed,

    #[error("peer error channel closed")]
    PeerErrorsClosed,
}

/// Inputs the enclosing P2P layer feeds the reactor.
#[derive(Clone, Debug)]
pub enum SyncEvent {
    PeerConnected(PeerId),
    PeerDisconnected(PeerId),
    Received(PeerId, Message),
}

/// The block-sync reactor.
///
/// Owns the [`BlockPool`], drives request production and the popper loop
/// from one event loop, and surfaces faulty peers on the peer-error
/// channel. Blocks are verified with the two-block lookahead: block H is
/// appended only after block H+1's last-commit proves a +2/3 majority over
/// H from the validator set.
pub struct Reactor {
    chain_id: String,
    validator_set: Arc<ValidatorSet>,
    store: Arc<BlockStore>,
    config: SyncConfig,

    pool: BlockPool,
    connected: BTreeSet<PeerId>,

    outbound: mpsc::Sender<Envelope>,
    peer_errors: mpsc::Sender<PeerError>,
    caught_up_tx: watch::Sender<bool>,
    dwell: u32,
}

impl Reactor {
    /// Build a reactor resuming from the store's current tip.
    ///
    /// Returns the reactor and a watch that flips to `true` once the
    /// replica has caught up and the consensus manager should take over.
    pub fn new(
        chain_id: impl Into<String>,
        validator_set: Arc<ValidatorSet>,
        store: Arc<BlockStore>,
        config: SyncConfig,
        outbound: mpsc::Sender<Envelope>,
        peer_errors: mpsc::Sender<PeerError>,
    ) -> (Self, watch::Receiver<bool>) {
        let start_height = store.height().increment();
        let pool = BlockPool::new(start_height, &config);

        let (caught_up_tx, caught_up_rx) = watch::channel(false);

        let reactor = Self {
            chain_id: chain_id.into(),
            validator_set,
            store,
            config,
            pool,
            connected: BTreeSet::new(),
            outbound,
            peer_errors,
            caught_up_tx,
            dwell: 0,
        };

        (reactor, caught_up_rx)
    }

    /// Run until caught up, shut down, or hit by a fatal store error.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<SyncEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), ReactorError> {
        info!(height = %self.pool.height(), "Block sync starting");

        let mut status_tick = tokio::time::interval(self.config.status_interval);
        let mut retry_tick = tokio::time::interval(self.config.retry_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Block sync shutting down");
                    return Ok(());
                }

                event = events.recv() => {
                    match event {
                        None => return Ok(()),
                        Some(event) => self.on_event(event).await?,
                    }
                }

                _ = status_tick.tick() => {
                    self.broadcast_status_request().await?;

                    if self.check_caught_up() {
                        info!(height = %self.pool.height(), "Caught up, handing over to consensus");
                        return Ok(());
                    }
                }

                _ = retry_tick.tick() => self.on_retry_tick().await?,
            }
        }
    }

    async fn on_event(&mut self, event: SyncEvent) -> Result<(), ReactorError> {
        match event {
            SyncEvent::PeerConnected(peer) => {
                debug!(%peer, "Peer connected");
                self.connected.insert(peer.clone());
                self.send(peer, Message::StatusRequest).await
            }

            SyncEvent::PeerDisconnected(peer) => {
                debug!(%peer, "Peer disconnected");
                self.connected.remove(&peer);
                self.pool.remove_peer(&peer);
                Ok(())
            }

            SyncEvent::Received(peer, message) => self.on_message(peer, message).await,
        }
    }

    async fn on_message(&mut self, peer: PeerId, message: Message) -> Result<(), ReactorError> {
        match message {
            Message::StatusRequest => {
                let response = Message::StatusResponse {
                    base: self.store.base(),
                    height: self.store.height(),
                };
                self.send(peer, response).await
            }

            Message::StatusResponse { base, height } => {
                debug!(%peer, %base, %height, "Received peer status");
                self.pool.set_peer_status(peer, base, height);
                self.fill_requests().await
            }

            Message::BlockRequest { height } => match self.store.load_block(height)? {
                Some(block) => {
                    self.send(
                        peer,
                        Message::BlockResponse {
                            block: Box::new(block),
                        },
                    )
                    .await
                }
                None => self.send(peer, Message::NoBlockResponse { height }).await,
            },

            Message::BlockResponse { block } => self.on_block(peer, *block).await,

            Message::NoBlockResponse { height } => {
                if self.pool.mark_no_block(&peer, height) {
                    debug!(%peer, %height, "Peer lacks requested height, re-requesting");
                    self.fill_requests().await?;
                }
                Ok(())
            }
        }
    }

    async fn on_block(&mut self, peer: PeerId, block: Block) -> Result<(), ReactorError> {
        let height = block.height();

        match self.pool.add_block(&peer, block) {
            Ok(_) => {
                self.try_pop().await?;
                self.fill_requests().await
            }

            Err(e) => {
                warn!(%peer, %height, error = %e, "Rejected block response");

                self.report_peer(
                    peer.clone(),
                    PeerFault::UnsolicitedResponse {
                        reason: e.to_string(),
                    },
                )
                .await?;
                self.pool.remove_peer(&peer);

                Ok(())
            }
        }
    }

    /// Pop and append every verifiable block at the base of the window.
    ///
    /// Block H is only popped when block H+1 is present: H+1's last-commit
    /// is the +2/3 certificate over H. A block that fails verification
    /// marks both source peers faulty and reverts their slots.
    async fn try_pop(&mut self) -> Result<(), ReactorError> {
        loop {
            let (first, second) = match self.pool.peek_two_blocks() {
                (Some(first), Some(second)) => (first.clone(), second.clone()),
                _ => return Ok(()),
            };

            let height = first.height();

            match self.verify_first_block(&first, &second) {
                // The successor's last-commit doubles as this block's seen
                // commit: the certificate over the block itself.
                Ok((parts, seen_commit)) => {
                    self.store.save_block(&first, &parts, &seen_commit)?;
                    self.pool.pop_request();

                    debug!(%height, "Appended block");
                }

                Err(reason) => {
                    warn!(%height, %reason, "Invalid block, punishing source peers");

                    for h in [height, height.increment()] {
                        if let Some(peer) = self.pool.redo_request(h) {
                            self.report_peer(
                                peer,
                                PeerFault::InvalidBlock {
                                    height: h,
                                    reason: reason.clone(),
                                },
                            )
                            .await?;
                        }
                    }

                    return Ok(());
                }
            }
        }
    }

    /// All checks gating an append: structural validity, validator-set
    /// binding, and the +2/3 last-commit of the successor. Returns the
    /// block's part set and the successor's last-commit for persistence.
    fn verify_first_block(
        &self,
        first: &Block,
        second: &Block,
    ) -> Result<(PartSet, Commit), String> {
        first
            .validate_basic(&self.chain_id)
            .map_err(|e| e.to_string())?;

        let expected_validators = self.validator_set.hash();
        if first.header.validators_hash != expected_validators {
            return Err(format!(
                "validators hash mismatch: block has {}, expected {}",
                first.header.validators_hash, expected_validators
            ));
        }

        let parts = first.make_part_set().map_err(|e| e.to_string())?;
        let first_id = BlockId::new(first.hash(), *parts.header());

        let Some(last_commit) = &second.last_commit else {
            return Err(format!(
                "block at height {} carries no last commit",
                second.height()
            ));
        };

        self.validator_set
            .verify_commit_light(&self.chain_id, &first_id, first.height(), last_commit)
            .map_err(|e| e.to_string())?;

        Ok((parts, last_commit.clone()))
    }

    async fn fill_requests(&mut self) -> Result<(), ReactorError> {
        let now = Instant::now();

        for height in self.pool.next_request_heights(MAX_REQUESTS_PER_FILL) {
            let Some(peer) = self.pool.try_request(height, now) else {
                // No eligible peer for this height; later heights need the
                // same peers, so stop here and retry on the next tick.
                break;
            };

            debug!(%peer, %height, "Requesting block");
            self.send(peer, Message::BlockRequest { height }).await?;
        }

        Ok(())
    }

    async fn on_retry_tick(&mut self) -> Result<(), ReactorError> {
        let now = Instant::now();

        for peer in self.pool.timed_out_peers(now) {
            warn!(%peer, "Peer timed out on a block request");

            self.report_peer(
                peer.clone(),
                PeerFault::Timeout {
                    height: self.pool.height(),
                },
            )
            .await?;
            self.pool.remove_peer(&peer);
        }

        self.try_pop().await?;
        self.fill_requests().await
    }

    async fn broadcast_status_request(&mut self) -> Result<(), ReactorError> {
        for peer in self.connected.clone() {
            self.send(peer, Message::StatusRequest).await?;
        }
        Ok(())
    }

    /// Caught-up detection with dwell: the pool must sit at the network tip
    /// for a configured number of consecutive status ticks.
    fn check_caught_up(&mut self) -> bool {
        if self.pool.is_caught_up() {
            self.dwell += 1;
        } else {
            self.dwell = 0;
        }

        if self.dwell >= self.config.caught_up_dwell {
            let _ = self.caught_up_tx.send(true);
            return true;
        }

        false
    }

    async fn send(&self, to: PeerId, message: Message) -> Result<(), ReactorError> {
        self.outbound
            .send(Envelope { to, message })
            .await
            .map_err(|_| ReactorError::OutboundClosed)
    }

    async fn report_peer(&self, peer_id: PeerId, fault: PeerFault) -> Result<(), ReactorError> {
        self.peer_errors
            .send(PeerError { peer_id, fault })
            .await
            .map_err(|_| ReactorError::PeerErrorsClosed)
    }
}
