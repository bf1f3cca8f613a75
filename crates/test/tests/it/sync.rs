use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use baronbft_core_types::{Height, PeerId};
use baronbft_store::BlockStore;
use baronbft_sync::{Envelope, Message, PeerError, PeerFault, Reactor, SyncConfig, SyncEvent};
use baronbft_test::{TestChain, CHAIN_ID};

/// How a simulated peer behaves: what tip it advertises and the highest
/// height it actually answers block requests for.
#[derive(Clone, Copy)]
struct Behavior {
    tip: u64,
    answers_up_to: u64,
}

/// Answer reactor traffic on behalf of every simulated peer. Requests above
/// a peer's `answers_up_to` are silently dropped, which is what a stalled
/// peer looks like from the outside.
async fn drive_peers(
    mut outbound: mpsc::Receiver<Envelope>,
    events: mpsc::Sender<SyncEvent>,
    chain: Arc<TestChain>,
    behaviors: HashMap<PeerId, Behavior>,
) {
    while let Some(Envelope { to, message }) = outbound.recv().await {
        let Some(behavior) = behaviors.get(&to) else {
            continue;
        };

        let reply = match message {
            Message::StatusRequest => Some(Message::StatusResponse {
                base: Height::new(1),
                height: Height::new(behavior.tip),
            }),

            Message::BlockRequest { height } => {
                if height.as_u64() <= behavior.answers_up_to {
                    Some(Message::BlockResponse {
                        block: Box::new(chain.block(height.as_u64()).clone()),
                    })
                } else {
                    None
                }
            }

            _ => None,
        };

        if let Some(reply) = reply {
            if events
                .send(SyncEvent::Received(to.clone(), reply))
                .await
                .is_err()
            {
                break;
            }
        }
    }
}

struct Harness {
    store: Arc<BlockStore>,
    events: mpsc::Sender<SyncEvent>,
    peer_errors: mpsc::Receiver<PeerError>,
    caught_up: watch::Receiver<bool>,
    // Dropping the sender reads as a shutdown to the reactor.
    _shutdown: watch::Sender<bool>,
    _dir: tempfile::TempDir,
}

fn start_reactor(chain: Arc<TestChain>, behaviors: HashMap<PeerId, Behavior>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(BlockStore::open(dir.path().join("blocks.redb")).unwrap());

    let config = SyncConfig {
        peer_timeout: Duration::from_millis(500),
        window_size: 20,
        max_pending_per_peer: 50,
        status_interval: Duration::from_millis(100),
        retry_interval: Duration::from_millis(50),
        caught_up_dwell: 2,
    };

    let (outbound_tx, outbound_rx) = mpsc::channel(1024);
    let (peer_err_tx, peer_err_rx) = mpsc::channel(64);
    let (events_tx, events_rx) = mpsc::channel(1024);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (reactor, caught_up) = Reactor::new(
        CHAIN_ID,
        Arc::new(chain.validator_set.clone()),
        store.clone(),
        config,
        outbound_tx,
        peer_err_tx,
    );

    tokio::spawn(reactor.run(events_rx, shutdown_rx));
    tokio::spawn(drive_peers(
        outbound_rx,
        events_tx.clone(),
        chain,
        behaviors,
    ));

    Harness {
        store,
        events: events_tx,
        peer_errors: peer_err_rx,
        caught_up,
        _shutdown: shutdown_tx,
        _dir: dir,
    }
}

/// Peers advertise tip 10; the replica can only verify up to 9, because
/// block 10's certificate would live in block 11.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn syncs_to_one_below_network_tip() {
    let chain = Arc::new(TestChain::build(10, &[1, 1, 1, 1]));
    let peer = PeerId::new("peer-1");

    let behaviors = HashMap::from([(
        peer.clone(),
        Behavior {
            tip: 10,
            answers_up_to: 10,
        },
    )]);

    let mut harness = start_reactor(chain.clone(), behaviors);

    harness
        .events
        .send(SyncEvent::PeerConnected(peer))
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(30), async {
        harness.caught_up.wait_for(|caught_up| *caught_up).await
    })
    .await
    .expect("sync finished in time")
    .unwrap();

    assert_eq!(harness.store.base(), Height::new(1));
    assert_eq!(harness.store.height(), Height::new(9));

    // Every appended block carries its own certificate as the seen commit.
    for h in 1..=9 {
        let seen = harness
            .store
            .load_seen_commit(Height::new(h))
            .unwrap()
            .unwrap();
        assert_eq!(&seen, chain.seen_commit(h));
    }
}

/// A peer that answers height 5 but sits on height 6 times out, is
/// reported on the peer-error channel, and its heights are reassigned to a
/// healthy peer.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn timed_out_peer_is_replaced() {
    let chain = Arc::new(TestChain::build(10, &[1, 1, 1, 1]));
    let flaky = PeerId::new("flaky");
    let steady = PeerId::new("steady");

    let behaviors = HashMap::from([
        (
            flaky.clone(),
            Behavior {
                tip: 10,
                answers_up_to: 5,
            },
        ),
        (
            steady.clone(),
            Behavior {
                tip: 10,
                answers_up_to: 10,
            },
        ),
    ]);

    let mut harness = start_reactor(chain.clone(), behaviors);

    harness
        .events
        .send(SyncEvent::PeerConnected(flaky.clone()))
        .await
        .unwrap();

    // The flaky peer must be reported for the stalled request.
    let error = tokio::time::timeout(Duration::from_secs(30), harness.peer_errors.recv())
        .await
        .expect("peer error arrived in time")
        .expect("peer error channel open");

    assert_eq!(error.peer_id, flaky);
    assert!(matches!(error.fault, PeerFault::Timeout { .. }));

    // A healthy peer joins and carries the sync to the verifiable tip.
    harness
        .events
        .send(SyncEvent::PeerConnected(steady))
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(30), async {
        harness.caught_up.wait_for(|caught_up| *caught_up).await
    })
    .await
    .expect("sync finished in time")
    .unwrap();

    assert_eq!(harness.store.height(), Height::new(9));
}
