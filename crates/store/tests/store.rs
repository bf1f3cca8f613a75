use baronbft_core_types::{Hash, Height};
use baronbft_store::{BlockStore, StoreError};

use baronbft_test::TestChain;

fn save_chain(store: &BlockStore, chain: &TestChain, up_to: u64) {
    for h in 1..=up_to {
        let block = chain.block(h);
        let parts = block.make_part_set().unwrap();
        store
            .save_block(block, &parts, chain.seen_commit(h))
            .unwrap();
    }
}

#[test]
fn starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = BlockStore::open(dir.path().join("blocks.redb")).unwrap();

    assert_eq!(store.base(), Height::ZERO);
    assert_eq!(store.height(), Height::ZERO);
    assert_eq!(store.size(), 0);
    assert!(store.load_block(Height::new(1)).unwrap().is_none());
}

#[test]
fn save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = BlockStore::open(dir.path().join("blocks.redb")).unwrap();
    let chain = TestChain::build(3, &[1, 1, 1, 1]);

    save_chain(&store, &chain, 3);

    assert_eq!(store.base(), Height::new(1));
    assert_eq!(store.height(), Height::new(3));
    assert_eq!(store.size(), 3);

    for h in 1..=3 {
        let loaded = store.load_block(Height::new(h)).unwrap().unwrap();
        assert_eq!(&loaded, chain.block(h));

        let meta = store.load_block_meta(Height::new(h)).unwrap().unwrap();
        assert_eq!(meta.header, chain.block(h).header);
        assert_eq!(meta.num_txs, 1);

        let seen = store.load_seen_commit(Height::new(h)).unwrap().unwrap();
        assert_eq!(&seen, chain.seen_commit(h));
    }

    // The block's own last-commit certifies the previous height.
    assert!(store.load_block_commit(Height::new(1)).unwrap().is_none());
    let commit = store.load_block_commit(Height::new(2)).unwrap().unwrap();
    assert_eq!(&commit, chain.seen_commit(1));
}

#[test]
fn lookup_by_hash() {
    let dir = tempfile::tempdir().unwrap();
    let store = BlockStore::open(dir.path().join("blocks.redb")).unwrap();
    let chain = TestChain::build(2, &[1, 1, 1, 1]);

    save_chain(&store, &chain, 2);

    let target = chain.block(2);
    let found = store.load_block_by_hash(&target.hash()).unwrap().unwrap();
    assert_eq!(&found, target);

    let missing = Hash::sha3_of(b"no such block");
    assert!(store.load_block_by_hash(&missing).unwrap().is_none());
}

#[test]
fn rejects_non_contiguous_saves() {
    let dir = tempfile::tempdir().unwrap();
    let store = BlockStore::open(dir.path().join("blocks.redb")).unwrap();
    let chain = TestChain::build(3, &[1, 1, 1, 1]);

    save_chain(&store, &chain, 1);

    let block = chain.block(3);
    let parts = block.make_part_set().unwrap();
    let err = store
        .save_block(block, &parts, chain.seen_commit(3))
        .unwrap_err();

    assert!(matches!(err, StoreError::NonContiguous { .. }));
    assert_eq!(store.height(), Height::new(1));
}

#[test]
fn reads_are_stable_across_reads() {
    let dir = tempfile::tempdir().unwrap();
    let store = BlockStore::open(dir.path().join("blocks.redb")).unwrap();
    let chain = TestChain::build(1, &[1, 1, 1, 1]);

    save_chain(&store, &chain, 1);

    let first = store.load_block_meta(Height::new(1)).unwrap().unwrap();
    let second = store.load_block_meta(Height::new(1)).unwrap().unwrap();
    assert_eq!(first, second);
}

#[test]
fn prune_raises_base_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = BlockStore::open(dir.path().join("blocks.redb")).unwrap();
    let chain = TestChain::build(5, &[1, 1, 1, 1]);

    save_chain(&store, &chain, 5);

    let pruned = store.prune_blocks(Height::new(3)).unwrap();
    assert_eq!(pruned, 2);
    assert_eq!(store.base(), Height::new(3));
    assert_eq!(store.height(), Height::new(5));

    // Below the new base: gone, including the hash index.
    assert!(store.load_block(Height::new(2)).unwrap().is_none());
    assert!(store
        .load_block_by_hash(&chain.block(2).hash())
        .unwrap()
        .is_none());

    // At and above the new base: still there.
    assert!(store.load_block(Height::new(3)).unwrap().is_some());

    // Idempotent.
    assert_eq!(store.prune_blocks(Height::new(3)).unwrap(), 0);

    // Beyond the tip is refused.
    assert!(matches!(
        store.prune_blocks(Height::new(9)),
        Err(StoreError::PruneBeyondHeight { .. })
    ));
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blocks.redb");
    let chain = TestChain::build(2, &[1, 1, 1, 1]);

    {
        let store = BlockStore::open(&path).unwrap();
        save_chain(&store, &chain, 2);
    }

    let store = BlockStore::open(&path).unwrap();
    assert_eq!(store.base(), Height::new(1));
    assert_eq!(store.height(), Height::new(2));

    let loaded = store.load_block(Height::new(2)).unwrap().unwrap();
    assert_eq!(&loaded, chain.block(2));
}
