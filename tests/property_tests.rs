//! Property-based and adversarial tests for the FTC checkpoint subsystem
//!
//! These tests verify registry invariants hold under random inputs and that
//! blocks contradicting the checkpoints never make it into the index.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use ftc_core::checkpoints::{
    guess_verification_progress, learn_checkpoint, AddOutcome, Baseline, CheckpointDataset,
    CheckpointError, CheckpointRegistry, CheckpointStore,
};
use ftc_core::consensus::{BlockHeader, ValidationError};
use ftc_core::crypto::Hash;
use ftc_core::params::{Network, REGTEST_PARAMS};
use ftc_core::storage::{ChainIndex, ChainNode, CheckpointDB, StorageError};

const EMPTY: CheckpointDataset = CheckpointDataset {
    checkpoints: &[],
    baseline: Baseline::empty(),
};

fn registry_with(entries: &BTreeMap<u32, [u8; 32]>, enabled: bool) -> CheckpointRegistry {
    let registry = CheckpointRegistry::from_dataset(Network::Regtest, &EMPTY, enabled);
    registry
        .merge(entries.iter().map(|(height, bytes)| (*height, Hash(*bytes))))
        .unwrap();
    registry
}

fn node(hash: Hash, height: u32) -> ChainNode {
    ChainNode {
        hash,
        prev_hash: Hash::zero(),
        height,
        chain_tx: u64::from(height) + 1,
        time: 0,
    }
}

fn checkpoint_map() -> impl Strategy<Value = BTreeMap<u32, [u8; 32]>> {
    prop::collection::btree_map(0u32..1_000_000, any::<[u8; 32]>(), 1..40)
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

proptest! {
    /// Registered pairs pass, any other hash at a registered height fails
    #[test]
    fn prop_check_block_matches_registered_hash(
        entries in checkpoint_map(),
        other in any::<[u8; 32]>(),
    ) {
        let registry = registry_with(&entries, true);

        for (height, bytes) in &entries {
            prop_assert!(registry.check_block(*height, &Hash(*bytes)));
            if other != *bytes {
                prop_assert!(!registry.check_block(*height, &Hash(other)));
            }
        }
    }

    /// Heights without a checkpoint accept any hash
    #[test]
    fn prop_unregistered_height_unconstrained(
        entries in checkpoint_map(),
        height in 0u32..2_000_000,
        hash in any::<[u8; 32]>(),
    ) {
        prop_assume!(!entries.contains_key(&height));
        let registry = registry_with(&entries, true);
        prop_assert!(registry.check_block(height, &Hash(hash)));
    }

    /// Disabled registries accept everything and report nothing
    #[test]
    fn prop_disabled_is_permissive(
        entries in checkpoint_map(),
        hash in any::<[u8; 32]>(),
    ) {
        let registry = registry_with(&entries, false);
        let index: HashMap<Hash, ChainNode> = entries
            .iter()
            .map(|(height, bytes)| (Hash(*bytes), node(Hash(*bytes), *height)))
            .collect();

        for height in entries.keys() {
            prop_assert!(registry.check_block(*height, &Hash(hash)));
        }
        prop_assert_eq!(registry.total_blocks_estimate(), 0);
        prop_assert!(registry.checkpoint_heights_after(0).is_empty());
        prop_assert!(registry.last_local_checkpoint(&index).is_none());
    }

    /// The estimate is the highest registered height
    #[test]
    fn prop_total_blocks_estimate_is_max(entries in checkpoint_map()) {
        let registry = registry_with(&entries, true);
        let max = *entries.keys().next_back().unwrap();
        prop_assert_eq!(registry.total_blocks_estimate(), max);
    }

    /// Heights after h are exactly the registered ones above h, ascending
    #[test]
    fn prop_heights_after_exact(
        entries in checkpoint_map(),
        after in 0u32..1_000_000,
    ) {
        let registry = registry_with(&entries, true);
        let heights = registry.checkpoint_heights_after(after);

        let expected: Vec<u32> = entries.keys().copied().filter(|h| *h > after).collect();
        prop_assert_eq!(&heights, &expected);
        prop_assert!(heights.windows(2).all(|w| w[0] < w[1]));
    }

    /// Re-adding a pair changes nothing; rebinding a height is refused
    #[test]
    fn prop_add_idempotent_and_conflicts_refused(
        entries in checkpoint_map(),
        other in any::<[u8; 32]>(),
    ) {
        let registry = registry_with(&entries, true);
        let before = registry.snapshot();

        for (height, bytes) in &entries {
            prop_assert_eq!(
                registry.add_checkpoint(*height, Hash(*bytes)),
                Ok(AddOutcome::AlreadyPresent)
            );
            if other != *bytes {
                let is_conflict = matches!(
                    registry.add_checkpoint(*height, Hash(other)),
                    Err(CheckpointError::Conflict { .. })
                );
                prop_assert!(is_conflict);
            }
        }

        prop_assert_eq!(registry.snapshot(), before);
    }

    /// The last local checkpoint is the highest registered one the index holds
    #[test]
    fn prop_last_local_checkpoint_is_highest_present(
        entries in checkpoint_map(),
        present in prop::collection::vec(any::<bool>(), 40),
    ) {
        let registry = registry_with(&entries, true);
        let index: HashMap<Hash, ChainNode> = entries
            .iter()
            .zip(present.iter())
            .filter(|(_, keep)| **keep)
            .map(|((height, bytes), _)| (Hash(*bytes), node(Hash(*bytes), *height)))
            .collect();

        let expected = index.values().map(|n| n.height).max();
        let found = registry.last_local_checkpoint(&index).map(|n| n.height);
        prop_assert_eq!(found, expected);
    }

    /// More transactions at the same timestamp never lowers the estimate
    #[test]
    fn prop_progress_monotonic_in_chain_tx(
        baseline_tx in 1u64..1_000_000,
        tx_per_day in 1.0f64..10_000.0,
        a in 1u64..2_000_000,
        extra in 0u64..2_000_000,
        days in 0i64..3_650,
        sigcheck_factor in 1.0f64..20.0,
    ) {
        let baseline = Baseline { timestamp: 1_500_000_000, tx_count: baseline_tx, tx_per_day };
        let now = baseline.timestamp + days * 86_400;
        let at = |chain_tx: u64| ChainNode {
            hash: Hash::zero(),
            prev_hash: Hash::zero(),
            height: 1,
            chain_tx,
            time: baseline.timestamp as u32,
        };

        let low = guess_verification_progress(Some(&at(a)), &baseline, sigcheck_factor, now);
        let high = guess_verification_progress(Some(&at(a + extra)), &baseline, sigcheck_factor, now);

        prop_assert!(high >= low - 1e-12);
        prop_assert!((0.0..=1.0).contains(&low));
    }
}

#[test]
fn test_progress_without_node_is_zero() {
    let baseline = Baseline {
        timestamp: 1_500_000_000,
        tx_count: 10,
        tx_per_day: 1.0,
    };
    assert_eq!(guess_verification_progress(None, &baseline, 5.0, 1_600_000_000), 0.0);
}

// ============================================================================
// CHECKPOINT SCENARIOS
// ============================================================================

const H0: Hash = Hash([0xa0; 32]);
const H1000: Hash = Hash([0xa1; 32]);
const H5000: Hash = Hash([0xa5; 32]);

fn scenario_registry() -> CheckpointRegistry {
    let registry = CheckpointRegistry::from_dataset(Network::Main, &EMPTY, true);
    registry.merge([(0, H0), (1_000, H1000), (5_000, H5000)]).unwrap();
    registry
}

#[test]
fn test_scenario_check_block() {
    let registry = scenario_registry();
    assert!(registry.check_block(1_000, &H1000));
    assert!(!registry.check_block(1_000, &Hash([0xff; 32])));
    assert!(registry.check_block(1_001, &Hash([0xff; 32])));
}

#[test]
fn test_scenario_estimate_and_heights() {
    let registry = scenario_registry();
    assert_eq!(registry.total_blocks_estimate(), 5_000);
    assert_eq!(registry.checkpoint_heights_after(999), vec![1_000, 5_000]);
    assert_eq!(registry.checkpoint_heights_after(5_000), Vec::<u32>::new());
}

#[test]
fn test_scenario_last_local_checkpoint() {
    let registry = scenario_registry();
    let mut index = HashMap::new();
    index.insert(H0, node(H0, 0));
    index.insert(H1000, node(H1000, 1_000));

    assert_eq!(registry.last_local_checkpoint(&index).unwrap().height, 1_000);

    registry.set_enabled(false);
    assert!(registry.last_local_checkpoint(&index).is_none());
    assert!(registry.check_block(1_000, &Hash([0xff; 32])));
}

#[test]
fn test_scenario_add_checkpoint() {
    let registry = scenario_registry();
    assert_eq!(registry.add_checkpoint(7_000, Hash([0xa7; 32])), Ok(AddOutcome::Added));
    assert_eq!(registry.add_checkpoint(7_000, Hash([0xa7; 32])), Ok(AddOutcome::AlreadyPresent));
    assert!(registry.add_checkpoint(7_000, Hash([0xa8; 32])).is_err());
    assert_eq!(registry.get(7_000), Some(Hash([0xa7; 32])));
    assert_eq!(registry.total_blocks_estimate(), 7_000);
}

#[test]
fn test_compiled_in_datasets_pin_genesis() {
    for network in Network::ALL {
        let registry = CheckpointRegistry::new(network);
        assert!(registry.check_block(0, &network.params().genesis_hash));
        assert!(!registry.check_block(0, &Hash([0xee; 32])));
        assert_eq!(registry.total_blocks_estimate(), 0);
    }
}

// ============================================================================
// ADVERSARIAL TESTS
// ============================================================================

fn child(parent: &Hash, nonce: u32) -> BlockHeader {
    BlockHeader::new(1, *parent, Hash::zero(), REGTEST_PARAMS.genesis_time + nonce, 0x207fffff, nonce)
}

/// Test: Deep reorganization attack
///
/// An attacker publishes a longer chain forking below a checkpoint. Every
/// block of the fork at or below the checkpoint height must be refused.
#[test]
fn test_deep_reorg_below_checkpoint_rejected() {
    let registry = CheckpointRegistry::new(Network::Regtest);
    let mut index = ChainIndex::new(&REGTEST_PARAMS);

    let mut honest = vec![REGTEST_PARAMS.genesis_hash];
    for i in 0..10 {
        let header = child(honest.last().unwrap(), i);
        honest.push(index.accept_header(&header, 1, &registry).unwrap().hash);
    }
    registry.add_checkpoint(8, honest[8]).unwrap();

    // Fork from height 3
    let fork = child(&honest[3], 10_000);
    let err = index.accept_header(&fork, 1, &registry).unwrap_err();
    assert_eq!(
        err,
        ValidationError::ForkBelowCheckpoint {
            height: 4,
            checkpoint_height: 8,
        }
    );
    assert_eq!(index.height(), 10);
    assert_eq!(index.tip().hash, honest[10]);
}

/// Test: Side branch outgrowing a learned checkpoint
///
/// A branch forked off below height 3 is indexed before a checkpoint at
/// height 3 is learned. Extending that branch past the checkpoint must be
/// refused, and the active chain must keep the checkpointed block.
#[test]
fn test_side_branch_past_learned_checkpoint_rejected() {
    let registry = CheckpointRegistry::new(Network::Regtest);
    let db = CheckpointDB::temporary().unwrap();
    let mut index = ChainIndex::new(&REGTEST_PARAMS);

    let mut honest = vec![REGTEST_PARAMS.genesis_hash];
    for i in 0..5 {
        let header = child(honest.last().unwrap(), i);
        honest.push(index.accept_header(&header, 1, &registry).unwrap().hash);
    }

    let mut branch_tip = honest[1];
    for i in 0..4 {
        let header = child(&branch_tip, 20_000 + i);
        branch_tip = index.accept_header(&header, 1, &registry).unwrap().hash;
    }
    assert_eq!(index.get(&branch_tip).unwrap().height, 5);

    learn_checkpoint(&registry, &db, 3, honest[3]).unwrap();

    let err = index.accept_header(&child(&branch_tip, 30_000), 1, &registry).unwrap_err();
    assert_eq!(
        err,
        ValidationError::ForkBelowCheckpoint {
            height: 6,
            checkpoint_height: 3,
        }
    );
    assert_eq!(index.tip().hash, honest[5]);
    assert_eq!(index.active_at(3), Some(honest[3]));
    assert!(registry.check_block(3, &index.active_at(3).unwrap()));
}

/// Test: Block replacing a checkpoint
///
/// A competing block at a checkpointed height is refused even when nothing
/// above the checkpoint is known yet.
#[test]
fn test_block_at_checkpoint_height_with_wrong_hash() {
    let registry = CheckpointRegistry::new(Network::Regtest);
    registry.add_checkpoint(1, Hash([0x11; 32])).unwrap();

    let mut index = ChainIndex::new(&REGTEST_PARAMS);
    let header = child(&REGTEST_PARAMS.genesis_hash, 0);
    let err = index.accept_header(&header, 1, &registry).unwrap_err();

    assert!(matches!(err, ValidationError::CheckpointMismatch { height: 1, .. }));
    assert_eq!(index.len(), 1);
}

/// Test: Rewriting a learned checkpoint
///
/// A peer proposing a second hash for a learned checkpoint is refused, and
/// neither the registry nor the store change.
#[test]
fn test_checkpoint_rewrite_refused() {
    let db = CheckpointDB::temporary().unwrap();
    let registry = CheckpointRegistry::new(Network::Test);

    learn_checkpoint(&registry, &db, 2_000, Hash([1; 32])).unwrap();
    let err = learn_checkpoint(&registry, &db, 2_000, Hash([2; 32])).unwrap_err();

    assert!(matches!(err, StorageError::Checkpoint(CheckpointError::Conflict { height: 2_000, .. })));
    assert_eq!(registry.get(2_000), Some(Hash([1; 32])));
    assert_eq!(db.get_checkpoint(2_000).unwrap(), Some(Hash([1; 32])));
}

/// Test: Poisoned checkpoint database
///
/// A stored entry contradicting the compiled-in genesis must surface as a
/// conflict instead of replacing the genesis checkpoint.
#[test]
fn test_poisoned_store_cannot_replace_genesis() {
    let db = CheckpointDB::temporary().unwrap();
    db.save_checkpoint(0, &Hash([0xbd; 32])).unwrap();

    let registry = CheckpointRegistry::new(Network::Main);
    let err = db.load_into(&registry).unwrap_err();

    assert!(matches!(err, StorageError::Checkpoint(_)));
    assert!(registry.check_block(0, &Network::Main.params().genesis_hash));
}

/// Test: Racing proposals
///
/// Many threads propose different hashes for the same height. Exactly one
/// wins and every other proposal reports a conflict with the winner.
#[test]
fn test_concurrent_proposals_single_winner() {
    let registry = Arc::new(CheckpointRegistry::new(Network::Regtest));

    let handles: Vec<_> = (1..=16u8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.add_checkpoint(500, Hash([i; 32])))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);

    let stored = registry.get(500).unwrap();
    for result in results.iter().filter_map(|r| r.as_ref().err()) {
        let CheckpointError::Conflict { existing, .. } = result;
        assert_eq!(*existing, stored);
    }
}
