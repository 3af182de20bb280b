//! Block index
//!
//! Maps block hashes to their position in the locally known chain. Block
//! acceptance runs every candidate through the checkpoint checks before it
//! is indexed.

use std::collections::HashMap;
use std::hash::BuildHasher;

use serde::Serialize;
use tracing::{debug, info};

use crate::checkpoints::CheckpointRegistry;
use crate::consensus::{validate_checkpoints, BlockHeader, ValidationError};
use crate::crypto::Hash;
use crate::params::NetworkParams;

/// A block's place in the locally known chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChainNode {
    pub hash: Hash,
    pub prev_hash: Hash,
    pub height: u32,
    /// Transactions from genesis up to and including this block
    pub chain_tx: u64,
    /// Block timestamp (seconds since Unix epoch)
    pub time: u32,
}

/// Hash to chain-node resolution
pub trait BlockIndexLookup {
    fn lookup(&self, hash: &Hash) -> Option<&ChainNode>;

    /// The block at `height` on the chain ending at `hash`.
    ///
    /// `None` when the walk leaves the index or heights stop decreasing.
    fn ancestor(&self, hash: &Hash, height: u32) -> Option<&ChainNode> {
        let mut node = self.lookup(hash)?;
        while node.height > height {
            let parent = self.lookup(&node.prev_hash)?;
            if parent.height >= node.height {
                return None;
            }
            node = parent;
        }
        (node.height == height).then_some(node)
    }
}

impl<S: BuildHasher> BlockIndexLookup for HashMap<Hash, ChainNode, S> {
    fn lookup(&self, hash: &Hash) -> Option<&ChainNode> {
        self.get(hash)
    }
}

/// In-memory block index
#[derive(Debug)]
pub struct ChainIndex {
    nodes: HashMap<Hash, ChainNode>,
    /// Active chain by height; the last entry is the tip
    active: Vec<Hash>,
}

impl ChainIndex {
    /// Index holding only the genesis block of the network
    pub fn new(params: &NetworkParams) -> Self {
        let genesis = ChainNode {
            hash: params.genesis_hash,
            prev_hash: Hash::zero(),
            height: 0,
            chain_tx: 1,
            time: params.genesis_time,
        };

        let mut nodes = HashMap::new();
        nodes.insert(genesis.hash, genesis);
        Self {
            nodes,
            active: vec![genesis.hash],
        }
    }

    /// Index a new block on top of a known parent.
    ///
    /// The block is refused when its parent is unknown, when it is already
    /// indexed, when the running transaction count overflows, or when it
    /// fails the checkpoint checks. A block higher than the tip becomes the
    /// new tip.
    pub fn accept_header(
        &mut self,
        header: &BlockHeader,
        tx_count: u64,
        checkpoints: &CheckpointRegistry,
    ) -> Result<&ChainNode, ValidationError> {
        let hash = header.hash();
        if self.nodes.contains_key(&hash) {
            return Err(ValidationError::DuplicateBlock(hash));
        }

        let parent = self
            .nodes
            .get(&header.prev_hash)
            .ok_or(ValidationError::UnknownParent(header.prev_hash))?;
        let height = parent.height + 1;
        let chain_tx = parent
            .chain_tx
            .checked_add(tx_count)
            .ok_or(ValidationError::TxCountOverflow { height })?;

        validate_checkpoints(checkpoints, self, height, &hash, &header.prev_hash)?;

        let node = ChainNode {
            hash,
            prev_hash: header.prev_hash,
            height,
            chain_tx,
            time: header.timestamp,
        };

        self.nodes.insert(hash, node);

        if height > self.height() {
            self.set_tip(node);
            info!(height, %hash, "new tip");
        } else {
            debug!(height, %hash, "indexed side-chain block");
        }

        Ok(&self.nodes[&hash])
    }

    /// Make `node` the tip, rewriting the active chain back to the fork point
    fn set_tip(&mut self, node: ChainNode) {
        let mut branch = vec![node.hash];
        let mut cursor = node.prev_hash;

        while let Some(ancestor) = self.nodes.get(&cursor) {
            if self.is_active(ancestor) {
                break;
            }
            branch.push(ancestor.hash);
            cursor = ancestor.prev_hash;
        }

        let fork_height = node.height as usize + 1 - branch.len();
        if fork_height < self.active.len() {
            debug!(fork_height, depth = self.active.len() - fork_height, "reorganizing active chain");
        }
        self.active.truncate(fork_height);
        self.active.extend(branch.into_iter().rev());
    }

    fn is_active(&self, node: &ChainNode) -> bool {
        self.active.get(node.height as usize) == Some(&node.hash)
    }

    /// Hash of the active-chain block at `height`
    pub fn active_at(&self, height: u32) -> Option<Hash> {
        self.active.get(height as usize).copied()
    }

    /// Tip of the active chain
    pub fn tip(&self) -> &ChainNode {
        &self.nodes[&self.active[self.active.len() - 1]]
    }

    /// Height of the current tip
    pub fn height(&self) -> u32 {
        self.tip().height
    }

    pub fn get(&self, hash: &Hash) -> Option<&ChainNode> {
        self.nodes.get(hash)
    }

    /// Number of indexed blocks
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl BlockIndexLookup for ChainIndex {
    fn lookup(&self, hash: &Hash) -> Option<&ChainNode> {
        self.nodes.get(hash)
    }

    /// Walks back only until the active chain is reached.
    fn ancestor(&self, hash: &Hash, height: u32) -> Option<&ChainNode> {
        let mut node = self.nodes.get(hash)?;
        while node.height > height {
            if self.is_active(node) {
                return self.active_at(height).and_then(|h| self.nodes.get(&h));
            }
            node = self.nodes.get(&node.prev_hash)?;
        }
        (node.height == height).then_some(node)
    }
}
