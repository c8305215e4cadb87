//! Append-only merkle tree with frontier tracking, forked from a committed
//! store.
//!
//! The frontier is the minimal set of right-most partial-subtree hashes
//! needed to compute the next insertion path without rehashing the tree.
//! Every node recomputed during an append or update is cached, so a sibling
//! path blends three sources: the local node cache (anything touched
//! ephemerally), the committed store's path (anything committed before the
//! fork), and zero-subtree hashes (anything beyond the data).

use crate::error::{TreeError, TreeResult};
use crate::hash::{hash_pair, ZeroHashes};
use crate::store::{TreeId, TreeStore};
use std::collections::HashMap;
use tavm_spec::Fr;
use tracing::debug;

#[derive(Clone)]
pub struct EphemeralAppendTree {
    tree_id: TreeId,
    height: u32,
    zero: ZeroHashes,
    /// Total leaves: committed at fork time plus ephemeral appends.
    leaf_count: u64,
    /// `frontier[l]` is the left sibling at level `l` of the next insertion
    /// path, valid whenever bit `l` of `leaf_count` is set.
    frontier: Vec<Fr>,
    /// Every node recomputed since the fork, keyed by `(level, node_index)`.
    nodes: HashMap<(u32, u64), Fr>,
}

impl EphemeralAppendTree {
    /// Fork from the committed store at its current size. The frontier is
    /// initialized from the committed sibling path of the next free index.
    pub fn fork<S: TreeStore>(store: &S, tree_id: TreeId) -> TreeResult<Self> {
        let height = store.height(tree_id);
        let leaf_count = store.get_tree_size(tree_id);
        let path = store.get_sibling_path(tree_id, leaf_count)?;
        let zero = ZeroHashes::new(height);
        let mut frontier = vec![Fr::zero(); height as usize];
        for level in 0..height as usize {
            if (leaf_count >> level) & 1 == 1 {
                frontier[level] = path[level].clone();
            }
        }
        debug!(%tree_id, leaf_count, height, "forked append tree");
        Ok(EphemeralAppendTree {
            tree_id,
            height,
            zero,
            leaf_count,
            frontier,
            nodes: HashMap::new(),
        })
    }

    pub fn tree_id(&self) -> TreeId {
        self.tree_id
    }

    pub fn leaf_count(&self) -> u64 {
        self.leaf_count
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Append a leaf at the next free index, updating the frontier bottom-up.
    /// Returns the leaf's index.
    pub fn append_leaf(&mut self, value: Fr) -> TreeResult<u64> {
        let index = self.leaf_count;
        if index >= 1u64 << self.height {
            return Err(TreeError::TreeFull {
                tree: self.tree_id,
                height: self.height,
            });
        }
        let mut current = value;
        self.nodes.insert((0, index), current.clone());
        for level in 0..self.height {
            if (index >> level) & 1 == 1 {
                current = hash_pair(&self.frontier[level as usize], &current);
            } else {
                // Left child: becomes the frontier at this level; pad with
                // the zero subtree to keep ancestors current.
                self.frontier[level as usize] = current.clone();
                current = hash_pair(&current, self.zero.at(level));
            }
            self.nodes.insert((level + 1, index >> (level + 1)), current.clone());
        }
        self.leaf_count += 1;
        debug!(tree = %self.tree_id, index, "appended leaf");
        Ok(index)
    }

    /// Rewrite an existing leaf in place and rehash its path to the root.
    ///
    /// Needed by the indexed container, which must rewrite a low leaf's
    /// pointer fields after an insertion.
    pub fn update_leaf<S: TreeStore>(
        &mut self,
        store: &S,
        index: u64,
        value: Fr,
    ) -> TreeResult<()> {
        if index >= self.leaf_count {
            return Err(TreeError::LeafIndexOutOfBounds {
                tree: self.tree_id,
                index,
                size: self.leaf_count,
            });
        }
        let committed = store.get_sibling_path(self.tree_id, index)?;
        let mut current = value;
        self.nodes.insert((0, index), current.clone());
        for level in 0..self.height {
            let sibling_index = (index >> level) ^ 1;
            let sibling = self
                .nodes
                .get(&(level, sibling_index))
                .cloned()
                .unwrap_or_else(|| committed[level as usize].clone());
            current = if (index >> level) & 1 == 0 {
                hash_pair(&current, &sibling)
            } else {
                hash_pair(&sibling, &current)
            };
            self.nodes.insert((level + 1, index >> (level + 1)), current.clone());
        }
        // Refresh any frontier entry the rewrite went through.
        for level in 0..self.height as usize {
            if (self.leaf_count >> level) & 1 == 1 {
                let frontier_index = (self.leaf_count >> level) - 1;
                if let Some(node) = self.nodes.get(&(level as u32, frontier_index)) {
                    self.frontier[level] = node.clone();
                }
            }
        }
        Ok(())
    }

    /// Current root: fold the frontier against zero-subtree hashes.
    pub fn root(&self) -> Fr {
        let mut acc = self.zero.at(0).clone();
        for level in 0..self.height {
            acc = if (self.leaf_count >> level) & 1 == 1 {
                hash_pair(&self.frontier[level as usize], &acc)
            } else {
                hash_pair(&acc, self.zero.at(level))
            };
        }
        acc
    }

    /// Sibling path for `index`, blending local nodes with the committed
    /// store's path. Agrees byte for byte with a from-scratch recomputation
    /// over the same leaves.
    pub fn sibling_path<S: TreeStore>(&self, store: &S, index: u64) -> TreeResult<Vec<Fr>> {
        if index >= 1u64 << self.height {
            return Err(TreeError::LeafIndexOutOfBounds {
                tree: self.tree_id,
                index,
                size: 1u64 << self.height,
            });
        }
        let committed = store.get_sibling_path(self.tree_id, index)?;
        let mut path = Vec::with_capacity(self.height as usize);
        for level in 0..self.height {
            let sibling_index = (index >> level) ^ 1;
            let node = self
                .nodes
                .get(&(level, sibling_index))
                .cloned()
                .unwrap_or_else(|| committed[level as usize].clone());
            path.push(node);
        }
        Ok(path)
    }

    /// A leaf value, if it was appended or rewritten since the fork.
    pub fn get_local_leaf(&self, index: u64) -> Option<&Fr> {
        self.nodes.get(&(0, index))
    }
}
