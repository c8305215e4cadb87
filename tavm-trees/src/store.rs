//! Committed tree backing store.
//!
//! The ephemeral layer forks from a [`TreeStore`]: an already-committed,
//! read-mostly snapshot of the world trees. The store serves sibling paths,
//! low-leaf candidates, and leaf preimages; `append_leaves` exists so a
//! block-building collaborator can promote ephemeral results once finalized.
//!
//! [`MemoryTreeStore`] is the in-memory reference implementation. It computes
//! every path from scratch on each query, which makes it the ground truth the
//! ephemeral trees' blended paths are tested against.

use crate::error::{TreeError, TreeResult};
use crate::hash::{hash_pair, ZeroHashes};
use std::collections::HashMap;
use std::fmt;
use tavm_spec::Fr;

/// World-tree identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeId {
    /// Append-only note-hash tree.
    NoteHash,
    /// Indexed tree of spent nullifiers.
    Nullifier,
    /// Indexed tree of public storage slots.
    PublicData,
}

impl TreeId {
    pub const ALL: [TreeId; 3] = [TreeId::NoteHash, TreeId::Nullifier, TreeId::PublicData];

    /// Indexed trees carry sorted-linked-list preimages; the note-hash tree
    /// does not.
    pub fn is_indexed(self) -> bool {
        matches!(self, TreeId::Nullifier | TreeId::PublicData)
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TreeId::NoteHash => "note-hash",
            TreeId::Nullifier => "nullifier",
            TreeId::PublicData => "public-data",
        };
        write!(f, "{}", name)
    }
}

/// Preimage of an indexed-tree leaf: a node of the sorted linked structure.
///
/// `next_key == 0` is the sentinel for "no successor". Nullifier leaves keep
/// `value` at zero and exclude it from the leaf hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedLeaf {
    pub key: Fr,
    pub value: Fr,
    pub next_key: Fr,
    pub next_index: u64,
}

impl IndexedLeaf {
    /// The pre-seeded placeholder leaf at index 0.
    pub fn zero() -> Self {
        IndexedLeaf {
            key: Fr::zero(),
            value: Fr::zero(),
            next_key: Fr::zero(),
            next_index: 0,
        }
    }

    /// Hash into the leaf slot of the merkle tree.
    pub fn hash(&self, tree: TreeId) -> Fr {
        let next_index = Fr::from_u64(self.next_index);
        match tree {
            TreeId::PublicData => crate::hash::hash_fields(&[
                self.key.clone(),
                self.value.clone(),
                self.next_key.clone(),
                next_index,
            ]),
            _ => crate::hash::hash_fields(&[self.key.clone(), self.next_key.clone(), next_index]),
        }
    }
}

/// Result of a low-leaf candidate lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousIndex {
    pub index: u64,
    /// True when the queried key is exactly the leaf's key.
    pub already_present: bool,
}

/// The committed backing store interface the ephemeral layer forks from.
///
/// Implementations must serve a sibling path for any index below `2^height`,
/// treating unfilled leaves as zero subtrees.
pub trait TreeStore {
    /// Tree height (same for every query against a given tree).
    fn height(&self, tree: TreeId) -> u32;

    /// Number of committed leaves.
    fn get_tree_size(&self, tree: TreeId) -> u64;

    /// Sibling path for `index`, leaf level first.
    fn get_sibling_path(&self, tree: TreeId, index: u64) -> TreeResult<Vec<Fr>>;

    /// Committed leaf with the largest key `<= key`, if any.
    fn get_previous_value_index(&self, tree: TreeId, key: &Fr) -> TreeResult<Option<PreviousIndex>>;

    /// Preimage of a committed indexed leaf.
    fn get_leaf_preimage(&self, tree: TreeId, index: u64) -> TreeResult<IndexedLeaf>;

    /// Append already-hashed leaves (block finalization path).
    fn append_leaves(&mut self, tree: TreeId, leaves: &[Fr]) -> TreeResult<()>;
}

struct TreeData {
    /// Hashed leaves, dense from index 0.
    leaves: Vec<Fr>,
    /// Indexed-tree preimages, parallel to `leaves`. Empty for NoteHash.
    preimages: Vec<IndexedLeaf>,
}

/// In-memory committed store; the from-scratch reference.
pub struct MemoryTreeStore {
    height: u32,
    zero: ZeroHashes,
    trees: HashMap<TreeId, TreeData>,
}

impl MemoryTreeStore {
    /// Create a store with empty trees. Indexed trees are seeded with the
    /// zero placeholder leaf so every key has a low leaf.
    pub fn new(height: u32) -> Self {
        let mut trees = HashMap::new();
        for id in TreeId::ALL {
            let mut data = TreeData {
                leaves: Vec::new(),
                preimages: Vec::new(),
            };
            if id.is_indexed() {
                let zero_leaf = IndexedLeaf::zero();
                data.leaves.push(zero_leaf.hash(id));
                data.preimages.push(zero_leaf);
            }
            trees.insert(id, data);
        }
        MemoryTreeStore {
            height,
            zero: ZeroHashes::new(height),
            trees,
        }
    }

    fn tree(&self, id: TreeId) -> &TreeData {
        // All three trees exist from construction.
        &self.trees[&id]
    }

    fn tree_mut(&mut self, id: TreeId) -> &mut TreeData {
        self.trees.get_mut(&id).unwrap_or_else(|| unreachable!())
    }

    /// Hash of the internal node at `(level, node_index)`, computed from the
    /// leaves on every call.
    fn node(&self, id: TreeId, level: u32, node_index: u64) -> Fr {
        let data = self.tree(id);
        if level == 0 {
            return data
                .leaves
                .get(node_index as usize)
                .cloned()
                .unwrap_or_else(Fr::zero);
        }
        // Subtree entirely beyond the filled region: zero hash.
        let first_leaf = node_index << level;
        if first_leaf >= data.leaves.len() as u64 {
            return self.zero.at(level).clone();
        }
        let left = self.node(id, level - 1, node_index * 2);
        let right = self.node(id, level - 1, node_index * 2 + 1);
        hash_pair(&left, &right)
    }

    /// Root of a tree, recomputed from scratch.
    pub fn root(&self, id: TreeId) -> Fr {
        self.node(id, self.height, 0)
    }

    /// Insert `(key, value)` into an indexed tree directly: low-leaf walk,
    /// pointer rewrite, append. Returns the new leaf's index, or the existing
    /// index for a public-data update in place.
    pub fn insert_indexed(&mut self, id: TreeId, key: &Fr, value: &Fr) -> TreeResult<u64> {
        debug_assert!(id.is_indexed());
        let low = self
            .get_previous_value_index(id, key)?
            .ok_or_else(|| TreeError::LowLeafNotFound {
                tree: id,
                key: key.clone(),
            })?;
        if low.already_present {
            if id == TreeId::Nullifier {
                return Err(TreeError::NullifierCollision(key.clone()));
            }
            let data = self.tree_mut(id);
            data.preimages[low.index as usize].value = value.clone();
            let hash = data.preimages[low.index as usize].hash(id);
            data.leaves[low.index as usize] = hash;
            return Ok(low.index);
        }
        let new_index = self.tree(id).leaves.len() as u64;
        if new_index >= 1u64 << self.height {
            return Err(TreeError::TreeFull {
                tree: id,
                height: self.height,
            });
        }
        let data = self.tree_mut(id);
        let low_leaf = &mut data.preimages[low.index as usize];
        let new_leaf = IndexedLeaf {
            key: key.clone(),
            value: value.clone(),
            next_key: low_leaf.next_key.clone(),
            next_index: low_leaf.next_index,
        };
        low_leaf.next_key = key.clone();
        low_leaf.next_index = new_index;
        let low_hash = data.preimages[low.index as usize].hash(id);
        data.leaves[low.index as usize] = low_hash;
        data.leaves.push(new_leaf.hash(id));
        data.preimages.push(new_leaf);
        Ok(new_index)
    }
}

impl TreeStore for MemoryTreeStore {
    fn height(&self, _tree: TreeId) -> u32 {
        self.height
    }

    fn get_tree_size(&self, tree: TreeId) -> u64 {
        self.tree(tree).leaves.len() as u64
    }

    fn get_sibling_path(&self, tree: TreeId, index: u64) -> TreeResult<Vec<Fr>> {
        if index >= 1u64 << self.height {
            return Err(TreeError::LeafIndexOutOfBounds {
                tree,
                index,
                size: 1u64 << self.height,
            });
        }
        let mut path = Vec::with_capacity(self.height as usize);
        for level in 0..self.height {
            let sibling = (index >> level) ^ 1;
            path.push(self.node(tree, level, sibling));
        }
        Ok(path)
    }

    fn get_previous_value_index(&self, tree: TreeId, key: &Fr) -> TreeResult<Option<PreviousIndex>> {
        let data = self.tree(tree);
        let mut best: Option<(u64, &Fr)> = None;
        for (i, leaf) in data.preimages.iter().enumerate() {
            if &leaf.key <= key {
                match best {
                    Some((_, best_key)) if best_key >= &leaf.key => {}
                    _ => best = Some((i as u64, &leaf.key)),
                }
            }
        }
        Ok(best.map(|(index, leaf_key)| PreviousIndex {
            index,
            already_present: leaf_key == key,
        }))
    }

    fn get_leaf_preimage(&self, tree: TreeId, index: u64) -> TreeResult<IndexedLeaf> {
        let data = self.tree(tree);
        data.preimages
            .get(index as usize)
            .cloned()
            .ok_or(TreeError::LeafIndexOutOfBounds {
                tree,
                index,
                size: data.preimages.len() as u64,
            })
    }

    fn append_leaves(&mut self, tree: TreeId, leaves: &[Fr]) -> TreeResult<()> {
        let height = self.height;
        let data = self.tree_mut(tree);
        if data.leaves.len() as u64 + leaves.len() as u64 > 1u64 << height {
            return Err(TreeError::TreeFull { tree, height });
        }
        data.leaves.extend_from_slice(leaves);
        Ok(())
    }
}
