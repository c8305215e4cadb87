//! Tree-layer error types.

use crate::store::TreeId;
use tavm_spec::Fr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// Leaf index beyond the tree's current size
    #[error("Leaf index {index} out of range for {tree} tree of size {size}")]
    LeafIndexOutOfBounds {
        tree: TreeId,
        index: u64,
        size: u64,
    },

    /// Tree is full: appending would exceed 2^height leaves
    #[error("{tree} tree of height {height} is full")]
    TreeFull { tree: TreeId, height: u32 },

    /// Nullifier already present in the tree
    #[error("Nullifier {0} already exists")]
    NullifierCollision(Fr),

    /// No low leaf found for the key (tree not seeded with the zero leaf)
    #[error("No low leaf found in {tree} tree for key {key}")]
    LowLeafNotFound { tree: TreeId, key: Fr },

    /// Operation on a tree id the store does not track
    #[error("Unknown tree: {0}")]
    UnknownTree(TreeId),
}

pub type TreeResult<T> = Result<T, TreeError>;
