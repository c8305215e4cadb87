//! Ephemeral merkle layer backing the TAVM's public storage and nullifier
//! set.
//!
//! Two tree shapes, both forked from a committed [`store::TreeStore`]:
//!
//! - an append-only tree with frontier-based incremental updates
//!   ([`append::EphemeralAppendTree`]);
//! - an indexed tree of sorted linked leaves with low-leaf witnessing
//!   ([`indexed::EphemeralTreeContainer`]).
//!
//! The correctness contract is witness equivalence: roots and sibling paths
//! must be byte-identical to a from-scratch computation against the
//! committed store, because downstream proving re-derives the same values.

pub mod append;
pub mod error;
pub mod hash;
pub mod indexed;
pub mod store;

pub use append::EphemeralAppendTree;
pub use error::{TreeError, TreeResult};
pub use hash::{hash_fields, hash_pair, ZeroHashes};
pub use indexed::{ContainerSnapshot, EphemeralTreeContainer, InsertionResult, LeafWitness};
pub use store::{IndexedLeaf, MemoryTreeStore, PreviousIndex, TreeId, TreeStore};
