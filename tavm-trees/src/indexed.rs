//! Indexed-tree container: sorted linked leaves with low-leaf witnessing.
//!
//! Each indexed tree (nullifiers, public data) wraps an ephemeral append
//! tree plus local preimage tracking. An insertion walks to the low leaf
//! (largest key strictly below the new one), rewrites its pointer fields in
//! place, then appends the new leaf. Witnesses `(index, preimage,
//! sibling_path)` must be identical whether the prior insertions happened
//! here or directly against the committed store, because downstream proving
//! re-derives them independently.

use crate::append::EphemeralAppendTree;
use crate::error::{TreeError, TreeResult};
use crate::store::{IndexedLeaf, TreeId, TreeStore};
use std::collections::{BTreeMap, HashMap};
use tavm_spec::Fr;
use tracing::debug;

/// A membership (or non-membership via low leaf) witness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafWitness {
    pub index: u64,
    pub preimage: IndexedLeaf,
    pub sibling_path: Vec<Fr>,
}

/// Outcome of an indexed insertion or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionResult {
    /// The low leaf as witnessed before any modification. For an in-place
    /// public-data update this is the updated leaf itself.
    pub low: LeafWitness,
    /// The appended leaf's witness, taken after the append. `None` for an
    /// in-place update.
    pub appended: Option<LeafWitness>,
}

/// Low-leaf search result before any mutation.
struct LowLeaf {
    index: u64,
    preimage: IndexedLeaf,
    already_present: bool,
}

/// One indexed tree: the merkle structure plus local linked-list state.
#[derive(Clone)]
struct IndexedState {
    tree: EphemeralAppendTree,
    /// Preimages created or rewritten since the fork, by leaf index.
    preimages: HashMap<u64, IndexedLeaf>,
    /// Keys touched since the fork, for low-leaf candidate search.
    keys: BTreeMap<Fr, u64>,
}

impl IndexedState {
    fn fork<S: TreeStore>(store: &S, id: TreeId) -> TreeResult<Self> {
        Ok(IndexedState {
            tree: EphemeralAppendTree::fork(store, id)?,
            preimages: HashMap::new(),
            keys: BTreeMap::new(),
        })
    }
}

/// Preimage of a leaf, preferring local rewrites over the committed store.
fn preimage_at<S: TreeStore>(
    store: &S,
    state: &IndexedState,
    id: TreeId,
    index: u64,
) -> TreeResult<IndexedLeaf> {
    if let Some(local) = state.preimages.get(&index) {
        return Ok(local.clone());
    }
    store.get_leaf_preimage(id, index)
}

/// Locate the low leaf for `key`: the leaf with the largest key `<= key`,
/// walked along `next` pointers until the sandwich condition holds.
fn find_low_leaf<S: TreeStore>(
    store: &S,
    state: &IndexedState,
    id: TreeId,
    key: &Fr,
) -> TreeResult<LowLeaf> {
    let committed = store.get_previous_value_index(id, key)?;
    let local = state.keys.range(..=key.clone()).next_back();

    let mut index = match (committed, local) {
        (Some(c), Some((local_key, &local_index))) => {
            let committed_pre = preimage_at(store, state, id, c.index)?;
            if &committed_pre.key >= local_key {
                c.index
            } else {
                local_index
            }
        }
        (Some(c), None) => c.index,
        (None, Some((_, &local_index))) => local_index,
        (None, None) => {
            return Err(TreeError::LowLeafNotFound {
                tree: id,
                key: key.clone(),
            })
        }
    };

    // Chain keys strictly increase, so this terminates.
    loop {
        let preimage = preimage_at(store, state, id, index)?;
        if &preimage.key == key {
            return Ok(LowLeaf {
                index,
                preimage,
                already_present: true,
            });
        }
        let is_low =
            &preimage.key < key && (preimage.next_key.is_zero() || &preimage.next_key > key);
        if is_low {
            return Ok(LowLeaf {
                index,
                preimage,
                already_present: false,
            });
        }
        index = preimage.next_index;
    }
}

/// Insert `(key, value)`; rewrites the low leaf and appends. The low witness
/// is taken before any mutation (it doubles as the non-membership proof).
fn insert<S: TreeStore>(
    store: &S,
    state: &mut IndexedState,
    id: TreeId,
    key: &Fr,
    value: &Fr,
    low: LowLeaf,
) -> TreeResult<InsertionResult> {
    let low_witness = LeafWitness {
        index: low.index,
        preimage: low.preimage.clone(),
        sibling_path: state.tree.sibling_path(store, low.index)?,
    };

    let new_index = state.tree.leaf_count();
    let new_leaf = IndexedLeaf {
        key: key.clone(),
        value: value.clone(),
        next_key: low.preimage.next_key.clone(),
        next_index: low.preimage.next_index,
    };
    let mut rewritten = low.preimage;
    rewritten.next_key = key.clone();
    rewritten.next_index = new_index;

    state
        .tree
        .update_leaf(store, low.index, rewritten.hash(id))?;
    state.tree.append_leaf(new_leaf.hash(id))?;
    state.keys.insert(rewritten.key.clone(), low.index);
    state.preimages.insert(low.index, rewritten);
    state.keys.insert(key.clone(), new_index);
    state.preimages.insert(new_index, new_leaf.clone());

    let appended = LeafWitness {
        index: new_index,
        sibling_path: state.tree.sibling_path(store, new_index)?,
        preimage: new_leaf,
    };
    debug!(tree = %id, %key, index = new_index, "indexed insert");
    Ok(InsertionResult {
        low: low_witness,
        appended: Some(appended),
    })
}

/// The ephemeral world-tree container one top-level simulation executes
/// against. Forked from a committed store; mutations never reach the store.
pub struct EphemeralTreeContainer<S: TreeStore> {
    store: S,
    note_hash: EphemeralAppendTree,
    nullifier: IndexedState,
    public_data: IndexedState,
}

/// Clonable ephemeral state, for nested-call fork discipline: snapshot
/// before the child runs, restore if it reverts.
#[derive(Clone)]
pub struct ContainerSnapshot {
    note_hash: EphemeralAppendTree,
    nullifier: IndexedState,
    public_data: IndexedState,
}

impl<S: TreeStore> EphemeralTreeContainer<S> {
    pub fn fork(store: S) -> TreeResult<Self> {
        let note_hash = EphemeralAppendTree::fork(&store, TreeId::NoteHash)?;
        let nullifier = IndexedState::fork(&store, TreeId::Nullifier)?;
        let public_data = IndexedState::fork(&store, TreeId::PublicData)?;
        Ok(EphemeralTreeContainer {
            store,
            note_hash,
            nullifier,
            public_data,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn snapshot(&self) -> ContainerSnapshot {
        ContainerSnapshot {
            note_hash: self.note_hash.clone(),
            nullifier: self.nullifier.clone(),
            public_data: self.public_data.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: ContainerSnapshot) {
        self.note_hash = snapshot.note_hash;
        self.nullifier = snapshot.nullifier;
        self.public_data = snapshot.public_data;
    }

    pub fn root(&self, id: TreeId) -> Fr {
        match id {
            TreeId::NoteHash => self.note_hash.root(),
            TreeId::Nullifier => self.nullifier.tree.root(),
            TreeId::PublicData => self.public_data.tree.root(),
        }
    }

    pub fn append_note_hash(&mut self, value: Fr) -> TreeResult<u64> {
        self.note_hash.append_leaf(value)
    }

    /// Read a public storage slot. `None` when the slot was never written,
    /// committed or ephemerally.
    pub fn read_public_storage(&self, slot: &Fr) -> TreeResult<Option<Fr>> {
        let low = find_low_leaf(&self.store, &self.public_data, TreeId::PublicData, slot)?;
        Ok(low.already_present.then(|| low.preimage.value))
    }

    /// Write a public storage slot: update in place when the slot already
    /// has a leaf, otherwise a full low-leaf insertion.
    pub fn write_public_storage(&mut self, slot: &Fr, value: &Fr) -> TreeResult<InsertionResult> {
        let id = TreeId::PublicData;
        let low = find_low_leaf(&self.store, &self.public_data, id, slot)?;
        if low.already_present {
            let mut updated = low.preimage;
            updated.value = value.clone();
            self.public_data
                .tree
                .update_leaf(&self.store, low.index, updated.hash(id))?;
            self.public_data.keys.insert(slot.clone(), low.index);
            self.public_data.preimages.insert(low.index, updated.clone());
            let witness = LeafWitness {
                index: low.index,
                sibling_path: self.public_data.tree.sibling_path(&self.store, low.index)?,
                preimage: updated,
            };
            debug!(%slot, index = low.index, "public storage update in place");
            return Ok(InsertionResult {
                low: witness,
                appended: None,
            });
        }
        insert(&self.store, &mut self.public_data, id, slot, value, low)
    }

    /// Whether a nullifier is present, committed or ephemerally.
    pub fn nullifier_exists(&self, key: &Fr) -> TreeResult<bool> {
        let low = find_low_leaf(&self.store, &self.nullifier, TreeId::Nullifier, key)?;
        Ok(low.already_present)
    }

    /// Insert a nullifier; a duplicate is a collision error.
    pub fn append_nullifier(&mut self, key: &Fr) -> TreeResult<InsertionResult> {
        let id = TreeId::Nullifier;
        let low = find_low_leaf(&self.store, &self.nullifier, id, key)?;
        if low.already_present {
            return Err(TreeError::NullifierCollision(key.clone()));
        }
        insert(&self.store, &mut self.nullifier, id, key, &Fr::zero(), low)
    }

    /// Low-leaf witness for a key, without mutating. Serves non-membership
    /// proofs for downstream proving.
    pub fn low_leaf_witness(&self, id: TreeId, key: &Fr) -> TreeResult<LeafWitness> {
        let state = match id {
            TreeId::Nullifier => &self.nullifier,
            TreeId::PublicData => &self.public_data,
            TreeId::NoteHash => {
                return Err(TreeError::UnknownTree(id));
            }
        };
        let low = find_low_leaf(&self.store, state, id, key)?;
        Ok(LeafWitness {
            index: low.index,
            sibling_path: state.tree.sibling_path(&self.store, low.index)?,
            preimage: low.preimage,
        })
    }
}
