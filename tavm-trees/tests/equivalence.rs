//! Witness-equivalence tests: ephemeral trees must agree byte for byte with
//! from-scratch computation against the committed store.

use proptest::prelude::*;
use tavm_spec::Fr;
use tavm_trees::{
    EphemeralAppendTree, EphemeralTreeContainer, MemoryTreeStore, TreeId, TreeStore,
};

const HEIGHT: u32 = 6;

#[test]
fn append_only_equivalence_across_frontier_levels() {
    // Fork at 3 committed leaves, then append 9 more ephemerally: leaf count
    // crosses 4 and 8, exercising several frontier levels.
    let committed: Vec<Fr> = (1..=3u64).map(Fr::from_u64).collect();
    let appended: Vec<Fr> = (100..109u64).map(Fr::from_u64).collect();

    let mut store = MemoryTreeStore::new(HEIGHT);
    store.append_leaves(TreeId::NoteHash, &committed).unwrap();
    let mut tree = EphemeralAppendTree::fork(&store, TreeId::NoteHash).unwrap();
    for leaf in &appended {
        tree.append_leaf(leaf.clone()).unwrap();
    }

    let mut reference = MemoryTreeStore::new(HEIGHT);
    reference.append_leaves(TreeId::NoteHash, &committed).unwrap();
    reference.append_leaves(TreeId::NoteHash, &appended).unwrap();

    assert_eq!(tree.root(), reference.root(TreeId::NoteHash));
    for index in 0..(committed.len() + appended.len()) as u64 {
        assert_eq!(
            tree.sibling_path(&store, index).unwrap(),
            reference.get_sibling_path(TreeId::NoteHash, index).unwrap(),
            "sibling path diverges at leaf {index}"
        );
    }
}

#[test]
fn indexed_witness_equivalence() {
    let committed_keys: Vec<Fr> = [40u64, 15].map(Fr::from_u64).to_vec();
    let ephemeral_keys: Vec<Fr> = [70u64, 25, 90, 55].map(Fr::from_u64).to_vec();

    // Committed prefix, then ephemeral insertions through the container.
    let mut store = MemoryTreeStore::new(HEIGHT);
    for key in &committed_keys {
        store
            .insert_indexed(TreeId::Nullifier, key, &Fr::zero())
            .unwrap();
    }
    let mut container = EphemeralTreeContainer::fork(store).unwrap();
    for key in &ephemeral_keys {
        container.append_nullifier(key).unwrap();
    }

    // Everything inserted directly into a committed store.
    let mut reference = MemoryTreeStore::new(HEIGHT);
    for key in committed_keys.iter().chain(&ephemeral_keys) {
        reference
            .insert_indexed(TreeId::Nullifier, key, &Fr::zero())
            .unwrap();
    }

    assert_eq!(
        container.root(TreeId::Nullifier),
        reference.root(TreeId::Nullifier)
    );

    // Low-leaf witness for an unseen key: identical (index, preimage, path).
    for probe in [10u64, 33, 60, 100].map(Fr::from_u64) {
        let witness = container
            .low_leaf_witness(TreeId::Nullifier, &probe)
            .unwrap();
        let low = reference
            .get_previous_value_index(TreeId::Nullifier, &probe)
            .unwrap()
            .unwrap();
        assert_eq!(witness.index, low.index);
        assert_eq!(
            witness.preimage,
            reference
                .get_leaf_preimage(TreeId::Nullifier, low.index)
                .unwrap()
        );
        assert_eq!(
            witness.sibling_path,
            reference
                .get_sibling_path(TreeId::Nullifier, low.index)
                .unwrap()
        );
    }
}

#[test]
fn public_data_update_equivalence() {
    let slot = Fr::from_u64(1000);

    let mut container = EphemeralTreeContainer::fork(MemoryTreeStore::new(HEIGHT)).unwrap();
    container
        .write_public_storage(&slot, &Fr::from_u64(1))
        .unwrap();
    container
        .write_public_storage(&slot, &Fr::from_u64(129))
        .unwrap();

    let mut reference = MemoryTreeStore::new(HEIGHT);
    reference
        .insert_indexed(TreeId::PublicData, &slot, &Fr::from_u64(1))
        .unwrap();
    reference
        .insert_indexed(TreeId::PublicData, &slot, &Fr::from_u64(129))
        .unwrap();

    assert_eq!(
        container.root(TreeId::PublicData),
        reference.root(TreeId::PublicData)
    );
    assert_eq!(
        container.read_public_storage(&slot).unwrap(),
        Some(Fr::from_u64(129))
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Any committed/ephemeral split of the same leaves gives the same root
    // and the same sibling paths.
    #[test]
    fn prop_fork_point_is_invisible(
        leaves in prop::collection::vec(1u64..u64::MAX, 1..24),
        split in 0usize..24,
    ) {
        let split = split.min(leaves.len());
        let leaves: Vec<Fr> = leaves.into_iter().map(Fr::from_u64).collect();

        let mut store = MemoryTreeStore::new(HEIGHT);
        store.append_leaves(TreeId::NoteHash, &leaves[..split]).unwrap();
        let mut tree = EphemeralAppendTree::fork(&store, TreeId::NoteHash).unwrap();
        for leaf in &leaves[split..] {
            tree.append_leaf(leaf.clone()).unwrap();
        }

        let mut reference = MemoryTreeStore::new(HEIGHT);
        reference.append_leaves(TreeId::NoteHash, &leaves).unwrap();

        prop_assert_eq!(tree.root(), reference.root(TreeId::NoteHash));
        for index in 0..leaves.len() as u64 {
            prop_assert_eq!(
                tree.sibling_path(&store, index).unwrap(),
                reference.get_sibling_path(TreeId::NoteHash, index).unwrap()
            );
        }
    }

    // Nullifier insertion order within the fork does not change the root.
    #[test]
    fn prop_indexed_root_matches_direct_insertion(
        keys in prop::collection::hash_set(1u64..100_000, 1..12),
    ) {
        let keys: Vec<Fr> = keys.into_iter().map(Fr::from_u64).collect();

        let mut container =
            EphemeralTreeContainer::fork(MemoryTreeStore::new(HEIGHT)).unwrap();
        for key in &keys {
            container.append_nullifier(key).unwrap();
        }

        let mut reference = MemoryTreeStore::new(HEIGHT);
        for key in &keys {
            reference.insert_indexed(TreeId::Nullifier, key, &Fr::zero()).unwrap();
        }

        prop_assert_eq!(
            container.root(TreeId::Nullifier),
            reference.root(TreeId::Nullifier)
        );
    }
}
