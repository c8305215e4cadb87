//! Merkle pair hashing and zero-subtree precomputation.
//!
//! The pair hash is SHA-256 over the two children's canonical 32-byte
//! big-endian encodings, reduced into the scalar field. Every tree in this
//! crate, committed or ephemeral, uses the same function so that sibling
//! paths computed either way agree byte for byte.

use sha2::{Digest, Sha256};
use tavm_spec::Fr;

/// Hash a left/right child pair into a parent node.
pub fn hash_pair(left: &Fr, right: &Fr) -> Fr {
    let mut hasher = Sha256::new();
    hasher.update(left.to_be_bytes());
    hasher.update(right.to_be_bytes());
    Fr::from_be_bytes(&hasher.finalize())
}

/// Hash a slice of fields by left-folding with [`hash_pair`].
///
/// Used for indexed-leaf preimages and key siloing.
pub fn hash_fields(fields: &[Fr]) -> Fr {
    let mut acc = Fr::zero();
    for (i, f) in fields.iter().enumerate() {
        if i == 0 {
            acc = f.clone();
        } else {
            acc = hash_pair(&acc, f);
        }
    }
    acc
}

/// Hashes of all-zero subtrees, one entry per level.
///
/// `hashes[0]` is the empty leaf, `hashes[h]` the root of an empty
/// height-`h` tree.
#[derive(Debug, Clone)]
pub struct ZeroHashes(Vec<Fr>);

impl ZeroHashes {
    pub fn new(height: u32) -> Self {
        let mut hashes = Vec::with_capacity(height as usize + 1);
        hashes.push(Fr::zero());
        for level in 0..height as usize {
            let next = hash_pair(&hashes[level], &hashes[level]);
            hashes.push(next);
        }
        ZeroHashes(hashes)
    }

    #[inline]
    pub fn at(&self, level: u32) -> &Fr {
        &self.0[level as usize]
    }

    #[inline]
    pub fn height(&self) -> u32 {
        (self.0.len() - 1) as u32
    }
}
