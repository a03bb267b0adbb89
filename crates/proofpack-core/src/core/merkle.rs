// crates/proofpack-core/src/core/merkle.rs
// ============================================================================
// Module: Proof-Pack Merkle Tree
// Description: Binary Merkle tree over artifact hashes with inclusion paths.
// Purpose: Commit to an ordered artifact set with a single root hash.
// Dependencies: crate::core::hashing, serde
// ============================================================================

//! ## Overview
//! The tree is built bottom-up from leaf hashes in the order given. Adjacent
//! nodes combine as `sha256(left_hex + right_hex)`; when a level has an odd
//! number of nodes, its last node is paired with itself. The tree is stored as
//! a flat node list (leaves first, then each level in order) so it can be
//! persisted and re-created exactly.
//!
//! A tree over zero leaves is a single sentinel node whose hash is
//! `sha256("EMPTY_MERKLE")`. A single leaf is its own root at depth 0.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::HashDigest;
use crate::core::hashing::hash_str;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Seed hashed to produce the empty-tree root.
pub const EMPTY_MERKLE_SEED: &str = "EMPTY_MERKLE";

/// Label carried by the empty-tree sentinel node.
pub const EMPTY_NODE_LABEL: &str = "empty";

/// Label prefix carried by leaf nodes.
const LEAF_LABEL_PREFIX: &str = "leaf:";

// ============================================================================
// SECTION: Tree Types
// ============================================================================

/// Single node in a flattened Merkle tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleNode {
    /// Node hash.
    pub hash: HashDigest,
    /// Left child hash (internal nodes only).
    pub left: Option<HashDigest>,
    /// Right child hash (internal nodes only).
    pub right: Option<HashDigest>,
    /// Position label: `leaf:<i>`, `node:<depth>:<i>`, or `empty`.
    pub label: String,
    /// Level in the tree; leaves are depth 0.
    pub depth: u32,
}

impl MerkleNode {
    /// Returns true when this node is a depth-0 leaf (not the empty sentinel).
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.depth == 0
            && self.left.is_none()
            && self.right.is_none()
            && self.label.starts_with(LEAF_LABEL_PREFIX)
    }
}

/// Flattened binary Merkle tree.
///
/// # Invariants
/// - `leaf_count` equals the number of leaf nodes in `nodes`.
/// - `root_hash` is the hash of the single node at the highest depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleTree {
    /// Root hash of the tree.
    pub root_hash: HashDigest,
    /// Every node, leaves first then each level left to right.
    pub nodes: Vec<MerkleNode>,
    /// Number of leaves.
    pub leaf_count: usize,
    /// Height of the tree; zero for empty and single-leaf trees.
    pub depth: u32,
}

impl MerkleTree {
    /// Returns the leaf nodes in leaf order.
    pub fn leaves(&self) -> impl Iterator<Item = &MerkleNode> {
        self.nodes.iter().filter(|node| node.is_leaf())
    }

    /// Returns the leaf hashes in leaf order.
    #[must_use]
    pub fn leaf_hashes(&self) -> Vec<HashDigest> {
        self.leaves().map(|node| node.hash.clone()).collect()
    }

    /// Returns true when the tree was built over zero leaves.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }
}

// ============================================================================
// SECTION: Construction
// ============================================================================

/// Returns the root hash of a tree over zero leaves.
#[must_use]
pub fn empty_merkle_root() -> HashDigest {
    hash_str(EMPTY_MERKLE_SEED)
}

/// Combines two child hashes into their parent hash.
#[must_use]
pub fn hash_pair(left: &HashDigest, right: &HashDigest) -> HashDigest {
    let mut joined = String::with_capacity(left.as_str().len() + right.as_str().len());
    joined.push_str(left.as_str());
    joined.push_str(right.as_str());
    hash_str(&joined)
}

/// Builds a Merkle tree over leaf hashes in the given order.
#[must_use]
pub fn build_merkle_tree(leaf_hashes: &[HashDigest]) -> MerkleTree {
    if leaf_hashes.is_empty() {
        let root_hash = empty_merkle_root();
        return MerkleTree {
            root_hash: root_hash.clone(),
            nodes: vec![MerkleNode {
                hash: root_hash,
                left: None,
                right: None,
                label: EMPTY_NODE_LABEL.to_string(),
                depth: 0,
            }],
            leaf_count: 0,
            depth: 0,
        };
    }

    let mut nodes: Vec<MerkleNode> = leaf_hashes
        .iter()
        .enumerate()
        .map(|(index, hash)| MerkleNode {
            hash: hash.clone(),
            left: None,
            right: None,
            label: format!("{LEAF_LABEL_PREFIX}{index}"),
            depth: 0,
        })
        .collect();

    let mut level = leaf_hashes.to_vec();
    let mut depth = 0u32;
    while level.len() > 1 {
        depth = depth.saturating_add(1);
        let next = combine_level(&level);
        for (index, (parent, (left, right))) in next.iter().zip(pairs(&level)).enumerate() {
            nodes.push(MerkleNode {
                hash: parent.clone(),
                left: Some(left.clone()),
                right: Some(right.clone()),
                label: format!("node:{depth}:{index}"),
                depth,
            });
        }
        level = next;
    }

    let root_hash = level.first().cloned().unwrap_or_else(empty_merkle_root);
    MerkleTree {
        root_hash,
        nodes,
        leaf_count: leaf_hashes.len(),
        depth,
    }
}

/// Verifies a tree by rebuilding it from its own leaves.
///
/// The rebuilt tree must match the stored one node for node, which covers the
/// root hash, leaf count, and depth.
#[must_use]
pub fn verify_merkle_tree(tree: &MerkleTree) -> bool {
    let leaves = tree.leaf_hashes();
    if leaves.len() != tree.leaf_count {
        return false;
    }
    build_merkle_tree(&leaves) == *tree
}

// ============================================================================
// SECTION: Inclusion Paths
// ============================================================================

/// Extracts the leaf-to-root path for a leaf.
///
/// Each level contributes the sibling hash followed by the parent hash. A
/// single-leaf tree has no levels above its leaf, so its path is empty. An
/// out-of-range index or an empty tree also yields an empty path.
#[must_use]
pub fn merkle_path(tree: &MerkleTree, leaf_index: usize) -> Vec<HashDigest> {
    if leaf_index >= tree.leaf_count {
        return Vec::new();
    }
    let levels = collect_levels(&tree.leaf_hashes());
    let mut path = Vec::new();
    let mut index = leaf_index;
    for window in levels.windows(2) {
        let [level, parents] = window else {
            return Vec::new();
        };
        let Some(own) = level.get(index) else {
            return Vec::new();
        };
        let sibling = level.get(index ^ 1).unwrap_or(own);
        let Some(parent) = parents.get(index / 2) else {
            return Vec::new();
        };
        path.push(sibling.clone());
        path.push(parent.clone());
        index /= 2;
    }
    path
}

/// Recomputes the root from a leaf and its path and compares it to `root`.
///
/// An empty path proves only leaf 0 of a single-leaf tree, whose root is the
/// leaf itself.
#[must_use]
pub fn verify_merkle_path(
    leaf: &HashDigest,
    leaf_index: usize,
    path: &[HashDigest],
    root: &HashDigest,
) -> bool {
    if path.is_empty() {
        return leaf_index == 0 && leaf == root;
    }
    if path.len() % 2 != 0 {
        return false;
    }
    let mut current = leaf.clone();
    let mut index = leaf_index;
    for step in path.chunks(2) {
        let [sibling, parent] = step else {
            return false;
        };
        let computed = if index % 2 == 0 {
            hash_pair(&current, sibling)
        } else {
            hash_pair(sibling, &current)
        };
        if computed != *parent {
            return false;
        }
        current = computed;
        index /= 2;
    }
    current == *root
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Pairs adjacent nodes, duplicating the last node of an odd level.
fn pairs(level: &[HashDigest]) -> impl Iterator<Item = (&HashDigest, &HashDigest)> {
    level.chunks(2).filter_map(|chunk| match chunk {
        [left, right] => Some((left, right)),
        [last] => Some((last, last)),
        _ => None,
    })
}

/// Computes the parent level for a level of hashes.
fn combine_level(level: &[HashDigest]) -> Vec<HashDigest> {
    pairs(level).map(|(left, right)| hash_pair(left, right)).collect()
}

/// Returns every level from the leaves up to the root.
fn collect_levels(leaves: &[HashDigest]) -> Vec<Vec<HashDigest>> {
    let mut levels = vec![leaves.to_vec()];
    let mut current = leaves.to_vec();
    while current.len() > 1 {
        current = combine_level(&current);
        levels.push(current.clone());
    }
    levels
}
