//! Deterministic weighted permutation.
//!
//! Version 1 of the algorithm, which every node must implement bit for bit:
//!
//! 1. Lay the weights out as an implicit binary tree (children of `i` at
//!    `2i+1` and `2i+2`); every node stores its own weight and the total
//!    weight of each subtree.
//! 2. Draw 32-bit big-endian words from the 32-byte seed, in order. When all
//!    eight words are used, replace the seed with `sha256(seed)`.
//! 3. To pick one element, start at the root with `r = word % total`:
//!    select the node if `r < own`, else descend left if
//!    `r < own + left`, else descend right. Drawn weight is removed from
//!    the node and from every ancestor's subtree total.
//!
//! Transaction turns seed it with `sha256(sender || be_u64(nonce / nonces)
//! || be_u32(epoch))`, see [`turn_seed`](super::turn::turn_seed).

use sha2::{Digest, Sha256};
use shared_types::{Hash, Weight};
use thiserror::Error;

/// Invalid permutation input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermutationError {
    /// Every weight must be positive.
    #[error("weight at index {0} is zero")]
    ZeroWeight(usize),

    /// More elements requested than exist.
    #[error("permutation size {size} exceeds {available} weights")]
    SizeTooLarge {
        /// Requested size
        size: usize,
        /// Available weights
        available: usize,
    },
}

#[derive(Clone, Copy, Default)]
struct Node {
    own: u64,
    left: u64,
    right: u64,
}

struct ShuffleTree<'a> {
    weights: &'a [Weight],
    nodes: Vec<Node>,
    seed: Hash,
    seed_index: usize,
}

impl<'a> ShuffleTree<'a> {
    fn build(&mut self, i: usize) -> u64 {
        if i >= self.weights.len() {
            return 0;
        }
        let own = u64::from(self.weights[i]);
        let left = self.build(2 * i + 1);
        let right = self.build(2 * i + 2);
        self.nodes[i] = Node { own, left, right };
        own + left + right
    }

    fn rand32(&mut self) -> u32 {
        if self.seed_index == 32 {
            self.seed = Sha256::digest(self.seed).into();
            self.seed_index = 0;
        }
        let i = self.seed_index;
        let word = u32::from_be_bytes([
            self.seed[i],
            self.seed[i + 1],
            self.seed[i + 2],
            self.seed[i + 3],
        ]);
        self.seed_index += 4;
        word
    }

    fn retrieve(&mut self, i: usize) -> usize {
        let node = self.nodes[i];
        let total = node.own + node.left + node.right;
        let r = u64::from(self.rand32()) % total;
        if r < node.own {
            self.nodes[i].own = 0;
            i
        } else if r < node.own + node.left {
            let chosen = self.retrieve(2 * i + 1);
            self.nodes[i].left -= u64::from(self.weights[chosen]);
            chosen
        } else {
            let chosen = self.retrieve(2 * i + 2);
            self.nodes[i].right -= u64::from(self.weights[chosen]);
            chosen
        }
    }
}

/// The first `size` elements of a stake-weighted random permutation of
/// `0..weights.len()`, driven by `seed`.
pub fn weighted_permutation(
    size: usize,
    weights: &[Weight],
    seed: Hash,
) -> Result<Vec<usize>, PermutationError> {
    if size > weights.len() {
        return Err(PermutationError::SizeTooLarge {
            size,
            available: weights.len(),
        });
    }
    if let Some(i) = weights.iter().position(|w| *w == 0) {
        return Err(PermutationError::ZeroWeight(i));
    }
    if weights.is_empty() {
        return Ok(Vec::new());
    }

    let mut tree = ShuffleTree {
        weights,
        nodes: vec![Node::default(); weights.len()],
        seed,
        seed_index: 0,
    };
    tree.build(0);
    Ok((0..size).map(|_| tree.retrieve(0)).collect())
}
