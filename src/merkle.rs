//! Merkle commitment over an ordered batch of leaves.
//!
//! - An empty batch yields [`EMPTY_ROOT`].
//! - A single leaf is its own root; no hashing happens.
//! - Odd levels combine the last element with itself.

use crate::digest::digest_pair;
use crate::transaction::Transaction;

/// Root of an empty batch.
pub const EMPTY_ROOT: &str = "";

pub struct MerkleTree;

impl MerkleTree {
    /// Reduces `leaves` pairwise until a single digest remains.
    pub fn build_root<S: AsRef<str>>(leaves: &[S]) -> String {
        if leaves.is_empty() {
            return EMPTY_ROOT.to_string();
        }

        let mut level: Vec<String> = leaves.iter().map(|l| l.as_ref().to_string()).collect();

        while level.len() > 1 {
            level = level
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => digest_pair(left, right),
                    [last] => digest_pair(last, last),
                    _ => unreachable!("chunks(2) yields one or two elements"),
                })
                .collect();
        }

        level.swap_remove(0)
    }

    /// Root over the canonical encodings of `txs`.
    pub fn from_transactions(txs: &[Transaction]) -> String {
        let leaves: Vec<String> = txs.iter().map(Transaction::encode).collect();
        Self::build_root(&leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::digest;

    #[test]
    fn empty_returns_sentinel() {
        let leaves: [&str; 0] = [];
        assert_eq!(MerkleTree::build_root(&leaves), EMPTY_ROOT);
    }

    #[test]
    fn single_leaf_is_root() {
        assert_eq!(MerkleTree::build_root(&["only"]), "only");
    }

    #[test]
    fn even_leaves_match_manual_reduction() {
        let ab = digest("ab");
        let cd = digest("cd");
        let expected = digest(format!("{}{}", ab, cd));
        assert_eq!(MerkleTree::build_root(&["a", "b", "c", "d"]), expected);
    }

    #[test]
    fn odd_leaves_duplicate_last() {
        let left = digest("AB");
        let right = digest("CC");
        let expected = digest(format!("{}{}", left, right));
        assert_eq!(MerkleTree::build_root(&["A", "B", "C"]), expected);
    }

    #[test]
    fn odd_duplication_applies_on_upper_levels() {
        // Five leaves: level 1 has three nodes, so its last node pairs with itself too.
        let l1 = [digest("ab"), digest("cd"), digest("ee")];
        let l2 = [
            digest(format!("{}{}", l1[0], l1[1])),
            digest(format!("{}{}", l1[2], l1[2])),
        ];
        let expected = digest(format!("{}{}", l2[0], l2[1]));
        assert_eq!(MerkleTree::build_root(&["a", "b", "c", "d", "e"]), expected);
    }

    #[test]
    fn root_is_order_sensitive() {
        assert_ne!(
            MerkleTree::build_root(&["A", "B"]),
            MerkleTree::build_root(&["B", "A"])
        );
    }

    #[test]
    fn from_transactions_uses_canonical_encoding() {
        let txs = vec![
            Transaction::new("1", "Alice", "Bob", 10.0),
            Transaction::new("2", "Bob", "Charlie", 5.0),
        ];
        let expected = MerkleTree::build_root(&["1:Alice->Bob:10", "2:Bob->Charlie:5"]);
        assert_eq!(MerkleTree::from_transactions(&txs), expected);
    }
}
