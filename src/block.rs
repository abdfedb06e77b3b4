use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::digest::has_leading_zeros;
use crate::error::IntegrityViolation;
use crate::merkle::MerkleTree;
use crate::transaction::Transaction;

/// Previous-hash sentinel carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Represents the header of a block.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Position of the block in its chain.
    pub index: u64,
    /// The hash of the parent block.
    pub previous_hash: String,
    /// The Merkle root of the transactions in the block.
    pub merkle_root: String,
}

/// Consensus-specific part of a sealed block.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Seal {
    /// Mined: `nonce` is the smallest value whose digest has `difficulty` leading zeros.
    /// Both fields enter the header digest.
    Work { nonce: u64, difficulty: usize },
    /// Assigned to a validator drawn by stake.
    Stake { validator: String },
}

impl Seal {
    /// The field that enters the header digest.
    pub fn field(&self) -> SealField<'_> {
        match self {
            Seal::Work { nonce, difficulty } => SealField::Work {
                nonce: *nonce,
                difficulty: *difficulty,
            },
            Seal::Stake { validator } => SealField::Validator(validator),
        }
    }
}

/// Borrowed view of the mutable header field a seal contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealField<'a> {
    Work { nonce: u64, difficulty: usize },
    Validator(&'a str),
}

/// Digest over the header fields and seal field in canonical order.
///
/// Strings are length-prefixed so distinct headers cannot encode to the same bytes.
pub fn compute_header_digest(
    index: u64,
    previous_hash: &str,
    merkle_root: &str,
    field: SealField<'_>,
) -> String {
    fn update_str(hasher: &mut Sha256, s: &str) {
        hasher.update((s.len() as u64).to_le_bytes());
        hasher.update(s.as_bytes());
    }

    let mut hasher = Sha256::new();
    hasher.update(index.to_le_bytes());
    update_str(&mut hasher, previous_hash);
    update_str(&mut hasher, merkle_root);
    match field {
        SealField::Work { nonce, difficulty } => {
            hasher.update(b"W");
            hasher.update(nonce.to_le_bytes());
            hasher.update((difficulty as u64).to_le_bytes());
        }
        SealField::Validator(name) => {
            hasher.update(b"S");
            update_str(&mut hasher, name);
        }
    }
    hex::encode(hasher.finalize())
}

/// A block that has been assembled but not sealed. It has no hash.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDraft {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl BlockDraft {
    /// Builds a draft, committing `transactions` into the header's Merkle root.
    pub fn new(index: u64, previous_hash: impl Into<String>, transactions: Vec<Transaction>) -> Self {
        let merkle_root = MerkleTree::from_transactions(&transactions);
        Self {
            header: BlockHeader {
                index,
                previous_hash: previous_hash.into(),
                merkle_root,
            },
            transactions,
        }
    }

    /// Header digest this draft would have under `field`.
    pub fn digest_with(&self, field: SealField<'_>) -> String {
        compute_header_digest(
            self.header.index,
            &self.header.previous_hash,
            &self.header.merkle_root,
            field,
        )
    }

    /// Finalizes the draft. `hash` must be the digest for `seal`; consensus
    /// strategies are the only callers.
    pub(crate) fn into_block(self, seal: Seal, hash: String) -> Block {
        Block {
            header: self.header,
            transactions: self.transactions,
            seal,
            hash,
        }
    }
}

/// A sealed block.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Block {
    /// The block header.
    pub header: BlockHeader,
    /// The list of transactions included in the block.
    pub transactions: Vec<Transaction>,
    /// How the block was sealed.
    pub seal: Seal,
    /// The header digest fixed by sealing.
    pub hash: String,
}

impl Block {
    pub fn index(&self) -> u64 {
        self.header.index
    }

    pub fn previous_hash(&self) -> &str {
        &self.header.previous_hash
    }

    pub fn merkle_root(&self) -> &str {
        &self.header.merkle_root
    }

    /// Name of the sealing validator for proof-of-stake blocks.
    pub fn validator(&self) -> Option<&str> {
        match &self.seal {
            Seal::Stake { validator } => Some(validator),
            Seal::Work { .. } => None,
        }
    }

    pub fn nonce(&self) -> Option<u64> {
        match self.seal {
            Seal::Work { nonce, .. } => Some(nonce),
            Seal::Stake { .. } => None,
        }
    }

    /// Recomputes the header digest from the stored fields.
    pub fn compute_hash(&self) -> String {
        compute_header_digest(
            self.header.index,
            &self.header.previous_hash,
            &self.header.merkle_root,
            self.seal.field(),
        )
    }

    /// True when the stored hash matches a fresh digest of the block.
    pub fn is_valid(&self) -> bool {
        usize::try_from(self.header.index).map_or(false, |position| self.check(position).is_ok())
    }

    /// Runs the self-contained checks, reporting failures against `position`.
    pub fn check(&self, position: usize) -> Result<(), IntegrityViolation> {
        if self.transactions.iter().any(|tx| tx.validate().is_err()) {
            return Err(IntegrityViolation::MalformedTransaction { index: position });
        }
        if MerkleTree::from_transactions(&self.transactions) != self.header.merkle_root {
            return Err(IntegrityViolation::MerkleRootMismatch { index: position });
        }
        if self.compute_hash() != self.hash {
            return Err(IntegrityViolation::DigestMismatch { index: position });
        }
        if let Seal::Work { difficulty, .. } = self.seal {
            if !has_leading_zeros(&self.hash, difficulty) {
                return Err(IntegrityViolation::InsufficientWork { index: position });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_draft() -> BlockDraft {
        BlockDraft::new(
            1,
            "ab".repeat(32),
            vec![Transaction::new("1", "Alice", "Bob", 10.0)],
        )
    }

    #[test]
    fn draft_commits_transactions() {
        let draft = sample_draft();
        assert_eq!(draft.header.merkle_root, "1:Alice->Bob:10");
    }

    fn work(nonce: u64, difficulty: usize) -> SealField<'static> {
        SealField::Work { nonce, difficulty }
    }

    #[test]
    fn header_digest_depends_on_every_field() {
        let base = compute_header_digest(1, "p", "m", work(0, 0));
        assert_ne!(base, compute_header_digest(2, "p", "m", work(0, 0)));
        assert_ne!(base, compute_header_digest(1, "q", "m", work(0, 0)));
        assert_ne!(base, compute_header_digest(1, "p", "n", work(0, 0)));
        assert_ne!(base, compute_header_digest(1, "p", "m", work(1, 0)));
        assert_ne!(base, compute_header_digest(1, "p", "m", work(0, 1)));
        assert_ne!(
            compute_header_digest(1, "p", "m", SealField::Validator("Alice")),
            compute_header_digest(1, "p", "m", SealField::Validator("Bob"))
        );
    }

    #[test]
    fn field_boundaries_are_unambiguous() {
        assert_ne!(
            compute_header_digest(1, "ab", "c", work(0, 0)),
            compute_header_digest(1, "a", "bc", work(0, 0))
        );
    }

    #[test]
    fn sealed_block_is_valid_until_modified() {
        let draft = sample_draft();
        let seal = Seal::Stake {
            validator: "Alice".to_string(),
        };
        let hash = draft.digest_with(seal.field());
        let mut block = draft.into_block(seal, hash);
        assert!(block.is_valid());
        assert_eq!(block.validator(), Some("Alice"));

        block.seal = Seal::Stake {
            validator: "Bob".to_string(),
        };
        assert_eq!(
            block.check(1),
            Err(IntegrityViolation::DigestMismatch { index: 1 })
        );
    }

    #[test]
    fn stale_merkle_root_is_reported() {
        let draft = sample_draft();
        let seal = Seal::Stake {
            validator: "Alice".to_string(),
        };
        let hash = draft.digest_with(seal.field());
        let mut block = draft.into_block(seal, hash);
        block.transactions[0].amount = 1_000.0;
        assert_eq!(
            block.check(1),
            Err(IntegrityViolation::MerkleRootMismatch { index: 1 })
        );
    }

    #[test]
    fn work_seal_must_meet_difficulty() {
        let draft = sample_draft();
        // Nonce 0 almost never yields 64 leading zeros.
        let seal = Seal::Work {
            nonce: 0,
            difficulty: 64,
        };
        let hash = draft.digest_with(seal.field());
        let block = draft.into_block(seal, hash);
        assert_eq!(
            block.check(1),
            Err(IntegrityViolation::InsufficientWork { index: 1 })
        );
    }

    #[test]
    fn relabelled_difficulty_breaks_digest() {
        let draft = sample_draft();
        let (nonce, hash) = (0u64..)
            .map(|nonce| (nonce, draft.digest_with(work(nonce, 1))))
            .find(|(_, hash)| has_leading_zeros(hash, 1))
            .unwrap();
        let mut block = draft.into_block(Seal::Work { nonce, difficulty: 1 }, hash);
        assert!(block.is_valid());

        block.seal = Seal::Work { nonce, difficulty: 0 };
        assert_eq!(
            block.check(1),
            Err(IntegrityViolation::DigestMismatch { index: 1 })
        );
    }

    #[test]
    fn colliding_transaction_encoding_is_rejected() {
        let honest = Transaction::new("a", "b", "c:d->e", 1.0);
        let forged = Transaction::new("a:b->c", "d", "e", 1.0);
        assert_eq!(honest.encode(), forged.encode());

        let draft = BlockDraft::new(1, "ab".repeat(32), vec![forged]);
        let seal = Seal::Stake {
            validator: "Alice".to_string(),
        };
        let hash = draft.digest_with(seal.field());
        let block = draft.into_block(seal, hash);
        assert!(!block.is_valid());
        assert_eq!(
            block.check(1),
            Err(IntegrityViolation::MalformedTransaction { index: 1 })
        );
    }
}
