//! Error types for minichain.

use thiserror::Error;

/// Why a chain failed verification, and at which block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    #[error("block {index}: a transaction has a field that breaks its canonical encoding")]
    MalformedTransaction { index: usize },

    #[error("block {index}: merkle root does not commit to the stored transactions")]
    MerkleRootMismatch { index: usize },

    #[error("block {index}: stored hash does not match the recomputed header digest")]
    DigestMismatch { index: usize },

    #[error("block {index}: previous hash does not match the hash of its predecessor")]
    BrokenLink { index: usize },

    #[error("block {index}: hash does not meet the recorded proof-of-work difficulty")]
    InsufficientWork { index: usize },

    #[error("block {index}: sealed by a validator outside the roster")]
    UnknownValidator { index: usize },

    #[error("block at position {expected} carries index {found}")]
    IndexMismatch { expected: usize, found: u64 },

    #[error("chain has no genesis block")]
    EmptyChain,
}

impl IntegrityViolation {
    /// Position of the offending block, if the violation concerns one.
    pub fn index(&self) -> Option<usize> {
        match self {
            IntegrityViolation::MalformedTransaction { index }
            | IntegrityViolation::MerkleRootMismatch { index }
            | IntegrityViolation::DigestMismatch { index }
            | IntegrityViolation::BrokenLink { index }
            | IntegrityViolation::InsufficientWork { index }
            | IntegrityViolation::UnknownValidator { index } => Some(*index),
            IntegrityViolation::IndexMismatch { expected, .. } => Some(*expected),
            IntegrityViolation::EmptyChain => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("proof-of-stake sealing requires at least one validator")]
    EmptyValidatorSet,

    #[error("validator {name} has invalid stake {stake}; stake must be finite and positive")]
    InvalidStake { name: String, stake: f64 },

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("difficulty {0} exceeds the digest length")]
    InvalidDifficulty(usize),

    #[error("nonce search gave up after {attempts} attempts")]
    SearchExhausted { attempts: u64 },

    #[error("nonce search was cancelled")]
    Cancelled,

    #[error("block {0} not found")]
    BlockNotFound(usize),

    #[error("invalid chain state: {0}")]
    InvalidChainState(#[from] IntegrityViolation),

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
