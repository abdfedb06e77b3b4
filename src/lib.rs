//! minichain - an append-only ledger sealed by proof-of-work or proof-of-stake
//!
//! # Architecture
//!
//! ## Integrity core
//! - [`digest`] - SHA-256 content hash
//! - [`merkle`] - Merkle root over a transaction batch
//! - [`transaction`] - Value transfers and their canonical encoding
//! - [`block`] - Block drafts, sealed blocks and header digests
//! - [`chain`] - Block sequence, appends and verification
//!
//! ## Consensus
//! - [`consensus`] - Sealing strategies: nonce search and stake-weighted draw
//! - [`validator`] - Proof-of-stake roster
//!
//! ## Adapters & utilities
//! - [`store`] - sled-backed block persistence
//! - [`config`] - Runtime settings
//! - [`error`] - Error types

#![forbid(unsafe_code)]

pub mod block;
pub mod chain;
pub mod consensus;
pub mod digest;
pub mod merkle;
pub mod transaction;
pub mod validator;

pub mod config;
pub mod error;
pub mod store;

pub use block::{Block, BlockDraft, BlockHeader, Seal};
pub use chain::Chain;
pub use consensus::{CancelToken, ConsensusStrategy, ProofOfStake, ProofOfWork};
pub use error::{ChainError, IntegrityViolation, Result};
pub use transaction::Transaction;
pub use validator::Validator;
