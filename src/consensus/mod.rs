//! Block sealing strategies.
//!
//! A [`ConsensusStrategy`] turns an unsealed [`BlockDraft`] into a sealed
//! [`Block`]. The chain takes whichever strategy the caller hands it for each
//! append, so proof-of-work and proof-of-stake blocks can be mixed freely.

pub mod pos;
pub mod pow;

pub use pos::{select_validator, ProofOfStake};
pub use pow::{NonceAttempt, ProofOfWork, WorkState};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::block::{Block, BlockDraft};
use crate::error::Result;

pub trait ConsensusStrategy {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Seals `draft`, fixing its header digest.
    fn seal(&mut self, draft: BlockDraft) -> Result<Block>;
}

/// Shared flag that asks an in-flight nonce search to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clears the flag so later searches run again.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
