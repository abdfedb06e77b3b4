//! Proof-of-work: search for the smallest nonce whose header digest starts
//! with `difficulty` hex zeros.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use tracing::debug;

use super::{CancelToken, ConsensusStrategy};
use crate::block::{compute_header_digest, Block, BlockDraft, BlockHeader, Seal, SealField};
use crate::digest::{has_leading_zeros, DIGEST_LEN};
use crate::error::{ChainError, Result};

const PROGRESS_INTERVAL: u64 = 1 << 20;

/// Everything the nonce search reads: the fixed header fields plus the nonce under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkState {
    pub index: u64,
    pub previous_hash: String,
    pub merkle_root: String,
    pub nonce: u64,
}

/// Outcome of hashing one nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonceAttempt {
    pub digest: String,
    pub satisfied: bool,
}

impl WorkState {
    pub fn from_header(header: &BlockHeader) -> Self {
        Self {
            index: header.index,
            previous_hash: header.previous_hash.clone(),
            merkle_root: header.merkle_root.clone(),
            nonce: 0,
        }
    }

    /// Hashes the header at the current nonce and tests it against `difficulty`.
    pub fn try_nonce(&self, difficulty: usize) -> NonceAttempt {
        let digest = compute_header_digest(
            self.index,
            &self.previous_hash,
            &self.merkle_root,
            SealField::Work {
                nonce: self.nonce,
                difficulty,
            },
        );
        let satisfied = has_leading_zeros(&digest, difficulty);
        NonceAttempt { digest, satisfied }
    }
}

#[derive(Debug, Clone)]
pub struct ProofOfWork {
    difficulty: usize,
    threads: usize,
    max_attempts: Option<u64>,
    cancel: Option<CancelToken>,
}

impl ProofOfWork {
    pub fn new(difficulty: usize) -> Self {
        Self {
            difficulty,
            threads: 1,
            max_attempts: None,
            cancel: None,
        }
    }

    /// Searches with `threads` workers. The result is identical to the
    /// single-threaded search: the smallest satisfying nonce.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Limits the search to nonces `0..max_attempts`.
    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, CancelToken::is_cancelled)
    }

    /// Returns the winning nonce and its digest.
    pub fn search(&self, header: &BlockHeader) -> Result<(u64, String)> {
        if self.difficulty > DIGEST_LEN {
            return Err(ChainError::InvalidDifficulty(self.difficulty));
        }
        debug!(
            index = header.index,
            difficulty = self.difficulty,
            threads = self.threads,
            "starting nonce search"
        );
        if self.threads <= 1 {
            self.search_sequential(header)
        } else {
            self.search_parallel(header)
        }
    }

    fn search_sequential(&self, header: &BlockHeader) -> Result<(u64, String)> {
        let limit = self.max_attempts.unwrap_or(u64::MAX);
        let mut state = WorkState::from_header(header);

        loop {
            if state.nonce >= limit {
                return Err(ChainError::SearchExhausted { attempts: limit });
            }
            if self.cancelled() {
                return Err(ChainError::Cancelled);
            }

            let attempt = state.try_nonce(self.difficulty);
            if attempt.satisfied {
                return Ok((state.nonce, attempt.digest));
            }

            state.nonce += 1;
            if state.nonce % PROGRESS_INTERVAL == 0 {
                debug!(index = state.index, nonce = state.nonce, "nonce search in progress");
            }
        }
    }

    // Nonces are handed out in increasing order from a shared counter and a
    // worker only stops after drawing a nonce at or above the best found so
    // far. Every nonce below the final best was therefore tested and failed.
    fn search_parallel(&self, header: &BlockHeader) -> Result<(u64, String)> {
        let limit = self.max_attempts.unwrap_or(u64::MAX);
        let next = AtomicU64::new(0);
        let best = AtomicU64::new(u64::MAX);
        let aborted = AtomicBool::new(false);

        thread::scope(|scope| {
            for _ in 0..self.threads {
                scope.spawn(|| {
                    let mut state = WorkState::from_header(header);
                    loop {
                        if self.cancelled() {
                            aborted.store(true, Ordering::Release);
                            break;
                        }
                        let nonce = next.fetch_add(1, Ordering::Relaxed);
                        if nonce >= limit || nonce >= best.load(Ordering::Acquire) {
                            break;
                        }
                        state.nonce = nonce;
                        if state.try_nonce(self.difficulty).satisfied {
                            best.fetch_min(nonce, Ordering::AcqRel);
                            break;
                        }
                    }
                });
            }
        });

        if aborted.load(Ordering::Acquire) {
            return Err(ChainError::Cancelled);
        }

        let nonce = best.load(Ordering::Acquire);
        if nonce == u64::MAX {
            return Err(ChainError::SearchExhausted { attempts: limit });
        }

        let mut state = WorkState::from_header(header);
        state.nonce = nonce;
        Ok((nonce, state.try_nonce(self.difficulty).digest))
    }
}

impl ConsensusStrategy for ProofOfWork {
    fn name(&self) -> &'static str {
        "proof-of-work"
    }

    fn seal(&mut self, draft: BlockDraft) -> Result<Block> {
        let (nonce, hash) = self.search(&draft.header)?;
        let seal = Seal::Work {
            nonce,
            difficulty: self.difficulty,
        };
        Ok(draft.into_block(seal, hash))
    }
}
