//! The ledger: an ordered, hash-linked sequence of sealed blocks.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::block::{Block, BlockDraft, GENESIS_PREVIOUS_HASH};
use crate::consensus::{CancelToken, ConsensusStrategy, ProofOfStake, ProofOfWork};
use crate::error::{ChainError, IntegrityViolation, Result};
use crate::transaction::Transaction;
use crate::validator::{validate_roster, Validator};

#[cfg(any(test, feature = "testing"))]
use crate::merkle::MerkleTree;

/// Difficulty used to mine the genesis block.
pub const GENESIS_DIFFICULTY: usize = 1;

pub struct Chain {
    blocks: Vec<Block>,
    validators: Vec<Validator>,
    rng: StdRng,
    cancel: CancelToken,
    pow_threads: usize,
}

impl Chain {
    /// Creates a chain whose genesis block commits `genesis_transactions`.
    pub fn new(genesis_transactions: Vec<Transaction>, validators: Vec<Validator>) -> Result<Self> {
        validate_roster(&validators)?;
        genesis_transactions.iter().try_for_each(Transaction::validate)?;

        let draft = BlockDraft::new(0, GENESIS_PREVIOUS_HASH, genesis_transactions);
        let genesis = ProofOfWork::new(GENESIS_DIFFICULTY).seal(draft)?;
        info!(hash = %genesis.hash, "genesis block sealed");

        Ok(Self {
            blocks: vec![genesis],
            validators,
            rng: StdRng::from_entropy(),
            cancel: CancelToken::new(),
            pow_threads: 1,
        })
    }

    /// Creates a chain with the conventional single genesis transaction.
    pub fn with_genesis(validators: Vec<Validator>) -> Result<Self> {
        Self::new(vec![Self::genesis_transaction()], validators)
    }

    pub fn genesis_transaction() -> Transaction {
        Transaction::new("0", "Genesis", "Genesis", 0.0)
    }

    /// Rebuilds a chain from previously sealed blocks, rejecting any that fail [`Chain::audit`].
    pub fn from_blocks(blocks: Vec<Block>, validators: Vec<Validator>) -> Result<Self> {
        validate_roster(&validators)?;
        let chain = Self {
            blocks,
            validators,
            rng: StdRng::from_entropy(),
            cancel: CancelToken::new(),
            pow_threads: 1,
        };
        chain.audit()?;
        Ok(chain)
    }

    /// Makes validator draws reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Number of workers used by [`Chain::append_with_pow`].
    pub fn with_pow_threads(mut self, threads: usize) -> Self {
        self.pow_threads = threads.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false for a constructed chain; genesis is never removed.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn tip(&self) -> &Block {
        // Every constructor leaves at least the genesis block in place.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Token honored by every proof-of-work append. Cancel it to abort a search in flight.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Assembles the next block on top of the current tip.
    pub fn draft(&self, transactions: Vec<Transaction>) -> Result<BlockDraft> {
        transactions.iter().try_for_each(Transaction::validate)?;
        let tip = self.tip();
        Ok(BlockDraft::new(tip.index() + 1, tip.hash.clone(), transactions))
    }

    /// Seals `transactions` with `strategy` and appends the block. Returns its index.
    pub fn append_with(
        &mut self,
        transactions: Vec<Transaction>,
        strategy: &mut dyn ConsensusStrategy,
    ) -> Result<usize> {
        let draft = self.draft(transactions)?;
        let block = strategy.seal(draft)?;
        self.commit(block, strategy.name())
    }

    pub fn append_with_pow(&mut self, transactions: Vec<Transaction>, difficulty: usize) -> Result<usize> {
        let mut pow = ProofOfWork::new(difficulty)
            .with_threads(self.pow_threads)
            .with_cancel(self.cancel.clone());
        self.append_with(transactions, &mut pow)
    }

    pub fn append_with_pos(&mut self, transactions: Vec<Transaction>) -> Result<usize> {
        if self.validators.is_empty() {
            return Err(ChainError::EmptyValidatorSet);
        }
        let draft = self.draft(transactions)?;
        let mut pos = ProofOfStake::new(&self.validators, &mut self.rng);
        let block = pos.seal(draft)?;
        let name = pos.name();
        self.commit(block, name)
    }

    fn commit(&mut self, block: Block, strategy: &str) -> Result<usize> {
        let index = self.blocks.len();
        if block.index() != index as u64 {
            return Err(IntegrityViolation::IndexMismatch {
                expected: index,
                found: block.index(),
            }
            .into());
        }
        if block.previous_hash() != self.tip().hash {
            return Err(IntegrityViolation::BrokenLink { index }.into());
        }
        block.check(index)?;
        self.check_sealer(&block, index)?;

        info!(
            index,
            strategy,
            hash = %block.hash,
            nonce = ?block.nonce(),
            validator = ?block.validator(),
            txs = block.transactions.len(),
            "block appended"
        );
        self.blocks.push(block);
        Ok(index)
    }

    /// True when every block re-hashes to its stored hash and links to its predecessor.
    pub fn verify(&self) -> bool {
        match self.audit() {
            Ok(()) => true,
            Err(violation) => {
                warn!(%violation, "chain verification failed");
                false
            }
        }
    }

    /// Walks the chain from genesis and reports the first violation found.
    ///
    /// Genesis is exempt from the link check but its digest is still verified.
    pub fn audit(&self) -> std::result::Result<(), IntegrityViolation> {
        if self.blocks.is_empty() {
            return Err(IntegrityViolation::EmptyChain);
        }

        for (i, block) in self.blocks.iter().enumerate() {
            if block.index() != i as u64 {
                return Err(IntegrityViolation::IndexMismatch {
                    expected: i,
                    found: block.index(),
                });
            }
            if i > 0 && block.previous_hash() != self.blocks[i - 1].hash {
                return Err(IntegrityViolation::BrokenLink { index: i });
            }
            block.check(i)?;
            self.check_sealer(block, i)?;
        }
        Ok(())
    }

    /// Stake seals must name a validator on this chain's roster.
    fn check_sealer(&self, block: &Block, index: usize) -> std::result::Result<(), IntegrityViolation> {
        match block.validator() {
            Some(name) if !self.validators.iter().any(|v| v.name == name) => {
                Err(IntegrityViolation::UnknownValidator { index })
            }
            _ => Ok(()),
        }
    }

    /// Test hook: replaces a block's transactions and the Merkle root committing
    /// them, leaving the seal and hash untouched.
    #[cfg(any(test, feature = "testing"))]
    pub fn tamper_for_testing(&mut self, index: usize, transactions: Vec<Transaction>) -> Result<()> {
        let block = self
            .blocks
            .get_mut(index)
            .ok_or(ChainError::BlockNotFound(index))?;
        block.header.merkle_root = MerkleTree::from_transactions(&transactions);
        block.transactions = transactions;
        Ok(())
    }

    /// Test hook: overwrites a block's previous-hash link without resealing.
    #[cfg(any(test, feature = "testing"))]
    pub fn tamper_previous_hash_for_testing(&mut self, index: usize, previous_hash: &str) -> Result<()> {
        let block = self
            .blocks
            .get_mut(index)
            .ok_or(ChainError::BlockNotFound(index))?;
        block.header.previous_hash = previous_hash.to_string();
        Ok(())
    }
}
