//! Block persistence on top of sled.
//!
//! Blocks are stored under `block/<index as big-endian u64>` so a prefix scan
//! returns them in chain order. `latest` holds the tip index.

use std::path::Path;

use sled::Db;
use tracing::debug;

use crate::block::Block;
use crate::chain::Chain;
use crate::error::Result;
use crate::validator::Validator;

const BLOCK_PREFIX: &[u8] = b"block/";
const LATEST_KEY: &[u8] = b"latest";

fn block_key(index: u64) -> Vec<u8> {
    let mut key = BLOCK_PREFIX.to_vec();
    key.extend_from_slice(&index.to_be_bytes());
    key
}

pub struct ChainStore {
    db: Db,
}

impl ChainStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// A store that lives only as long as this handle.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    pub fn save_block(&self, block: &Block) -> Result<()> {
        let val = bincode::serialize(block)?;
        self.db.insert(block_key(block.index()), val)?;
        self.db.insert(LATEST_KEY, bincode::serialize(&block.index())?)?;
        self.db.flush()?;
        debug!(index = block.index(), hash = %block.hash, "block stored");
        Ok(())
    }

    /// Writes every block of `chain`, replacing what was stored before.
    pub fn save_chain(&self, chain: &Chain) -> Result<()> {
        self.db.clear()?;
        for block in chain.blocks() {
            self.save_block(block)?;
        }
        Ok(())
    }

    pub fn latest(&self) -> Result<Option<Block>> {
        let Some(raw) = self.db.get(LATEST_KEY)? else {
            return Ok(None);
        };
        let index: u64 = bincode::deserialize(&raw)?;
        match self.db.get(block_key(index))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All stored blocks in index order.
    pub fn load_blocks(&self) -> Result<Vec<Block>> {
        self.db
            .scan_prefix(BLOCK_PREFIX)
            .values()
            .map(|value| -> Result<Block> { Ok(bincode::deserialize(&value?)?) })
            .collect()
    }

    /// Rebuilds and audits the stored chain.
    pub fn load_chain(&self, validators: Vec<Validator>) -> Result<Chain> {
        Chain::from_blocks(self.load_blocks()?, validators)
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}
