//! An in-memory ledger store: the active chain, a full transaction index
//! and the unspent-output set at the tip.

use crate::chain::{BlockLocator, ChainBlock, ChainError, ChainView};
use crate::prevout::{PrevoutError, PrevoutResolver};
use bitcoin::{Block, BlockHash, OutPoint, Transaction, TxOut, Txid};
use log::debug;
use std::collections::HashMap;
use std::{error, fmt};

/// Number of blocks (including the block itself) the median-time-past is
/// calculated over.
const MEDIAN_TIME_SPAN: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Maintain a full transaction index. When enabled, spent outputs are
    /// resolved through the index, otherwise only through the UTXO set.
    pub txindex: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig { txindex: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    Disconnected {
        expected: BlockHash,
        prev_blockhash: BlockHash,
    },
    MissingInput(OutPoint),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LedgerError::Disconnected {
                expected,
                prev_blockhash,
            } => write!(
                f,
                "Block does not connect to the tip: expected previous block {} but got {}",
                expected, prev_blockhash
            ),
            LedgerError::MissingInput(outpoint) => {
                write!(f, "Block spends missing or spent output {}", outpoint)
            }
        }
    }
}

impl error::Error for LedgerError {}

/// All transactions ever confirmed, by txid. Resolves any output that was
/// ever created, spent or not.
#[derive(Debug, Clone, Default)]
pub struct TxIndex {
    txs: HashMap<Txid, Transaction>,
}

impl TxIndex {
    fn add_block(&mut self, block: &Block) {
        for tx in block.txdata.iter() {
            self.txs.insert(tx.compute_txid(), tx.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }
}

impl PrevoutResolver for TxIndex {
    fn prevout(&self, outpoint: &OutPoint) -> Result<TxOut, PrevoutError> {
        self.txs
            .get(&outpoint.txid)
            .and_then(|tx| tx.output.get(outpoint.vout as usize))
            .cloned()
            .ok_or(PrevoutError::Unresolvable(*outpoint))
    }
}

/// The outputs unspent as of the ledger tip.
#[derive(Debug, Clone, Default)]
pub struct UtxoSet {
    coins: HashMap<OutPoint, TxOut>,
}

impl UtxoSet {
    fn connect_block(&mut self, block: &Block) -> Result<(), LedgerError> {
        // Check all spends before touching the set so a failing block
        // leaves it unchanged.
        let mut staged = self.clone();
        for (position, tx) in block.txdata.iter().enumerate() {
            if position > 0 {
                for input in tx.input.iter() {
                    if staged.coins.remove(&input.previous_output).is_none() {
                        return Err(LedgerError::MissingInput(input.previous_output));
                    }
                }
            }
            let txid = tx.compute_txid();
            for (vout, output) in tx.output.iter().enumerate() {
                staged
                    .coins
                    .insert(OutPoint::new(txid, vout as u32), output.clone());
            }
        }
        *self = staged;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }
}

impl PrevoutResolver for UtxoSet {
    fn prevout(&self, outpoint: &OutPoint) -> Result<TxOut, PrevoutError> {
        self.coins
            .get(outpoint)
            .cloned()
            .ok_or(PrevoutError::Unresolvable(*outpoint))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    config: LedgerConfig,
    blocks: Vec<ChainBlock>,
    heights: HashMap<BlockHash, u64>,
    tx_index: TxIndex,
    utxo_set: UtxoSet,
}

impl MemoryLedger {
    pub fn new(config: LedgerConfig) -> MemoryLedger {
        MemoryLedger {
            config,
            ..Default::default()
        }
    }

    /// Connects a block on top of the current tip. The first block pushed
    /// becomes the genesis block.
    pub fn push_block(&mut self, block: Block) -> Result<&ChainBlock, LedgerError> {
        if let Some(tip) = self.blocks.last() {
            let expected = tip.hash();
            if block.header.prev_blockhash != expected {
                return Err(LedgerError::Disconnected {
                    expected,
                    prev_blockhash: block.header.prev_blockhash,
                });
            }
        }

        self.utxo_set.connect_block(&block)?;
        if self.config.txindex {
            self.tx_index.add_block(&block);
        }

        let height = self.blocks.len() as u64;
        let median_time = self.median_time_past(block.header.time);
        let hash = block.block_hash();
        debug!(
            "ledger: connected block {} at height {} ({} transactions)",
            hash,
            height,
            block.txdata.len()
        );
        self.heights.insert(hash, height);
        self.blocks.push(ChainBlock {
            height,
            median_time,
            block,
        });
        Ok(&self.blocks[height as usize])
    }

    /// Median of the timestamps of the last `MEDIAN_TIME_SPAN - 1` blocks
    /// and the given timestamp of the next block.
    fn median_time_past(&self, time: u32) -> u32 {
        let start = self.blocks.len().saturating_sub(MEDIAN_TIME_SPAN - 1);
        let mut times: Vec<u32> = self.blocks[start..].iter().map(|b| b.time()).collect();
        times.push(time);
        times.sort_unstable();
        times[times.len() / 2]
    }

    pub fn tip(&self) -> Option<&ChainBlock> {
        self.blocks.last()
    }

    pub fn config(&self) -> LedgerConfig {
        self.config
    }

    pub fn tx_index(&self) -> Option<&TxIndex> {
        if self.config.txindex {
            Some(&self.tx_index)
        } else {
            None
        }
    }

    pub fn utxo_set(&self) -> &UtxoSet {
        &self.utxo_set
    }
}

impl ChainView for MemoryLedger {
    fn tip_height(&self) -> Result<u64, ChainError> {
        self.tip()
            .map(|tip| tip.height)
            .ok_or_else(|| ChainError::Backend("the ledger has no blocks".to_string()))
    }

    fn block(&self, locator: &BlockLocator) -> Result<ChainBlock, ChainError> {
        let height = match locator {
            BlockLocator::Height(height) => u64::try_from(*height).ok(),
            BlockLocator::Hash(hash) => self.heights.get(hash).copied(),
        };
        height
            .and_then(|height| self.blocks.get(height as usize))
            .cloned()
            .ok_or(ChainError::NotFound(*locator))
    }
}

/// Resolves through the transaction index when it's enabled and through the
/// UTXO set otherwise.
impl PrevoutResolver for MemoryLedger {
    fn prevout(&self, outpoint: &OutPoint) -> Result<TxOut, PrevoutError> {
        match self.tx_index() {
            Some(tx_index) => tx_index.prevout(outpoint),
            None => self.utxo_set.prevout(outpoint),
        }
    }
}
