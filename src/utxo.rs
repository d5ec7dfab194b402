use bitcoin::TxOut;

/// Estimated per-entry overhead of an unspent output in the UTXO set on top
/// of the serialized output (outpoint, height and coinbase flag, and the
/// bookkeeping of the storage engine). Every created output adds and every
/// spent output removes this many bytes in addition to its own size.
pub const PER_UTXO_OVERHEAD: i64 = 41;

/// Estimated size of the UTXO set entry for the output.
pub fn utxo_entry_size(output: &TxOut) -> i64 {
    PER_UTXO_OVERHEAD + bitcoin::consensus::serialize(output).len() as i64
}

/// Net change of the UTXO set caused by a block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UtxoDelta {
    /// number of outputs created (including the coinbase outputs)
    pub outs: i64,
    /// number of outputs spent (the coinbase input isn't a spend)
    pub ins: i64,
    /// estimated change of the UTXO set size in bytes
    pub size_inc: i64,
}

impl UtxoDelta {
    pub fn create(&mut self, outputs: &[TxOut]) {
        self.outs += outputs.len() as i64;
        self.size_inc += outputs.iter().map(utxo_entry_size).sum::<i64>();
    }

    /// `spent` are the resolved outputs spent by the inputs of a
    /// non-coinbase transaction.
    pub fn spend(&mut self, spent: &[TxOut]) {
        self.ins += spent.len() as i64;
        self.size_inc -= spent.iter().map(utxo_entry_size).sum::<i64>();
    }

    /// Net number of new entries in the UTXO set. Negative if the block
    /// spends more outputs than it creates.
    pub fn increase(&self) -> i64 {
        self.outs - self.ins
    }
}
