use bitcoin::{blockdata::constants::WITNESS_SCALE_FACTOR, Transaction};

/// Size and weight of a single transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxFootprint {
    /// serialized size in bytes, including witness data
    pub size: i64,
    /// serialized size in bytes, excluding witness data
    pub base_size: i64,
    /// weight units: witness bytes count once, all other bytes four times
    pub weight: i64,
    /// the transaction carries witness data for at least one input
    pub segwit: bool,
}

impl TxFootprint {
    pub fn of(tx: &Transaction) -> TxFootprint {
        let size = tx.total_size() as i64;
        let base_size = tx.base_size() as i64;
        TxFootprint {
            size,
            base_size,
            weight: base_size * (WITNESS_SCALE_FACTOR as i64 - 1) + size,
            segwit: has_witness(tx),
        }
    }
}

pub fn has_witness(tx: &Transaction) -> bool {
    tx.input.iter().any(|input| !input.witness.is_empty())
}

/// Block-wide size and weight totals. The `sw` totals only count
/// transactions with witness data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SizeTotals {
    pub total_size: i64,
    pub total_weight: i64,
    pub swtxs: i64,
    pub swtotal_size: i64,
    pub swtotal_weight: i64,
}

impl SizeTotals {
    pub fn add(&mut self, footprint: &TxFootprint) {
        self.total_size += footprint.size;
        self.total_weight += footprint.weight;
        if footprint.segwit {
            self.swtxs += 1;
            self.swtotal_size += footprint.size;
            self.swtotal_weight += footprint.weight;
        }
    }
}
