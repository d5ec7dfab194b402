use crate::distribution::DistributionStats;
use crate::weight::TxFootprint;
use bitcoin::{blockdata::constants::WITNESS_SCALE_FACTOR, Transaction, TxOut};

/// Sum of the output values of a transaction in satoshi.
pub fn output_value(tx: &Transaction) -> i64 {
    tx.output.iter().map(|o| o.value.to_sat() as i64).sum()
}

/// Feerate in sat/vbyte for the fee paid by a transaction with the given
/// weight, rounded down. A vbyte is `WITNESS_SCALE_FACTOR` weight units.
pub fn feerate(fee: i64, weight: i64) -> i64 {
    if weight == 0 {
        return 0;
    }
    (fee * WITNESS_SCALE_FACTOR as i64).div_euclid(weight)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxFee {
    pub fee: i64,
    pub feerate: i64,
}

impl TxFee {
    /// Fee and feerate of a non-coinbase transaction. `spent` are the
    /// outputs spent by its inputs. The fee isn't clamped: spending less
    /// than is paid out results in a negative fee.
    pub fn new(tx: &Transaction, spent: &[TxOut], weight: i64) -> TxFee {
        let value_in: i64 = spent.iter().map(|o| o.value.to_sat() as i64).sum();
        let fee = value_in - output_value(tx);
        TxFee {
            fee,
            feerate: feerate(fee, weight),
        }
    }
}

/// Fee, feerate and size distributions over the non-coinbase transactions
/// of a block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeeStats {
    pub total_fee: i64,
    pub fee: DistributionStats,
    /// `feerate.avg` is weighted by transaction weight: the total fee over
    /// the total weight, not the mean of the individual feerates.
    pub feerate: DistributionStats,
    pub size: DistributionStats,
}

#[derive(Debug, Default)]
pub struct FeeAccumulator {
    fees: Vec<i64>,
    feerates: Vec<i64>,
    sizes: Vec<i64>,
    total_fee: i64,
    total_weight: i64,
}

impl FeeAccumulator {
    pub fn with_capacity(capacity: usize) -> FeeAccumulator {
        FeeAccumulator {
            fees: Vec::with_capacity(capacity),
            feerates: Vec::with_capacity(capacity),
            sizes: Vec::with_capacity(capacity),
            total_fee: 0,
            total_weight: 0,
        }
    }

    /// Adds a non-coinbase transaction.
    pub fn add(&mut self, fee: &TxFee, footprint: &TxFootprint) {
        self.fees.push(fee.fee);
        self.feerates.push(fee.feerate);
        self.sizes.push(footprint.size);
        self.total_fee += fee.fee;
        self.total_weight += footprint.weight;
    }

    pub fn finish(self) -> FeeStats {
        let avg_feerate = feerate(self.total_fee, self.total_weight);
        let mut feerate_stats = DistributionStats::from_values(self.feerates);
        feerate_stats.avg = avg_feerate;
        FeeStats {
            total_fee: self.total_fee,
            fee: DistributionStats::from_values(self.fees),
            feerate: feerate_stats,
            size: DistributionStats::from_values(self.sizes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{feerate, FeeAccumulator, FeeStats, TxFee};
    use crate::distribution::DistributionStats;
    use crate::test_util::{p2pk_script, spend, COIN};
    use crate::weight::TxFootprint;
    use bitcoin::{hashes::Hash, Amount, OutPoint, TxOut, Txid};

    fn prevout(sat: u64) -> TxOut {
        TxOut {
            value: Amount::from_sat(sat),
            script_pubkey: p2pk_script(),
        }
    }

    #[test]
    fn test_feerate() {
        assert_eq!(feerate(3760, 752), 20);
        assert_eq!(feerate(3320, 661), 20);
        assert_eq!(feerate(49800, 664), 300);
        // weighted average over the three transactions above
        assert_eq!(feerate(3760 + 3320 + 49800, 752 + 661 + 664), 109);
        assert_eq!(feerate(100, 0), 0);
        assert_eq!(feerate(-1, 4), -1);
    }

    #[test]
    fn test_tx_fee() {
        let outpoint = OutPoint::new(Txid::all_zeros(), 0);
        let tx = spend(outpoint, 73, &[], &[10 * COIN, 40 * COIN - 3760]);
        let footprint = TxFootprint::of(&tx);
        let fee = TxFee::new(&tx, &[prevout(50 * COIN)], footprint.weight);
        assert_eq!(
            fee,
            TxFee {
                fee: 3760,
                feerate: 20
            }
        );
    }

    #[test]
    fn test_negative_fee_is_not_clamped() {
        let outpoint = OutPoint::new(Txid::all_zeros(), 0);
        let tx = spend(outpoint, 73, &[], &[600, 500]);
        let fee = TxFee::new(&tx, &[prevout(1_000)], 752);
        assert_eq!(fee.fee, -100);
        assert_eq!(fee.feerate, -1);
    }

    #[test]
    fn test_accumulator() {
        let outpoint = OutPoint::new(Txid::all_zeros(), 0);
        let txs = [
            (spend(outpoint, 23, &[71, 33], &[COIN / 2, COIN / 2 - 3320]), COIN),
            (spend(outpoint, 23, &[74, 33], &[COIN / 2, COIN / 2 - 49800]), COIN),
            (spend(outpoint, 73, &[], &[COIN, COIN - 3760]), 2 * COIN),
        ];

        let mut acc = FeeAccumulator::with_capacity(txs.len());
        for (tx, value_in) in txs.iter() {
            let footprint = TxFootprint::of(tx);
            let fee = TxFee::new(tx, &[prevout(*value_in)], footprint.weight);
            acc.add(&fee, &footprint);
        }
        let stats = acc.finish();
        assert_eq!(stats.total_fee, 56880);
        assert_eq!(
            stats.fee,
            DistributionStats {
                min: 3320,
                max: 49800,
                median: 3760,
                avg: 18960
            }
        );
        assert_eq!(stats.feerate.min, 20);
        assert_eq!(stats.feerate.max, 300);
        assert_eq!(stats.feerate.median, 20);
        assert_eq!(stats.feerate.avg, 109);
    }

    #[test]
    fn test_empty_accumulator() {
        assert_eq!(FeeAccumulator::default().finish(), FeeStats::default());
    }
}
