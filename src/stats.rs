use crate::chain::{BlockLocator, ChainBlock, ChainError, ChainView};
use crate::distribution::DistributionStats;
use crate::fees::{output_value, FeeAccumulator, TxFee};
use crate::prevout::{spent_outputs, PrevoutError, PrevoutResolver};
use crate::selector::{self, Stat};
use crate::subsidy::ChainParams;
use crate::utxo::UtxoDelta;
use crate::weight::{SizeTotals, TxFootprint};
use bitcoin::{OutPoint, Transaction, TxOut};
use log::debug;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;
use std::collections::BTreeMap;
use std::{error, fmt};

// JSON-RPC error codes a node reports for the corresponding failures.
const RPC_MISC_ERROR: i32 = -1;
const RPC_INVALID_ADDRESS_OR_KEY: i32 = -5;
const RPC_INVALID_PARAMETER: i32 = -8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// The requested height is negative or above the current tip.
    HeightOutOfRange { height: i64, tip: u64 },
    UnknownStat(String),
    PrevoutUnresolvable(OutPoint),
    LocatorNotFound(BlockLocator),
    Backend(String),
}

impl StatsError {
    /// Stable error code, matching the JSON-RPC codes of the node.
    pub fn code(&self) -> i32 {
        match self {
            StatsError::HeightOutOfRange { .. } => RPC_INVALID_PARAMETER,
            StatsError::UnknownStat(_) => RPC_INVALID_PARAMETER,
            StatsError::PrevoutUnresolvable(_) => RPC_INVALID_ADDRESS_OR_KEY,
            StatsError::LocatorNotFound(_) => RPC_INVALID_ADDRESS_OR_KEY,
            StatsError::Backend(_) => RPC_MISC_ERROR,
        }
    }
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StatsError::HeightOutOfRange { height, .. } if *height < 0 => {
                write!(f, "Target block height {} is negative", height)
            }
            StatsError::HeightOutOfRange { height, tip } => {
                write!(f, "Target block height {} after current tip {}", height, tip)
            }
            StatsError::UnknownStat(name) => write!(f, "Invalid requested statistic {}", name),
            StatsError::PrevoutUnresolvable(outpoint) => {
                write!(f, "Unable to resolve spent output {}", outpoint)
            }
            StatsError::LocatorNotFound(locator) => write!(f, "Block not found: {}", locator),
            StatsError::Backend(e) => write!(f, "Ledger backend error: {}", e),
        }
    }
}

impl error::Error for StatsError {}

impl From<PrevoutError> for StatsError {
    fn from(e: PrevoutError) -> Self {
        match e {
            PrevoutError::Unresolvable(outpoint) => StatsError::PrevoutUnresolvable(outpoint),
            PrevoutError::Backend(e) => StatsError::Backend(e),
        }
    }
}

impl From<ChainError> for StatsError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::NotFound(locator) => StatsError::LocatorNotFound(locator),
            ChainError::Backend(e) => StatsError::Backend(e),
        }
    }
}

/// All statistics of a block. The field names are the statistic names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BlockStats {
    pub height: i64,
    /// block header timestamp
    pub time: i64,
    /// median-time-past of the block
    pub mediantime: i64,

    /// number of transactions, including the coinbase
    pub txs: i64,
    /// number of transactions with witness data
    pub swtxs: i64,
    /// number of inputs, excluding the coinbase input
    pub ins: i64,
    /// number of outputs, including the coinbase outputs
    pub outs: i64,

    pub subsidy: i64,
    pub totalfee: i64,

    /// net number of new UTXO set entries (may be negative)
    pub utxo_increase: i64,
    /// estimated change of the UTXO set size in bytes (may be negative)
    pub utxo_size_inc: i64,

    pub total_size: i64,
    pub total_weight: i64,
    pub swtotal_size: i64,
    pub swtotal_weight: i64,

    /// sum of all output values, including the coinbase outputs
    pub total_out: i64,

    pub minfee: i64,
    pub maxfee: i64,
    pub medianfee: i64,
    pub avgfee: i64,

    /// feerates are in sat/vbyte
    pub minfeerate: i64,
    pub maxfeerate: i64,
    pub medianfeerate: i64,
    /// total fee over total weight of the non-coinbase transactions
    pub avgfeerate: i64,

    pub mintxsize: i64,
    pub maxtxsize: i64,
    pub mediantxsize: i64,
    pub avgtxsize: i64,
}

/// What a single non-coinbase transaction contributes to the block stats.
struct SpendingTx {
    footprint: TxFootprint,
    fee: TxFee,
    spent: Vec<TxOut>,
}

impl SpendingTx {
    fn resolve<P>(tx: &Transaction, prevouts: &P) -> Result<SpendingTx, PrevoutError>
    where
        P: PrevoutResolver + ?Sized,
    {
        let spent = spent_outputs(tx, prevouts)?;
        let footprint = TxFootprint::of(tx);
        let fee = TxFee::new(tx, &spent, footprint.weight);
        Ok(SpendingTx {
            footprint,
            fee,
            spent,
        })
    }
}

impl BlockStats {
    pub fn from_block<P>(
        chain_block: &ChainBlock,
        prevouts: &P,
        params: &ChainParams,
    ) -> Result<BlockStats, StatsError>
    where
        P: PrevoutResolver + ?Sized,
    {
        let txdata = &chain_block.block.txdata;
        let non_coinbase = txdata.get(1..).unwrap_or_default();

        // The transactions are independent of each other. Resolving their
        // prevouts is the expensive part, so do it in parallel. The results
        // stay in block order.
        let spending_txs: Vec<SpendingTx> = non_coinbase
            .par_iter()
            .map(|tx| SpendingTx::resolve(tx, prevouts))
            .collect::<Result<Vec<_>, _>>()?;

        let mut sizes = SizeTotals::default();
        let mut utxo_delta = UtxoDelta::default();
        let mut fees = FeeAccumulator::with_capacity(spending_txs.len());
        let mut total_out: i64 = 0;

        if let Some(coinbase) = txdata.first() {
            sizes.add(&TxFootprint::of(coinbase));
            utxo_delta.create(&coinbase.output);
            total_out += output_value(coinbase);
        }
        for (tx, spending) in non_coinbase.iter().zip(spending_txs.iter()) {
            sizes.add(&spending.footprint);
            utxo_delta.spend(&spending.spent);
            utxo_delta.create(&tx.output);
            fees.add(&spending.fee, &spending.footprint);
            total_out += output_value(tx);
        }

        let fee_stats = fees.finish();
        let DistributionStats {
            min: minfee,
            max: maxfee,
            median: medianfee,
            avg: avgfee,
        } = fee_stats.fee;
        let DistributionStats {
            min: minfeerate,
            max: maxfeerate,
            median: medianfeerate,
            avg: avgfeerate,
        } = fee_stats.feerate;
        let DistributionStats {
            min: mintxsize,
            max: maxtxsize,
            median: mediantxsize,
            avg: avgtxsize,
        } = fee_stats.size;

        Ok(BlockStats {
            height: chain_block.height as i64,
            time: chain_block.time() as i64,
            mediantime: chain_block.median_time as i64,
            txs: txdata.len() as i64,
            swtxs: sizes.swtxs,
            ins: utxo_delta.ins,
            outs: utxo_delta.outs,
            subsidy: params.subsidy(chain_block.height).to_sat() as i64,
            totalfee: fee_stats.total_fee,
            utxo_increase: utxo_delta.increase(),
            utxo_size_inc: utxo_delta.size_inc,
            total_size: sizes.total_size,
            total_weight: sizes.total_weight,
            swtotal_size: sizes.swtotal_size,
            swtotal_weight: sizes.swtotal_weight,
            total_out,
            minfee,
            maxfee,
            medianfee,
            avgfee,
            minfeerate,
            maxfeerate,
            medianfeerate,
            avgfeerate,
            mintxsize,
            maxtxsize,
            mediantxsize,
            avgtxsize,
        })
    }

    pub fn get(&self, stat: Stat) -> i64 {
        match stat {
            Stat::Height => self.height,
            Stat::Time => self.time,
            Stat::MedianTime => self.mediantime,
            Stat::Txs => self.txs,
            Stat::SwTxs => self.swtxs,
            Stat::Ins => self.ins,
            Stat::Outs => self.outs,
            Stat::Subsidy => self.subsidy,
            Stat::TotalFee => self.totalfee,
            Stat::UtxoIncrease => self.utxo_increase,
            Stat::UtxoSizeInc => self.utxo_size_inc,
            Stat::TotalSize => self.total_size,
            Stat::TotalWeight => self.total_weight,
            Stat::SwTotalSize => self.swtotal_size,
            Stat::SwTotalWeight => self.swtotal_weight,
            Stat::TotalOut => self.total_out,
            Stat::MinFee => self.minfee,
            Stat::MaxFee => self.maxfee,
            Stat::MedianFee => self.medianfee,
            Stat::AvgFee => self.avgfee,
            Stat::MinFeerate => self.minfeerate,
            Stat::MaxFeerate => self.maxfeerate,
            Stat::MedianFeerate => self.medianfeerate,
            Stat::AvgFeerate => self.avgfeerate,
            Stat::MinTxSize => self.mintxsize,
            Stat::MaxTxSize => self.maxtxsize,
            Stat::MedianTxSize => self.mediantxsize,
            Stat::AvgTxSize => self.avgtxsize,
        }
    }
}

/// The requested statistics of a block, keyed by statistic. Iterates and
/// serializes in the canonical statistic order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatsReport(BTreeMap<Stat, i64>);

impl StatsReport {
    pub fn new(stats: &BlockStats, selected: impl IntoIterator<Item = Stat>) -> StatsReport {
        StatsReport(selected.into_iter().map(|s| (s, stats.get(s))).collect())
    }

    pub fn get(&self, stat: Stat) -> Option<i64> {
        self.0.get(&stat).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<i64> {
        name.parse::<Stat>().ok().and_then(|stat| self.get(stat))
    }

    pub fn stats(&self) -> impl Iterator<Item = Stat> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stat, i64)> + '_ {
        self.0.iter().map(|(stat, value)| (*stat, *value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Calculates the requested statistics (or all if none are requested) for
/// the block the locator points to.
///
/// The call is all-or-nothing: an invalid height, an unknown block or
/// statistic, or a spent output the resolver can't find fail the whole call.
pub fn get_block_stats<C, P>(
    chain: &C,
    prevouts: &P,
    params: &ChainParams,
    locator: &BlockLocator,
    requested: Option<&[&str]>,
) -> Result<StatsReport, StatsError>
where
    C: ChainView + ?Sized,
    P: PrevoutResolver + ?Sized,
{
    if let BlockLocator::Height(height) = locator {
        let tip = chain.tip_height()?;
        if *height < 0 || *height as u64 > tip {
            return Err(StatsError::HeightOutOfRange {
                height: *height,
                tip,
            });
        }
    }

    let chain_block = chain.block(locator)?;
    let selected = selector::select(requested)?;

    debug!(
        "calculating {} stats for block {} at height {} ({} transactions)",
        selected.len(),
        chain_block.hash(),
        chain_block.height,
        chain_block.block.txdata.len()
    );
    let stats = BlockStats::from_block(&chain_block, prevouts, params)?;
    Ok(StatsReport::new(&stats, selected))
}
