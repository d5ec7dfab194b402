use crate::stats::StatsError;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::{fmt, str::FromStr};

/// The statistics that can be requested for a block. The variant order is
/// the canonical output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stat {
    Height,
    Time,
    MedianTime,
    Txs,
    SwTxs,
    Ins,
    Outs,
    Subsidy,
    TotalFee,
    UtxoIncrease,
    UtxoSizeInc,
    TotalSize,
    TotalWeight,
    SwTotalSize,
    SwTotalWeight,
    TotalOut,
    MinFee,
    MaxFee,
    MedianFee,
    AvgFee,
    MinFeerate,
    MaxFeerate,
    MedianFeerate,
    AvgFeerate,
    MinTxSize,
    MaxTxSize,
    MedianTxSize,
    AvgTxSize,
}

impl Stat {
    pub const ALL: [Stat; 28] = [
        Stat::Height,
        Stat::Time,
        Stat::MedianTime,
        Stat::Txs,
        Stat::SwTxs,
        Stat::Ins,
        Stat::Outs,
        Stat::Subsidy,
        Stat::TotalFee,
        Stat::UtxoIncrease,
        Stat::UtxoSizeInc,
        Stat::TotalSize,
        Stat::TotalWeight,
        Stat::SwTotalSize,
        Stat::SwTotalWeight,
        Stat::TotalOut,
        Stat::MinFee,
        Stat::MaxFee,
        Stat::MedianFee,
        Stat::AvgFee,
        Stat::MinFeerate,
        Stat::MaxFeerate,
        Stat::MedianFeerate,
        Stat::AvgFeerate,
        Stat::MinTxSize,
        Stat::MaxTxSize,
        Stat::MedianTxSize,
        Stat::AvgTxSize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stat::Height => "height",
            Stat::Time => "time",
            Stat::MedianTime => "mediantime",
            Stat::Txs => "txs",
            Stat::SwTxs => "swtxs",
            Stat::Ins => "ins",
            Stat::Outs => "outs",
            Stat::Subsidy => "subsidy",
            Stat::TotalFee => "totalfee",
            Stat::UtxoIncrease => "utxo_increase",
            Stat::UtxoSizeInc => "utxo_size_inc",
            Stat::TotalSize => "total_size",
            Stat::TotalWeight => "total_weight",
            Stat::SwTotalSize => "swtotal_size",
            Stat::SwTotalWeight => "swtotal_weight",
            Stat::TotalOut => "total_out",
            Stat::MinFee => "minfee",
            Stat::MaxFee => "maxfee",
            Stat::MedianFee => "medianfee",
            Stat::AvgFee => "avgfee",
            Stat::MinFeerate => "minfeerate",
            Stat::MaxFeerate => "maxfeerate",
            Stat::MedianFeerate => "medianfeerate",
            Stat::AvgFeerate => "avgfeerate",
            Stat::MinTxSize => "mintxsize",
            Stat::MaxTxSize => "maxtxsize",
            Stat::MedianTxSize => "mediantxsize",
            Stat::AvgTxSize => "avgtxsize",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stat {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stat::ALL
            .iter()
            .find(|stat| stat.as_str() == s)
            .copied()
            .ok_or_else(|| StatsError::UnknownStat(s.to_string()))
    }
}

impl Serialize for Stat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Parses the requested statistic names. No names (or no list at all)
/// selects every statistic. Names are checked in the order given and the
/// first one that isn't a known statistic is reported.
pub fn select(requested: Option<&[&str]>) -> Result<BTreeSet<Stat>, StatsError> {
    match requested {
        None | Some([]) => Ok(Stat::ALL.into_iter().collect()),
        Some(names) => names.iter().map(|name| name.parse::<Stat>()).collect(),
    }
}
