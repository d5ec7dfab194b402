pub mod chain;
pub mod distribution;
pub mod fees;
pub mod ledger;
pub mod prevout;
pub mod rest;
pub mod selector;
pub mod stats;
pub mod subsidy;
pub mod utxo;
pub mod weight;

#[cfg(test)]
mod test_util;

pub use chain::{BlockLocator, ChainBlock, ChainView};
pub use prevout::PrevoutResolver;
pub use selector::Stat;
pub use stats::{get_block_stats, BlockStats, StatsError, StatsReport};
pub use subsidy::ChainParams;

use bitcoin::{Amount, Network};
use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use std::{error, fmt};

#[derive(Debug)]
pub enum MainError {
    REST(rest::RestError),
    Stats(stats::StatsError),
    UnknownChain(String),
    Json(serde_json::Error),
}

impl fmt::Display for MainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MainError::REST(e) => write!(f, "REST error: {}", e),
            MainError::Stats(e) => write!(f, "Block stats error ({}): {}", e.code(), e),
            MainError::UnknownChain(chain) => write!(
                f,
                "Unknown chain '{}' reported by the node, please pass --network",
                chain
            ),
            MainError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl error::Error for MainError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            MainError::REST(ref e) => Some(e),
            MainError::Stats(ref e) => Some(e),
            MainError::UnknownChain(_) => None,
            MainError::Json(ref e) => Some(e),
        }
    }
}

impl From<rest::RestError> for MainError {
    fn from(e: rest::RestError) -> Self {
        MainError::REST(e)
    }
}

impl From<stats::StatsError> for MainError {
    fn from(e: stats::StatsError) -> Self {
        MainError::Stats(e)
    }
}

impl From<serde_json::Error> for MainError {
    fn from(e: serde_json::Error) -> Self {
        MainError::Json(e)
    }
}

/// Where the outputs spent by the block's transactions are looked up.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrevoutSource {
    /// The node's transaction index (requires Bitcoin Core to run with -txindex)
    Txindex,
    /// The node's UTXO set (only resolves outputs unspent at the tip)
    Utxoset,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Block height or block hash
    #[arg(allow_negative_numbers = true)]
    pub block: BlockLocator,

    /// Comma separated list of statistics to return. Returns all statistics if not set.
    #[arg(long, value_delimiter = ',')]
    pub stats: Vec<String>,

    /// Host part of the Bitcoin Core REST API endpoint
    #[arg(long, default_value = "localhost")]
    pub rest_host: String,

    /// Port part of the Bitcoin Core REST API endpoint
    #[arg(long, default_value_t = 8332)]
    pub rest_port: u16,

    /// Timeout in seconds for each REST request
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// How spent outputs are resolved
    #[arg(long, value_enum, default_value_t = PrevoutSource::Txindex)]
    pub prevouts: PrevoutSource,

    /// Network the subsidy schedule is taken from. Defaults to the chain the node reports.
    #[arg(long)]
    pub network: Option<Network>,

    /// Override the number of blocks between subsidy halvings
    #[arg(long)]
    pub halving_interval: Option<u64>,

    /// Override the subsidy (in sat) of the blocks before the first halving
    #[arg(long)]
    pub initial_subsidy: Option<u64>,
}

impl Args {
    pub fn chain_params(&self, network: Network) -> ChainParams {
        let preset = ChainParams::for_network(network);
        ChainParams {
            initial_subsidy: self
                .initial_subsidy
                .map(Amount::from_sat)
                .unwrap_or(preset.initial_subsidy),
            halving_interval: self.halving_interval.unwrap_or(preset.halving_interval),
        }
    }
}

/// Calculates the statistics for the requested block from the Bitcoin Core
/// node behind the REST interface.
pub fn block_stats(args: &Args) -> Result<StatsReport, MainError> {
    let client = rest::RestClient::new(&args.rest_host, args.rest_port).with_timeout(args.timeout);
    let chain_info = match client.chain_info() {
        Ok(chain_info) => chain_info,
        Err(e) => {
            error!(
                "Could not load chain information from Bitcoin Core at {}:{}: {}",
                args.rest_host, args.rest_port, e
            );
            return Err(MainError::REST(e));
        }
    };

    if chain_info.initialblockdownload {
        warn!(
            "The Bitcoin Core node is in initial block download (progress: {:.2}%). Blocks above height {} are not yet available.",
            chain_info.verificationprogress * 100.0,
            chain_info.blocks
        );
    }

    let network = match args.network {
        Some(network) => network,
        None => Network::from_core_arg(&chain_info.chain)
            .map_err(|_| MainError::UnknownChain(chain_info.chain.clone()))?,
    };
    let params = args.chain_params(network);
    info!(
        "Calculating stats for block {} on {} (tip at height {}, prevouts from {:?})",
        args.block, network, chain_info.blocks, args.prevouts
    );

    let requested: Vec<&str> = args.stats.iter().map(String::as_str).collect();
    let report = match args.prevouts {
        PrevoutSource::Txindex => get_block_stats(
            &client,
            &rest::RestTxIndex::new(&client),
            &params,
            &args.block,
            Some(requested.as_slice()),
        )?,
        PrevoutSource::Utxoset => get_block_stats(
            &client,
            &rest::RestUtxoSet::new(&client),
            &params,
            &args.block,
            Some(requested.as_slice()),
        )?,
    };
    Ok(report)
}
