use bitcoin::{Amount, Network};

/// Blocks between two subsidy halvings on the main and test networks.
pub const SUBSIDY_HALVING_INTERVAL: u64 = 210_000;
/// Blocks between two subsidy halvings on regtest.
pub const REGTEST_SUBSIDY_HALVING_INTERVAL: u64 = 150;
/// Subsidy of the blocks before the first halving: 50 BTC.
pub const INITIAL_SUBSIDY: Amount = Amount::from_sat(50 * 100_000_000);

/// Ledger-specific parameters of the block subsidy schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainParams {
    pub initial_subsidy: Amount,
    pub halving_interval: u64,
}

impl ChainParams {
    pub fn for_network(network: Network) -> ChainParams {
        let halving_interval = match network {
            Network::Regtest => REGTEST_SUBSIDY_HALVING_INTERVAL,
            _ => SUBSIDY_HALVING_INTERVAL,
        };
        ChainParams {
            initial_subsidy: INITIAL_SUBSIDY,
            halving_interval,
        }
    }

    /// The newly created coins a block at the given height may claim. The
    /// subsidy is halved (shifted right) every `halving_interval` blocks
    /// and drops to zero once it would be shifted by 64 bits or more.
    pub fn subsidy(&self, height: u64) -> Amount {
        if self.halving_interval == 0 {
            return self.initial_subsidy;
        }
        let halvings = height / self.halving_interval;
        if halvings >= 64 {
            return Amount::ZERO;
        }
        Amount::from_sat(self.initial_subsidy.to_sat() >> halvings)
    }
}
