use bitcoin::{Block, BlockHash};
use std::{error, fmt, str::FromStr};

/// Identifies a block either by its height in the active chain or by its
/// hash. Heights are signed so that a negative request can be reported back
/// as given.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockLocator {
    Height(i64),
    Hash(BlockHash),
}

impl fmt::Display for BlockLocator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BlockLocator::Height(height) => write!(f, "height {}", height),
            BlockLocator::Hash(hash) => write!(f, "hash {}", hash),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLocatorError(String);

impl fmt::Display for ParseLocatorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "'{}' is neither a block height nor a 64 character block hash",
            self.0
        )
    }
}

impl error::Error for ParseLocatorError {}

impl FromStr for BlockLocator {
    type Err = ParseLocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            return BlockHash::from_str(s)
                .map(BlockLocator::Hash)
                .map_err(|_| ParseLocatorError(s.to_string()));
        }
        s.parse::<i64>()
            .map(BlockLocator::Height)
            .map_err(|_| ParseLocatorError(s.to_string()))
    }
}

/// A block of the active chain together with the chain context the stats
/// need but the block itself doesn't carry.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainBlock {
    pub height: u64,
    /// median-time-past of the block (median of the last 11 block timestamps)
    pub median_time: u32,
    pub block: Block,
}

impl ChainBlock {
    pub fn hash(&self) -> BlockHash {
        self.block.block_hash()
    }

    pub fn time(&self) -> u32 {
        self.block.header.time
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    NotFound(BlockLocator),
    Backend(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::NotFound(locator) => write!(f, "Block not found: {}", locator),
            ChainError::Backend(e) => write!(f, "Chain backend error: {}", e),
        }
    }
}

impl error::Error for ChainError {}

/// Read access to the active chain of a ledger store.
pub trait ChainView {
    /// Height of the current chain tip.
    fn tip_height(&self) -> Result<u64, ChainError>;

    /// Returns a snapshot of the block the locator points to.
    fn block(&self, locator: &BlockLocator) -> Result<ChainBlock, ChainError>;
}

#[cfg(test)]
mod tests {
    use super::BlockLocator;
    use bitcoin::BlockHash;
    use std::str::FromStr;

    #[test]
    fn test_parse_locator() {
        assert_eq!(
            BlockLocator::from_str("102").unwrap(),
            BlockLocator::Height(102)
        );
        assert_eq!(
            BlockLocator::from_str("-105").unwrap(),
            BlockLocator::Height(-105)
        );
        assert_eq!(BlockLocator::from_str("0").unwrap(), BlockLocator::Height(0));

        let hash = "0f9188f13cb7b2c71f2a335e3a4fc328bf5beb436012afca590b1a11466e2206";
        assert_eq!(
            BlockLocator::from_str(hash).unwrap(),
            BlockLocator::Hash(BlockHash::from_str(hash).unwrap())
        );

        assert!(BlockLocator::from_str("").is_err());
        assert!(BlockLocator::from_str("tip").is_err());
        assert!(BlockLocator::from_str("0f9188f13cb7").is_err());
    }
}
