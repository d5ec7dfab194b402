use bitcoin::{OutPoint, Transaction, TxOut};
use std::{error, fmt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrevoutError {
    /// The backing store doesn't know the output, e.g. because it only
    /// tracks unspent outputs or the data was pruned.
    Unresolvable(OutPoint),
    Backend(String),
}

impl fmt::Display for PrevoutError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrevoutError::Unresolvable(outpoint) => {
                write!(f, "Unable to resolve spent output {}", outpoint)
            }
            PrevoutError::Backend(e) => write!(f, "Prevout backend error: {}", e),
        }
    }
}

impl error::Error for PrevoutError {}

/// Looks up the outputs spent by transaction inputs.
///
/// Implementations decide where the outputs come from: a full transaction
/// index can resolve any output ever created, while an unspent-output set
/// only knows outputs that are still unspent at its tip.
pub trait PrevoutResolver: Sync {
    fn prevout(&self, outpoint: &OutPoint) -> Result<TxOut, PrevoutError>;
}

/// Resolves the outputs spent by all inputs of a (non-coinbase)
/// transaction, in input order. Fails on the first input that can't be
/// resolved.
pub fn spent_outputs<P>(tx: &Transaction, resolver: &P) -> Result<Vec<TxOut>, PrevoutError>
where
    P: PrevoutResolver + ?Sized,
{
    tx.input
        .iter()
        .map(|input| resolver.prevout(&input.previous_output))
        .collect()
}
