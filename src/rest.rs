//! Bitcoin Core REST interface backed chain and prevout access.
//!
//! The node must run with `-rest`. Resolving spent outputs through the
//! transaction index additionally requires `-txindex`.

use crate::chain::{BlockLocator, ChainBlock, ChainError, ChainView};
use crate::prevout::{PrevoutError, PrevoutResolver};
use bitcoin::{Amount, Block, BlockHash, OutPoint, ScriptBuf, Transaction, TxOut, Txid};
use log::{debug, error};
use serde::Deserialize;
use std::str::FromStr;
use std::{error, fmt};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug)]
pub enum RestError {
    Http(minreq::Error),
    NotFound(String),
    Status {
        url: String,
        status_code: i32,
        reason: String,
    },
    BitcoinEncode(bitcoin::consensus::encode::Error),
    Parse(String),
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RestError::Http(e) => write!(f, "HTTP Error: {}", e),
            RestError::NotFound(url) => write!(f, "Not found: {}", url),
            RestError::Status {
                url,
                status_code,
                reason,
            } => write!(f, "HTTP status {} ({}) for {}", status_code, reason, url),
            RestError::BitcoinEncode(e) => write!(f, "Bitcoin Encode Error: {:?}", e),
            RestError::Parse(e) => write!(f, "Parse Error: {}", e),
        }
    }
}

impl error::Error for RestError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            RestError::Http(ref e) => Some(e),
            RestError::NotFound(_) => None,
            RestError::Status { .. } => None,
            RestError::BitcoinEncode(ref e) => Some(e),
            RestError::Parse(_) => None,
        }
    }
}

impl From<minreq::Error> for RestError {
    fn from(e: minreq::Error) -> Self {
        RestError::Http(e)
    }
}

impl From<bitcoin::consensus::encode::Error> for RestError {
    fn from(e: bitcoin::consensus::encode::Error) -> Self {
        RestError::BitcoinEncode(e)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChainInfo {
    /// `main`, `test`, `testnet4`, `signet` or `regtest`
    pub chain: String,
    pub blocks: u64,
    pub bestblockhash: BlockHash,
    pub initialblockdownload: bool,
    pub verificationprogress: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HeaderInfo {
    pub hash: BlockHash,
    pub height: u64,
    pub time: u32,
    pub mediantime: u32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct GetUtxosResponse {
    #[serde(rename = "chainHeight")]
    chain_height: u64,
    utxos: Vec<RestUtxo>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct RestUtxo {
    /// in BTC
    value: f64,
    #[serde(rename = "scriptPubKey")]
    script_pubkey: RestScriptPubKey,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct RestScriptPubKey {
    hex: String,
}

impl RestUtxo {
    fn to_txout(&self) -> Result<TxOut, RestError> {
        Ok(TxOut {
            value: Amount::from_btc(self.value).map_err(|e| RestError::Parse(e.to_string()))?,
            script_pubkey: ScriptBuf::from_hex(&self.script_pubkey.hex)
                .map_err(|e| RestError::Parse(e.to_string()))?,
        })
    }
}

fn parse_block_hash(body: &str) -> Result<BlockHash, RestError> {
    BlockHash::from_str(body.trim()).map_err(|e| RestError::Parse(e.to_string()))
}

#[derive(Debug, Clone)]
pub struct RestClient {
    base_url: String,
    timeout: u64,
}

impl RestClient {
    pub fn new(host: &str, port: u16) -> RestClient {
        RestClient {
            base_url: format!("http://{}:{}/rest", host, port),
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Timeout in seconds for each request.
    pub fn with_timeout(mut self, timeout: u64) -> RestClient {
        self.timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> Result<minreq::Response, RestError> {
        let url = self.url(path);
        debug!("rest: GET {}", url);
        let response = match minreq::get(&url).with_timeout(self.timeout).send() {
            Ok(response) => response,
            Err(e) => {
                error!("Could not GET {}: {}", url, e);
                return Err(RestError::Http(e));
            }
        };
        match response.status_code {
            200 => Ok(response),
            404 => Err(RestError::NotFound(url)),
            status_code => {
                error!(
                    "GET {} failed with HTTP status {} ({})",
                    url, status_code, response.reason_phrase
                );
                Err(RestError::Status {
                    url,
                    status_code,
                    reason: response.reason_phrase.clone(),
                })
            }
        }
    }

    pub fn chain_info(&self) -> Result<ChainInfo, RestError> {
        Ok(self.get("chaininfo.json")?.json::<ChainInfo>()?)
    }

    pub fn block_hash(&self, height: u64) -> Result<BlockHash, RestError> {
        let response = self.get(&format!("blockhashbyheight/{}.hex", height))?;
        parse_block_hash(response.as_str()?)
    }

    pub fn block_header(&self, hash: &BlockHash) -> Result<HeaderInfo, RestError> {
        let path = format!("headers/{}.json?count=1", hash);
        let headers: Vec<HeaderInfo> = self.get(&path)?.json()?;
        headers
            .into_iter()
            .next()
            .ok_or_else(|| RestError::NotFound(self.url(&path)))
    }

    pub fn raw_block(&self, hash: &BlockHash) -> Result<Block, RestError> {
        let response = self.get(&format!("block/{}.bin", hash))?;
        Ok(bitcoin::consensus::deserialize(response.as_bytes())?)
    }

    /// Only finds confirmed transactions if the node runs with `-txindex`.
    pub fn raw_transaction(&self, txid: &Txid) -> Result<Transaction, RestError> {
        let response = self.get(&format!("tx/{}.bin", txid))?;
        Ok(bitcoin::consensus::deserialize(response.as_bytes())?)
    }

    /// The output if it's unspent at the node's current tip.
    pub fn unspent_output(&self, outpoint: &OutPoint) -> Result<Option<TxOut>, RestError> {
        let response: GetUtxosResponse = self
            .get(&format!("getutxos/{}-{}.json", outpoint.txid, outpoint.vout))?
            .json()?;
        debug!(
            "rest: {} is {} at height {}",
            outpoint,
            if response.utxos.is_empty() {
                "spent or unknown"
            } else {
                "unspent"
            },
            response.chain_height
        );
        response.utxos.first().map(RestUtxo::to_txout).transpose()
    }
}

fn chain_error(e: RestError, locator: &BlockLocator) -> ChainError {
    match e {
        RestError::NotFound(_) => ChainError::NotFound(*locator),
        e => ChainError::Backend(e.to_string()),
    }
}

fn prevout_error(e: RestError, outpoint: &OutPoint) -> PrevoutError {
    match e {
        RestError::NotFound(_) => PrevoutError::Unresolvable(*outpoint),
        e => PrevoutError::Backend(e.to_string()),
    }
}

impl ChainView for RestClient {
    fn tip_height(&self) -> Result<u64, ChainError> {
        self.chain_info()
            .map(|info| info.blocks)
            .map_err(|e| ChainError::Backend(e.to_string()))
    }

    fn block(&self, locator: &BlockLocator) -> Result<ChainBlock, ChainError> {
        let hash = match locator {
            BlockLocator::Height(height) => {
                let height = u64::try_from(*height).map_err(|_| ChainError::NotFound(*locator))?;
                self.block_hash(height)
                    .map_err(|e| chain_error(e, locator))?
            }
            BlockLocator::Hash(hash) => *hash,
        };
        let header = self
            .block_header(&hash)
            .map_err(|e| chain_error(e, locator))?;
        let block = self.raw_block(&hash).map_err(|e| chain_error(e, locator))?;
        Ok(ChainBlock {
            height: header.height,
            median_time: header.mediantime,
            block,
        })
    }
}

/// Resolves spent outputs by fetching the transaction that created them.
/// Works for any block as long as the node maintains a transaction index.
#[derive(Debug, Clone, Copy)]
pub struct RestTxIndex<'a> {
    client: &'a RestClient,
}

impl<'a> RestTxIndex<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        RestTxIndex { client }
    }
}

impl PrevoutResolver for RestTxIndex<'_> {
    fn prevout(&self, outpoint: &OutPoint) -> Result<TxOut, PrevoutError> {
        let tx = self
            .client
            .raw_transaction(&outpoint.txid)
            .map_err(|e| prevout_error(e, outpoint))?;
        tx.output
            .get(outpoint.vout as usize)
            .cloned()
            .ok_or(PrevoutError::Unresolvable(*outpoint))
    }
}

/// Resolves spent outputs through the node's UTXO set. Only outputs that
/// are still unspent at the node's tip can be found.
#[derive(Debug, Clone, Copy)]
pub struct RestUtxoSet<'a> {
    client: &'a RestClient,
}

impl<'a> RestUtxoSet<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        RestUtxoSet { client }
    }
}

impl PrevoutResolver for RestUtxoSet<'_> {
    fn prevout(&self, outpoint: &OutPoint) -> Result<TxOut, PrevoutError> {
        self.client
            .unspent_output(outpoint)
            .map_err(|e| prevout_error(e, outpoint))?
            .ok_or(PrevoutError::Unresolvable(*outpoint))
    }
}
