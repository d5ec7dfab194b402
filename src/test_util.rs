//! Builders for regtest-like blocks and transactions used across the tests.
//!
//! Scripts are filled with dummy bytes but have the sizes of the real
//! script types they stand in for, so sizes, weights and the UTXO size
//! estimates come out like they do on a real regtest chain.

use crate::ledger::{LedgerConfig, MemoryLedger};
use bitcoin::{
    absolute::LockTime, block, hashes::Hash, transaction, Amount, Block, BlockHash,
    CompactTarget, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxMerkleNode, TxOut, Txid,
    Witness,
};

pub const COIN: u64 = 100_000_000;
pub const REGTEST_SUBSIDY: u64 = 50 * COIN;
pub const GENESIS_TIME: u32 = 1296688602;

/// 35 byte pay-to-pubkey script (push of a compressed key and OP_CHECKSIG)
pub fn p2pk_script() -> ScriptBuf {
    let mut bytes = vec![0x21, 0x02];
    bytes.extend([0x11; 32]);
    bytes.push(0xac);
    ScriptBuf::from_bytes(bytes)
}

/// 23 byte pay-to-script-hash script
pub fn p2sh_script() -> ScriptBuf {
    let mut bytes = vec![0xa9, 0x14];
    bytes.extend([0x22; 20]);
    bytes.push(0x87);
    ScriptBuf::from_bytes(bytes)
}

/// 38 byte OP_RETURN witness commitment script
pub fn witness_commitment_script() -> ScriptBuf {
    let mut bytes = vec![0x6a, 0x24, 0xaa, 0x21, 0xa9, 0xed];
    bytes.extend([0x33; 32]);
    ScriptBuf::from_bytes(bytes)
}

/// A coinbase paying `value` to a P2PK output followed by a zero-value
/// witness commitment. The 4 byte scriptSig encodes the height, which keeps
/// the txids unique.
pub fn coinbase(height: u64, value: u64) -> Transaction {
    let height_bytes = (height as u32).to_le_bytes();
    Transaction {
        version: transaction::Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::null(),
            script_sig: ScriptBuf::from_bytes(vec![
                0x03,
                height_bytes[0],
                height_bytes[1],
                height_bytes[2],
            ]),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![
            TxOut {
                value: Amount::from_sat(value),
                script_pubkey: p2pk_script(),
            },
            TxOut {
                value: Amount::ZERO,
                script_pubkey: witness_commitment_script(),
            },
        ],
    }
}

/// A transaction spending `prevout` into P2SH outputs of the given values.
/// The scriptSig is `script_sig_len` dummy bytes and the witness has one
/// dummy item per entry in `witness_items` with the given length.
pub fn spend(
    prevout: OutPoint,
    script_sig_len: usize,
    witness_items: &[usize],
    outputs: &[u64],
) -> Transaction {
    let items: Vec<Vec<u8>> = witness_items.iter().map(|len| vec![0x44; *len]).collect();
    Transaction {
        version: transaction::Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: prevout,
            script_sig: ScriptBuf::from_bytes(vec![0x55; script_sig_len]),
            sequence: Sequence::MAX,
            witness: Witness::from_slice(&items),
        }],
        output: outputs
            .iter()
            .map(|value| TxOut {
                value: Amount::from_sat(*value),
                script_pubkey: p2sh_script(),
            })
            .collect(),
    }
}

pub fn build_block(prev_blockhash: BlockHash, time: u32, txdata: Vec<Transaction>) -> Block {
    let mut block = Block {
        header: block::Header {
            version: block::Version::ONE,
            prev_blockhash,
            merkle_root: TxMerkleNode::all_zeros(),
            time,
            bits: CompactTarget::from_consensus(0x207fffff),
            nonce: 0,
        },
        txdata,
    };
    if let Some(merkle_root) = block.compute_merkle_root() {
        block.header.merkle_root = merkle_root;
    }
    block
}

/// Appends a block with the given transactions (after a coinbase paying the
/// regtest subsidy plus `fees`) to the ledger.
pub fn mine(ledger: &mut MemoryLedger, fees: u64, txs: Vec<Transaction>) -> Block {
    let height = ledger.tip().map(|tip| tip.height + 1).unwrap_or(0);
    let prev = ledger
        .tip()
        .map(|tip| tip.hash())
        .unwrap_or_else(BlockHash::all_zeros);
    let mut txdata = vec![coinbase(height, REGTEST_SUBSIDY + fees)];
    txdata.extend(txs);
    let block = build_block(prev, GENESIS_TIME + height as u32 * 600, txdata);
    ledger
        .push_block(block.clone())
        .expect("test blocks should connect");
    block
}

/// The regtest chain the block stats tests run against:
/// - heights 0 to 101 only contain a coinbase
/// - height 102 spends the coinbase of block 1 (fee 3760)
/// - height 103 has three spends with fees of 3320, 49800 and 3760; the
///   first two spend the outputs created at height 102 and have witnesses
pub fn regtest_chain(config: LedgerConfig) -> MemoryLedger {
    let mut ledger = MemoryLedger::new(config);
    let mut coinbase_txids: Vec<Txid> = Vec::new();
    for _ in 0..=101 {
        let block = mine(&mut ledger, 0, vec![]);
        coinbase_txids.push(block.txdata[0].compute_txid());
    }

    let spend_102 = spend(
        OutPoint::new(coinbase_txids[1], 0),
        73,
        &[],
        &[10 * COIN, 40 * COIN - 3760],
    );
    let spend_102_txid = spend_102.compute_txid();
    mine(&mut ledger, 3760, vec![spend_102]);

    let segwit_low_fee = spend(
        OutPoint::new(spend_102_txid, 0),
        23,
        &[71, 33],
        &[4 * COIN, 6 * COIN - 3320],
    );
    let segwit_high_fee = spend(
        OutPoint::new(spend_102_txid, 1),
        23,
        &[74, 33],
        &[COIN, 39 * COIN - 3760 - 49800],
    );
    let legacy = spend(
        OutPoint::new(coinbase_txids[2], 0),
        73,
        &[],
        &[10 * COIN, 40 * COIN - 3760],
    );
    mine(
        &mut ledger,
        3320 + 49800 + 3760,
        vec![segwit_low_fee, segwit_high_fee, legacy],
    );

    ledger
}
