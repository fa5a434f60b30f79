// Transaction model, validation and signed-entry handling (§3, §4.3, §4.4).
//
// Ordered structural validation runs before any stateful check, mirroring
// `Transaction.is_valid`/`Transaction.get_deltas` from the reference
// transaction model this is ported from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::assets::Asset;
use crate::crypto::ed25519::{self, PublicKey, SecretKey, Signature};
use crate::crypto::hash::hash_sha512;
use crate::crypto::keys::decode_address_string;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxInput {
    pub address: String,
    #[serde(rename = "type")]
    pub asset_ticker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub asset_ticker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub input: TxInput,
    pub outputs: Vec<TxOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TxError {
    #[error("invalid address")]
    InvalidAddress,
    #[error("invalid asset ticker")]
    InvalidAsset,
    #[error("missing conversion rate for asset")]
    MissingRate,
    #[error("input does not cover outputs")]
    InsufficientInput,
    #[error("output amount required when input amount is omitted")]
    MissingOutputAmount,
}

impl Transaction {
    /// Ordered structural validation, exactly as the reference `is_valid`:
    /// no balances or rates are consulted here.
    pub fn is_valid(&self) -> bool {
        if decode_address_string(&self.input.address).is_err() {
            return false;
        }
        let input_asset = match Asset::from_ticker(&self.input.asset_ticker) {
            Some(a) => a,
            None => return false,
        };
        match self.input.amount {
            Some(amount) if amount < 0 => return false,
            None if self.outputs.iter().any(|o| o.amount.is_none()) => return false,
            _ => {}
        }

        for output in &self.outputs {
            if decode_address_string(&output.address).is_err() {
                return false;
            }
            if let Some(ticker) = &output.asset_ticker {
                let output_asset = match Asset::from_ticker(ticker) {
                    Some(a) => a,
                    None => return false,
                };
                if output_asset != input_asset && output.address != self.input.address {
                    return false;
                }
            }
            if let Some(amount) = output.amount
                && amount < 0
            {
                return false;
            }
        }
        true
    }

    /// Computes the per-address, per-asset balance deltas this transaction
    /// produces when executed against `rates`. Mirrors `Transaction.get_deltas`.
    pub fn deltas(
        &self,
        rates: &BTreeMap<Asset, f64>,
    ) -> Result<BTreeMap<[u8; 32], BTreeMap<Asset, i64>>, TxError> {
        let mut deltas: BTreeMap<[u8; 32], BTreeMap<Asset, i64>> = BTreeMap::new();

        let input_address =
            decode_address_string(&self.input.address).map_err(|_| TxError::InvalidAddress)?;
        let input_asset =
            Asset::from_ticker(&self.input.asset_ticker).ok_or(TxError::InvalidAsset)?;

        let total_debit = match self.input.amount {
            Some(input_amount) => {
                let mut remaining = input_amount;

                for output in &self.outputs {
                    let output_address = decode_address_string(&output.address)
                        .map_err(|_| TxError::InvalidAddress)?;
                    let output_asset = match &output.asset_ticker {
                        Some(ticker) => Asset::from_ticker(ticker).ok_or(TxError::InvalidAsset)?,
                        None => input_asset,
                    };

                    let delta = if output_asset == input_asset {
                        let d = output.amount.unwrap_or(remaining);
                        remaining -= d;
                        d
                    } else if output.amount.is_none() {
                        let in_rate = *rates.get(&input_asset).ok_or(TxError::MissingRate)?;
                        let out_rate = *rates.get(&output_asset).ok_or(TxError::MissingRate)?;
                        let d = (remaining as f64 * in_rate / out_rate).trunc() as i64;
                        remaining = 0;
                        d
                    } else {
                        let d = output.amount.unwrap();
                        let in_rate = *rates.get(&input_asset).ok_or(TxError::MissingRate)?;
                        let out_rate = *rates.get(&output_asset).ok_or(TxError::MissingRate)?;
                        remaining -= (d as f64 * out_rate / in_rate).trunc() as i64;
                        d
                    };

                    *deltas
                        .entry(output_address)
                        .or_default()
                        .entry(output_asset)
                        .or_insert(0) += delta;
                }

                if remaining < 0 {
                    return Err(TxError::InsufficientInput);
                }
                input_amount - remaining
            }
            None => {
                let mut total_debit = 0i64;
                for output in &self.outputs {
                    let output_address = decode_address_string(&output.address)
                        .map_err(|_| TxError::InvalidAddress)?;
                    let output_asset = match &output.asset_ticker {
                        Some(ticker) => Asset::from_ticker(ticker).ok_or(TxError::InvalidAsset)?,
                        None => input_asset,
                    };
                    let amount = output.amount.ok_or(TxError::MissingOutputAmount)?;

                    let debit = if output_asset == input_asset {
                        amount
                    } else {
                        let in_rate = *rates.get(&input_asset).ok_or(TxError::MissingRate)?;
                        let out_rate = *rates.get(&output_asset).ok_or(TxError::MissingRate)?;
                        (amount as f64 * out_rate / in_rate).trunc() as i64
                    };
                    total_debit += debit;

                    *deltas
                        .entry(output_address)
                        .or_default()
                        .entry(output_asset)
                        .or_insert(0) += amount;
                }
                total_debit
            }
        };

        *deltas
            .entry(input_address)
            .or_default()
            .entry(input_asset)
            .or_insert(0) -= total_debit;

        Ok(deltas)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ContentPayload<'a> {
    transactions: &'a [Transaction],
}

#[derive(Debug, Clone, Deserialize)]
struct ContentPayloadOwned {
    transactions: Vec<Transaction>,
}

pub struct TransactionEntry {
    pub timestamp: String,
    pub transactions: Vec<Transaction>,
}

impl TransactionEntry {
    pub fn new(timestamp: impl Into<String>) -> Self {
        TransactionEntry {
            timestamp: timestamp.into(),
            transactions: Vec::new(),
        }
    }

    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    fn content(&self) -> Vec<u8> {
        let payload = ContentPayload {
            transactions: &self.transactions,
        };
        serde_json::to_vec(&payload).expect("transaction entry content is always serializable")
    }

    /// Builds external_ids = [timestamp, rcd_0, sig_0, rcd_1, sig_1, ...] and
    /// the entry content, signing with every key in `signers`. Mirrors
    /// `TransactionEntry.sign`.
    pub fn sign(&self, chain_id_hex: &str, signers: &[SecretKey]) -> (Vec<Vec<u8>>, Vec<u8>) {
        let content = self.content();
        let mut external_ids = vec![self.timestamp.as_bytes().to_vec()];

        for (i, sk) in signers.iter().enumerate() {
            let pk = ed25519::public_key_of(sk);
            let rcd = ed25519::rcd_bytes(&pk);
            external_ids.push(rcd.to_vec());

            let digest = signing_digest(i, self.timestamp.as_bytes(), chain_id_hex, &content);
            let sig = ed25519::sign(&digest, sk);
            external_ids.push(sig.0.to_vec());
        }

        (external_ids, content)
    }

    /// Parses and fully verifies a transaction-entry from raw chain data.
    /// Any structural or signature failure rejects the whole entry (`None`).
    /// Mirrors `TransactionEntry.from_entry`.
    pub fn from_entry(
        external_ids: &[Vec<u8>],
        content: &[u8],
        chain_id_hex: &str,
    ) -> Option<TransactionEntry> {
        if external_ids.len() < 3 || external_ids.len() % 2 != 1 {
            return None;
        }
        let timestamp = String::from_utf8(external_ids[0].clone()).ok()?;

        let pairs = &external_ids[1..];
        let mut signers: Vec<(PublicKey, Signature)> = Vec::new();
        let mut observed_addresses: Vec<[u8; 32]> = Vec::new();

        for chunk in pairs.chunks(2) {
            let [rcd, sig] = chunk else { return None };
            if rcd.len() != 33 || sig.len() != 64 {
                return None;
            }
            if rcd[0] != ed25519::RCD_TYPE_1 {
                return None;
            }
            let mut pk_bytes = [0u8; 32];
            pk_bytes.copy_from_slice(&rcd[1..]);
            let pk = PublicKey(pk_bytes);

            let mut sig_bytes = [0u8; 64];
            sig_bytes.copy_from_slice(sig);
            let signature = Signature(sig_bytes);

            let address = ed25519::address_from_rcd(rcd);
            observed_addresses.push(address);
            signers.push((pk, signature));
        }

        let payload: ContentPayloadOwned = serde_json::from_slice(content).ok()?;

        let mut entry = TransactionEntry {
            timestamp: timestamp.clone(),
            transactions: Vec::new(),
        };
        for tx in payload.transactions {
            if !tx.is_valid() {
                return None;
            }
            let input_addr = decode_address_string(&tx.input.address).ok()?;
            if !observed_addresses.contains(&input_addr) {
                return None;
            }
            entry.add_transaction(tx);
        }

        for (i, (pk, sig)) in signers.iter().enumerate() {
            let digest = signing_digest(i, timestamp.as_bytes(), chain_id_hex, content);
            ed25519::verify(pk, sig, &digest).ok()?;
        }

        Some(entry)
    }

    /// Aggregated deltas across every transaction in this entry.
    pub fn deltas(
        &self,
        rates: &BTreeMap<Asset, f64>,
    ) -> Result<BTreeMap<[u8; 32], BTreeMap<Asset, i64>>, TxError> {
        let mut total: BTreeMap<[u8; 32], BTreeMap<Asset, i64>> = BTreeMap::new();
        for tx in &self.transactions {
            for (addr, asset_deltas) in tx.deltas(rates)? {
                let entry = total.entry(addr).or_default();
                for (asset, delta) in asset_deltas {
                    *entry.entry(asset).or_insert(0) += delta;
                }
            }
        }
        Ok(total)
    }
}

fn signing_digest(index: usize, timestamp: &[u8], chain_id_hex: &str, content: &[u8]) -> [u8; 64] {
    let mut message = Vec::new();
    message.extend_from_slice(index.to_string().as_bytes());
    message.extend_from_slice(timestamp);
    message.extend_from_slice(chain_id_hex.as_bytes());
    message.extend_from_slice(content);
    hash_sha512(&message)
}
