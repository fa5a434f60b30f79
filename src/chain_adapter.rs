// External chain-platform adapter (§4.1). Synchronous on purpose: the
// driver's own loop is the only place that needs to suspend, and keeping
// this trait's calls blocking keeps that suspension point obvious instead of
// smearing `.await` across grading/burn/executor code that never needs it.
//
// The transport itself (request/response shapes of the real chain platform)
// is an out-of-scope external collaborator (§1); `HttpChainAdapter` is a
// minimal JSON-RPC stand-in shaped around that boundary.

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ChainAdapterError {
    #[error("chain platform unavailable: {0}")]
    Unavailable(String),
    #[error("block not found past chain tip")]
    BlockNotFound,
}

#[derive(Debug, Clone)]
pub struct ChainEntry {
    pub entry_hash: [u8; 32],
    pub external_ids: Vec<Vec<u8>>,
    pub content: Vec<u8>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default)]
pub struct FactoidIo {
    pub address: [u8; 32],
    pub amount: u64,
}

#[derive(Debug, Clone, Default)]
pub struct EcOutput {
    pub address: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Default)]
pub struct FactoidTransaction {
    pub inputs: Vec<FactoidIo>,
    pub outputs: Vec<FactoidIo>,
    pub ec_outputs: Vec<EcOutput>,
}

#[derive(Debug, Clone, Default)]
pub struct FactoidBlock {
    pub height: u32,
    pub transactions: Vec<FactoidTransaction>,
}

/// Read-only view of the external chain platform the node follows.
pub trait ChainAdapter: Send + Sync {
    fn tip_height(&self) -> Result<u32, ChainAdapterError>;
    fn entries_at_height(
        &self,
        chain_id_hex: &str,
        height: u32,
    ) -> Result<Vec<ChainEntry>, ChainAdapterError>;
    fn factoid_block(&self, height: u32) -> Result<FactoidBlock, ChainAdapterError>;
    fn factoid_balance(&self, address: &str) -> Result<u64, ChainAdapterError>;
}

/// Minimal JSON-RPC HTTP client for the chain platform.
pub struct HttpChainAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpChainAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpChainAdapter {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, ChainAdapterError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .map_err(|e| ChainAdapterError::Unavailable(e.to_string()))?;

        let body: serde_json::Value = response
            .json()
            .map_err(|e| ChainAdapterError::Unavailable(e.to_string()))?;

        if let Some(err) = body.get("error") {
            return Err(ChainAdapterError::Unavailable(err.to_string()));
        }
        let result = body
            .get("result")
            .cloned()
            .ok_or_else(|| ChainAdapterError::Unavailable("missing result field".into()))?;
        serde_json::from_value(result).map_err(|e| ChainAdapterError::Unavailable(e.to_string()))
    }
}

impl ChainAdapter for HttpChainAdapter {
    fn tip_height(&self) -> Result<u32, ChainAdapterError> {
        self.call("tip-height", serde_json::json!([]))
    }

    fn entries_at_height(
        &self,
        chain_id_hex: &str,
        height: u32,
    ) -> Result<Vec<ChainEntry>, ChainAdapterError> {
        #[derive(Deserialize)]
        struct RawEntry {
            entry_hash: String,
            external_ids: Vec<String>,
            content: String,
            timestamp: i64,
        }
        let raw: Vec<RawEntry> =
            self.call("entries-at-height", serde_json::json!([chain_id_hex, height]))?;

        let mut entries = Vec::with_capacity(raw.len());
        for r in raw {
            let entry_hash_bytes = hex::decode(&r.entry_hash)
                .map_err(|e| ChainAdapterError::Unavailable(e.to_string()))?;
            let mut entry_hash = [0u8; 32];
            if entry_hash_bytes.len() != 32 {
                return Err(ChainAdapterError::Unavailable("malformed entry hash".into()));
            }
            entry_hash.copy_from_slice(&entry_hash_bytes);

            let external_ids = r
                .external_ids
                .iter()
                .map(|s| hex::decode(s).map_err(|e| ChainAdapterError::Unavailable(e.to_string())))
                .collect::<Result<Vec<_>, _>>()?;
            let content =
                hex::decode(&r.content).map_err(|e| ChainAdapterError::Unavailable(e.to_string()))?;

            entries.push(ChainEntry {
                entry_hash,
                external_ids,
                content,
                timestamp: r.timestamp,
            });
        }
        Ok(entries)
    }

    fn factoid_block(&self, height: u32) -> Result<FactoidBlock, ChainAdapterError> {
        let tip = self.tip_height()?;
        if height > tip {
            return Err(ChainAdapterError::BlockNotFound);
        }
        #[derive(Deserialize)]
        struct RawIo {
            address: String,
            amount: u64,
        }
        #[derive(Deserialize)]
        struct RawEc {
            address: String,
            amount: u64,
        }
        #[derive(Deserialize)]
        struct RawTx {
            inputs: Vec<RawIo>,
            outputs: Vec<RawIo>,
            ec_outputs: Vec<RawEc>,
        }
        #[derive(Deserialize)]
        struct RawBlock {
            transactions: Vec<RawTx>,
        }

        let raw: RawBlock = self.call("factoid-block", serde_json::json!([height]))?;
        let mut transactions = Vec::with_capacity(raw.transactions.len());
        for tx in raw.transactions {
            let decode_io = |io: RawIo| -> Result<FactoidIo, ChainAdapterError> {
                let bytes = hex::decode(&io.address)
                    .map_err(|e| ChainAdapterError::Unavailable(e.to_string()))?;
                if bytes.len() != 32 {
                    return Err(ChainAdapterError::Unavailable("malformed address".into()));
                }
                let mut address = [0u8; 32];
                address.copy_from_slice(&bytes);
                Ok(FactoidIo {
                    address,
                    amount: io.amount,
                })
            };
            let inputs = tx
                .inputs
                .into_iter()
                .map(decode_io)
                .collect::<Result<Vec<_>, _>>()?;
            let outputs = tx
                .outputs
                .into_iter()
                .map(decode_io)
                .collect::<Result<Vec<_>, _>>()?;
            let ec_outputs = tx
                .ec_outputs
                .into_iter()
                .map(|e| EcOutput {
                    address: e.address,
                    amount: e.amount,
                })
                .collect();
            transactions.push(FactoidTransaction {
                inputs,
                outputs,
                ec_outputs,
            });
        }
        Ok(FactoidBlock { height, transactions })
    }

    fn factoid_balance(&self, address: &str) -> Result<u64, ChainAdapterError> {
        self.call("factoid-balance", serde_json::json!([address]))
    }
}
