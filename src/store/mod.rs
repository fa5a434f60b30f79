// Persistence layer: a RocksDB-backed key-value store implementing the
// flat, prefixed-byte-key layout required by the read/write contract (§6).
//
// Tuned Options (write buffer, LZ4 compression, block cache, WAL sync) over
// a single default column family addressed by key prefix rather than one
// column family per entity, since the required layout is a flat namespace
// (`"SyncHead"`, `"Winners"+height`, ...).

pub mod keys;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use rocksdb::{WriteBatch, DB};

use crate::assets::Asset;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),
    #[error("stored data corrupt: {0}")]
    Corruption(&'static str),
    #[error("insufficient balance: address would go negative")]
    NegativeBalance,
}

pub type EntryHash = [u8; 32];

/// Handle to the node's persisted state. Cheap to clone (wraps `Arc<DB>`).
#[derive(Clone)]
pub struct ChainStore {
    db: Arc<DB>,
}

impl ChainStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);

        opts.set_write_buffer_size(64 * 1024 * 1024);
        opts.set_max_write_buffer_number(3);
        opts.set_min_write_buffer_number_to_merge(1);

        opts.set_target_file_size_base(64 * 1024 * 1024);
        opts.set_max_bytes_for_level_base(256 * 1024 * 1024);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let cache = rocksdb::Cache::new_lru_cache(256 * 1024 * 1024);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_block_cache(&cache);
        block_opts.set_block_size(16 * 1024);
        opts.set_block_based_table_factory(&block_opts);

        opts.set_wal_bytes_per_sync(1024 * 1024);
        opts.set_max_total_wal_size(128 * 1024 * 1024);
        opts.set_level_compaction_dynamic_level_bytes(true);
        opts.set_max_background_jobs(4);

        let db = DB::open(&opts, path)?;
        Ok(ChainStore { db: Arc::new(db) })
    }

    // ---- sync head ----

    /// -1 if the node has never committed a height.
    pub fn get_sync_head(&self) -> Result<i64, StoreError> {
        match self.db.get(keys::SYNC_HEAD)? {
            None => Ok(-1),
            Some(bytes) => Ok(decode_be_u32(&bytes)? as i64),
        }
    }

    pub fn put_sync_head(&self, height: u32) -> Result<(), StoreError> {
        self.db.put(keys::SYNC_HEAD, height.to_be_bytes())?;
        Ok(())
    }

    // ---- winners head / winners / rates ----

    pub fn get_winners_head(&self) -> Result<i64, StoreError> {
        match self.db.get(keys::WINNERS_HEAD)? {
            None => Ok(-1),
            Some(bytes) => Ok(decode_be_u32(&bytes)? as i64),
        }
    }

    pub fn get_winners(&self, height: u32) -> Result<Option<[EntryHash; 10]>, StoreError> {
        match self.db.get(keys::winners_key(height))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(decode_winners(&bytes)?)),
        }
    }

    pub fn get_rates(&self, height: u32) -> Result<Option<BTreeMap<Asset, f64>>, StoreError> {
        match self.db.get(keys::rates_key(height))? {
            None => Ok(None),
            Some(bytes) => {
                let textual: BTreeMap<String, f64> = serde_json::from_slice(&bytes)
                    .map_err(|_| StoreError::Corruption("rates JSON corrupt"))?;
                let mut out = BTreeMap::new();
                for (k, v) in textual {
                    let asset = Asset::from_ticker(&k)
                        .ok_or(StoreError::Corruption("unknown ticker in rates"))?;
                    out.insert(asset, v);
                }
                Ok(Some(out))
            }
        }
    }

    /// Stages a winners+rates+winners_head write into `batch`; caller commits.
    pub fn stage_grading_result(
        &self,
        batch: &mut WriteBatch,
        height: u32,
        winners: &[EntryHash; 10],
        rates: &BTreeMap<Asset, f64>,
    ) {
        let mut blob = Vec::with_capacity(320);
        for w in winners {
            blob.extend_from_slice(w);
        }
        batch.put(keys::winners_key(height), blob);

        let textual: BTreeMap<&str, f64> =
            rates.iter().map(|(a, r)| (a.ticker(), *r)).collect();
        let rates_bytes = serde_json::to_vec(&textual).expect("rates serialize");
        batch.put(keys::rates_key(height), rates_bytes);

        batch.put(keys::WINNERS_HEAD, height.to_be_bytes());
    }

    // ---- balances ----

    pub fn get_balances(&self, address: &[u8; 32]) -> Result<BTreeMap<Asset, u64>, StoreError> {
        match self.db.get(keys::balances_key(address))? {
            None => Ok(BTreeMap::new()),
            Some(bytes) => {
                let textual: BTreeMap<String, u64> = serde_json::from_slice(&bytes)
                    .map_err(|_| StoreError::Corruption("balances JSON corrupt"))?;
                let mut out = BTreeMap::new();
                for (k, v) in textual {
                    let asset = Asset::from_ticker(&k)
                        .ok_or(StoreError::Corruption("unknown ticker in balances"))?;
                    out.insert(asset, v);
                }
                Ok(out)
            }
        }
    }

    fn stage_balances(&self, batch: &mut WriteBatch, address: &[u8; 32], balances: &BTreeMap<Asset, u64>) {
        let textual: BTreeMap<&str, u64> =
            balances.iter().map(|(a, v)| (a.ticker(), *v)).collect();
        let bytes = serde_json::to_vec(&textual).expect("balances serialize");
        batch.put(keys::balances_key(address), bytes);
    }

    /// Applies signed per-ticker deltas to one address's balances, rejecting
    /// the whole update (no partial mutation) if any resulting balance would
    /// go negative. Stages the write into `batch`; caller commits atomically.
    pub fn stage_balance_deltas(
        &self,
        batch: &mut WriteBatch,
        address: &[u8; 32],
        deltas: &BTreeMap<Asset, i64>,
    ) -> Result<(), StoreError> {
        let mut balances = self.get_balances(address)?;
        for (asset, delta) in deltas {
            let entry = balances.entry(*asset).or_insert(0);
            let updated = *entry as i64 + delta;
            if updated < 0 {
                return Err(StoreError::NegativeBalance);
            }
            *entry = updated as u64;
        }
        self.stage_balances(batch, address, &balances);
        Ok(())
    }

    pub fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.db.write(batch)?;
        Ok(())
    }

    pub fn write_batch_synced(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(true);
        self.db.write_opt(batch, &write_opts)?;
        Ok(())
    }
}

fn decode_be_u32(bytes: &[u8]) -> Result<u32, StoreError> {
    let arr: [u8; 4] = bytes
        .try_into()
        .map_err(|_| StoreError::Corruption("expected 4-byte height"))?;
    Ok(u32::from_be_bytes(arr))
}

fn decode_winners(bytes: &[u8]) -> Result<[EntryHash; 10], StoreError> {
    if bytes.len() != 320 {
        return Err(StoreError::Corruption("winners blob must be 320 bytes"));
    }
    let mut out = [[0u8; 32]; 10];
    for (i, slot) in out.iter_mut().enumerate() {
        slot.copy_from_slice(&bytes[i * 32..(i + 1) * 32]);
    }
    Ok(out)
}
