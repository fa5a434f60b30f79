// Transaction execution (§4.7). Each entry is independently parsed and
// verified; a failure anywhere in one entry silently drops only that entry,
// and every surviving entry's deltas are applied in chain order.

use std::collections::BTreeMap;

use rocksdb::WriteBatch;

use crate::assets::Asset;
use crate::chain_adapter::ChainEntry;
use crate::primitives::transaction::TransactionEntry;
use crate::store::{ChainStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Parses, verifies and applies every transaction entry at one height, in
/// the order the chain returned them. Entries that fail to parse, fail
/// signature verification, or would drive a balance negative are skipped;
/// they never abort processing of the remaining entries.
pub fn apply_transactions(
    store: &ChainStore,
    chain_id_hex: &str,
    entries: &[ChainEntry],
    rates: &BTreeMap<Asset, f64>,
) -> Result<usize, ExecutorError> {
    let mut applied = 0usize;

    for raw in entries {
        let Some(entry) =
            TransactionEntry::from_entry(&raw.external_ids, &raw.content, chain_id_hex)
        else {
            continue;
        };

        let Ok(deltas) = entry.deltas(rates) else {
            continue;
        };

        let mut batch = WriteBatch::default();
        let mut ok = true;
        for (address, asset_deltas) in &deltas {
            if store
                .stage_balance_deltas(&mut batch, address, asset_deltas)
                .is_err()
            {
                ok = false;
                break;
            }
        }
        if !ok {
            continue;
        }

        store.write_batch(batch)?;
        applied += 1;
    }

    Ok(applied)
}
