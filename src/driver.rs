// Block driver: the per-height Grading → Burns → Transactions loop (§4.8).
// Tracing spans per processed height, graceful poll-and-sleep on "no new
// height yet".

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use rocksdb::WriteBatch;

use crate::assets::{Asset, Network, BLOCK_REWARDS, START_HEIGHT};
use crate::burns::scan_burns;
use crate::chain_adapter::{ChainAdapter, ChainAdapterError};
use crate::crypto::keys::decode_address_string;
use crate::executor::apply_transactions;
use crate::grading::{DifficultyHasher, Grader};
use crate::primitives::opr::Opr;
use crate::store::{ChainStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("chain adapter unavailable: {0}")]
    ChainUnavailable(#[from] ChainAdapterError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub struct Driver {
    pub store: ChainStore,
    pub adapter: Arc<dyn ChainAdapter>,
    pub grader: Box<dyn Grader>,
    pub hasher: Box<dyn DifficultyHasher>,
    pub network: Network,
    pub poll_interval: Duration,
}

impl Driver {
    /// Runs the sync loop forever, advancing one height at a time and never
    /// returning except on an unrecoverable store error.
    pub fn run(&self) -> Result<(), DriverError> {
        loop {
            match self.step() {
                Ok(true) => continue,
                Ok(false) => std::thread::sleep(self.poll_interval),
                Err(DriverError::ChainUnavailable(e)) => {
                    tracing::warn!(error = %e, "chain adapter unavailable, retrying");
                    std::thread::sleep(self.poll_interval);
                }
                Err(e @ DriverError::Store(_)) => return Err(e),
            }
        }
    }

    /// Processes exactly one height if the chain tip has advanced past the
    /// node's sync head. Returns `Ok(true)` if a height was processed.
    pub fn step(&self) -> Result<bool, DriverError> {
        let sync_head = self.store.get_sync_head()?;
        let next_height = if sync_head < 0 {
            START_HEIGHT
        } else {
            (sync_head as u32) + 1
        };

        let tip = self.adapter.tip_height()?;
        if next_height > tip {
            return Ok(false);
        }

        self.process_height(next_height)?;
        Ok(true)
    }

    fn process_height(&self, height: u32) -> Result<(), DriverError> {
        let span = tracing::info_span!("process_height", height);
        let _guard = span.enter();

        let prev_winners = self.load_prev_winners()?;

        let opr_entries = self
            .adapter
            .entries_at_height(self.network.opr_chain_id(), height)?;
        let records: Vec<Opr> = opr_entries
            .into_iter()
            .filter_map(|e| Opr::parse(e.entry_hash, &e.external_ids, &e.content))
            .collect();

        // The grader consumes `records` by value; keep the coinbase lookup
        // needed for reward crediting before handing them over.
        let coinbase_by_hash: HashMap<[u8; 32], String> = records
            .iter()
            .map(|r| (r.entry_hash, r.coinbase_address.clone()))
            .collect();

        let grade_result = self.grader.grade(&prev_winners, records, self.hasher.as_ref());

        let factoid_block = self.adapter.factoid_block(height)?;
        let burn_credits = scan_burns(&factoid_block, self.network);

        let mut batch = WriteBatch::default();
        let mut address_deltas: BTreeMap<[u8; 32], BTreeMap<Asset, i64>> = BTreeMap::new();

        if let Some(result) = &grade_result {
            self.store
                .stage_grading_result(&mut batch, height, &result.winners, &result.rates);
            for (address, reward_deltas) in winner_reward_deltas(&result.winners, &coinbase_by_hash)? {
                let entry = address_deltas.entry(address).or_default();
                for (asset, delta) in reward_deltas {
                    *entry.entry(asset).or_insert(0) += delta;
                }
            }
        }

        for (address, amount) in &burn_credits {
            *address_deltas
                .entry(*address)
                .or_default()
                .entry(Asset::Fct)
                .or_insert(0) += *amount as i64;
        }

        // Every address appears at most once in this batch, so two winner
        // slots sharing a coinbase, or a coinbase that also burned in this
        // block, accumulate instead of clobbering one another.
        for (address, deltas) in &address_deltas {
            // A burn can only credit, never debit, so a negative-balance
            // rejection here means stored state is already corrupt.
            self.store.stage_balance_deltas(&mut batch, address, deltas)?;
        }

        self.store.write_batch(batch)?;

        // Conversions need this height's freshly graded rates; a height with
        // no gradable winners still runs the executor against an empty rate
        // table, so like-kind transfers keep working even when grading stalls.
        let rates = grade_result.map(|r| r.rates).unwrap_or_default();
        let tx_entries = self
            .adapter
            .entries_at_height(self.network.transactions_chain_id(), height)?;
        apply_transactions(&self.store, self.network.transactions_chain_id(), &tx_entries, &rates)?;

        self.store.put_sync_head(height)?;
        tracing::info!(burns = burn_credits.len(), "height committed");
        Ok(())
    }

    fn load_prev_winners(&self) -> Result<[String; 10], DriverError> {
        let winners_head = self.store.get_winners_head()?;
        if winners_head < 0 {
            return Ok(std::array::from_fn(|_| String::new()));
        }
        let hashes = self
            .store
            .get_winners(winners_head as u32)?
            .ok_or(StoreError::Corruption("winners_head points at missing record"))?;
        Ok(hashes.map(hex::encode))
    }
}

/// Resolves each winning entry-hash back to its miner's coinbase address and
/// returns the matching PNT reward delta for that slot, keyed by address so
/// that two slots sharing a coinbase accumulate rather than overwrite.
fn winner_reward_deltas(
    winners: &[[u8; 32]; 10],
    coinbase_by_hash: &HashMap<[u8; 32], String>,
) -> Result<BTreeMap<[u8; 32], BTreeMap<Asset, i64>>, DriverError> {
    let mut deltas: BTreeMap<[u8; 32], BTreeMap<Asset, i64>> = BTreeMap::new();
    for (entry_hash, reward) in winners.iter().zip(BLOCK_REWARDS.iter()) {
        let coinbase = coinbase_by_hash
            .get(entry_hash)
            .ok_or(StoreError::Corruption("winner entry hash not among graded records"))?;
        let address = decode_address_string(coinbase)
            .map_err(|_| StoreError::Corruption("winner coinbase address undecodable"))?;
        *deltas
            .entry(address)
            .or_default()
            .entry(Asset::Pnt)
            .or_insert(0) += *reward as i64;
    }
    Ok(deltas)
}
