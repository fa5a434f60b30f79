// End-to-end coverage of the Grading -> Burns -> Transactions pipeline (§4.8)
// against a real ChainStore and an in-memory MockChainAdapter, exercising the
// same six scenarios called out across §4: a plain burn credit, a like-kind
// transfer, a conversion with and without an explicit output amount, the
// grader's ten-eligible-submission floor, and winner reward crediting.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pegnode::assets::{Asset, Network, BLOCK_REWARDS, START_HEIGHT};
use pegnode::chain_adapter::mock::MockChainAdapter;
use pegnode::chain_adapter::{ChainEntry, EcOutput, FactoidBlock, FactoidIo, FactoidTransaction};
use pegnode::crypto::ed25519::{self, SecretKey};
use pegnode::crypto::keys::{decode_address_string, encode_address_string};
use pegnode::driver::Driver;
use pegnode::grading::{FourthPowerGrader, Sha3DifficultyHasher};
use pegnode::primitives::transaction::{Transaction, TransactionEntry, TxInput, TxOutput};
use pegnode::store::ChainStore;

fn tmp_store(label: &str) -> ChainStore {
    let p = std::env::temp_dir().join(format!("pegnode_e2e_{label}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&p);
    ChainStore::open(&p).unwrap()
}

fn driver(store: ChainStore, adapter: Arc<MockChainAdapter>) -> Driver {
    Driver {
        store,
        adapter,
        grader: Box::new(FourthPowerGrader),
        hasher: Box::new(Sha3DifficultyHasher),
        network: Network::Mainnet,
        poll_interval: Duration::from_millis(1),
    }
}

fn address_of(sk: &SecretKey) -> [u8; 32] {
    let pk = ed25519::public_key_of(sk);
    let rcd = ed25519::rcd_bytes(&pk);
    ed25519::address_from_rcd(&rcd)
}

fn transfer_entry(
    chain_id: &str,
    sk: SecretKey,
    input_ticker: &str,
    amount: i64,
    output_address: [u8; 32],
    output_ticker: Option<&str>,
    output_amount: Option<i64>,
    entry_hash: u8,
) -> ChainEntry {
    let input_address = address_of(&sk);
    let mut entry = TransactionEntry::new("1700000000.0");
    entry.add_transaction(Transaction {
        input: TxInput {
            address: encode_address_string(&input_address),
            asset_ticker: input_ticker.into(),
            amount: Some(amount),
        },
        outputs: vec![TxOutput {
            address: encode_address_string(&output_address),
            asset_ticker: output_ticker.map(String::from),
            amount: output_amount,
        }],
        metadata: None,
    });
    let (external_ids, content) = entry.sign(chain_id, &[sk]);
    ChainEntry {
        entry_hash: [entry_hash; 32],
        external_ids,
        content,
        timestamp: 0,
    }
}

/// A single burn at `height`, scanned and credited, then a same-height
/// like-kind transfer spending part of the freshly credited pFCT.
#[test]
fn burn_credit_then_like_kind_transfer_in_the_same_height() {
    let store = tmp_store("burn_then_transfer");
    let sk = SecretKey([11u8; 32]);
    let burner = address_of(&sk);
    let recipient = [0x22u8; 32];

    let sink = Network::Mainnet.burn_sink_address().to_string();
    let factoid_block = FactoidBlock {
        height: START_HEIGHT,
        transactions: vec![FactoidTransaction {
            inputs: vec![FactoidIo {
                address: burner,
                amount: 5_000,
            }],
            outputs: vec![],
            ec_outputs: vec![EcOutput {
                address: sink,
                amount: 5_000,
            }],
        }],
    };

    let tx_entry = transfer_entry(
        Network::Mainnet.transactions_chain_id(),
        sk,
        "FCT",
        2_000,
        recipient,
        None,
        None,
        1,
    );

    let adapter = Arc::new(MockChainAdapter {
        tip: Mutex::new(START_HEIGHT),
        ..Default::default()
    });
    adapter
        .factoid_blocks
        .lock()
        .unwrap()
        .insert(START_HEIGHT, factoid_block);
    adapter
        .tx_entries
        .lock()
        .unwrap()
        .insert(START_HEIGHT, vec![tx_entry]);

    let driver = driver(store.clone(), adapter);
    assert!(driver.step().unwrap());

    let burner_balances = store.get_balances(&burner).unwrap();
    assert_eq!(burner_balances[&Asset::Fct], 3_000);
    let recipient_balances = store.get_balances(&recipient).unwrap();
    assert_eq!(recipient_balances[&Asset::Fct], 2_000);
}

/// A conversion transaction with an explicit output amount: the input side
/// is debited proportionally by the remainder math in `Transaction::deltas`.
#[test]
fn conversion_with_explicit_output_amount() {
    let store = tmp_store("conversion_explicit");
    let sk = SecretKey([13u8; 32]);
    let holder = address_of(&sk);

    let mut seed = BTreeMap::new();
    seed.insert(Asset::Fct, 50_00000000i64);
    let mut batch = rocksdb::WriteBatch::default();
    store.stage_balance_deltas(&mut batch, &holder, &seed).unwrap();
    store.write_batch(batch).unwrap();

    let mut rates = BTreeMap::new();
    rates.insert(Asset::Fct, 3.2319);
    rates.insert(Asset::Xbt, 10607.0505);

    let tx_entry = transfer_entry(
        Network::Mainnet.transactions_chain_id(),
        sk,
        "FCT",
        50_00000000,
        holder,
        Some("XBT"),
        Some(1_000_000),
        2,
    );

    let applied = pegnode::executor::apply_transactions(
        &store,
        Network::Mainnet.transactions_chain_id(),
        &[tx_entry],
        &rates,
    )
    .unwrap();
    assert_eq!(applied, 1);

    let balances = store.get_balances(&holder).unwrap();
    assert_eq!(balances[&Asset::Xbt], 1_000_000);
    let expected_fct_spent = (1_000_000f64 * 10607.0505 / 3.2319).trunc() as i64;
    assert_eq!(balances[&Asset::Fct], 50_00000000 - expected_fct_spent);
}

/// Same conversion shape but with no explicit output amount: the whole
/// remaining input converts at the graded rate and truncates toward zero.
#[test]
fn conversion_without_explicit_amount_converts_full_remainder() {
    let store = tmp_store("conversion_implicit");
    let sk = SecretKey([17u8; 32]);
    let holder = address_of(&sk);

    let mut seed = BTreeMap::new();
    seed.insert(Asset::Fct, 10_00000000i64);
    let mut batch = rocksdb::WriteBatch::default();
    store.stage_balance_deltas(&mut batch, &holder, &seed).unwrap();
    store.write_batch(batch).unwrap();

    let mut rates = BTreeMap::new();
    rates.insert(Asset::Fct, 3.2319);
    rates.insert(Asset::Xau, 1950.40);

    let tx_entry = transfer_entry(
        Network::Mainnet.transactions_chain_id(),
        sk,
        "FCT",
        10_00000000,
        holder,
        Some("XAU"),
        None,
        3,
    );

    let applied = pegnode::executor::apply_transactions(
        &store,
        Network::Mainnet.transactions_chain_id(),
        &[tx_entry],
        &rates,
    )
    .unwrap();
    assert_eq!(applied, 1);

    let balances = store.get_balances(&holder).unwrap();
    assert_eq!(balances[&Asset::Fct], 0);
    let expected_xau = (10_00000000f64 * 3.2319 / 1950.40).trunc() as i64;
    assert_eq!(balances[&Asset::Xau], expected_xau);
}

/// A conversion whose required rate was never graded is skipped, but that
/// failure never blocks other entries at the same height from applying.
#[test]
fn conversion_missing_rate_is_skipped_without_blocking_other_entries() {
    let store = tmp_store("conversion_missing_rate");
    let sk_a = SecretKey([19u8; 32]);
    let sk_b = SecretKey([23u8; 32]);
    let holder_a = address_of(&sk_a);
    let holder_b = address_of(&sk_b);

    let mut batch = rocksdb::WriteBatch::default();
    let mut seed_a = BTreeMap::new();
    seed_a.insert(Asset::Fct, 1_000i64);
    store.stage_balance_deltas(&mut batch, &holder_a, &seed_a).unwrap();
    let mut seed_b = BTreeMap::new();
    seed_b.insert(Asset::Fct, 1_000i64);
    store.stage_balance_deltas(&mut batch, &holder_b, &seed_b).unwrap();
    store.write_batch(batch).unwrap();

    let chain_id = Network::Mainnet.transactions_chain_id();
    let unratable = transfer_entry(chain_id, sk_a, "FCT", 500, holder_a, Some("XBT"), None, 4);
    let like_kind = transfer_entry(chain_id, sk_b, "FCT", 500, [0x99u8; 32], None, None, 5);

    // No rates recorded at all: the conversion has nothing to consult.
    let rates = BTreeMap::new();
    let applied =
        pegnode::executor::apply_transactions(&store, chain_id, &[unratable, like_kind], &rates)
            .unwrap();
    assert_eq!(applied, 1);

    assert_eq!(store.get_balances(&holder_a).unwrap()[&Asset::Fct], 1_000);
    assert_eq!(store.get_balances(&holder_b).unwrap()[&Asset::Fct], 500);
    assert_eq!(store.get_balances(&[0x99u8; 32]).unwrap()[&Asset::Fct], 500);
}

fn opr_entry(coinbase: &str, height: u32, index: u8) -> ChainEntry {
    let mut assets = serde_json::Map::new();
    for asset in pegnode::assets::GRADING_ORDER {
        let base = if asset.is_pnt() { 1.0 } else { 1.0 + index as f64 * 0.001 };
        assets.insert(asset.ticker().to_string(), serde_json::json!(base));
    }
    let content = serde_json::json!({
        "coinbase": coinbase,
        "dbht": height,
        "winners": ["", "", "", "", "", "", "", "", "", ""],
        "minerid": format!("miner-{index}"),
        "assets": assets,
    });
    let content_bytes = serde_json::to_vec(&content).unwrap();
    let difficulty = Sha3DifficultyHasher.difficulty(
        &pegnode::crypto::hash::hash_sha256(&content_bytes),
        &[index],
    );
    ChainEntry {
        entry_hash: [index; 32],
        external_ids: vec![vec![index], difficulty.to_vec()],
        content: content_bytes,
        timestamp: 0,
    }
}

use pegnode::grading::DifficultyHasher;

/// Fewer than ten submissions: the height is ungradable, no winners or rates
/// are recorded, but the sync head still advances and burns/transfers at that
/// height still apply.
#[test]
fn fewer_than_ten_submissions_leaves_height_ungraded() {
    let store = tmp_store("ungraded_floor");
    let entries: Vec<ChainEntry> = (0..5u8)
        .map(|i| opr_entry(&encode_address_string(&[i; 32]), START_HEIGHT, i))
        .collect();

    let adapter = Arc::new(MockChainAdapter {
        tip: Mutex::new(START_HEIGHT),
        ..Default::default()
    });
    adapter.opr_entries.lock().unwrap().insert(START_HEIGHT, entries);
    adapter.factoid_blocks.lock().unwrap().insert(
        START_HEIGHT,
        FactoidBlock {
            height: START_HEIGHT,
            transactions: vec![],
        },
    );

    let driver = driver(store.clone(), adapter);
    assert!(driver.step().unwrap());

    assert_eq!(store.get_sync_head().unwrap(), START_HEIGHT as i64);
    assert_eq!(store.get_winners_head().unwrap(), -1);
    assert!(store.get_rates(START_HEIGHT).unwrap().is_none());
}

/// Ten-plus eligible submissions grade successfully; each of the ten winning
/// entry hashes resolves back to its coinbase address and is credited the
/// matching `BLOCK_REWARDS` slot in PNT.
#[test]
fn ten_eligible_submissions_grade_and_credit_all_winner_slots() {
    let store = tmp_store("graded_rewards");
    let coinbases: Vec<String> = (0..10u8).map(|i| encode_address_string(&[i; 32])).collect();
    let entries: Vec<ChainEntry> = coinbases
        .iter()
        .enumerate()
        .map(|(i, cb)| opr_entry(cb, START_HEIGHT, i as u8))
        .collect();

    let adapter = Arc::new(MockChainAdapter {
        tip: Mutex::new(START_HEIGHT),
        ..Default::default()
    });
    adapter.opr_entries.lock().unwrap().insert(START_HEIGHT, entries);
    adapter.factoid_blocks.lock().unwrap().insert(
        START_HEIGHT,
        FactoidBlock {
            height: START_HEIGHT,
            transactions: vec![],
        },
    );

    let driver = driver(store.clone(), adapter);
    assert!(driver.step().unwrap());

    assert_eq!(store.get_winners_head().unwrap(), START_HEIGHT as i64);
    let winners = store.get_winners(START_HEIGHT).unwrap().unwrap();

    // Each entry hash is `[index; 32]` and each coinbase address decodes back
    // to that same `[index; 32]`, so a winning slot's raw bytes double as the
    // address that should have been credited.
    let mut total_pnt = 0u64;
    for (slot, reward) in winners.iter().zip(BLOCK_REWARDS.iter()) {
        assert!(coinbases
            .iter()
            .any(|cb| decode_address_string(cb).unwrap() == *slot));
        let balances = store.get_balances(slot).unwrap();
        assert_eq!(balances.get(&Asset::Pnt).copied().unwrap_or(0), *reward);
        total_pnt += balances.get(&Asset::Pnt).copied().unwrap_or(0);
    }
    assert_eq!(total_pnt, BLOCK_REWARDS.iter().sum::<u64>());
}
