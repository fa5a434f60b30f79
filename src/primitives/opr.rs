// Oracle Price Record parsing and grading support (§3, §4.2).
//
// Requires the full 32-ticker asset set on every record — PNT and every
// priced asset share one estimate map, so grading iterates a single fixed
// order (see DESIGN.md).

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::assets::{Asset, ASSET_COUNT};
use crate::crypto::keys::decode_address_string;
use crate::crypto::hash::hash_sha256;

#[derive(Debug, Clone)]
pub struct Opr {
    pub entry_hash: [u8; 32],
    pub nonce: Vec<u8>,
    pub self_reported_difficulty: Vec<u8>,
    pub coinbase_address: String,
    pub height: u32,
    pub asset_estimates: BTreeMap<Asset, f64>,
    pub prev_winners: Vec<String>,
    pub miner_id: String,
    pub opr_hash: [u8; 32],
    pub grade: f64,
}

#[derive(Deserialize)]
struct OprContent {
    coinbase: Value,
    dbht: Value,
    winners: Value,
    minerid: Value,
    assets: Value,
}

impl Opr {
    /// Parses a raw OPR-chain entry. Any structural violation yields `None`
    /// (a silent structural reject, never a hard error — §7).
    pub fn parse(entry_hash: [u8; 32], external_ids: &[Vec<u8>], content: &[u8]) -> Option<Opr> {
        if external_ids.len() != 2 {
            return None;
        }
        let nonce = external_ids[0].clone();
        let self_reported_difficulty = external_ids[1].clone();

        let parsed: OprContent = serde_json::from_slice(content).ok()?;

        let coinbase = parsed.coinbase.as_str()?.to_string();
        if decode_address_string(&coinbase).is_err() {
            return None;
        }

        let height_i = parsed.dbht.as_i64()?;
        if height_i < 0 {
            return None;
        }
        let height = height_i as u32;

        let miner_id = parsed.minerid.as_str()?.to_string();

        let winners_arr = parsed.winners.as_array()?;
        if winners_arr.len() != 10 {
            return None;
        }
        let mut prev_winners = Vec::with_capacity(10);
        for w in winners_arr {
            prev_winners.push(w.as_str()?.to_string());
        }

        let assets_obj = parsed.assets.as_object()?;
        if assets_obj.len() != ASSET_COUNT {
            return None;
        }

        let mut asset_estimates = BTreeMap::new();
        for (k, v) in assets_obj {
            let asset = Asset::from_ticker(k)?;
            let value = v.as_f64()?;
            if !asset.is_pnt() && value == 0.0 {
                return None;
            }
            asset_estimates.insert(asset, value);
        }
        if asset_estimates.len() != ASSET_COUNT {
            return None;
        }

        let opr_hash = hash_sha256(content);

        Some(Opr {
            entry_hash,
            nonce,
            self_reported_difficulty,
            coinbase_address: coinbase,
            height,
            asset_estimates,
            prev_winners,
            miner_id,
            opr_hash,
            grade: f64::INFINITY,
        })
    }

    /// Big-endian 8-byte self-reported difficulty, when present and of the
    /// expected width; used for the eligibility sort and dishonesty check.
    pub fn difficulty_u64(&self) -> Option<u64> {
        let bytes: [u8; 8] = self.self_reported_difficulty.clone().try_into().ok()?;
        Some(u64::from_be_bytes(bytes))
    }
}
