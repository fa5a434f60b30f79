// Grading: eligibility filtering and the pluggable grading policy (§4.5).
//
// The grader is a trait object so a different grading policy can be swapped
// in without touching the eligibility filter or the driver that calls it.

pub mod fourth_power;
pub mod straight_difficulty;

use std::collections::BTreeMap;

use crate::assets::{Asset, GRADING_ORDER};
use crate::primitives::opr::Opr;

pub use fourth_power::FourthPowerGrader;
pub use straight_difficulty::StraightDifficultyGrader;

pub type EntryHash = [u8; 32];

/// Stand-in for the external LXR hasher (explicitly out of scope, §1): the
/// grader calls this trait, never a hash function directly, so a real LXR
/// implementation can be swapped in without touching grading logic.
pub trait DifficultyHasher: Send + Sync {
    /// Returns the first 8 bytes of the observed difficulty for `opr_hash || nonce`.
    fn difficulty(&self, opr_hash: &[u8; 32], nonce: &[u8]) -> [u8; 8];
}

pub struct Sha3DifficultyHasher;

impl DifficultyHasher for Sha3DifficultyHasher {
    fn difficulty(&self, opr_hash: &[u8; 32], nonce: &[u8]) -> [u8; 8] {
        let hash = crate::crypto::hash::hash_sha3_256_concat(opr_hash, nonce);
        let mut out = [0u8; 8];
        out.copy_from_slice(&hash[0..8]);
        out
    }
}

pub struct GradeResult {
    pub rates: BTreeMap<Asset, f64>,
    pub winners: [EntryHash; 10],
}

pub trait Grader: Send + Sync {
    /// Grades `records` for one height against `prev_winners` (the 10
    /// previous-block winner identifiers, or 10 empty strings at genesis).
    /// `None` means ungradable (fewer than 10 eligible submissions).
    fn grade(
        &self,
        prev_winners: &[String; 10],
        records: Vec<Opr>,
        hasher: &dyn DifficultyHasher,
    ) -> Option<GradeResult>;
}

/// Sorts by self-reported difficulty descending (stable), keeps submissions
/// whose observed difficulty matches what they reported and whose
/// `prev_winners` matches the chain's actual previous winners, up to 50.
pub(crate) fn filter_top_50(
    prev_winners: &[String; 10],
    mut records: Vec<Opr>,
    hasher: &dyn DifficultyHasher,
) -> Vec<Opr> {
    records.sort_by(|a, b| b.self_reported_difficulty.cmp(&a.self_reported_difficulty));

    let mut valid = Vec::new();
    for record in records {
        let observed = hasher.difficulty(&record.opr_hash, &record.nonce);
        if observed.as_slice() != record.self_reported_difficulty.as_slice() {
            continue;
        }
        if record.prev_winners != prev_winners.as_slice() {
            continue;
        }
        valid.push(record);
        if valid.len() >= 50 {
            break;
        }
    }
    valid
}

/// Two-pass mean of the absolute value of each asset's estimate, over the
/// single fixed grading order.
pub(crate) fn average_estimates(records: &[Opr]) -> BTreeMap<Asset, f64> {
    let mut sums: BTreeMap<Asset, f64> = GRADING_ORDER.iter().map(|a| (*a, 0.0f64)).collect();
    for record in records {
        for asset in GRADING_ORDER {
            if let Some(v) = record.asset_estimates.get(&asset) {
                *sums.get_mut(&asset).unwrap() += v.abs();
            }
        }
    }
    let n = records.len() as f64;
    for v in sums.values_mut() {
        *v /= n;
    }
    sums
}

/// Sum of fourth-power relative deviations from the average, in the fixed
/// grading order. Float-order-sensitive: never iterate the asset set any
/// other way here.
pub(crate) fn calculate_record_grade(
    estimates: &BTreeMap<Asset, f64>,
    averages: &BTreeMap<Asset, f64>,
) -> f64 {
    let mut grade = 0.0f64;
    for asset in GRADING_ORDER {
        let avg = averages[&asset];
        if avg > 0.0 {
            let v = estimates[&asset];
            let d = (v - avg) / avg;
            grade += d * d * d * d;
        }
    }
    grade
}

fn entry_hashes(records: &[Opr]) -> [EntryHash; 10] {
    std::array::from_fn(|i| records[i].entry_hash)
}

pub(crate) use entry_hashes as winner_hashes;
