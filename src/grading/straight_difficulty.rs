// Variant grader: straight-difficulty ranking with a plain mean (§4.5, §9).

use super::{average_estimates, filter_top_50, winner_hashes, DifficultyHasher, GradeResult, Grader};
use crate::primitives::opr::Opr;

pub struct StraightDifficultyGrader;

impl Grader for StraightDifficultyGrader {
    fn grade(
        &self,
        prev_winners: &[String; 10],
        records: Vec<Opr>,
        hasher: &dyn DifficultyHasher,
    ) -> Option<GradeResult> {
        if records.len() < 10 {
            return None;
        }
        let eligible = filter_top_50(prev_winners, records, hasher);
        if eligible.len() < 10 {
            return None;
        }

        Some(GradeResult {
            rates: average_estimates(&eligible),
            winners: winner_hashes(&eligible),
        })
    }
}
