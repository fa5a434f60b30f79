// Default grader: fourth-power deviation elimination (§4.5).

use super::{
    average_estimates, calculate_record_grade, filter_top_50, winner_hashes, DifficultyHasher,
    GradeResult, Grader,
};
use crate::primitives::opr::Opr;

pub struct FourthPowerGrader;

impl Grader for FourthPowerGrader {
    fn grade(
        &self,
        prev_winners: &[String; 10],
        records: Vec<Opr>,
        hasher: &dyn DifficultyHasher,
    ) -> Option<GradeResult> {
        if records.len() < 10 {
            return None;
        }
        let mut eligible = filter_top_50(prev_winners, records, hasher);
        if eligible.len() < 10 {
            return None;
        }

        for i in (10..=eligible.len()).rev() {
            let averages = average_estimates(&eligible[..i]);
            for record in eligible[..i].iter_mut() {
                record.grade = calculate_record_grade(&record.asset_estimates, &averages);
            }
            eligible[..i].sort_by(|a, b| b.self_reported_difficulty.cmp(&a.self_reported_difficulty));
            eligible[..i].sort_by(|a, b| a.grade.partial_cmp(&b.grade).unwrap());
        }

        Some(GradeResult {
            rates: eligible[0].asset_estimates.clone(),
            winners: winner_hashes(&eligible),
        })
    }
}
