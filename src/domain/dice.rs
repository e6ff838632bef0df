// ============================================================
// Layer 3 — Dice Score Accumulator
// ============================================================
// Dice = 2·|A ∩ B| / (|A| + |B|)
//
// Counts are accumulated over every sample fed in, and the
// score is computed once from the totals, so large tumours
// weigh more than small ones.
//
// Two empty masks agree perfectly: an accumulator that has
// only seen empty prediction and label masks scores 1.0.

use crate::domain::traits::MetricAccumulator;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiceScore {
    intersection: u64,
    predicted:    u64,
    labelled:     u64,
}

impl MetricAccumulator for DiceScore {
    fn name(&self) -> &'static str {
        "DiceScore"
    }

    fn add_result(&mut self, predict: &[bool], label: &[bool]) {
        debug_assert_eq!(predict.len(), label.len());
        for (&p, &l) in predict.iter().zip(label) {
            self.predicted    += p as u64;
            self.labelled     += l as u64;
            self.intersection += (p && l) as u64;
        }
    }

    fn eval(&self) -> f64 {
        let denom = self.predicted + self.labelled;
        if denom == 0 {
            return 1.0;
        }
        2.0 * self.intersection as f64 / denom as f64
    }
}
