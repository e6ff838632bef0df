// ============================================================
// Layer 5 — Region Evaluation
// ============================================================
// Scores a network on every subject of an eval-mode view:
//
//   full volume ─► split_and_forward ─► argmax over classes
//        │                                    │
//        label                           prediction
//        │                                    │
//        └──── region_mask(·, region) ────────┘
//                       │
//               DiceScore per region   (whole, core, enhancing)
//
// Each region owns one accumulator; counts build up over all
// subjects and are turned into scores at the end.
//
// The network is expected on an inference backend
// (`model.valid()`), so no autodiff graph is recorded.

use anyhow::{anyhow, ensure, Context, Result};
use burn::{data::dataset::Dataset, prelude::*};

use crate::data::dataset::DatasetView;
use crate::domain::dice::DiceScore;
use crate::domain::region::{region_mask, Region};
use crate::domain::traits::{MetricAccumulator, Mode};
use crate::ml::inference::split_and_forward;
use crate::ml::model::SegmentationNetwork;

/// Guards the F-score denominator when both scores are zero.
pub const FSCORE_EPS: f64 = 0.001;

/// Dice score per tumour region.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegionScores {
    pub whole:     f64,
    pub core:      f64,
    pub enhancing: f64,
}

impl RegionScores {
    /// Harmonic-style combination of whole-tumour and core scores.
    pub fn fscore(&self) -> f64 {
        2.0 * self.whole * self.core / (self.whole + self.core + FSCORE_EPS)
    }
}

/// Dice scores of `net` over every subject of `view`.
pub fn evaluate<B, N>(net: &N, view: &DatasetView, chunk_size: usize, device: &B::Device) -> Result<RegionScores>
where
    B: Backend,
    N: SegmentationNetwork<B>,
{
    ensure!(view.mode() == Mode::Eval, "evaluation needs an eval-mode view, got {:?}", view.mode());

    let mut accumulators: [DiceScore; 3] = Default::default();

    for index in 0..view.len() {
        let item = view.get(index).with_context(|| format!("no sample at index {index}"))?;
        let shape = item.volume.shape();

        let volume = Tensor::<B, 4>::from_data(
            TensorData::new(item.volume.into_data(), shape).convert::<B::FloatElem>(),
            device,
        );
        let logits = split_and_forward(net, volume, chunk_size)?;

        let predicted: Vec<i64> = logits
            .argmax(1)
            .into_data()
            .convert::<i64>()
            .to_vec()
            .map_err(|e| anyhow!("cannot read prediction: {e:?}"))?;
        let label: Vec<i64> = item.label.data().iter().map(|&c| i64::from(c)).collect();

        for (accumulator, region) in accumulators.iter_mut().zip(Region::ALL) {
            accumulator.add_result(&region_mask(&predicted, region), &region_mask(&label, region));
        }
    }

    let [whole, core, enhancing] = accumulators.each_ref().map(|a| a.eval());
    for (accumulator, region) in accumulators.iter().zip(Region::ALL) {
        tracing::info!("{} [{}]: {:.4}", accumulator.name(), region, accumulator.eval());
    }

    Ok(RegionScores { whole, core, enhancing })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::data::dataset::BratsDataset;
    use crate::data::testing::{folders, identity_stats, LabelEchoReader};
    use crate::ml::testing::{ConstantNet, EchoClassNet};

    type B = NdArray;

    fn echo_dataset() -> BratsDataset {
        BratsDataset::with_stats(
            &folders("s", 2),
            &LabelEchoReader { extent: [2, 2, 7] },
            identity_stats(),
            [1, 1, 1],
        )
        .unwrap()
    }

    #[test]
    fn test_fscore() {
        let s = RegionScores { whole: 0.8, core: 0.6, enhancing: 0.1 };
        assert!((s.fscore() - 2.0 * 0.48 / 1.401).abs() < 1e-12);
        assert_eq!(RegionScores::default().fscore(), 0.0);
    }

    #[test]
    fn test_perfect_prediction_scores_one() {
        let device = Default::default();
        let view = echo_dataset().view(Mode::Eval);
        let net = EchoClassNet { num_classes: 5 };

        let scores = evaluate::<B, _>(&net, &view, 3, &device).unwrap();
        assert_eq!(scores, RegionScores { whole: 1.0, core: 1.0, enhancing: 1.0 });
    }

    #[test]
    fn test_background_prediction_scores_zero() {
        let device = Default::default();
        let view = echo_dataset().view(Mode::Eval);
        let net = ConstantNet { class: 0, num_classes: 5 };

        let scores = evaluate::<B, _>(&net, &view, 5, &device).unwrap();
        assert_eq!(scores, RegionScores::default());
    }

    #[test]
    fn test_edema_prediction_only_matches_whole() {
        let device = Default::default();
        let view = echo_dataset().view(Mode::Eval);
        let net = ConstantNet { class: 2, num_classes: 5 };

        let scores = evaluate::<B, _>(&net, &view, 5, &device).unwrap();
        // whole: predicted = all voxels (N), labelled = 3N/4 → 2·(3/4)/(7/4)
        assert!((scores.whole - 6.0 / 7.0).abs() < 1e-9);
        assert_eq!(scores.core, 0.0);
        assert_eq!(scores.enhancing, 0.0);
    }

    #[test]
    fn test_train_view_rejected() {
        let device = Default::default();
        let view = echo_dataset().view(Mode::Train { trans_prob: 0.1 });
        let net = EchoClassNet { num_classes: 5 };
        assert!(evaluate::<B, _>(&net, &view, 5, &device).is_err());
    }
}
