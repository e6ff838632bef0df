// ============================================================
// Layer 5 — Segmentation Loss
// ============================================================
// Reduces per-voxel class logits and the label volume to one
// scalar.
//
// Logits arrive class-first, [N, K, X, Y, Z]. They are moved to
// class-last and flattened so every voxel becomes one row of a
// standard classification problem:
//
//   [N, K, X, Y, Z] → permute → [N, X, Y, Z, K] → [M, K]
//   [N, X, Y, Z]               →                  [M]
//
//   CrossEntropy  mean over voxels of -log p(target)
//   Focal         mean over voxels of -(1 - p)^γ · log p(target)
//
// Reference: Burn Book §3 (CrossEntropyLoss)
//            Lin et al. (2017) Focal Loss for Dense Object Detection

use burn::{
    nn::loss::CrossEntropyLossConfig,
    prelude::*,
    tensor::activation::log_softmax,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    #[default]
    CrossEntropy,
    Focal { gamma: f64 },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SegLoss {
    kind: LossKind,
}

impl SegLoss {
    pub fn new(kind: LossKind) -> Self {
        Self { kind }
    }

    /// logits: [N, K, X, Y, Z], labels: [N, X, Y, Z] → scalar [1]
    pub fn forward<B: Backend>(&self, logits: Tensor<B, 5>, labels: Tensor<B, 4, Int>) -> Tensor<B, 1> {
        let [n, k, x, y, z] = logits.dims();
        let voxels = n * x * y * z;

        let logits  = logits.permute([0, 2, 3, 4, 1]).reshape([voxels, k]);
        let targets = labels.reshape([voxels]);

        match self.kind {
            LossKind::CrossEntropy => CrossEntropyLossConfig::new()
                .init(&logits.device())
                .forward(logits, targets),
            LossKind::Focal { gamma } => {
                let log_p = log_softmax(logits, 1)
                    .gather(1, targets.reshape([voxels, 1]))
                    .reshape([voxels]);
                let weight = log_p.clone().exp().neg().add_scalar(1.0).powf_scalar(gamma);
                (weight * log_p).neg().mean()
            }
        }
    }
}
