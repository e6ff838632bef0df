// ============================================================
// Layer 5 — Segmentation Network
// ============================================================
// A small residual 3-D CNN mapping a 4-modality volume to
// per-voxel class logits. Every convolution keeps the spatial
// extent, so any [X, Y, Z] input (including a slab of a few
// slices) yields logits of the same extent.
//
//   input   [N, 4, X, Y, Z]
//     │
//   stem    Conv3d 3×3×3 → width, BatchNorm, ReLU
//     │
//   blocks  x + BN(Conv(ReLU(BN(Conv(x)))))  then ReLU   (×num_blocks)
//     │
//   head    Conv3d 1×1×1 → num_classes
//     │
//   output  [N, num_classes, X, Y, Z]
//
// Reference: Burn Book §3 (Building Blocks)
//            He et al. (2016) Deep Residual Learning

use burn::{
    nn::{
        conv::{Conv3d, Conv3dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig3d, Relu,
    },
    prelude::*,
};

// ─── SegmentationNetwork ──────────────────────────────────────────────────────
/// Anything that maps [N, C, X, Y, Z] to [N, classes, X, Y, Z] logits.
pub trait SegmentationNetwork<B: Backend> {
    fn forward(&self, volumes: Tensor<B, 5>) -> Tensor<B, 5>;
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally. Do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct VoxResNetConfig {
    #[config(default = 4)]
    pub in_channels: usize,
    #[config(default = 5)]
    pub num_classes: usize,
    #[config(default = 32)]
    pub width: usize,
    #[config(default = 2)]
    pub num_blocks: usize,
}

fn conv3x3(channels: [usize; 2]) -> Conv3dConfig {
    Conv3dConfig::new(channels, [3, 3, 3]).with_padding(PaddingConfig3d::Explicit(1, 1, 1))
}

impl VoxResNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> VoxResNet<B> {
        let stem      = conv3x3([self.in_channels, self.width]).init(device);
        let stem_norm = BatchNormConfig::new(self.width).init(device);
        let blocks    = (0..self.num_blocks)
            .map(|_| self.build_block(device))
            .collect();
        let head = Conv3dConfig::new([self.width, self.num_classes], [1, 1, 1]).init(device);
        VoxResNet { stem, stem_norm, blocks, head, activation: Relu::new() }
    }

    fn build_block<B: Backend>(&self, device: &B::Device) -> ResidualBlock<B> {
        ResidualBlock {
            conv1:      conv3x3([self.width, self.width]).init(device),
            norm1:      BatchNormConfig::new(self.width).init(device),
            conv2:      conv3x3([self.width, self.width]).init(device),
            norm2:      BatchNormConfig::new(self.width).init(device),
            activation: Relu::new(),
        }
    }
}

#[derive(Module, Debug)]
pub struct ResidualBlock<B: Backend> {
    pub conv1:      Conv3d<B>,
    pub norm1:      BatchNorm<B, 3>,
    pub conv2:      Conv3d<B>,
    pub norm2:      BatchNorm<B, 3>,
    pub activation: Relu,
}

impl<B: Backend> ResidualBlock<B> {
    pub fn forward(&self, x: Tensor<B, 5>) -> Tensor<B, 5> {
        let h = self.activation.forward(self.norm1.forward(self.conv1.forward(x.clone())));
        let h = self.norm2.forward(self.conv2.forward(h));
        self.activation.forward(x + h)
    }
}

#[derive(Module, Debug)]
pub struct VoxResNet<B: Backend> {
    pub stem:       Conv3d<B>,
    pub stem_norm:  BatchNorm<B, 3>,
    pub blocks:     Vec<ResidualBlock<B>>,
    pub head:       Conv3d<B>,
    pub activation: Relu,
}

impl<B: Backend> VoxResNet<B> {
    /// volumes: [N, C, X, Y, Z] → logits: [N, num_classes, X, Y, Z]
    pub fn forward(&self, volumes: Tensor<B, 5>) -> Tensor<B, 5> {
        let mut x = self.activation.forward(self.stem_norm.forward(self.stem.forward(volumes)));
        for block in &self.blocks {
            x = block.forward(x);
        }
        self.head.forward(x)
    }
}

impl<B: Backend> SegmentationNetwork<B> for VoxResNet<B> {
    fn forward(&self, volumes: Tensor<B, 5>) -> Tensor<B, 5> {
        VoxResNet::forward(self, volumes)
    }
}
