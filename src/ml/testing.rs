// ============================================================
// Test Fixtures — Stand-in Networks
// ============================================================
// Deterministic SegmentationNetwork implementations with known
// outputs, for inference, evaluation and trainer tests.

use std::cell::Cell;

use burn::{module::Param, prelude::*};

use crate::ml::model::SegmentationNetwork;

/// Returns its input unchanged and counts forward passes.
#[derive(Debug, Default)]
pub struct IdentityNet {
    calls: Cell<usize>,
}

impl IdentityNet {
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl<B: Backend> SegmentationNetwork<B> for IdentityNet {
    fn forward(&self, volumes: Tensor<B, 5>) -> Tensor<B, 5> {
        self.calls.set(self.calls.get() + 1);
        volumes
    }
}

/// Predicts class round(channel 0) for every voxel:
/// logit_k = -(x0 - k)².
#[derive(Debug, Clone, Copy)]
pub struct EchoClassNet {
    pub num_classes: usize,
}

impl<B: Backend> SegmentationNetwork<B> for EchoClassNet {
    fn forward(&self, volumes: Tensor<B, 5>) -> Tensor<B, 5> {
        let [n, _, x, y, z] = volumes.dims();
        let x0 = volumes.slice([0..n, 0..1, 0..x, 0..y, 0..z]);
        let logits = (0..self.num_classes)
            .map(|k| x0.clone().sub_scalar(k as f64).powf_scalar(2.0).neg())
            .collect();
        Tensor::cat(logits, 1)
    }
}

/// Predicts `class` everywhere.
#[derive(Debug, Clone, Copy)]
pub struct ConstantNet {
    pub class:       usize,
    pub num_classes: usize,
}

impl<B: Backend> SegmentationNetwork<B> for ConstantNet {
    fn forward(&self, volumes: Tensor<B, 5>) -> Tensor<B, 5> {
        let [n, _, x, y, z] = volumes.dims();
        let device = volumes.device();
        let logits = (0..self.num_classes)
            .map(|k| {
                let value = if k == self.class { 1.0 } else { 0.0 };
                Tensor::<B, 5>::full([n, 1, x, y, z], value, &device)
            })
            .collect();
        Tensor::cat(logits, 1)
    }
}

/// Trainable per-class bias broadcast over every voxel.
///
/// Starts with a margin of 10 on `class`, far more than a few
/// small Adam steps can move, so it keeps predicting `class`.
#[derive(Module, Debug)]
pub struct BiasNet<B: Backend> {
    bias: Param<Tensor<B, 1>>,
}

impl<B: Backend> BiasNet<B> {
    pub fn new(class: usize, num_classes: usize, device: &B::Device) -> Self {
        let values: Vec<f32> = (0..num_classes)
            .map(|k| if k == class { 10.0 } else { 0.0 })
            .collect();
        let bias = Tensor::<B, 1>::from_floats(values.as_slice(), device);
        Self { bias: Param::from_tensor(bias) }
    }
}

impl<B: Backend> SegmentationNetwork<B> for BiasNet<B> {
    fn forward(&self, volumes: Tensor<B, 5>) -> Tensor<B, 5> {
        let [n, _, x, y, z] = volumes.dims();
        let [k] = self.bias.val().dims();
        let zeros = Tensor::<B, 5>::zeros([n, k, x, y, z], &volumes.device());
        zeros + self.bias.val().reshape([1, k, 1, 1, 1])
    }
}
