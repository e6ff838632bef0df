// ============================================================
// Layer 3 — Tumour Regions
// ============================================================
// BRATS annotates four classes per voxel:
//
//   0 = background
//   1 = necrotic / non-enhancing tumour core
//   2 = peritumoral edema
//   4 = GD-enhancing tumour
//
// Evaluation is done on three nested clinical regions rather
// than on the raw classes:
//
//   Whole tumour  = class > 0
//   Tumour core   = class > 0 and class != 2
//   Enhancing     = class == 4
//
// The same rule is applied to the prediction and to the label;
// each mask is derived from its own volume only.

use serde::{Deserialize, Serialize};

/// Class index of peritumoral edema (excluded from the core).
pub const EDEMA_CLASS: i64 = 2;

/// Class index of the enhancing tumour.
pub const ENHANCING_CLASS: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    Whole,
    Core,
    Enhancing,
}

impl Region {
    /// All regions in reporting order.
    pub const ALL: [Region; 3] = [Region::Whole, Region::Core, Region::Enhancing];

    pub fn contains(&self, class: i64) -> bool {
        match self {
            Region::Whole     => class > 0,
            Region::Core      => class > 0 && class != EDEMA_CLASS,
            Region::Enhancing => class == ENHANCING_CLASS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Whole     => "whole",
            Region::Core      => "core",
            Region::Enhancing => "enhancing",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean mask of `region` over a discrete class volume.
pub fn region_mask(classes: &[i64], region: Region) -> Vec<bool> {
    classes.iter().map(|&c| region.contains(c)).collect()
}
