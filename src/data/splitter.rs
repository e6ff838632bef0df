// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Splits the sorted subject folders of each tumour grade by a
// fixed prefix count:
//
//   HGG: [h0 h1 h2 ... h199 | h200 ...]     first 200 → train
//   LGG: [l0 l1 ... l49     | l50 ...]      first  50 → train
//
//   train = HGG[..200] ++ LGG[..50]
//   val   = HGG[200..] ++ LGG[50..]
//
// There is no shuffling: discovery sorts the folders, so the
// split is a pure function of what is on disk. Counts larger
// than a list take the whole list and leave nothing for val.
//
// Invariants:
//   train ∩ val = ∅
//   train ∪ val = HGG ∪ LGG
//
// Reference: Rust Book §8 (Vectors)

use serde::{Deserialize, Serialize};

/// How many subjects of each grade go to training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitCounts {
    pub hgg: usize,
    pub lgg: usize,
}

impl Default for SplitCounts {
    fn default() -> Self {
        Self { hgg: 200, lgg: 50 }
    }
}

/// A disjoint partition of the discovered subjects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split<T> {
    pub train: Vec<T>,
    pub val:   Vec<T>,
}

/// Split `items` into its first `count` elements and the rest.
pub fn split_prefix<T>(mut items: Vec<T>, count: usize) -> (Vec<T>, Vec<T>) {
    // split_off(n) removes elements [n..] and returns them
    let rest = items.split_off(count.min(items.len()));
    (items, rest)
}

/// Fixed-count split per grade, HGG before LGG in both halves.
pub fn split_by_grade<T>(hgg: Vec<T>, lgg: Vec<T>, counts: SplitCounts) -> Split<T> {
    let (mut train, mut val) = split_prefix(hgg, counts.hgg);
    let (lgg_train, lgg_val) = split_prefix(lgg, counts.lgg);
    train.extend(lgg_train);
    val.extend(lgg_val);

    tracing::debug!("Dataset split: {} training, {} validation", train.len(), val.len());

    Split { train, val }
}
