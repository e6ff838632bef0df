// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing what the system works with:
// MRI volumes, label volumes, tumour regions and the Dice
// score used to grade a segmentation.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Everything here can be unit tested without a GPU.

// Volumes, label volumes and normalisation statistics
pub mod volume;

// Tumour sub-regions and their mask logic
pub mod region;

// Dice score accumulator
pub mod dice;

// Core abstractions (traits) that other layers implement
pub mod traits;
