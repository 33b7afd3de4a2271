//! Parallel value kernels for sparsemerge (pure Rust, rayon-parallel)
//!
//! The entry point is [`add_phase2`], which fills in the values of
//! `C = A + B` or `C<M> = A + B` once the output structure is known.

pub mod add;
pub mod utility;

pub use add::resolve::{resolve, AddStrategy, GenericPlan};
pub use add::shell::OutputShell;
pub use add::task::{partition_output, AddTask};
pub use add::{add_phase2, AddAnalysis, AddOptions, Mask};
pub use utility::prune::prune_empty_vectors;
