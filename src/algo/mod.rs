//! Algorithms over a tiling and its vertex positions.
//!
//! - **Attributes**: centroids, areas, normals and other derived geometry
//! - **Relaxation**: regularity and equal-area smoothing, fold repair
//! - **Randomization**: random edge spins under degree bounds
//!
//! Long-running algorithms accept a [`Progress`] reporter.

pub mod attributes;
pub mod progress;
pub mod randomize;
pub mod relax;

pub use progress::Progress;
