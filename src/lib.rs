//! # Tessel
//!
//! A half-edge topology engine for tilings of planes and spheres.
//!
//! Tessel builds regular quad, hex and spherical tilings, edits them with
//! local edge spins, randomizes them into organic irregular tilings, and
//! answers ray-to-face queries against the result.
//!
//! ## Features
//!
//! - **Half-edge topology**: O(1) adjacency queries with type-safe indices
//! - **Wrapped surfaces**: cylinders and tori keep one copy of every vertex
//! - **Flexible indexing**: Support for 16-bit, 32-bit, and 64-bit indices
//! - **Randomization**: seeded vertex and face spins plus relaxation and fold repair
//! - **Picking**: bucketed ray-to-face lookup on planes and spheres
//!
//! ## Quick Start
//!
//! ```
//! use tessel::prelude::*;
//!
//! let grid: Grid = build_quad_grid(&QuadGridDescriptor::new(5, 3)).unwrap();
//!
//! assert_eq!(grid.topology.num_vertices(), 24);
//! assert_eq!(grid.topology.num_internal_faces(), 15);
//! assert_eq!(grid.topology.num_external_faces(), 1);
//! assert_eq!(grid.topology.num_edges(), 38);
//! ```
//!
//! ## Randomizing a Tiling
//!
//! ```
//! use tessel::prelude::*;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let desc = SphereDescriptor::default().with_subdivision(2);
//! let mut grid: Grid = build_sphere(&desc).unwrap();
//! let mut rng = ChaCha8Rng::seed_from_u64(1);
//!
//! let options = RandomizeOptions::default().with_vertex_degree(4, 7);
//! randomize_with_relaxation(
//!     &mut grid.topology,
//!     &mut grid.positions,
//!     &grid.surface,
//!     &options,
//!     &RelaxOptions::default(),
//!     &mut rng,
//! )
//! .unwrap();
//!
//! for v in grid.topology.vertex_ids() {
//!     assert!((4..=7).contains(&grid.topology.vertex_degree(v)));
//! }
//! ```
//!
//! ## Traversal
//!
//! ```
//! use tessel::prelude::*;
//!
//! let desc = HexGridDescriptor::new(3, 3).with_wrap(true, false);
//! let grid: Grid = build_hex_grid(&desc).unwrap();
//! let topology = &grid.topology;
//!
//! // Neighbors of a vertex
//! let v = VertexId::new(0);
//! assert_eq!(topology.vertex_neighbors(v).count(), topology.vertex_degree(v));
//!
//! // Corners of a face
//! let f = FaceId::new(0);
//! assert_eq!(topology.face_vertices(f).count(), 6);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod grid;
pub mod mesh;
pub mod spatial;
pub mod surface;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use tessel::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::randomize::{
        randomize, randomize_with_relaxation, randomize_with_relaxation_progress, DegreeBounds,
        RandomizeOptions, RandomizeStats,
    };
    pub use crate::algo::relax::{relax_positions, repair_positions, RelaxOptions, RelaxStats};
    pub use crate::algo::Progress;
    pub use crate::error::{MeshError, Result};
    pub use crate::grid::{
        build_grid, build_hex_grid, build_quad_grid, build_sphere, BasePolyhedron, Grid,
        GridDescriptor, HexGridDescriptor, QuadGridDescriptor, SphereDescriptor,
    };
    pub use crate::mesh::{
        FaceAttribute, FaceId, HalfEdgeId, MeshIndex, SpinDirection, SpinKind, Topology,
        VertexAttribute, VertexId, WrapOffset,
    };
    pub use crate::spatial::FacePartitioning;
    pub use crate::surface::{Ray, Surface};
}

// Re-export nalgebra types for convenience
pub use nalgebra;
