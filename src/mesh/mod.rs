//! Core topology data structures.
//!
//! This module provides the half-edge representation of a tiling and the
//! operations that construct and edit it.
//!
//! # Overview
//!
//! The primary type is [`Topology`], an arena of vertices, half-edges and
//! faces addressed by type-safe ids. Every half-edge belongs to a face: faces
//! inside the tiling are *internal*, and each boundary loop is closed off by
//! one *external* face. Each half-edge also carries a [`WrapOffset`] naming
//! the periodic image its far vertex is seen in, which is how tilings of a
//! cylinder or torus keep a single copy of every vertex.
//!
//! Geometry is not stored here. Positions and other per-element data live in
//! plain arrays (see [`VertexAttribute`]) indexed by the same ids.
//!
//! # Index Types
//!
//! - [`VertexId`] - Identifies a vertex
//! - [`HalfEdgeId`] - Identifies a half-edge
//! - [`FaceId`] - Identifies a face, internal or external
//!
//! These indices are generic over the underlying integer type ([`MeshIndex`] trait),
//! allowing you to choose `u16`, `u32`, or `u64` based on tiling size.
//!
//! # Construction
//!
//! ```
//! use tessel::mesh::{build_from_faces, Topology};
//!
//! let topology: Topology = build_from_faces(4, &[[0, 1, 2], [2, 1, 3]]).unwrap();
//! assert_eq!(topology.num_edges(), 5);
//! ```

mod attribute;
mod builder;
mod index;
mod spin;
mod topology;

pub use attribute::{EdgeAttribute, FaceAttribute, VertexAttribute};
pub use builder::{build_from_faces, build_from_polygons, Corner};
pub use index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
pub use spin::{SpinDirection, SpinKind};
pub use topology::{
    Face, FaceHalfEdgeIter, HalfEdge, Topology, Vertex, VertexHalfEdgeIter, WrapOffset,
};
