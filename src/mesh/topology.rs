//! Half-edge topology.
//!
//! A [`Topology`] stores the pure combinatorics of a 2-manifold tiling: no
//! positions, no normals. Geometry lives in attribute arrays
//! (see [`VertexAttribute`](super::VertexAttribute)) indexed by the same ids.
//!
//! # Structure
//!
//! - Each undirected edge is two **half-edges** pointing in opposite directions.
//! - Each half-edge knows its **twin**, the **next** and **prev** half-edges
//!   around its face, its **origin** (near) vertex and its (near) **face**.
//! - Each vertex and face stores one incident half-edge and its degree.
//!
//! # Boundaries
//!
//! Open surfaces have one or more **external** faces, one per boundary loop.
//! External faces are ordinary faces in every navigational sense, so every
//! half-edge has a valid face and every vertex rotation is a closed cycle.
//!
//! # Wrapping
//!
//! Tilings of a wrapped plane (cylinder or torus) store one canonical position
//! per vertex. Each half-edge carries a [`WrapOffset`]: how many surface periods
//! must be added to the far vertex position to see it from the near vertex.

use std::ops::{Add, Neg, Sub};

use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use crate::error::{MeshError, Result};

/// Periodic image offset of a half-edge's far vertex, in surface periods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WrapOffset {
    /// Periods along the first surface axis.
    pub axis0: i32,
    /// Periods along the second surface axis.
    pub axis1: i32,
}

impl WrapOffset {
    /// The zero offset.
    pub const ZERO: WrapOffset = WrapOffset { axis0: 0, axis1: 0 };

    /// Create an offset from per-axis period counts.
    #[inline]
    pub const fn new(axis0: i32, axis1: i32) -> Self {
        Self { axis0, axis1 }
    }

    /// Check if this offset is zero on both axes.
    #[inline]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

impl Add for WrapOffset {
    type Output = WrapOffset;

    fn add(self, rhs: WrapOffset) -> WrapOffset {
        WrapOffset::new(self.axis0 + rhs.axis0, self.axis1 + rhs.axis1)
    }
}

impl Sub for WrapOffset {
    type Output = WrapOffset;

    fn sub(self, rhs: WrapOffset) -> WrapOffset {
        WrapOffset::new(self.axis0 - rhs.axis0, self.axis1 - rhs.axis1)
    }
}

impl Neg for WrapOffset {
    type Output = WrapOffset;

    fn neg(self) -> WrapOffset {
        WrapOffset::new(-self.axis0, -self.axis1)
    }
}

/// A vertex record.
#[derive(Debug, Clone, Copy)]
pub struct Vertex<I: MeshIndex = u32> {
    /// One outgoing half-edge.
    pub halfedge: HalfEdgeId<I>,

    /// Number of incident edges.
    pub degree: usize,
}

impl<I: MeshIndex> Default for Vertex<I> {
    fn default() -> Self {
        Self {
            halfedge: HalfEdgeId::invalid(),
            degree: 0,
        }
    }
}

/// A half-edge record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfEdge<I: MeshIndex = u32> {
    /// The vertex this half-edge leaves (its near vertex).
    pub origin: VertexId<I>,

    /// The opposite half-edge.
    pub twin: HalfEdgeId<I>,

    /// The next half-edge around the face.
    pub next: HalfEdgeId<I>,

    /// The previous half-edge around the face.
    pub prev: HalfEdgeId<I>,

    /// The face on this half-edge's side (its near face).
    pub face: FaceId<I>,

    /// Periodic offset of the far vertex relative to the near vertex.
    pub wrap: WrapOffset,
}

impl<I: MeshIndex> HalfEdge<I> {
    /// Create a new unlinked half-edge.
    pub fn new() -> Self {
        Self {
            origin: VertexId::invalid(),
            twin: HalfEdgeId::invalid(),
            next: HalfEdgeId::invalid(),
            prev: HalfEdgeId::invalid(),
            face: FaceId::invalid(),
            wrap: WrapOffset::ZERO,
        }
    }
}

impl<I: MeshIndex> Default for HalfEdge<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// A face record.
#[derive(Debug, Clone, Copy)]
pub struct Face<I: MeshIndex = u32> {
    /// One half-edge on the boundary of this face.
    pub halfedge: HalfEdgeId<I>,

    /// Number of boundary edges.
    pub degree: usize,

    /// Whether this face represents the outside of an open surface.
    pub external: bool,
}

impl<I: MeshIndex> Face<I> {
    /// Create a new face with the given half-edge.
    pub fn new(halfedge: HalfEdgeId<I>, degree: usize, external: bool) -> Self {
        Self {
            halfedge,
            degree,
            external,
        }
    }
}

/// Half-edge topology of a 2-manifold tiling.
///
/// Element counts are fixed once built; [`spin_edge_forward`](Self::spin_edge_forward)
/// and [`spin_edge_backward`](Self::spin_edge_backward) change connectivity only.
#[derive(Debug, Clone, Default)]
pub struct Topology<I: MeshIndex = u32> {
    pub(crate) vertices: Vec<Vertex<I>>,
    pub(crate) halfedges: Vec<HalfEdge<I>>,
    pub(crate) faces: Vec<Face<I>>,
}

impl<I: MeshIndex> Topology<I> {
    // ==================== Counts ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of half-edges.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Get the number of undirected edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.halfedges.len() / 2
    }

    /// Get the number of faces, internal and external.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of internal faces.
    pub fn num_internal_faces(&self) -> usize {
        self.faces.iter().filter(|f| !f.external).count()
    }

    /// Get the number of external faces.
    pub fn num_external_faces(&self) -> usize {
        self.faces.iter().filter(|f| f.external).count()
    }

    /// Euler characteristic `V - E + F`, counting external faces.
    pub fn euler_characteristic(&self) -> i64 {
        self.num_vertices() as i64 - self.num_edges() as i64 + self.num_faces() as i64
    }

    // ==================== Records ====================

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> &Vertex<I> {
        &self.vertices[id.index()]
    }

    /// Get a half-edge by ID.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId<I>) -> &HalfEdge<I> {
        &self.halfedges[id.index()]
    }

    /// Get a face by ID.
    #[inline]
    pub fn face(&self, id: FaceId<I>) -> &Face<I> {
        &self.faces[id.index()]
    }

    #[inline]
    pub(crate) fn vertex_mut(&mut self, id: VertexId<I>) -> &mut Vertex<I> {
        &mut self.vertices[id.index()]
    }

    #[inline]
    pub(crate) fn halfedge_mut(&mut self, id: HalfEdgeId<I>) -> &mut HalfEdge<I> {
        &mut self.halfedges[id.index()]
    }

    #[inline]
    pub(crate) fn face_mut(&mut self, id: FaceId<I>) -> &mut Face<I> {
        &mut self.faces[id.index()]
    }

    // ==================== Navigation ====================

    /// Get the twin (opposite) half-edge.
    #[inline]
    pub fn twin(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).twin
    }

    /// Get the next half-edge around the face.
    #[inline]
    pub fn next(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).next
    }

    /// Get the previous half-edge around the face.
    #[inline]
    pub fn prev(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).prev
    }

    /// Get the next outgoing half-edge around the origin vertex.
    #[inline]
    pub fn next_around_vertex(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.next(self.twin(he))
    }

    /// Get the previous outgoing half-edge around the origin vertex.
    #[inline]
    pub fn prev_around_vertex(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.twin(self.prev(he))
    }

    /// Get the vertex a half-edge leaves.
    #[inline]
    pub fn near_vertex(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.halfedge(he).origin
    }

    /// Get the vertex a half-edge points to.
    #[inline]
    pub fn far_vertex(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.near_vertex(self.twin(he))
    }

    /// Get the face on a half-edge's side.
    #[inline]
    pub fn near_face(&self, he: HalfEdgeId<I>) -> FaceId<I> {
        self.halfedge(he).face
    }

    /// Get the face on the twin's side.
    #[inline]
    pub fn far_face(&self, he: HalfEdgeId<I>) -> FaceId<I> {
        self.near_face(self.twin(he))
    }

    /// Get the wrap offset of a half-edge.
    #[inline]
    pub fn wrap(&self, he: HalfEdgeId<I>) -> WrapOffset {
        self.halfedge(he).wrap
    }

    /// Get the degree of a vertex.
    #[inline]
    pub fn vertex_degree(&self, v: VertexId<I>) -> usize {
        self.vertex(v).degree
    }

    /// Get the degree of a face.
    #[inline]
    pub fn face_degree(&self, f: FaceId<I>) -> usize {
        self.face(f).degree
    }

    /// Check if a face is external.
    #[inline]
    pub fn is_external_face(&self, f: FaceId<I>) -> bool {
        self.face(f).external
    }

    /// Check if either side of a half-edge is an external face.
    #[inline]
    pub fn is_boundary_halfedge(&self, he: HalfEdgeId<I>) -> bool {
        self.is_external_face(self.near_face(he)) || self.is_external_face(self.far_face(he))
    }

    /// Check if a vertex touches an external face.
    pub fn is_boundary_vertex(&self, v: VertexId<I>) -> bool {
        self.vertex_halfedges(v)
            .any(|he| self.is_external_face(self.near_face(he)))
    }

    /// Find the half-edge leading from `from` to `to`, if any.
    pub fn find_halfedge(&self, from: VertexId<I>, to: VertexId<I>) -> Option<HalfEdgeId<I>> {
        self.vertex_halfedges(from)
            .find(|&he| self.far_vertex(he) == to)
    }

    // ==================== Iteration ====================

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all half-edge IDs.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        (0..self.halfedges.len()).map(HalfEdgeId::new)
    }

    /// Iterate over one half-edge of each undirected edge.
    pub fn edge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        self.halfedge_ids().filter(move |&he| he < self.twin(he))
    }

    /// Iterate over all face IDs, internal and external.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// Iterate over internal face IDs.
    pub fn internal_face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.face_ids().filter(move |&f| !self.is_external_face(f))
    }

    /// Iterate over external face IDs.
    pub fn external_face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.face_ids().filter(move |&f| self.is_external_face(f))
    }

    /// Iterate over outgoing half-edges around a vertex.
    pub fn vertex_halfedges(&self, v: VertexId<I>) -> VertexHalfEdgeIter<'_, I> {
        VertexHalfEdgeIter::new(self, self.vertex(v).halfedge)
    }

    /// Iterate over vertices adjacent to a vertex.
    pub fn vertex_neighbors(&self, v: VertexId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.vertex_halfedges(v).map(|he| self.far_vertex(he))
    }

    /// Iterate over faces around a vertex, including external faces.
    pub fn vertex_faces(&self, v: VertexId<I>) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.vertex_halfedges(v).map(|he| self.near_face(he))
    }

    /// Iterate over the ring of edges one step beyond a vertex's neighbors.
    ///
    /// For each outgoing half-edge `e` this yields `next(e)`, which runs from the
    /// neighbor onward around the face between `e` and the following spoke.
    pub fn vertex_outer_halfedges(
        &self,
        v: VertexId<I>,
    ) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        self.vertex_halfedges(v).map(|he| self.next(he))
    }

    /// Iterate over half-edges around a face.
    pub fn face_halfedges(&self, f: FaceId<I>) -> FaceHalfEdgeIter<'_, I> {
        FaceHalfEdgeIter::new(self, self.face(f).halfedge)
    }

    /// Iterate over the corner vertices of a face.
    pub fn face_vertices(&self, f: FaceId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.face_halfedges(f).map(|he| self.near_vertex(he))
    }

    /// Iterate over faces sharing an edge with a face.
    pub fn face_neighbors(&self, f: FaceId<I>) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.face_halfedges(f).map(|he| self.far_face(he))
    }

    /// Iterate over the edges leading outward from each corner of a face.
    ///
    /// For each boundary half-edge `e` this yields `next(twin(e))`, the edge that
    /// leaves `e`'s origin on the far side of the face.
    pub fn face_outer_halfedges(&self, f: FaceId<I>) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        self.face_halfedges(f).map(|he| self.next_around_vertex(he))
    }

    // ==================== Validation ====================

    /// Check every structural invariant, reporting the first violation.
    pub fn validate(&self) -> Result<()> {
        let num_halfedges = self.halfedges.len();
        let in_range = |he: HalfEdgeId<I>| he.is_valid() && he.index() < num_halfedges;

        for (i, he) in self.halfedges.iter().enumerate() {
            let id = HalfEdgeId::<I>::new(i);
            if !in_range(he.twin) || !in_range(he.next) || !in_range(he.prev) {
                return Err(MeshError::non_manifold(format!("{:?} has a dangling link", id)));
            }
            if !he.origin.is_valid() || he.origin.index() >= self.vertices.len() {
                return Err(MeshError::non_manifold(format!("{:?} has no origin", id)));
            }
            if !he.face.is_valid() || he.face.index() >= self.faces.len() {
                return Err(MeshError::non_manifold(format!("{:?} has no face", id)));
            }
            if he.twin == id || self.twin(he.twin) != id {
                return Err(MeshError::non_manifold(format!("{:?} twin is not mutual", id)));
            }
            if self.prev(he.next) != id || self.next(he.prev) != id {
                return Err(MeshError::non_manifold(format!("{:?} next/prev mismatch", id)));
            }
            if self.near_face(he.next) != he.face {
                return Err(MeshError::non_manifold(format!("{:?} next leaves its face", id)));
            }
            if self.near_vertex(he.next) != self.far_vertex(id) {
                return Err(MeshError::non_manifold(format!("{:?} next is not chained", id)));
            }
            if self.wrap(he.twin) != -he.wrap {
                return Err(MeshError::non_manifold(format!("{:?} twin wrap is not opposite", id)));
            }
        }

        let mut seen = vec![false; num_halfedges];
        for (i, face) in self.faces.iter().enumerate() {
            let id = FaceId::<I>::new(i);
            if !in_range(face.halfedge) || self.near_face(face.halfedge) != id {
                return Err(MeshError::non_manifold(format!("{:?} has a foreign anchor", id)));
            }
            let count = self.face_halfedges(id).take(num_halfedges + 1).count();
            if count != face.degree {
                return Err(MeshError::non_manifold(format!(
                    "{:?} cycle has {} edges but degree {}",
                    id, count, face.degree
                )));
            }
            if !face.external && face.degree < 3 {
                return Err(MeshError::non_manifold(format!("{:?} has degree {}", id, face.degree)));
            }
            for he in self.face_halfedges(id) {
                seen[he.index()] = true;
            }
        }
        if let Some(orphan) = seen.iter().position(|s| !s) {
            return Err(MeshError::non_manifold(format!(
                "{:?} belongs to no face cycle",
                HalfEdgeId::<I>::new(orphan)
            )));
        }

        let mut degree_sum = 0;
        for (i, vertex) in self.vertices.iter().enumerate() {
            let id = VertexId::<I>::new(i);
            if !in_range(vertex.halfedge) || self.near_vertex(vertex.halfedge) != id {
                return Err(MeshError::non_manifold(format!("{:?} has a foreign anchor", id)));
            }
            let count = self.vertex_halfedges(id).take(num_halfedges + 1).count();
            if count != vertex.degree {
                return Err(MeshError::non_manifold(format!(
                    "{:?} rotation has {} edges but degree {}",
                    id, count, vertex.degree
                )));
            }
            if vertex.degree < 2 {
                return Err(MeshError::non_manifold(format!(
                    "{:?} has degree {}",
                    id, vertex.degree
                )));
            }
            degree_sum += vertex.degree;
        }
        if degree_sum != num_halfedges {
            return Err(MeshError::non_manifold(
                "vertex rotations do not cover every half-edge",
            ));
        }

        Ok(())
    }

    /// Check if all invariants hold.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Iterator over outgoing half-edges around a vertex.
pub struct VertexHalfEdgeIter<'a, I: MeshIndex = u32> {
    topology: &'a Topology<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    done: bool,
}

impl<'a, I: MeshIndex> VertexHalfEdgeIter<'a, I> {
    fn new(topology: &'a Topology<I>, start: HalfEdgeId<I>) -> Self {
        Self {
            topology,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }
}

impl<'a, I: MeshIndex> Iterator for VertexHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current;

        // twin(he) arrives back at the vertex; its successor leaves it again.
        self.current = self.topology.next_around_vertex(self.current);

        if self.current == self.start {
            self.done = true;
        }

        Some(result)
    }
}

/// Iterator over half-edges around a face.
pub struct FaceHalfEdgeIter<'a, I: MeshIndex = u32> {
    topology: &'a Topology<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    done: bool,
}

impl<'a, I: MeshIndex> FaceHalfEdgeIter<'a, I> {
    fn new(topology: &'a Topology<I>, start: HalfEdgeId<I>) -> Self {
        Self {
            topology,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }
}

impl<'a, I: MeshIndex> Iterator for FaceHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current;
        self.current = self.topology.next(self.current);

        if self.current == self.start {
            self.done = true;
        }

        Some(result)
    }
}
