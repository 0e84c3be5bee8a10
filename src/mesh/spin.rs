//! Edge spin operators.
//!
//! A spin rotates an edge by one step around its neighborhood. There are two
//! kinds, dual to each other.
//!
//! A **vertex spin** walks the edge's endpoints around the polygon formed by
//! its two side faces. Spinning forward moves each endpoint one corner forward
//! along its own side face; spinning backward moves each one corner back. For
//! two triangles this is the classic edge flip.
//!
//! ```text
//!   s ---- u ---- p          s ---- u ---- p
//!   |      |      |          |  \          |
//!   |  R   |  L   |   fwd    |    \    L   |
//!   |      |      |   -->    |  R   \      |
//!   r ---- w ---- q          r ---- w ---- q
//! ```
//!
//! Above, the half-edge `u -> w` lies in `L`. A forward vertex spin turns it
//! into `s -> q`: `L` trades corner `w` for `s` and `R` trades `u` for `q`.
//! The two old endpoints lose one degree each, the two new endpoints gain one,
//! and both side faces keep their degree.
//!
//! A **face spin** walks the edge's side faces around the ring of faces
//! meeting at its endpoints. The endpoints stay, but each trades one of its
//! other edges with the opposite endpoint. Spinning `u -> w` forward hands
//! `next(he)` from `w` to `u` and `next(twin(he))` from `u` to `w`:
//!
//! ```text
//!   p           q          p       q
//!    \    L    /            \  L  /
//!     u ----- w               u
//!    /    R    \      fwd     |
//!   s           r             w
//!                            /  R  \
//!                           s       r
//! ```
//!
//! Both side faces lose one degree, the faces across the two endpoints gain
//! one, and every vertex keeps its degree. On a trivalent tiling this is the
//! only spin that keeps vertices trivalent.
//!
//! Spins are the only structural mutation in the crate. Every spin keeps the
//! half-edge ids: the spun half-edge still exists afterwards, so a backward
//! spin of the same id and kind undoes a forward one.

use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use super::topology::{Topology, WrapOffset};
use crate::error::{MeshError, Result};

/// The direction of a spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinDirection {
    /// Toward the half-edges that follow the spun edge.
    Forward,
    /// Toward the half-edges that precede the spun edge.
    Backward,
}

impl SpinDirection {
    /// The direction that undoes this one.
    pub fn reversed(self) -> Self {
        match self {
            SpinDirection::Forward => SpinDirection::Backward,
            SpinDirection::Backward => SpinDirection::Forward,
        }
    }
}

/// Which elements a spin moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinKind {
    /// The edge's endpoints move; face degrees are kept.
    Vertex,
    /// The edge's side faces move; vertex degrees are kept.
    Face,
}

impl<I: MeshIndex> Topology<I> {
    /// Spin an edge forward.
    ///
    /// The far end of `he` moves to the far vertex of `next(he)` and the near
    /// end moves to the far vertex of `next(twin(he))`. The half-edge ids are
    /// kept: `he` still lies in the same face afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidOperation`] and leaves the topology untouched
    /// if an endpoint has only two neighbors, both sides are the same face,
    /// the spin would connect a vertex to itself, or a side face would end up
    /// visiting a vertex twice.
    pub fn spin_edge_forward(&mut self, he: HalfEdgeId<I>) -> Result<()> {
        self.check_spin(he, SpinDirection::Forward)?;

        let t = self.twin(he);
        let left = self.near_face(he);
        let right = self.near_face(t);

        // left:  a (p -> u), he (u -> w), b (w -> q), b2 ...
        // right: c (r -> w), t (w -> u), d (u -> s), d2 ...
        let a = self.prev(he);
        let b = self.next(he);
        let b2 = self.next(b);
        let c = self.prev(t);
        let d = self.next(t);
        let d2 = self.next(d);

        let u = self.near_vertex(he);
        let w = self.near_vertex(t);
        let s = self.near_vertex(d2);
        let q = self.near_vertex(b2);

        // s -> u -> w -> q, seen from s
        let wrap = -self.wrap(d) + self.wrap(he) + self.wrap(b);

        self.link(a, d);
        self.link(d, he);
        self.link(he, b2);
        self.link(c, b);
        self.link(b, t);
        self.link(t, d2);

        self.halfedge_mut(d).face = left;
        self.halfedge_mut(b).face = right;

        self.halfedge_mut(he).origin = s;
        self.halfedge_mut(he).wrap = wrap;
        self.halfedge_mut(t).origin = q;
        self.halfedge_mut(t).wrap = -wrap;

        if self.face(left).halfedge == b {
            self.face_mut(left).halfedge = he;
        }
        if self.face(right).halfedge == d {
            self.face_mut(right).halfedge = t;
        }

        self.reanchor(u, he, d);
        self.reanchor(w, t, b);
        self.vertex_mut(u).degree -= 1;
        self.vertex_mut(w).degree -= 1;
        self.vertex_mut(s).degree += 1;
        self.vertex_mut(q).degree += 1;

        Ok(())
    }

    /// Spin an edge backward, the exact inverse of [`spin_edge_forward`](Self::spin_edge_forward).
    ///
    /// The near end of `he` moves to the near vertex of `prev(he)` and the far
    /// end moves to the near vertex of `prev(twin(he))`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`spin_edge_forward`](Self::spin_edge_forward).
    pub fn spin_edge_backward(&mut self, he: HalfEdgeId<I>) -> Result<()> {
        self.check_spin(he, SpinDirection::Backward)?;

        let t = self.twin(he);
        let left = self.near_face(he);
        let right = self.near_face(t);

        // left:  a2 ..., a (p -> u), he (u -> w), b (w -> q)
        // right: c2 ..., c (r -> w), t (w -> u), d (u -> s)
        let a = self.prev(he);
        let a2 = self.prev(a);
        let b = self.next(he);
        let c = self.prev(t);
        let c2 = self.prev(c);
        let d = self.next(t);

        let u = self.near_vertex(he);
        let w = self.near_vertex(t);
        let p = self.near_vertex(a);
        let r = self.near_vertex(c);

        // p -> u -> w -> r, seen from p
        let wrap = self.wrap(a) + self.wrap(he) - self.wrap(c);

        self.link(a2, he);
        self.link(he, c);
        self.link(c, b);
        self.link(c2, t);
        self.link(t, a);
        self.link(a, d);

        self.halfedge_mut(c).face = left;
        self.halfedge_mut(a).face = right;

        self.halfedge_mut(he).origin = p;
        self.halfedge_mut(he).wrap = wrap;
        self.halfedge_mut(t).origin = r;
        self.halfedge_mut(t).wrap = -wrap;

        if self.face(left).halfedge == a {
            self.face_mut(left).halfedge = he;
        }
        if self.face(right).halfedge == c {
            self.face_mut(right).halfedge = t;
        }

        self.reanchor(u, he, d);
        self.reanchor(w, t, b);
        self.vertex_mut(u).degree -= 1;
        self.vertex_mut(w).degree -= 1;
        self.vertex_mut(p).degree += 1;
        self.vertex_mut(r).degree += 1;

        Ok(())
    }

    /// Spin an edge in the given direction.
    pub fn spin_edge(&mut self, he: HalfEdgeId<I>, direction: SpinDirection) -> Result<()> {
        match direction {
            SpinDirection::Forward => self.spin_edge_forward(he),
            SpinDirection::Backward => self.spin_edge_backward(he),
        }
    }

    /// Spin the side faces of an edge forward.
    ///
    /// `next(he)` moves from the far end of `he` to its near end and
    /// `next(twin(he))` moves from the near end to the far end. Afterwards
    /// `he` lies in the face that held `twin(next(he))` and its twin lies in
    /// the face that held `twin(next(twin(he)))`.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidOperation`] and leaves the topology untouched
    /// if an endpoint has only two neighbors, both sides are the same face, a
    /// side face has only three edges, or a face that gains a corner already
    /// visits that vertex.
    pub fn spin_face_edge_forward(&mut self, he: HalfEdgeId<I>) -> Result<()> {
        self.check_face_spin(he, SpinDirection::Forward)?;

        let t = self.twin(he);
        let left = self.near_face(he);
        let right = self.near_face(t);
        let (new_left, new_right) = self.face_spin_target(he, SpinDirection::Forward);

        // left:  a (p -> u), he (u -> w), b (w -> q)
        // right: c (r -> w), t (w -> u), d (u -> s)
        let a = self.prev(he);
        let b = self.next(he);
        let c = self.prev(t);
        let d = self.next(t);
        let bt = self.twin(b);
        let dt = self.twin(d);
        let after_bt = self.next(bt);
        let after_dt = self.next(dt);

        let u = self.near_vertex(he);
        let w = self.near_vertex(t);

        // b becomes u -> q, d becomes w -> s
        let b_wrap = self.wrap(he) + self.wrap(b);
        let d_wrap = -self.wrap(he) + self.wrap(d);

        self.link(a, b);
        self.link(c, d);
        self.link(bt, he);
        self.link(he, after_bt);
        self.link(dt, t);
        self.link(t, after_dt);

        self.halfedge_mut(he).face = new_left;
        self.halfedge_mut(t).face = new_right;

        self.move_origin(b, u, b_wrap);
        self.move_origin(d, w, d_wrap);

        if self.face(left).halfedge == he {
            self.face_mut(left).halfedge = b;
        }
        if self.face(right).halfedge == t {
            self.face_mut(right).halfedge = d;
        }

        self.reanchor(u, d, he);
        self.reanchor(w, b, t);
        self.face_mut(left).degree -= 1;
        self.face_mut(right).degree -= 1;
        self.face_mut(new_left).degree += 1;
        self.face_mut(new_right).degree += 1;

        Ok(())
    }

    /// Spin the side faces of an edge backward, the exact inverse of
    /// [`spin_face_edge_forward`](Self::spin_face_edge_forward).
    ///
    /// `twin(prev(he))` moves from the near end of `he` to its far end and
    /// `twin(prev(twin(he)))` moves from the far end to the near end.
    ///
    /// # Errors
    ///
    /// Same conditions as [`spin_face_edge_forward`](Self::spin_face_edge_forward).
    pub fn spin_face_edge_backward(&mut self, he: HalfEdgeId<I>) -> Result<()> {
        self.check_face_spin(he, SpinDirection::Backward)?;

        let t = self.twin(he);
        let left = self.near_face(he);
        let right = self.near_face(t);
        let (new_left, new_right) = self.face_spin_target(he, SpinDirection::Backward);

        // left:  a (p -> u), he (u -> w), b (w -> q)
        // right: c (r -> w), t (w -> u), d (u -> s)
        let a = self.prev(he);
        let b = self.next(he);
        let c = self.prev(t);
        let d = self.next(t);
        let at = self.twin(a);
        let ct = self.twin(c);
        let before_at = self.prev(at);
        let before_ct = self.prev(ct);

        let u = self.near_vertex(he);
        let w = self.near_vertex(t);

        // twin(a) becomes w -> p, twin(c) becomes u -> r
        let at_wrap = -self.wrap(he) + self.wrap(at);
        let ct_wrap = self.wrap(he) + self.wrap(ct);

        self.link(a, b);
        self.link(c, d);
        self.link(before_at, he);
        self.link(he, at);
        self.link(before_ct, t);
        self.link(t, ct);

        self.halfedge_mut(he).face = new_left;
        self.halfedge_mut(t).face = new_right;

        self.move_origin(at, w, at_wrap);
        self.move_origin(ct, u, ct_wrap);

        if self.face(left).halfedge == he {
            self.face_mut(left).halfedge = b;
        }
        if self.face(right).halfedge == t {
            self.face_mut(right).halfedge = d;
        }

        self.reanchor(u, at, he);
        self.reanchor(w, ct, t);
        self.face_mut(left).degree -= 1;
        self.face_mut(right).degree -= 1;
        self.face_mut(new_left).degree += 1;
        self.face_mut(new_right).degree += 1;

        Ok(())
    }

    /// Spin the side faces of an edge in the given direction.
    pub fn spin_face_edge(&mut self, he: HalfEdgeId<I>, direction: SpinDirection) -> Result<()> {
        match direction {
            SpinDirection::Forward => self.spin_face_edge_forward(he),
            SpinDirection::Backward => self.spin_face_edge_backward(he),
        }
    }

    /// Spin an edge of either kind.
    pub fn spin(
        &mut self,
        he: HalfEdgeId<I>,
        kind: SpinKind,
        direction: SpinDirection,
    ) -> Result<()> {
        match kind {
            SpinKind::Vertex => self.spin_edge(he, direction),
            SpinKind::Face => self.spin_face_edge(he, direction),
        }
    }

    /// Check whether [`spin_edge_forward`](Self::spin_edge_forward) would succeed.
    pub fn can_spin_edge_forward(&self, he: HalfEdgeId<I>) -> bool {
        self.check_spin(he, SpinDirection::Forward).is_ok()
    }

    /// Check whether [`spin_edge_backward`](Self::spin_edge_backward) would succeed.
    pub fn can_spin_edge_backward(&self, he: HalfEdgeId<I>) -> bool {
        self.check_spin(he, SpinDirection::Backward).is_ok()
    }

    /// Check whether [`spin_face_edge_forward`](Self::spin_face_edge_forward) would succeed.
    pub fn can_spin_face_edge_forward(&self, he: HalfEdgeId<I>) -> bool {
        self.check_face_spin(he, SpinDirection::Forward).is_ok()
    }

    /// Check whether [`spin_face_edge_backward`](Self::spin_face_edge_backward) would succeed.
    pub fn can_spin_face_edge_backward(&self, he: HalfEdgeId<I>) -> bool {
        self.check_face_spin(he, SpinDirection::Backward).is_ok()
    }

    /// The faces `he` and its twin would lie in after a face spin, without
    /// mutating anything.
    pub fn face_spin_target(
        &self,
        he: HalfEdgeId<I>,
        direction: SpinDirection,
    ) -> (FaceId<I>, FaceId<I>) {
        let t = self.twin(he);
        match direction {
            SpinDirection::Forward => (
                self.far_face(self.next(he)),
                self.far_face(self.next(t)),
            ),
            SpinDirection::Backward => (
                self.far_face(self.prev(he)),
                self.far_face(self.prev(t)),
            ),
        }
    }

    /// The near and far vertices `he` would connect after a spin, without
    /// mutating anything.
    pub fn spin_target(
        &self,
        he: HalfEdgeId<I>,
        direction: SpinDirection,
    ) -> (VertexId<I>, VertexId<I>) {
        let t = self.twin(he);
        match direction {
            SpinDirection::Forward => (
                self.far_vertex(self.next(t)),
                self.far_vertex(self.next(he)),
            ),
            SpinDirection::Backward => (
                self.near_vertex(self.prev(he)),
                self.near_vertex(self.prev(t)),
            ),
        }
    }

    fn check_spin(&self, he: HalfEdgeId<I>, direction: SpinDirection) -> Result<()> {
        self.check_spin_sides(he)?;
        let t = self.twin(he);
        let left = self.near_face(he);
        let right = self.near_face(t);
        if self.face_degree(left) < 3 || self.face_degree(right) < 3 {
            return Err(MeshError::invalid_operation(format!(
                "cannot spin {:?}: a side face has fewer than three edges",
                he
            )));
        }

        let (new_near, new_far) = self.spin_target(he, direction);
        if new_near == new_far {
            return Err(MeshError::invalid_operation(format!(
                "cannot spin {:?}: it would join {:?} to itself",
                he, new_near
            )));
        }

        // Each side face trades one corner for a new one, which must not
        // already be among its other corners.
        let (left_gain, left_lost, right_gain, right_lost) = match direction {
            SpinDirection::Forward => (new_near, self.next(he), new_far, self.next(t)),
            SpinDirection::Backward => (new_far, he, new_near, t),
        };
        if self.has_other_corner(left, left_gain, left_lost)
            || self.has_other_corner(right, right_gain, right_lost)
        {
            return Err(MeshError::invalid_operation(format!(
                "cannot spin {:?}: a side face would visit a vertex twice",
                he
            )));
        }

        Ok(())
    }

    fn check_face_spin(&self, he: HalfEdgeId<I>, direction: SpinDirection) -> Result<()> {
        self.check_spin_sides(he)?;
        let t = self.twin(he);
        let left = self.near_face(he);
        let right = self.near_face(t);
        if self.face_degree(left) < 4 || self.face_degree(right) < 4 {
            return Err(MeshError::invalid_operation(format!(
                "cannot spin {:?}: a side face would drop below three edges",
                he
            )));
        }

        // Forward, the face taking `he` gains the near end and the one taking
        // the twin gains the far end; backward the other way round. Neither
        // may already visit the vertex it gains.
        let near = self.near_vertex(he);
        let far = self.near_vertex(t);
        let (new_left, new_right) = self.face_spin_target(he, direction);
        let (left_gain, right_gain) = match direction {
            SpinDirection::Forward => (near, far),
            SpinDirection::Backward => (far, near),
        };
        if self.face_vertices(new_left).any(|v| v == left_gain)
            || self.face_vertices(new_right).any(|v| v == right_gain)
        {
            return Err(MeshError::invalid_operation(format!(
                "cannot spin {:?}: a face would visit a vertex twice",
                he
            )));
        }

        Ok(())
    }

    /// Preconditions shared by both spin kinds.
    fn check_spin_sides(&self, he: HalfEdgeId<I>) -> Result<()> {
        let t = self.twin(he);
        let near = self.near_vertex(he);
        let far = self.near_vertex(t);

        if near == far {
            return Err(MeshError::invalid_operation(format!(
                "cannot spin {:?}: it is a loop at {:?}",
                he, near
            )));
        }
        if self.vertex_degree(near) <= 2 {
            return Err(MeshError::invalid_operation(format!(
                "cannot spin {:?}: near vertex {:?} has only {} neighbors",
                he,
                near,
                self.vertex_degree(near)
            )));
        }
        if self.vertex_degree(far) <= 2 {
            return Err(MeshError::invalid_operation(format!(
                "cannot spin {:?}: far vertex {:?} has only {} neighbors",
                he,
                far,
                self.vertex_degree(far)
            )));
        }

        let left = self.near_face(he);
        let right = self.near_face(t);
        if left == right {
            return Err(MeshError::invalid_operation(format!(
                "cannot spin {:?}: both sides are {:?}",
                he, left
            )));
        }

        Ok(())
    }

    fn has_other_corner(&self, f: FaceId<I>, v: VertexId<I>, skip: HalfEdgeId<I>) -> bool {
        self.face_halfedges(f)
            .any(|corner| corner != skip && self.near_vertex(corner) == v)
    }

    #[inline]
    fn link(&mut self, from: HalfEdgeId<I>, to: HalfEdgeId<I>) {
        self.halfedge_mut(from).next = to;
        self.halfedge_mut(to).prev = from;
    }

    #[inline]
    fn move_origin(&mut self, he: HalfEdgeId<I>, origin: VertexId<I>, wrap: WrapOffset) {
        let t = self.twin(he);
        self.halfedge_mut(he).origin = origin;
        self.halfedge_mut(he).wrap = wrap;
        self.halfedge_mut(t).wrap = -wrap;
    }

    #[inline]
    fn reanchor(&mut self, v: VertexId<I>, lost: HalfEdgeId<I>, replacement: HalfEdgeId<I>) {
        if self.vertex(v).halfedge == lost {
            self.vertex_mut(v).halfedge = replacement;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{build_hex_grid, Grid, HexGridDescriptor};
    use crate::mesh::build_from_faces;

    fn two_triangles() -> Topology {
        build_from_faces(4, &[[0, 1, 2], [2, 1, 3]]).unwrap()
    }

    fn degrees(topology: &Topology) -> Vec<usize> {
        topology.vertex_ids().map(|v| topology.vertex_degree(v)).collect()
    }

    fn shared_edge(topology: &Topology) -> HalfEdgeId {
        topology
            .find_halfedge(VertexId::new(2), VertexId::new(1))
            .unwrap()
    }

    #[test]
    fn test_spin_forward_two_triangles() {
        let mut topology = two_triangles();
        assert_eq!(degrees(&topology), vec![2, 3, 3, 2]);

        let he = shared_edge(&topology);
        topology.spin_edge_forward(he).unwrap();

        assert!(topology.is_valid());
        assert_eq!(degrees(&topology), vec![3, 2, 2, 3]);
        for f in topology.internal_face_ids() {
            assert_eq!(topology.face_degree(f), 3);
        }

        let mut ends = [topology.near_vertex(he).index(), topology.far_vertex(he).index()];
        ends.sort();
        assert_eq!(ends, [0, 3]);
    }

    #[test]
    fn test_spin_backward_two_triangles() {
        let mut topology = two_triangles();
        let he = shared_edge(&topology);
        topology.spin_edge_backward(he).unwrap();

        assert!(topology.is_valid());
        assert_eq!(degrees(&topology), vec![3, 2, 2, 3]);
    }

    #[test]
    fn test_spin_round_trip_restores_records() {
        let mut topology = two_triangles();
        let he = shared_edge(&topology);
        let before = topology.halfedges.clone();

        topology.spin_edge_forward(he).unwrap();
        topology.spin_edge_backward(he).unwrap();
        assert_eq!(topology.halfedges, before);

        topology.spin_edge_backward(he).unwrap();
        topology.spin_edge_forward(he).unwrap();
        assert_eq!(topology.halfedges, before);
        assert!(topology.is_valid());
    }

    #[test]
    fn test_single_triangle_cannot_spin() {
        let mut topology: Topology = build_from_faces(3, &[[0, 1, 2]]).unwrap();
        let edges: Vec<HalfEdgeId> = topology.halfedge_ids().collect();
        for he in edges {
            assert!(!topology.can_spin_edge_forward(he));
            assert!(matches!(
                topology.spin_edge_forward(he),
                Err(MeshError::InvalidOperation { .. })
            ));
            assert!(matches!(
                topology.spin_edge_backward(he),
                Err(MeshError::InvalidOperation { .. })
            ));
        }
        assert!(topology.is_valid());
    }

    #[test]
    fn test_spin_between_quads() {
        // 3x2 vertex strip of two quads sharing the edge 1-4.
        //   3 - 4 - 5
        //   |   |   |
        //   0 - 1 - 2
        let mut topology: Topology =
            build_from_faces(6, &[[0, 1, 4, 3], [1, 2, 5, 4]]).unwrap();
        // Vertices 1 and 4 have degree 3, so the shared edge can spin.
        let he = topology
            .find_halfedge(VertexId::new(1), VertexId::new(4))
            .unwrap();
        let (new_near, new_far) = topology.spin_target(he, SpinDirection::Forward);

        topology.spin_edge_forward(he).unwrap();
        assert!(topology.is_valid());
        assert_eq!(topology.near_vertex(he), new_near);
        assert_eq!(topology.far_vertex(he), new_far);
        assert_eq!(topology.vertex_degree(VertexId::new(1)), 2);
        assert_eq!(topology.vertex_degree(VertexId::new(4)), 2);
        for f in topology.internal_face_ids() {
            assert_eq!(topology.face_degree(f), 4);
        }
    }

    /// 4x4 vertices, 3x3 quads, numbered row by row.
    fn quad_patch() -> Topology {
        let faces: Vec<[usize; 4]> = (0..3)
            .flat_map(|y| (0..3).map(move |x| (x, y)))
            .map(|(x, y)| {
                let v = x + 4 * y;
                [v, v + 1, v + 5, v + 4]
            })
            .collect();
        build_from_faces(16, &faces).unwrap()
    }

    fn internal_face_degrees(topology: &Topology) -> Vec<usize> {
        let mut degrees: Vec<usize> = topology
            .internal_face_ids()
            .map(|f| topology.face_degree(f))
            .collect();
        degrees.sort();
        degrees
    }

    #[test]
    fn test_face_spin_forward_in_quad_patch() {
        let mut topology = quad_patch();
        let before = degrees(&topology);
        let he = topology
            .find_halfedge(VertexId::new(5), VertexId::new(6))
            .unwrap();
        let (new_left, new_right) = topology.face_spin_target(he, SpinDirection::Forward);

        topology.spin_face_edge_forward(he).unwrap();

        assert!(topology.is_valid(), "{:?}", topology.validate());
        assert_eq!(degrees(&topology), before);
        assert_eq!(topology.near_vertex(he), VertexId::new(5));
        assert_eq!(topology.far_vertex(he), VertexId::new(6));
        assert_eq!(topology.near_face(he), new_left);
        assert_eq!(topology.far_face(he), new_right);
        assert_eq!(topology.face_degree(new_left), 5);
        assert_eq!(topology.face_degree(new_right), 5);
        assert_eq!(internal_face_degrees(&topology), vec![3, 3, 4, 4, 4, 4, 4, 5, 5]);

        // 6 -> 10 moved to 5, 5 -> 1 moved to 6.
        let edge = |a: usize, b: usize| topology.find_halfedge(VertexId::new(a), VertexId::new(b));
        assert!(edge(5, 10).is_some());
        assert!(edge(6, 10).is_none());
        assert!(edge(6, 1).is_some());
        assert!(edge(5, 1).is_none());
        for he in topology.halfedge_ids() {
            assert!(topology.wrap(he).is_zero());
        }
    }

    #[test]
    fn test_face_spin_round_trip_on_hex_torus() {
        let grid: Grid =
            build_hex_grid(&HexGridDescriptor::new(4, 4).with_wrap(true, true)).unwrap();
        let mut topology = grid.topology;
        let he = topology.edge_ids().next().unwrap();
        let before = topology.halfedges.clone();
        let left = topology.near_face(he);
        let right = topology.far_face(he);

        topology.spin_face_edge_forward(he).unwrap();
        assert!(topology.is_valid(), "{:?}", topology.validate());
        assert!(topology.vertex_ids().all(|v| topology.vertex_degree(v) == 3));
        assert_eq!(topology.face_degree(left), 5);
        assert_eq!(topology.face_degree(right), 5);
        assert_eq!(topology.face_degree(topology.near_face(he)), 7);
        assert_eq!(topology.face_degree(topology.far_face(he)), 7);

        topology.spin_face_edge_backward(he).unwrap();
        assert_eq!(topology.halfedges, before);
        assert!(topology.face_ids().all(|f| topology.face_degree(f) == 6));

        topology.spin(he, SpinKind::Face, SpinDirection::Backward).unwrap();
        topology.spin(he, SpinKind::Face, SpinDirection::Forward).unwrap();
        assert_eq!(topology.halfedges, before);
        assert!(topology.is_valid());
    }

    #[test]
    fn test_face_spin_needs_room_in_side_faces() {
        let mut topology = two_triangles();
        let he = shared_edge(&topology);
        let before = topology.halfedges.clone();
        assert!(!topology.can_spin_face_edge_forward(he));
        assert!(!topology.can_spin_face_edge_backward(he));
        assert!(matches!(
            topology.spin_face_edge_forward(he),
            Err(MeshError::InvalidOperation { .. })
        ));
        assert_eq!(topology.halfedges, before);
    }

    #[test]
    fn test_face_spin_refuses_repeated_corner() {
        // The only faces across the ends of the shared edge are the single
        // external face, which already visits both ends.
        let mut topology: Topology =
            build_from_faces(6, &[[0, 1, 4, 3], [1, 2, 5, 4]]).unwrap();
        let he = topology
            .find_halfedge(VertexId::new(1), VertexId::new(4))
            .unwrap();
        assert!(matches!(
            topology.spin_face_edge_forward(he),
            Err(MeshError::InvalidOperation { .. })
        ));
        assert!(matches!(
            topology.spin_face_edge_backward(he),
            Err(MeshError::InvalidOperation { .. })
        ));
        assert!(topology.is_valid());
    }

    #[test]
    fn test_spin_direction_reversed() {
        assert_eq!(SpinDirection::Forward.reversed(), SpinDirection::Backward);
        assert_eq!(SpinDirection::Backward.reversed(), SpinDirection::Forward);
    }
}
