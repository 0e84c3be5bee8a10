//! Topology construction from polygon lists.
//!
//! Every builder in the crate funnels through [`build_from_polygons`]: a list
//! of faces, each a counter-clockwise list of [`Corner`]s. A corner names a
//! vertex and the periodic image it is seen in, so a face that straddles the
//! seam of a wrapped surface can refer to the canonical vertex across the seam.
//! Boundary half-edges left without a twin are threaded into loops, one
//! external face per loop.

use std::collections::HashMap;

use log::debug;

use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use super::topology::{Face, HalfEdge, Topology, Vertex, WrapOffset};
use crate::error::{MeshError, Result};

/// One corner of an input polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Corner {
    /// Canonical vertex index.
    pub vertex: usize,
    /// Periodic image the vertex is seen in from this face.
    pub image: WrapOffset,
}

impl Corner {
    /// Create a corner seen in the given periodic image.
    pub const fn new(vertex: usize, image: WrapOffset) -> Self {
        Self { vertex, image }
    }
}

impl From<usize> for Corner {
    fn from(vertex: usize) -> Self {
        Self::new(vertex, WrapOffset::ZERO)
    }
}

/// Build a topology from plain vertex-index polygons on an unwrapped surface.
///
/// # Example
/// ```
/// use tessel::mesh::{build_from_faces, Topology};
///
/// let topology: Topology = build_from_faces(4, &[[0, 1, 2], [2, 1, 3]]).unwrap();
/// assert_eq!(topology.num_internal_faces(), 2);
/// assert_eq!(topology.num_external_faces(), 1);
/// ```
pub fn build_from_faces<I: MeshIndex, F: AsRef<[usize]>>(
    num_vertices: usize,
    faces: &[F],
) -> Result<Topology<I>> {
    let polygons: Vec<Vec<Corner>> = faces
        .iter()
        .map(|face| face.as_ref().iter().map(|&v| Corner::from(v)).collect())
        .collect();
    build_from_polygons(num_vertices, &polygons)
}

/// Build a topology from polygons whose corners may sit in periodic images.
///
/// Face `i` of the input becomes [`FaceId`] `i`; external faces follow.
pub fn build_from_polygons<I: MeshIndex, F: AsRef<[Corner]>>(
    num_vertices: usize,
    faces: &[F],
) -> Result<Topology<I>> {
    if faces.is_empty() {
        return Err(MeshError::invalid_topology("no faces"));
    }
    validate_polygons(num_vertices, faces)?;

    let num_corners: usize = faces.iter().map(|f| f.as_ref().len()).sum();
    let mut topology = Topology {
        vertices: vec![Vertex::default(); num_vertices],
        halfedges: Vec::with_capacity(num_corners * 2),
        faces: Vec::with_capacity(faces.len() + 2),
    };

    // Directed edge (near, far, wrap) -> half-edge
    let mut edge_map: HashMap<(usize, usize, WrapOffset), HalfEdgeId<I>> =
        HashMap::with_capacity(num_corners);

    // First pass: face cycles
    for (fi, face) in faces.iter().enumerate() {
        let corners = face.as_ref();
        let n = corners.len();
        let base = topology.halfedges.len();
        let face_id = FaceId::new(fi);
        topology.faces.push(Face::new(HalfEdgeId::new(base), n, false));

        for (k, corner) in corners.iter().enumerate() {
            let following = corners[(k + 1) % n];
            let wrap = following.image - corner.image;
            topology.halfedges.push(HalfEdge {
                origin: VertexId::new(corner.vertex),
                twin: HalfEdgeId::invalid(),
                next: HalfEdgeId::new(base + (k + 1) % n),
                prev: HalfEdgeId::new(base + (k + n - 1) % n),
                face: face_id,
                wrap,
            });

            let key = (corner.vertex, following.vertex, wrap);
            if edge_map.insert(key, HalfEdgeId::new(base + k)).is_some() {
                return Err(MeshError::non_manifold(format!(
                    "edge ({}, {}) is used twice in the same direction",
                    corner.vertex, following.vertex
                )));
            }
        }
    }

    // Second pass: twins, creating boundary half-edges where none exist
    let num_interior = topology.halfedges.len();
    let mut boundary: Vec<HalfEdgeId<I>> = Vec::new();
    for i in 0..num_interior {
        if topology.halfedges[i].twin.is_valid() {
            continue;
        }
        let he = HalfEdgeId::new(i);
        let near = topology.halfedges[i].origin;
        let far = topology.halfedges[topology.halfedges[i].next.index()].origin;
        let wrap = topology.halfedges[i].wrap;

        if let Some(&twin) = edge_map.get(&(far.index(), near.index(), -wrap)) {
            topology.halfedges[i].twin = twin;
            topology.halfedges[twin.index()].twin = he;
        } else {
            let bhe = HalfEdgeId::new(topology.halfedges.len());
            topology.halfedges.push(HalfEdge {
                origin: far,
                twin: he,
                wrap: -wrap,
                ..HalfEdge::new()
            });
            topology.halfedges[i].twin = bhe;
            boundary.push(bhe);
        }
    }

    link_boundary_loops(&mut topology, &boundary, num_interior)?;
    assign_vertex_rotations(&mut topology)?;

    debug!(
        "built topology: {} vertices, {} edges, {} internal faces, {} external faces",
        topology.num_vertices(),
        topology.num_edges(),
        faces.len(),
        topology.num_faces() - faces.len()
    );

    Ok(topology)
}

fn validate_polygons<F: AsRef<[Corner]>>(num_vertices: usize, faces: &[F]) -> Result<()> {
    for (fi, face) in faces.iter().enumerate() {
        let corners = face.as_ref();
        if corners.len() < 3 {
            return Err(MeshError::invalid_topology(format!(
                "face {} has {} corners, at least 3 required",
                fi,
                corners.len()
            )));
        }
        for (k, corner) in corners.iter().enumerate() {
            if corner.vertex >= num_vertices {
                return Err(MeshError::invalid_topology(format!(
                    "face {} references invalid vertex index {}",
                    fi, corner.vertex
                )));
            }
            if corners[..k].iter().any(|c| c.vertex == corner.vertex) {
                return Err(MeshError::invalid_topology(format!(
                    "face {} repeats vertex {}",
                    fi, corner.vertex
                )));
            }
        }
    }
    Ok(())
}

/// Thread boundary half-edges into loops and give each loop an external face.
fn link_boundary_loops<I: MeshIndex>(
    topology: &mut Topology<I>,
    boundary: &[HalfEdgeId<I>],
    num_interior: usize,
) -> Result<()> {
    let mut outgoing: HashMap<usize, HalfEdgeId<I>> = HashMap::with_capacity(boundary.len());
    for &bhe in boundary {
        let origin = topology.near_vertex(bhe).index();
        if outgoing.insert(origin, bhe).is_some() {
            return Err(MeshError::non_manifold(format!(
                "vertex {} touches the boundary more than once",
                origin
            )));
        }
    }

    for &bhe in boundary {
        // bhe runs b -> a opposite an interior a -> b; the loop continues from a.
        let far = topology.near_vertex(topology.twin(bhe)).index();
        let next = *outgoing.get(&far).ok_or_else(|| {
            MeshError::non_manifold(format!("boundary is broken at vertex {}", far))
        })?;
        topology.halfedge_mut(bhe).next = next;
        topology.halfedge_mut(next).prev = bhe;
    }

    let mut assigned = vec![false; boundary.len()];
    for &start in boundary {
        if assigned[start.index() - num_interior] {
            continue;
        }
        let face_id = FaceId::new(topology.faces.len());
        let mut degree = 0;
        let mut he = start;
        loop {
            assigned[he.index() - num_interior] = true;
            topology.halfedge_mut(he).face = face_id;
            degree += 1;
            he = topology.next(he);
            if he == start {
                break;
            }
            if degree > boundary.len() {
                return Err(MeshError::non_manifold("boundary loop does not close"));
            }
        }
        topology.faces.push(Face::new(start, degree, true));
    }

    Ok(())
}

/// Anchor each vertex on an outgoing half-edge and record its degree.
fn assign_vertex_rotations<I: MeshIndex>(topology: &mut Topology<I>) -> Result<()> {
    let mut outgoing_count = vec![0usize; topology.num_vertices()];
    for i in 0..topology.halfedges.len() {
        let origin = topology.halfedges[i].origin.index();
        if !topology.vertices[origin].halfedge.is_valid() {
            topology.vertices[origin].halfedge = HalfEdgeId::new(i);
        }
        outgoing_count[origin] += 1;
    }

    for (i, &count) in outgoing_count.iter().enumerate() {
        let v = VertexId::new(i);
        if count == 0 {
            return Err(MeshError::invalid_topology(format!(
                "vertex {} is not used by any face",
                i
            )));
        }
        let degree = topology.vertex_halfedges(v).take(count + 1).count();
        if degree != count {
            return Err(MeshError::non_manifold(format!(
                "vertex {} is not a single fan ({} of {} edges reachable)",
                i, degree, count
            )));
        }
        topology.vertex_mut(v).degree = degree;
    }

    Ok(())
}
