//! Derived geometric attributes.
//!
//! Everything here is a pure function of a topology, its vertex positions and
//! the surface they live on. Wrapped edges are unrolled with
//! [`far_position`], so a face straddling a period seam is measured as one
//! contiguous polygon.
//!
//! External faces have no geometry of their own and get default values: the
//! origin for points and the zero vector for normals and bisectors.
//!
//! # Example
//!
//! ```
//! use tessel::prelude::*;
//! use tessel::algo::attributes::face_centroids;
//!
//! let grid: Grid = build_quad_grid(&QuadGridDescriptor::new(2, 2)).unwrap();
//! let centroids = face_centroids(&grid.topology, &grid.surface, &grid.positions).unwrap();
//! assert_eq!(centroids.len(), grid.topology.num_faces());
//! ```

use nalgebra::{Point3, Vector3};

use crate::error::{MeshError, Result};
use crate::mesh::{
    EdgeAttribute, FaceAttribute, FaceId, HalfEdgeId, MeshIndex, Topology, VertexAttribute,
};
use crate::surface::Surface;

/// Vertex positions, one per vertex.
pub type Positions = VertexAttribute<Point3<f64>>;

/// Position of the far vertex of `he` as seen from its near vertex.
#[inline]
pub fn far_position<I: MeshIndex>(
    topology: &Topology<I>,
    surface: &Surface,
    positions: &Positions,
    he: HalfEdgeId<I>,
) -> Point3<f64> {
    positions[topology.far_vertex(he)] + surface.offset(topology.wrap(he))
}

/// Corner positions of a face, unrolled into the frame of the origin of
/// `face.halfedge`.
pub fn face_polygon<I: MeshIndex>(
    topology: &Topology<I>,
    surface: &Surface,
    positions: &Positions,
    f: FaceId<I>,
) -> Vec<Point3<f64>> {
    let mut polygon = Vec::with_capacity(topology.face_degree(f));
    let mut shift = Vector3::zeros();
    for he in topology.face_halfedges(f) {
        polygon.push(positions[topology.near_vertex(he)] + shift);
        shift += surface.offset(topology.wrap(he));
    }
    polygon
}

/// Mean of a polygon's corners.
pub fn polygon_centroid(polygon: &[Point3<f64>]) -> Point3<f64> {
    if polygon.is_empty() {
        return Point3::origin();
    }
    let sum = polygon
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / polygon.len() as f64)
}

/// Newell's vector of a polygon: twice its area along its normal.
pub fn polygon_newell(polygon: &[Point3<f64>]) -> Vector3<f64> {
    let n = polygon.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal
}

/// Centroid of every face.
pub fn face_centroids<I: MeshIndex>(
    topology: &Topology<I>,
    surface: &Surface,
    positions: &Positions,
) -> Result<FaceAttribute<Point3<f64>>> {
    check_positions(topology, positions)?;
    Ok(topology
        .face_ids()
        .map(|f| {
            if topology.is_external_face(f) {
                Point3::origin()
            } else {
                polygon_centroid(&face_polygon(topology, surface, positions, f))
            }
        })
        .collect::<Vec<_>>()
        .into())
}

/// Area of every face, measured as a flat polygon.
pub fn face_areas<I: MeshIndex>(
    topology: &Topology<I>,
    surface: &Surface,
    positions: &Positions,
) -> Result<FaceAttribute<f64>> {
    check_positions(topology, positions)?;
    Ok(topology
        .face_ids()
        .map(|f| {
            if topology.is_external_face(f) {
                0.0
            } else {
                polygon_newell(&face_polygon(topology, surface, positions, f)).norm() * 0.5
            }
        })
        .collect::<Vec<_>>()
        .into())
}

/// Surface normal at every face centroid.
pub fn face_normals<I: MeshIndex>(
    topology: &Topology<I>,
    surface: &Surface,
    positions: &Positions,
) -> Result<FaceAttribute<Vector3<f64>>> {
    let centroids = face_centroids(topology, surface, positions)?;
    Ok(topology
        .face_ids()
        .map(|f| {
            if topology.is_external_face(f) {
                Vector3::zeros()
            } else {
                surface.normal_at(&centroids[f])
            }
        })
        .collect::<Vec<_>>()
        .into())
}

/// Surface normal at every vertex.
pub fn vertex_normals<I: MeshIndex>(
    topology: &Topology<I>,
    surface: &Surface,
    positions: &Positions,
) -> Result<VertexAttribute<Vector3<f64>>> {
    check_positions(topology, positions)?;
    Ok(positions
        .iter()
        .map(|p| surface.normal_at(p))
        .collect::<Vec<_>>()
        .into())
}

/// Area-weighted average of the geometric normals of the faces around
/// every vertex.
///
/// Unlike [`vertex_normals`] this follows the tiling rather than the
/// underlying surface, so it shows where relaxation has folded a face over.
pub fn vertex_normals_from_faces<I: MeshIndex>(
    topology: &Topology<I>,
    surface: &Surface,
    positions: &Positions,
) -> Result<VertexAttribute<Vector3<f64>>> {
    check_positions(topology, positions)?;
    let newell: Vec<Vector3<f64>> = topology
        .face_ids()
        .map(|f| {
            if topology.is_external_face(f) {
                Vector3::zeros()
            } else {
                polygon_newell(&face_polygon(topology, surface, positions, f))
            }
        })
        .collect();

    Ok(topology
        .vertex_ids()
        .map(|v| {
            let sum = topology
                .vertex_faces(v)
                .fold(Vector3::zeros(), |acc, f| acc + newell[f.index()]);
            sum.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros)
        })
        .collect::<Vec<_>>()
        .into())
}

/// Midpoint of every half-edge, in the frame of its near vertex.
pub fn edge_midpoints<I: MeshIndex>(
    topology: &Topology<I>,
    surface: &Surface,
    positions: &Positions,
) -> Result<EdgeAttribute<Point3<f64>>> {
    check_positions(topology, positions)?;
    Ok(topology
        .halfedge_ids()
        .map(|he| {
            let a = positions[topology.near_vertex(he)];
            let b = far_position(topology, surface, positions, he);
            Point3::from((a.coords + b.coords) * 0.5)
        })
        .collect::<Vec<_>>()
        .into())
}

/// Unit bisector of the face corner at the near vertex of every half-edge,
/// pointing into the face.
pub fn edge_bisectors<I: MeshIndex>(
    topology: &Topology<I>,
    surface: &Surface,
    positions: &Positions,
) -> Result<EdgeAttribute<Vector3<f64>>> {
    check_positions(topology, positions)?;
    Ok(topology
        .halfedge_ids()
        .map(|he| {
            if topology.is_external_face(topology.near_face(he)) {
                Vector3::zeros()
            } else {
                corner_bisector(topology, surface, positions, he)
            }
        })
        .collect::<Vec<_>>()
        .into())
}

fn corner_bisector<I: MeshIndex>(
    topology: &Topology<I>,
    surface: &Surface,
    positions: &Positions,
    he: HalfEdgeId<I>,
) -> Vector3<f64> {
    let p = positions[topology.near_vertex(he)];
    let prev = topology.prev(he);
    let prev_pos =
        positions[topology.near_vertex(prev)] - surface.offset(topology.wrap(prev));

    let normal = surface.normal_at(&p);
    let (Some(out), Some(back)) = (
        (far_position(topology, surface, positions, he) - p).try_normalize(f64::EPSILON),
        (prev_pos - p).try_normalize(f64::EPSILON),
    ) else {
        return Vector3::zeros();
    };

    let bisector = match (out + back).try_normalize(1e-9) {
        Some(b) => b,
        // Straight corner: the inward side is to the left of the outgoing edge.
        None => {
            return normal
                .cross(&out)
                .try_normalize(f64::EPSILON)
                .unwrap_or_else(Vector3::zeros)
        }
    };
    if out.cross(&back).dot(&normal) < 0.0 {
        -bisector
    } else {
        bisector
    }
}

/// Mean length of all edges, measured across wrap seams.
pub fn average_edge_length<I: MeshIndex>(
    topology: &Topology<I>,
    surface: &Surface,
    positions: &Positions,
) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for he in topology.edge_ids() {
        let a = positions[topology.near_vertex(he)];
        total += (far_position(topology, surface, positions, he) - a).norm();
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

pub(crate) fn check_positions<I: MeshIndex>(
    topology: &Topology<I>,
    positions: &Positions,
) -> Result<()> {
    MeshError::check_len("positions", topology.num_vertices(), positions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{build_quad_grid, Grid, QuadGridDescriptor};
    use approx::assert_relative_eq;

    fn unit_grid(width: usize, height: usize, wrap0: bool) -> Grid {
        build_quad_grid(
            &QuadGridDescriptor::new(width, height).with_wrap(wrap0, false),
        )
        .unwrap()
    }

    #[test]
    fn test_centroids_and_areas() {
        let grid = unit_grid(2, 1, false);
        let centroids = face_centroids(&grid.topology, &grid.surface, &grid.positions).unwrap();
        let areas = face_areas(&grid.topology, &grid.surface, &grid.positions).unwrap();

        assert_relative_eq!(centroids[0], Point3::new(0.5, 0.5, 0.0), epsilon = 1e-12);
        assert_relative_eq!(centroids[1], Point3::new(1.5, 0.5, 0.0), epsilon = 1e-12);
        for f in grid.topology.internal_face_ids() {
            assert_relative_eq!(areas[f], 1.0, epsilon = 1e-12);
        }
        for f in grid.topology.external_face_ids() {
            assert_eq!(areas[f], 0.0);
        }
    }

    #[test]
    fn test_wrapped_face_is_unrolled() {
        let grid = unit_grid(3, 1, true);
        let areas = face_areas(&grid.topology, &grid.surface, &grid.positions).unwrap();
        let centroids = face_centroids(&grid.topology, &grid.surface, &grid.positions).unwrap();
        // The last column straddles the seam and must still be a unit square.
        let last: FaceId = FaceId::new(2);
        assert_relative_eq!(areas[last], 1.0, epsilon = 1e-12);
        assert_relative_eq!(centroids[last], Point3::new(2.5, 0.5, 0.0), epsilon = 1e-12);
        assert_relative_eq!(
            average_edge_length(&grid.topology, &grid.surface, &grid.positions),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_normals_follow_surface() {
        let grid = unit_grid(2, 2, false);
        let normals = vertex_normals(&grid.topology, &grid.surface, &grid.positions).unwrap();
        let from_faces =
            vertex_normals_from_faces(&grid.topology, &grid.surface, &grid.positions).unwrap();
        for v in grid.topology.vertex_ids() {
            assert_relative_eq!(normals[v], Vector3::z());
            assert_relative_eq!(from_faces[v], Vector3::z(), epsilon = 1e-12);
        }
        let face_normals = face_normals(&grid.topology, &grid.surface, &grid.positions).unwrap();
        assert_relative_eq!(face_normals[0], Vector3::z());
    }

    #[test]
    fn test_bisectors_point_inward() {
        let grid = unit_grid(1, 1, false);
        let bisectors = edge_bisectors(&grid.topology, &grid.surface, &grid.positions).unwrap();
        let centroids = face_centroids(&grid.topology, &grid.surface, &grid.positions).unwrap();
        for he in grid.topology.face_halfedges(FaceId::new(0)) {
            let p = grid.positions[grid.topology.near_vertex(he)];
            let to_center = (centroids[0] - p).normalize();
            assert_relative_eq!(bisectors[he], to_center, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_midpoints() {
        let grid = unit_grid(1, 1, false);
        let midpoints = edge_midpoints(&grid.topology, &grid.surface, &grid.positions).unwrap();
        for he in grid.topology.halfedge_ids() {
            let twin = grid.topology.twin(he);
            assert_relative_eq!(midpoints[he], midpoints[twin], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_length_mismatch() {
        let grid = unit_grid(1, 1, false);
        let short: Positions = vec![Point3::origin(); 2].into();
        assert!(matches!(
            face_centroids(&grid.topology, &grid.surface, &short),
            Err(MeshError::PreconditionViolation { .. })
        ));
    }
}
