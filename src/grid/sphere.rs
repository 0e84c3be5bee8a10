//! Tiled spheres.
//!
//! A sphere starts from one of the five regular polyhedra, scaled onto the
//! sphere. Subdivision splits every edge into equal segments and fills each
//! face with a regular pattern of smaller faces, projecting every new vertex
//! onto the sphere. The dual of a subdivided icosahedron is the familiar
//! "goldberg" tiling of twelve pentagons among hexagons.

use std::collections::HashMap;

use log::debug;
use nalgebra::{Point3, Vector3};

use super::Grid;
use crate::algo::attributes::{face_polygon, polygon_centroid, polygon_newell};
use crate::error::{MeshError, Result};
use crate::mesh::{
    build_from_faces, build_from_polygons, Corner, MeshIndex, Topology, VertexAttribute, WrapOffset,
};
use crate::surface::{SphericalSurface, Surface};

/// The regular polyhedra a sphere can start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BasePolyhedron {
    /// 4 triangles.
    Tetrahedron,
    /// 6 squares.
    Cube,
    /// 8 triangles.
    Octahedron,
    /// 12 pentagons.
    Dodecahedron,
    /// 20 triangles.
    #[default]
    Icosahedron,
}

/// Description of a tiled sphere.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereDescriptor {
    /// Center of the sphere.
    pub center: Point3<f64>,
    /// Radius of the sphere.
    pub radius: f64,
    /// Polyhedron to start from.
    pub base: BasePolyhedron,
    /// Number of extra vertices inserted along every base edge.
    pub subdivision: usize,
    /// Whether to replace the result by its dual.
    pub dual: bool,
}

impl Default for SphereDescriptor {
    fn default() -> Self {
        Self {
            center: Point3::origin(),
            radius: 1.0,
            base: BasePolyhedron::Icosahedron,
            subdivision: 0,
            dual: false,
        }
    }
}

impl SphereDescriptor {
    /// A unit sphere built from `base`.
    pub fn new(base: BasePolyhedron) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    /// Set the center.
    pub fn with_center(mut self, center: Point3<f64>) -> Self {
        self.center = center;
        self
    }

    /// Set the radius.
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Set the subdivision degree.
    pub fn with_subdivision(mut self, subdivision: usize) -> Self {
        self.subdivision = subdivision;
        self
    }

    /// Set whether to take the dual.
    pub fn with_dual(mut self, dual: bool) -> Self {
        self.dual = dual;
        self
    }
}

/// Build a tiled sphere.
///
/// # Errors
///
/// Returns [`MeshError::InvalidTopology`] if the radius is not a positive
/// finite number or the center is not finite.
///
/// # Example
///
/// ```
/// use tessel::grid::{build_sphere, Grid, SphereDescriptor};
///
/// let desc = SphereDescriptor::default().with_subdivision(2).with_dual(true);
/// let grid: Grid = build_sphere(&desc).unwrap();
/// assert_eq!(grid.topology.num_faces(), 92);
/// ```
pub fn build_sphere<I: MeshIndex>(desc: &SphereDescriptor) -> Result<Grid<I>> {
    if !(desc.radius.is_finite() && desc.radius > 0.0) {
        return Err(MeshError::invalid_topology(format!(
            "sphere radius must be positive and finite, got {}",
            desc.radius
        )));
    }
    if !desc.center.iter().all(|c| c.is_finite()) {
        return Err(MeshError::invalid_topology("sphere center must be finite"));
    }

    let sphere = SphericalSurface {
        center: desc.center,
        radius: desc.radius,
    };
    let surface = Surface::Spherical(sphere);

    debug!(
        "Building {:?} sphere (subdivision {}, dual {})",
        desc.base, desc.subdivision, desc.dual
    );

    let (points, faces) = base_polyhedron(&sphere, desc.base)?;
    let (points, faces) = subdivide_polygons(&sphere, points, faces, desc.subdivision);
    let topology = build_from_faces(points.len(), &faces)?;
    let grid = Grid {
        topology,
        positions: points.into(),
        surface,
    };

    if desc.dual {
        dual_of(&grid.topology, &grid.positions, &grid.surface)
    } else {
        Ok(grid)
    }
}

/// Subdivide every face of a sphere grid.
///
/// Every edge is split into `degree + 1` segments. Triangles become
/// `(degree + 1)^2` triangles, quads `(degree + 1)^2` quads, and larger
/// faces are first fanned into triangles around their centroid.
///
/// # Errors
///
/// Returns [`MeshError::InvalidOperation`] if the grid is not spherical, and
/// [`MeshError::PreconditionViolation`] if `positions` does not match.
pub fn subdivide<I: MeshIndex>(grid: &Grid<I>, degree: usize) -> Result<Grid<I>> {
    let Surface::Spherical(sphere) = grid.surface else {
        return Err(MeshError::invalid_operation(
            "subdivision is only defined for spherical grids",
        ));
    };
    MeshError::check_len(
        "positions",
        grid.topology.num_vertices(),
        grid.positions.len(),
    )?;

    let faces: Vec<Vec<usize>> = grid
        .topology
        .internal_face_ids()
        .map(|f| grid.topology.face_vertices(f).map(|v| v.index()).collect())
        .collect();
    let (points, faces) =
        subdivide_polygons(&sphere, grid.positions.as_slice().to_vec(), faces, degree);
    let topology = build_from_faces(points.len(), &faces)?;
    Ok(Grid {
        topology,
        positions: points.into(),
        surface: grid.surface,
    })
}

/// Build the dual of a closed tiling.
///
/// Every face becomes a vertex at its (projected) centroid and every vertex
/// becomes a face through the centroids of the faces around it. Face `i` of
/// the input becomes vertex `i` of the output and vertex `j` becomes face `j`.
/// Wrapped planar tilings (tori) are supported.
///
/// # Errors
///
/// Returns [`MeshError::InvalidTopology`] if the tiling has a boundary or a
/// vertex of degree two, and [`MeshError::PreconditionViolation`] if
/// `positions` does not match.
pub fn dual_of<I: MeshIndex>(
    topology: &Topology<I>,
    positions: &VertexAttribute<Point3<f64>>,
    surface: &Surface,
) -> Result<Grid<I>> {
    MeshError::check_len("positions", topology.num_vertices(), positions.len())?;
    if topology.num_external_faces() > 0 {
        return Err(MeshError::invalid_topology(format!(
            "dual needs a closed tiling, this one has {} boundary loops",
            topology.num_external_faces()
        )));
    }

    // Face centroids, each in the frame of the face's anchor corner, plus the
    // periodic offset of every corner relative to that anchor.
    let mut centroids = Vec::with_capacity(topology.num_faces());
    let mut corner_shift = vec![WrapOffset::ZERO; topology.num_halfedges()];
    for f in topology.face_ids() {
        let polygon = face_polygon(topology, surface, positions, f);
        centroids.push(surface.project(&polygon_centroid(&polygon)));

        let mut shift = WrapOffset::ZERO;
        for he in topology.face_halfedges(f) {
            corner_shift[he.index()] = shift;
            shift = shift + topology.wrap(he);
        }
    }

    // Faces around a vertex come clockwise; the dual face must be
    // counter-clockwise.
    let polygons: Vec<Vec<Corner>> = topology
        .vertex_ids()
        .map(|v| {
            let mut ring: Vec<Corner> = topology
                .vertex_halfedges(v)
                .map(|he| Corner::new(topology.near_face(he).index(), -corner_shift[he.index()]))
                .collect();
            ring.reverse();
            ring
        })
        .collect();

    let dual = build_from_polygons(centroids.len(), &polygons)?;
    debug!(
        "Dual tiling: {} vertices, {} faces",
        dual.num_vertices(),
        dual.num_faces()
    );
    Ok(Grid {
        topology: dual,
        positions: centroids.into(),
        surface: *surface,
    })
}

fn base_polyhedron(
    sphere: &SphericalSurface,
    base: BasePolyhedron,
) -> Result<(Vec<Point3<f64>>, Vec<Vec<usize>>)> {
    let (raw, faces): (Vec<[f64; 3]>, Vec<Vec<usize>>) = match base {
        BasePolyhedron::Tetrahedron => (
            vec![
                [1.0, 1.0, 1.0],
                [1.0, -1.0, -1.0],
                [-1.0, 1.0, -1.0],
                [-1.0, -1.0, 1.0],
            ],
            vec![vec![0, 1, 2], vec![0, 2, 3], vec![0, 3, 1], vec![1, 3, 2]],
        ),
        BasePolyhedron::Octahedron | BasePolyhedron::Cube => (
            vec![
                [1.0, 0.0, 0.0],
                [-1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, -1.0, 0.0],
                [0.0, 0.0, 1.0],
                [0.0, 0.0, -1.0],
            ],
            vec![
                vec![4, 0, 2],
                vec![4, 2, 1],
                vec![4, 1, 3],
                vec![4, 3, 0],
                vec![5, 2, 0],
                vec![5, 1, 2],
                vec![5, 3, 1],
                vec![5, 0, 3],
            ],
        ),
        BasePolyhedron::Icosahedron | BasePolyhedron::Dodecahedron => {
            let phi = (1.0 + 5f64.sqrt()) / 2.0;
            (
                vec![
                    [-1.0, phi, 0.0],
                    [1.0, phi, 0.0],
                    [-1.0, -phi, 0.0],
                    [1.0, -phi, 0.0],
                    [0.0, -1.0, phi],
                    [0.0, 1.0, phi],
                    [0.0, -1.0, -phi],
                    [0.0, 1.0, -phi],
                    [phi, 0.0, -1.0],
                    [phi, 0.0, 1.0],
                    [-phi, 0.0, -1.0],
                    [-phi, 0.0, 1.0],
                ],
                vec![
                    vec![0, 11, 5],
                    vec![0, 5, 1],
                    vec![0, 1, 7],
                    vec![0, 7, 10],
                    vec![0, 10, 11],
                    vec![1, 5, 9],
                    vec![5, 11, 4],
                    vec![11, 10, 2],
                    vec![10, 7, 6],
                    vec![7, 1, 8],
                    vec![3, 9, 4],
                    vec![3, 4, 2],
                    vec![3, 2, 6],
                    vec![3, 6, 8],
                    vec![3, 8, 9],
                    vec![4, 9, 5],
                    vec![2, 4, 11],
                    vec![6, 2, 10],
                    vec![8, 6, 7],
                    vec![9, 8, 1],
                ],
            )
        }
    };

    let points: Vec<Point3<f64>> = raw
        .iter()
        .map(|&[x, y, z]| sphere.project(&(sphere.center + Vector3::new(x, y, z))))
        .collect();
    let faces = orient_outward(sphere, &points, faces);

    match base {
        BasePolyhedron::Cube | BasePolyhedron::Dodecahedron => {
            let topology: Topology<u32> = build_from_faces(points.len(), &faces)?;
            let surface = Surface::Spherical(*sphere);
            let positions: VertexAttribute<Point3<f64>> = points.into();
            let dual = dual_of(&topology, &positions, &surface)?;
            let faces = dual
                .topology
                .internal_face_ids()
                .map(|f| dual.topology.face_vertices(f).map(|v| v.index()).collect())
                .collect();
            Ok((dual.positions.into_vec(), faces))
        }
        _ => Ok((points, faces)),
    }
}

fn orient_outward(
    sphere: &SphericalSurface,
    points: &[Point3<f64>],
    faces: Vec<Vec<usize>>,
) -> Vec<Vec<usize>> {
    faces
        .into_iter()
        .map(|mut face| {
            let polygon: Vec<Point3<f64>> = face.iter().map(|&v| points[v]).collect();
            let outward = polygon_centroid(&polygon) - sphere.center;
            if polygon_newell(&polygon).dot(&outward) < 0.0 {
                face.reverse();
            }
            face
        })
        .collect()
}

/// Shared interior points of split edges.
struct EdgeSplitter<'a> {
    sphere: &'a SphericalSurface,
    segments: usize,
    interior: HashMap<(usize, usize), Vec<usize>>,
}

impl<'a> EdgeSplitter<'a> {
    fn new(sphere: &'a SphericalSurface, segments: usize) -> Self {
        Self {
            sphere,
            segments,
            interior: HashMap::new(),
        }
    }

    /// Point `k` of `segments + 1` along the edge from `a` to `b`.
    fn point(&mut self, points: &mut Vec<Point3<f64>>, a: usize, b: usize, k: usize) -> usize {
        if k == 0 {
            return a;
        }
        if k == self.segments {
            return b;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let sphere = self.sphere;
        let segments = self.segments;
        let interior = self.interior.entry((lo, hi)).or_insert_with(|| {
            (1..segments)
                .map(|i| {
                    let t = i as f64 / segments as f64;
                    let p = points[lo] + (points[hi] - points[lo]) * t;
                    points.push(sphere.project(&p));
                    points.len() - 1
                })
                .collect()
        });
        if a < b {
            interior[k - 1]
        } else {
            interior[segments - k - 1]
        }
    }
}

fn subdivide_polygons(
    sphere: &SphericalSurface,
    mut points: Vec<Point3<f64>>,
    faces: Vec<Vec<usize>>,
    degree: usize,
) -> (Vec<Point3<f64>>, Vec<Vec<usize>>) {
    if degree == 0 {
        return (points, faces);
    }

    let m = degree + 1;
    let mut splitter = EdgeSplitter::new(sphere, m);
    let mut out = Vec::new();

    for face in faces {
        match face.len() {
            3 => {
                let corners = [face[0], face[1], face[2]];
                subdivide_triangle(sphere, &mut splitter, &mut points, corners, &mut out)
            }
            4 => {
                let corners = [face[0], face[1], face[2], face[3]];
                subdivide_quad(sphere, &mut splitter, &mut points, corners, &mut out)
            }
            n => {
                let polygon: Vec<Point3<f64>> = face.iter().map(|&v| points[v]).collect();
                points.push(sphere.project(&polygon_centroid(&polygon)));
                let center = points.len() - 1;
                for i in 0..n {
                    let tri = [face[i], face[(i + 1) % n], center];
                    subdivide_triangle(sphere, &mut splitter, &mut points, tri, &mut out);
                }
            }
        }
    }

    (points, out)
}

fn subdivide_triangle(
    sphere: &SphericalSurface,
    splitter: &mut EdgeSplitter<'_>,
    points: &mut Vec<Point3<f64>>,
    [a, b, c]: [usize; 3],
    out: &mut Vec<Vec<usize>>,
) {
    let m = splitter.segments;
    // grid[i][j]: i steps toward b, j steps toward c.
    let mut grid = vec![vec![usize::MAX; m + 1]; m + 1];
    for i in 0..=m {
        for j in 0..=(m - i) {
            grid[i][j] = if j == 0 {
                splitter.point(points, a, b, i)
            } else if i == 0 {
                splitter.point(points, a, c, j)
            } else if i + j == m {
                splitter.point(points, b, c, j)
            } else {
                let (pa, pb, pc) = (points[a], points[b], points[c]);
                let s = i as f64 / m as f64;
                let t = j as f64 / m as f64;
                let p = pa + (pb - pa) * s + (pc - pa) * t;
                points.push(sphere.project(&p));
                points.len() - 1
            };
        }
    }

    for i in 0..m {
        for j in 0..(m - i) {
            out.push(vec![grid[i][j], grid[i + 1][j], grid[i][j + 1]]);
            if i + j + 1 < m {
                out.push(vec![grid[i + 1][j], grid[i + 1][j + 1], grid[i][j + 1]]);
            }
        }
    }
}

fn subdivide_quad(
    sphere: &SphericalSurface,
    splitter: &mut EdgeSplitter<'_>,
    points: &mut Vec<Point3<f64>>,
    [a, b, c, d]: [usize; 4],
    out: &mut Vec<Vec<usize>>,
) {
    let m = splitter.segments;
    // grid[i][j]: i steps along a->b, j steps along a->d.
    let mut grid = vec![vec![usize::MAX; m + 1]; m + 1];
    for i in 0..=m {
        for j in 0..=m {
            grid[i][j] = if j == 0 {
                splitter.point(points, a, b, i)
            } else if j == m {
                splitter.point(points, d, c, i)
            } else if i == 0 {
                splitter.point(points, a, d, j)
            } else if i == m {
                splitter.point(points, b, c, j)
            } else {
                let (pa, pb, pc, pd) = (points[a], points[b], points[c], points[d]);
                let s = i as f64 / m as f64;
                let t = j as f64 / m as f64;
                let bottom = pa + (pb - pa) * s;
                let top = pd + (pc - pd) * s;
                let p = bottom + (top - bottom) * t;
                points.push(sphere.project(&p));
                points.len() - 1
            };
        }
    }

    for i in 0..m {
        for j in 0..m {
            out.push(vec![grid[i][j], grid[i + 1][j], grid[i + 1][j + 1], grid[i][j + 1]]);
        }
    }
}
