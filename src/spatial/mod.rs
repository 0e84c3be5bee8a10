//! Ray-to-face lookup.
//!
//! A [`FacePartitioning`] is built once from a finished tiling and then
//! answers "which face does this ray hit" queries. Faces are bucketed in a
//! uniform grid over a 2D parameterization of the surface: surface
//! coordinates for planes, latitude and longitude for spheres.
//!
//! Building borrows the tiling only for the duration of the call. Queries
//! take `&self`, so a partitioning can be shared between threads freely.
//!
//! # Example
//!
//! ```
//! use tessel::prelude::*;
//! use nalgebra::{Point3, Vector3};
//!
//! let grid: Grid = build_quad_grid(&QuadGridDescriptor::new(4, 4)).unwrap();
//! let partitioning =
//!     FacePartitioning::build(&grid.topology, &grid.surface, &grid.positions).unwrap();
//!
//! let ray = Ray::new(Point3::new(0.5, 0.5, 10.0), -Vector3::z());
//! assert_eq!(partitioning.find_face(&ray), Some(FaceId::new(0)));
//!
//! let miss = Ray::new(Point3::new(-3.0, 0.5, 10.0), -Vector3::z());
//! assert_eq!(partitioning.find_face(&miss), None);
//! ```

mod planar;
mod spherical;

use log::debug;
use nalgebra::{Point3, Vector2};

use self::planar::PlanarIndex;
use self::spherical::SphericalIndex;
use crate::algo::attributes::{check_positions, Positions};
use crate::error::Result;
use crate::mesh::{FaceId, MeshIndex, Topology};
use crate::surface::{Ray, Surface};

/// Spatial index from surface points to internal faces.
#[derive(Debug, Clone)]
pub struct FacePartitioning<I: MeshIndex = u32> {
    surface: Surface,
    index: Index<I>,
}

#[derive(Debug, Clone)]
enum Index<I: MeshIndex> {
    Planar(PlanarIndex<I>),
    Spherical(SphericalIndex<I>),
}

impl<I: MeshIndex> FacePartitioning<I> {
    /// Index the internal faces of a tiling.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::PreconditionViolation`](crate::error::MeshError::PreconditionViolation)
    /// if `positions` does not have one entry per vertex.
    pub fn build(topology: &Topology<I>, surface: &Surface, positions: &Positions) -> Result<Self> {
        check_positions(topology, positions)?;

        let index = match surface {
            Surface::PlanarQuadrilateral(plane) | Surface::PlanarHexagonal(plane) => {
                Index::Planar(PlanarIndex::build(topology, surface, plane, positions))
            }
            Surface::Spherical(sphere) => {
                Index::Spherical(SphericalIndex::build(topology, surface, sphere, positions))
            }
        };

        let (entries, cells) = match &index {
            Index::Planar(index) => (index.num_entries(), index.num_cells()),
            Index::Spherical(index) => (index.num_entries(), index.num_cells()),
        };
        debug!(
            "Partitioned {} faces into {} entries over {} buckets",
            topology.num_internal_faces(),
            entries,
            cells
        );

        Ok(Self {
            surface: *surface,
            index,
        })
    }

    /// The surface queries are resolved against.
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// The face hit by a ray, if any.
    ///
    /// The ray is intersected with the surface first; only the nearest hit in
    /// front of the origin is considered.
    pub fn find_face(&self, ray: &Ray) -> Option<FaceId<I>> {
        let hit = self.surface.intersect(ray)?;
        self.find_face_at(&hit)
    }

    /// The face containing a point on, or projected onto, the surface.
    ///
    /// On wrapped planes every periodic copy of a face resolves to the same
    /// face.
    pub fn find_face_at(&self, point: &Point3<f64>) -> Option<FaceId<I>> {
        match &self.index {
            Index::Planar(index) => index.find(point),
            Index::Spherical(index) => index.find(point),
        }
    }
}

/// Uniform grid of buckets holding entry indices.
#[derive(Debug, Clone)]
struct Buckets {
    cols: usize,
    rows: usize,
    cells: Vec<Vec<usize>>,
}

impl Buckets {
    fn new(cols: usize, rows: usize) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            cols,
            rows,
            cells: vec![Vec::new(); cols * rows],
        }
    }

    fn insert(&mut self, col: usize, row: usize, entry: usize) {
        self.cells[row * self.cols + col].push(entry);
    }

    fn get(&self, col: usize, row: usize) -> &[usize] {
        &self.cells[row * self.cols + col]
    }

    fn len(&self) -> usize {
        self.cells.len()
    }
}

/// Winding-number point-in-polygon test.
fn polygon_contains(polygon: &[Vector2<f64>], point: &Vector2<f64>) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut winding = 0i32;
    for i in 0..n {
        let v0 = polygon[i];
        let v1 = polygon[(i + 1) % n];
        let side = cross_2d(&(v1 - v0), &(point - v0));
        if v0.y <= point.y {
            if v1.y > point.y && side > 0.0 {
                winding += 1;
            }
        } else if v1.y <= point.y && side < 0.0 {
            winding -= 1;
        }
    }
    winding != 0
}

#[inline]
fn cross_2d(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Component-wise bounds of a point set.
fn bounds(points: &[Vector2<f64>]) -> (Vector2<f64>, Vector2<f64>) {
    points.iter().fold(
        (
            Vector2::repeat(f64::INFINITY),
            Vector2::repeat(f64::NEG_INFINITY),
        ),
        |(lo, hi), p| (lo.inf(p), hi.sup(p)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::attributes::{face_polygon, polygon_centroid};
    use crate::algo::randomize::{randomize_with_relaxation, RandomizeOptions};
    use crate::algo::relax::{folded_faces, RelaxOptions};
    use crate::error::MeshError;
    use crate::grid::{
        build_hex_grid, build_quad_grid, build_sphere, BasePolyhedron, Grid, HexGridDescriptor,
        QuadGridDescriptor, SphereDescriptor,
    };
    use crate::mesh::VertexAttribute;
    use nalgebra::Vector3;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rayon::prelude::*;

    /// Centroid, plus points 80% of the way from it to each corner and to
    /// each edge midpoint.
    fn sample_points(grid: &Grid, f: FaceId) -> Vec<Point3<f64>> {
        let polygon = face_polygon(&grid.topology, &grid.surface, &grid.positions, f);
        let c = polygon_centroid(&polygon);
        let mut points = vec![c];
        for i in 0..polygon.len() {
            let a = polygon[i];
            let b = polygon[(i + 1) % polygon.len()];
            let mid = Point3::from((a.coords + b.coords) * 0.5);
            points.push(c + (a - c) * 0.8);
            points.push(c + (mid - c) * 0.8);
        }
        points
    }

    fn assert_finds_every_face(grid: &Grid, partitioning: &FacePartitioning, skip: &[FaceId]) {
        for f in grid.topology.internal_face_ids() {
            if skip.contains(&f) {
                continue;
            }
            for p in sample_points(grid, f) {
                let ray = Ray::toward(p, grid.surface.normal_at(&p), 3.0);
                assert_eq!(partitioning.find_face(&ray), Some(f), "sample {:?} of {:?}", p, f);
            }
        }
    }

    #[test]
    fn test_planar_quad_grid() {
        let grid: Grid = build_quad_grid(&QuadGridDescriptor::new(5, 3)).unwrap();
        let partitioning =
            FacePartitioning::build(&grid.topology, &grid.surface, &grid.positions).unwrap();
        assert_finds_every_face(&grid, &partitioning, &[]);
    }

    #[test]
    fn test_planar_hex_grid() {
        let grid: Grid = build_hex_grid(&HexGridDescriptor::new(6, 4)).unwrap();
        let partitioning =
            FacePartitioning::build(&grid.topology, &grid.surface, &grid.positions).unwrap();
        assert_finds_every_face(&grid, &partitioning, &[]);
    }

    #[test]
    fn test_wrapped_grid_resolves_periodic_copies() {
        let grid: Grid =
            build_hex_grid(&HexGridDescriptor::new(6, 4).with_wrap(true, true)).unwrap();
        let partitioning =
            FacePartitioning::build(&grid.topology, &grid.surface, &grid.positions).unwrap();
        assert_finds_every_face(&grid, &partitioning, &[]);

        let plane = grid.surface.as_planar().unwrap();
        let shifts = [
            plane.axis0,
            -plane.axis0,
            plane.axis1 * 2.0,
            plane.axis0 - plane.axis1,
        ];
        for f in grid.topology.internal_face_ids() {
            for p in sample_points(&grid, f) {
                for shift in &shifts {
                    assert_eq!(partitioning.find_face_at(&(p + shift)), Some(f));
                }
            }
        }
    }

    #[test]
    fn test_single_axis_wrap_misses_off_the_open_axis() {
        let grid: Grid =
            build_quad_grid(&QuadGridDescriptor::new(5, 3).with_wrap(true, false)).unwrap();
        let partitioning =
            FacePartitioning::build(&grid.topology, &grid.surface, &grid.positions).unwrap();
        assert_finds_every_face(&grid, &partitioning, &[]);

        assert!(partitioning.find_face_at(&Point3::new(7.5, 1.5, 0.0)).is_some());
        assert_eq!(partitioning.find_face_at(&Point3::new(2.5, 4.5, 0.0)), None);
    }

    #[test]
    fn test_ray_missing_the_surface() {
        let grid: Grid = build_quad_grid(&QuadGridDescriptor::new(3, 3)).unwrap();
        let partitioning =
            FacePartitioning::build(&grid.topology, &grid.surface, &grid.positions).unwrap();

        let away = Ray::new(Point3::new(1.5, 1.5, 1.0), Vector3::z());
        assert_eq!(partitioning.find_face(&away), None);
        let parallel = Ray::new(Point3::new(1.5, 1.5, 1.0), Vector3::x());
        assert_eq!(partitioning.find_face(&parallel), None);
        let outside = Ray::new(Point3::new(9.0, 1.5, 1.0), -Vector3::z());
        assert_eq!(partitioning.find_face(&outside), None);
    }

    #[test]
    fn test_spherical_grids() {
        for base in [
            BasePolyhedron::Tetrahedron,
            BasePolyhedron::Cube,
            BasePolyhedron::Icosahedron,
        ] {
            let grid: Grid = build_sphere(
                &SphereDescriptor::new(base)
                    .with_radius(2.0)
                    .with_subdivision(1),
            )
            .unwrap();
            let partitioning =
                FacePartitioning::build(&grid.topology, &grid.surface, &grid.positions).unwrap();
            assert_finds_every_face(&grid, &partitioning, &[]);
        }
    }

    #[test]
    fn test_goldberg_sphere_from_inside_and_outside() {
        let grid: Grid = build_sphere(
            &SphereDescriptor::default()
                .with_subdivision(2)
                .with_dual(true),
        )
        .unwrap();
        let partitioning =
            FacePartitioning::build(&grid.topology, &grid.surface, &grid.positions).unwrap();
        assert_finds_every_face(&grid, &partitioning, &[]);

        // A ray from the center hits the face it points at.
        for f in grid.topology.internal_face_ids() {
            let polygon = face_polygon(&grid.topology, &grid.surface, &grid.positions, f);
            let c = polygon_centroid(&polygon);
            let ray = Ray::new(Point3::origin(), c.coords);
            assert_eq!(partitioning.find_face(&ray), Some(f));
        }
    }

    #[test]
    fn test_after_randomization() {
        let mut grid: Grid =
            build_quad_grid(&QuadGridDescriptor::new(8, 6).with_wrap(true, true)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        randomize_with_relaxation(
            &mut grid.topology,
            &mut grid.positions,
            &grid.surface,
            &RandomizeOptions::default().with_vertex_degree(3, 5),
            &RelaxOptions::default().with_max_repair_iterations(50),
            &mut rng,
        )
        .unwrap();

        let folded = folded_faces(&grid.topology, &grid.surface, &grid.positions);
        let partitioning =
            FacePartitioning::build(&grid.topology, &grid.surface, &grid.positions).unwrap();
        assert_finds_every_face(&grid, &partitioning, &folded);
    }

    #[test]
    fn test_concurrent_queries() {
        let grid: Grid = build_sphere(&SphereDescriptor::default().with_subdivision(3)).unwrap();
        let partitioning =
            FacePartitioning::build(&grid.topology, &grid.surface, &grid.positions).unwrap();
        let faces: Vec<FaceId> = grid.topology.internal_face_ids().collect();

        let all_found = faces.par_iter().all(|&f| {
            let polygon = face_polygon(&grid.topology, &grid.surface, &grid.positions, f);
            let c = polygon_centroid(&polygon);
            let ray = Ray::toward(c, grid.surface.normal_at(&c), 5.0);
            partitioning.find_face(&ray) == Some(f)
        });
        assert!(all_found);
    }

    #[test]
    fn test_length_mismatch() {
        let grid: Grid = build_quad_grid(&QuadGridDescriptor::new(2, 2)).unwrap();
        let positions = VertexAttribute::new(vec![Point3::origin(); 3]);
        let result = FacePartitioning::build(&grid.topology, &grid.surface, &positions);
        assert!(matches!(result, Err(MeshError::PreconditionViolation { .. })));
    }

    #[test]
    fn test_polygon_contains() {
        let square = [
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(0.0, 1.0),
        ];
        assert!(polygon_contains(&square, &Vector2::new(0.5, 0.5)));
        assert!(!polygon_contains(&square, &Vector2::new(1.5, 0.5)));

        // Clockwise order and a reflex corner.
        let chevron = [
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.5),
            Vector2::new(2.0, 0.0),
            Vector2::new(1.0, 2.0),
        ];
        assert!(polygon_contains(&chevron, &Vector2::new(1.0, 1.0)));
        assert!(!polygon_contains(&chevron, &Vector2::new(1.0, 0.25)));
        let reversed: Vec<_> = chevron.iter().rev().copied().collect();
        assert!(polygon_contains(&reversed, &Vector2::new(1.0, 1.0)));
    }
}
