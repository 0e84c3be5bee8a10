//! Vertex relaxation and repair.
//!
//! Relaxation moves vertices toward a blend of two targets without touching
//! the topology:
//!
//! - **Regularity**: the average of the vertex's neighbors, seen across wrap
//!   seams.
//! - **Equal area**: every internal face proposes to scale its corners about
//!   its centroid until it reaches the mean face area; a vertex takes the
//!   average of the proposals of its faces.
//!
//! After every iteration a repair step looks for folded corners (corners
//! turning the wrong way relative to the surface normal) and pulls their
//! vertices back toward the center of their one-ring.
//!
//! Both loops are bounded by iteration caps. Hitting a cap is not an error.
//!
//! # Example
//!
//! ```
//! use tessel::prelude::*;
//! use tessel::algo::relax::{relax_positions, RelaxOptions};
//!
//! let mut grid: Grid = build_hex_grid(&HexGridDescriptor::new(4, 4)).unwrap();
//! let options = RelaxOptions::default().with_max_relax_iterations(5);
//! let stats =
//!     relax_positions(&grid.topology, &mut grid.positions, &grid.surface, &options).unwrap();
//! assert!(stats.iterations <= 5);
//! ```

use log::{debug, warn};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use super::attributes::{
    average_edge_length, far_position, polygon_centroid, polygon_newell, Positions,
};
use super::Progress;
use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, HalfEdgeId, MeshIndex, Topology, VertexId};
use crate::surface::Surface;

/// Options for relaxation and repair.
#[derive(Debug, Clone)]
pub struct RelaxOptions {
    /// Blend between the equal-area target (0.0) and the regularity target (1.0).
    pub regularity_weight: f64,

    /// Maximum number of relaxation iterations.
    pub max_relax_iterations: usize,

    /// Stop once the mean displacement per vertex, relative to the mean edge
    /// length, drops below this value.
    pub relative_precision: f64,

    /// Maximum number of repair iterations after each relaxation iteration.
    pub max_repair_iterations: usize,

    /// Fraction of the way a folded vertex is moved toward the center of its
    /// one-ring per repair iteration (0.0 to 1.0).
    pub repair_rate: f64,

    /// Whether to keep boundary vertices in place.
    pub lock_boundary: bool,

    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl Default for RelaxOptions {
    fn default() -> Self {
        Self {
            regularity_weight: 0.5,
            max_relax_iterations: 20,
            relative_precision: 1e-4,
            max_repair_iterations: 10,
            repair_rate: 0.5,
            lock_boundary: true,
            parallel: true,
        }
    }
}

impl RelaxOptions {
    /// Set the regularity weight.
    pub fn with_regularity_weight(mut self, weight: f64) -> Self {
        self.regularity_weight = weight.clamp(0.0, 1.0);
        self
    }

    /// Set the relaxation iteration cap.
    pub fn with_max_relax_iterations(mut self, iterations: usize) -> Self {
        self.max_relax_iterations = iterations;
        self
    }

    /// Set the convergence threshold.
    pub fn with_relative_precision(mut self, precision: f64) -> Self {
        self.relative_precision = precision;
        self
    }

    /// Set the repair iteration cap.
    pub fn with_max_repair_iterations(mut self, iterations: usize) -> Self {
        self.max_repair_iterations = iterations;
        self
    }

    /// Set the repair rate.
    pub fn with_repair_rate(mut self, rate: f64) -> Self {
        self.repair_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Set whether boundary vertices stay in place.
    pub fn with_lock_boundary(mut self, lock: bool) -> Self {
        self.lock_boundary = lock;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Check fields that may have been set directly.
    pub(crate) fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.regularity_weight) {
            return Err(MeshError::invalid_param(
                "regularity_weight",
                self.regularity_weight,
                "must be between 0 and 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.repair_rate) {
            return Err(MeshError::invalid_param(
                "repair_rate",
                self.repair_rate,
                "must be between 0 and 1",
            ));
        }
        if self.relative_precision.is_nan() || self.relative_precision < 0.0 {
            return Err(MeshError::invalid_param(
                "relative_precision",
                self.relative_precision,
                "must not be negative",
            ));
        }
        Ok(())
    }
}

/// Outcome of a relaxation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelaxStats {
    /// Relaxation iterations performed.
    pub iterations: usize,
    /// Whether the precision threshold was reached before the cap.
    pub converged: bool,
    /// Whether the last repair step left no folded corners.
    pub repaired: bool,
}

/// Relax vertex positions in place.
///
/// # Errors
///
/// Returns [`MeshError::PreconditionViolation`] if `positions` does not have
/// one entry per vertex, and [`MeshError::InvalidParameter`] if a weight or
/// rate in `options` lies outside `[0, 1]` or the precision is negative.
pub fn relax_positions<I: MeshIndex>(
    topology: &Topology<I>,
    positions: &mut Positions,
    surface: &Surface,
    options: &RelaxOptions,
) -> Result<RelaxStats> {
    relax_positions_with_progress(topology, positions, surface, options, &Progress::none())
}

/// Relax vertex positions in place, reporting each iteration.
pub fn relax_positions_with_progress<I: MeshIndex>(
    topology: &Topology<I>,
    positions: &mut Positions,
    surface: &Surface,
    options: &RelaxOptions,
    progress: &Progress,
) -> Result<RelaxStats> {
    MeshError::check_len("positions", topology.num_vertices(), positions.len())?;
    options.validate()?;

    let locked = locked_vertices(topology, options.lock_boundary);
    let mut stats = RelaxStats::default();

    for iteration in 0..options.max_relax_iterations {
        progress.report(iteration, options.max_relax_iterations, "Relaxing");

        let current: &Positions = positions;
        let frames = FaceFrames::compute(topology, surface, current);
        let targets: Vec<Point3<f64>> = if options.parallel {
            (0..topology.num_vertices())
                .into_par_iter()
                .map(|i| relaxed_position(topology, surface, current, &frames, &locked, options, i))
                .collect()
        } else {
            (0..topology.num_vertices())
                .map(|i| relaxed_position(topology, surface, current, &frames, &locked, options, i))
                .collect()
        };

        let mut displacement = 0.0;
        for (i, target) in targets.into_iter().enumerate() {
            displacement += (target - positions[i]).norm();
            positions[i] = target;
        }

        stats.iterations = iteration + 1;
        stats.repaired = repair_with_locks(topology, positions, surface, options, &locked);

        let scale =
            average_edge_length(topology, surface, positions) * topology.num_vertices() as f64;
        let relative = if scale > f64::EPSILON { displacement / scale } else { 0.0 };
        debug!("Relax iteration {}: relative displacement {:.3e}", iteration, relative);
        if relative < options.relative_precision {
            stats.converged = true;
            break;
        }
    }

    if options.max_relax_iterations == 0 {
        stats.repaired = repair_with_locks(topology, positions, surface, options, &locked);
    }
    progress.report(
        options.max_relax_iterations,
        options.max_relax_iterations,
        "Relaxing",
    );
    if !stats.repaired {
        warn!(
            "Relaxation left folded faces after {} iterations",
            stats.iterations
        );
    }

    Ok(stats)
}

/// Pull the vertices at folded corners toward the center of their one-ring.
///
/// Returns `true` if no folded corner remains.
///
/// # Errors
///
/// Returns [`MeshError::PreconditionViolation`] if `positions` does not have
/// one entry per vertex, and [`MeshError::InvalidParameter`] for out-of-range
/// options.
pub fn repair_positions<I: MeshIndex>(
    topology: &Topology<I>,
    positions: &mut Positions,
    surface: &Surface,
    options: &RelaxOptions,
) -> Result<bool> {
    MeshError::check_len("positions", topology.num_vertices(), positions.len())?;
    options.validate()?;
    let locked = locked_vertices(topology, options.lock_boundary);
    Ok(repair_with_locks(topology, positions, surface, options, &locked))
}

/// Internal faces with a corner that turns against the surface normal.
pub fn folded_faces<I: MeshIndex>(
    topology: &Topology<I>,
    surface: &Surface,
    positions: &Positions,
) -> Vec<FaceId<I>> {
    let frames = FaceFrames::compute(topology, surface, positions);
    topology
        .internal_face_ids()
        .filter(|&f| {
            topology
                .face_halfedges(f)
                .any(|he| corner_is_folded(topology, surface, positions, &frames, he))
        })
        .collect()
}

fn repair_with_locks<I: MeshIndex>(
    topology: &Topology<I>,
    positions: &mut Positions,
    surface: &Surface,
    options: &RelaxOptions,
    locked: &[bool],
) -> bool {
    for iteration in 0..options.max_repair_iterations {
        let frames = FaceFrames::compute(topology, surface, positions);
        let mut folded: Vec<VertexId<I>> = topology
            .halfedge_ids()
            .filter(|&he| corner_is_folded(topology, surface, positions, &frames, he))
            .map(|he| topology.near_vertex(he))
            .collect();
        folded.sort_unstable();
        folded.dedup();

        if folded.is_empty() {
            return true;
        }
        debug!("Repair iteration {}: {} folded vertices", iteration, folded.len());

        for v in folded {
            if locked[v.index()] {
                continue;
            }
            let p = positions[v];
            let target = one_ring_center(topology, surface, positions, v);
            positions[v] = surface.project(&(p + (target - p) * options.repair_rate));
        }
    }

    let frames = FaceFrames::compute(topology, surface, positions);
    !topology
        .halfedge_ids()
        .any(|he| corner_is_folded(topology, surface, positions, &frames, he))
}

fn locked_vertices<I: MeshIndex>(topology: &Topology<I>, lock_boundary: bool) -> Vec<bool> {
    topology
        .vertex_ids()
        .map(|v| lock_boundary && topology.is_boundary_vertex(v))
        .collect()
}

/// Per-face geometry in the frame of each face's anchor corner.
struct FaceFrames {
    /// Centroid per face.
    centroid: Vec<Point3<f64>>,
    /// Scale that brings a face to the mean internal face area.
    scale: Vec<f64>,
    /// Offset of each half-edge's origin from its face's anchor frame.
    shift: Vec<Vector3<f64>>,
}

impl FaceFrames {
    fn compute<I: MeshIndex>(
        topology: &Topology<I>,
        surface: &Surface,
        positions: &Positions,
    ) -> Self {
        let mut centroid = vec![Point3::origin(); topology.num_faces()];
        let mut area = vec![0.0; topology.num_faces()];
        let mut shift = vec![Vector3::zeros(); topology.num_halfedges()];

        for f in topology.internal_face_ids() {
            let mut polygon = Vec::with_capacity(topology.face_degree(f));
            let mut offset = Vector3::zeros();
            for he in topology.face_halfedges(f) {
                shift[he.index()] = offset;
                polygon.push(positions[topology.near_vertex(he)] + offset);
                offset += surface.offset(topology.wrap(he));
            }
            centroid[f.index()] = polygon_centroid(&polygon);
            area[f.index()] = polygon_newell(&polygon).norm() * 0.5;
        }

        let internal = topology.num_internal_faces();
        let mean = if internal > 0 {
            area.iter().sum::<f64>() / internal as f64
        } else {
            0.0
        };
        let scale = area
            .iter()
            .map(|&a| if a > f64::EPSILON { (mean / a).sqrt() } else { 1.0 })
            .collect();

        Self {
            centroid,
            scale,
            shift,
        }
    }
}

fn relaxed_position<I: MeshIndex>(
    topology: &Topology<I>,
    surface: &Surface,
    positions: &Positions,
    frames: &FaceFrames,
    locked: &[bool],
    options: &RelaxOptions,
    i: usize,
) -> Point3<f64> {
    let v = VertexId::new(i);
    let p = positions[v];
    if locked[i] || topology.vertex_degree(v) == 0 {
        return p;
    }

    let mut neighbor_sum = Vector3::zeros();
    let mut neighbors = 0usize;
    let mut area_sum = Vector3::zeros();
    let mut proposals = 0usize;
    for he in topology.vertex_halfedges(v) {
        neighbor_sum += far_position(topology, surface, positions, he).coords;
        neighbors += 1;

        let f = topology.near_face(he);
        if topology.is_external_face(f) {
            continue;
        }
        let corner = p + frames.shift[he.index()];
        let center = frames.centroid[f.index()];
        let proposal = center + (corner - center) * frames.scale[f.index()];
        area_sum += (proposal - frames.shift[he.index()]).coords;
        proposals += 1;
    }

    let regular = neighbor_sum / neighbors as f64;
    let target = if proposals > 0 {
        let equal_area = area_sum / proposals as f64;
        regular * options.regularity_weight + equal_area * (1.0 - options.regularity_weight)
    } else {
        regular
    };
    surface.project(&Point3::from(target))
}

fn one_ring_center<I: MeshIndex>(
    topology: &Topology<I>,
    surface: &Surface,
    positions: &Positions,
    v: VertexId<I>,
) -> Point3<f64> {
    let mut sum = Vector3::zeros();
    let mut count = 0usize;
    for he in topology.vertex_halfedges(v) {
        sum += far_position(topology, surface, positions, he).coords;
        count += 1;
    }
    if count == 0 {
        positions[v]
    } else {
        Point3::from(sum / count as f64)
    }
}

fn corner_is_folded<I: MeshIndex>(
    topology: &Topology<I>,
    surface: &Surface,
    positions: &Positions,
    frames: &FaceFrames,
    he: HalfEdgeId<I>,
) -> bool {
    if topology.is_external_face(topology.near_face(he)) {
        return false;
    }
    let prev = topology.prev(he);
    let here = positions[topology.near_vertex(he)] + frames.shift[he.index()];
    let before = positions[topology.near_vertex(prev)] + frames.shift[prev.index()];
    let after = far_position(topology, surface, positions, he) + frames.shift[he.index()];

    let turn = (here - before).cross(&(after - here));
    turn.dot(&surface.normal_at(&here)) <= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::attributes::face_areas;
    use crate::grid::{
        build_hex_grid, build_quad_grid, build_sphere, Grid, HexGridDescriptor, QuadGridDescriptor,
        SphereDescriptor,
    };
    use approx::assert_relative_eq;

    #[test]
    fn test_regular_grid_is_a_fixed_point() {
        let mut grid: Grid =
            build_quad_grid(&QuadGridDescriptor::new(4, 4).with_wrap(true, true)).unwrap();
        let before = grid.positions.clone();
        let options = RelaxOptions::default();
        let stats =
            relax_positions(&grid.topology, &mut grid.positions, &grid.surface, &options).unwrap();
        assert!(stats.converged);
        assert!(stats.repaired);
        assert_eq!(stats.iterations, 1);
        for (a, b) in before.iter().zip(grid.positions.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_relax_smooths_perturbation() {
        let mut grid: Grid = build_quad_grid(&QuadGridDescriptor::new(4, 4)).unwrap();
        // Interior vertex (2, 2) in a 5x5 vertex grid.
        let center = 12;
        grid.positions[center] = Point3::new(2.3, 1.8, 0.0);
        let options = RelaxOptions::default()
            .with_regularity_weight(1.0)
            .with_max_relax_iterations(50)
            .with_relative_precision(1e-9)
            .sequential();
        relax_positions(&grid.topology, &mut grid.positions, &grid.surface, &options).unwrap();
        assert_relative_eq!(grid.positions[center], Point3::new(2.0, 2.0, 0.0), epsilon = 1e-2);
    }

    #[test]
    fn test_boundary_is_locked() {
        let mut grid: Grid = build_hex_grid(&HexGridDescriptor::new(3, 3)).unwrap();
        let before = grid.positions.clone();
        let options = RelaxOptions::default();
        relax_positions(&grid.topology, &mut grid.positions, &grid.surface, &options).unwrap();
        for v in grid.topology.vertex_ids() {
            if grid.topology.is_boundary_vertex(v) {
                assert_eq!(grid.positions[v], before[v]);
            }
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let grid: Grid = build_hex_grid(&HexGridDescriptor::new(5, 4)).unwrap();
        let mut a = grid.positions.clone();
        let mut b = grid.positions.clone();
        a[7] += Vector3::new(0.2, -0.1, 0.0);
        b[7] += Vector3::new(0.2, -0.1, 0.0);
        let options = RelaxOptions::default().with_max_relax_iterations(3);
        relax_positions(&grid.topology, &mut a, &grid.surface, &options).unwrap();
        let sequential = options.clone().sequential();
        relax_positions(&grid.topology, &mut b, &grid.surface, &sequential).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_relax_keeps_sphere_positions_on_sphere() {
        let desc = SphereDescriptor::default().with_subdivision(2).with_dual(true);
        let mut grid: Grid = build_sphere(&desc).unwrap();
        let options = RelaxOptions::default().with_regularity_weight(0.3);
        relax_positions(&grid.topology, &mut grid.positions, &grid.surface, &options).unwrap();
        for p in grid.positions.iter() {
            assert_relative_eq!(p.coords.norm(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_equal_area_evens_out_faces() {
        let mut grid: Grid =
            build_quad_grid(&QuadGridDescriptor::new(3, 3).with_wrap(true, true)).unwrap();
        // Shrink the cell around vertex 4 by moving it.
        grid.positions[4] = Point3::new(1.3, 1.3, 0.0);
        let spread = |grid: &Grid| {
            let areas = face_areas(&grid.topology, &grid.surface, &grid.positions).unwrap();
            let max = areas.iter().cloned().fold(f64::MIN, f64::max);
            let min = areas.iter().cloned().fold(f64::MAX, f64::min);
            max - min
        };
        let before = spread(&grid);
        let options = RelaxOptions::default()
            .with_regularity_weight(0.0)
            .with_max_relax_iterations(30);
        relax_positions(&grid.topology, &mut grid.positions, &grid.surface, &options).unwrap();
        assert!(spread(&grid) < before);
    }

    #[test]
    fn test_repair_unfolds_corner() {
        let mut grid: Grid = build_quad_grid(&QuadGridDescriptor::new(2, 2)).unwrap();
        // Drag the middle vertex across its neighbors.
        grid.positions[4] = Point3::new(2.5, 0.5, 0.0);
        assert!(!folded_faces(&grid.topology, &grid.surface, &grid.positions).is_empty());

        let options = RelaxOptions::default().with_max_repair_iterations(50);
        let repaired =
            repair_positions(&grid.topology, &mut grid.positions, &grid.surface, &options)
                .unwrap();
        assert!(repaired);
        assert!(folded_faces(&grid.topology, &grid.surface, &grid.positions).is_empty());
    }

    #[test]
    fn test_length_mismatch() {
        let grid: Grid = build_quad_grid(&QuadGridDescriptor::new(2, 2)).unwrap();
        let mut short: Positions = vec![Point3::origin(); 3].into();
        assert!(matches!(
            relax_positions(&grid.topology, &mut short, &grid.surface, &RelaxOptions::default()),
            Err(MeshError::PreconditionViolation { .. })
        ));
    }

    #[test]
    fn test_out_of_range_fields_are_rejected() {
        let mut grid: Grid = build_quad_grid(&QuadGridDescriptor::new(2, 2)).unwrap();
        let before = grid.positions.clone();
        let mut weight = RelaxOptions::default();
        weight.regularity_weight = 1.5;
        let mut rate = RelaxOptions::default();
        rate.repair_rate = -0.25;
        let mut precision = RelaxOptions::default();
        precision.relative_precision = f64::NAN;

        for options in [&weight, &rate, &precision] {
            assert!(matches!(
                relax_positions(&grid.topology, &mut grid.positions, &grid.surface, options),
                Err(MeshError::InvalidParameter { .. })
            ));
            assert!(matches!(
                repair_positions(&grid.topology, &mut grid.positions, &grid.surface, options),
                Err(MeshError::InvalidParameter { .. })
            ));
        }
        assert_eq!(grid.positions, before);

        // The builders clamp instead.
        let clamped = RelaxOptions::default()
            .with_regularity_weight(1.5)
            .with_repair_rate(-0.25);
        assert_eq!(clamped.regularity_weight, 1.0);
        assert_eq!(clamped.repair_rate, 0.0);
        let relaxed = relax_positions(&grid.topology, &mut grid.positions, &grid.surface, &clamped);
        assert!(relaxed.is_ok());
    }
}
