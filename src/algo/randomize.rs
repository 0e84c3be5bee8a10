//! Topology randomization.
//!
//! Turns a regular tiling into an irregular one by spinning randomly chosen
//! edges, keeping every face and vertex degree inside caller-chosen bounds.
//! Vertex spins make vertex degrees irregular and face spins make face
//! degrees irregular; by default each candidate picks one of the two at
//! random. Each pass visits every edge once in random order; after each pass
//! a callback runs, typically to relax the vertex positions to the new
//! topology (see [`randomize_with_relaxation`]).
//!
//! Results are reproducible for a given seed: all randomness comes from the
//! injected [`Rng`].
//!
//! # Example
//!
//! ```
//! use tessel::prelude::*;
//! use tessel::algo::randomize::{randomize_with_relaxation, RandomizeOptions};
//! use tessel::algo::relax::RelaxOptions;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let desc = QuadGridDescriptor::new(6, 6).with_wrap(true, true);
//! let mut grid: Grid = build_quad_grid(&desc).unwrap();
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! let stats = randomize_with_relaxation(
//!     &mut grid.topology,
//!     &mut grid.positions,
//!     &grid.surface,
//!     &RandomizeOptions::default(),
//!     &RelaxOptions::default(),
//!     &mut rng,
//! )
//! .unwrap();
//! assert!(grid.topology.is_valid());
//! assert!(stats.spun <= stats.attempted);
//! ```

use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::Rng;

use super::attributes::Positions;
use super::relax::{relax_positions_with_progress, RelaxOptions, RelaxStats};
use super::Progress;
use crate::error::{MeshError, Result};
use crate::mesh::{
    HalfEdgeId, MeshIndex, SpinDirection, SpinKind, Topology, VertexId, WrapOffset,
};
use crate::surface::Surface;

/// Inclusive range of allowed degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DegreeBounds {
    /// Smallest allowed degree.
    pub min: usize,
    /// Largest allowed degree.
    pub max: usize,
}

impl DegreeBounds {
    /// Bounds from `min` to `max`, inclusive.
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Whether `degree` lies within the bounds.
    #[inline]
    pub fn contains(&self, degree: usize) -> bool {
        (self.min..=self.max).contains(&degree)
    }
}

/// Options for topology randomization.
#[derive(Debug, Clone)]
pub struct RandomizeOptions {
    /// Number of passes over all edges.
    pub passes: usize,

    /// Probability of attempting a spin on each visited edge (0.0 to 1.0).
    pub frequency: f64,

    /// Allowed degrees of internal faces.
    pub face_degree: DegreeBounds,

    /// Allowed degrees of interior vertices.
    pub vertex_degree: DegreeBounds,

    /// Whether edges touching boundary vertices are left alone.
    pub lock_boundary: bool,

    /// Whether vertex spins are attempted.
    pub vertex_spins: bool,

    /// Whether face spins are attempted.
    pub face_spins: bool,
}

impl Default for RandomizeOptions {
    fn default() -> Self {
        Self {
            passes: 1,
            frequency: 0.5,
            face_degree: DegreeBounds::new(3, 8),
            vertex_degree: DegreeBounds::new(3, 8),
            lock_boundary: true,
            vertex_spins: true,
            face_spins: true,
        }
    }
}

impl RandomizeOptions {
    /// Set the number of passes.
    pub fn with_passes(mut self, passes: usize) -> Self {
        self.passes = passes;
        self
    }

    /// Set the spin probability.
    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    /// Set the allowed face degrees.
    pub fn with_face_degree(mut self, min: usize, max: usize) -> Self {
        self.face_degree = DegreeBounds::new(min, max);
        self
    }

    /// Set the allowed vertex degrees.
    pub fn with_vertex_degree(mut self, min: usize, max: usize) -> Self {
        self.vertex_degree = DegreeBounds::new(min, max);
        self
    }

    /// Set whether edges touching the boundary are left alone.
    pub fn with_lock_boundary(mut self, lock: bool) -> Self {
        self.lock_boundary = lock;
        self
    }

    /// Choose which spin kinds are attempted.
    pub fn with_spin_kinds(mut self, vertex: bool, face: bool) -> Self {
        self.vertex_spins = vertex;
        self.face_spins = face;
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.vertex_spins && !self.face_spins {
            return Err(MeshError::invalid_param(
                "spin kinds",
                "none",
                "at least one spin kind must be enabled",
            ));
        }
        if !(0.0..=1.0).contains(&self.frequency) {
            return Err(MeshError::invalid_param(
                "frequency",
                self.frequency,
                "must be between 0 and 1",
            ));
        }
        if self.face_degree.min > self.face_degree.max {
            return Err(MeshError::invalid_param(
                "face_degree",
                format!("{}..={}", self.face_degree.min, self.face_degree.max),
                "min must not exceed max",
            ));
        }
        if self.vertex_degree.min > self.vertex_degree.max {
            return Err(MeshError::invalid_param(
                "vertex_degree",
                format!("{}..={}", self.vertex_degree.min, self.vertex_degree.max),
                "min must not exceed max",
            ));
        }
        Ok(())
    }
}

/// Counters from a randomization run.
///
/// `attempted` always equals `spun + rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RandomizeStats {
    /// Passes completed.
    pub passes: usize,
    /// Edges picked for a spin.
    pub attempted: usize,
    /// Spins performed.
    pub spun: usize,
    /// Face spins among `spun`.
    pub face_spun: usize,
    /// Picked edges that were left alone.
    pub rejected: usize,
    /// Outcome of the last relaxation, if positions were relaxed.
    pub relax: Option<RelaxStats>,
}

/// Randomize a topology in place.
///
/// `after_pass` runs after every pass with the pass index and the updated
/// topology.
///
/// # Errors
///
/// Returns [`MeshError::InvalidParameter`] for a frequency outside `[0, 1]`
/// or inverted degree bounds, and propagates any error from `after_pass`.
pub fn randomize<I, R, F>(
    topology: &mut Topology<I>,
    options: &RandomizeOptions,
    rng: &mut R,
    mut after_pass: F,
) -> Result<RandomizeStats>
where
    I: MeshIndex,
    R: Rng + ?Sized,
    F: FnMut(usize, &Topology<I>) -> Result<()>,
{
    randomize_with_progress(
        topology,
        options,
        rng,
        |pass, topology, _| after_pass(pass, topology),
        &Progress::none(),
    )
}

/// Randomize a topology in place, reporting progress.
///
/// Each pass takes an equal share of `progress`. The first half of a share
/// tracks the edges visited; the second half is handed to `after_pass`, which
/// may report its own work through it.
pub fn randomize_with_progress<I, R, F>(
    topology: &mut Topology<I>,
    options: &RandomizeOptions,
    rng: &mut R,
    mut after_pass: F,
    progress: &Progress,
) -> Result<RandomizeStats>
where
    I: MeshIndex,
    R: Rng + ?Sized,
    F: FnMut(usize, &Topology<I>, &Progress) -> Result<()>,
{
    options.validate()?;

    let mut stats = RandomizeStats::default();
    let mut edges: Vec<HalfEdgeId<I>> = topology.edge_ids().collect();
    let report_every = (edges.len() / 50).max(1);

    for pass in 0..options.passes {
        let share = progress.within(pass, options.passes);
        let spinning = share.within(0, 2);
        let settling = share.within(1, 2);

        let before = stats;
        edges.shuffle(rng);
        for (i, &he) in edges.iter().enumerate() {
            if i % report_every == 0 {
                spinning.report(i, edges.len(), "Spinning edges");
            }
            if !rng.gen_bool(options.frequency) {
                continue;
            }
            stats.attempted += 1;

            // Randomly orient the edge as well as the spin.
            let he = if rng.gen_bool(0.5) { he } else { topology.twin(he) };
            let direction = if rng.gen_bool(0.5) {
                SpinDirection::Forward
            } else {
                SpinDirection::Backward
            };
            let kind = match (options.vertex_spins, options.face_spins) {
                (true, true) if rng.gen_bool(0.5) => SpinKind::Face,
                (true, _) => SpinKind::Vertex,
                (false, _) => SpinKind::Face,
            };

            let rejected = match kind {
                SpinKind::Vertex => vertex_spin_reject_reason(topology, options, he, direction),
                SpinKind::Face => face_spin_reject_reason(topology, options, he, direction),
            };
            if let Some(reason) = rejected {
                trace!("Skipping {:?} {:?} {:?}: {}", kind, he, direction, reason);
                stats.rejected += 1;
                continue;
            }

            match topology.spin(he, kind, direction) {
                Ok(()) => {
                    stats.spun += 1;
                    if kind == SpinKind::Face {
                        stats.face_spun += 1;
                    }
                }
                Err(MeshError::InvalidOperation { reason }) => {
                    trace!("Skipping {:?} {:?} {:?}: {}", kind, he, direction, reason);
                    stats.rejected += 1;
                }
                Err(e) => return Err(e),
            }
        }

        stats.passes = pass + 1;
        debug!(
            "Randomize pass {}/{}: {} attempted, {} spun ({} face), {} rejected",
            pass + 1,
            options.passes,
            stats.attempted - before.attempted,
            stats.spun - before.spun,
            stats.face_spun - before.face_spun,
            stats.rejected - before.rejected
        );
        spinning.report(1, 1, "Spinning edges");
        after_pass(pass, topology, &settling)?;
        settling.report(1, 1, "Pass complete");
    }

    Ok(stats)
}

/// Randomize a topology and relax its positions after every pass.
///
/// # Errors
///
/// Returns [`MeshError::PreconditionViolation`] if `positions` does not have
/// one entry per vertex, [`MeshError::InvalidParameter`] for out-of-range
/// relaxation options, and the errors of [`randomize`]. Options are checked
/// before the first spin.
pub fn randomize_with_relaxation<I, R>(
    topology: &mut Topology<I>,
    positions: &mut Positions,
    surface: &Surface,
    options: &RandomizeOptions,
    relax: &RelaxOptions,
    rng: &mut R,
) -> Result<RandomizeStats>
where
    I: MeshIndex,
    R: Rng + ?Sized,
{
    randomize_with_relaxation_progress(
        topology,
        positions,
        surface,
        options,
        relax,
        rng,
        &Progress::none(),
    )
}

/// [`randomize_with_relaxation`] with progress reporting. Relaxation
/// iterations report inside the second half of each pass.
pub fn randomize_with_relaxation_progress<I, R>(
    topology: &mut Topology<I>,
    positions: &mut Positions,
    surface: &Surface,
    options: &RandomizeOptions,
    relax: &RelaxOptions,
    rng: &mut R,
    progress: &Progress,
) -> Result<RandomizeStats>
where
    I: MeshIndex,
    R: Rng + ?Sized,
{
    MeshError::check_len("positions", topology.num_vertices(), positions.len())?;
    relax.validate()?;

    let mut last = None;
    let mut stats = randomize_with_progress(
        topology,
        options,
        rng,
        |_, topology, progress| {
            last = Some(relax_positions_with_progress(
                topology, positions, surface, relax, progress,
            )?);
            Ok(())
        },
        progress,
    )?;
    stats.relax = last;
    Ok(stats)
}

/// Why a candidate vertex spin would break the requested bounds, if it would.
fn vertex_spin_reject_reason<I: MeshIndex>(
    topology: &Topology<I>,
    options: &RandomizeOptions,
    he: HalfEdgeId<I>,
    direction: SpinDirection,
) -> Option<&'static str> {
    let t = topology.twin(he);
    let left = topology.near_face(he);
    let right = topology.near_face(t);
    if topology.is_external_face(left) || topology.is_external_face(right) {
        return Some("edge lies on the boundary");
    }

    let near = topology.near_vertex(he);
    let far = topology.near_vertex(t);
    let (new_near, new_far) = topology.spin_target(he, direction);

    if options.lock_boundary
        && [near, far, new_near, new_far]
            .iter()
            .any(|&v| topology.is_boundary_vertex(v))
    {
        return Some("touches a locked boundary vertex");
    }

    let losing = [near, far];
    let gaining = [new_near, new_far];
    for (vertices, delta) in [(losing, -1i64), (gaining, 1)] {
        for v in vertices {
            if topology.is_boundary_vertex(v) {
                continue;
            }
            let degree = topology.vertex_degree(v) as i64 + delta;
            if degree < 0 || !options.vertex_degree.contains(degree as usize) {
                return Some("vertex degree out of bounds");
            }
        }
    }

    // Side faces keep their degree across a spin.
    if !options.face_degree.contains(topology.face_degree(left))
        || !options.face_degree.contains(topology.face_degree(right))
    {
        return Some("face degree out of bounds");
    }

    let wrap = match direction {
        SpinDirection::Forward => {
            -topology.wrap(topology.next(t)) + topology.wrap(he) + topology.wrap(topology.next(he))
        }
        SpinDirection::Backward => {
            topology.wrap(topology.prev(he)) + topology.wrap(he) - topology.wrap(topology.prev(t))
        }
    };
    if has_edge(topology, new_near, new_far, wrap) {
        return Some("edge already exists");
    }

    None
}

/// Why a candidate face spin would break the requested bounds, if it would.
fn face_spin_reject_reason<I: MeshIndex>(
    topology: &Topology<I>,
    options: &RandomizeOptions,
    he: HalfEdgeId<I>,
    direction: SpinDirection,
) -> Option<&'static str> {
    let t = topology.twin(he);
    let left = topology.near_face(he);
    let right = topology.near_face(t);
    let (new_left, new_right) = topology.face_spin_target(he, direction);
    if [left, right, new_left, new_right]
        .iter()
        .any(|&f| topology.is_external_face(f))
    {
        return Some("touches the boundary");
    }

    // The two edges that change endpoint, as (new near, far, new wrap).
    let near = topology.near_vertex(he);
    let far = topology.near_vertex(t);
    let moved: [(VertexId<I>, HalfEdgeId<I>, WrapOffset); 2] = match direction {
        SpinDirection::Forward => {
            let b = topology.next(he);
            let d = topology.next(t);
            [
                (near, b, topology.wrap(he) + topology.wrap(b)),
                (far, d, -topology.wrap(he) + topology.wrap(d)),
            ]
        }
        SpinDirection::Backward => {
            let at = topology.twin(topology.prev(he));
            let ct = topology.twin(topology.prev(t));
            [
                (far, at, -topology.wrap(he) + topology.wrap(at)),
                (near, ct, topology.wrap(he) + topology.wrap(ct)),
            ]
        }
    };

    if options.lock_boundary
        && [near, far, topology.far_vertex(moved[0].1), topology.far_vertex(moved[1].1)]
            .iter()
            .any(|&v| topology.is_boundary_vertex(v))
    {
        return Some("touches a locked boundary vertex");
    }

    let shrinking = [left, right];
    let growing = [new_left, new_right];
    for (faces, delta) in [(shrinking, -1i64), (growing, 1)] {
        for f in faces {
            let degree = topology.face_degree(f) as i64 + delta;
            if degree < 0 || !options.face_degree.contains(degree as usize) {
                return Some("face degree out of bounds");
            }
        }
    }

    for (from, edge, wrap) in moved {
        if has_edge(topology, from, topology.far_vertex(edge), wrap) {
            return Some("edge already exists");
        }
    }

    None
}

fn has_edge<I: MeshIndex>(
    topology: &Topology<I>,
    from: VertexId<I>,
    to: VertexId<I>,
    wrap: WrapOffset,
) -> bool {
    topology
        .vertex_halfedges(from)
        .any(|e| topology.far_vertex(e) == to && topology.wrap(e) == wrap)
}
