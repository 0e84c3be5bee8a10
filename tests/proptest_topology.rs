//! Property-based tests for topology invariants.
//!
//! These tests use proptest to build grids of random size and wrapping,
//! mutate them, and verify the half-edge invariants hold throughout.
//!
//! Run with: cargo test --test proptest_topology

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tessel::algo::attributes::{face_polygon, polygon_centroid};
use tessel::mesh::HalfEdge;
use tessel::prelude::*;
use std::result::Result;

// =============================================================================
// Strategies
// =============================================================================

/// Quad grid size and wrap flags. Wrapped axes get at least two cells.
fn arb_quad_grid() -> impl Strategy<Value = QuadGridDescriptor> {
    (1usize..9, 1usize..9, any::<bool>(), any::<bool>()).prop_map(|(w, h, wrap0, wrap1)| {
        let w = if wrap0 { w.max(2) } else { w };
        let h = if wrap1 { h.max(2) } else { h };
        QuadGridDescriptor::new(w, h).with_wrap(wrap0, wrap1)
    })
}

/// Hex grid size and wrap flags. A wrapped second axis needs an even height.
fn arb_hex_grid() -> impl Strategy<Value = HexGridDescriptor> {
    (1usize..7, 1usize..7, any::<bool>(), any::<bool>()).prop_map(|(w, h, wrap0, wrap1)| {
        let w = if wrap0 { w.max(3) } else { w };
        let h = if wrap1 { (h.max(2) + 1) / 2 * 2 } else { h };
        HexGridDescriptor::new(w, h).with_wrap(wrap0, wrap1)
    })
}

fn arb_sphere() -> impl Strategy<Value = SphereDescriptor> {
    (
        prop_oneof![
            Just(BasePolyhedron::Tetrahedron),
            Just(BasePolyhedron::Cube),
            Just(BasePolyhedron::Octahedron),
            Just(BasePolyhedron::Dodecahedron),
            Just(BasePolyhedron::Icosahedron),
        ],
        0usize..4,
        any::<bool>(),
    )
        .prop_map(|(base, subdivision, dual)| {
            SphereDescriptor::new(base)
                .with_subdivision(subdivision)
                .with_dual(dual)
        })
}

fn arb_descriptor() -> impl Strategy<Value = GridDescriptor> {
    prop_oneof![
        arb_quad_grid().prop_map(GridDescriptor::from),
        arb_hex_grid().prop_map(GridDescriptor::from),
        arb_sphere().prop_map(GridDescriptor::from),
    ]
}

// =============================================================================
// Helpers
// =============================================================================

fn halfedges(topology: &Topology) -> Vec<HalfEdge> {
    topology
        .halfedge_ids()
        .map(|he| *topology.halfedge(he))
        .collect()
}

/// Vertex degrees followed by face degrees.
fn all_degrees(topology: &Topology) -> Vec<usize> {
    topology
        .vertex_ids()
        .map(|v| topology.vertex_degree(v))
        .chain(topology.face_ids().map(|f| topology.face_degree(f)))
        .collect()
}

fn check_cycles(topology: &Topology) -> Result<(), TestCaseError> {
    for he in topology.halfedge_ids() {
        prop_assert_eq!(topology.twin(topology.twin(he)), he);
        prop_assert_eq!(topology.prev(topology.next(he)), he);
    }
    for f in topology.face_ids() {
        let start = topology.face(f).halfedge;
        let mut he = start;
        for _ in 0..topology.face_degree(f) {
            prop_assert_eq!(topology.near_face(he), f);
            he = topology.next(he);
        }
        prop_assert_eq!(he, start);
    }
    for v in topology.vertex_ids() {
        let start = topology.vertex(v).halfedge;
        let mut he = start;
        for _ in 0..topology.vertex_degree(v) {
            prop_assert_eq!(topology.near_vertex(he), v);
            he = topology.next_around_vertex(he);
        }
        prop_assert_eq!(he, start);
    }
    Ok(())
}

// =============================================================================
// Property Tests: Construction
// =============================================================================

proptest! {
    /// Every builder produces a valid topology with consistent cycles.
    #[test]
    fn built_grids_are_valid(desc in arb_descriptor()) {
        let grid: Grid = build_grid(&desc).unwrap();
        prop_assert!(grid.topology.is_valid(), "{:?}", grid.topology.validate());
        prop_assert_eq!(grid.positions.len(), grid.topology.num_vertices());
        check_cycles(&grid.topology)?;
    }

    /// Planar grids have one internal face per cell and the Euler
    /// characteristic their wrapping implies.
    #[test]
    fn planar_counts(desc in arb_quad_grid()) {
        let grid: Grid = build_quad_grid(&desc).unwrap();
        let topology = &grid.topology;
        prop_assert_eq!(topology.num_internal_faces(), desc.width * desc.height);

        let external = match (desc.wrap_axis0, desc.wrap_axis1) {
            (false, false) => 1,
            (true, true) => 0,
            _ => 2,
        };
        prop_assert_eq!(topology.num_external_faces(), external);
        let euler = if external == 0 { 0 } else { 2 };
        prop_assert_eq!(topology.euler_characteristic(), euler);
    }

    /// Spheres are closed with Euler characteristic 2.
    #[test]
    fn spheres_are_closed(desc in arb_sphere()) {
        let grid: Grid = build_sphere(&desc).unwrap();
        prop_assert_eq!(grid.topology.num_external_faces(), 0);
        prop_assert_eq!(grid.topology.euler_characteristic(), 2);
    }

    /// Building is deterministic.
    #[test]
    fn building_is_deterministic(desc in arb_descriptor()) {
        let a: Grid = build_grid(&desc).unwrap();
        let b: Grid = build_grid(&desc).unwrap();
        prop_assert_eq!(halfedges(&a.topology), halfedges(&b.topology));
        prop_assert_eq!(a.positions.as_slice(), b.positions.as_slice());
    }
}

// =============================================================================
// Property Tests: Spins
// =============================================================================

proptest! {
    /// A backward spin undoes a forward spin and vice versa, for both kinds.
    #[test]
    fn spin_round_trip(
        desc in arb_descriptor(),
        pick in any::<prop::sample::Index>(),
        forward in any::<bool>(),
        face in any::<bool>(),
    ) {
        let grid: Grid = build_grid(&desc).unwrap();
        let mut topology = grid.topology;
        let before = halfedges(&topology);
        let degrees = all_degrees(&topology);

        let he = HalfEdgeId::new(pick.index(topology.num_halfedges()));
        let direction = if forward { SpinDirection::Forward } else { SpinDirection::Backward };
        let kind = if face { SpinKind::Face } else { SpinKind::Vertex };

        match topology.spin(he, kind, direction) {
            Ok(()) => {
                prop_assert!(topology.is_valid(), "{:?}", topology.validate());
                check_cycles(&topology)?;
                topology.spin(he, kind, direction.reversed()).unwrap();
                prop_assert_eq!(halfedges(&topology), before);
                prop_assert_eq!(all_degrees(&topology), degrees);
            }
            Err(MeshError::InvalidOperation { .. }) => {
                prop_assert_eq!(halfedges(&topology), before);
            }
            Err(e) => prop_assert!(false, "unexpected error {}", e),
        }
    }

    /// Spins keep face degrees and move vertex degrees by one.
    #[test]
    fn spin_degree_bookkeeping(
        desc in arb_quad_grid(),
        pick in any::<prop::sample::Index>(),
    ) {
        let grid: Grid = build_quad_grid(&desc).unwrap();
        let mut topology = grid.topology;
        let candidates: Vec<HalfEdgeId> = topology
            .halfedge_ids()
            .filter(|&he| topology.can_spin_edge_forward(he))
            .collect();
        if candidates.is_empty() {
            return Ok(());
        }
        let he = candidates[pick.index(candidates.len())];

        let (new_near, new_far) = topology.spin_target(he, SpinDirection::Forward);
        let near = topology.near_vertex(he);
        let far = topology.far_vertex(he);
        let left = topology.near_face(he);
        let right = topology.far_face(he);
        let before = [near, far, new_near, new_far].map(|v| topology.vertex_degree(v));
        let faces = [topology.face_degree(left), topology.face_degree(right)];

        topology.spin_edge_forward(he).unwrap();

        prop_assert_eq!(topology.near_vertex(he), new_near);
        prop_assert_eq!(topology.far_vertex(he), new_far);
        let after = [near, far, new_near, new_far].map(|v| topology.vertex_degree(v));
        prop_assert_eq!(after, [before[0] - 1, before[1] - 1, before[2] + 1, before[3] + 1]);
        prop_assert_eq!([topology.face_degree(left), topology.face_degree(right)], faces);
    }

    /// Face spins keep vertex degrees and move face degrees by one.
    #[test]
    fn face_spin_degree_bookkeeping(
        desc in arb_hex_grid(),
        pick in any::<prop::sample::Index>(),
        forward in any::<bool>(),
    ) {
        let grid: Grid = build_hex_grid(&desc).unwrap();
        let mut topology = grid.topology;
        let direction = if forward { SpinDirection::Forward } else { SpinDirection::Backward };
        let candidates: Vec<HalfEdgeId> = topology
            .halfedge_ids()
            .filter(|&he| match direction {
                SpinDirection::Forward => topology.can_spin_face_edge_forward(he),
                SpinDirection::Backward => topology.can_spin_face_edge_backward(he),
            })
            .collect();
        if candidates.is_empty() {
            return Ok(());
        }
        let he = candidates[pick.index(candidates.len())];

        let (new_left, new_right) = topology.face_spin_target(he, direction);
        let sides = [topology.near_face(he), topology.far_face(he), new_left, new_right];
        let before = sides.map(|f| topology.face_degree(f));
        let vertices: Vec<usize> =
            topology.vertex_ids().map(|v| topology.vertex_degree(v)).collect();

        topology.spin_face_edge(he, direction).unwrap();

        prop_assert!(topology.is_valid(), "{:?}", topology.validate());
        prop_assert_eq!(topology.near_face(he), new_left);
        prop_assert_eq!(topology.far_face(he), new_right);
        let after = sides.map(|f| topology.face_degree(f));
        prop_assert_eq!(after, [before[0] - 1, before[1] - 1, before[2] + 1, before[3] + 1]);
        let vertices_after: Vec<usize> =
            topology.vertex_ids().map(|v| topology.vertex_degree(v)).collect();
        prop_assert_eq!(vertices_after, vertices);
    }
}

// =============================================================================
// Property Tests: Randomization and picking
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Randomization keeps the topology valid and inside the degree bounds.
    #[test]
    fn randomize_respects_bounds(
        desc in arb_descriptor(),
        seed in any::<u64>(),
        passes in 1usize..4,
        frequency in 0.0f64..=1.0,
    ) {
        let grid: Grid = build_grid(&desc).unwrap();
        let mut topology = grid.topology;
        let euler = topology.euler_characteristic();

        let options = RandomizeOptions::default()
            .with_passes(passes)
            .with_frequency(frequency)
            .with_vertex_degree(3, 7);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let stats = randomize(&mut topology, &options, &mut rng, |_, t| {
            assert!(t.is_valid(), "{:?}", t.validate());
            Ok(())
        }).unwrap();

        prop_assert_eq!(stats.attempted, stats.spun + stats.rejected);
        prop_assert!(topology.is_valid(), "{:?}", topology.validate());
        prop_assert_eq!(topology.euler_characteristic(), euler);
        check_cycles(&topology)?;
        // Every builder starts inside these bounds.
        for v in topology.vertex_ids() {
            if !topology.is_boundary_vertex(v) {
                let d = topology.vertex_degree(v);
                prop_assert!((3..=7).contains(&d), "{:?} has degree {}", v, d);
            }
        }
        for f in topology.internal_face_ids() {
            prop_assert!(options.face_degree.contains(topology.face_degree(f)));
        }
    }

    /// Every face is found at its centroid, on every surface.
    #[test]
    fn partitioning_finds_centroids(desc in arb_descriptor()) {
        let grid: Grid = build_grid(&desc).unwrap();
        let partitioning =
            FacePartitioning::build(&grid.topology, &grid.surface, &grid.positions).unwrap();
        for f in grid.topology.internal_face_ids() {
            let polygon = face_polygon(&grid.topology, &grid.surface, &grid.positions, f);
            let c = polygon_centroid(&polygon);
            let ray = Ray::toward(c, grid.surface.normal_at(&c), 2.0);
            prop_assert_eq!(partitioning.find_face(&ray), Some(f));
        }
    }
}
