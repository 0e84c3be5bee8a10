//! Tessel CLI - build, randomize and pick tilings from the command line.
//!
//! Usage: tessel <COMMAND> [OPTIONS]
//!
//! Run `tessel --help` for available commands. Set `RUST_LOG=debug` for
//! per-pass diagnostics.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use nalgebra::{Point3, Vector3};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use tessel::algo::attributes::{average_edge_length, face_areas};
use tessel::algo::randomize::{randomize_with_relaxation_progress, RandomizeOptions};
use tessel::algo::relax::{folded_faces, RelaxOptions};
use tessel::algo::Progress;
use tessel::grid::{
    build_grid, BasePolyhedron, Grid, GridDescriptor, HexGridDescriptor, QuadGridDescriptor,
    SphereDescriptor,
};
use tessel::spatial::FacePartitioning;
use tessel::surface::Ray;

#[derive(Parser)]
#[command(name = "tessel")]
#[command(author, version, about = "Tiling topology CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a grid and display its topology
    Info {
        #[command(flatten)]
        grid: GridArgs,
    },

    /// Build a grid, randomize it and display the result
    Randomize {
        #[command(flatten)]
        grid: GridArgs,

        #[command(flatten)]
        randomize: RandomizeArgs,
    },

    /// Build a grid and find the face hit by a ray
    Pick {
        #[command(flatten)]
        grid: GridArgs,

        #[command(flatten)]
        randomize: RandomizeArgs,

        /// Ray origin
        #[arg(
            long,
            required = true,
            num_args = 3,
            value_names = ["X", "Y", "Z"],
            allow_negative_numbers = true
        )]
        origin: Vec<f64>,

        /// Ray direction
        #[arg(
            long,
            required = true,
            num_args = 3,
            value_names = ["X", "Y", "Z"],
            allow_negative_numbers = true
        )]
        direction: Vec<f64>,

        /// Randomize the grid before picking
        #[arg(long)]
        randomized: bool,
    },
}

#[derive(Args)]
struct GridArgs {
    /// Kind of grid
    #[arg(short, long, value_enum, default_value = "quad")]
    shape: Shape,

    /// Cells along the first axis (planar grids)
    #[arg(short = 'W', long, default_value = "8")]
    width: usize,

    /// Cells along the second axis (planar grids)
    #[arg(short = 'H', long, default_value = "8")]
    height: usize,

    /// Wrap the first axis (planar grids)
    #[arg(long)]
    wrap0: bool,

    /// Wrap the second axis (planar grids)
    #[arg(long)]
    wrap1: bool,

    /// Base polyhedron (sphere)
    #[arg(long, value_enum, default_value = "icosahedron")]
    base: Base,

    /// Subdivision degree (sphere)
    #[arg(long, default_value = "2")]
    subdivision: usize,

    /// Replace the sphere tiling by its dual
    #[arg(long)]
    dual: bool,

    /// Sphere radius
    #[arg(long, default_value = "1.0")]
    radius: f64,
}

#[derive(Args)]
struct RandomizeArgs {
    /// Seed for the random number generator
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Number of passes over all edges
    #[arg(short, long, default_value = "1")]
    passes: usize,

    /// Probability of attempting a spin per edge (0.0 to 1.0)
    #[arg(short, long, default_value = "0.5")]
    frequency: f64,

    /// Minimum and maximum face degree
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], default_values_t = [3, 8])]
    face_degree: Vec<usize>,

    /// Minimum and maximum interior vertex degree
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], default_values_t = [3, 8])]
    vertex_degree: Vec<usize>,

    /// Blend between equal-area (0.0) and regularity (1.0) relaxation
    #[arg(long, default_value = "0.5")]
    regularity: f64,

    /// Maximum relaxation iterations per pass
    #[arg(long, default_value = "20")]
    relax_iterations: usize,

    /// Allow boundary vertices to move and their edges to spin
    #[arg(long)]
    move_boundary: bool,

    /// Never spin edge endpoints (keeps vertex degrees)
    #[arg(long, conflicts_with = "no_face_spins")]
    no_vertex_spins: bool,

    /// Never spin edge side faces (keeps face degrees)
    #[arg(long)]
    no_face_spins: bool,

    /// Use single-threaded relaxation (for benchmarking)
    #[arg(long)]
    sequential: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Shape {
    /// Rectangular grid of quadrilaterals
    Quad,
    /// Rectangular grid of hexagons
    Hex,
    /// Subdivided polyhedron on a sphere
    Sphere,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Base {
    Tetrahedron,
    Cube,
    Octahedron,
    Dodecahedron,
    Icosahedron,
}

impl From<Base> for BasePolyhedron {
    fn from(base: Base) -> Self {
        match base {
            Base::Tetrahedron => BasePolyhedron::Tetrahedron,
            Base::Cube => BasePolyhedron::Cube,
            Base::Octahedron => BasePolyhedron::Octahedron,
            Base::Dodecahedron => BasePolyhedron::Dodecahedron,
            Base::Icosahedron => BasePolyhedron::Icosahedron,
        }
    }
}

impl GridArgs {
    fn descriptor(&self) -> GridDescriptor {
        match self.shape {
            Shape::Quad => QuadGridDescriptor::new(self.width, self.height)
                .with_wrap(self.wrap0, self.wrap1)
                .into(),
            Shape::Hex => HexGridDescriptor::new(self.width, self.height)
                .with_wrap(self.wrap0, self.wrap1)
                .into(),
            Shape::Sphere => SphereDescriptor::new(self.base.into())
                .with_radius(self.radius)
                .with_subdivision(self.subdivision)
                .with_dual(self.dual)
                .into(),
        }
    }
}

impl RandomizeArgs {
    fn options(&self) -> (RandomizeOptions, RelaxOptions) {
        let randomize = RandomizeOptions::default()
            .with_passes(self.passes)
            .with_frequency(self.frequency)
            .with_face_degree(self.face_degree[0], self.face_degree[1])
            .with_vertex_degree(self.vertex_degree[0], self.vertex_degree[1])
            .with_lock_boundary(!self.move_boundary)
            .with_spin_kinds(!self.no_vertex_spins, !self.no_face_spins);
        let relax = RelaxOptions::default()
            .with_regularity_weight(self.regularity)
            .with_max_relax_iterations(self.relax_iterations)
            .with_lock_boundary(!self.move_boundary)
            .with_parallel(!self.sequential);
        (randomize, relax)
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { grid } => cmd_info(&grid)?,
        Commands::Randomize { grid, randomize } => cmd_randomize(&grid, &randomize)?,
        Commands::Pick {
            grid,
            randomize,
            origin,
            direction,
            randomized,
        } => {
            let randomize = randomized.then_some(&randomize);
            cmd_pick(&grid, randomize, &origin, &direction)?
        }
    }

    Ok(())
}

/// Terminal status line for a randomization run of `passes` passes.
///
/// Nested reports arrive in thousandths of the whole run; the pass number is
/// recovered from that fraction.
fn create_progress(passes: usize) -> Progress {
    let passes = passes.max(1);
    let drawn = AtomicUsize::new(usize::MAX);

    Progress::new(move |current, total, phase| {
        if total == 0 {
            return;
        }
        let permille = current.min(total) * 1000 / total;
        let percent = permille / 10;
        if drawn.swap(percent, Ordering::Relaxed) == percent {
            return;
        }

        let pass = (permille * passes / 1000 + 1).min(passes);
        let filled = percent * 24 / 100;
        eprint!(
            "\r{:>3}% [{:<24}] pass {}/{} {:<16}",
            percent,
            "#".repeat(filled),
            pass,
            passes,
            phase
        );
        let _ = std::io::stderr().flush();
        if current >= total {
            eprintln!();
        }
    })
}

fn build(args: &GridArgs) -> Result<Grid, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let grid: Grid = build_grid(&args.descriptor())?;
    println!(
        "Built: {} vertices, {} faces ({:.2?})",
        grid.topology.num_vertices(),
        grid.topology.num_internal_faces(),
        start.elapsed()
    );
    Ok(grid)
}

fn print_summary(grid: &Grid) -> Result<(), Box<dyn std::error::Error>> {
    let topology = &grid.topology;

    println!("Vertices: {}", topology.num_vertices());
    println!("Edges: {}", topology.num_edges());
    println!(
        "Faces: {} internal, {} external",
        topology.num_internal_faces(),
        topology.num_external_faces()
    );
    println!("Euler characteristic: {}", topology.euler_characteristic());

    let mut vertex_degrees = BTreeMap::new();
    for v in topology.vertex_ids() {
        *vertex_degrees.entry(topology.vertex_degree(v)).or_insert(0usize) += 1;
    }
    let mut face_degrees = BTreeMap::new();
    for f in topology.internal_face_ids() {
        *face_degrees.entry(topology.face_degree(f)).or_insert(0usize) += 1;
    }
    println!("Vertex degrees: {:?}", vertex_degrees);
    println!("Face degrees: {:?}", face_degrees);

    let areas = face_areas(topology, &grid.surface, &grid.positions)?;
    let (mut min_area, mut max_area) = (f64::MAX, 0.0_f64);
    for f in topology.internal_face_ids() {
        min_area = min_area.min(areas[f]);
        max_area = max_area.max(areas[f]);
    }
    println!("Face area range: [{:.6}, {:.6}]", min_area, max_area);
    println!(
        "Average edge length: {:.6}",
        average_edge_length(topology, &grid.surface, &grid.positions)
    );

    match topology.validate() {
        Ok(()) => println!("Topology: valid"),
        Err(e) => println!("Topology: INVALID ({})", e),
    }

    Ok(())
}

fn cmd_info(args: &GridArgs) -> Result<(), Box<dyn std::error::Error>> {
    let grid = build(args)?;
    print_summary(&grid)
}

fn randomize_grid(
    grid: &mut Grid,
    args: &RandomizeArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let (options, relax) = args.options();
    let mode = if args.sequential { "sequential" } else { "parallel" };
    println!(
        "Randomizing ({} passes, frequency={}, seed={}, {})...",
        options.passes, options.frequency, args.seed, mode
    );

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let progress = create_progress(options.passes);
    let start = Instant::now();

    let Grid {
        topology,
        positions,
        surface,
    } = grid;
    let stats = randomize_with_relaxation_progress(
        topology, positions, surface, &options, &relax, &mut rng, &progress,
    )?;
    let elapsed = start.elapsed();

    println!(
        "Spins: {} attempted, {} performed ({} vertex, {} face), {} rejected ({:.2?})",
        stats.attempted,
        stats.spun,
        stats.spun - stats.face_spun,
        stats.face_spun,
        stats.rejected,
        elapsed
    );
    if let Some(relax) = stats.relax {
        println!(
            "Last relaxation: {} iterations, converged={}, repaired={}",
            relax.iterations, relax.converged, relax.repaired
        );
    }
    let folded = folded_faces(topology, surface, positions);
    if !folded.is_empty() {
        println!("Folded faces: {}", folded.len());
    }

    Ok(())
}

fn cmd_randomize(
    args: &GridArgs,
    randomize: &RandomizeArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut grid = build(args)?;
    randomize_grid(&mut grid, randomize)?;
    print_summary(&grid)
}

fn cmd_pick(
    args: &GridArgs,
    randomize: Option<&RandomizeArgs>,
    origin: &[f64],
    direction: &[f64],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut grid = build(args)?;
    if let Some(randomize) = randomize {
        randomize_grid(&mut grid, randomize)?;
    }

    let start = Instant::now();
    let partitioning = FacePartitioning::build(&grid.topology, &grid.surface, &grid.positions)?;
    println!("Partitioned ({:.2?})", start.elapsed());

    let ray = Ray::new(
        Point3::new(origin[0], origin[1], origin[2]),
        Vector3::new(direction[0], direction[1], direction[2]),
    );
    match partitioning.find_face(&ray) {
        Some(face) => {
            let corners: Vec<_> = grid.topology.face_vertices(face).collect();
            println!("Hit: {:?} (corners {:?})", face, corners);
        }
        None => println!("Hit: none"),
    }

    Ok(())
}
