//! hard-discs — event-driven hard discs on the edmd core.
//!
//! Places discs of unit diameter on a square lattice in a periodic box,
//! gives them a unit-temperature velocity distribution, and runs the
//! scheduler for a fixed number of events.  A non-zero `--shear` switches
//! the box to Lees-Edwards boundaries.
//!
//! ```text
//! cargo run --release -p hard-discs -- --n 4096 --density 0.6 --events 1000000
//! ```

mod gas;
mod sources;

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use edmd_core::{
    CellConfig, FelStrategy, NeighbourPolicy, PairKey, PairMap, PelStrategy, SchedulerConfig,
};
use edmd_event::{Event, EventKind};
use edmd_sched::{HaltHandle, RunOutcome, SchedulerBuilder, SchedulerObserver, SchedulerStats};
use tracing::{info, warn};

use gas::Gas;
use sources::{HardDiscs, Report};

// ── Constants ─────────────────────────────────────────────────────────────────

const DIAMETER:         f64 = 1.0;
/// Events between wall-clock checks.
const WALL_CHECK_EVERY: u64 = 4_096;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "hard-discs")]
#[command(about = "Event-driven hard discs in a periodic or sheared box")]
#[command(version)]
struct Cli {
    /// Number of discs
    #[arg(short, long, default_value = "1024")]
    n: usize,

    /// Discs per unit area (diameter 1)
    #[arg(long, default_value = "0.5")]
    density: f64,

    /// Events to dispatch
    #[arg(short, long, default_value = "100000")]
    events: u64,

    /// Future event list strategy (tree, calendar)
    #[arg(long, default_value = "calendar")]
    fel: FelStrategy,

    /// Pending event list strategy (minmax2, minmax3, minmax4, minmax8, heap)
    #[arg(long, default_value = "minmax4")]
    pel: PelStrategy,

    /// Neighbour cells searched in each direction
    #[arg(long, default_value = "1")]
    overlink: usize,

    /// Lees-Edwards shear rate; 0 keeps a plain periodic box
    #[arg(long, default_value = "0")]
    shear: f64,

    /// Only predict new pairs for the moving disc on cell changes
    #[arg(long)]
    pair_only: bool,

    /// Simulation time between state reports (0 disables them)
    #[arg(long, default_value = "10")]
    report_interval: f64,

    /// Stop after this many wall-clock seconds
    #[arg(long)]
    max_seconds: Option<f64>,

    /// Abort on events found in the past
    #[arg(long)]
    strict: bool,

    #[arg(long, default_value = "42")]
    seed: u64,
}

// ── Observer ──────────────────────────────────────────────────────────────────

/// Counts collisions per pair and enforces the wall-clock limit.
struct Progress {
    collisions: PairMap<u64>,
    halt:       HaltHandle,
    started:    Instant,
    limit:      Option<f64>,
    seen:       u64,
}

impl SchedulerObserver for Progress {
    fn on_event(&mut self, event: &Event, _system_time: f64) {
        self.seen += 1;
        if event.kind == EventKind::Interaction {
            if let Some(other) = event.secondary {
                *self.collisions.entry(PairKey::new(event.primary, other)).or_default() += 1;
            }
        }
        if let Some(limit) = self.limit {
            if self.seen % WALL_CHECK_EVERY == 0 && self.started.elapsed().as_secs_f64() > limit {
                self.halt.halt();
            }
        }
    }

    fn on_halt(&mut self, stats: &SchedulerStats) {
        warn!(events = stats.events, "wall-clock limit reached");
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt::init();

    let gas = Gas::lattice(cli.n, cli.density, DIAMETER, cli.shear, cli.seed)
        .context("placing discs")?;

    let config = SchedulerConfig {
        fel: cli.fel,
        pel: cli.pel,
        cells: CellConfig {
            overlink:          cli.overlink,
            interaction_range: DIAMETER,
            shearing:          cli.shear != 0.0,
            cell_counts:       None,
        },
        strict: cli.strict,
        neighbour_policy: if cli.pair_only {
            NeighbourPolicy::PairOnly
        } else {
            NeighbourPolicy::Invalidate
        },
        ..SchedulerConfig::default()
    };

    let halt = HaltHandle::new();
    let mut sched = SchedulerBuilder::new(config, gas)
        .source(HardDiscs::new(DIAMETER))
        .source(Report::new(cli.report_interval))
        .halt_handle(halt.clone())
        .build()
        .context("building scheduler")?;

    let initial_energy = sched.world().kinetic_energy();
    let mut progress = Progress {
        collisions: PairMap::default(),
        halt,
        started: Instant::now(),
        limit: cli.max_seconds,
        seen: 0,
    };

    let outcome = sched.run(cli.events, &mut progress).context("event loop")?;
    let elapsed = progress.started.elapsed().as_secs_f64();

    // ── Summary ───────────────────────────────────────────────────────────
    let stats = sched.stats();
    let fel = sched.fel_stats();
    let busiest = progress.collisions.iter().max_by_key(|(_, n)| **n);

    let outcome = match outcome {
        RunOutcome::Completed => "completed",
        RunOutcome::Halted => "halted",
    };
    let rate = stats.events as f64 / elapsed.max(1e-9);

    println!("outcome          {outcome}");
    println!("events           {}", stats.events);
    println!("simulation time  {:.6}", sched.system_time());
    println!("wall time        {elapsed:.3} s ({rate:.0} events/s)");
    println!("collisions       {}", stats.interactions);
    println!("cell transitions {}", stats.cell_transitions);
    println!("system events    {}", stats.system_events);
    println!("recalculations   {}", stats.recalculations);
    println!("rejections       {}", stats.rejections);
    println!("anomalies        {} ({} clamped)", stats.anomalies, stats.clamped);
    println!(
        "fel              {} lists={} scale={:.4} stale={} overflow={}",
        sched.fel_name(),
        fel.lists,
        fel.scale,
        fel.stale_discards,
        fel.overflow_events
    );
    println!("energy drift     {:.3e}", sched.world().kinetic_energy() - initial_energy);
    if let Some((pair, n)) = busiest {
        println!("busiest pair     {} / {} ({n} collisions)", pair.lo(), pair.hi());
    }
    info!(distinct_pairs = progress.collisions.len(), "done");
    Ok(())
}
