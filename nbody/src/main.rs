use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use anyhow::anyhow;
use clap::{Parser, ValueEnum};
use log::info;
use nbody::{
    Body, Diagnostics, ExecutionPath, RateCounter, SimConfig, Simulation, SnapshotExchange,
    compute_elapsed_time,
    constants::{BODY_COUNT, DELTA, SAMPLE_RADIUS, SOFTENING},
    spawn_sim_loop,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Execution {
    Sequential,
    Parallel,
    Symmetric,
    /// Compute dispatches on a wgpu device (needs the `gpu` feature).
    Gpu,
}

/// Headless direct-sum N-body simulation.
#[derive(Debug, Parser)]
#[command(name = "nbody", version)]
struct Args {
    /// Number of bodies
    #[arg(long, default_value_t = BODY_COUNT)]
    bodies: usize,
    /// Radius of the initial sampling ball
    #[arg(long, default_value_t = SAMPLE_RADIUS)]
    radius: f32,
    /// Fixed timestep
    #[arg(long, default_value_t = DELTA)]
    dt: f32,
    /// Plummer softening length
    #[arg(long, default_value_t = SOFTENING)]
    softening: f32,
    /// Steps to run before exiting
    #[arg(long, default_value_t = 4096)]
    steps: u64,
    #[arg(long, value_enum, default_value_t = Execution::Parallel)]
    execution: Execution,
    /// Seed for the initial sampling; drawn from the OS when omitted
    #[arg(long)]
    seed: Option<u64>,
    /// Force-pass threads for the parallel path
    #[arg(long)]
    threads: Option<usize>,
    /// Log diagnostics every this many steps
    #[arg(long, default_value_t = 256)]
    report_every: u64,
}

impl Args {
    fn config(&self) -> SimConfig {
        let execution = match self.execution {
            Execution::Sequential | Execution::Gpu => ExecutionPath::Sequential,
            Execution::Parallel => ExecutionPath::Parallel,
            Execution::Symmetric => ExecutionPath::Symmetric,
        };
        SimConfig {
            body_count: self.bodies,
            radius: self.radius,
            dt: self.dt,
            softening: self.softening,
            execution,
            seed: self.seed,
            threads: self.threads,
        }
    }
}

fn report(tick: u64, bodies: &[Body], initial: &Diagnostics, config: &SimConfig, rate: f64) {
    let now = Diagnostics::measure(bodies, config.softening);
    info!(
        "{} | {:.1} steps/s | energy drift {:+.3e} | momentum ({:.2e}, {:.2e}, {:.2e})",
        compute_elapsed_time(tick, config.dt),
        rate,
        now.energy_drift(initial),
        now.momentum.x,
        now.momentum.y,
        now.momentum.z,
    );
}

fn run_cpu(args: &Args, config: &SimConfig) -> anyhow::Result<()> {
    let sim = Simulation::new(config)?;
    info!("Execution path: {}", sim.integrator().execution());
    let initial = sim.diagnostics();

    let exchange = Arc::new(SnapshotExchange::new(sim.bodies()));
    let token = Arc::new(AtomicBool::new(false));
    let handle = spawn_sim_loop(sim, exchange.clone(), token.clone(), Some(args.steps))?;

    // Sample snapshots the way a render loop would, once per frame.
    let mut snapshot = Vec::with_capacity(config.body_count);
    let mut rate = RateCounter::new();
    let mut last_report = 0;
    while !handle.is_finished() {
        std::thread::sleep(Duration::from_millis(16));
        let tick = exchange.sample_into(&mut snapshot);
        rate.tick(tick);
        if tick >= last_report + args.report_every {
            report(tick, &snapshot, &initial, config, rate.rate());
            last_report = tick;
        }
    }

    token.store(true, Ordering::Relaxed);
    let sim = handle
        .join()
        .map_err(|_| anyhow!("simulation thread panicked"))?;

    let last = sim.diagnostics();
    info!(
        "Done: {} | seed {:?} | energy drift {:+.3e}",
        sim.elapsed(),
        sim.seed(),
        last.energy_drift(&initial)
    );
    Ok(())
}

#[cfg(feature = "gpu")]
fn run_gpu(args: &Args, config: &SimConfig) -> anyhow::Result<()> {
    use nbody::{
        BodyBuffer,
        gpu::{GpuContext, GpuIntegrator},
    };

    let seed = config.seed.unwrap_or_else(rand::random::<u64>);
    info!("Sampling {} bodies with seed {seed}", config.body_count);
    let mut bodies = BodyBuffer::sample(config, seed)?;
    let initial = Diagnostics::measure(bodies.bodies(), config.softening);

    let mut gpu = GpuIntegrator::new(GpuContext::new_blocking()?, config)?;
    gpu.upload(&bodies)?;

    let mut rate = RateCounter::new();
    let mut tick = 0;
    let chunk = args.report_every.max(1);
    while tick < args.steps {
        let steps = chunk.min(args.steps - tick);
        gpu.step(steps);
        gpu.download(&mut bodies)?;
        tick += steps;
        rate.tick(tick);
        report(tick, bodies.bodies(), &initial, config, rate.rate());
    }
    info!("Done: {}", compute_elapsed_time(tick, config.dt));
    Ok(())
}

#[cfg(not(feature = "gpu"))]
fn run_gpu(_args: &Args, _config: &SimConfig) -> anyhow::Result<()> {
    anyhow::bail!("this binary was built without the `gpu` feature")
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.config();
    config.validate()?;

    match args.execution {
        Execution::Gpu => run_gpu(&args, &config),
        _ => run_cpu(&args, &config),
    }
}
