use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread::JoinHandle;

use log::{debug, info};

use crate::{constants::CHECK_INTERVAL, exchange::SnapshotExchange, simulation::Simulation};

/// Step `sim` until `token` is set or `max_steps` steps have run.
///
/// The starting state is published before the first step. After that, every
/// `CHECK_INTERVAL` steps a snapshot is published if the reader asked for one.
/// The final state is always published before returning.
pub fn run_sim_loop(
    mut sim: Simulation,
    exchange: Arc<SnapshotExchange>,
    token: Arc<AtomicBool>,
    max_steps: Option<u64>,
) -> Simulation {
    info!("Simulation loop started at tick {}", sim.ticks());
    exchange.store(&sim);
    let mut since_sample = 0;
    let mut steps = 0;

    loop {
        if max_steps.is_some_and(|max| steps >= max) || token.load(Ordering::Relaxed) {
            break;
        }

        sim.exec_iter();
        steps += 1;
        since_sample += 1;

        if steps % CHECK_INTERVAL == 0 && exchange.should_store() {
            exchange.store(&sim);
            debug!("Iterations since last sample: {since_sample}");
            since_sample = 0;
        }
    }

    exchange.store(&sim);
    info!("Simulation loop terminated after {steps} steps ({})", sim.elapsed());
    sim
}

/// Run [`run_sim_loop`] on a dedicated thread.
pub fn spawn_sim_loop(
    sim: Simulation,
    exchange: Arc<SnapshotExchange>,
    token: Arc<AtomicBool>,
    max_steps: Option<u64>,
) -> std::io::Result<JoinHandle<Simulation>> {
    std::thread::Builder::new()
        .name("nbody-sim".to_owned())
        .spawn(move || run_sim_loop(sim, exchange, token, max_steps))
}
