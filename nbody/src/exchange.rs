use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{bodies::BodyBuffer, body::Body, simulation::Simulation};

/// Primitive for handing body snapshots from the simulation thread to a reader.
///
/// The simulation only copies into the snapshot between completed steps, so a
/// reader never observes a half-applied step.
pub struct SnapshotExchange {
    sample: Mutex<Vec<Body>>,
    should_sample: AtomicBool,
    simulation_tick: AtomicU64,
    published: AtomicU64,
}

impl SnapshotExchange {
    /// Start with `bodies` as the published snapshot at tick 0, so a reader
    /// never sees records that no step produced.
    pub fn new(bodies: &BodyBuffer) -> Self {
        Self {
            sample: Mutex::new(bodies.bodies().to_vec()),
            should_sample: AtomicBool::new(true),
            simulation_tick: AtomicU64::new(0),
            published: AtomicU64::new(0),
        }
    }

    // A panic while copying leaves a complete previous snapshot or a complete
    // new one, so a poisoned lock is still safe to read.
    fn lock(&self) -> MutexGuard<'_, Vec<Body>> {
        self.sample.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return whether the reader is ready to accept a new snapshot.
    pub fn should_store(&self) -> bool {
        self.should_sample
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// Copy every body record, as well as the current tick.
    pub fn store(&self, sim: &Simulation) {
        let mut data = self.lock();
        data.clear();
        data.extend_from_slice(sim.bodies().bodies());
        self.simulation_tick.store(sim.ticks(), Ordering::Release);
        self.published.fetch_add(1, Ordering::AcqRel);
    }

    /// Hand the latest snapshot to `read`, then request a new one.
    pub fn sample<R>(&self, read: impl FnOnce(&[Body], u64) -> R) -> R {
        let data = self.lock();
        let out = read(&data, self.current_ticks());
        self.should_sample.store(true, Ordering::Release);
        out
    }

    /// Copy the latest snapshot into `out`, then request a new one.
    pub fn sample_into(&self, out: &mut Vec<Body>) -> u64 {
        self.sample(|bodies, tick| {
            out.clear();
            out.extend_from_slice(bodies);
            tick
        })
    }

    pub fn current_ticks(&self) -> u64 {
        self.simulation_tick.load(Ordering::Acquire)
    }

    /// Number of snapshots stored so far.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }
}
