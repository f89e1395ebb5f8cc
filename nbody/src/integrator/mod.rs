use cgmath::{Vector3, Zero};
use log::info;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
    bodies::BodyBuffer,
    body::Body,
    config::{ExecutionPath, SimConfig},
    constants::{BODIES_PER_THREAD, MAX_THREADS},
    error::ConfigError,
};

pub mod direct;

pub fn compute_target_threads(n_bodies: usize) -> usize {
    assert!(n_bodies > 0);
    n_bodies.div_ceil(BODIES_PER_THREAD).min(MAX_THREADS)
}

/// Kick-drift-kick leapfrog with a direct-sum force pass.
///
/// `dt` and the softening length are fixed at construction. A step never
/// fails; malformed configuration is rejected by [`Integrator::new`].
pub struct Integrator {
    dt: f32,
    softening: f32,
    eps2: f32,
    execution: ExecutionPath,
    out_buffer: Vec<Vector3<f32>>,
    pool: Option<ThreadPool>,
}

impl Integrator {
    pub fn new(config: &SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let pool = match config.execution {
            ExecutionPath::Parallel => {
                let n_threads = config
                    .threads
                    .unwrap_or_else(|| compute_target_threads(config.body_count));
                info!("Force pass runs on {n_threads} threads");
                Some(
                    ThreadPoolBuilder::new()
                        .num_threads(n_threads)
                        .thread_name(|i| format!("nbody-force-{i}"))
                        .build()?,
                )
            }
            ExecutionPath::Sequential | ExecutionPath::Symmetric => None,
        };

        Ok(Self {
            dt: config.dt,
            softening: config.softening,
            eps2: config.softening * config.softening,
            execution: config.execution,
            out_buffer: Vec::with_capacity(config.body_count),
            pool,
        })
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn softening(&self) -> f32 {
        self.softening
    }

    pub fn execution(&self) -> ExecutionPath {
        self.execution
    }

    /// Run the force pass over `bodies` and return one acceleration per body.
    ///
    /// The result is a fresh array; the records are not touched.
    pub fn forces(&mut self, bodies: &[Body]) -> &[Vector3<f32>] {
        self.out_buffer.clear();
        self.out_buffer.resize(bodies.len(), Vector3::zero());
        match (&self.pool, self.execution) {
            (Some(pool), ExecutionPath::Parallel) => {
                let out_buffer = &mut self.out_buffer;
                let eps2 = self.eps2;
                pool.install(|| direct::iter(bodies, out_buffer, eps2));
            }
            (_, ExecutionPath::Symmetric) => {
                direct::iter_symmetric(bodies, &mut self.out_buffer, self.eps2)
            }
            _ => direct::iter_single_threaded(bodies, &mut self.out_buffer, self.eps2),
        }
        &self.out_buffer
    }

    /// Compute the accelerations the first half-kick needs, if the buffer has
    /// none yet. [`Integrator::step`] does this on demand.
    pub fn prime(&mut self, bodies: &mut BodyBuffer) {
        if bodies.carried().is_none() {
            let carried = self.forces(bodies.bodies()).to_vec();
            bodies.set_carried(carried);
        }
    }

    /// Advance every body by one timestep.
    ///
    /// 1. half-kick with the accelerations of the previous force pass
    /// 2. drift by a full step
    /// 3. force pass into the record acceleration fields
    /// 4. half-kick with those, then reset the record fields
    pub fn step(&mut self, bodies: &mut BodyBuffer) {
        let half_dt = 0.5 * self.dt;
        let dt = self.dt;

        self.prime(bodies);
        let mut carried = match bodies.take_carried() {
            Some(carried) => carried,
            None => vec![Vector3::zero(); bodies.len()],
        };
        let records = bodies.records_mut();
        debug_assert_eq!(records.len(), carried.len());

        match &self.pool {
            Some(pool) => pool.install(|| direct::par_kick_drift(records, &carried, half_dt, dt)),
            None => direct::kick_drift(records, &carried, half_dt, dt),
        }

        self.forces(records);
        for (body, acc) in records.iter_mut().zip(&self.out_buffer) {
            body.set_acceleration(body.acceleration() + *acc);
        }

        match &self.pool {
            Some(pool) => pool.install(|| direct::par_kick_settle(records, &mut carried, half_dt)),
            None => direct::kick_settle(records, &mut carried, half_dt),
        }

        bodies.set_carried(carried);
    }
}
