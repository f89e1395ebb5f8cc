use std::fmt::Display;

use log::info;

use crate::{
    bodies::BodyBuffer, config::SimConfig, diagnostics::Diagnostics, error::ConfigError,
    integrator::Integrator,
};

/// A body buffer together with the integrator that owns its stepping.
pub struct Simulation {
    bodies: BodyBuffer,
    integrator: Integrator,
    ticks: u64,
    seed: Option<u64>,
}

impl Simulation {
    /// Sample the initial bodies and build the integrator.
    ///
    /// Without a configured seed one is drawn from the OS and logged, so the
    /// run can be repeated.
    pub fn new(config: &SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random::<u64>);
        info!(
            "Sampling {} bodies in radius {} with seed {seed}",
            config.body_count, config.radius
        );
        let bodies = BodyBuffer::sample(config, seed)?;
        let mut sim = Self::with_bodies(bodies, config)?;
        sim.seed = Some(seed);
        Ok(sim)
    }

    /// Use an existing body buffer. Its length overrides `config.body_count`.
    pub fn with_bodies(bodies: BodyBuffer, config: &SimConfig) -> Result<Self, ConfigError> {
        let config = SimConfig {
            body_count: bodies.len(),
            ..config.clone()
        };
        let integrator = Integrator::new(&config)?;
        Ok(Self {
            bodies,
            integrator,
            ticks: 0,
            seed: None,
        })
    }

    pub fn exec_iter(&mut self) {
        self.integrator.step(&mut self.bodies);
        self.ticks += 1;
    }

    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.exec_iter();
        }
    }

    pub fn bodies(&self) -> &BodyBuffer {
        &self.bodies
    }

    /// Mutable access to the buffer between steps, e.g. to import records read
    /// back from an accelerator.
    pub fn bodies_mut(&mut self) -> &mut BodyBuffer {
        &mut self.bodies
    }

    pub fn integrator(&self) -> &Integrator {
        &self.integrator
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn elapsed(&self) -> ElapsedTime {
        compute_elapsed_time(self.ticks, self.integrator.dt())
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::measure(self.bodies.bodies(), self.integrator.softening())
    }

    pub fn into_bodies(self) -> BodyBuffer {
        self.bodies
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ElapsedTime {
    pub ticks: u64,
    pub time: f64,
}

impl Display for ElapsedTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t={:.4} ({} ticks)", self.time, self.ticks)
    }
}

pub fn compute_elapsed_time(ticks: u64, delta: f32) -> ElapsedTime {
    ElapsedTime {
        ticks,
        time: ticks as f64 * delta as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_time_scales_with_delta() {
        let elapsed = compute_elapsed_time(512, 1.0 / 256.0);
        assert_eq!(elapsed.time, 2.0);
        assert_eq!(elapsed.to_string(), "t=2.0000 (512 ticks)");
    }

    #[test]
    fn counts_ticks_and_keeps_seed() {
        let config = SimConfig {
            body_count: 8,
            seed: Some(5),
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(&config).unwrap();
        sim.run(3);
        assert_eq!(sim.ticks(), 3);
        assert_eq!(sim.seed(), Some(5));
        assert_eq!(sim.bodies().len(), 8);
    }

    #[test]
    fn unseeded_runs_record_their_seed() {
        let config = SimConfig {
            body_count: 4,
            ..SimConfig::default()
        };
        let sim = Simulation::new(&config).unwrap();
        let seed = sim.seed().unwrap();
        let again = Simulation::new(&SimConfig {
            seed: Some(seed),
            ..config
        })
        .unwrap();
        assert_eq!(sim.bodies().as_bytes(), again.bodies().as_bytes());
    }
}
