use std::fmt::Display;
use std::str::FromStr;

use crate::constants::{BODY_COUNT, DELTA, MAX_BODIES, SAMPLE_RADIUS, SOFTENING};
use crate::error::ConfigError;

/// How the O(n²) force pass is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionPath {
    /// Single-threaded double loop over all ordered pairs.
    #[default]
    Sequential,
    /// Tiles of bodies dispatched on the thread pool, each tile owning its
    /// bodies' acceleration slots.
    Parallel,
    /// Single-threaded loop over unordered pairs, applying each force to both
    /// bodies.
    Symmetric,
}

impl Display for ExecutionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExecutionPath::Sequential => "sequential",
            ExecutionPath::Parallel => "parallel",
            ExecutionPath::Symmetric => "symmetric",
        };
        f.write_str(name)
    }
}

impl FromStr for ExecutionPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(ExecutionPath::Sequential),
            "parallel" => Ok(ExecutionPath::Parallel),
            "symmetric" => Ok(ExecutionPath::Symmetric),
            other => Err(format!("unknown execution path `{other}`")),
        }
    }
}

/// Everything the physics core needs from the surrounding application.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub body_count: usize,
    pub radius: f32,
    pub dt: f32,
    pub softening: f32,
    pub execution: ExecutionPath,
    /// Seed for initial sampling. `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Thread count for the parallel path. `None` sizes the pool from the body count.
    pub threads: Option<usize>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            body_count: BODY_COUNT,
            radius: SAMPLE_RADIUS,
            dt: DELTA,
            softening: SOFTENING,
            execution: ExecutionPath::default(),
            seed: None,
            threads: None,
        }
    }
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.body_count == 0 {
            return Err(ConfigError::NoBodies);
        }
        if self.body_count > MAX_BODIES {
            return Err(ConfigError::TooManyBodies(self.body_count));
        }
        if !positive(self.radius) {
            return Err(ConfigError::Radius(self.radius));
        }
        if !positive(self.dt) {
            return Err(ConfigError::Timestep(self.dt));
        }
        if !positive(self.softening) {
            return Err(ConfigError::Softening(self.softening));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::NoThreads);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SimConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_malformed_values() {
        let base = SimConfig::default();

        let cfg = SimConfig { body_count: 0, ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::NoBodies)));

        let cfg = SimConfig { body_count: MAX_BODIES + 1, ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::TooManyBodies(_))));

        let cfg = SimConfig { radius: 0.0, ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::Radius(_))));

        let cfg = SimConfig { dt: -1.0, ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::Timestep(_))));

        let cfg = SimConfig { dt: f32::NAN, ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::Timestep(_))));

        let cfg = SimConfig { softening: 0.0, ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::Softening(_))));

        let cfg = SimConfig { threads: Some(0), ..base };
        assert!(matches!(cfg.validate(), Err(ConfigError::NoThreads)));
    }

    #[test]
    fn parses_execution_paths() {
        for path in [
            ExecutionPath::Sequential,
            ExecutionPath::Parallel,
            ExecutionPath::Symmetric,
        ] {
            assert_eq!(path.to_string().parse::<ExecutionPath>(), Ok(path));
        }
        assert!("gpu".parse::<ExecutionPath>().is_err());
    }
}
