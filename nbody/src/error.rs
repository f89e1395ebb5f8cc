use thiserror::Error;

/// Rejected simulation setup. Raised before any step runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("body count must be at least 1")]
    NoBodies,
    #[error("body count {0} exceeds the {max} bodies an f32 id can address", max = crate::constants::MAX_BODIES)]
    TooManyBodies(usize),
    #[error("sampling radius must be positive and finite, got {0}")]
    Radius(f32),
    #[error("timestep must be positive and finite, got {0}")]
    Timestep(f32),
    #[error("softening must be positive and finite, got {0}")]
    Softening(f32),
    #[error("thread count must be at least 1")]
    NoThreads,
    #[error("failed to build the force-pass thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A float block that does not describe a valid body buffer.
#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("expected {expected} floats ({bodies} bodies), got {got}")]
    Length {
        expected: usize,
        bodies: usize,
        got: usize,
    },
    #[error("body at index {index} carries id {id}")]
    Id { index: usize, id: f32 },
}
