mod bodies;
mod body;
mod config;
pub mod constants;
pub mod diagnostics;
mod error;
mod exchange;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod integrator;
mod rate;
mod sim_loop;
mod simulation;

pub use bodies::{BodyBuffer, sample_ball};
pub use body::{Body, FLOATS_PER_BODY, field};
pub use config::{ExecutionPath, SimConfig};
pub use diagnostics::Diagnostics;
pub use error::{ConfigError, LayoutError};
pub use exchange::SnapshotExchange;
pub use integrator::Integrator;
pub use rate::RateCounter;
pub use sim_loop::{run_sim_loop, spawn_sim_loop};
pub use simulation::{ElapsedTime, Simulation, compute_elapsed_time};
