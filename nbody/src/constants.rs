// PHYSICAL
/// Plummer softening length, in simulation units.
pub const SOFTENING: f32 = 0.3;
/// Seconds per step, in simulation units. Unit G is folded into the force pass.
pub const DELTA: f32 = 1.0 / 256.0;
/// Mass of body 0, the central attractor.
pub const CENTRAL_MASS: f32 = 100.0;
/// Mass of every other body.
pub const BODY_MASS: f32 = 1.0;

// INITIAL CONDITIONS
/// Default number of bodies.
pub const BODY_COUNT: usize = 1024;
/// Default radius of the sampling ball.
pub const SAMPLE_RADIUS: f32 = 8.0;
/// Ids are stored as f32, so they stay exact up to 2^24.
pub const MAX_BODIES: usize = 1 << 24;

// RENDER DEFAULTS
pub const BODY_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
pub const BODY_RADIUS: f32 = 1.0;

// SIMULATION
/// Hard cap on number of threads to use.
pub const MAX_THREADS: usize = 20;
/// Minimum number of bodies per thread.
pub const BODIES_PER_THREAD: usize = 256;
/// Bodies owned by one execution unit in the parallel force pass, and the
/// compute workgroup size on the accelerator.
pub const WORKGROUP_SIZE: usize = 32;
/// Steps between snapshot checks in the simulation loop.
pub const CHECK_INTERVAL: u64 = 16;
/// Number of samples in the rolling step-rate window.
pub const RATE_WINDOW: usize = 60;
