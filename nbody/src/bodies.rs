use cgmath::Vector3;
use log::debug;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    body::{Body, FLOATS_PER_BODY},
    config::SimConfig,
    error::{ConfigError, LayoutError},
};

/// Draw a point uniformly distributed inside a ball of the given radius.
///
/// Candidates are drawn from the enclosing cube and rejected until one lands
/// inside the unit ball, which keeps the density uniform in volume.
pub fn sample_ball<R: Rng>(rng: &mut R, radius: f32) -> Vector3<f32> {
    loop {
        let x: f32 = rng.random_range(-1.0..=1.0);
        let y: f32 = rng.random_range(-1.0..=1.0);
        let z: f32 = rng.random_range(-1.0..=1.0);
        if x * x + y * y + z * z <= 1.0 {
            return Vector3::new(x, y, z) * radius;
        }
    }
}

/// The flat array of every simulated body. The length is fixed at construction.
///
/// Besides the records, the buffer keeps the accelerations produced by the
/// last force pass. They open the next step's half-kick, so the record
/// acceleration fields can stay zero between steps.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyBuffer {
    bodies: Vec<Body>,
    carried: Option<Vec<Vector3<f32>>>,
}

impl BodyBuffer {
    /// Sample `config.body_count` bodies inside a ball of `config.radius`.
    pub fn sample(config: &SimConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(seed);
        Ok(Self::sample_with(&mut rng, config.body_count, config.radius))
    }

    /// Sample `count` bodies from an explicit random source.
    ///
    /// Panics if `count` is zero; use [`BodyBuffer::sample`] for validated input.
    pub fn sample_with<R: Rng>(rng: &mut R, count: usize, radius: f32) -> Self {
        assert!(count > 0, "a body buffer needs at least one body");
        let bodies = (0..count)
            .map(|i| Body::at_rest(i, sample_ball(rng, radius)))
            .collect::<Vec<_>>();
        debug!("Sampled {count} bodies inside radius {radius}");
        Self {
            bodies,
            carried: None,
        }
    }

    /// Build a buffer from explicit records. Ids must match positions.
    pub fn from_bodies(bodies: Vec<Body>) -> Result<Self, LayoutError> {
        if bodies.is_empty() {
            return Err(LayoutError::Length {
                expected: FLOATS_PER_BODY,
                bodies: 1,
                got: 0,
            });
        }
        check_ids(&bodies)?;
        Ok(Self {
            bodies,
            carried: None,
        })
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Mutable access to the records, e.g. to set up initial velocities.
    /// Invalidates the carried accelerations.
    pub fn bodies_mut(&mut self) -> &mut [Body] {
        self.carried = None;
        &mut self.bodies
    }

    /// Export as 16×N floats in record order.
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.bodies)
    }

    /// Export as raw bytes, ready to upload as a vertex or storage buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.bodies)
    }

    /// Overwrite every record from a block of 16×N floats, as read back from an
    /// accelerator. The block must match this buffer's length and ids.
    pub fn import_floats(&mut self, floats: &[f32]) -> Result<(), LayoutError> {
        let expected = self.bodies.len() * FLOATS_PER_BODY;
        if floats.len() != expected {
            return Err(LayoutError::Length {
                expected,
                bodies: self.bodies.len(),
                got: floats.len(),
            });
        }
        let incoming: &[Body] = bytemuck::cast_slice(floats);
        check_ids(incoming)?;
        self.bodies.copy_from_slice(incoming);
        self.carried = None;
        Ok(())
    }

    /// Overwrite every record from raw bytes. See [`BodyBuffer::import_floats`].
    pub fn import_bytes(&mut self, bytes: &[u8]) -> Result<(), LayoutError> {
        let float_size = std::mem::size_of::<f32>();
        if bytes.len() % float_size != 0 {
            return Err(LayoutError::Length {
                expected: self.bodies.len() * FLOATS_PER_BODY,
                bodies: self.bodies.len(),
                got: bytes.len() / float_size,
            });
        }
        // Mapped ranges are not guaranteed to be f32-aligned.
        let floats = bytes
            .chunks_exact(float_size)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect::<Vec<_>>();
        self.import_floats(&floats)
    }

    /// Accelerations from the last force pass, if a step or priming pass has
    /// run since the records were last overwritten.
    pub fn carried(&self) -> Option<&[Vector3<f32>]> {
        self.carried.as_deref()
    }

    pub(crate) fn set_carried(&mut self, carried: Vec<Vector3<f32>>) {
        debug_assert_eq!(carried.len(), self.bodies.len());
        self.carried = Some(carried);
    }

    pub(crate) fn take_carried(&mut self) -> Option<Vec<Vector3<f32>>> {
        self.carried.take()
    }

    /// Record access for the integrator; leaves the carried state alone.
    pub(crate) fn records_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    /// True when every record acceleration is zero, which holds between steps.
    pub fn accelerations_cleared(&self) -> bool {
        self.bodies.iter().all(|b| b.acc == [0.0; 3])
    }
}

fn check_ids(bodies: &[Body]) -> Result<(), LayoutError> {
    match bodies.iter().enumerate().find(|(i, b)| b.id != *i as f32) {
        Some((index, body)) => Err(LayoutError::Id { index, id: body.id }),
        None => Ok(()),
    }
}
