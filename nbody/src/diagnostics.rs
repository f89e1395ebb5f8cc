//! Conserved quantities of a body buffer, accumulated in f64.

use cgmath::{InnerSpace, Vector3, Zero};

use crate::body::Body;

fn widen(v: Vector3<f32>) -> Vector3<f64> {
    v.cast().unwrap_or_else(Vector3::zero)
}

/// Σ m·v
pub fn total_momentum(bodies: &[Body]) -> Vector3<f64> {
    bodies
        .iter()
        .map(|b| widen(b.velocity()) * b.mass as f64)
        .fold(Vector3::zero(), |acc, p| acc + p)
}

/// Σ m·|v|, the scale against which momentum drift is judged.
pub fn momentum_scale(bodies: &[Body]) -> f64 {
    bodies
        .iter()
        .map(|b| widen(b.velocity()).magnitude() * b.mass as f64)
        .sum()
}

pub fn kinetic_energy(bodies: &[Body]) -> f64 {
    bodies
        .iter()
        .map(|b| 0.5 * b.mass as f64 * widen(b.velocity()).magnitude2())
        .sum()
}

/// Softened pair potential `-m_i m_j / sqrt(r² + ε²)` over unordered pairs.
pub fn potential_energy(bodies: &[Body], softening: f32) -> f64 {
    let eps2 = softening as f64 * softening as f64;
    let mut total = 0.0;
    for (i, a) in bodies.iter().enumerate() {
        let pos = widen(a.position());
        for b in &bodies[i + 1..] {
            if a.id == b.id {
                continue;
            }
            let d2 = (widen(b.position()) - pos).magnitude2() + eps2;
            total -= a.mass as f64 * b.mass as f64 / d2.sqrt();
        }
    }
    total
}

pub fn total_energy(bodies: &[Body], softening: f32) -> f64 {
    kinetic_energy(bodies) + potential_energy(bodies, softening)
}

pub fn center_of_mass(bodies: &[Body]) -> Vector3<f64> {
    let mass: f64 = bodies.iter().map(|b| b.mass as f64).sum();
    if mass == 0.0 {
        return Vector3::zero();
    }
    bodies
        .iter()
        .map(|b| widen(b.position()) * b.mass as f64)
        .fold(Vector3::zero(), |acc, p| acc + p)
        / mass
}

/// Snapshot of the conserved quantities, for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostics {
    pub kinetic: f64,
    pub potential: f64,
    pub momentum: Vector3<f64>,
    pub center_of_mass: Vector3<f64>,
}

impl Diagnostics {
    pub fn measure(bodies: &[Body], softening: f32) -> Self {
        Self {
            kinetic: kinetic_energy(bodies),
            potential: potential_energy(bodies, softening),
            momentum: total_momentum(bodies),
            center_of_mass: center_of_mass(bodies),
        }
    }

    pub fn energy(&self) -> f64 {
        self.kinetic + self.potential
    }

    /// Relative energy change since `initial`.
    pub fn energy_drift(&self, initial: &Diagnostics) -> f64 {
        let e0 = initial.energy();
        if e0 == 0.0 {
            return self.energy() - e0;
        }
        (self.energy() - e0) / e0.abs()
    }
}
