use bytemuck::{Pod, Zeroable};
use cgmath::Vector3;

use crate::constants::{BODY_COLOR, BODY_MASS, BODY_RADIUS, CENTRAL_MASS};

/// Number of f32 fields in one body record.
pub const FLOATS_PER_BODY: usize = 16;

/// Float offsets of each field inside a body record.
pub mod field {
    pub const POS_X: usize = 0;
    pub const POS_Y: usize = 1;
    pub const POS_Z: usize = 2;
    pub const MASS: usize = 3;
    pub const COL_R: usize = 4;
    pub const COL_G: usize = 5;
    pub const COL_B: usize = 6;
    pub const COL_A: usize = 7;
    pub const VEL_X: usize = 8;
    pub const VEL_Y: usize = 9;
    pub const VEL_Z: usize = 10;
    pub const RADIUS: usize = 11;
    pub const ACC_X: usize = 12;
    pub const ACC_Y: usize = 13;
    pub const ACC_Z: usize = 14;
    pub const BODY_ID: usize = 15;
}

/// One simulated body, laid out so a slice of them can be bound directly as a
/// vertex or storage buffer.
///
/// Read as four `vec4`s the record is `(pos, mass)`, `color`, `(vel, radius)`
/// and `(acc, id)`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Body {
    pub pos: [f32; 3],
    pub mass: f32,
    pub color: [f32; 4],
    pub vel: [f32; 3],
    pub radius: f32,
    pub acc: [f32; 3],
    pub id: f32,
}

const _: () = assert!(std::mem::size_of::<Body>() == FLOATS_PER_BODY * std::mem::size_of::<f32>());

impl Body {
    /// A body at rest with the default mass for its index.
    pub fn at_rest(index: usize, pos: Vector3<f32>) -> Self {
        Self {
            pos: pos.into(),
            mass: if index == 0 { CENTRAL_MASS } else { BODY_MASS },
            color: BODY_COLOR,
            vel: [0.0; 3],
            radius: BODY_RADIUS,
            acc: [0.0; 3],
            id: index as f32,
        }
    }

    #[inline]
    pub fn position(&self) -> Vector3<f32> {
        self.pos.into()
    }

    #[inline]
    pub fn velocity(&self) -> Vector3<f32> {
        self.vel.into()
    }

    #[inline]
    pub fn acceleration(&self) -> Vector3<f32> {
        self.acc.into()
    }

    #[inline]
    pub fn set_position(&mut self, pos: Vector3<f32>) {
        self.pos = pos.into();
    }

    #[inline]
    pub fn set_velocity(&mut self, vel: Vector3<f32>) {
        self.vel = vel.into();
    }

    #[inline]
    pub fn set_acceleration(&mut self, acc: Vector3<f32>) {
        self.acc = acc.into();
    }

    /// Body id as the index it was constructed with.
    #[inline]
    pub fn index(&self) -> usize {
        self.id as usize
    }

    /// Accumulate the softened gravitational pull of `other` on a body at `pos`.
    #[inline]
    pub fn get_acc_towards(pos: Vector3<f32>, other: &Body, eps2: f32, out: &mut Vector3<f32>) {
        let rel = other.position() - pos;
        let d2 = rel.x * rel.x + rel.y * rel.y + rel.z * rel.z + eps2;
        let phi = other.mass / (d2.sqrt() * d2);
        *out += rel * phi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_offsets_match_layout() {
        let body = Body {
            pos: [0.0, 1.0, 2.0],
            mass: 3.0,
            color: [4.0, 5.0, 6.0, 7.0],
            vel: [8.0, 9.0, 10.0],
            radius: 11.0,
            acc: [12.0, 13.0, 14.0],
            id: 15.0,
        };
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&body));
        assert_eq!(floats.len(), FLOATS_PER_BODY);
        for (offset, value) in floats.iter().enumerate() {
            assert_eq!(*value, offset as f32);
        }
        assert_eq!(floats[field::MASS], body.mass);
        assert_eq!(floats[field::BODY_ID], body.id);
        assert_eq!(floats[field::RADIUS], body.radius);
    }

    #[test]
    fn first_body_is_heavy() {
        let origin = Vector3::new(0.0, 0.0, 0.0);
        assert_eq!(Body::at_rest(0, origin).mass, CENTRAL_MASS);
        assert_eq!(Body::at_rest(1, origin).mass, BODY_MASS);
        assert_eq!(Body::at_rest(7, origin).index(), 7);
    }

    #[test]
    fn pull_points_at_other_body() {
        let other = Body::at_rest(0, Vector3::new(2.0, 0.0, 0.0));
        let mut out = Vector3::new(0.0, 0.0, 0.0);
        Body::get_acc_towards(Vector3::new(0.0, 0.0, 0.0), &other, 0.0, &mut out);
        // 100 / 2^2
        assert!((out.x - 25.0).abs() < 1e-4);
        assert_eq!(out.y, 0.0);
        assert_eq!(out.z, 0.0);
    }
}
