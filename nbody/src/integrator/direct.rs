use cgmath::{Vector3, Zero};
use rayon::iter::{
    IndexedParallelIterator, IntoParallelRefIterator, IntoParallelRefMutIterator, ParallelIterator,
};
use rayon::slice::ParallelSliceMut;

use crate::{body::Body, constants::WORKGROUP_SIZE};

#[inline]
fn acc_on(body: &Body, bodies: &[Body], eps2: f32) -> Vector3<f32> {
    let pos = body.position();
    let mut acc = Vector3::zero();
    for other in bodies {
        if other.id == body.id {
            continue;
        }
        Body::get_acc_towards(pos, other, eps2, &mut acc);
    }
    acc
}

#[inline]
fn kick_drift_one(body: &mut Body, acc: Vector3<f32>, half_dt: f32, dt: f32) {
    let vel = body.velocity() + acc * half_dt;
    body.set_velocity(vel);
    body.set_position(body.position() + vel * dt);
}

#[inline]
fn kick_settle_one(body: &mut Body, carried: &mut Vector3<f32>, half_dt: f32) {
    let acc = body.acceleration();
    body.set_velocity(body.velocity() + acc * half_dt);
    *carried = acc;
    body.set_acceleration(Vector3::zero());
}

/// Opening half-kick with the carried accelerations, then a full drift.
pub fn kick_drift(bodies: &mut [Body], carried: &[Vector3<f32>], half_dt: f32, dt: f32) {
    for (body, acc) in bodies.iter_mut().zip(carried) {
        kick_drift_one(body, *acc, half_dt, dt);
    }
}

pub fn par_kick_drift(bodies: &mut [Body], carried: &[Vector3<f32>], half_dt: f32, dt: f32) {
    bodies
        .par_iter_mut()
        .zip(carried.par_iter())
        .for_each(|(body, acc)| kick_drift_one(body, *acc, half_dt, dt));
}

/// Closing half-kick with the record accelerations. The accelerations move to
/// `carried` and the record fields are reset.
pub fn kick_settle(bodies: &mut [Body], carried: &mut [Vector3<f32>], half_dt: f32) {
    for (body, slot) in bodies.iter_mut().zip(carried.iter_mut()) {
        kick_settle_one(body, slot, half_dt);
    }
}

pub fn par_kick_settle(bodies: &mut [Body], carried: &mut [Vector3<f32>], half_dt: f32) {
    bodies
        .par_iter_mut()
        .zip(carried.par_iter_mut())
        .for_each(|(body, slot)| kick_settle_one(body, slot, half_dt));
}

/// Sum all ordered pairs, one body at a time.
pub fn iter_single_threaded(bodies: &[Body], out_buffer: &mut [Vector3<f32>], eps2: f32) {
    debug_assert_eq!(bodies.len(), out_buffer.len());
    for (body, out) in bodies.iter().zip(out_buffer.iter_mut()) {
        *out = acc_on(body, bodies, eps2);
    }
}

/// Sum all ordered pairs on the current rayon pool.
///
/// Each task owns a tile of `WORKGROUP_SIZE` output slots and reads the whole
/// body slice. Per-body summation order matches [`iter_single_threaded`].
pub fn iter(bodies: &[Body], out_buffer: &mut [Vector3<f32>], eps2: f32) {
    debug_assert_eq!(bodies.len(), out_buffer.len());
    out_buffer
        .par_chunks_mut(WORKGROUP_SIZE)
        .enumerate()
        .for_each(|(tile, out)| {
            let start = tile * WORKGROUP_SIZE;
            for (body, slot) in bodies[start..start + out.len()].iter().zip(out.iter_mut()) {
                *slot = acc_on(body, bodies, eps2);
            }
        });
}

/// Sum each unordered pair once and apply it to both bodies.
pub fn iter_symmetric(bodies: &[Body], out_buffer: &mut [Vector3<f32>], eps2: f32) {
    debug_assert_eq!(bodies.len(), out_buffer.len());
    out_buffer.fill(Vector3::zero());
    for (i, a) in bodies.iter().enumerate() {
        let pos = a.position();
        for (offset, b) in bodies[i + 1..].iter().enumerate() {
            if a.id == b.id {
                continue;
            }
            let j = i + 1 + offset;
            let rel = b.position() - pos;
            let d2 = rel.x * rel.x + rel.y * rel.y + rel.z * rel.z + eps2;
            let inv = 1.0 / (d2.sqrt() * d2);
            out_buffer[i] += rel * (b.mass * inv);
            out_buffer[j] -= rel * (a.mass * inv);
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::InnerSpace;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::bodies::BodyBuffer;

    fn sampled(count: usize) -> BodyBuffer {
        let mut rng = StdRng::seed_from_u64(11);
        BodyBuffer::sample_with(&mut rng, count, 8.0)
    }

    #[test]
    fn parallel_tiles_match_single_threaded() {
        // Not a multiple of the tile size.
        let buffer = sampled(3 * WORKGROUP_SIZE + 5);
        let n = buffer.len();
        let mut seq = vec![Vector3::zero(); n];
        let mut par = vec![Vector3::zero(); n];
        iter_single_threaded(buffer.bodies(), &mut seq, 0.09);
        iter(buffer.bodies(), &mut par, 0.09);
        assert_eq!(seq, par);
    }

    #[test]
    fn symmetric_matches_direct_within_tolerance() {
        let buffer = sampled(200);
        let n = buffer.len();
        let mut direct = vec![Vector3::zero(); n];
        let mut sym = vec![Vector3::zero(); n];
        iter_single_threaded(buffer.bodies(), &mut direct, 0.09);
        iter_symmetric(buffer.bodies(), &mut sym, 0.09);
        for (a, b) in direct.iter().zip(&sym) {
            let tolerance = 1e-4 * a.magnitude().max(1.0);
            assert!((*a - *b).magnitude() <= tolerance, "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn settle_moves_acceleration_into_carried_slot() {
        let mut bodies = vec![Body::at_rest(0, Vector3::zero())];
        bodies[0].acc = [2.0, 0.0, 0.0];
        let mut carried = vec![Vector3::zero()];
        kick_settle(&mut bodies, &mut carried, 0.5);
        assert_eq!(bodies[0].vel, [1.0, 0.0, 0.0]);
        assert_eq!(bodies[0].acc, [0.0; 3]);
        assert_eq!(carried[0], Vector3::new(2.0, 0.0, 0.0));
    }
}
