#![cfg(feature = "gpu")]

use cgmath::InnerSpace;
use nbody::{
    Body, BodyBuffer, ExecutionPath, FLOATS_PER_BODY, Integrator, SimConfig, field,
    gpu::{GpuContext, GpuIntegrator},
};

// Machines without an adapter skip these tests.
fn context() -> Option<GpuContext> {
    match GpuContext::new_blocking() {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            eprintln!("skipping: {e:#}");
            None
        }
    }
}

fn config() -> SimConfig {
    SimConfig {
        body_count: 100,
        execution: ExecutionPath::Sequential,
        ..SimConfig::default()
    }
}

#[test]
fn device_steps_track_the_host() {
    let Some(ctx) = context() else {
        return;
    };
    let config = config();
    let mut host = BodyBuffer::sample(&config, 42).unwrap();
    let mut device_copy = host.clone();

    let mut gpu = GpuIntegrator::new(ctx, &config).unwrap();
    gpu.upload(&device_copy).unwrap();
    gpu.step(20);
    gpu.download(&mut device_copy).unwrap();

    let mut integrator = Integrator::new(&config).unwrap();
    for _ in 0..20 {
        integrator.step(&mut host);
    }

    assert!(device_copy.accelerations_cleared());
    for (a, b) in host.bodies().iter().zip(device_copy.bodies()) {
        assert_eq!(a.id, b.id);
        let tolerance = 1e-3 * a.position().magnitude().max(1.0);
        assert!((a.position() - b.position()).magnitude() < tolerance);
    }
}

#[test]
fn upload_rejects_a_mismatched_buffer() {
    let Some(ctx) = context() else {
        return;
    };
    let mut gpu = GpuIntegrator::new(ctx, &config()).unwrap();
    let wrong = BodyBuffer::sample(
        &SimConfig {
            body_count: 10,
            ..config()
        },
        1,
    )
    .unwrap();
    assert!(gpu.upload(&wrong).is_err());
}

#[test]
fn vertex_layout_matches_the_record() {
    let layout = Body::vertex_layout();
    assert_eq!(layout.array_stride, (FLOATS_PER_BODY * 4) as u64);
    assert_eq!(layout.attributes.len(), 2);
    assert_eq!(layout.attributes[0].offset, (field::POS_X * 4) as u64);
    assert_eq!(layout.attributes[1].offset, (field::COL_R * 4) as u64);
}

#[test]
fn bodies_buffer_holds_every_record() {
    let Some(ctx) = context() else {
        return;
    };
    let config = config();
    let gpu = GpuIntegrator::new(ctx, &config).unwrap();
    let buffer = gpu.bodies_buffer();
    assert_eq!(
        buffer.size(),
        (config.body_count * FLOATS_PER_BODY * 4) as u64
    );
    assert!(buffer.usage().contains(wgpu::BufferUsages::VERTEX));
}

#[test]
fn split_step_counts_add_up() {
    let Some(ctx) = context() else {
        return;
    };
    let config = config();
    let start = BodyBuffer::sample(&config, 9).unwrap();
    let mut gpu = GpuIntegrator::new(ctx, &config).unwrap();

    let mut whole = start.clone();
    gpu.upload(&whole).unwrap();
    gpu.step(12u64);
    gpu.download(&mut whole).unwrap();

    let mut split = start.clone();
    gpu.upload(&split).unwrap();
    gpu.step(0);
    gpu.step(5);
    gpu.step(7);
    gpu.download(&mut split).unwrap();

    assert_eq!(whole.as_bytes(), split.as_bytes());
}
