mod perf;

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use nbody::{BodyBuffer, ExecutionPath, Integrator, SimConfig};
use rand::{SeedableRng, rngs::StdRng};

fn gen_cloud(count: usize) -> BodyBuffer {
    let mut rng = StdRng::seed_from_u64(0xB0D1E5);
    BodyBuffer::sample_with(&mut rng, count, 8.0)
}

fn config(count: usize, execution: ExecutionPath) -> SimConfig {
    SimConfig {
        body_count: count,
        execution,
        ..SimConfig::default()
    }
}

const PATHS: [ExecutionPath; 3] = [
    ExecutionPath::Sequential,
    ExecutionPath::Parallel,
    ExecutionPath::Symmetric,
];

fn bench_force_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("force_pass");
    for count in [256, 1024] {
        let bodies = gen_cloud(count);
        for path in PATHS {
            let mut integrator = Integrator::new(&config(count, path)).unwrap();
            group.bench_with_input(BenchmarkId::new(path.to_string(), count), &bodies, |b, bodies| {
                b.iter(|| {
                    black_box(integrator.forces(black_box(bodies.bodies())));
                })
            });
        }
    }
    group.finish();
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step_1k");
    for path in PATHS {
        let mut integrator = Integrator::new(&config(1024, path)).unwrap();
        let mut bodies = gen_cloud(1024);
        integrator.prime(&mut bodies);
        group.bench_function(path.to_string(), |b| {
            // The cloud collapses if stepped for long, so keep the positions fixed.
            let start = bodies.clone();
            b.iter(|| {
                bodies.clone_from(&start);
                integrator.step(&mut bodies);
            })
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().with_profiler(perf::FlamegraphProfiler::new(100));
    targets = bench_force_pass, bench_step
}
criterion_main!(benches);
