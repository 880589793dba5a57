use std::hint::black_box;
use std::time::Instant;

use pps_common::SwarmParams;
use pps_kernel::{
    CpuBackend, Force, SimConfig, Simulation, StageVariant, accumulate_forces, integrate,
    integrate_fused, spawn_population,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn bench_accumulate(agent_count: usize, iterations: usize) {
    let mut rng = StdRng::seed_from_u64(1);
    let agents = spawn_population(agent_count, &mut rng);
    let params = SwarmParams::default();
    let mut forces = vec![Force::default(); agent_count];

    let start = Instant::now();
    for _ in 0..iterations {
        accumulate_forces(black_box(&agents), &params, &mut forces, 64);
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  accumulate ({agent_count} agents, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_integrate(agent_count: usize, iterations: usize) {
    let mut rng = StdRng::seed_from_u64(2);
    let agents = spawn_population(agent_count, &mut rng);
    let params = SwarmParams::default();
    let mut forces = vec![Force::default(); agent_count];
    accumulate_forces(&agents, &params, &mut forces, 64);
    let mut next = agents.clone();

    let start = Instant::now();
    for _ in 0..iterations {
        integrate(black_box(&agents), &forces, &params, &mut next, 32);
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  integrate ({agent_count} agents, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_fused(agent_count: usize, iterations: usize) {
    let mut rng = StdRng::seed_from_u64(3);
    let agents = spawn_population(agent_count, &mut rng);
    let params = SwarmParams::default();
    let mut next = agents.clone();

    let start = Instant::now();
    for _ in 0..iterations {
        integrate_fused(black_box(&agents), &params, &mut next, 32);
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  fused ({agent_count} agents, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_run_frame(agent_count: usize, variant: StageVariant, iterations: usize) {
    let config = SimConfig {
        agent_count,
        variant,
        seed: Some(4),
        ..SimConfig::default()
    };
    let Ok(backend) = CpuBackend::new(agent_count, config.buffer_count, config.group_sizes())
    else {
        return;
    };
    let Ok(mut sim) = Simulation::new(backend, config) else {
        return;
    };
    if sim.initialize().is_err() {
        return;
    }

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = black_box(sim.run_frame());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  run_frame {variant} ({agent_count} agents, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn main() {
    println!("=== Swarm Frame Benchmarks ===\n");

    println!("Force accumulation:");
    bench_accumulate(1024, 50);
    bench_accumulate(2048, 20);
    bench_accumulate(8192, 5);

    println!("\nIntegration:");
    bench_integrate(1024, 1000);
    bench_integrate(8192, 200);

    println!("\nFused single pass:");
    bench_fused(2048, 20);
    bench_fused(8192, 5);

    println!("\nFull frame:");
    bench_run_frame(8192, StageVariant::TwoPass, 5);
    bench_run_frame(8192, StageVariant::SinglePass, 5);

    println!("\n=== Done ===");
}
