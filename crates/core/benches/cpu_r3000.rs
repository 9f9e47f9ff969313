use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use emu_core::cpu_mips_r3000::{Bus, CpuR3000, FlatBus};

/// Memory pre-loaded with a small arithmetic loop at address 0.
///
/// ADDIU $1, $0, 1024   ; loop counter
/// loop:
/// ADDIU $1, $1, -1
/// ADDU  $2, $1, $2
/// BNE   $1, $0, loop
/// SLL   $0, $0, 0      ; delay slot
/// J     0x0            ; restart forever
/// SLL   $0, $0, 0
fn bench_bus() -> FlatBus {
    let program: [u32; 7] = [
        0x2401_0400, // ADDIU $1, $0, 1024
        0x2421_ffff, // ADDIU $1, $1, -1
        0x0022_1021, // ADDU $2, $1, $2
        0x1420_fffd, // BNE $1, $0, -3
        0x0000_0000, // NOP
        0x0800_0000, // J 0x0
        0x0000_0000, // NOP
    ];

    let mut bus = FlatBus::new();
    for (i, &word) in program.iter().enumerate() {
        bus.store32((i * 4) as u32, word).unwrap();
    }
    bus
}

fn bench_cpu_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_r3000_step");

    group.bench_function("single_instruction", |b| {
        b.iter(|| {
            let mut cpu = CpuR3000::new(bench_bus());
            cpu.set_pc(0);
            cpu.step().unwrap();
            black_box(cpu.cycles());
        });
    });

    group.finish();
}

fn bench_cpu_multiple_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_r3000_multiple_steps");

    for step_count in [100, 1000, 10000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(step_count),
            step_count,
            |b, &count| {
                b.iter(|| {
                    let mut cpu = CpuR3000::new(bench_bus());
                    cpu.set_pc(0);
                    for _ in 0..count {
                        cpu.step().unwrap();
                    }
                    black_box(cpu.cycles());
                });
            },
        );
    }

    group.finish();
}

fn bench_cpu_reset(c: &mut Criterion) {
    c.bench_function("cpu_r3000_reset", |b| {
        let mut cpu = CpuR3000::new(FlatBus::new());
        b.iter(|| {
            cpu.reset();
            black_box(cpu.current_pc());
        });
    });
}

criterion_group!(
    benches,
    bench_cpu_step,
    bench_cpu_multiple_steps,
    bench_cpu_reset
);
criterion_main!(benches);
