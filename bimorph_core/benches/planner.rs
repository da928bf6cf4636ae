use std::sync::Arc;

use bimorph_core::{BimorphController, MoveRequest, plan_step};
use bimorph_hardware::SimulatedBimorph;
use bimorph_traits::clock::test_clock::TestClock;
use bimorph_traits::{CHANNEL_COUNT, Channel, Voltages};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

// Deterministic pseudo-random array that respects a 500 V adjacency limit.
fn synth_array(seed: u32) -> Voltages {
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    };
    let mut v = [0.0; CHANNEL_COUNT];
    let mut x = 0.0f64;
    for slot in &mut v {
        x = (x + (next() * 2.0 - 1.0) * 450.0).clamp(-1000.0, 1000.0);
        *slot = x;
    }
    v
}

fn tune(g: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>) {
    // BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p bimorph_core --bench planner
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(10));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }
}

pub fn bench_plan_step(c: &mut Criterion) {
    let mut g = c.benchmark_group("plan_step");
    tune(&mut g);

    let arrays: Vec<Voltages> = (1..=64).map(synth_array).collect();
    g.bench_function("all_channels_to_max", |b| {
        b.iter(|| {
            for a in &arrays {
                for ch in Channel::all() {
                    let v = plan_step(
                        ch,
                        a[ch.index()],
                        black_box(1000.0),
                        a,
                        a,
                        500.0,
                        400.0,
                    );
                    black_box(v);
                }
            }
        });
    });
    g.finish();
}

pub fn bench_full_move(c: &mut Criterion) {
    let mut g = c.benchmark_group("arm_and_ramp");
    tune(&mut g);

    g.bench_function("horizontal_group_0_to_1000", |b| {
        b.iter_batched(
            || {
                let clock = TestClock::new();
                let sim = SimulatedBimorph::new(clock.clone());
                let ctl = BimorphController::builder()
                    .with_clock(Arc::new(clock))
                    .build()
                    .unwrap();
                (sim, ctl)
            },
            |(mut sim, ctl)| {
                let req: MoveRequest = (0..12)
                    .filter_map(Channel::new)
                    .map(|c| (c, 1000.0))
                    .collect();
                black_box(ctl.arm_and_ramp(&req, &mut sim).unwrap());
            },
            BatchSize::SmallInput,
        );
    });
    g.finish();
}

criterion_group!(planner, bench_plan_step, bench_full_move);
criterion_main!(planner);
