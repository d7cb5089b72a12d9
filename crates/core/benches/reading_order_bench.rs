use std::env;
use std::hint::black_box;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use vellum_core::reading_order::{
    LineGeometry, ReadingOrderParams, get_reading_order, test_line_continuation,
};
use vellum_core::synthesize_stripe;

#[derive(Clone)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn gen_f64(&mut self, min: f64, max: f64) -> f64 {
        let n = self.next_u64() as f64 / u64::MAX as f64;
        min + (max - min) * n
    }
}

fn bench_seed() -> u64 {
    env::var("VELLUM_BENCH_SEED")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0xC0FFEE)
}

/// Two column page: each row is split in two to four segments with small
/// gaps and jitter, like the output of a line detector.
fn generate_lines(seed: u64, rows: usize) -> Vec<LineGeometry> {
    let mut rng = XorShift64::new(seed);
    let mut lines = Vec::with_capacity(rows * 6);
    for row in 0..rows {
        for col in 0..2 {
            let y = 60.0 + row as f64 * 36.0;
            let x0 = 40.0 + col as f64 * 620.0;
            let segments = 2 + (rng.next_u64() % 3) as usize;
            let width = 560.0 / segments as f64;
            for s in 0..segments {
                let start = x0 + s as f64 * width + rng.gen_f64(0.0, 6.0);
                let end = x0 + (s + 1) as f64 * width - rng.gen_f64(4.0, 10.0);
                let baseline = [
                    (start, y + rng.gen_f64(-1.5, 1.5)),
                    (end, y + rng.gen_f64(-1.5, 1.5)),
                ];
                let coords = synthesize_stripe(&baseline, 24.0, 0.25).expect("valid stripe");
                lines.push(LineGeometry::new(&baseline, &coords).expect("valid line"));
            }
        }
    }
    lines
}

fn bench_reading_order(c: &mut Criterion) {
    let seed = bench_seed();
    let params = ReadingOrderParams::default();
    let mut group = c.benchmark_group("reading_order");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(3));

    for rows in [5usize, 20, 40] {
        let lines = generate_lines(seed ^ rows as u64, rows);
        group.throughput(Throughput::Elements(lines.len() as u64));
        group.bench_with_input(BenchmarkId::new("continuation", rows), &lines, |b, lines| {
            b.iter(|| {
                let groups = test_line_continuation(lines, &params).expect("continuation");
                black_box(groups.len());
            })
        });
        group.bench_with_input(BenchmarkId::new("order", rows), &lines, |b, lines| {
            b.iter(|| {
                let order = get_reading_order(lines, &params).expect("order");
                black_box(order.len());
            })
        });
    }

    group.finish();
}

criterion_group!(reading_order_benches, bench_reading_order);
criterion_main!(reading_order_benches);
