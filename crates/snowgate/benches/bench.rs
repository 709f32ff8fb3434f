use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use snowgate::{MonotonicClock, Poll, SnowflakeGenerator, SnowflakeLayout, SystemClock, TimeSource};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};

struct FixedMockTime {
    millis: u64,
}

impl TimeSource for FixedMockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

// Number of IDs generated per benchmark iteration (per-thread for
// multi-threaded).
const TOTAL_IDS: usize = 4096;

/// Benchmarks the hot path where IDs are always `Ready`.
fn bench_ready(c: &mut Criterion) {
    let mut group = c.benchmark_group("mock/ready");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let generator =
                    SnowflakeGenerator::new(SnowflakeLayout::TWITTER, FixedMockTime { millis: 1 });
                for _ in 0..TOTAL_IDS {
                    match generator.try_poll_id(1, 1) {
                        Ok(Poll::Ready { id }) => {
                            black_box(id);
                        }
                        _ => unreachable!(),
                    }
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks generators that may yield on clock stall.
fn bench_yield<T: TimeSource>(c: &mut Criterion, group_name: &str, clock_factory: impl Fn() -> T) {
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let generator = SnowflakeGenerator::new(SnowflakeLayout::TWITTER, clock_factory());
            let start = Instant::now();

            for _ in 0..iters {
                for _ in 0..TOTAL_IDS {
                    let id = generator
                        .try_next_id(1, 1, |_| std::thread::yield_now())
                        .unwrap();
                    black_box(id);
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks contention on one generator across threads.
fn bench_contended(c: &mut Criterion) {
    const THREADS: usize = 8;

    let mut group = c.benchmark_group("mono/contended");
    group.throughput(Throughput::Elements((TOTAL_IDS * THREADS) as u64));

    group.bench_function(format!("threads/{THREADS}"), |b| {
        b.iter_custom(|iters| {
            let generator =
                SnowflakeGenerator::new(SnowflakeLayout::TWITTER, MonotonicClock::default());
            let barrier = Arc::new(Barrier::new(THREADS + 1));

            // The scope joins every thread before returning.
            let start = scope(|s| {
                for t in 0..THREADS {
                    let generator = &generator;
                    let barrier = Arc::clone(&barrier);
                    s.spawn(move || {
                        barrier.wait();
                        for _ in 0..iters {
                            for _ in 0..TOTAL_IDS {
                                let id = generator
                                    .try_next_id(0, t as i64, |_| std::thread::yield_now())
                                    .unwrap();
                                black_box(id);
                            }
                        }
                    });
                }
                barrier.wait();
                Instant::now()
            });

            start.elapsed()
        });
    });

    group.finish();
}

fn benches(c: &mut Criterion) {
    bench_ready(c);
    bench_yield(c, "system/yield", SystemClock::default);
    bench_yield(c, "mono/yield", MonotonicClock::default);
    bench_contended(c);
}

criterion_group!(all, benches);
criterion_main!(all);
