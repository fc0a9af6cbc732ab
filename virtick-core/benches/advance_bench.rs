#[macro_use]
extern crate criterion;

use std::thread;
use std::time::Duration;

use criterion::{black_box, Criterion};

use virtick_core::{Clock, VirtualClock};

fn bench_timer_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("timer_registration");

    for count in [128, 1024, 8192] {
        group.throughput(criterion::Throughput::Elements(count as u64));
        group.bench_function(format!("timers_{}", count), |b| {
            b.iter(|| {
                let clock = VirtualClock::new();
                let timers: Vec<_> = (0..count)
                    .map(|i| clock.new_timer(Duration::from_millis((i * 7919 % 1000) as u64)))
                    .collect();
                for timer in &timers {
                    black_box(timer.stop());
                }
            });
        });
    }
    group.finish();
}

fn bench_ticker_advance(c: &mut Criterion) {
    c.bench_function("ticker_advance_1000_ticks", |b| {
        b.iter(|| {
            let clock = VirtualClock::new();
            let ticker = clock.new_ticker(Duration::from_millis(1)).unwrap();
            let rx = ticker.receiver().clone();
            let consumer = thread::spawn(move || rx.iter().count());

            clock.advance(Duration::from_millis(1000));
            ticker.stop();
            drop(ticker);
            black_box(consumer.join().unwrap());
        })
    });
}

criterion_group!(benches, bench_timer_registration, bench_ticker_advance);
criterion_main!(benches);
