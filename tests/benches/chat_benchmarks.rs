//! # Multiverse Chat Benchmarks
//!
//! | Component | Operation | Target |
//! |-----------|-----------|--------|
//! | mc-01 Ledger Store | credit existing record | < 10µs |
//! | mc-01 Ledger Store | top 10 of 10k records | < 10ms |
//! | mc-03 Command Interpreter | parse a command line | < 1µs |
//! | mc-04 Dispatcher | broadcast to 1k connections | < 1ms |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mc_01_ledger_store::{InMemoryKVStore, InMemoryLedger, LedgerStore};
use mc_03_command_interpreter::parse_command;
use mc_04_dispatcher::{Dispatcher, DispatcherConfig, InMemoryDispatcher, OverflowPolicy};
use rand::Rng;
use shared_types::{ConnectionId, OutboundEvent, RecordUpdate};

fn seeded_ledger(records: usize) -> InMemoryLedger {
    let ledger = InMemoryLedger::open(InMemoryKVStore::new()).unwrap();
    let mut rng = rand::thread_rng();
    for i in 0..records {
        ledger
            .upsert(&format!("user{}", i), RecordUpdate::credit(rng.gen_range(0..100_000)))
            .unwrap();
    }
    ledger
}

fn bench_ledger(c: &mut Criterion) {
    let mut group = c.benchmark_group("mc-01-ledger-store");

    let ledger = seeded_ledger(1_000);
    group.bench_function("credit_existing", |b| {
        b.iter(|| {
            ledger
                .update_existing(black_box("user42"), &|_| Ok(RecordUpdate::credit(1)))
                .unwrap()
        })
    });

    for size in [1_000, 10_000] {
        let ledger = seeded_ledger(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("top_10", size), &ledger, |b, ledger| {
            b.iter(|| black_box(ledger.top_n(10).unwrap()))
        });
    }

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("mc-03-command-interpreter");

    group.bench_function("parse_command", |b| {
        b.iter(|| black_box(parse_command(black_box("!grant ada 500"))))
    });
    group.bench_function("parse_plain_text", |b| {
        b.iter(|| black_box(parse_command(black_box("just chatting about the weather"))))
    });

    group.finish();
}

fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("mc-04-dispatcher");

    for connections in [10, 100, 1_000] {
        let dispatcher = InMemoryDispatcher::with_config(DispatcherConfig {
            outbox_capacity: 16,
            overflow_policy: OverflowPolicy::DropNewest,
        });
        let mut outboxes: Vec<_> = (0..connections)
            .map(|_| dispatcher.register(ConnectionId::new()))
            .collect();

        group.throughput(Throughput::Elements(connections as u64));
        group.bench_with_input(
            BenchmarkId::new("broadcast", connections),
            &connections,
            |b, _| {
                b.iter(|| {
                    let delivered = dispatcher.broadcast(OutboundEvent::chat("ada", "hello"), None);
                    for outbox in outboxes.iter_mut() {
                        outbox.drain();
                    }
                    black_box(delivered)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_ledger, bench_parse, bench_broadcast);
criterion_main!(benches);
