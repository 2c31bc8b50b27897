use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use operator::{
    rendezvous::{WaiterId, WaiterRegistry},
    Context, RendezvousEngine,
};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn bench_registry_add_remove(c: &mut Criterion) {
    c.bench_function("registry_add_remove", |b| {
        b.iter_batched(
            WaiterRegistry::<()>::new,
            |mut reg| {
                for id in 0..64u64 {
                    reg.add("room", WaiterId::from_raw(id), ());
                }
                for id in reg.list("room") {
                    black_box(reg.remove("room", id));
                }
                reg
            },
            BatchSize::SmallInput,
        )
    });
}

/// Подписчик ждёт, publish находит его сразу.
fn bench_handoff_roundtrip(c: &mut Criterion) {
    let rt = runtime();
    let engine = rt.block_on(async { RendezvousEngine::with_defaults() });

    c.bench_function("handoff_roundtrip", |b| {
        b.to_async(&rt).iter(|| {
            let engine = engine.clone();
            async move {
                let sub = tokio::spawn({
                    let engine = engine.clone();
                    async move { engine.subscribe(&Context::background(), "room").await }
                });
                engine
                    .publish(&Context::background(), "room", black_box("offer"))
                    .await
                    .unwrap();
                black_box(sub.await.unwrap().unwrap())
            }
        })
    });
}

/// Много независимых адресов одновременно.
fn bench_handoff_parallel_addresses(c: &mut Criterion) {
    let rt = runtime();
    let engine = rt.block_on(async { RendezvousEngine::with_defaults() });

    c.bench_function("handoff_64_addresses", |b| {
        b.to_async(&rt).iter(|| {
            let engine = engine.clone();
            async move {
                let mut tasks = Vec::with_capacity(128);
                for i in 0..64 {
                    let address = format!("room-{i}");
                    let sub_engine = engine.clone();
                    let sub_address = address.clone();
                    tasks.push(tokio::spawn(async move {
                        sub_engine
                            .subscribe(&Context::background(), &sub_address)
                            .await
                            .map(drop)
                    }));
                    let pub_engine = engine.clone();
                    tasks.push(tokio::spawn(async move {
                        pub_engine
                            .publish(&Context::background(), &address, "x")
                            .await
                    }));
                }
                for task in tasks {
                    task.await.unwrap().unwrap();
                }
            }
        })
    });
}

criterion_group!(
    benches,
    bench_registry_add_remove,
    bench_handoff_roundtrip,
    bench_handoff_parallel_addresses
);
criterion_main!(benches);
