/*
 * ALPHA SOVEREIGN - LCORE ALLOCATOR DECISION LATENCY BENCHMARK
 * =================================================================
 * Component Name: benches/alloc_bench.rs
 * Core Responsibility: قياس زمن قرار التخصيص على جهاز كامل السعة (128 نواة، 4 مقابس).
 * Design Pattern: Latency Measurement
 * Forensic Impact: يثبت أن البحث المتدرج يبقى رخيصاً حتى عند أسوأ مسار (الطبقة 4).
 * =================================================================
 */

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::sync::Arc;

use alpha_lcore::prelude::*;
use alpha_lcore::StaticProvider;

fn full_machine() -> Arc<StaticProvider> {
    Arc::new(StaticProvider::uniform(4, 32))
}

fn constrained_policy() -> LCoreAllocConfig {
    let mut cfg = LCoreAllocConfig::new();
    cfg.insert("rx".into(), RoleConfig::new().with_lcores([1, 33, 65, 97]));
    cfg.insert("tx".into(), RoleConfig::new().with_lcores([2, 34, 66, 98]));
    cfg.insert(
        "worker".into(),
        RoleConfig::new().with_limit(NumaSocket::new(0), 4).with_limit(NumaSocket::ANY, 16),
    );
    cfg
}

fn bench_allocator(c: &mut Criterion) {
    let mut group = c.benchmark_group("LCoreAllocator");

    // =================================================================
    // 1. وضع غير مقيد: منح ثم تحرير
    // =================================================================
    group.bench_function("unconstrained_alloc_free", |b| {
        let mut la = LCoreAllocator::new(full_machine(), LCoreAllocConfig::new());
        b.iter(|| {
            let lc = la.alloc(black_box("worker"), black_box(NumaSocket::ANY)).unwrap();
            la.free(lc);
        });
    });

    // =================================================================
    // 2. أسوأ مسار: حصة المقبس المطلوب ممتلئة، البحث ينزل للطبقة 4
    // =================================================================
    group.bench_function("tier4_fallback", |b| {
        b.iter_batched(
            || {
                let mut la = LCoreAllocator::new(full_machine(), constrained_policy());
                for _ in 0..4 {
                    la.alloc("worker", NumaSocket::new(0)).unwrap();
                }
                la
            },
            |mut la| black_box(la.alloc("worker", NumaSocket::new(0))),
            BatchSize::SmallInput,
        );
    });

    // =================================================================
    // 3. بحث قراءة فقط
    // =================================================================
    group.bench_function("find_owned_idle", |b| {
        let mut la = LCoreAllocator::new(full_machine(), LCoreAllocConfig::new());
        for _ in 0..64 {
            la.alloc("worker", NumaSocket::ANY).unwrap();
        }
        b.iter(|| black_box(la.find(black_box("worker"), black_box(NumaSocket::new(3)))));
    });

    group.finish();
}

criterion_group!(benches, bench_allocator);
criterion_main!(benches);
