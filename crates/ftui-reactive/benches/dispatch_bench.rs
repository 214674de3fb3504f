//! Benchmarks for listener dispatch and binding propagation.
//!
//! Run with: `cargo bench --package ftui-reactive --bench dispatch_bench`
//!
//! # Performance Baselines
//!
//! These benchmarks establish baselines for:
//! - Property writes fanned out to N invalidation listeners
//! - Change-listener delivery with old/new values
//! - Propagation through a chain of lazy bindings
//! - Listener add/remove churn across the storage representations

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use ftui_reactive::bindings;
use ftui_reactive::{
    Binding, ChangeListener, InvalidationListener, ListenerSet, Observable, ObservableValue,
    Property,
};
use std::cell::Cell;
use std::hint::black_box;
use std::rc::Rc;

// ============================================================================
// Fan-out
// ============================================================================

fn bench_invalidation_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch/invalidation_fanout");
    for &listeners in &[1_usize, 2, 8, 64, 512] {
        let property = Property::new(0_u64);
        let hits = Rc::new(Cell::new(0_u64));
        for _ in 0..listeners {
            let hits = Rc::clone(&hits);
            property.add_listener(InvalidationListener::new(move |_| hits.set(hits.get() + 1)));
        }
        group.throughput(Throughput::Elements(listeners as u64));
        group.bench_with_input(BenchmarkId::from_parameter(listeners), &listeners, |b, _| {
            let mut next = 0_u64;
            b.iter(|| {
                next += 1;
                property.set(black_box(next)).ok();
            });
        });
    }
    group.finish();
}

fn bench_change_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch/change_fanout");
    for &listeners in &[1_usize, 8, 64] {
        let property = Property::new(0_u64);
        for _ in 0..listeners {
            property.add_change_listener(ChangeListener::new(|old: &u64, new: &u64| {
                black_box((old, new));
            }));
        }
        group.throughput(Throughput::Elements(listeners as u64));
        group.bench_with_input(BenchmarkId::from_parameter(listeners), &listeners, |b, _| {
            let mut next = 0_u64;
            b.iter(|| {
                next += 1;
                property.set(black_box(next)).ok();
            });
        });
    }
    group.finish();
}

// ============================================================================
// Binding chains
// ============================================================================

fn build_chain(root: &Property<i64>, depth: usize) -> Binding<i64> {
    let mut tail = bindings::add(root, 1_i64);
    for _ in 1..depth {
        tail = bindings::add(&tail, 1_i64);
    }
    tail
}

fn bench_binding_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch/binding_chain");
    for &depth in &[1_usize, 16, 128] {
        let root = Property::new(0_i64);
        let tail = build_chain(&root, depth);
        group.bench_with_input(BenchmarkId::new("set_then_get", depth), &depth, |b, _| {
            let mut next = 0_i64;
            b.iter(|| {
                next += 1;
                root.set(next).ok();
                black_box(tail.get())
            });
        });
        group.bench_with_input(BenchmarkId::new("set_only", depth), &depth, |b, _| {
            let _ = tail.get();
            let mut next = 0_i64;
            b.iter(|| {
                next += 1;
                root.set(black_box(next)).ok();
            });
        });
    }
    group.finish();
}

// ============================================================================
// Storage churn
// ============================================================================

fn bench_storage_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("storage/add_remove");
    for &count in &[1_usize, 2, 16, 256] {
        let listeners: Vec<InvalidationListener> =
            (0..count).map(|_| InvalidationListener::new(|_| {})).collect();
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &listeners, |b, listeners| {
            b.iter(|| {
                let mut set: ListenerSet<ChangeListener<u64>> = ListenerSet::default();
                for listener in listeners {
                    set.add_invalidation(listener.clone());
                }
                for listener in listeners.iter().rev() {
                    set.remove_invalidation(listener);
                }
                black_box(set.kind())
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_invalidation_fanout,
    bench_change_fanout,
    bench_binding_chain,
    bench_storage_churn
);
criterion_main!(benches);
