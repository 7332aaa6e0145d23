//! Matching benchmarks.
//!
//! Run with: `cargo bench -p falcon-router`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use falcon_router::{canonicalize, Group, Router, RouterBuilder};
use http::Method;

fn build_router(per_kind: usize) -> Router<usize, ()> {
    let mut builder = RouterBuilder::new();

    for i in 0..per_kind {
        builder.get(&format!("/static/page{i}"), i).unwrap();
        builder.get(&format!("/users{i}/:id"), i).unwrap();
    }

    let mut group = Group::new("/api/v1");
    for i in 0..per_kind {
        group.get(&format!("/org/:org/resource{i}/:id"), i).unwrap();
    }
    builder.add_group(group).unwrap();

    builder.build().unwrap()
}

fn bench_static_match(c: &mut Criterion) {
    let router = build_router(50);
    c.bench_function("static_match", |b| {
        b.iter(|| black_box(router.lookup(&Method::GET, "/static/page25").found().is_some()));
    });
}

fn bench_param_match(c: &mut Criterion) {
    let router = build_router(50);
    c.bench_function("param_match", |b| {
        b.iter(|| black_box(router.lookup(&Method::GET, "/users25/12345").found().is_some()));
    });
}

fn bench_group_match(c: &mut Criterion) {
    let router = build_router(50);
    c.bench_function("group_match", |b| {
        b.iter(|| {
            black_box(
                router
                    .lookup(&Method::GET, "/api/v1/org/acme/resource10/12345")
                    .found()
                    .is_some(),
            )
        });
    });
}

fn bench_miss(c: &mut Criterion) {
    let router = build_router(50);
    c.bench_function("miss", |b| {
        b.iter(|| black_box(router.lookup(&Method::GET, "/nothing/here").is_not_found()));
    });
}

fn bench_canonicalize(c: &mut Criterion) {
    c.bench_function("canonicalize", |b| {
        b.iter(|| black_box(canonicalize("//api/./v1/../v2//users/(a/b)/42/")));
    });
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");

    for per_kind in [10, 50, 100, 500] {
        let router = build_router(per_kind);

        group.bench_with_input(BenchmarkId::new("static_match", per_kind), &per_kind, |b, &n| {
            let path = format!("/static/page{}", n / 2);
            b.iter(|| black_box(router.lookup(&Method::GET, &path).found().is_some()));
        });

        group.bench_with_input(BenchmarkId::new("param_match", per_kind), &per_kind, |b, &n| {
            let path = format!("/users{}/12345", n / 2);
            b.iter(|| black_box(router.lookup(&Method::GET, &path).found().is_some()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_static_match,
    bench_param_match,
    bench_group_match,
    bench_miss,
    bench_canonicalize,
    bench_scaling
);
criterion_main!(benches);
