use std::hint::black_box;

use bencher::{HEADER_CASES, header_pairs};
use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use micro_message::header::HeaderCollection;

fn benchmark_collect(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("header_collect");

    for case in HEADER_CASES {
        let pairs = header_pairs(case.input());
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &pairs, |b, pairs| {
            b.iter(|| black_box(HeaderCollection::from_pairs(pairs.iter().copied()).expect("headers should be valid")));
        });
    }

    group.finish();
}

fn benchmark_mutate(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("header_mutate");

    for case in HEADER_CASES {
        let headers = HeaderCollection::from_pairs(header_pairs(case.input())).expect("headers should be valid");
        group.bench_with_input(BenchmarkId::new("replace", case.name()), &headers, |b, headers| {
            b.iter_batched_ref(
                || headers.clone(),
                |headers| black_box(headers.with_header("accept", "application/json").expect("header should be valid")),
                BatchSize::SmallInput,
            );
        });
        group.bench_with_input(BenchmarkId::new("lookup", case.name()), &headers, |b, headers| {
            b.iter(|| black_box(headers.line(black_box("ACCEPT"))));
        });
    }

    group.finish();
}

criterion_group!(headers, benchmark_collect, benchmark_mutate);
criterion_main!(headers);
