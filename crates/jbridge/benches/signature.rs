use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use jbridge::encode::EncodedArgs;
use jbridge::{derive, Bridge, Value};

fn bench_derive(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive");

    let scalars: Vec<Value<'static>> = vec![
        Value::from(1),
        Value::from(5_000_000_000i64),
        Value::from(1.5f32),
        Value::from(true),
        Value::from("text"),
    ];
    group.bench_with_input(BenchmarkId::new("scalars", 5), &scalars, |b, args| {
        b.iter(|| derive(black_box(args), None).unwrap());
    });

    let arrays: Vec<Value<'static>> = vec![
        Value::from((0..64).collect::<Vec<i32>>()),
        Value::from(vec!["a"; 64]),
        Value::List(vec![]),
    ];
    group.bench_with_input(BenchmarkId::new("arrays", 3), &arrays, |b, args| {
        b.iter(|| derive(black_box(args), None).unwrap());
    });

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let args: Vec<Value<'static>> = vec![
        Value::from("hello, world"),
        Value::from((0..256).collect::<Vec<i32>>()),
        Value::from(vec!["alpha", "beta", "gamma"]),
    ];

    c.bench_function("encode_mixed", |b| {
        b.iter(|| EncodedArgs::encode(black_box(&args)).unwrap());
    });
}

fn bench_loopback_call(c: &mut Criterion) {
    let bridge = Bridge::new(Arc::new(jbridge_loopback::entry_points()));
    let args = [Value::from(2), Value::from(3)];

    c.bench_function("loopback_static_add", |b| {
        b.iter(|| {
            bridge
                .call_static_typed::<i32>("com.example.Calc", "add", black_box(&args))
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_derive, bench_encode, bench_loopback_call);
criterion_main!(benches);
