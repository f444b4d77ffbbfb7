use criterion::{black_box, criterion_group, criterion_main, Criterion};
use regf_reader::{Hive, HiveOptions};

#[path = "../tests/common/mod.rs"]
mod common;

use common::{reg_sz, HiveBuilder, REG_SZ};

/// `ROOT\Bucket{0..16}\Key{0..64}`, each leaf holding one string value.
fn wide_hive() -> Vec<u8> {
    let mut b = HiveBuilder::new();
    let mut buckets = Vec::new();
    for bucket in 0..16 {
        let keys: Vec<u32> = (0..64)
            .map(|i| {
                let value = b.value("Data", REG_SZ, &reg_sz(&format!("{}-{}", bucket, i)));
                b.key(&format!("Key{}", i), &[], &[value])
            })
            .collect();
        buckets.push(b.key(&format!("Bucket{}", bucket), &keys, &[]));
    }
    b.root(&buckets, &[]);
    b.build()
}

fn bench_lookup(c: &mut Criterion) {
    let data = wide_hive();
    let hive = Hive::from_vec(data.clone()).unwrap();
    let cached =
        Hive::from_vec_with_options(data, HiveOptions::default().cache_keys(true)).unwrap();

    c.bench_function("value_by_path", |b| {
        b.iter(|| {
            let value = hive
                .value_by_path(black_box("Bucket11\\Key47\\Data"))
                .unwrap();
            black_box(value.as_string().unwrap())
        })
    });

    c.bench_function("value_by_path_cached", |b| {
        b.iter(|| {
            let value = cached
                .value_by_path(black_box("Bucket11\\Key47\\Data"))
                .unwrap();
            black_box(value.as_string().unwrap())
        })
    });

    c.bench_function("enumerate_subkeys", |b| {
        b.iter(|| {
            let bucket = hive.key_by_path("Bucket3").unwrap();
            black_box(bucket.subkeys().unwrap().len())
        })
    });
}

criterion_group!(benches, bench_lookup);
criterion_main!(benches);
