//! ORDIS - Performance Benchmarks
//! Measures the codec hot paths and store operations using Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ordis::codec::{encode_score, ItemKey, MetaVal, MetaValue, ZScoreItemKey};
use ordis::config::Config;
use ordis::store::Store;
use ordis::sweeper::Sweeper;
use ordis::types::DataType;

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    group.bench_function("item_key_encode", |b| {
        b.iter(|| {
            let key = ItemKey::new(black_box(&b"user:1000:profile"[..]), 7, &b"email"[..]);
            black_box(key.encode());
        });
    });

    group.bench_function("item_key_decode", |b| {
        let encoded = ItemKey::new(b"user:1000:profile".to_vec(), 7, b"email".to_vec()).encode();
        b.iter(|| {
            black_box(ItemKey::decode(black_box(&encoded)).unwrap());
        });
    });

    group.bench_function("zscore_key_encode", |b| {
        b.iter(|| {
            let row = ZScoreItemKey::new(&b"leaderboard"[..], 3, black_box(1234.5), &b"player"[..]);
            black_box(row.encode());
        });
    });

    group.bench_function("meta_value_decode", |b| {
        let mut meta = MetaVal::new(DataType::Hash, 42);
        meta.length = 1_000;
        let encoded = MetaValue::from(meta).encode();
        b.iter(|| {
            black_box(MetaValue::decode(black_box(&encoded)).unwrap());
        });
    });

    group.bench_function("encode_score_1000", |b| {
        b.iter(|| {
            for i in 0..1000 {
                black_box(encode_score(black_box(i as f64 * 0.37 - 150.0)));
            }
        });
    });

    group.finish();
}

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("hset_then_del", size), size, |b, &size| {
            b.iter(|| {
                let dir = tempfile::tempdir().unwrap();
                let mut store = Store::open(Config::new(dir.path())).unwrap();
                for i in 0..size {
                    let field = format!("field_{:06}", i);
                    store.hset(b"bench", field.as_bytes(), b"value").unwrap();
                }
                black_box(store.del(b"bench").unwrap());
            });
        });

        group.bench_with_input(BenchmarkId::new("sweep", size), size, |b, &size| {
            b.iter(|| {
                let dir = tempfile::tempdir().unwrap();
                let mut store = Store::open(Config::new(dir.path())).unwrap();
                let members: Vec<Vec<u8>> =
                    (0..size).map(|i| format!("m{:06}", i).into_bytes()).collect();
                store.sadd(b"bench", &members).unwrap();
                store.del(b"bench").unwrap();
                black_box(Sweeper::new(16).sweep_once(&mut store).unwrap());
            });
        });
    }

    group.bench_function("zrange_by_score_100_of_1000", |b| {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open(Config::new(dir.path())).unwrap();
        for i in 0..1000 {
            let member = format!("player_{:04}", i);
            store.zadd(b"lb", member.as_bytes(), i as f64).unwrap();
        }
        b.iter(|| {
            black_box(store.zrange_by_score(b"lb", 250.0, 349.0, usize::MAX).unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_codec, bench_store);
criterion_main!(benches);
