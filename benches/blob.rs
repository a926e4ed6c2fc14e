#![allow(unused)]
extern crate dotsign;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use dotsign::{
    blob::{
        encode_private_key_blob, is_valid_public_key, try_extract_public_key, try_parse_key,
        RsaParameters,
    },
    keys::KeyPairCache,
    signing::calculate_rsa_signature,
};
use rsa::RsaPrivateKey;
use std::hint::black_box;

fn key_pair_blob(bits: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let key = RsaPrivateKey::new(&mut rng, bits).unwrap();
    let params = RsaParameters::from_private_key(&key).unwrap();
    encode_private_key_blob(&params).unwrap()
}

/// Benchmark validation and extraction on a 2048-bit key pair
fn bench_codec(c: &mut Criterion) {
    let blob = key_pair_blob(2048);
    let public_key = try_extract_public_key(&blob).unwrap();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Bytes(blob.len() as u64));
    group.bench_function("is_valid_public_key", |b| {
        b.iter(|| black_box(is_valid_public_key(black_box(&public_key))));
    });
    group.bench_function("try_extract_public_key", |b| {
        b.iter(|| black_box(try_extract_public_key(black_box(&blob))));
    });
    group.bench_function("try_parse_key", |b| {
        b.iter(|| black_box(try_parse_key(black_box(&blob))));
    });
    group.finish();
}

/// Benchmark a cache hit against a full parse of the same content
fn bench_cache(c: &mut Criterion) {
    let blob = key_pair_blob(2048);
    let cache = KeyPairCache::new();
    cache.get_or_parse(&blob, try_parse_key);

    c.bench_function("cache_hit", |b| {
        b.iter(|| black_box(cache.get_or_parse(black_box(&blob), try_parse_key)));
    });
}

/// Benchmark strong-name signature computation over a 64 KiB image
fn bench_signature(c: &mut Criterion) {
    let blob = key_pair_blob(2048);
    let private_key = try_parse_key(&blob).unwrap().private_key.unwrap();
    let content = vec![0x5A_u8; 64 * 1024];

    let mut group = c.benchmark_group("signature");
    group.throughput(Throughput::Bytes(content.len() as u64));
    group.bench_function("calculate_rsa_signature", |b| {
        b.iter(|| black_box(calculate_rsa_signature(black_box(&content), &private_key).unwrap()));
    });
    group.finish();
}

criterion_group!(benches, bench_codec, bench_cache, bench_signature);
criterion_main!(benches);
