//! Generate throughput benchmarks for CTR_DRBG (AES-256, no df).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use ctr_drbg::drbg::{CtrDrbg, DrbgMechanism};
use ctr_drbg::source::{FixedEntropy, NoNonce};

const ENTROPY: [u8; 48] = [0x5A; 48];

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("ctr_drbg_generate");

    for bytes in [16usize, 256, 4032] {
        let drbg = DrbgMechanism::new(CtrDrbg::new(), FixedEntropy::from_inputs([ENTROPY]), NoNonce);
        let handle = drbg.instantiate(256, false, &[]).unwrap();

        group.throughput(Throughput::Bytes(bytes as u64));
        group.bench_with_input(BenchmarkId::from_parameter(bytes), &bytes, |b, &bytes| {
            b.iter(|| black_box(drbg.generate(handle, bytes * 8, 256, false, &[]).unwrap()))
        });
    }

    group.finish();
}

fn bench_generate_with_additional_input(c: &mut Criterion) {
    let drbg = DrbgMechanism::new(CtrDrbg::new(), FixedEntropy::from_inputs([ENTROPY]), NoNonce);
    let handle = drbg.instantiate(256, false, &[]).unwrap();
    let additional = [0xC3u8; 48];

    c.bench_function("ctr_drbg_generate_additional_input_256", |b| {
        b.iter(|| black_box(drbg.generate(handle, 2048, 256, false, &additional).unwrap()))
    });
}

criterion_group!(benches, bench_generate, bench_generate_with_additional_input);
criterion_main!(benches);
