use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use memdb_rs::{Device, Whence};
use std::io::Read;

/// Benchmark dump cost across device sizes
fn bench_dump(c: &mut Criterion) {
    let sizes = vec![64 * 1024, 1024 * 1024, 16 * 1024 * 1024];

    let mut group = c.benchmark_group("device_dump");

    for size in sizes {
        let device = Device::new("bench", &vec![0xAB; size]);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), &device, |b, device| {
            b.iter(|| {
                let stream = device.dump();
                black_box(stream.len());
            });
        });
    }

    group.finish();
}

/// Benchmark random-offset writes with different page sizes
fn bench_write_at(c: &mut Criterion) {
    let page_sizes = vec![4 * 1024, 64 * 1024];

    let mut group = c.benchmark_group("device_write_at");
    group.throughput(Throughput::Bytes(4096));

    for page_size in page_sizes {
        let device = Device::with_page_size("bench", &vec![0u8; 4 * 1024 * 1024], page_size).unwrap();
        let block = vec![0x5A; 4096];

        group.bench_with_input(
            BenchmarkId::from_parameter(page_size),
            &page_size,
            |b, _| {
                let mut offset = 0u64;
                b.iter(|| {
                    // Straddles page boundaries on the smaller page size
                    offset = (offset + 7 * 1024 + 13) % (4 * 1024 * 1024 - 4096);
                    device.write_at(black_box(&block), offset).unwrap();
                });
            },
        );
    }

    group.finish();
}

/// Benchmark streaming a snapshot through std::io::Read
fn bench_stream_read(c: &mut Criterion) {
    let device = Device::new("bench", &vec![1u8; 4 * 1024 * 1024]);
    let snapshot = device.dump();

    let mut group = c.benchmark_group("snapshot_read");
    group.throughput(Throughput::Bytes(snapshot.len() as u64));

    group.bench_function("read_to_end", |b| {
        b.iter_with_setup(
            || {
                let mut s = snapshot.clone();
                s.seek_to(0, Whence::Start).unwrap();
                s
            },
            |mut s| {
                let mut out = Vec::with_capacity(s.len());
                s.read_to_end(&mut out).unwrap();
                black_box(out);
            },
        );
    });

    group.finish();
}

criterion_group!(benches, bench_dump, bench_write_at, bench_stream_read);
criterion_main!(benches);
