use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use mmap_region::{utils::page_size, MappedRegion, MmapMode};
use std::fs;
use std::path::PathBuf;

// Simple helper to build a unique temp path per bench
fn tmp_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("mmap_region_bench_{}_{}", name, std::process::id()));
    p
}

const SIZES: [usize; 3] = [4 * 1024, 64 * 1024, 1024 * 1024];

fn bench_open_unmap(b: &mut Criterion) {
    let mut group = b.benchmark_group("open_unmap");
    for &size in &SIZES {
        let path = tmp_path(&format!("open_unmap_{size}"));
        fs::write(&path, vec![0u8; size]).expect("seed");
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |ben, _| {
            ben.iter(|| {
                let region = MappedRegion::open(&path, MmapMode::ReadOnly).expect("open");
                criterion::black_box(region.len());
            });
        });
        let _ = fs::remove_file(&path);
    }
    group.finish();
}

fn bench_unaligned_open(b: &mut Criterion) {
    let mut group = b.benchmark_group("unaligned_open");
    let ps = page_size();
    let path = tmp_path("unaligned_open");
    fs::write(&path, vec![0u8; 4 * ps]).expect("seed");
    for &offset in &[0, 1, ps / 2, ps + 3] {
        group.bench_with_input(BenchmarkId::from_parameter(offset), &offset, |ben, &off| {
            ben.iter(|| {
                let region = MappedRegion::open_range(&path, off as u64, ps, MmapMode::ReadOnly)
                    .expect("open_range");
                criterion::black_box(region[0]);
            });
        });
    }
    let _ = fs::remove_file(&path);
    group.finish();
}

fn bench_write_sync(b: &mut Criterion) {
    let mut group = b.benchmark_group("write_sync");
    for &size in &SIZES {
        group.throughput(Throughput::Bytes(size as u64));
        // Variant A: writes without sync (caller controls durability)
        group.bench_with_input(BenchmarkId::new("write_only", size), &size, |ben, &sz| {
            let path = tmp_path(&format!("write_only_{sz}"));
            fs::write(&path, vec![0u8; sz]).expect("seed");
            let mut region = MappedRegion::open(&path, MmapMode::ReadWrite).expect("open");

            let payload = vec![0xAB_u8; sz];
            ben.iter(|| {
                region.write_at(0, &payload).expect("write");
                criterion::black_box(&payload);
            });

            drop(region);
            let _ = fs::remove_file(&path);
        });

        // Variant B: writes followed by sync to measure flush overhead
        group.bench_with_input(BenchmarkId::new("write_plus_sync", size), &size, |ben, &sz| {
            let path = tmp_path(&format!("write_sync_{sz}"));
            fs::write(&path, vec![0u8; sz]).expect("seed");
            let mut region = MappedRegion::open(&path, MmapMode::ReadWrite).expect("open");

            let payload = vec![0xAC_u8; sz];
            ben.iter(|| {
                region.write_at(0, &payload).expect("write");
                region.sync().expect("sync");
            });

            drop(region);
            let _ = fs::remove_file(&path);
        });
    }
    group.finish();
}

fn bench_equality(b: &mut Criterion) {
    let mut group = b.benchmark_group("equality");
    let size = 1024 * 1024;
    group.throughput(Throughput::Bytes(size as u64));
    group.bench_function("compare_1MB", |ben| {
        let path = tmp_path("equality");
        fs::write(&path, vec![7u8; size]).expect("seed");
        ben.iter_batched(
            || {
                (
                    MappedRegion::open(&path, MmapMode::ReadOnly).expect("a"),
                    MappedRegion::open(&path, MmapMode::ReadOnly).expect("b"),
                )
            },
            |(a, b)| criterion::black_box(a == b),
            BatchSize::SmallInput,
        );
        let _ = fs::remove_file(&path);
    });
    group.finish();
}

fn criterion_config() -> Criterion {
    Criterion::default()
        .sample_size(30)
        .warm_up_time(std::time::Duration::from_millis(300))
        .measurement_time(std::time::Duration::from_secs(3))
}

criterion_group! {
    name = region_benches;
    config = criterion_config();
    targets =
        bench_open_unmap,
        bench_unaligned_open,
        bench_write_sync,
        bench_equality
}

criterion_main!(region_benches);
