use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use qrlog::{
    core::{slots::lowest_free_slot, store::MemoryRecordStore},
    payload::QrFormat,
    persist::{RecordStore, sqlite::SqliteRecordStore},
    record::RecordDraft,
    render::{self, RenderSettings},
};

fn draft(i: u64) -> RecordDraft {
    RecordDraft::new(format!("SN{i:08}"), "123456", format!("{i:016X}"))
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for format in QrFormat::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(format), &format, |b, &format| {
            b.iter(|| format.encode("SN00012345", "123456", "4D91EC53E5DDA7D7"));
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let settings = RenderSettings::default();
    let payload = QrFormat::Olarm.encode("SN00012345", "123456", "4D91EC53E5DDA7D7");
    c.bench_function("render_olarm", |b| {
        b.iter(|| render::render(&payload, &settings).expect("render"));
    });
}

fn bench_slot_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("lowest_free_slot");
    for n in [100i64, 10_000, 100_000] {
        // Dense ids: worst case, the scan walks everything.
        let ids: Vec<i64> = (1..=n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &ids, |b, ids| {
            b.iter(|| lowest_free_slot(ids.iter().copied()));
        });
    }
    group.finish();
}

fn bench_memory_churn(c: &mut Criterion) {
    c.bench_function("memory_create_delete_2k", |b| {
        b.iter(|| {
            let mut store = MemoryRecordStore::new();
            for i in 0..2_000u64 {
                store.create(draft(i), "absent.png").expect("create");
            }
            for id in (1..=2_000i64).step_by(3) {
                store.delete(id).expect("delete");
            }
            for i in 0..500u64 {
                store.create(draft(i), "absent.png").expect("refill");
            }
        });
    });
}

fn bench_sqlite_create(c: &mut Criterion) {
    c.bench_function("sqlite_create_500", |b| {
        b.iter(|| {
            let mut store = SqliteRecordStore::open_in_memory().expect("open");
            for i in 0..500u64 {
                store.create(draft(i), "absent.png").expect("create");
            }
        });
    });
}

criterion_group!(
    benches,
    bench_encode,
    bench_render,
    bench_slot_scan,
    bench_memory_churn,
    bench_sqlite_create
);
criterion_main!(benches);
