use std::fs;

use tempfile::TempDir;

use qrlog::{
    core::store::MemoryRecordStore,
    persist::{RecordStore, StoreError, sqlite::SqliteRecordStore},
    record::{RecordDraft, sample_draft},
    types::SortOrder,
};

fn draft(serial: &str) -> RecordDraft {
    RecordDraft::new(serial, "123456", "00112233AABBCCDD")
}

fn stores() -> Vec<(&'static str, Box<dyn RecordStore>)> {
    vec![
        (
            "memory",
            Box::new(MemoryRecordStore::new()) as Box<dyn RecordStore>,
        ),
        (
            "sqlite",
            Box::new(SqliteRecordStore::open_in_memory().expect("open sqlite"))
                as Box<dyn RecordStore>,
        ),
    ]
}

#[test]
fn freed_slots_are_reused_lowest_first() {
    for (name, mut store) in stores() {
        let a = store.create(draft("A"), "a.png").expect("create a");
        let b = store.create(draft("B"), "b.png").expect("create b");
        let c = store.create(draft("C"), "c.png").expect("create c");
        assert_eq!((a.id, b.id, c.id), (1, 2, 3), "{name}");

        store.delete(1).expect("delete 1");
        store.delete(2).expect("delete 2");
        assert_eq!(store.create(draft("D"), "d.png").expect("d").id, 1, "{name}");
        assert_eq!(store.create(draft("E"), "e.png").expect("e").id, 2, "{name}");
        assert_eq!(store.create(draft("F"), "f.png").expect("f").id, 4, "{name}");
    }
}

#[test]
fn empty_store_starts_at_one_after_full_clear() {
    for (name, mut store) in stores() {
        for serial in ["A", "B", "C"] {
            store.create(draft(serial), "x.png").expect("create");
        }
        for id in [3, 1, 2] {
            store.delete(id).expect("delete");
        }
        assert_eq!(store.count().expect("count"), 0, "{name}");
        assert_eq!(store.create(draft("Z"), "z.png").expect("z").id, 1, "{name}");
    }
}

#[test]
fn blank_fields_are_rejected_without_writing() {
    for (name, mut store) in stores() {
        store.create(draft("A"), "a.png").expect("create");

        let cases = [
            (RecordDraft::new("  ", "1", "U"), "serial_number"),
            (RecordDraft::new("S", "", "U"), "verification_code"),
            (RecordDraft::new("S", "1", "\t"), "dev_uid"),
        ];
        for (bad, field) in cases {
            match store.create(bad, "bad.png") {
                Err(StoreError::Validation(err)) => assert_eq!(err.field, field, "{name}"),
                other => panic!("{name}: expected validation error, got {other:?}"),
            }
        }
        assert_eq!(store.count().expect("count"), 1, "{name}");
    }
}

#[test]
fn blank_device_name_is_stored_as_none() {
    for (name, mut store) in stores() {
        let rec = store
            .create(draft("A").with_device_name("   "), "a.png")
            .expect("create");
        assert_eq!(rec.device_name, None, "{name}");

        let named = store
            .create(draft("B").with_device_name("Gate"), "b.png")
            .expect("create");
        let fetched = store.get(named.id).expect("get").expect("present");
        assert_eq!(fetched.device_name.as_deref(), Some("Gate"), "{name}");
    }
}

#[test]
fn get_returns_the_created_record() {
    for (name, mut store) in stores() {
        let created = store
            .create(sample_draft(&mut rand::rng()), "s.png")
            .expect("create");
        let fetched = store.get(created.id).expect("get").expect("present");
        assert_eq!(fetched, created, "{name}");
        assert!(store.get(99).expect("get").is_none(), "{name}");
    }
}

#[test]
fn list_orders_by_creation_and_honors_limit() {
    for (name, mut store) in stores() {
        for serial in ["A", "B", "C", "D"] {
            store.create(draft(serial), "x.png").expect("create");
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        store.delete(2).expect("delete");
        // Reuses id 2 but is the newest record.
        store.create(draft("E"), "x.png").expect("create");

        let newest: Vec<String> = store
            .list(SortOrder::NewestFirst, Some(3))
            .expect("list")
            .into_iter()
            .map(|r| r.serial_number)
            .collect();
        assert_eq!(newest, ["E", "D", "C"], "{name}");

        let oldest: Vec<i64> = store
            .list(SortOrder::OldestFirst, None)
            .expect("list")
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(oldest, [1, 3, 4, 2], "{name}");
    }
}

#[test]
fn delete_missing_id_is_not_found() {
    for (name, mut store) in stores() {
        match store.delete(7) {
            Err(StoreError::NotFound(7)) => {}
            other => panic!("{name}: expected NotFound, got {other:?}"),
        }
    }
}

#[test]
fn delete_removes_image_file() {
    let tmp = TempDir::new().expect("tmp");
    for (name, mut store) in stores() {
        let image = tmp.path().join(format!("{name}.png"));
        fs::write(&image, b"png").expect("write image");

        let rec = store
            .create(draft("A"), image.to_str().expect("utf8 path"))
            .expect("create");
        let deleted = store.delete(rec.id).expect("delete");
        assert!(deleted.image_removed, "{name}");
        assert!(!image.exists(), "{name}");
        assert!(store.get(rec.id).expect("get").is_none(), "{name}");
    }
}

#[test]
fn delete_succeeds_when_image_cannot_be_removed() {
    let tmp = TempDir::new().expect("tmp");
    for (name, mut store) in stores() {
        // A directory cannot be removed with remove_file.
        let dir = tmp.path().join(format!("{name}_dir"));
        fs::create_dir(&dir).expect("mkdir");

        let rec = store
            .create(draft("A"), dir.to_str().expect("utf8 path"))
            .expect("create");
        let deleted = store.delete(rec.id).expect("delete");
        assert!(!deleted.image_removed, "{name}");
        assert_eq!(store.count().expect("count"), 0, "{name}");
    }
}

#[test]
fn delete_of_already_missing_image_counts_as_removed() {
    for (name, mut store) in stores() {
        let rec = store
            .create(draft("A"), "does/not/exist.png")
            .expect("create");
        assert!(store.delete(rec.id).expect("delete").image_removed, "{name}");
    }
}

#[test]
fn sqlite_store_persists_across_reopen() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("nested").join("qr_codes.db");

    let created = {
        let mut store = SqliteRecordStore::open(&db_path).expect("open");
        store.create(draft("A"), "a.png").expect("a");
        let b = store.create(draft("B"), "b.png").expect("b");
        store.delete(1).expect("delete");
        store.close().expect("close");
        b
    };

    let mut store = SqliteRecordStore::open(&db_path).expect("reopen");
    assert_eq!(store.get(created.id).expect("get"), Some(created));
    assert_eq!(store.create(draft("C"), "c.png").expect("c").id, 1);
}

#[test]
fn seeded_memory_store_keeps_ids_and_fills_gaps() {
    let mut source = MemoryRecordStore::new();
    for serial in ["A", "B", "C"] {
        source.create(draft(serial), "x.png").expect("create");
    }
    source.delete(2).expect("delete");
    let records = source.list(SortOrder::OldestFirst, None).expect("list");

    let mut store = MemoryRecordStore::from_records(records);
    assert_eq!(store.ids(), [1, 3]);
    assert_eq!(store.create(draft("D"), "d.png").expect("d").id, 2);
}
