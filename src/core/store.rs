use chrono::NaiveDateTime;
use hashbrown::HashMap;

use crate::{
    core::slots::lowest_free_slot,
    persist::{DeletedRecord, RecordStore, StoreError, StoreResult, remove_image_best_effort},
    record::{QrRecord, RecordDraft, now_utc},
    types::{RecordId, SortOrder},
};

/// [`RecordStore`] kept entirely in memory.
///
/// Records are listed in insertion order, which matches `created_at` order
/// for a single process.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: HashMap<RecordId, QrRecord>,
    order: Vec<RecordId>,
}

impl MemoryRecordStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with existing records, keeping their ids.
    pub fn from_records(records: impl IntoIterator<Item = QrRecord>) -> Self {
        let mut store = Self::new();
        let mut records: Vec<QrRecord> = records.into_iter().collect();
        records.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        for rec in records {
            store.order.push(rec.id);
            store.records.insert(rec.id, rec);
        }
        store
    }

    /// Live ids in ascending order.
    pub fn ids(&self) -> Vec<RecordId> {
        let mut ids: Vec<RecordId> = self.records.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn insert_at(&mut self, draft: RecordDraft, qr_filename: &str, now: NaiveDateTime) -> QrRecord {
        let id = lowest_free_slot(self.ids());
        let rec = draft.into_record(id, qr_filename.to_string(), now);
        self.order.push(id);
        self.records.insert(id, rec.clone());
        rec
    }
}

impl RecordStore for MemoryRecordStore {
    fn create(&mut self, draft: RecordDraft, qr_filename: &str) -> StoreResult<QrRecord> {
        draft.validate()?;
        Ok(self.insert_at(draft, qr_filename, now_utc()))
    }

    fn list(&self, order: SortOrder, limit: Option<usize>) -> StoreResult<Vec<QrRecord>> {
        let limit = limit.unwrap_or(usize::MAX);
        let ids: Box<dyn Iterator<Item = &RecordId>> = match order {
            SortOrder::OldestFirst => Box::new(self.order.iter()),
            SortOrder::NewestFirst => Box::new(self.order.iter().rev()),
        };
        Ok(ids
            .filter_map(|id| self.records.get(id).cloned())
            .take(limit)
            .collect())
    }

    fn get(&self, id: RecordId) -> StoreResult<Option<QrRecord>> {
        Ok(self.records.get(&id).cloned())
    }

    fn delete(&mut self, id: RecordId) -> StoreResult<DeletedRecord> {
        let Some(rec) = self.records.get(&id) else {
            return Err(StoreError::NotFound(id));
        };
        let image_removed = remove_image_best_effort(&rec.qr_filename);

        let rec = self.records.remove(&id).ok_or(StoreError::NotFound(id))?;
        if let Some(pos) = self.order.iter().position(|x| *x == id) {
            self.order.remove(pos);
        }
        Ok(DeletedRecord {
            record: rec,
            image_removed,
        })
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.records.len())
    }
}
