use std::collections::BTreeSet;

use proptest::prelude::*;

use qrlog::{
    core::{slots::lowest_free_slot, store::MemoryRecordStore},
    persist::{RecordStore, sqlite::SqliteRecordStore},
    record::RecordDraft,
    types::{RecordId, SortOrder},
};

#[derive(Debug, Clone)]
enum Action {
    Create { serial: u16 },
    Delete { target: u8 },
    DeleteMissing { id: u16 },
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => (0u16..10_000).prop_map(|serial| Action::Create { serial }),
        2 => (0u8..64).prop_map(|target| Action::Delete { target }),
        1 => (500u16..1_000).prop_map(|id| Action::DeleteMissing { id }),
    ]
}

fn draft_from(serial: u16) -> RecordDraft {
    RecordDraft::new(format!("SN{serial:05}"), "000111", "00112233AABBCCDD")
}

fn expected_next(model: &BTreeSet<RecordId>) -> RecordId {
    (1..).find(|id| !model.contains(id)).unwrap_or(1)
}

fn check_sequence(store: &mut dyn RecordStore, actions: Vec<Action>) -> Result<(), TestCaseError> {
    let mut model = BTreeSet::<RecordId>::new();

    for action in actions {
        match action {
            Action::Create { serial } => {
                let want = expected_next(&model);
                let rec = store
                    .create(draft_from(serial), &format!("absent/{serial}.png"))
                    .map_err(|err| TestCaseError::fail(format!("create failed: {err}")))?;
                prop_assert_eq!(rec.id, want);
                model.insert(rec.id);
            }
            Action::Delete { target } => {
                if model.is_empty() {
                    continue;
                }
                let ids: Vec<RecordId> = model.iter().copied().collect();
                let id = ids[usize::from(target) % ids.len()];
                let deleted = store
                    .delete(id)
                    .map_err(|err| TestCaseError::fail(format!("delete failed: {err}")))?;
                prop_assert_eq!(deleted.record.id, id);
                model.remove(&id);
            }
            Action::DeleteMissing { id } => {
                let id = RecordId::from(id);
                if model.contains(&id) {
                    continue;
                }
                prop_assert!(store.delete(id).is_err());
            }
        }

        let count = store
            .count()
            .map_err(|err| TestCaseError::fail(format!("count failed: {err}")))?;
        prop_assert_eq!(count, model.len());
    }

    let mut listed: Vec<RecordId> = store
        .list(SortOrder::OldestFirst, None)
        .map_err(|err| TestCaseError::fail(format!("list failed: {err}")))?
        .into_iter()
        .map(|rec| rec.id)
        .collect();
    listed.sort_unstable();
    prop_assert_eq!(listed, model.into_iter().collect::<Vec<_>>());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn memory_store_assigns_lowest_free_slot(actions in prop::collection::vec(action_strategy(), 1..120)) {
        let mut store = MemoryRecordStore::new();
        check_sequence(&mut store, actions)?;
    }

    #[test]
    fn sqlite_store_assigns_lowest_free_slot(actions in prop::collection::vec(action_strategy(), 1..120)) {
        let mut store = SqliteRecordStore::open_in_memory().expect("open sqlite");
        check_sequence(&mut store, actions)?;
    }

    #[test]
    fn lowest_free_slot_matches_linear_search(ids in prop::collection::btree_set(1i64..200, 0..120)) {
        prop_assert_eq!(lowest_free_slot(ids.iter().copied()), expected_next(&ids));
    }
}
