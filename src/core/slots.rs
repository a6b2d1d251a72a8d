use crate::types::RecordId;

/// Returns the smallest positive id absent from `ascending_ids`.
///
/// The input must be sorted ascending. An empty input yields `1`; a dense
/// input `1..=n` yields `n + 1`; otherwise the first gap is reused.
pub fn lowest_free_slot<I>(ascending_ids: I) -> RecordId
where
    I: IntoIterator<Item = RecordId>,
{
    let mut candidate: RecordId = 1;
    for id in ascending_ids {
        if id < candidate {
            continue;
        }
        if id > candidate {
            break;
        }
        candidate += 1;
    }
    candidate
}
