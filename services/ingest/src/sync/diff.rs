use std::collections::HashSet;

/// Remote ids with no active local record, in remote order and without duplicates.
pub fn new_ids(remote_ids: &[i64], local_active_ids: &[i64]) -> Vec<i64> {
    let known: HashSet<i64> = local_active_ids.iter().copied().collect();
    let mut emitted = HashSet::new();

    remote_ids
        .iter()
        .copied()
        .filter(|id| !known.contains(id) && emitted.insert(*id))
        .collect()
}
