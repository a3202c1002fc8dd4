use crate::store::IndexEntry;
use crate::tile::GroupKey;
use std::collections::BTreeMap;

/// Pick the current version within one group and flag the rest as
/// superseded. Newest mtime wins; on a tie the lexicographically greatest
/// file name wins so the outcome is deterministic across refreshes.
///
/// Returns the winning file name, or `None` when the group has no members.
pub fn resolve_group(
    entries: &mut BTreeMap<String, IndexEntry>,
    group: &GroupKey,
) -> Option<String> {
    let winner = entries
        .values()
        .filter(|e| &e.group_key == group)
        .max_by(|a, b| {
            a.mtime_ms
                .cmp(&b.mtime_ms)
                .then_with(|| a.file_name.cmp(&b.file_name))
        })
        .map(|e| e.file_name.clone());

    for entry in entries.values_mut().filter(|e| &e.group_key == group) {
        entry.is_current = winner.as_deref() == Some(entry.file_name.as_str());
    }
    winner
}
