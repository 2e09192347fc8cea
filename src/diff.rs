use crate::leases::LeaseRecord;
use crate::store::Snapshot;

/// Records of `current` that have no exact-value counterpart in `previous`.
///
/// Both active sets are copied into working vectors and matched pairwise:
/// every record of `previous` removes at most one identical record from
/// the `current` copy, and whatever survives is returned, sorted by
/// address. Matching is on full record value, so a renewed lease (same
/// address, new end time) shows up as changed.
///
/// Known limitation, kept on purpose: leases present only in `previous`
/// (expired or released since the last cycle) are not reported, because
/// only the remainder of `current` is returned. Consumers of the event
/// stream rely on this one-sided shape.
pub fn changed_leases(previous: &Snapshot, current: &Snapshot) -> Vec<LeaseRecord> {
    let mut remaining: Vec<LeaseRecord> = current.leases.values().cloned().collect();
    for record in previous.leases.values() {
        if let Some(position) = remaining.iter().position(|candidate| candidate == record) {
            remaining.remove(position);
        }
    }
    remaining.sort_by_key(|record| record.ip);
    remaining
}
