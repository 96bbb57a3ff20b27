use std::sync::Arc;

use zoek_core::models::record::RepositoryRecord;
use zoek_core::models::sync_state::{LocalCloneState, OversizedExisting, SyncDecision};

/// Decide what to do with one repository.
///
/// Precedence:
/// 1. an existing clone is pulled (unless it is oversized and the policy
///    is [`OversizedExisting::Skip`]),
/// 2. a size above `max_size` skips it,
/// 3. a missing clone URL or unusable name skips it,
/// 4. anything else is cloned.
pub fn plan(
    record: Arc<RepositoryRecord>,
    state: LocalCloneState,
    max_size: Option<u64>,
    oversized_existing: OversizedExisting,
) -> SyncDecision {
    let too_big = record.exceeds(max_size);

    if state == LocalCloneState::PresentClean
        && (!too_big || oversized_existing == OversizedExisting::Pull)
    {
        return SyncDecision::PullExisting(record);
    }
    if too_big {
        return SyncDecision::SkipTooBig(record);
    }
    if record.clone_url().is_none() || record.dir_name().is_none() {
        return SyncDecision::SkipNoUrl(record);
    }
    SyncDecision::CloneNew(record)
}
