use crate::types::EligibleRequest;
use std::collections::HashSet;

/// Keeps the first request per wallet in selection order.
///
/// Returns `(selected, skipped)`. Skipped requests stay untouched in the store
/// and become selectable again once their wallet's lock is cleared.
pub fn dedup_by_wallet(
    requests: Vec<EligibleRequest>,
) -> (Vec<EligibleRequest>, Vec<EligibleRequest>) {
    let mut seen = HashSet::new();
    requests
        .into_iter()
        .partition(|r| seen.insert(r.wallet.id))
}
