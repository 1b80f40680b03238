use crate::DomainCount;
use std::collections::HashMap;

/// Builds the ordered result from the final aggregate state.
///
/// Entries are sorted ascending by the byte-wise order of the domain. Keys of
/// a map are unique, so the output has no duplicate domains and identical
/// input maps always yield identical output.
pub fn finalize(counts: HashMap<String, u64>) -> Vec<DomainCount> {
    let mut out: Vec<DomainCount> = counts
        .into_iter()
        .map(|(domain, number_of_users)| DomainCount {
            domain,
            number_of_users,
        })
        .collect();
    out.sort_unstable_by(|a, b| a.domain.as_bytes().cmp(b.domain.as_bytes()));
    out
}
