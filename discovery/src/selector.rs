use crate::types::PhotoCandidate;

/// Picks the candidate with the largest size.
///
/// On ties the earliest candidate wins, so the result only depends on the
/// order the photo source listed the photos in. Returns `None` for an empty slice.
pub fn select_largest(candidates: &[PhotoCandidate]) -> Option<&PhotoCandidate> {
    let mut iter = candidates.iter();
    let mut best = iter.next()?;
    for candidate in iter {
        if candidate.size > best.size {
            best = candidate;
        }
    }
    Some(best)
}
