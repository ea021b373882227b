//! Frontier search between mirrored and unmirrored versions
//!
//! Mirroring always proceeds oldest-first without skipping, so the mirrored
//! versions of a variant form a prefix of its sorted upstream list. Finding
//! the work left is then a search for the first index whose full tag is
//! missing on the destination, which costs `O(log N)` existence checks
//! instead of one per version.

use std::future::Future;

use tracing::info;

use crate::version::record::VersionRecord;
use crate::version::tags::full_tag;

/// Where the mirrored prefix ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frontier {
    /// Index of the first unmirrored version (`len` when all are mirrored)
    pub boundary: usize,
    /// Existence checks spent finding the boundary
    pub probes: usize,
}

/// Per-version verdict derived from a [`Frontier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorDecision {
    pub version: VersionRecord,
    pub already_mirrored: bool,
}

impl Frontier {
    /// Frontier that treats every version as unmirrored, without probing
    pub fn everything_unmirrored() -> Self {
        Self {
            boundary: 0,
            probes: 0,
        }
    }

    /// One decision per version; the prefix before `boundary` is mirrored
    pub fn decisions(&self, versions: &[VersionRecord]) -> Vec<MirrorDecision> {
        versions
            .iter()
            .enumerate()
            .map(|(i, version)| MirrorDecision {
                version: version.clone(),
                already_mirrored: i < self.boundary,
            })
            .collect()
    }
}

/// Find the first version of `variant` whose full tag is not on the destination.
///
/// Precondition: `versions` is sorted ascending and mirrored versions form a
/// prefix of it (if a version is mirrored, every older one is too). The
/// precondition is not checked; if someone deleted a tag out of order the
/// result may skip that gap, which the idempotent copy heals on a later run.
///
/// Probes `versions[0]` and `versions[len - 1]` first so that fully
/// unmirrored and fully mirrored lists cost at most two checks; otherwise
/// bisects between the two confirmed ends. At most `ceil(log2(N)) + 2`
/// probes are made.
pub async fn find_frontier<F, Fut, E>(
    variant: &str,
    versions: &[VersionRecord],
    mut exists: F,
) -> Result<Frontier, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let len = versions.len();
    let mut probes = 0;

    let mut probe = |index: usize| {
        probes += 1;
        exists(full_tag(variant, &versions[index]))
    };

    let boundary = if len == 0 {
        0
    } else if !probe(0).await? {
        0
    } else if len == 1 {
        1
    } else if probe(len - 1).await? {
        len
    } else {
        // versions[lo] is mirrored, versions[hi] is not
        let mut lo = 0;
        let mut hi = len - 1;
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if probe(mid).await? {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        hi
    };

    info!(
        variant,
        probes,
        boundary,
        total = len,
        "Found mirror frontier for {}: {} of {} versions unmirrored",
        variant,
        len - boundary,
        len
    );

    Ok(Frontier { boundary, probes })
}
