use super::list::SeqnoList;

/// Point-in-time copies of one vbucket's four disposition lists.
///
/// Snapshots are taken under brief shared locks so the walk itself runs
/// without holding any list lock.
#[derive(Debug, Clone, Default)]
pub struct SeqnoSnapshots {
    pub sent: SeqnoList,
    pub filtered: SeqnoList,
    pub failed_cr: SeqnoList,
    pub gap: SeqnoList,
}

/// Walks forward from `from`, probing each successor seqno against the
/// snapshots.
///
/// Starting at `iter = from + 1`, a hit in the sent, filtered, or failed-CR
/// list makes `iter` the new candidate; a hit found only in the gap list lets
/// the walk pass through without updating the candidate, so the watermark can
/// cross a gap but never rest on one. The walk stops at the first seqno found
/// in none of the lists and returns the final candidate, or `None` when no
/// concretely-accounted successor exists.
pub fn walk_through_seqno(from: u64, snapshots: &SeqnoSnapshots) -> Option<u64> {
    let max_sent = snapshots.sent.max_seqno();
    let max_filtered = snapshots.filtered.max_seqno();
    let max_failed_cr = snapshots.failed_cr.max_seqno();
    let max_gap = snapshots.gap.max_seqno();

    let mut candidate = None;
    let mut iter_seqno = from;
    loop {
        iter_seqno += 1;

        if iter_seqno <= max_sent && snapshots.sent.contains(iter_seqno) {
            candidate = Some(iter_seqno);
            continue;
        }
        if iter_seqno <= max_filtered && snapshots.filtered.contains(iter_seqno) {
            candidate = Some(iter_seqno);
            continue;
        }
        if iter_seqno <= max_failed_cr && snapshots.failed_cr.contains(iter_seqno) {
            candidate = Some(iter_seqno);
            continue;
        }
        if iter_seqno <= max_gap && snapshots.gap.contains(iter_seqno) {
            continue;
        }

        break;
    }
    candidate
}
