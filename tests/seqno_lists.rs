use throughline::{walk_through_seqno, SeqnoList, SeqnoSnapshots};

#[test]
fn insert_keeps_the_list_sorted() {
    let mut list = SeqnoList::new();
    for seqno in [5, 1, 9, 3, 7] {
        assert!(list.insert(seqno));
    }
    assert_eq!(list.as_slice(), &[1, 3, 5, 7, 9]);
    assert_eq!(list.max_seqno(), 9);
    assert_eq!(list.first(), Some(1));
}

#[test]
fn insert_rejects_duplicates() {
    let mut list = SeqnoList::new();
    assert!(list.insert(4));
    assert!(!list.insert(4));
    assert_eq!(list.len(), 1);
}

#[test]
fn push_ordered_accepts_only_strictly_ascending_seqnos() {
    let mut list = SeqnoList::new();
    assert!(list.push_ordered(1));
    assert!(list.push_ordered(2));
    assert!(!list.push_ordered(2));
    assert!(!list.push_ordered(1));
    assert_eq!(list.as_slice(), &[1, 2]);
}

#[test]
fn truncate_through_drops_the_accounted_prefix() {
    let mut list: SeqnoList = [2, 4, 6, 8].into_iter().collect();

    // Watermark present in the list: dropped along with the prefix.
    list.truncate_through(4);
    assert_eq!(list.as_slice(), &[6, 8]);

    // Watermark absent: only the strictly-smaller prefix goes.
    list.truncate_through(7);
    assert_eq!(list.as_slice(), &[8]);

    list.truncate_through(100);
    assert!(list.is_empty());
    assert_eq!(list.max_seqno(), 0);
}

#[test]
fn contains_uses_the_sorted_order() {
    let list: SeqnoList = [10, 20, 30].into_iter().collect();
    assert!(list.contains(20));
    assert!(!list.contains(25));
}

fn snapshots(
    sent: &[u64],
    filtered: &[u64],
    failed_cr: &[u64],
    gap: &[u64],
) -> SeqnoSnapshots {
    SeqnoSnapshots {
        sent: sent.iter().copied().collect(),
        filtered: filtered.iter().copied().collect(),
        failed_cr: failed_cr.iter().copied().collect(),
        gap: gap.iter().copied().collect(),
    }
}

#[test]
fn walk_stops_at_the_first_unaccounted_seqno() {
    let snaps = snapshots(&[1, 2, 4], &[], &[], &[]);
    assert_eq!(walk_through_seqno(0, &snaps), Some(2));
}

#[test]
fn walk_unions_all_three_concrete_lists() {
    let snaps = snapshots(&[1, 4], &[2], &[3], &[]);
    assert_eq!(walk_through_seqno(0, &snaps), Some(4));
}

#[test]
fn walk_crosses_gaps_but_never_rests_on_one() {
    let snaps = snapshots(&[1, 5], &[], &[], &[2, 3, 4]);
    assert_eq!(walk_through_seqno(0, &snaps), Some(5));

    // A trailing gap does not move the candidate past the last concrete hit.
    let snaps = snapshots(&[1], &[], &[], &[2, 3]);
    assert_eq!(walk_through_seqno(0, &snaps), Some(1));
}

#[test]
fn walk_over_gap_only_state_reports_no_candidate() {
    let snaps = snapshots(&[], &[], &[], &[1, 2, 3]);
    assert_eq!(walk_through_seqno(0, &snaps), None);
}

#[test]
fn walk_from_a_nonzero_watermark_ignores_the_past() {
    let snaps = snapshots(&[101, 102], &[], &[], &[]);
    assert_eq!(walk_through_seqno(100, &snaps), Some(102));
    assert_eq!(walk_through_seqno(102, &snaps), None);
}

#[test]
fn walk_with_empty_snapshots_reports_no_candidate() {
    let snaps = snapshots(&[], &[], &[], &[]);
    assert_eq!(walk_through_seqno(0, &snaps), None);
}

#[test]
fn walk_ignores_lists_whose_minimum_is_ahead() {
    let snaps = snapshots(&[5, 6], &[9], &[], &[]);
    assert_eq!(walk_through_seqno(0, &snaps), None);
}
