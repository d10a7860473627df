use std::collections::HashMap;
use std::sync::RwLock;
use std::thread;
use thiserror::Error;

use super::list::SeqnoList;
use super::resolve::{walk_through_seqno, SeqnoSnapshots};
use crate::checkpoint::record::CheckpointRecord;
use crate::observability::logging::PipelineLog;

/// Default number of vbuckets resolved per batch worker.
pub const DEFAULT_VBUCKETS_PER_WORKER: usize = 20;
/// Default cap on gap entries materialized by the first event on a fresh vbucket.
pub const DEFAULT_GAP_BACKFILL_LIMIT: u64 = 10_000;

/// Tuning knobs for the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    vbuckets_per_worker: usize,
    gap_backfill_limit: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            vbuckets_per_worker: DEFAULT_VBUCKETS_PER_WORKER,
            gap_backfill_limit: DEFAULT_GAP_BACKFILL_LIMIT,
        }
    }
}

impl TrackerConfig {
    /// Creates a config with explicit worker chunk size and backfill cap.
    pub fn new(vbuckets_per_worker: usize, gap_backfill_limit: u64) -> Self {
        Self {
            vbuckets_per_worker: vbuckets_per_worker.max(1),
            gap_backfill_limit,
        }
    }

    /// Vbuckets resolved per batch worker.
    pub fn vbuckets_per_worker(&self) -> usize {
        self.vbuckets_per_worker
    }

    /// Largest initial gap interval the detector will materialize entry by entry.
    pub fn gap_backfill_limit(&self) -> u64 {
        self.gap_backfill_limit
    }
}

/// Fatal accounting faults raised by the tracker.
///
/// None of these are retryable at this layer; the pipeline supervisor decides
/// whether to restart the whole replication.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("event names vbucket {vbucket}, which this pipeline does not track")]
    UnknownVBucket { vbucket: u16 },
    #[error("sent seqno {seqno} for vbucket {vbucket} was already acknowledged")]
    DuplicateSent { vbucket: u16, seqno: u64 },
    #[error("seqno {seqno} breaks the ascending order of the {list} list for vbucket {vbucket}")]
    ListOrderBroken {
        vbucket: u16,
        seqno: u64,
        list: &'static str,
    },
    #[error("through seqno {seqno} for vbucket {vbucket} rests on a proven gap")]
    GapViolation { vbucket: u16, seqno: u64 },
}

/// Replication events consumed by the tracker's sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationEvent {
    /// The change stream produced `seqno` on `vbucket`.
    Received { vbucket: u16, seqno: u64 },
    /// The target acknowledged `seqno` on `vbucket`.
    Sent { vbucket: u16, seqno: u64 },
    /// The router dropped `seqno` on `vbucket`.
    Filtered { vbucket: u16, seqno: u64 },
    /// Source-side conflict resolution rejected `seqno` on `vbucket`.
    FailedCr { vbucket: u16, seqno: u64 },
}

#[derive(Debug, Default)]
struct VbSeqnoState {
    through_seqno: RwLock<u64>,
    sent: RwLock<SeqnoList>,
    filtered: RwLock<SeqnoList>,
    failed_cr: RwLock<SeqnoList>,
    gap: RwLock<SeqnoList>,
    last_seen_seqno: RwLock<u64>,
}

/// Per-vbucket through-seqno accounting for one replication pipeline.
///
/// Each vbucket carries six independently locked fields; different vbuckets
/// never contend. Within a vbucket the resolver takes `through_seqno` before
/// any list lock, and the gap detector takes `last_seen_seqno` before the gap
/// list (with a brief probe of `through_seqno`); no other lock pairings exist.
pub struct ThroughSeqnoTracker {
    vb_list: Vec<u16>,
    vbs: HashMap<u16, VbSeqnoState>,
    config: TrackerConfig,
    log: PipelineLog,
}

impl ThroughSeqnoTracker {
    /// Creates a tracker for the pipeline's fixed vbucket assignment.
    pub fn new(vb_list: impl IntoIterator<Item = u16>, log: PipelineLog) -> Self {
        Self::with_config(vb_list, log, TrackerConfig::default())
    }

    /// Creates a tracker with explicit tuning knobs.
    pub fn with_config(
        vb_list: impl IntoIterator<Item = u16>,
        log: PipelineLog,
        config: TrackerConfig,
    ) -> Self {
        let mut vb_list: Vec<u16> = vb_list.into_iter().collect();
        vb_list.sort_unstable();
        vb_list.dedup();
        let vbs = vb_list
            .iter()
            .map(|&vbucket| (vbucket, VbSeqnoState::default()))
            .collect();
        log.info(&format!(
            "through seqno tracker attached, tracking {} vbuckets",
            vb_list.len()
        ));
        Self {
            vb_list,
            vbs,
            config,
            log,
        }
    }

    /// The tracked vbuckets, ascending.
    pub fn vb_list(&self) -> &[u16] {
        &self.vb_list
    }

    /// Whether `vbucket` belongs to this pipeline.
    pub fn is_tracked(&self, vbucket: u16) -> bool {
        self.vbs.contains_key(&vbucket)
    }

    fn vb(&self, vbucket: u16) -> Result<&VbSeqnoState, TrackerError> {
        self.vbs
            .get(&vbucket)
            .ok_or(TrackerError::UnknownVBucket { vbucket })
    }

    /// Dispatches one replication event to the matching handler.
    pub fn handle_event(&self, event: ReplicationEvent) -> Result<(), TrackerError> {
        match event {
            ReplicationEvent::Received { vbucket, seqno } => {
                self.process_gap_seqnos(vbucket, seqno)
            }
            ReplicationEvent::Sent { vbucket, seqno } => self.add_sent_seqno(vbucket, seqno),
            ReplicationEvent::Filtered { vbucket, seqno } => {
                self.add_filtered_seqno(vbucket, seqno)
            }
            ReplicationEvent::FailedCr { vbucket, seqno } => {
                self.add_failed_cr_seqno(vbucket, seqno)
            }
        }
    }

    /// Records a target acknowledgment.
    ///
    /// Acks arrive out of order relative to issuance, so the seqno is placed
    /// by binary search. A collision means the upstream ack accounting is
    /// broken and must not be absorbed.
    pub fn add_sent_seqno(&self, vbucket: u16, seqno: u64) -> Result<(), TrackerError> {
        let state = self.vb(vbucket)?;
        {
            let mut sent = state.sent.write().unwrap();
            if !sent.insert(seqno) {
                return Err(TrackerError::DuplicateSent { vbucket, seqno });
            }
        }
        self.log
            .debug(vbucket, &format!("sent seqno {seqno} acknowledged"));
        Ok(())
    }

    /// Records a seqno the router dropped.
    pub fn add_filtered_seqno(&self, vbucket: u16, seqno: u64) -> Result<(), TrackerError> {
        let state = self.vb(vbucket)?;
        self.append_in_order(vbucket, seqno, &state.filtered, "filtered")
    }

    /// Records a seqno rejected by source-side conflict resolution.
    pub fn add_failed_cr_seqno(&self, vbucket: u16, seqno: u64) -> Result<(), TrackerError> {
        let state = self.vb(vbucket)?;
        self.append_in_order(vbucket, seqno, &state.failed_cr, "failed-cr")
    }

    fn append_in_order(
        &self,
        vbucket: u16,
        seqno: u64,
        lock: &RwLock<SeqnoList>,
        list: &'static str,
    ) -> Result<(), TrackerError> {
        {
            let mut guard = lock.write().unwrap();
            if !guard.push_ordered(seqno) {
                return Err(TrackerError::ListOrderBroken {
                    vbucket,
                    seqno,
                    list,
                });
            }
        }
        self.log
            .debug(vbucket, &format!("{list} seqno {seqno} recorded"));
        Ok(())
    }

    /// Gap detector: reconciles a received seqno against the last one seen on
    /// the change stream and materializes the missing interval.
    pub fn process_gap_seqnos(&self, vbucket: u16, current_seqno: u64) -> Result<(), TrackerError> {
        let state = self.vb(vbucket)?;
        let mut last_seen = state.last_seen_seqno.write().unwrap();
        let previous = *last_seen;
        let mut baseline = previous;
        if baseline == 0 {
            // Resume-from-checkpoint: the stream restarts at checkpoint+1 and
            // everything at or below the watermark is already accounted for.
            baseline = *state.through_seqno.read().unwrap();
        }

        if previous == 0
            && baseline == 0
            && current_seqno > self.config.gap_backfill_limit.saturating_add(1)
        {
            // First event on a completely fresh vbucket landing far above 1:
            // reseed at the event instead of materializing the backfill.
            *state.through_seqno.write().unwrap() = current_seqno - 1;
            *last_seen = current_seqno;
            self.log.debug(
                vbucket,
                &format!("first received seqno {current_seqno} reseeds the watermark"),
            );
            return Ok(());
        }

        *last_seen = current_seqno;
        if baseline + 1 < current_seqno {
            let mut gap = state.gap.write().unwrap();
            for missing in (baseline + 1)..current_seqno {
                if !gap.push_ordered(missing) {
                    return Err(TrackerError::ListOrderBroken {
                        vbucket,
                        seqno: missing,
                        list: "gap",
                    });
                }
            }
        }
        Ok(())
    }

    /// Advances and returns the through seqno for one vbucket.
    ///
    /// Holds the `through_seqno` lock exclusively for the whole resolution so
    /// concurrent resolutions for the same vbucket cannot interleave with
    /// truncation.
    pub fn get_through_seqno(&self, vbucket: u16) -> Result<u64, TrackerError> {
        let state = self.vb(vbucket)?;
        let mut through = state.through_seqno.write().unwrap();

        let snapshots = SeqnoSnapshots {
            sent: state.sent.read().unwrap().clone(),
            filtered: state.filtered.read().unwrap().clone(),
            failed_cr: state.failed_cr.read().unwrap().clone(),
            gap: state.gap.read().unwrap().clone(),
        };

        if let Some(candidate) = walk_through_seqno(*through, &snapshots) {
            *through = candidate;
            self.truncate_seqno_lists(state, vbucket, candidate)?;
            self.log
                .debug(vbucket, &format!("through seqno advanced to {candidate}"));
        }
        Ok(*through)
    }

    fn truncate_seqno_lists(
        &self,
        state: &VbSeqnoState,
        vbucket: u16,
        through_seqno: u64,
    ) -> Result<(), TrackerError> {
        state.sent.write().unwrap().truncate_through(through_seqno);
        state
            .filtered
            .write()
            .unwrap()
            .truncate_through(through_seqno);
        state
            .failed_cr
            .write()
            .unwrap()
            .truncate_through(through_seqno);

        let mut gap = state.gap.write().unwrap();
        if gap.contains(through_seqno) {
            return Err(TrackerError::GapViolation {
                vbucket,
                seqno: through_seqno,
            });
        }
        gap.truncate_through(through_seqno);
        Ok(())
    }

    /// Resolves through seqnos for every tracked vbucket, chunked across
    /// scoped worker threads.
    pub fn get_through_seqnos(&self) -> Result<HashMap<u16, u64>, TrackerError> {
        let chunk_results = thread::scope(|scope| {
            let handles: Vec<_> = self
                .vb_list
                .chunks(self.config.vbuckets_per_worker())
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|&vbucket| {
                                self.get_through_seqno(vbucket).map(|seqno| (vbucket, seqno))
                            })
                            .collect::<Result<Vec<_>, TrackerError>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("through-seqno worker panicked"))
                .collect::<Result<Vec<_>, TrackerError>>()
        })?;

        let mut result = HashMap::with_capacity(self.vb_list.len());
        for chunk in chunk_results {
            result.extend(chunk);
        }
        Ok(result)
    }

    /// Seeds starting through seqnos, one exclusive write per vbucket.
    ///
    /// Intended to run once at pipeline startup, before any events reach the
    /// sink. Later calls declare a new pipeline epoch; monotonicity is not
    /// enforced on seeding.
    pub fn set_start_seqnos(&self, start_seqnos: &HashMap<u16, u64>) -> Result<(), TrackerError> {
        for (&vbucket, &seqno) in start_seqnos {
            let state = self.vb(vbucket)?;
            *state.through_seqno.write().unwrap() = seqno;
        }
        self.log.info(&format!(
            "seeded start seqnos for {} vbuckets",
            start_seqnos.len()
        ));
        Ok(())
    }

    /// Seeds starting through seqnos from previously persisted checkpoint
    /// records.
    pub fn seed_from_checkpoints(
        &self,
        checkpoints: &HashMap<u16, CheckpointRecord>,
    ) -> Result<(), TrackerError> {
        let starts = checkpoints
            .iter()
            .map(|(&vbucket, record)| (vbucket, record.seqno))
            .collect();
        self.set_start_seqnos(&starts)
    }

    /// Current watermark without resolving.
    pub fn current_through_seqno(&self, vbucket: u16) -> Result<u64, TrackerError> {
        Ok(*self.vb(vbucket)?.through_seqno.read().unwrap())
    }

    /// Largest seqno observed on the change stream so far (0 until the first
    /// event).
    pub fn last_seen_seqno(&self, vbucket: u16) -> Result<u64, TrackerError> {
        Ok(*self.vb(vbucket)?.last_seen_seqno.read().unwrap())
    }

    /// Copy of the pending sent seqnos, ascending.
    pub fn sent_seqnos(&self, vbucket: u16) -> Result<Vec<u64>, TrackerError> {
        Ok(self.vb(vbucket)?.sent.read().unwrap().as_slice().to_vec())
    }

    /// Copy of the pending filtered seqnos, ascending.
    pub fn filtered_seqnos(&self, vbucket: u16) -> Result<Vec<u64>, TrackerError> {
        Ok(self
            .vb(vbucket)?
            .filtered
            .read()
            .unwrap()
            .as_slice()
            .to_vec())
    }

    /// Copy of the pending failed-CR seqnos, ascending.
    pub fn failed_cr_seqnos(&self, vbucket: u16) -> Result<Vec<u64>, TrackerError> {
        Ok(self
            .vb(vbucket)?
            .failed_cr
            .read()
            .unwrap()
            .as_slice()
            .to_vec())
    }

    /// Copy of the proven gap seqnos, ascending.
    pub fn gap_seqnos(&self, vbucket: u16) -> Result<Vec<u64>, TrackerError> {
        Ok(self.vb(vbucket)?.gap.read().unwrap().as_slice().to_vec())
    }
}
