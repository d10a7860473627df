//! Through-seqno tracking core for cross-datacenter bucket replication
//! pipelines.
//!
//! For every source vbucket the tracker reconciles four unordered event
//! streams (received, sent, filtered, failed conflict resolution) into a
//! strictly monotonic watermark: the highest seqno below which every
//! predecessor is fully accounted for. The watermark feeds the checkpoint
//! records persisted for restart and the pipeline's statistics reporters.

pub mod tracker {
    pub mod list;
    pub mod resolve;
    pub mod service;

    pub use list::*;
    pub use resolve::*;
    pub use service::*;
}

pub mod checkpoint {
    pub mod history;
    pub mod record;

    pub use history::*;
    pub use record::*;
}

pub mod pipeline {
    pub mod router;
    pub mod spec;

    pub use router::*;
    pub use spec::*;
}

pub mod observability {
    pub mod logging;

    pub use logging::*;
}

pub use checkpoint::{
    CheckpointDocError, CheckpointHistory, CheckpointRecord, OpaqueParseError, TargetVbOpaque,
    MAX_CHECKPOINTS_KEPT,
};
pub use observability::{LogLevel, PipelineLog, DEFAULT_LOG_RETENTION};
pub use pipeline::{
    ChangeEvent, ChangeOpcode, FilteredListener, ReplicationSpec, ReplicationSpecRegistry,
    RouteOutcome, RouterError, SpecChange, SpecChangeEntry, SpecRegistryError, VbRouter,
    SPEC_JOURNAL_RETENTION,
};
pub use tracker::{
    walk_through_seqno, ReplicationEvent, SeqnoList, SeqnoSnapshots, ThroughSeqnoTracker,
    TrackerConfig, TrackerError, DEFAULT_GAP_BACKFILL_LIMIT, DEFAULT_VBUCKETS_PER_WORKER,
};
