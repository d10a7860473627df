use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

use crate::observability::logging::PipelineLog;
use crate::tracker::service::{ThroughSeqnoTracker, TrackerError};

/// Opcodes carried by change-stream events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOpcode {
    Mutation,
    Deletion,
    Expiration,
    SnapshotMarker,
    StreamEnd,
}

impl ChangeOpcode {
    /// Whether the opcode is a document change that replicates to the target.
    pub fn is_replicated(self) -> bool {
        matches!(
            self,
            ChangeOpcode::Mutation | ChangeOpcode::Deletion | ChangeOpcode::Expiration
        )
    }
}

/// One event from the per-vbucket change stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub vbucket: u16,
    pub seqno: u64,
    pub opcode: ChangeOpcode,
}

/// Decision for one routed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The event goes to the named outbound worker.
    Dispatched { worker: String },
    /// The event is dropped: non-replicated opcode, or no worker is mapped
    /// to its vbucket.
    Filtered,
}

/// Errors raised while constructing the router.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("router requires at least one vbucket-to-worker mapping")]
    EmptyRouteTable,
}

/// Observer notified when the router drops an event.
///
/// The tracker implements this so every drop lands in the filtered seqno list
/// of the affected vbucket.
pub trait FilteredListener {
    fn on_filtered(&self, vbucket: u16, seqno: u64) -> Result<(), TrackerError>;
}

impl FilteredListener for ThroughSeqnoTracker {
    fn on_filtered(&self, vbucket: u16, seqno: u64) -> Result<(), TrackerError> {
        self.add_filtered_seqno(vbucket, seqno)
    }
}

/// Static per-vbucket dispatcher between the change stream and the outbound
/// workers.
///
/// The vbucket-to-worker table is fixed at construction; it defines which
/// worker replicates which shard of the key space.
#[derive(Debug)]
pub struct VbRouter {
    routes: HashMap<u16, String>,
    dispatched: Mutex<HashMap<String, u64>>,
    filtered_total: Mutex<u64>,
    log: PipelineLog,
}

impl VbRouter {
    /// Builds a router over the vbucket-to-worker table.
    pub fn new(routes: HashMap<u16, String>, log: PipelineLog) -> Result<Self, RouterError> {
        if routes.is_empty() {
            return Err(RouterError::EmptyRouteTable);
        }
        let dispatched = routes.values().map(|worker| (worker.clone(), 0)).collect();
        log.info(&format!(
            "router created over {} vbucket mappings",
            routes.len()
        ));
        Ok(Self {
            routes,
            dispatched: Mutex::new(dispatched),
            filtered_total: Mutex::new(0),
            log,
        })
    }

    /// Worker mapped to `vbucket`, if any.
    pub fn worker_for(&self, vbucket: u16) -> Option<&str> {
        self.routes.get(&vbucket).map(String::as_str)
    }

    /// Routes one change event.
    pub fn route(&self, event: &ChangeEvent) -> RouteOutcome {
        if !event.opcode.is_replicated() {
            *self.filtered_total.lock().unwrap() += 1;
            self.log.debug(
                event.vbucket,
                &format!("seqno {} dropped: opcode {:?}", event.seqno, event.opcode),
            );
            return RouteOutcome::Filtered;
        }
        match self.routes.get(&event.vbucket) {
            Some(worker) => {
                *self
                    .dispatched
                    .lock()
                    .unwrap()
                    .entry(worker.clone())
                    .or_insert(0) += 1;
                RouteOutcome::Dispatched {
                    worker: worker.clone(),
                }
            }
            None => {
                *self.filtered_total.lock().unwrap() += 1;
                self.log.debug(
                    event.vbucket,
                    &format!("seqno {} dropped: no worker mapped", event.seqno),
                );
                RouteOutcome::Filtered
            }
        }
    }

    /// Routes one event and reports a drop to the listener.
    pub fn route_and_notify<L: FilteredListener>(
        &self,
        event: &ChangeEvent,
        listener: &L,
    ) -> Result<RouteOutcome, TrackerError> {
        let outcome = self.route(event);
        if outcome == RouteOutcome::Filtered {
            listener.on_filtered(event.vbucket, event.seqno)?;
        }
        Ok(outcome)
    }

    /// Events dispatched so far, per worker.
    pub fn dispatch_counts(&self) -> HashMap<String, u64> {
        self.dispatched.lock().unwrap().clone()
    }

    /// Total events dropped so far.
    pub fn filtered_total(&self) -> u64 {
        *self.filtered_total.lock().unwrap()
    }
}
