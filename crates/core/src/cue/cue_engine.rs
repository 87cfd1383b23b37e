use serde::Serialize;
use tokio::sync::mpsc;

use crate::action::action_executor::{ActionExecutor, ActionRecord};
use crate::cue::autofollow::AutofollowScheduler;
use crate::cue::cue::{Cue, CueDraft};
use crate::cue::cue_store::{CueStore, ReorderOutcome, SaveOutcome};
use crate::error::EngineError;
use crate::messages::EngineCommand;
use crate::snapshot::snapshot_engine::{CaptureOutcome, NodeApplied, NodeError, SnapshotEngine};

/// Mutable engine state: the index of the last successfully executed cue
/// (0 = none yet). The pending autofollow handle lives in the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineState {
    pub current_index: u32,
}

/// How a `go` call names its target cue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CueTarget {
    Id(String),
    Index(u32),
}

impl std::fmt::Display for CueTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CueTarget::Id(id) => write!(f, "{}", id),
            CueTarget::Index(index) => write!(f, "index {}", index),
        }
    }
}

/// Everything that happened while executing one cue.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteResults {
    pub snapshot_applied: Vec<NodeApplied>,
    pub snapshot_errors: Vec<NodeError>,
    pub actions_executed: Vec<ActionRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecuteOutcome {
    pub cue: Cue,
    pub results: ExecuteResults,
}

/// A cue annotated with the per-cue counts the remote surfaces display.
#[derive(Debug, Clone, Serialize)]
pub struct CueOverview {
    #[serde(flatten)]
    pub cue: Cue,
    pub component_count: usize,
    pub enabled_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CueListing {
    pub cues: Vec<CueOverview>,
    pub count: usize,
    pub current_index: u32,
}

/// Orchestrates store, snapshot application, action dispatch and autofollow.
///
/// All operations are synchronous and run to completion on the host loop; the
/// scheduler's delayed callback re-enters through the command channel rather
/// than touching the engine directly, so a single `&mut` owner is enough.
pub struct CueEngine {
    store: CueStore,
    snapshots: SnapshotEngine,
    actions: ActionExecutor,
    scheduler: AutofollowScheduler,
    state: EngineState,
}

impl CueEngine {
    /// Build the engine and hand back the receiving half of its command
    /// channel. The caller (or [`CueEngine::run`]) drains it.
    pub fn new(
        store: CueStore,
        snapshots: SnapshotEngine,
        actions: ActionExecutor,
        frame_rate: f64,
    ) -> (Self, mpsc::Receiver<EngineCommand>) {
        let (tx, rx) = mpsc::channel(16);
        let engine = Self {
            store,
            snapshots,
            actions,
            scheduler: AutofollowScheduler::new(tx, frame_rate),
            state: EngineState::default(),
        };
        (engine, rx)
    }

    /// Resolve and execute a cue: apply its snapshot, run its actions in
    /// order, update the current index and arm autofollow when requested.
    /// A miss leaves all state untouched.
    pub fn go(&mut self, target: CueTarget) -> Result<ExecuteOutcome, EngineError> {
        let cue = match &target {
            CueTarget::Id(id) => self.store.find(id),
            CueTarget::Index(index) => self.store.find_by_index(*index),
        }
        .cloned()
        .ok_or_else(|| EngineError::CueNotFound(target.to_string()))?;

        // A new execution invalidates whatever transition was pending.
        self.scheduler.cancel();

        log::info!("GO cue '{}' ({}, index {})", cue.name, cue.id, cue.index);
        let apply = self.snapshots.apply(&cue.snapshot);
        for error in &apply.errors {
            log::warn!("Snapshot node {}: {}", error.path, error.error);
        }
        let actions_executed = self.actions.execute_all(&cue.actions);

        self.state.current_index = cue.index;
        if cue.wants_autofollow() {
            self.scheduler.arm(cue.index + 1, cue.duration);
        }

        Ok(ExecuteOutcome {
            results: ExecuteResults {
                snapshot_applied: apply.applied,
                snapshot_errors: apply.errors,
                actions_executed,
            },
            cue,
        })
    }

    /// Advance to the cue after the current one.
    pub fn next(&mut self) -> Result<ExecuteOutcome, EngineError> {
        let target = self.state.current_index + 1;
        match self.go(CueTarget::Index(target)) {
            Err(EngineError::CueNotFound(_)) => Err(EngineError::NoMoreCues),
            other => other,
        }
    }

    /// Step back to the cue before the current one.
    pub fn back(&mut self) -> Result<ExecuteOutcome, EngineError> {
        if self.state.current_index < 2 {
            return Err(EngineError::AtFirstCue);
        }
        self.go(CueTarget::Index(self.state.current_index - 1))
    }

    pub fn current(&self) -> u32 {
        self.state.current_index
    }

    pub fn autofollow_armed(&self) -> bool {
        self.scheduler.is_armed()
    }

    /// Ordered cue list annotated with the current index and per-cue counts.
    pub fn list(&self) -> CueListing {
        let cues: Vec<CueOverview> = self
            .store
            .list()
            .into_iter()
            .map(|cue| CueOverview {
                component_count: cue.component_count(),
                enabled_count: cue.enabled_count(),
                cue: cue.clone(),
            })
            .collect();
        CueListing {
            count: cues.len(),
            current_index: self.state.current_index,
            cues,
        }
    }

    pub fn save(&mut self, draft: CueDraft) -> Result<SaveOutcome, EngineError> {
        self.store.save(draft)
    }

    pub fn delete(&mut self, id: &str) -> Result<(), EngineError> {
        self.store.delete(id)
    }

    pub fn reorder(&mut self, id: &str, new_index: u32) -> Result<ReorderOutcome, EngineError> {
        self.store.reorder(id, new_index)
    }

    /// Capture the current scene-graph state below `root`.
    pub fn snapshot(&self, root: &str, max_depth: u32) -> Result<CaptureOutcome, EngineError> {
        self.snapshots.capture(root, max_depth)
    }

    /// Apply one command from the channel. Failures are logged, never fatal:
    /// a stale autofollow target simply misses.
    pub fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Go { index } => {
                if let Err(e) = self.go(CueTarget::Index(index)) {
                    log::warn!("Autofollow advance to index {} failed: {}", index, e);
                }
            }
        }
    }

    /// Drain the command channel until it closes. Hosts that embed the engine
    /// in their own loop can call [`CueEngine::handle_command`] directly
    /// instead.
    pub async fn run(&mut self, mut rx: mpsc::Receiver<EngineCommand>) {
        while let Some(command) = rx.recv().await {
            self.handle_command(command);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::cue::cue::{Action, ParamValue};
    use crate::persistence::MemoryStore;
    use crate::ports::memory::{
        MemoryParameterPort, MemoryTimelinePort, MemoryTransportFactory, RecordingCodePort,
    };
    use crate::ports::traits::{CodeExecutionPort, ParameterPort, ParameterStyle};

    struct Rig {
        engine: CueEngine,
        rx: mpsc::Receiver<EngineCommand>,
        params: Arc<MemoryParameterPort>,
    }

    /// Engine over an in-memory scene with `count` cues, each snapshotting
    /// one float parameter to its own index.
    fn rig(count: u32) -> Rig {
        let params = Arc::new(MemoryParameterPort::new());
        params.add_param(
            "/project/fader",
            "Level",
            ParameterStyle::Value,
            ParamValue::Float(0.0),
        );

        let mut store = CueStore::new(Box::new(MemoryStore::new())).unwrap();
        for i in 1..=count {
            let mut snapshot = crate::cue::cue::Snapshot::new();
            snapshot.insert(
                "/project/fader".to_string(),
                crate::cue::cue::NodeSnapshot::new(
                    [("Level".to_string(), ParamValue::Float(i as f64))].into(),
                ),
            );
            store
                .save(CueDraft {
                    name: Some(format!("Cue {}", i)),
                    snapshot,
                    ..Default::default()
                })
                .unwrap();
        }

        let snapshots =
            SnapshotEngine::new(Arc::clone(&params) as Arc<dyn ParameterPort>, "cueflow_bridge");
        let actions = ActionExecutor::new(
            Arc::clone(&params) as Arc<dyn ParameterPort>,
            Arc::new(RecordingCodePort::new()) as Arc<dyn CodeExecutionPort>,
            Box::new(MemoryTimelinePort::new()),
            Box::new(MemoryTransportFactory::new()),
        );
        let (engine, rx) = CueEngine::new(store, snapshots, actions, 60.0);
        Rig { engine, rx, params }
    }

    fn set_autofollow(engine: &mut CueEngine, index: u32, duration: f64) {
        let cue = engine.store.find_by_index(index).unwrap().clone();
        engine
            .save(CueDraft {
                id: Some(cue.id),
                name: Some(cue.name),
                snapshot: cue.snapshot,
                duration,
                autofollow: true,
                actions: cue.actions,
            })
            .unwrap();
    }

    #[tokio::test]
    async fn go_applies_snapshot_and_tracks_index() {
        let mut rig = rig(3);
        let outcome = rig.engine.go(CueTarget::Index(2)).unwrap();

        assert_eq!(outcome.cue.name, "Cue 2");
        assert_eq!(rig.engine.current(), 2);
        assert_eq!(
            rig.params.get("/project/fader", "Level").unwrap(),
            ParamValue::Float(2.0)
        );
        assert!(outcome.results.snapshot_errors.is_empty());
    }

    #[tokio::test]
    async fn go_by_id_resolves_first_match() {
        let mut rig = rig(3);
        let id = rig.engine.list().cues[2].cue.id.clone();
        let outcome = rig.engine.go(CueTarget::Id(id)).unwrap();
        assert_eq!(outcome.cue.index, 3);
        assert_eq!(rig.engine.current(), 3);
    }

    #[tokio::test]
    async fn go_miss_leaves_state_unchanged() {
        let mut rig = rig(2);
        rig.engine.go(CueTarget::Index(1)).unwrap();

        let err = rig.engine.go(CueTarget::Index(9)).unwrap_err();
        assert!(matches!(err, EngineError::CueNotFound(_)));
        assert_eq!(rig.engine.current(), 1);
    }

    #[tokio::test]
    async fn next_walks_forward_and_stops_at_the_end() {
        let mut rig = rig(2);
        rig.engine.next().unwrap();
        assert_eq!(rig.engine.current(), 1);
        rig.engine.next().unwrap();
        assert_eq!(rig.engine.current(), 2);

        let err = rig.engine.next().unwrap_err();
        assert!(matches!(err, EngineError::NoMoreCues));
        assert_eq!(err.to_string(), "No more cues");
        assert_eq!(rig.engine.current(), 2);
    }

    #[tokio::test]
    async fn back_rejects_before_first_cue() {
        let mut rig = rig(2);
        let err = rig.engine.back().unwrap_err();
        assert!(matches!(err, EngineError::AtFirstCue));

        rig.engine.go(CueTarget::Index(1)).unwrap();
        let err = rig.engine.back().unwrap_err();
        assert_eq!(err.to_string(), "Already at first cue");
        assert_eq!(rig.engine.current(), 1);

        rig.engine.go(CueTarget::Index(2)).unwrap();
        rig.engine.back().unwrap();
        assert_eq!(rig.engine.current(), 1);
    }

    #[tokio::test]
    async fn list_annotates_counts_and_current_index() {
        let mut rig = rig(3);
        rig.engine.go(CueTarget::Index(2)).unwrap();

        let listing = rig.engine.list();
        assert_eq!(listing.count, 3);
        assert_eq!(listing.current_index, 2);
        assert!(listing
            .cues
            .iter()
            .all(|c| c.component_count == 1 && c.enabled_count == 1));
    }

    #[tokio::test]
    async fn action_failures_are_reported_not_raised() {
        let mut rig = rig(1);
        let cue = rig.engine.store.find_by_index(1).unwrap().clone();
        rig.engine
            .save(CueDraft {
                id: Some(cue.id),
                name: Some(cue.name),
                snapshot: cue.snapshot,
                actions: vec![
                    Action::Unknown,
                    Action::Python {
                        code: "still_runs()".to_string(),
                    },
                ],
                ..Default::default()
            })
            .unwrap();

        let outcome = rig.engine.go(CueTarget::Index(1)).unwrap();
        let records = &outcome.results.actions_executed;
        assert_eq!(records.len(), 2);
        assert!(!records[0].result.success);
        assert!(records[1].result.success);
    }

    #[tokio::test(start_paused = true)]
    async fn autofollow_advances_exactly_once() {
        let mut rig = rig(5);
        set_autofollow(&mut rig.engine, 4, 5.0);

        rig.engine.go(CueTarget::Index(4)).unwrap();
        assert!(rig.engine.autofollow_armed());

        tokio::time::advance(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        let command = rig.rx.try_recv().unwrap();
        assert_eq!(command, EngineCommand::Go { index: 5 });
        rig.engine.handle_command(command);
        assert_eq!(rig.engine.current(), 5);
        assert!(rig.rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_go_cancels_armed_autofollow() {
        let mut rig = rig(7);
        set_autofollow(&mut rig.engine, 4, 5.0);

        rig.engine.go(CueTarget::Index(4)).unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;

        // Manual advance a second later must disarm the index-5 timer.
        rig.engine.go(CueTarget::Index(7)).unwrap();
        assert!(!rig.engine.autofollow_armed());

        tokio::time::advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert!(rig.rx.try_recv().is_err());
        assert_eq!(rig.engine.current(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_disables_autofollow() {
        let mut rig = rig(3);
        let cue = rig.engine.store.find_by_index(1).unwrap().clone();
        rig.engine
            .save(CueDraft {
                id: Some(cue.id),
                name: Some(cue.name),
                snapshot: cue.snapshot,
                duration: 0.0,
                autofollow: true,
                actions: cue.actions,
            })
            .unwrap();

        rig.engine.go(CueTarget::Index(1)).unwrap();
        assert!(!rig.engine.autofollow_armed());
    }
}
