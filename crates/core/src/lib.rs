pub use action::action_executor::{ActionExecutor, ActionRecord, ActionResult};
pub use config::{ConfigError, ConfigFile, ConfigManager, Settings};
pub use cue::autofollow::AutofollowScheduler;
pub use cue::cue::{
    Action, Cue, CueDraft, NodeSnapshot, ParamValue, Snapshot, TimelineCommand,
};
pub use cue::cue_engine::{
    CueEngine, CueListing, CueOverview, CueTarget, EngineState, ExecuteOutcome, ExecuteResults,
};
pub use cue::cue_store::{CueStore, ReorderOutcome, SaveOutcome};
pub use error::EngineError;
pub use messages::EngineCommand;
pub use persistence::{JsonFileStore, MemoryStore};
pub use ports::{
    CodeExecutionPort, MemoryParameterPort, MemoryTimelinePort, MemoryTransport,
    MemoryTransportFactory, MessageTransportFactory, MessageTransportPort, ParameterInfo,
    ParameterPort, ParameterStyle, PersistencePort, RecordingCodePort, SentMessage,
    TimelineControlPort, TimelineOp, TimelineStatus,
};
pub use snapshot::snapshot_engine::{
    ApplyOutcome, CaptureOutcome, NodeApplied, NodeError, ParamError, SnapshotEngine,
};

mod action;
mod config;
mod cue;
mod error;
pub mod messages;
mod persistence;
pub mod ports;
mod snapshot;
