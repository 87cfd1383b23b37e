use serde::{Deserialize, Serialize};

/// Cooperative re-entry into the engine. The autofollow scheduler sends these
/// on the engine's command channel; the host loop drains them between direct
/// calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineCommand {
    /// Execute the cue at the given index.
    Go { index: u32 },
}
