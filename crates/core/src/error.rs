use thiserror::Error;

/// Recoverable engine errors surfaced to callers as structured results.
/// None of these are fatal to the engine; state is left untouched when an
/// operation fails with one of them.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Cue not found: {0}")]
    CueNotFound(String),

    #[error("No more cues")]
    NoMoreCues,

    #[error("Already at first cue")]
    AtFirstCue,

    #[error("Cue index out of range: {0}")]
    IndexOutOfRange(u32),

    #[error("Parent not found: {0}")]
    RootNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}
