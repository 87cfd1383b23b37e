pub mod autofollow;
pub mod cue;
pub mod cue_engine;
pub mod cue_store;
