pub mod snapshot_engine;
