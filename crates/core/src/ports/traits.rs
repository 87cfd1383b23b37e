use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::cue::cue::{Cue, ParamValue};

/// How a custom parameter presents itself on the host. Drives the value
/// coercion applied when capturing and restoring snapshots: menu parameters
/// travel as their selected index, toggles as 0/1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterStyle {
    Menu,
    Toggle,
    Value,
}

/// One writable custom parameter as reported by `ParameterPort::enumerate_custom`.
/// For menu parameters `value` is the selected index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: String,
    pub style: ParameterStyle,
    pub value: ParamValue,
}

/// Read/write access to named parameters on addressable scene-graph nodes,
/// plus the child walk the snapshot capture needs. Implemented by the host;
/// the engine only consumes this contract.
pub trait ParameterPort: Send + Sync {
    fn get(&self, path: &str, name: &str) -> Result<ParamValue>;

    fn set(&self, path: &str, name: &str, value: &ParamValue) -> Result<()>;

    /// Writable custom parameters exposed by the node at `path`. Errors if
    /// the node does not resolve.
    fn enumerate_custom(&self, path: &str) -> Result<Vec<ParameterInfo>>;

    /// Paths of all nodes below `root` (exclusive) up to `max_depth` levels.
    /// Errors if `root` does not resolve.
    fn find_children(&self, root: &str, max_depth: u32) -> Result<Vec<String>>;
}

/// Host-side code execution for `python` actions. Side effects are whatever
/// the code performs; no structured return is expected.
pub trait CodeExecutionPort: Send + Sync {
    fn execute(&self, code: &str) -> Result<()>;
}

/// An opened message transport bound to a destination. Created lazily by the
/// action executor at the first `osc` action through a factory.
pub trait MessageTransportPort: Send {
    fn send(&mut self, address: &str, args: &[ParamValue]) -> Result<()>;
}

pub trait MessageTransportFactory: Send {
    fn open(&self, host: &str, port: u16) -> Result<Box<dyn MessageTransportPort>>;
}

/// A validated timeline operation. The action executor is responsible for
/// rejecting unknown commands and missing arguments before anything reaches
/// this port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimelineOp {
    Play,
    Pause,
    Stop,
    JumpFrame(i64),
    SetRate(f64),
    ToggleLoop,
}

/// Transport state reported back after a timeline operation, echoed into the
/// action result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineStatus {
    pub playing: bool,
    pub frame: i64,
    pub rate: f64,
    pub loop_enabled: bool,
}

pub trait TimelineControlPort: Send {
    fn control(&mut self, op: TimelineOp) -> Result<TimelineStatus>;
}

/// Durable row storage keyed by cue id. The store writes through on every
/// mutation and hydrates from `load_all` at startup.
pub trait PersistencePort: Send {
    fn load_all(&self) -> Result<Vec<Cue>>;

    fn store(&mut self, cue: &Cue) -> Result<()>;

    fn remove(&mut self, id: &str) -> Result<()>;
}
