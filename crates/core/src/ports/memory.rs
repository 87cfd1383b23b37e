//! In-process port implementations used by tests and the offline rehearsal
//! runner. No network or host I/O happens here; everything is recorded so a
//! caller can inspect what the engine did.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;

use crate::cue::cue::ParamValue;
use crate::ports::traits::{
    CodeExecutionPort, MessageTransportFactory, MessageTransportPort, ParameterInfo,
    ParameterPort, ParameterStyle, TimelineControlPort, TimelineOp, TimelineStatus,
};

/// An in-memory scene graph: a flat map of node paths to their writable
/// custom parameters. Depth is derived from the path structure.
#[derive(Default)]
pub struct MemoryParameterPort {
    nodes: Mutex<BTreeMap<String, BTreeMap<String, ParameterInfo>>>,
}

impl MemoryParameterPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node with no parameters (it will be invisible to capture
    /// until a parameter is added).
    pub fn add_node(&self, path: &str) {
        self.nodes
            .lock()
            .entry(path.to_string())
            .or_default();
    }

    pub fn add_param(&self, path: &str, name: &str, style: ParameterStyle, value: ParamValue) {
        self.nodes
            .lock()
            .entry(path.to_string())
            .or_default()
            .insert(
                name.to_string(),
                ParameterInfo {
                    name: name.to_string(),
                    style,
                    value,
                },
            );
    }

    pub fn remove_node(&self, path: &str) {
        self.nodes.lock().remove(path);
    }

    fn depth_below(root: &str, path: &str) -> Option<u32> {
        let rest = path.strip_prefix(root)?.strip_prefix('/')?;
        if rest.is_empty() {
            return None;
        }
        Some(rest.split('/').count() as u32)
    }
}

impl ParameterPort for MemoryParameterPort {
    fn get(&self, path: &str, name: &str) -> Result<ParamValue> {
        let nodes = self.nodes.lock();
        let params = nodes
            .get(path)
            .ok_or_else(|| anyhow!("Component not found: {}", path))?;
        params
            .get(name)
            .map(|info| info.value.clone())
            .ok_or_else(|| anyhow!("Unknown parameter: {}", name))
    }

    fn set(&self, path: &str, name: &str, value: &ParamValue) -> Result<()> {
        let mut nodes = self.nodes.lock();
        let params = nodes
            .get_mut(path)
            .ok_or_else(|| anyhow!("Component not found: {}", path))?;
        let info = params
            .get_mut(name)
            .ok_or_else(|| anyhow!("Unknown parameter: {}", name))?;
        info.value = value.clone();
        Ok(())
    }

    fn enumerate_custom(&self, path: &str) -> Result<Vec<ParameterInfo>> {
        let nodes = self.nodes.lock();
        let params = nodes
            .get(path)
            .ok_or_else(|| anyhow!("Component not found: {}", path))?;
        Ok(params.values().cloned().collect())
    }

    fn find_children(&self, root: &str, max_depth: u32) -> Result<Vec<String>> {
        let nodes = self.nodes.lock();
        if !nodes.contains_key(root) && !nodes.keys().any(|p| p.starts_with(root)) {
            return Err(anyhow!("Parent not found: {}", root));
        }
        Ok(nodes
            .keys()
            .filter(|path| {
                Self::depth_below(root, path).is_some_and(|depth| depth <= max_depth)
            })
            .cloned()
            .collect())
    }
}

/// Records executed code snippets instead of running them. The offline runner
/// uses this so `python` actions are visible in the log without a host
/// interpreter.
#[derive(Default)]
pub struct RecordingCodePort {
    executed: Arc<Mutex<Vec<String>>>,
}

impl RecordingCodePort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

impl CodeExecutionPort for RecordingCodePort {
    fn execute(&self, code: &str) -> Result<()> {
        log::info!("code action: {}", code);
        self.executed.lock().push(code.to_string());
        Ok(())
    }
}

/// A message captured by [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub host: String,
    pub port: u16,
    pub address: String,
    pub args: Vec<ParamValue>,
}

pub struct MemoryTransport {
    host: String,
    port: u16,
    sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl MessageTransportPort for MemoryTransport {
    fn send(&mut self, address: &str, args: &[ParamValue]) -> Result<()> {
        log::info!("osc {}:{} {} {:?}", self.host, self.port, address, args);
        self.sent.lock().push(SentMessage {
            host: self.host.clone(),
            port: self.port,
            address: address.to_string(),
            args: args.to_vec(),
        });
        Ok(())
    }
}

/// Factory handing out [`MemoryTransport`]s that all record into one shared
/// log. Clones share the log, so a caller can keep one half for inspection
/// after the executor has taken ownership of the other. Opens are counted to
/// verify the transport is created exactly once.
#[derive(Clone, Default)]
pub struct MemoryTransportFactory {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    opened: Arc<Mutex<Vec<(String, u16)>>>,
}

impl MemoryTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().len()
    }
}

impl MessageTransportFactory for MemoryTransportFactory {
    fn open(&self, host: &str, port: u16) -> Result<Box<dyn MessageTransportPort>> {
        self.opened.lock().push((host.to_string(), port));
        Ok(Box::new(MemoryTransport {
            host: host.to_string(),
            port,
            sent: Arc::clone(&self.sent),
        }))
    }
}

/// Timeline transport state machine with no actual playback behind it.
pub struct MemoryTimelinePort {
    status: TimelineStatus,
}

impl MemoryTimelinePort {
    pub fn new() -> Self {
        Self {
            status: TimelineStatus {
                playing: false,
                frame: 1,
                rate: 1.0,
                loop_enabled: true,
            },
        }
    }

    pub fn status(&self) -> TimelineStatus {
        self.status
    }
}

impl Default for MemoryTimelinePort {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineControlPort for MemoryTimelinePort {
    fn control(&mut self, op: TimelineOp) -> Result<TimelineStatus> {
        match op {
            TimelineOp::Play => self.status.playing = true,
            TimelineOp::Pause => self.status.playing = false,
            TimelineOp::Stop => {
                self.status.playing = false;
                self.status.frame = 1;
            }
            TimelineOp::JumpFrame(frame) => self.status.frame = frame,
            TimelineOp::SetRate(rate) => self.status.rate = rate,
            TimelineOp::ToggleLoop => self.status.loop_enabled = !self.status.loop_enabled,
        }
        Ok(self.status)
    }
}
