use std::sync::Arc;

use serde::Serialize;

use crate::cue::cue::{Action, ParamValue, TimelineCommand};
use crate::ports::traits::{
    CodeExecutionPort, MessageTransportFactory, MessageTransportPort, ParameterPort,
    TimelineControlPort, TimelineOp,
};

/// Dispatches a cue's action list to the side-effect ports.
///
/// Actions run strictly in list order and a failure never halts the
/// remaining actions — every result is collected independently and nothing
/// propagates past this boundary.
pub struct ActionExecutor {
    params: Arc<dyn ParameterPort>,
    code: Arc<dyn CodeExecutionPort>,
    timeline: Box<dyn TimelineControlPort>,
    transport_factory: Box<dyn MessageTransportFactory>,
    /// Opened lazily at the first osc action, bound to that action's
    /// host/port, then reused for the rest of the session.
    transport: Option<Box<dyn MessageTransportPort>>,
}

/// Outcome of a single action, mirroring the action's own vocabulary so the
/// caller can surface it verbatim.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    fn ok(kind: &'static str) -> Self {
        Self {
            success: true,
            kind,
            ..Default::default()
        }
    }

    fn fail(kind: &'static str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            kind,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// One executed action paired with its result.
#[derive(Debug, Clone, Serialize)]
pub struct ActionRecord {
    pub action: Action,
    pub result: ActionResult,
}

impl ActionExecutor {
    pub fn new(
        params: Arc<dyn ParameterPort>,
        code: Arc<dyn CodeExecutionPort>,
        timeline: Box<dyn TimelineControlPort>,
        transport_factory: Box<dyn MessageTransportFactory>,
    ) -> Self {
        Self {
            params,
            code,
            timeline,
            transport_factory,
            transport: None,
        }
    }

    pub fn execute_all(&mut self, actions: &[Action]) -> Vec<ActionRecord> {
        actions
            .iter()
            .map(|action| {
                let result = self.execute(action);
                if !result.success {
                    log::debug!(
                        "Action {} failed: {}",
                        action.kind(),
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                }
                ActionRecord {
                    action: action.clone(),
                    result,
                }
            })
            .collect()
    }

    pub fn execute(&mut self, action: &Action) -> ActionResult {
        match action {
            Action::Python { code } => self.execute_python(code),
            Action::Osc {
                address,
                args,
                host,
                port,
            } => self.execute_osc(address, args, host, *port),
            Action::Parameter {
                path,
                parameter,
                value,
            } => self.execute_parameter(path, parameter, value),
            Action::Timeline {
                action,
                frame,
                rate,
            } => self.execute_timeline(*action, *frame, *rate),
            Action::Unknown => ActionResult::fail("unknown", "Unknown action type"),
        }
    }

    fn execute_python(&self, code: &str) -> ActionResult {
        if code.is_empty() {
            return ActionResult::ok("python");
        }
        match self.code.execute(code) {
            Ok(()) => ActionResult::ok("python"),
            Err(e) => ActionResult::fail("python", e.to_string()),
        }
    }

    fn execute_osc(
        &mut self,
        address: &str,
        args: &[ParamValue],
        host: &str,
        port: u16,
    ) -> ActionResult {
        if self.transport.is_none() {
            match self.transport_factory.open(host, port) {
                Ok(transport) => self.transport = Some(transport),
                Err(e) => return ActionResult::fail("osc", e.to_string()),
            }
        }

        // The check above guarantees the slot is filled.
        let transport = match self.transport.as_mut() {
            Some(transport) => transport,
            None => return ActionResult::fail("osc", "Transport unavailable"),
        };
        match transport.send(address, args) {
            Ok(()) => ActionResult {
                address: Some(address.to_string()),
                ..ActionResult::ok("osc")
            },
            Err(e) => ActionResult::fail("osc", e.to_string()),
        }
    }

    fn execute_parameter(&self, path: &str, parameter: &str, value: &ParamValue) -> ActionResult {
        if path.is_empty() || parameter.is_empty() {
            return ActionResult::fail("parameter", "Invalid path or parameter");
        }
        match self.params.set(path, parameter, value) {
            Ok(()) => ActionResult {
                path: Some(path.to_string()),
                ..ActionResult::ok("parameter")
            },
            Err(e) => ActionResult::fail("parameter", e.to_string()),
        }
    }

    fn execute_timeline(
        &mut self,
        command: TimelineCommand,
        frame: Option<i64>,
        rate: Option<f64>,
    ) -> ActionResult {
        let op = match command {
            TimelineCommand::Play => TimelineOp::Play,
            TimelineCommand::Pause => TimelineOp::Pause,
            TimelineCommand::Stop => TimelineOp::Stop,
            TimelineCommand::JumpFrame => match frame {
                Some(frame) => TimelineOp::JumpFrame(frame),
                None => return ActionResult::fail("timeline", "jump_frame requires a frame"),
            },
            TimelineCommand::SetRate => match rate {
                Some(rate) => TimelineOp::SetRate(rate),
                None => return ActionResult::fail("timeline", "set_rate requires a rate"),
            },
            TimelineCommand::Unknown => {
                return ActionResult::fail("timeline", "Unknown timeline action")
            }
            TimelineCommand::ToggleLoop => TimelineOp::ToggleLoop,
        };

        let status = match self.timeline.control(op) {
            Ok(status) => status,
            Err(e) => return ActionResult::fail("timeline", e.to_string()),
        };

        let mut result = ActionResult {
            action: Some(command.as_str()),
            ..ActionResult::ok("timeline")
        };
        match op {
            TimelineOp::Play => result.state = Some("playing"),
            TimelineOp::Pause => result.state = Some("paused"),
            TimelineOp::Stop => result.state = Some("stopped"),
            TimelineOp::JumpFrame(_) => result.frame = Some(status.frame),
            TimelineOp::SetRate(_) => result.rate = Some(status.rate),
            TimelineOp::ToggleLoop => result.loop_enabled = Some(status.loop_enabled),
        }
        result
    }
}
