use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A parameter value as captured from or written to the scene graph.
/// Menu parameters are stored as their selected index, toggles as 0/1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Bool(b) => Some(*b as i64),
            ParamValue::Int(i) => Some(*i),
            ParamValue::Float(f) => Some(*f as i64),
            ParamValue::Text(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Bool(b) => Some(*b as i64 as f64),
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            ParamValue::Text(_) => None,
        }
    }

    /// Numeric truthiness, used when coercing values onto toggle parameters.
    pub fn truthy(&self) -> bool {
        match self {
            ParamValue::Bool(b) => *b,
            ParamValue::Int(i) => *i != 0,
            ParamValue::Float(f) => *f != 0.0,
            ParamValue::Text(s) => !s.is_empty(),
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Captured parameter state for a single scene-graph node. The node itself is
/// referenced only by its path string; nothing here keeps it alive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl NodeSnapshot {
    pub fn new(params: BTreeMap<String, ParamValue>) -> Self {
        Self {
            enabled: true,
            name: None,
            params,
        }
    }
}

/// Mapping from node path to captured parameter state.
pub type Snapshot = BTreeMap<String, NodeSnapshot>;

fn default_osc_host() -> String {
    "127.0.0.1".to_string()
}

fn default_osc_port() -> u16 {
    7000
}

/// A side-effect instruction attached to a cue, executed after its snapshot
/// has been applied. Unrecognized action types deserialize to `Unknown` so a
/// single bad action fails at execution time instead of poisoning the whole
/// cue on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Python {
        #[serde(default)]
        code: String,
    },
    Osc {
        address: String,
        #[serde(default)]
        args: Vec<ParamValue>,
        #[serde(default = "default_osc_host")]
        host: String,
        #[serde(default = "default_osc_port")]
        port: u16,
    },
    Parameter {
        path: String,
        parameter: String,
        value: ParamValue,
    },
    Timeline {
        action: TimelineCommand,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frame: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rate: Option<f64>,
    },
    #[serde(other)]
    Unknown,
}

impl Action {
    /// Wire name of the action type, echoed back in execution results.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Python { .. } => "python",
            Action::Osc { .. } => "osc",
            Action::Parameter { .. } => "parameter",
            Action::Timeline { .. } => "timeline",
            Action::Unknown => "unknown",
        }
    }
}

/// Timeline transport sub-commands. Deserialized leniently: an unrecognized
/// command string becomes `Unknown` and fails at execution time with an
/// "Unknown timeline action" result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineCommand {
    Play,
    Pause,
    Stop,
    JumpFrame,
    SetRate,
    ToggleLoop,
    Unknown,
}

impl TimelineCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineCommand::Play => "play",
            TimelineCommand::Pause => "pause",
            TimelineCommand::Stop => "stop",
            TimelineCommand::JumpFrame => "jump_frame",
            TimelineCommand::SetRate => "set_rate",
            TimelineCommand::ToggleLoop => "toggle_loop",
            TimelineCommand::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for TimelineCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "play" => Ok(TimelineCommand::Play),
            "pause" => Ok(TimelineCommand::Pause),
            "stop" => Ok(TimelineCommand::Stop),
            "jump_frame" => Ok(TimelineCommand::JumpFrame),
            "set_rate" => Ok(TimelineCommand::SetRate),
            "toggle_loop" => Ok(TimelineCommand::ToggleLoop),
            _ => Err(()),
        }
    }
}

impl<'de> Deserialize<'de> for TimelineCommand {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or(TimelineCommand::Unknown))
    }
}

/// A named, ordered unit combining a parameter snapshot, optional timed
/// auto-advance and a list of side-effect actions.
///
/// Indices are 1-based and dense across the store (`delete` is the one
/// operation allowed to leave a gap).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub id: String,
    pub index: u32,
    pub name: String,
    #[serde(default)]
    pub snapshot: Snapshot,
    /// Seconds until autofollow fires; 0 disables autofollow entirely.
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub autofollow: bool,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub modified: String,
}

impl Cue {
    pub fn component_count(&self) -> usize {
        self.snapshot.len()
    }

    pub fn enabled_count(&self) -> usize {
        self.snapshot.values().filter(|n| n.enabled).count()
    }

    pub fn wants_autofollow(&self) -> bool {
        self.autofollow && self.duration > 0.0
    }
}

/// Caller-supplied cue data for `CueStore::save`. An existing `id` selects the
/// update path; otherwise a fresh cue is created at the end of the sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CueDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub snapshot: Snapshot,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub autofollow: bool,
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_parses_from_tagged_json() {
        let action: Action = serde_json::from_str(
            r#"{"type": "osc", "address": "/scene/go", "args": [1, "warm", 0.5]}"#,
        )
        .unwrap();

        match action {
            Action::Osc {
                address,
                args,
                host,
                port,
            } => {
                assert_eq!(address, "/scene/go");
                assert_eq!(
                    args,
                    vec![
                        ParamValue::Int(1),
                        ParamValue::Text("warm".to_string()),
                        ParamValue::Float(0.5),
                    ]
                );
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 7000);
            }
            other => panic!("expected osc action, got {:?}", other),
        }
    }

    #[test]
    fn unrecognized_action_type_becomes_unknown() {
        let action: Action = serde_json::from_str(r#"{"type": "teleport"}"#).unwrap();
        assert_eq!(action, Action::Unknown);
    }

    #[test]
    fn timeline_commands_use_snake_case() {
        let action: Action =
            serde_json::from_str(r#"{"type": "timeline", "action": "jump_frame", "frame": 120}"#)
                .unwrap();
        assert_eq!(
            action,
            Action::Timeline {
                action: TimelineCommand::JumpFrame,
                frame: Some(120),
                rate: None,
            }
        );

        let action: Action =
            serde_json::from_str(r#"{"type": "timeline", "action": "rewind"}"#).unwrap();
        match action {
            Action::Timeline { action, .. } => assert_eq!(action, TimelineCommand::Unknown),
            other => panic!("expected timeline action, got {:?}", other),
        }
    }

    #[test]
    fn node_snapshot_defaults_to_enabled() {
        let node: NodeSnapshot =
            serde_json::from_str(r#"{"params": {"Brightness": 0.8}}"#).unwrap();
        assert!(node.enabled);
        assert_eq!(
            node.params.get("Brightness"),
            Some(&ParamValue::Float(0.8))
        );
    }

    #[test]
    fn param_value_round_trips_untagged() {
        let values = vec![
            ParamValue::Bool(true),
            ParamValue::Int(42),
            ParamValue::Float(1.5),
            ParamValue::Text("hello".to_string()),
        ];
        let json = serde_json::to_string(&values).unwrap();
        let back: Vec<ParamValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }
}
