use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::cue::cue::{NodeSnapshot, ParamValue, Snapshot};
use crate::error::EngineError;
use crate::ports::traits::{ParameterPort, ParameterStyle};

/// Captures and restores parameter snapshots across the scene graph.
///
/// `apply` is deliberately best-effort: one unresolvable node or parameter
/// never blocks the rest of the snapshot. Failures come back as data, not as
/// errors.
pub struct SnapshotEngine {
    params: Arc<dyn ParameterPort>,
    /// Nodes whose path contains this marker are the engine's own
    /// housekeeping subtree and are never captured.
    exclude_marker: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptureOutcome {
    pub snapshot: Snapshot,
    pub component_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamError {
    pub param: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeError {
    pub path: String,
    pub error: String,
}

/// Per-node application report: how many parameters landed, and which failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeApplied {
    pub path: String,
    pub applied: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ParamError>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyOutcome {
    pub applied: Vec<NodeApplied>,
    pub errors: Vec<NodeError>,
}

impl SnapshotEngine {
    pub fn new(params: Arc<dyn ParameterPort>, exclude_marker: impl Into<String>) -> Self {
        Self {
            params,
            exclude_marker: exclude_marker.into(),
        }
    }

    /// Walk the scene graph below `root` up to `max_depth` and record every
    /// node that exposes at least one writable custom parameter. Menu values
    /// are recorded as their selected index, toggles as 0/1 integers.
    pub fn capture(&self, root: &str, max_depth: u32) -> Result<CaptureOutcome, EngineError> {
        let children = self
            .params
            .find_children(root, max_depth)
            .map_err(|_| EngineError::RootNotFound(root.to_string()))?;

        let mut snapshot = Snapshot::new();
        for path in children {
            if path.contains(&self.exclude_marker) {
                continue;
            }

            let infos = match self.params.enumerate_custom(&path) {
                Ok(infos) => infos,
                Err(e) => {
                    log::debug!("Skipping {} during capture: {}", path, e);
                    continue;
                }
            };
            if infos.is_empty() {
                continue;
            }

            let mut params = BTreeMap::new();
            for info in infos {
                let value = match info.style {
                    ParameterStyle::Menu => ParamValue::Int(info.value.as_i64().unwrap_or(0)),
                    ParameterStyle::Toggle => ParamValue::Int(info.value.truthy() as i64),
                    ParameterStyle::Value => info.value,
                };
                params.insert(info.name, value);
            }

            let name = path.rsplit('/').next().map(str::to_string);
            snapshot.insert(
                path,
                NodeSnapshot {
                    enabled: true,
                    name,
                    params,
                },
            );
        }

        let component_count = snapshot.len();
        log::info!(
            "Captured {} components below {} (depth {})",
            component_count,
            root,
            max_depth
        );
        Ok(CaptureOutcome {
            snapshot,
            component_count,
        })
    }

    /// Write a snapshot back through the parameter port. Disabled entries are
    /// skipped; an unresolvable node yields one entry in `errors` and the
    /// remaining nodes are still applied.
    pub fn apply(&self, snapshot: &Snapshot) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();

        for (path, node) in snapshot {
            if !node.enabled {
                continue;
            }

            let infos = match self.params.enumerate_custom(path) {
                Ok(infos) => infos,
                Err(_) => {
                    outcome.errors.push(NodeError {
                        path: path.clone(),
                        error: "Component not found".to_string(),
                    });
                    continue;
                }
            };
            let styles: HashMap<&str, ParameterStyle> =
                infos.iter().map(|p| (p.name.as_str(), p.style)).collect();

            let mut applied = 0usize;
            let mut errors = Vec::new();
            for (name, value) in &node.params {
                let coerced = match styles.get(name.as_str()) {
                    Some(ParameterStyle::Menu) => ParamValue::Int(value.as_i64().unwrap_or(0)),
                    Some(ParameterStyle::Toggle) => ParamValue::Bool(value.truthy()),
                    _ => value.clone(),
                };
                match self.params.set(path, name, &coerced) {
                    Ok(()) => applied += 1,
                    Err(e) => errors.push(ParamError {
                        param: name.clone(),
                        error: e.to_string(),
                    }),
                }
            }

            outcome.applied.push(NodeApplied {
                path: path.clone(),
                applied,
                errors: if errors.is_empty() {
                    None
                } else {
                    Some(errors)
                },
            });
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::memory::MemoryParameterPort;

    fn port_with_scene() -> Arc<MemoryParameterPort> {
        let port = Arc::new(MemoryParameterPort::new());
        port.add_node("/project");
        port.add_param(
            "/project/lights",
            "Intensity",
            ParameterStyle::Value,
            ParamValue::Float(0.75),
        );
        port.add_param(
            "/project/lights",
            "Active",
            ParameterStyle::Toggle,
            ParamValue::Bool(true),
        );
        port.add_param(
            "/project/media",
            "Source",
            ParameterStyle::Menu,
            ParamValue::Int(2),
        );
        port.add_node("/project/empty");
        port.add_param(
            "/project/cueflow_bridge/storage",
            "Rows",
            ParameterStyle::Value,
            ParamValue::Int(12),
        );
        port
    }

    fn engine(port: Arc<MemoryParameterPort>) -> SnapshotEngine {
        SnapshotEngine::new(port, "cueflow_bridge")
    }

    #[test]
    fn capture_skips_housekeeping_and_bare_nodes() {
        let engine = engine(port_with_scene());
        let outcome = engine.capture("/project", 3).unwrap();

        assert_eq!(outcome.component_count, 2);
        assert!(outcome.snapshot.contains_key("/project/lights"));
        assert!(outcome.snapshot.contains_key("/project/media"));
        assert!(!outcome.snapshot.contains_key("/project/empty"));
        assert!(!outcome
            .snapshot
            .keys()
            .any(|path| path.contains("cueflow_bridge")));
    }

    #[test]
    fn capture_coerces_toggles_and_menus_to_ints() {
        let engine = engine(port_with_scene());
        let outcome = engine.capture("/project", 3).unwrap();

        let lights = &outcome.snapshot["/project/lights"];
        assert_eq!(lights.params["Active"], ParamValue::Int(1));
        assert_eq!(lights.params["Intensity"], ParamValue::Float(0.75));
        assert_eq!(
            outcome.snapshot["/project/media"].params["Source"],
            ParamValue::Int(2)
        );
    }

    #[test]
    fn capture_fails_on_missing_root() {
        let engine = engine(port_with_scene());
        assert!(matches!(
            engine.capture("/elsewhere", 3),
            Err(EngineError::RootNotFound(_))
        ));
    }

    #[test]
    fn apply_is_best_effort_across_nodes() {
        let port = port_with_scene();
        let engine = engine(Arc::clone(&port));
        let mut snapshot = engine.capture("/project", 3).unwrap().snapshot;

        // Point one entry at a node that no longer resolves.
        let orphan = snapshot.remove("/project/media").unwrap();
        snapshot.insert("/project/gone".to_string(), orphan);
        snapshot
            .get_mut("/project/lights")
            .unwrap()
            .params
            .insert("Intensity".to_string(), ParamValue::Float(0.1));

        let outcome = engine.apply(&snapshot);

        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].path, "/project/gone");
        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(outcome.applied[0].applied, 2);
        assert_eq!(
            port.get("/project/lights", "Intensity").unwrap(),
            ParamValue::Float(0.1)
        );
    }

    #[test]
    fn apply_collects_per_parameter_errors_without_aborting() {
        let port = port_with_scene();
        let engine = engine(Arc::clone(&port));
        let mut snapshot = engine.capture("/project", 3).unwrap().snapshot;

        let lights = snapshot.get_mut("/project/lights").unwrap();
        lights
            .params
            .insert("Ghost".to_string(), ParamValue::Int(1));
        lights
            .params
            .insert("Intensity".to_string(), ParamValue::Float(0.5));

        let outcome = engine.apply(&snapshot);
        let report = outcome
            .applied
            .iter()
            .find(|n| n.path == "/project/lights")
            .unwrap();

        assert_eq!(report.applied, 2);
        let errors = report.errors.as_ref().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].param, "Ghost");
        assert_eq!(
            port.get("/project/lights", "Intensity").unwrap(),
            ParamValue::Float(0.5)
        );
    }

    #[test]
    fn apply_skips_disabled_entries() {
        let port = port_with_scene();
        let engine = engine(Arc::clone(&port));
        let mut snapshot = engine.capture("/project", 3).unwrap().snapshot;
        snapshot
            .get_mut("/project/lights")
            .unwrap()
            .params
            .insert("Intensity".to_string(), ParamValue::Float(0.0));
        snapshot.get_mut("/project/lights").unwrap().enabled = false;

        let outcome = engine.apply(&snapshot);

        assert!(outcome.applied.iter().all(|n| n.path != "/project/lights"));
        assert_eq!(
            port.get("/project/lights", "Intensity").unwrap(),
            ParamValue::Float(0.75)
        );
    }
}
