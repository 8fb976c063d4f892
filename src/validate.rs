//! Sanitising import of untrusted diagram JSON.
//!
//! Validation is all-or-nothing: either a complete [`Diagram`] comes back or
//! an error does. Structural problems (wrong types, too many entities) are
//! errors; soft problems (unknown enum tokens, out-of-range numbers, dangling
//! connections) are repaired with a warning.

use crate::error::LoadError;
use crate::model::{
    Connection, Control, ControlKind, Diagram, Lane, Node, NodeKind, Phase, Risk, RiskLevel,
};
use crate::theme::Theme;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;

static ID_INVALID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct Limits {
    pub max_bytes: usize,
    pub max_text: usize,
    pub max_id: usize,
    pub max_lanes: usize,
    pub max_nodes_per_lane: usize,
    pub max_connections: usize,
    pub max_phases: usize,
    pub lane_height: (f32, f32),
    pub default_lane_height: f32,
    pub phase_position: (f32, f32),
    pub default_phase_position: f32,
    pub default_node_x: f32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
            max_text: 1000,
            max_id: 50,
            max_lanes: 20,
            max_nodes_per_lane: 50,
            max_connections: 200,
            max_phases: 20,
            lane_height: (100.0, 500.0),
            default_lane_height: 140.0,
            phase_position: (20.0, 10_000.0),
            default_phase_position: 400.0,
            default_node_x: 100.0,
        }
    }
}

pub fn validate_diagram(value: &Value, theme: &Theme) -> Result<Diagram, LoadError> {
    validate_with_limits(value, theme, &Limits::default())
}

pub fn validate_with_limits(
    value: &Value,
    theme: &Theme,
    limits: &Limits,
) -> Result<Diagram, LoadError> {
    let root = value
        .as_object()
        .ok_or_else(|| invalid("expected an object"))?;
    let size = serde_json::to_vec(value)?.len();
    if size > limits.max_bytes {
        return Err(LoadError::TooLarge {
            actual: size,
            limit: limits.max_bytes,
        });
    }

    let title = match root.get("title") {
        None | Some(Value::Null) => "Untitled Process",
        Some(Value::String(title)) if title.is_empty() => "Untitled Process",
        Some(Value::String(title)) => title.as_str(),
        Some(_) => return Err(invalid("title must be a string")),
    };
    let mut diagram = Diagram::new(sanitize_text(title, limits));

    let lanes = root
        .get("lanes")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("lanes must be an array"))?;
    if lanes.len() > limits.max_lanes {
        return Err(invalid(format!(
            "too many lanes: maximum is {}",
            limits.max_lanes
        )));
    }
    let mut lane_ids = HashSet::new();
    let mut node_ids = HashSet::new();
    for (index, lane) in lanes.iter().enumerate() {
        let lane = validate_lane(lane, index, theme, limits, &mut node_ids)?;
        if !lane.id.is_empty() && !lane_ids.insert(lane.id.clone()) {
            return Err(invalid(format!("duplicate lane id `{}`", lane.id)));
        }
        diagram.lanes.push(lane);
    }

    let phases = optional_array(root, "phases")?;
    if phases.len() > limits.max_phases {
        return Err(invalid(format!(
            "too many phases: maximum is {}",
            limits.max_phases
        )));
    }
    let mut phase_ids = HashSet::new();
    for (index, phase) in phases.iter().enumerate() {
        let phase = validate_phase(phase, index, limits)?;
        if !phase.id.is_empty() && !phase_ids.insert(phase.id.clone()) {
            return Err(invalid(format!("duplicate phase id `{}`", phase.id)));
        }
        diagram.phases.push(phase);
    }

    let connections = optional_array(root, "connections")?;
    if connections.len() > limits.max_connections {
        return Err(invalid(format!(
            "too many connections: maximum is {}",
            limits.max_connections
        )));
    }
    for (index, conn) in connections.iter().enumerate() {
        let conn = validate_connection(conn, index, limits)?;
        if conn.from == conn.to
            || !node_ids.contains(&conn.from)
            || !node_ids.contains(&conn.to)
        {
            warn!(from = conn.from.as_str(), to = conn.to.as_str(); "dropping connection with unresolved endpoint");
            continue;
        }
        if diagram.find_connection(&conn.from, &conn.to).is_some() {
            warn!(from = conn.from.as_str(), to = conn.to.as_str(); "dropping duplicate connection");
            continue;
        }
        diagram.connections.push(conn);
    }

    assign_missing_ids(&mut diagram);
    Ok(diagram)
}

fn validate_lane(
    value: &Value,
    index: usize,
    theme: &Theme,
    limits: &Limits,
    node_ids: &mut HashSet<String>,
) -> Result<Lane, LoadError> {
    let lane = value
        .as_object()
        .ok_or_else(|| invalid(format!("invalid lane at index {index}")))?;
    let id = lane
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| invalid(format!("lane at index {index} missing valid id")))?;
    let name = text_or(lane, "name", &format!("Lane {}", index + 1), limits);

    let nodes = optional_array(lane, "nodes")?;
    if nodes.len() > limits.max_nodes_per_lane {
        return Err(invalid(format!(
            "too many nodes in lane {name}: maximum is {}",
            limits.max_nodes_per_lane
        )));
    }
    let mut kept = Vec::with_capacity(nodes.len());
    for (node_index, node) in nodes.iter().enumerate() {
        let node = validate_node(node, index, node_index, limits)?;
        if !node.id.is_empty() && !node_ids.insert(node.id.clone()) {
            warn!(node_id = node.id.as_str(); "dropping node with duplicate id");
            continue;
        }
        kept.push(node);
    }

    let (min, max) = limits.lane_height;
    Ok(Lane {
        id: sanitize_id(id, limits),
        name,
        color: theme.lane_color(index),
        height: number(lane.get("height"))
            .map(|height| height.clamp(min, max))
            .unwrap_or(limits.default_lane_height),
        nodes: kept,
    })
}

fn validate_node(
    value: &Value,
    lane_index: usize,
    node_index: usize,
    limits: &Limits,
) -> Result<Node, LoadError> {
    let node = value.as_object().ok_or_else(|| {
        invalid(format!(
            "invalid node at lane {lane_index}, node {node_index}"
        ))
    })?;
    let x = node
        .get("position")
        .and_then(|position| number(position.get("x")))
        .unwrap_or(limits.default_node_x);
    Ok(Node {
        id: id_or_empty(node.get("id"), limits),
        text: text_or(node, "text", "New Node", limits),
        description: text_or(node, "description", "", limits),
        kind: node
            .get("type")
            .and_then(Value::as_str)
            .and_then(NodeKind::from_token)
            .unwrap_or_default(),
        x,
        risks: validate_risks(node.get("risks"), limits),
    })
}

fn validate_phase(value: &Value, index: usize, limits: &Limits) -> Result<Phase, LoadError> {
    let phase = value
        .as_object()
        .ok_or_else(|| invalid(format!("invalid phase at index {index}")))?;
    let id = phase
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| invalid(format!("phase at index {index} missing valid id")))?;
    let (min, max) = limits.phase_position;
    Ok(Phase {
        id: sanitize_id(id, limits),
        name: text_or(phase, "name", &format!("Phase {}", index + 1), limits),
        position: number(phase.get("position"))
            .map(|position| position.clamp(min, max))
            .unwrap_or(limits.default_phase_position),
    })
}

fn validate_connection(value: &Value, index: usize, limits: &Limits) -> Result<Connection, LoadError> {
    let conn = value
        .as_object()
        .ok_or_else(|| invalid(format!("invalid connection at index {index}")))?;
    Ok(Connection {
        from: id_or_empty(conn.get("from"), limits),
        to: id_or_empty(conn.get("to"), limits),
        label: text_or(conn, "label", "", limits),
        risks: validate_risks(conn.get("risks"), limits),
    })
}

fn validate_risks(value: Option<&Value>, limits: &Limits) -> Vec<Risk> {
    let Some(risks) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    risks
        .iter()
        .filter_map(Value::as_object)
        .map(|risk| Risk {
            id: id_or_empty(risk.get("id"), limits),
            text: text_or(risk, "text", "Unnamed risk", limits),
            level: risk
                .get("level")
                .and_then(Value::as_str)
                .and_then(RiskLevel::from_token)
                .unwrap_or_default(),
            description: text_or(risk, "description", "", limits),
            controls: validate_controls(risk.get("controls"), limits),
        })
        .collect()
}

fn validate_controls(value: Option<&Value>, limits: &Limits) -> Vec<Control> {
    let Some(controls) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    controls
        .iter()
        .filter_map(Value::as_object)
        .map(|control| Control {
            id: id_or_empty(control.get("id"), limits),
            text: text_or(control, "text", "Unnamed control", limits),
            kind: control
                .get("type")
                .and_then(Value::as_str)
                .and_then(ControlKind::from_token)
                .unwrap_or_default(),
            description: text_or(control, "description", "", limits),
        })
        .collect()
}

/// Fills ids that were missing or sanitised away. Runs after every imported
/// id is in place so generated ids cannot collide with them.
fn assign_missing_ids(diagram: &mut Diagram) {
    let mut pending = Vec::new();
    for (l, lane) in diagram.lanes.iter().enumerate() {
        if lane.id.is_empty() {
            pending.push(IdSlot::Lane(l));
        }
        for (n, node) in lane.nodes.iter().enumerate() {
            if node.id.is_empty() {
                pending.push(IdSlot::Node(l, n));
            }
            collect_risk_slots(&node.risks, RiskOwner::Node(l, n), &mut pending);
        }
    }
    for (p, phase) in diagram.phases.iter().enumerate() {
        if phase.id.is_empty() {
            pending.push(IdSlot::Phase(p));
        }
    }
    for (c, conn) in diagram.connections.iter().enumerate() {
        collect_risk_slots(&conn.risks, RiskOwner::Connection(c), &mut pending);
    }

    for slot in pending {
        let id = diagram.next_id(slot.prefix());
        match slot {
            IdSlot::Lane(l) => diagram.lanes[l].id = id,
            IdSlot::Node(l, n) => diagram.lanes[l].nodes[n].id = id,
            IdSlot::Phase(p) => diagram.phases[p].id = id,
            IdSlot::Risk(owner, r) => owner.risks(diagram)[r].id = id,
            IdSlot::Control(owner, r, c) => owner.risks(diagram)[r].controls[c].id = id,
        }
    }
}

fn collect_risk_slots(risks: &[Risk], owner: RiskOwner, pending: &mut Vec<IdSlot>) {
    for (r, risk) in risks.iter().enumerate() {
        if risk.id.is_empty() {
            pending.push(IdSlot::Risk(owner, r));
        }
        for (c, control) in risk.controls.iter().enumerate() {
            if control.id.is_empty() {
                pending.push(IdSlot::Control(owner, r, c));
            }
        }
    }
}

#[derive(Clone, Copy)]
enum RiskOwner {
    Node(usize, usize),
    Connection(usize),
}

impl RiskOwner {
    fn risks(self, diagram: &mut Diagram) -> &mut Vec<Risk> {
        match self {
            Self::Node(l, n) => &mut diagram.lanes[l].nodes[n].risks,
            Self::Connection(c) => &mut diagram.connections[c].risks,
        }
    }
}

enum IdSlot {
    Lane(usize),
    Node(usize, usize),
    Phase(usize),
    Risk(RiskOwner, usize),
    Control(RiskOwner, usize, usize),
}

impl IdSlot {
    fn prefix(&self) -> &'static str {
        match self {
            Self::Lane(_) => "lane",
            Self::Node(..) => "node",
            Self::Phase(_) => "phase",
            Self::Risk(..) => "risk",
            Self::Control(..) => "control",
        }
    }
}

/// Keeps `[A-Za-z0-9_-]` only, truncated to the id length limit.
pub fn sanitize_id(id: &str, limits: &Limits) -> String {
    ID_INVALID
        .replace_all(id, "")
        .chars()
        .take(limits.max_id)
        .collect()
}

pub fn sanitize_text(text: &str, limits: &Limits) -> String {
    text.chars().take(limits.max_text).collect()
}

fn id_or_empty(value: Option<&Value>, limits: &Limits) -> String {
    value
        .and_then(Value::as_str)
        .map(|id| sanitize_id(id, limits))
        .unwrap_or_default()
}

fn text_or(object: &Map<String, Value>, key: &str, fallback: &str, limits: &Limits) -> String {
    match object.get(key).and_then(Value::as_str) {
        Some(text) if !text.is_empty() => sanitize_text(text, limits),
        _ => sanitize_text(fallback, limits),
    }
}

/// Numbers and numeric strings; anything non-finite is treated as absent.
fn number(value: Option<&Value>) -> Option<f32> {
    let number = match value? {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    // Finite f64 values past the f32 range narrow to infinity.
    let number = number as f32;
    number.is_finite().then_some(number)
}

fn optional_array<'a>(object: &'a Map<String, Value>, key: &str) -> Result<&'a [Value], LoadError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(invalid(format!("{key} must be an array"))),
    }
}

fn invalid(message: impl Into<String>) -> LoadError {
    LoadError::Invalid(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(value: Value) -> Result<Diagram, LoadError> {
        validate_diagram(&value, &Theme::default())
    }

    #[test]
    fn numbers_past_f32_range_fall_back() {
        let diagram = validate(json!({
            "lanes": [{
                "id": "wide",
                "height": 1e300,
                "nodes": [{"id": "far", "position": {"x": 1e300}}]
            }],
            "phases": [{"id": "p", "position": -1e300}]
        }))
        .unwrap();
        let node = diagram.find_node("far").unwrap();
        assert_eq!(node.x, 100.0);
        assert!(diagram.lanes[0].height.is_finite());
        assert!(diagram.phases[0].position.is_finite());
    }

    #[test]
    fn repairs_soft_problems() {
        let diagram = validate(json!({
            "lanes": [{
                "id": "lane one!",
                "height": 20,
                "color": "javascript:alert(1)",
                "nodes": [
                    {"id": "n1", "type": "wizard", "position": {"x": -40, "y": 999}},
                    {"id": "n2", "text": "Ship", "risks": [{"level": "extreme", "controls": [{}]}]}
                ]
            }],
            "phases": [{"id": "p1", "position": 5}],
            "connections": [
                {"from": "n1", "to": "n2"},
                {"from": "n1", "to": "n2", "label": "dup"},
                {"from": "n1", "to": "ghost"}
            ],
            "extra": true
        }))
        .unwrap();

        assert_eq!(diagram.title, "Untitled Process");
        let lane = &diagram.lanes[0];
        assert_eq!(lane.id, "laneone");
        assert_eq!(lane.height, 100.0);
        assert_eq!(lane.color, Theme::default().lane_color(0));
        assert_eq!(lane.nodes[0].kind, NodeKind::Process);
        assert_eq!(lane.nodes[0].x, -40.0);
        assert_eq!(lane.nodes[0].text, "New Node");
        let risk = &lane.nodes[1].risks[0];
        assert_eq!(risk.level, RiskLevel::Medium);
        assert!(!risk.id.is_empty());
        assert_eq!(risk.controls[0].kind, ControlKind::Preventive);
        assert!(!risk.controls[0].id.is_empty());
        assert_eq!(diagram.phases[0].position, 20.0);
        assert_eq!(diagram.connections.len(), 1);
    }

    #[test]
    fn rejects_structural_problems() {
        assert!(matches!(validate(json!([])), Err(LoadError::Invalid(_))));
        assert!(matches!(validate(json!({"title": 3, "lanes": []})), Err(LoadError::Invalid(_))));
        assert!(matches!(validate(json!({"lanes": {}})), Err(LoadError::Invalid(_))));
        assert!(matches!(
            validate(json!({"lanes": [{"name": "no id"}]})),
            Err(LoadError::Invalid(_))
        ));
        let lanes: Vec<Value> = (0..21).map(|i| json!({"id": format!("l{i}")})).collect();
        assert!(matches!(validate(json!({"lanes": lanes})), Err(LoadError::Invalid(_))));
    }

    #[test]
    fn duplicate_node_ids_keep_first() {
        let diagram = validate(json!({"lanes": [
            {"id": "a", "nodes": [{"id": "n", "text": "first"}]},
            {"id": "b", "nodes": [{"id": "n", "text": "second"}]}
        ]}))
        .unwrap();
        assert_eq!(diagram.node_count(), 1);
        assert_eq!(diagram.find_node("n").unwrap().text, "first");
    }

    #[test]
    fn generated_ids_avoid_imported_ones() {
        let diagram = validate(json!({"lanes": [
            {"id": "lane", "nodes": [{"id": "node_1"}, {"text": "anonymous"}]}
        ]}))
        .unwrap();
        let ids: Vec<&str> = diagram.lanes[0].nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["node_1", "node_2"]);
    }

    #[test]
    fn long_text_is_truncated() {
        let long = "x".repeat(1500);
        let diagram = validate(json!({"title": long, "lanes": []})).unwrap();
        assert_eq!(diagram.title.chars().count(), 1000);
    }

    #[test]
    fn sanitizes_ids() {
        let limits = Limits::default();
        assert_eq!(sanitize_id("a b<c>-d_9", &limits), "abc-d_9");
        assert_eq!(sanitize_id(&"z".repeat(80), &limits).len(), 50);
    }
}
