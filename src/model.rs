//! In-memory diagram model.
//!
//! Plain data plus the add/update/delete operations the editor invokes. Values
//! that are derived at render time (a lane's top offset, a node's vertical
//! center, node colors and icons) are deliberately absent: they live in
//! [`crate::layout::Layout`] and [`crate::theme::Theme`].

use crate::theme::Theme;
use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeKind {
    Start,
    End,
    #[default]
    Process,
    Decision,
}

impl NodeKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "start" => Some(Self::Start),
            "end" => Some(Self::End),
            "process" => Some(Self::Process),
            "decision" => Some(Self::Decision),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Process => "process",
            Self::Decision => "decision",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ControlKind {
    #[default]
    Preventive,
    Detective,
    Corrective,
}

impl ControlKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "preventive" => Some(Self::Preventive),
            "detective" => Some(Self::Detective),
            "corrective" => Some(Self::Corrective),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preventive => "preventive",
            Self::Detective => "detective",
            Self::Corrective => "corrective",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub id: String,
    pub text: String,
    pub kind: ControlKind,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Risk {
    pub id: String,
    pub text: String,
    pub level: RiskLevel,
    pub description: String,
    pub controls: Vec<Control>,
}

impl Risk {
    /// A risk with no controls is unmitigated.
    pub fn is_controlled(&self) -> bool {
        !self.controls.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub text: String,
    pub description: String,
    pub kind: NodeKind,
    /// Horizontal center. Unconstrained: may be negative or past the canvas.
    pub x: f32,
    pub risks: Vec<Risk>,
}

/// Field edits committed by the node editor. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUpdate {
    pub text: Option<String>,
    pub description: Option<String>,
    pub kind: Option<NodeKind>,
}

impl Node {
    pub fn with_update(&self, update: &NodeUpdate) -> Node {
        Node {
            id: self.id.clone(),
            text: update.text.clone().unwrap_or_else(|| self.text.clone()),
            description: update
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            kind: update.kind.unwrap_or(self.kind),
            x: self.x,
            risks: self.risks.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lane {
    pub id: String,
    pub name: String,
    pub color: String,
    pub height: f32,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub from: String,
    pub to: String,
    pub label: String,
    pub risks: Vec<Risk>,
}

impl Connection {
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey::new(&self.from, &self.to)
    }
}

/// Identity of a connection. At most one connection exists per ordered pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey {
    pub from: String,
    pub to: String,
}

impl ConnectionKey {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    pub id: String,
    pub name: String,
    /// Right boundary of the phase on the canvas.
    pub position: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseUpdate {
    pub name: Option<String>,
    pub position: Option<f32>,
}

/// Owner of a risk list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskTarget {
    Node(String),
    Connection(ConnectionKey),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Diagram {
    pub title: String,
    pub lanes: Vec<Lane>,
    pub connections: Vec<Connection>,
    pub phases: Vec<Phase>,
    id_counter: u64,
}

impl Diagram {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn find_lane(&self, lane_id: &str) -> Option<&Lane> {
        self.lanes.iter().find(|lane| lane.id == lane_id)
    }

    pub fn lane_index(&self, lane_id: &str) -> Option<usize> {
        self.lanes.iter().position(|lane| lane.id == lane_id)
    }

    pub fn find_node(&self, node_id: &str) -> Option<&Node> {
        self.nodes().map(|(_, node)| node).find(|node| node.id == node_id)
    }

    /// Lane currently owning `node_id`.
    pub fn lane_of(&self, node_id: &str) -> Option<&Lane> {
        self.lanes
            .iter()
            .find(|lane| lane.nodes.iter().any(|node| node.id == node_id))
    }

    pub fn find_connection(&self, from: &str, to: &str) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|conn| conn.from == from && conn.to == to)
    }

    pub fn find_phase(&self, phase_id: &str) -> Option<&Phase> {
        self.phases.iter().find(|phase| phase.id == phase_id)
    }

    /// Every node paired with its owning lane, in lane order.
    pub fn nodes(&self) -> impl Iterator<Item = (&Lane, &Node)> {
        self.lanes
            .iter()
            .flat_map(|lane| lane.nodes.iter().map(move |node| (lane, node)))
    }

    pub fn node_count(&self) -> usize {
        self.lanes.iter().map(|lane| lane.nodes.len()).sum()
    }

    /// Phases ordered left to right.
    pub fn sorted_phases(&self) -> Vec<&Phase> {
        let mut phases: Vec<&Phase> = self.phases.iter().collect();
        phases.sort_by(|a, b| a.position.total_cmp(&b.position));
        phases
    }

    pub fn risks(&self, target: &RiskTarget) -> Option<&[Risk]> {
        match target {
            RiskTarget::Node(id) => self.find_node(id).map(|node| node.risks.as_slice()),
            RiskTarget::Connection(key) => self
                .find_connection(&key.from, &key.to)
                .map(|conn| conn.risks.as_slice()),
        }
    }

    pub fn add_lane(&mut self, name: Option<&str>, theme: &Theme, default_height: f32) -> String {
        let id = self.next_id("lane");
        let index = self.lanes.len();
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("New Lane {}", index + 1),
        };
        self.lanes.push(Lane {
            id: id.clone(),
            name,
            color: theme.lane_color(index),
            height: default_height,
            nodes: Vec::new(),
        });
        debug!(lane_id = id.as_str(); "lane added");
        id
    }

    /// Appends a node to `lane_id`. Without an explicit `x` the node is
    /// placed after the lane's existing nodes.
    pub fn add_node(
        &mut self,
        lane_id: &str,
        kind: NodeKind,
        text: &str,
        x: Option<f32>,
    ) -> Option<String> {
        let lane_index = self.lane_index(lane_id)?;
        let id = self.next_id("node");
        let lane = &mut self.lanes[lane_index];
        let x = x.unwrap_or(150.0 + lane.nodes.len() as f32 * 200.0);
        lane.nodes.push(Node {
            id: id.clone(),
            text: text.to_string(),
            description: String::new(),
            kind,
            x,
            risks: Vec::new(),
        });
        debug!(node_id = id.as_str(), lane_id; "node added");
        Some(id)
    }

    /// Adds a directed connection. Self-loops, unknown endpoints and
    /// duplicates of an existing `(from, to)` pair are refused.
    pub fn add_connection(&mut self, from: &str, to: &str, label: &str) -> bool {
        if from == to || self.find_node(from).is_none() || self.find_node(to).is_none() {
            warn!(from, to; "connection refused: unresolved or identical endpoints");
            return false;
        }
        if self.find_connection(from, to).is_some() {
            return false;
        }
        self.connections.push(Connection {
            from: from.to_string(),
            to: to.to_string(),
            label: label.to_string(),
            risks: Vec::new(),
        });
        true
    }

    pub fn add_phase(&mut self, name: &str, position: f32) -> String {
        let id = self.next_id("phase");
        self.phases.push(Phase {
            id: id.clone(),
            name: name.to_string(),
            position,
        });
        id
    }

    pub fn add_risk(
        &mut self,
        target: &RiskTarget,
        text: &str,
        level: RiskLevel,
        description: &str,
    ) -> Option<String> {
        if self.risks(target).is_none() {
            return None;
        }
        let id = self.next_id("risk");
        let risk = Risk {
            id: id.clone(),
            text: text.to_string(),
            level,
            description: description.to_string(),
            controls: Vec::new(),
        };
        self.risks_mut(target)?.push(risk);
        Some(id)
    }

    pub fn add_control(
        &mut self,
        target: &RiskTarget,
        risk_id: &str,
        text: &str,
        kind: ControlKind,
        description: &str,
    ) -> Option<String> {
        self.risks(target)?.iter().find(|risk| risk.id == risk_id)?;
        let id = self.next_id("control");
        let risk = self
            .risks_mut(target)?
            .iter_mut()
            .find(|risk| risk.id == risk_id)?;
        risk.controls.push(Control {
            id: id.clone(),
            text: text.to_string(),
            kind,
            description: description.to_string(),
        });
        Some(id)
    }

    /// Replaces the whole risk list of a node or connection.
    pub fn set_risks(&mut self, target: &RiskTarget, risks: Vec<Risk>) -> bool {
        match self.risks_mut(target) {
            Some(slot) => {
                *slot = risks;
                true
            }
            None => false,
        }
    }

    pub fn update_node(&mut self, node_id: &str, update: &NodeUpdate) -> bool {
        match self.node_mut(node_id) {
            Some(node) => {
                *node = node.with_update(update);
                true
            }
            None => false,
        }
    }

    pub fn set_node_x(&mut self, node_id: &str, x: f32) -> bool {
        match self.node_mut(node_id) {
            Some(node) => {
                node.x = x;
                true
            }
            None => false,
        }
    }

    pub fn rename_lane(&mut self, lane_id: &str, name: &str) -> bool {
        match self.lanes.iter_mut().find(|lane| lane.id == lane_id) {
            Some(lane) => {
                lane.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Sets a lane height, clamped up to `floor`.
    pub fn set_lane_height(&mut self, lane_id: &str, height: f32, floor: f32) -> bool {
        match self.lanes.iter_mut().find(|lane| lane.id == lane_id) {
            Some(lane) => {
                lane.height = height.max(floor);
                true
            }
            None => false,
        }
    }

    pub fn update_connection(&mut self, from: &str, to: &str, label: &str) -> bool {
        match self
            .connections
            .iter_mut()
            .find(|conn| conn.from == from && conn.to == to)
        {
            Some(conn) => {
                conn.label = label.to_string();
                true
            }
            None => false,
        }
    }

    pub fn update_phase(&mut self, phase_id: &str, update: &PhaseUpdate) -> bool {
        match self.phases.iter_mut().find(|phase| phase.id == phase_id) {
            Some(phase) => {
                *phase = Phase {
                    id: phase.id.clone(),
                    name: update.name.clone().unwrap_or_else(|| phase.name.clone()),
                    position: update.position.unwrap_or(phase.position),
                };
                true
            }
            None => false,
        }
    }

    /// Removes a node and every connection touching it.
    pub fn delete_node(&mut self, node_id: &str) -> bool {
        for lane in &mut self.lanes {
            if let Some(index) = lane.nodes.iter().position(|node| node.id == node_id) {
                lane.nodes.remove(index);
                self.connections
                    .retain(|conn| conn.from != node_id && conn.to != node_id);
                debug!(node_id; "node deleted");
                return true;
            }
        }
        false
    }

    /// Removes a lane, its nodes, and every connection touching those nodes.
    pub fn delete_lane(&mut self, lane_id: &str) -> bool {
        let Some(index) = self.lane_index(lane_id) else {
            return false;
        };
        let lane = self.lanes.remove(index);
        let removed: Vec<&str> = lane.nodes.iter().map(|node| node.id.as_str()).collect();
        self.connections.retain(|conn| {
            !removed.contains(&conn.from.as_str()) && !removed.contains(&conn.to.as_str())
        });
        debug!(lane_id, nodes = removed.len(); "lane deleted");
        true
    }

    pub fn delete_connection(&mut self, from: &str, to: &str) -> bool {
        let before = self.connections.len();
        self.connections
            .retain(|conn| !(conn.from == from && conn.to == to));
        self.connections.len() != before
    }

    pub fn delete_phase(&mut self, phase_id: &str) -> bool {
        let before = self.phases.len();
        self.phases.retain(|phase| phase.id != phase_id);
        self.phases.len() != before
    }

    /// Moves a node into another lane: removed from its old lane and pushed
    /// onto the new one in a single step.
    pub fn move_node_to_lane(&mut self, node_id: &str, lane_id: &str) -> bool {
        let Some(target) = self.lane_index(lane_id) else {
            return false;
        };
        let Some(source) = self
            .lanes
            .iter()
            .position(|lane| lane.nodes.iter().any(|node| node.id == node_id))
        else {
            return false;
        };
        if source == target {
            return false;
        }
        let Some(index) = self.lanes[source]
            .nodes
            .iter()
            .position(|node| node.id == node_id)
        else {
            return false;
        };
        let node = self.lanes[source].nodes.remove(index);
        self.lanes[target].nodes.push(node);
        debug!(node_id, lane_id; "node moved to lane");
        true
    }

    /// Moves the lane at `from` so that it ends up at index `to`.
    pub fn move_lane(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.lanes.len() || to >= self.lanes.len() {
            return false;
        }
        let lane = self.lanes.remove(from);
        self.lanes.insert(to, lane);
        true
    }

    /// Drops connections whose endpoints no longer exist. Returns how many
    /// were removed.
    pub fn prune_dangling_connections(&mut self) -> usize {
        let before = self.connections.len();
        let known: Vec<String> = self.nodes().map(|(_, node)| node.id.clone()).collect();
        self.connections
            .retain(|conn| known.contains(&conn.from) && known.contains(&conn.to));
        before - self.connections.len()
    }

    fn node_mut(&mut self, node_id: &str) -> Option<&mut Node> {
        self.lanes
            .iter_mut()
            .flat_map(|lane| lane.nodes.iter_mut())
            .find(|node| node.id == node_id)
    }

    fn risks_mut(&mut self, target: &RiskTarget) -> Option<&mut Vec<Risk>> {
        match target {
            RiskTarget::Node(id) => self.node_mut(id).map(|node| &mut node.risks),
            RiskTarget::Connection(key) => self
                .connections
                .iter_mut()
                .find(|conn| conn.from == key.from && conn.to == key.to)
                .map(|conn| &mut conn.risks),
        }
    }

    /// Next unused `prefix_N` id. Ids already present in the diagram are
    /// skipped, so imported ids never collide with generated ones.
    pub fn next_id(&mut self, prefix: &str) -> String {
        loop {
            self.id_counter += 1;
            let candidate = format!("{prefix}_{}", self.id_counter);
            if !self.id_in_use(&candidate) {
                return candidate;
            }
        }
    }

    fn id_in_use(&self, id: &str) -> bool {
        let risk_uses = |risks: &[Risk]| {
            risks
                .iter()
                .any(|risk| risk.id == id || risk.controls.iter().any(|c| c.id == id))
        };
        self.lanes.iter().any(|lane| lane.id == id)
            || self.phases.iter().any(|phase| phase.id == id)
            || self
                .nodes()
                .any(|(_, node)| node.id == id || risk_uses(&node.risks))
            || self.connections.iter().any(|conn| risk_uses(&conn.risks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_lane_diagram() -> (Diagram, String, String) {
        let theme = Theme::default();
        let mut diagram = Diagram::new("Test");
        let l1 = diagram.add_lane(Some("Sales"), &theme, 140.0);
        let l2 = diagram.add_lane(Some("Ops"), &theme, 140.0);
        (diagram, l1, l2)
    }

    #[test]
    fn generated_ids_are_unique() {
        let (mut diagram, l1, l2) = two_lane_diagram();
        let a = diagram.add_node(&l1, NodeKind::Start, "A", None).unwrap();
        let b = diagram.add_node(&l2, NodeKind::End, "B", None).unwrap();
        assert_ne!(a, b);
        assert_ne!(l1, l2);
        assert!(diagram.find_node(&a).is_some());
    }

    #[test]
    fn default_node_x_follows_lane_population() {
        let (mut diagram, l1, _) = two_lane_diagram();
        let a = diagram.add_node(&l1, NodeKind::Process, "A", None).unwrap();
        let b = diagram.add_node(&l1, NodeKind::Process, "B", None).unwrap();
        assert_eq!(diagram.find_node(&a).unwrap().x, 150.0);
        assert_eq!(diagram.find_node(&b).unwrap().x, 350.0);
    }

    #[test]
    fn refuses_bad_connections() {
        let (mut diagram, l1, _) = two_lane_diagram();
        let a = diagram.add_node(&l1, NodeKind::Process, "A", None).unwrap();
        let b = diagram.add_node(&l1, NodeKind::Process, "B", None).unwrap();
        assert!(!diagram.add_connection(&a, &a, ""));
        assert!(!diagram.add_connection(&a, "missing", ""));
        assert!(diagram.add_connection(&a, &b, "go"));
        assert!(!diagram.add_connection(&a, &b, "again"));
        assert_eq!(diagram.connections.len(), 1);
    }

    #[test]
    fn delete_node_removes_only_its_connections() {
        let (mut diagram, l1, l2) = two_lane_diagram();
        let a = diagram.add_node(&l1, NodeKind::Process, "A", None).unwrap();
        let b = diagram.add_node(&l1, NodeKind::Process, "B", None).unwrap();
        let c = diagram.add_node(&l2, NodeKind::Process, "C", None).unwrap();
        diagram.add_connection(&a, &b, "");
        diagram.add_connection(&b, &c, "");
        diagram.add_connection(&c, &a, "");
        assert!(diagram.delete_node(&a));
        assert_eq!(diagram.connections.len(), 1);
        assert_eq!(diagram.connections[0].key(), ConnectionKey::new(&b, &c));
        assert!(!diagram.delete_node(&a));
    }

    #[test]
    fn delete_lane_cascades_to_connections() {
        let (mut diagram, l1, l2) = two_lane_diagram();
        let a = diagram.add_node(&l1, NodeKind::Process, "A", None).unwrap();
        let b = diagram.add_node(&l1, NodeKind::Process, "B", None).unwrap();
        let c = diagram.add_node(&l2, NodeKind::Process, "C", None).unwrap();
        let d = diagram.add_node(&l2, NodeKind::Process, "D", None).unwrap();
        diagram.add_connection(&a, &c, "");
        diagram.add_connection(&d, &b, "");
        diagram.add_connection(&c, &d, "");
        assert!(diagram.delete_lane(&l1));
        assert_eq!(diagram.lanes.len(), 1);
        assert_eq!(diagram.connections.len(), 1);
        assert_eq!(diagram.connections[0].key(), ConnectionKey::new(&c, &d));
    }

    #[test]
    fn move_node_between_lanes_is_exclusive() {
        let (mut diagram, l1, l2) = two_lane_diagram();
        let a = diagram.add_node(&l1, NodeKind::Process, "A", None).unwrap();
        assert!(diagram.move_node_to_lane(&a, &l2));
        assert!(diagram.find_lane(&l1).unwrap().nodes.is_empty());
        assert_eq!(diagram.find_lane(&l2).unwrap().nodes.len(), 1);
        assert_eq!(diagram.lane_of(&a).unwrap().id, l2);
        assert!(!diagram.move_node_to_lane(&a, &l2));
        assert!(!diagram.move_node_to_lane(&a, "nowhere"));
    }

    #[test]
    fn lane_height_respects_floor() {
        let (mut diagram, l1, _) = two_lane_diagram();
        diagram.set_lane_height(&l1, 40.0, 100.0);
        assert_eq!(diagram.find_lane(&l1).unwrap().height, 100.0);
        diagram.set_lane_height(&l1, 220.0, 100.0);
        assert_eq!(diagram.find_lane(&l1).unwrap().height, 220.0);
    }

    #[test]
    fn move_lane_reorders() {
        let (mut diagram, l1, l2) = two_lane_diagram();
        assert!(diagram.move_lane(0, 1));
        assert_eq!(diagram.lanes[0].id, l2);
        assert_eq!(diagram.lanes[1].id, l1);
        assert!(!diagram.move_lane(0, 5));
    }

    #[test]
    fn risks_and_controls_attach_to_owner() {
        let (mut diagram, l1, _) = two_lane_diagram();
        let a = diagram.add_node(&l1, NodeKind::Process, "A", None).unwrap();
        let target = RiskTarget::Node(a.clone());
        let risk = diagram
            .add_risk(&target, "Fraud", RiskLevel::High, "")
            .unwrap();
        assert!(!diagram.risks(&target).unwrap()[0].is_controlled());
        diagram
            .add_control(&target, &risk, "Review", ControlKind::Detective, "")
            .unwrap();
        assert!(diagram.risks(&target).unwrap()[0].is_controlled());
        assert!(diagram
            .add_risk(&RiskTarget::Node("ghost".into()), "x", RiskLevel::Low, "")
            .is_none());
    }

    #[test]
    fn update_node_replaces_record() {
        let (mut diagram, l1, _) = two_lane_diagram();
        let a = diagram.add_node(&l1, NodeKind::Process, "A", Some(90.0)).unwrap();
        let update = NodeUpdate {
            text: Some("Approve".into()),
            kind: Some(NodeKind::Decision),
            ..Default::default()
        };
        assert!(diagram.update_node(&a, &update));
        let node = diagram.find_node(&a).unwrap();
        assert_eq!(node.text, "Approve");
        assert_eq!(node.kind, NodeKind::Decision);
        assert_eq!(node.x, 90.0);
    }

    #[test]
    fn phases_sort_by_position() {
        let mut diagram = Diagram::new("P");
        diagram.add_phase("Late", 900.0);
        diagram.add_phase("Early", 300.0);
        let names: Vec<&str> = diagram
            .sorted_phases()
            .iter()
            .map(|phase| phase.name.as_str())
            .collect();
        assert_eq!(names, vec!["Early", "Late"]);
    }
}
