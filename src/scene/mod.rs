//! Retained scene graph.
//!
//! Every visual element is keyed by the id of the entity it draws: lanes and
//! phases by position, nodes by node id, connections by `(from, to)`. The
//! renderer reconciles against these maps instead of rebuilding them.

mod render;

pub use render::{RenderKind, RenderMode, RenderStats, SceneRenderer};

use crate::layout::{ConnectionPath, Point, Rect, TextBlock};
use crate::model::{ConnectionKey, NodeKind, RiskLevel};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneGraph {
    pub width: f32,
    pub height: f32,
    pub lanes: Vec<LaneVisual>,
    pub phases: Vec<PhaseVisual>,
    pub nodes: BTreeMap<String, NodeVisual>,
    pub connections: BTreeMap<ConnectionKey, ConnectionVisual>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaneVisual {
    pub lane_id: String,
    pub name: String,
    pub index: usize,
    pub rect: Rect,
    pub fill: String,
    pub label: Point,
    /// Separator drawn in the gutter above every lane but the first.
    pub divider_y: Option<f32>,
    pub reorder_handle: Rect,
    pub resize_grip: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseVisual {
    pub phase_id: String,
    pub name: String,
    pub start: f32,
    pub end: f32,
    pub divider_top: f32,
    pub divider_bottom: f32,
    pub header: Point,
}

impl PhaseVisual {
    /// Header strip above the lanes, used for hit testing.
    pub fn header_contains(&self, point: Point) -> bool {
        point.x >= self.start && point.x <= self.end && point.y < self.divider_top
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeShape {
    Circle { radius: f32 },
    Diamond { half: f32 },
    RoundedRect { width: f32, height: f32, corner: f32 },
}

impl NodeShape {
    pub fn contains(&self, center: Point, point: Point) -> bool {
        let dx = (point.x - center.x).abs();
        let dy = (point.y - center.y).abs();
        match *self {
            Self::Circle { radius } => dx * dx + dy * dy <= radius * radius,
            Self::Diamond { half } => dx + dy <= half,
            Self::RoundedRect { width, height, .. } => dx <= width / 2.0 && dy <= height / 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorVisual {
    pub side: AnchorSide,
    pub center: Point,
    pub radius: f32,
}

/// UI state owned by the scene, not the model. Survives differential
/// patches; a full render resets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisualState {
    pub dragging: bool,
    pub hovered: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskBadge {
    pub risk_id: String,
    pub center: Point,
    pub size: f32,
    pub color: String,
    pub level: RiskLevel,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeVisual {
    pub node_id: String,
    pub lane_id: String,
    pub kind: NodeKind,
    pub center: Point,
    pub shape: NodeShape,
    pub fill: String,
    pub stroke: String,
    pub icon: String,
    pub icon_pos: Point,
    pub label: TextBlock,
    pub label_pos: Point,
    pub anchors: [AnchorVisual; 2],
    pub badges: Vec<RiskBadge>,
    pub tooltip: Option<String>,
    pub state: VisualState,
}

impl NodeVisual {
    pub fn anchor(&self, side: AnchorSide) -> AnchorVisual {
        match side {
            AnchorSide::Left => self.anchors[0],
            AnchorSide::Right => self.anchors[1],
        }
    }

    /// Anchors are shown while the pointer is over the node.
    pub fn anchors_visible(&self) -> bool {
        self.state.hovered
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionLabel {
    pub text: String,
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionVisual {
    pub key: ConnectionKey,
    pub path: ConnectionPath,
    pub d: String,
    pub label: Option<ConnectionLabel>,
    pub badges: Vec<RiskBadge>,
}

/// What lies under a canvas point, most specific first.
#[derive(Debug, Clone, PartialEq)]
pub enum HitTarget {
    Anchor { node_id: String, side: AnchorSide },
    Node(String),
    Connection(ConnectionKey),
    LaneResize(String),
    LaneHandle(String),
    Lane(String),
    Phase(String),
    Canvas,
}

const CONNECTION_HIT_TOLERANCE: f32 = 6.0;

impl SceneGraph {
    pub fn node(&self, node_id: &str) -> Option<&NodeVisual> {
        self.nodes.get(node_id)
    }

    pub fn node_mut(&mut self, node_id: &str) -> Option<&mut NodeVisual> {
        self.nodes.get_mut(node_id)
    }

    pub fn connection(&self, key: &ConnectionKey) -> Option<&ConnectionVisual> {
        self.connections.get(key)
    }

    pub fn badge_count(&self) -> usize {
        self.nodes.values().map(|node| node.badges.len()).sum::<usize>()
            + self
                .connections
                .values()
                .map(|conn| conn.badges.len())
                .sum::<usize>()
    }

    /// Copy of the graph with all transient UI state reset, for comparing
    /// what two render passes drew.
    pub fn without_state(&self) -> SceneGraph {
        let mut graph = self.clone();
        graph.clear_state();
        graph
    }

    pub fn clear_state(&mut self) {
        for node in self.nodes.values_mut() {
            node.state = VisualState::default();
        }
    }

    pub fn hit_test(&self, point: Point) -> HitTarget {
        for node in self.nodes.values() {
            for anchor in &node.anchors {
                if anchor.center.distance(point) <= anchor.radius {
                    return HitTarget::Anchor {
                        node_id: node.node_id.clone(),
                        side: anchor.side,
                    };
                }
            }
        }
        if let Some(node) = self
            .nodes
            .values()
            .find(|node| node.shape.contains(node.center, point))
        {
            return HitTarget::Node(node.node_id.clone());
        }
        if let Some(conn) = self.connections.values().find(|conn| {
            polyline_distance(&conn.path.flatten(12), point) <= CONNECTION_HIT_TOLERANCE
        }) {
            return HitTarget::Connection(conn.key.clone());
        }
        for lane in &self.lanes {
            if lane.resize_grip.contains(point) {
                return HitTarget::LaneResize(lane.lane_id.clone());
            }
            if lane.reorder_handle.contains(point) {
                return HitTarget::LaneHandle(lane.lane_id.clone());
            }
        }
        if let Some(lane) = self.lanes.iter().find(|lane| lane.rect.contains(point)) {
            return HitTarget::Lane(lane.lane_id.clone());
        }
        if let Some(phase) = self.phases.iter().find(|phase| phase.header_contains(point)) {
            return HitTarget::Phase(phase.phase_id.clone());
        }
        HitTarget::Canvas
    }

    /// Bounding box of everything drawn, used by fit-to-content.
    pub fn content_bounds(&self) -> Option<Rect> {
        let lanes = self.lanes.iter().map(|lane| lane.rect);
        let nodes = self.nodes.values().map(|node| {
            let (w, h) = match node.shape {
                NodeShape::Circle { radius } => (radius * 2.0, radius * 2.0),
                NodeShape::Diamond { half } => (half * 2.0, half * 2.0),
                NodeShape::RoundedRect { width, height, .. } => (width, height),
            };
            Rect {
                x: node.center.x - w / 2.0,
                y: node.center.y - h / 2.0,
                width: w,
                height: h,
            }
        });
        lanes.chain(nodes).reduce(|acc, rect| acc.union(&rect))
    }
}

fn polyline_distance(points: &[Point], point: Point) -> f32 {
    points
        .windows(2)
        .map(|pair| segment_distance(pair[0], pair[1], point))
        .fold(f32::INFINITY, f32::min)
}

fn segment_distance(a: Point, b: Point, p: Point) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return a.distance(p);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    Point::new(a.x + t * dx, a.y + t * dy).distance(p)
}
