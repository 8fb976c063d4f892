use super::{
    AnchorSide, AnchorVisual, ConnectionLabel, ConnectionVisual, LaneVisual, NodeShape,
    NodeVisual, PhaseVisual, RiskBadge, SceneGraph,
};
use crate::config::{EditorConfig, LayoutConfig};
use crate::layout::{
    LaneBand, Layout, PhaseSpan, Point, Rect, compute_layout, connection_midpoint,
    label_max_width, wrap_label,
};
use crate::model::{Connection, ConnectionKey, Diagram, Node, Risk};
use crate::path_cache::PathCache;
use crate::theme::{ShapeKind, Theme};
use log::{debug, trace, warn};
use std::collections::BTreeSet;

/// Caller's preference for the next render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Patch in place when the lane and phase counts are unchanged.
    #[default]
    Auto,
    ForceFull,
}

/// What a render pass actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    Full,
    Differential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    pub kind: RenderKind,
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

impl RenderStats {
    fn new(kind: RenderKind) -> Self {
        Self {
            kind,
            created: 0,
            updated: 0,
            removed: 0,
        }
    }
}

/// Shape of the last rendered diagram, enough to decide whether a patch
/// pass is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RenderedShape {
    lanes: usize,
    phases: usize,
}

impl RenderedShape {
    fn of(diagram: &Diagram) -> Self {
        Self {
            lanes: diagram.lanes.len(),
            phases: diagram.phases.len(),
        }
    }
}

pub struct SceneRenderer {
    layout_config: LayoutConfig,
    theme: Theme,
    path_cache: PathCache,
    scene: SceneGraph,
    rendered: Option<RenderedShape>,
}

impl SceneRenderer {
    pub fn new(theme: Theme, layout_config: LayoutConfig, editor_config: &EditorConfig) -> Self {
        Self {
            path_cache: PathCache::new(editor_config.path_cache_capacity),
            layout_config,
            theme,
            scene: SceneGraph::default(),
            rendered: None,
        }
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout_config
    }

    pub fn path_cache(&self) -> &PathCache {
        &self.path_cache
    }

    /// Only lane and phase counts matter: nodes and connections are always
    /// reconciled by key.
    pub fn can_use_differential_render(old: &Diagram, new: &Diagram) -> bool {
        RenderedShape::of(old) == RenderedShape::of(new)
    }

    pub fn render(&mut self, diagram: &Diagram, mode: RenderMode) -> RenderStats {
        let eligible = self.rendered == Some(RenderedShape::of(diagram));
        if mode == RenderMode::Auto && eligible {
            self.patch(diagram)
        } else {
            self.full_render(diagram)
        }
    }

    /// Discards the scene and rebuilds every element.
    pub fn full_render(&mut self, diagram: &Diagram) -> RenderStats {
        let layout = compute_layout(diagram, &self.layout_config);
        let mut scene = SceneGraph {
            width: layout.width,
            height: layout.height,
            lanes: self.lane_visuals(diagram, &layout),
            phases: self.phase_visuals(&layout),
            ..SceneGraph::default()
        };
        for (lane, node) in diagram.nodes() {
            if let Some(center) = layout.node_center(&node.id) {
                scene
                    .nodes
                    .insert(node.id.clone(), self.node_visual(node, &lane.id, center));
            }
        }
        for conn in &diagram.connections {
            if let Some(visual) = self.connection_visual(conn, &layout) {
                scene.connections.insert(conn.key(), visual);
            }
        }

        let mut stats = RenderStats::new(RenderKind::Full);
        stats.removed = self.scene.nodes.len() + self.scene.connections.len();
        stats.created = scene.nodes.len() + scene.connections.len();
        self.scene = scene;
        self.rendered = Some(RenderedShape::of(diagram));
        debug!(
            nodes = self.scene.nodes.len(),
            connections = self.scene.connections.len();
            "full render"
        );
        stats
    }

    /// Reconciles the scene from `old` to `new`, falling back to a full
    /// render when the lane or phase count changed.
    pub fn differential_render(&mut self, old: &Diagram, new: &Diagram) -> RenderStats {
        if !Self::can_use_differential_render(old, new)
            || self.rendered != Some(RenderedShape::of(old))
        {
            return self.full_render(new);
        }
        self.patch(new)
    }

    fn patch(&mut self, diagram: &Diagram) -> RenderStats {
        let layout = compute_layout(diagram, &self.layout_config);
        let mut stats = RenderStats::new(RenderKind::Differential);
        self.scene.width = layout.width;
        self.scene.height = layout.height;

        let lanes = self.lane_visuals(diagram, &layout);
        for (slot, lane) in self.scene.lanes.iter_mut().zip(lanes) {
            if *slot != lane {
                *slot = lane;
                stats.updated += 1;
            }
        }
        let phases = self.phase_visuals(&layout);
        for (slot, phase) in self.scene.phases.iter_mut().zip(phases) {
            if *slot != phase {
                *slot = phase;
                stats.updated += 1;
            }
        }

        let mut live_nodes = BTreeSet::new();
        for (lane, node) in diagram.nodes() {
            let Some(center) = layout.node_center(&node.id) else {
                continue;
            };
            live_nodes.insert(node.id.as_str());
            let mut visual = self.node_visual(node, &lane.id, center);
            match self.scene.nodes.get_mut(&node.id) {
                Some(existing) => {
                    visual.state = existing.state;
                    if *existing != visual {
                        *existing = visual;
                        stats.updated += 1;
                    }
                }
                None => {
                    self.scene.nodes.insert(node.id.clone(), visual);
                    stats.created += 1;
                }
            }
        }
        let before = self.scene.nodes.len();
        self.scene
            .nodes
            .retain(|id, _| live_nodes.contains(id.as_str()));
        stats.removed += before - self.scene.nodes.len();

        let mut live_connections = BTreeSet::new();
        for conn in &diagram.connections {
            let Some(visual) = self.connection_visual(conn, &layout) else {
                continue;
            };
            let key = conn.key();
            match self.scene.connections.get_mut(&key) {
                Some(existing) => {
                    if *existing != visual {
                        *existing = visual;
                        stats.updated += 1;
                    }
                }
                None => {
                    self.scene.connections.insert(key.clone(), visual);
                    stats.created += 1;
                }
            }
            live_connections.insert(key);
        }
        let before = self.scene.connections.len();
        self.scene
            .connections
            .retain(|key, _| live_connections.contains(key));
        stats.removed += before - self.scene.connections.len();

        trace!(
            created = stats.created,
            updated = stats.updated,
            removed = stats.removed;
            "differential render"
        );
        stats
    }

    fn lane_visuals(&self, diagram: &Diagram, layout: &Layout) -> Vec<LaneVisual> {
        diagram
            .lanes
            .iter()
            .zip(&layout.lanes)
            .map(|(lane, band)| self.lane_visual(&lane.name, &lane.color, band, layout.width))
            .collect()
    }

    fn lane_visual(&self, name: &str, fill: &str, band: &LaneBand, canvas_width: f32) -> LaneVisual {
        let cfg = &self.layout_config;
        let rect = Rect {
            x: cfg.lane_left,
            y: band.top,
            width: canvas_width - cfg.lane_left * 2.0,
            height: band.height,
        };
        let handle = cfg.reorder_handle_size;
        LaneVisual {
            lane_id: band.lane_id.clone(),
            name: name.to_string(),
            index: band.index,
            rect,
            fill: fill.to_string(),
            label: Point::new(
                cfg.lane_left + cfg.lane_label_offset_x,
                band.top + cfg.lane_label_offset_y,
            ),
            divider_y: (band.index > 0).then(|| band.top - cfg.lane_gutter / 2.0),
            reorder_handle: Rect {
                x: rect.x + rect.width - handle - cfg.lane_gutter / 2.0,
                y: band.top + (band.height - handle) / 2.0,
                width: handle,
                height: handle,
            },
            resize_grip: Rect {
                x: rect.x,
                y: band.bottom() - cfg.resize_grip / 2.0,
                width: rect.width,
                height: cfg.resize_grip,
            },
        }
    }

    fn phase_visuals(&self, layout: &Layout) -> Vec<PhaseVisual> {
        let top = layout
            .lanes
            .first()
            .map(|band| band.top)
            .unwrap_or(self.layout_config.lane_margin_top);
        let bottom = layout.lanes.last().map(|band| band.bottom()).unwrap_or(top);
        layout
            .phases
            .iter()
            .map(|span| self.phase_visual(span, top, bottom))
            .collect()
    }

    fn phase_visual(&self, span: &PhaseSpan, top: f32, bottom: f32) -> PhaseVisual {
        PhaseVisual {
            phase_id: span.phase_id.clone(),
            name: span.name.clone(),
            start: span.start,
            end: span.end,
            divider_top: top,
            divider_bottom: bottom,
            header: Point::new(
                (span.start + span.end) / 2.0,
                top - self.layout_config.phase_header_offset,
            ),
        }
    }

    fn node_visual(&self, node: &Node, lane_id: &str, center: Point) -> NodeVisual {
        let cfg = &self.layout_config;
        let shape_kind = self.theme.node_shape(node.kind);
        let shape = match shape_kind {
            ShapeKind::Circle => NodeShape::Circle {
                radius: cfg.node_radius,
            },
            ShapeKind::Diamond => NodeShape::Diamond {
                half: cfg.node_radius,
            },
            ShapeKind::RoundedRect => NodeShape::RoundedRect {
                width: cfg.process_width,
                height: cfg.process_height,
                corner: cfg.process_corner,
            },
        };
        let anchor = |side: AnchorSide, dx: f32| AnchorVisual {
            side,
            center: Point::new(center.x + dx, center.y),
            radius: cfg.anchor_radius,
        };
        let badge_anchor = Point::new(center.x, center.y - cfg.node_badge_offset);
        NodeVisual {
            node_id: node.id.clone(),
            lane_id: lane_id.to_string(),
            kind: node.kind,
            center,
            shape,
            fill: self.theme.node_color(node.kind).to_string(),
            stroke: self.theme.node_stroke.clone(),
            icon: self.theme.node_icon(node.kind).to_string(),
            icon_pos: Point::new(center.x, center.y - 10.0),
            label: wrap_label(
                &node.text,
                label_max_width(shape_kind, cfg),
                &self.theme,
                cfg,
            ),
            label_pos: Point::new(center.x, center.y + 10.0),
            anchors: [
                anchor(AnchorSide::Left, -cfg.anchor_offset),
                anchor(AnchorSide::Right, cfg.anchor_offset),
            ],
            badges: self.badge_row(&node.risks, badge_anchor),
            tooltip: (!node.description.trim().is_empty()).then(|| node.description.clone()),
            state: Default::default(),
        }
    }

    /// `None` when an endpoint is missing: dangling connections are not drawn.
    fn connection_visual(&mut self, conn: &Connection, layout: &Layout) -> Option<ConnectionVisual> {
        let (Some(from), Some(to)) = (layout.node_center(&conn.from), layout.node_center(&conn.to))
        else {
            warn!(from = conn.from.as_str(), to = conn.to.as_str(); "skipping dangling connection");
            return None;
        };
        let path = self
            .path_cache
            .get_or_compute(&conn.from, &conn.to, from, to, &self.layout_config);
        let mid = connection_midpoint(from, to);
        let label = (!conn.label.is_empty()).then(|| ConnectionLabel {
            text: conn.label.clone(),
            position: Point::new(mid.x, mid.y - self.layout_config.connection_label_offset),
        });
        let badges = self.badge_row(
            &conn.risks,
            Point::new(mid.x, mid.y - self.layout_config.connection_badge_offset),
        );
        Some(ConnectionVisual {
            key: ConnectionKey::new(&conn.from, &conn.to),
            d: path.to_svg_d(),
            path,
            label,
            badges,
        })
    }

    /// Lays badges out in a row centered on `anchor`.
    fn badge_row(&self, risks: &[Risk], anchor: Point) -> Vec<RiskBadge> {
        let pitch = self.layout_config.badge_pitch;
        let first_x = anchor.x - (risks.len().saturating_sub(1)) as f32 * pitch / 2.0;
        risks
            .iter()
            .enumerate()
            .map(|(idx, risk)| RiskBadge {
                risk_id: risk.id.clone(),
                center: Point::new(first_x + idx as f32 * pitch, anchor.y),
                size: self.layout_config.badge_size,
                color: self.theme.badge_color(risk).to_string(),
                level: risk.level,
                title: badge_title(risk),
            })
            .collect()
    }
}

fn badge_title(risk: &Risk) -> String {
    match risk.controls.len() {
        0 => format!("{} ({}, no controls)", risk.text, risk.level.as_str()),
        1 => format!("{} ({}, 1 control)", risk.text, risk.level.as_str()),
        n => format!("{} ({}, {n} controls)", risk.text, risk.level.as_str()),
    }
}
