//! The editing session: model, scene, history and the pointer state machine.

use super::events::{
    EditorHooks, Key, KeyEvent, KeyEventHandler, NotifyLevel, PointerButton, PointerEvent,
    PointerEventHandler, ScreenPoint, WheelEvent,
};
use super::throttle::FrameThrottle;
use super::viewport::Viewport;
use crate::config::Config;
use crate::document;
use crate::error::LoadError;
use crate::history::History;
use crate::layout::{Point, Rect, compute_lane_bands};
use crate::model::{
    ControlKind, Diagram, NodeKind, NodeUpdate, PhaseUpdate, Risk, RiskLevel, RiskTarget,
};
use crate::scene::{
    AnchorSide, HitTarget, RenderKind, RenderMode, RenderStats, SceneGraph, SceneRenderer,
};
use log::{debug, info, warn};

/// Preview edge drawn while a connection is being made.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionPreview {
    pub from: Point,
    pub to: Point,
}

/// Exactly one gesture is in progress at a time. Gesture-local data lives in
/// the variant, so leaving a state drops it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    DraggingNode {
        node_id: String,
        /// Pointer position minus node center at pointer-down.
        offset: Point,
        /// Whether the pre-drag snapshot has been pushed.
        saved: bool,
    },
    Connecting {
        from_node: String,
        from_side: AnchorSide,
        preview: ConnectionPreview,
    },
    ResizingLane {
        lane_id: String,
        origin_y: f32,
        start_height: f32,
        saved: bool,
    },
    Panning {
        last: ScreenPoint,
    },
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::DraggingNode { .. } => "dragging-node",
            Self::Connecting { .. } => "connecting",
            Self::ResizingLane { .. } => "resizing-lane",
            Self::Panning { .. } => "panning",
        }
    }
}

pub struct Editor {
    config: Config,
    diagram: Diagram,
    renderer: SceneRenderer,
    history: History,
    state: InteractionState,
    viewport: Viewport,
    selection: Option<String>,
    hovered: Option<String>,
    throttle: FrameThrottle<RenderMode>,
    hooks: Box<dyn EditorHooks>,
    last_render: Option<RenderStats>,
}

impl Editor {
    pub fn new(config: Config, hooks: Box<dyn EditorHooks>) -> Self {
        let renderer = SceneRenderer::new(config.theme.clone(), config.layout.clone(), &config.editor);
        let view_box = Rect {
            x: 0.0,
            y: 0.0,
            width: config.layout.default_canvas_width,
            height: 800.0,
        };
        let viewport = Viewport::new(view_box, view_box.width, view_box.height, &config.editor);
        let mut editor = Self {
            history: History::new(config.editor.history_depth),
            diagram: Diagram::default(),
            renderer,
            state: InteractionState::Idle,
            viewport,
            selection: None,
            hovered: None,
            throttle: FrameThrottle::new(),
            hooks,
            config,
            last_render: None,
        };
        editor.render(RenderMode::ForceFull);
        editor
    }

    pub fn with_diagram(config: Config, hooks: Box<dyn EditorHooks>, diagram: Diagram) -> Self {
        let mut editor = Self::new(config, hooks);
        editor.load(diagram);
        editor
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn scene(&self) -> &SceneGraph {
        self.renderer.scene()
    }

    pub fn renderer(&self) -> &SceneRenderer {
        &self.renderer
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn preview(&self) -> Option<&ConnectionPreview> {
        match &self.state {
            InteractionState::Connecting { preview, .. } => Some(preview),
            _ => None,
        }
    }

    /// Outcome of the most recent render pass.
    pub fn last_render(&self) -> Option<RenderStats> {
        self.last_render
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Replaces the whole diagram, e.g. after an import. History restarts.
    pub fn load(&mut self, diagram: Diagram) {
        self.diagram = diagram;
        self.history.clear();
        self.state = InteractionState::Idle;
        self.selection = None;
        self.hovered = None;
        self.throttle.take();
        self.render(RenderMode::ForceFull);
        self.fit_to_content();
    }

    /// Parses, validates and loads a diagram file. On failure the current
    /// diagram is untouched.
    pub fn load_json(&mut self, json: &str) -> Result<(), LoadError> {
        match document::parse_diagram(json, &self.config.theme) {
            Ok(diagram) => {
                self.load(diagram);
                self.notify(NotifyLevel::Success, "Diagram loaded");
                Ok(())
            }
            Err(err) => {
                self.notify(NotifyLevel::Error, &format!("Could not load diagram: {err}"));
                Err(err)
            }
        }
    }

    pub fn export_json(&self) -> serde_json::Result<String> {
        document::export_json(&self.diagram, &self.config.layout)
    }

    pub fn fit_to_content(&mut self) {
        if let Some(bounds) = self.renderer.scene().content_bounds() {
            self.viewport.fit_to(bounds, self.config.editor.fit_padding);
        }
    }

    pub fn notify(&mut self, level: NotifyLevel, message: &str) {
        info!(level = level.as_str(); "{message}");
        self.hooks.notify(level, message);
    }

    pub fn render(&mut self, mode: RenderMode) -> RenderStats {
        let stats = self.renderer.render(&self.diagram, mode);
        if stats.kind == RenderKind::Full {
            self.restore_visual_state();
        }
        self.last_render = Some(stats);
        stats
    }

    /// Renders whatever the last frame-throttled gesture left pending.
    pub fn on_animation_frame(&mut self) -> Option<RenderStats> {
        let mode = self.throttle.take()?;
        Some(self.render(mode))
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.undo(&self.diagram) else {
            return false;
        };
        self.restore(previous);
        debug!("undo");
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo() else {
            return false;
        };
        self.restore(next);
        debug!("redo");
        true
    }

    pub fn add_lane(&mut self, name: Option<&str>) -> String {
        let theme = self.config.theme.clone();
        let height = self.config.layout.default_lane_height;
        self.commit(RenderMode::Auto, |diagram| diagram.add_lane(name, &theme, height))
    }

    pub fn add_node(
        &mut self,
        lane_id: &str,
        kind: NodeKind,
        text: &str,
        x: Option<f32>,
    ) -> Option<String> {
        self.commit(RenderMode::Auto, |diagram| {
            diagram.add_node(lane_id, kind, text, x)
        })
    }

    pub fn add_connection(&mut self, from: &str, to: &str, label: &str) -> bool {
        self.commit(RenderMode::Auto, |diagram| {
            diagram.add_connection(from, to, label)
        })
    }

    pub fn add_phase(&mut self, name: &str, position: f32) -> String {
        self.commit(RenderMode::Auto, |diagram| diagram.add_phase(name, position))
    }

    pub fn add_risk(
        &mut self,
        target: &RiskTarget,
        text: &str,
        level: RiskLevel,
        description: &str,
    ) -> Option<String> {
        self.commit(RenderMode::Auto, |diagram| {
            diagram.add_risk(target, text, level, description)
        })
    }

    pub fn add_control(
        &mut self,
        target: &RiskTarget,
        risk_id: &str,
        text: &str,
        kind: ControlKind,
        description: &str,
    ) -> Option<String> {
        self.commit(RenderMode::Auto, |diagram| {
            diagram.add_control(target, risk_id, text, kind, description)
        })
    }

    pub fn set_risks(&mut self, target: &RiskTarget, risks: Vec<Risk>) -> bool {
        self.commit(RenderMode::Auto, |diagram| diagram.set_risks(target, risks))
    }

    pub fn update_node(&mut self, node_id: &str, update: &NodeUpdate) -> bool {
        self.commit(RenderMode::Auto, |diagram| diagram.update_node(node_id, update))
    }

    pub fn update_connection(&mut self, from: &str, to: &str, label: &str) -> bool {
        self.commit(RenderMode::Auto, |diagram| {
            diagram.update_connection(from, to, label)
        })
    }

    pub fn update_phase(&mut self, phase_id: &str, update: &PhaseUpdate) -> bool {
        self.commit(RenderMode::Auto, |diagram| {
            diagram.update_phase(phase_id, update)
        })
    }

    pub fn rename_lane(&mut self, lane_id: &str, name: &str) -> bool {
        self.commit(RenderMode::Auto, |diagram| diagram.rename_lane(lane_id, name))
    }

    pub fn set_lane_height(&mut self, lane_id: &str, height: f32) -> bool {
        let floor = self.config.layout.min_lane_height;
        self.commit(RenderMode::Auto, |diagram| {
            diagram.set_lane_height(lane_id, height, floor)
        })
    }

    /// Lane reorder always redraws from scratch.
    pub fn move_lane(&mut self, from: usize, to: usize) -> bool {
        self.commit(RenderMode::ForceFull, |diagram| diagram.move_lane(from, to))
    }

    pub fn delete_node(&mut self, node_id: &str) -> bool {
        let deleted = self.commit(RenderMode::Auto, |diagram| diagram.delete_node(node_id));
        if deleted && self.selection.as_deref() == Some(node_id) {
            self.selection = None;
        }
        deleted
    }

    pub fn delete_lane(&mut self, lane_id: &str) -> bool {
        let deleted = self.commit(RenderMode::Auto, |diagram| diagram.delete_lane(lane_id));
        self.forget_missing_nodes();
        deleted
    }

    pub fn delete_connection(&mut self, from: &str, to: &str) -> bool {
        self.commit(RenderMode::Auto, |diagram| {
            diagram.delete_connection(from, to)
        })
    }

    pub fn delete_phase(&mut self, phase_id: &str) -> bool {
        self.commit(RenderMode::Auto, |diagram| diagram.delete_phase(phase_id))
    }

    pub fn delete_selected(&mut self) -> bool {
        match self.selection.clone() {
            Some(node_id) => self.delete_node(&node_id),
            None => false,
        }
    }

    /// Applies one mutation as a single history step. The snapshot is taken
    /// before `op` runs and only kept when the diagram actually changed.
    fn commit<R>(&mut self, mode: RenderMode, op: impl FnOnce(&mut Diagram) -> R) -> R {
        let before = self.diagram.clone();
        let result = op(&mut self.diagram);
        if self.diagram != before {
            self.history.save_state(&before);
            self.render(mode);
        }
        result
    }

    fn restore(&mut self, diagram: Diagram) {
        self.diagram = diagram;
        self.state = InteractionState::Idle;
        self.throttle.take();
        self.forget_missing_nodes();
        self.render(RenderMode::ForceFull);
    }

    fn forget_missing_nodes(&mut self) {
        if let Some(id) = &self.selection {
            if self.diagram.find_node(id).is_none() {
                self.selection = None;
            }
        }
        if let Some(id) = &self.hovered {
            if self.diagram.find_node(id).is_none() {
                self.hovered = None;
            }
        }
    }

    /// Reapplies selection, hover and drag markers after a full render
    /// reset them.
    fn restore_visual_state(&mut self) {
        let dragging = match &self.state {
            InteractionState::DraggingNode { node_id, .. } => Some(node_id.clone()),
            _ => None,
        };
        let scene = self.renderer.scene_mut();
        for (id, node) in scene.nodes.iter_mut() {
            node.state.selected = self.selection.as_ref() == Some(id);
            node.state.hovered = self.hovered.as_ref() == Some(id);
            node.state.dragging = dragging.as_ref() == Some(id);
        }
    }

    /// Hovering a node or one of its anchors reveals the anchors.
    fn hover_at(&mut self, point: Point) {
        let hovered = match self.renderer.scene().hit_test(point) {
            HitTarget::Node(id) | HitTarget::Anchor { node_id: id, .. } => Some(id),
            _ => None,
        };
        self.set_hovered(hovered);
    }

    fn set_hovered(&mut self, node_id: Option<String>) {
        if self.hovered == node_id {
            return;
        }
        let scene = self.renderer.scene_mut();
        if let Some(node) = self.hovered.as_deref().and_then(|id| scene.node_mut(id)) {
            node.state.hovered = false;
        }
        if let Some(node) = node_id.as_deref().and_then(|id| scene.node_mut(id)) {
            node.state.hovered = true;
        }
        self.hovered = node_id;
    }

    fn select(&mut self, node_id: Option<String>) {
        let scene = self.renderer.scene_mut();
        if let Some(node) = self.selection.as_deref().and_then(|id| scene.node_mut(id)) {
            node.state.selected = false;
        }
        if let Some(node) = node_id.as_deref().and_then(|id| scene.node_mut(id)) {
            node.state.selected = true;
        }
        self.selection = node_id;
    }

    fn set_dragging_marker(&mut self, node_id: &str, dragging: bool) {
        if let Some(node) = self.renderer.scene_mut().node_mut(node_id) {
            node.state.dragging = dragging;
        }
    }

    fn transition(&mut self, next: InteractionState) {
        debug!(from = self.state.name(), to = next.name(); "interaction state");
        self.state = next;
    }

    fn schedule_render(&mut self) {
        if self.throttle.schedule(RenderMode::Auto) {
            self.hooks.request_animation_frame();
        }
    }

    fn flush_pending_render(&mut self) {
        if let Some(mode) = self.throttle.take() {
            self.render(mode);
        }
    }

    fn start_drag(&mut self, node_id: String, pointer: Point) {
        let Some(center) = self.renderer.scene().node(&node_id).map(|node| node.center) else {
            return;
        };
        let offset = Point::new(pointer.x - center.x, pointer.y - center.y);
        self.set_dragging_marker(&node_id, true);
        self.transition(InteractionState::DraggingNode {
            node_id,
            offset,
            saved: false,
        });
    }

    /// Moves the dragged node in the model right away and defers the redraw
    /// to the next frame.
    fn drag_to(&mut self, pointer: Point) {
        let InteractionState::DraggingNode {
            node_id,
            offset,
            saved,
        } = &mut self.state
        else {
            return;
        };
        let node_id = node_id.clone();
        let target = Point::new(pointer.x - offset.x, pointer.y - offset.y);
        let Some(current_x) = self.diagram.find_node(&node_id).map(|node| node.x) else {
            return;
        };
        let current_lane = self.diagram.lane_of(&node_id).map(|lane| lane.id.clone());
        let bands = compute_lane_bands(&self.diagram, &self.config.layout);
        let new_lane = bands
            .iter()
            .find(|band| band.contains_y(target.y))
            .map(|band| band.lane_id.clone())
            .filter(|lane_id| current_lane.as_deref() != Some(lane_id.as_str()));
        if target.x == current_x && new_lane.is_none() {
            return;
        }
        if !*saved {
            *saved = true;
            self.history.save_state(&self.diagram);
        }
        self.diagram.set_node_x(&node_id, target.x);
        if let Some(lane_id) = new_lane {
            self.diagram.move_node_to_lane(&node_id, &lane_id);
        }
        self.schedule_render();
    }

    fn resize_to(&mut self, pointer: Point) {
        let InteractionState::ResizingLane {
            lane_id,
            origin_y,
            start_height,
            saved,
        } = &mut self.state
        else {
            return;
        };
        let floor = self.config.layout.min_lane_height;
        let height = (*start_height + (pointer.y - *origin_y)).max(floor);
        let lane_id = lane_id.clone();
        let Some(current) = self.diagram.find_lane(&lane_id).map(|lane| lane.height) else {
            return;
        };
        if height == current {
            return;
        }
        if !*saved {
            *saved = true;
            self.history.save_state(&self.diagram);
        }
        self.diagram.set_lane_height(&lane_id, height, floor);
        self.schedule_render();
    }

    fn start_connecting(&mut self, node_id: String, side: AnchorSide) {
        let Some(node) = self.renderer.scene().node(&node_id) else {
            warn!(node_id = node_id.as_str(); "anchor without a node");
            return;
        };
        let from = node.anchor(side).center;
        self.transition(InteractionState::Connecting {
            from_node: node_id,
            from_side: side,
            preview: ConnectionPreview { from, to: from },
        });
    }

    fn finish_connecting(&mut self, to_node: &str) {
        let InteractionState::Connecting { from_node, .. } = &self.state else {
            return;
        };
        let from_node = from_node.clone();
        if from_node != to_node && self.diagram.find_node(to_node).is_some() {
            let label = self.hooks.prompt_connection_label(&from_node, to_node);
            self.add_connection(&from_node, to_node, &label);
        }
        self.cancel_connecting();
    }

    fn cancel_connecting(&mut self) {
        if matches!(self.state, InteractionState::Connecting { .. }) {
            self.transition(InteractionState::Idle);
        }
    }

    fn canvas_point(&self, event: &PointerEvent) -> Point {
        self.viewport.screen_to_canvas(event.position)
    }
}

impl PointerEventHandler for Editor {
    fn on_down(&mut self, event: &PointerEvent) {
        if self.state != InteractionState::Idle {
            return;
        }
        if event.button == PointerButton::Middle {
            self.transition(InteractionState::Panning {
                last: event.position,
            });
            return;
        }
        if event.button != PointerButton::Primary {
            return;
        }
        let point = self.canvas_point(event);
        match self.renderer.scene().hit_test(point) {
            // Anchors act on click.
            HitTarget::Anchor { .. } => {}
            HitTarget::Node(node_id) => self.start_drag(node_id, point),
            HitTarget::LaneResize(lane_id) => {
                if let Some(lane) = self.diagram.find_lane(&lane_id) {
                    let start_height = lane.height;
                    self.transition(InteractionState::ResizingLane {
                        lane_id,
                        origin_y: point.y,
                        start_height,
                        saved: false,
                    });
                }
            }
            HitTarget::LaneHandle(lane_id) => self.hooks.open_lane_menu(&lane_id),
            HitTarget::Connection(_)
            | HitTarget::Lane(_)
            | HitTarget::Phase(_)
            | HitTarget::Canvas => self.transition(InteractionState::Panning {
                last: event.position,
            }),
        }
    }

    fn on_move(&mut self, event: &PointerEvent) {
        let point = self.canvas_point(event);
        match &mut self.state {
            InteractionState::Idle => self.hover_at(point),
            InteractionState::DraggingNode { .. } => self.drag_to(point),
            InteractionState::ResizingLane { .. } => self.resize_to(point),
            InteractionState::Connecting { preview, .. } => {
                preview.to = point;
                self.hover_at(point);
            }
            InteractionState::Panning { last } => {
                let (dx, dy) = (event.position.x - last.x, event.position.y - last.y);
                *last = event.position;
                self.viewport.pan(dx, dy);
            }
        }
    }

    fn on_up(&mut self, _event: &PointerEvent) {
        match &self.state {
            InteractionState::DraggingNode { node_id, .. } => {
                let node_id = node_id.clone();
                self.flush_pending_render();
                self.set_dragging_marker(&node_id, false);
                self.transition(InteractionState::Idle);
            }
            InteractionState::ResizingLane { .. } => {
                self.flush_pending_render();
                self.transition(InteractionState::Idle);
            }
            InteractionState::Panning { .. } => self.transition(InteractionState::Idle),
            InteractionState::Idle | InteractionState::Connecting { .. } => {}
        }
    }

    fn on_click(&mut self, event: &PointerEvent) {
        if event.button != PointerButton::Primary {
            return;
        }
        let point = self.canvas_point(event);
        let hit = self.renderer.scene().hit_test(point);
        let idle = self.state == InteractionState::Idle;
        let connecting = matches!(self.state, InteractionState::Connecting { .. });
        match hit {
            HitTarget::Anchor { node_id, side } if idle => self.start_connecting(node_id, side),
            HitTarget::Anchor { node_id, .. } if connecting => self.finish_connecting(&node_id),
            HitTarget::Node(node_id) if idle => self.select(Some(node_id)),
            HitTarget::Lane(_) | HitTarget::Canvas if idle => self.select(None),
            _ => {}
        }
    }

    fn on_double_click(&mut self, event: &PointerEvent) {
        if self.state != InteractionState::Idle {
            return;
        }
        let point = self.canvas_point(event);
        match self.renderer.scene().hit_test(point) {
            HitTarget::Node(id) if self.diagram.find_node(&id).is_some() => {
                self.hooks.open_node_editor(&id)
            }
            HitTarget::Connection(key) if self.diagram.find_connection(&key.from, &key.to).is_some() => {
                self.hooks.open_connection_editor(&key)
            }
            HitTarget::Lane(id) if self.diagram.find_lane(&id).is_some() => {
                self.hooks.open_lane_editor(&id)
            }
            HitTarget::Phase(id) if self.diagram.find_phase(&id).is_some() => {
                self.hooks.open_phase_editor(&id)
            }
            _ => {}
        }
    }

    fn on_wheel(&mut self, event: &WheelEvent) {
        if event.delta_y == 0.0 {
            return;
        }
        let editor = &self.config.editor;
        let factor = if event.delta_y < 0.0 {
            editor.zoom_step
        } else {
            editor.zoom_out_step
        };
        if !self.viewport.zoom_at(factor, event.position) {
            debug!(factor; "zoom rejected at limit");
        }
    }
}

impl KeyEventHandler for Editor {
    fn on_key_down(&mut self, event: &KeyEvent) -> bool {
        if event.modifiers.command() {
            return match event.key {
                Key::Char('z') | Key::Char('Z') if event.modifiers.shift => self.redo(),
                Key::Char('z') | Key::Char('Z') => self.undo(),
                Key::Char('y') | Key::Char('Y') => self.redo(),
                _ => false,
            };
        }
        match event.key {
            Key::Escape => {
                let connecting = matches!(self.state, InteractionState::Connecting { .. });
                self.cancel_connecting();
                connecting
            }
            Key::Delete | Key::Backspace if self.state == InteractionState::Idle => {
                self.delete_selected()
            }
            _ => false,
        }
    }
}
