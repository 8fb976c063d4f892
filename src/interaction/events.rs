//! Toolkit-neutral input events.
//!
//! A GUI adapter translates its native mouse and keyboard events into these
//! and forwards them to anything implementing the handler traits.

use crate::model::ConnectionKey;

/// Position in device pixels relative to the canvas element's top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        meta: false,
        shift: false,
        alt: false,
    };

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerEvent {
    pub position: ScreenPoint,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: ScreenPoint::new(x, y),
            ..Default::default()
        }
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelEvent {
    pub position: ScreenPoint,
    /// Positive scrolls down (zoom out).
    pub delta_y: f32,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Delete,
    Backspace,
    Escape,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }

    pub fn command(ch: char) -> Self {
        Self {
            key: Key::Char(ch),
            modifiers: Modifiers::CTRL,
        }
    }
}

pub trait PointerEventHandler {
    fn on_down(&mut self, event: &PointerEvent);
    fn on_move(&mut self, event: &PointerEvent);
    fn on_up(&mut self, event: &PointerEvent);
    fn on_click(&mut self, event: &PointerEvent);
    fn on_double_click(&mut self, event: &PointerEvent);
    fn on_wheel(&mut self, event: &WheelEvent);
}

pub trait KeyEventHandler {
    /// Returns `true` when the key was consumed.
    fn on_key_down(&mut self, event: &KeyEvent) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NotifyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Collaborators the editor calls out to: edit dialogs, toasts, and the
/// host's frame scheduler. Every method has a no-op default.
pub trait EditorHooks {
    fn open_node_editor(&mut self, _node_id: &str) {}
    fn open_connection_editor(&mut self, _key: &ConnectionKey) {}
    fn open_lane_editor(&mut self, _lane_id: &str) {}
    fn open_phase_editor(&mut self, _phase_id: &str) {}
    /// The lane reorder menu; its choice comes back through
    /// [`crate::interaction::Editor::move_lane`].
    fn open_lane_menu(&mut self, _lane_id: &str) {}
    /// Label for a connection about to be created. An empty string means
    /// no label.
    fn prompt_connection_label(&mut self, _from: &str, _to: &str) -> String {
        String::new()
    }
    fn notify(&mut self, _level: NotifyLevel, _message: &str) {}
    /// Asks the host to call [`crate::interaction::Editor::on_animation_frame`]
    /// before the next paint.
    fn request_animation_frame(&mut self) {}
}

/// Hooks that ignore every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl EditorHooks for NoopHooks {}
