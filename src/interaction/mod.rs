//! Interaction controller: turns pointer and keyboard input into model
//! mutations and render passes.

mod controller;
mod events;
mod throttle;
mod viewport;

pub use controller::{ConnectionPreview, Editor, InteractionState};
pub use events::{
    EditorHooks, Key, KeyEvent, KeyEventHandler, Modifiers, NoopHooks, NotifyLevel,
    PointerButton, PointerEvent, PointerEventHandler, ScreenPoint, WheelEvent,
};
pub use throttle::FrameThrottle;
pub use viewport::Viewport;
