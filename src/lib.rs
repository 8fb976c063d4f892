//! Swim-lane process diagram engine.
//!
//! A [`model::Diagram`] is the single source of truth. [`layout`] derives
//! geometry from it, [`scene::SceneRenderer`] keeps a retained scene graph in
//! sync (patching in place when the lane and phase structure is unchanged),
//! and [`interaction::Editor`] drives both from pointer and keyboard events
//! with snapshot undo through [`history::History`].

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod history;
pub mod interaction;
pub mod layout;
pub mod model;
pub mod path_cache;
pub mod scene;
pub mod svg;
pub mod text_metrics;
pub mod theme;
pub mod validate;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, EditorConfig, LayoutConfig, load_config};
pub use document::{export_json, load_share_link, parse_diagram, share_url};
pub use error::{ConfigError, LoadError};
pub use history::History;
pub use interaction::Editor;
pub use model::Diagram;
pub use scene::{RenderMode, SceneRenderer};
pub use svg::render_svg;
pub use theme::Theme;
