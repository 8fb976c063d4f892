use crate::error::ConfigError;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub lane_margin_top: f32,
    pub lane_gutter: f32,
    pub lane_left: f32,
    pub lane_label_offset_x: f32,
    pub lane_label_offset_y: f32,
    pub lane_center_offset: f32,
    pub default_lane_height: f32,
    pub min_lane_height: f32,
    pub default_canvas_width: f32,
    pub phase_padding: f32,
    pub canvas_margin_bottom: f32,
    pub phase_header_offset: f32,
    pub resize_grip: f32,
    pub reorder_handle_size: f32,
    pub node_radius: f32,
    pub process_width: f32,
    pub process_height: f32,
    pub process_corner: f32,
    pub anchor_offset: f32,
    pub anchor_radius: f32,
    pub straight_threshold: f32,
    pub curve_gap_threshold: f32,
    pub max_control_offset: f32,
    pub detour_min: f32,
    pub detour_ratio: f32,
    pub connection_label_offset: f32,
    pub badge_pitch: f32,
    pub badge_size: f32,
    pub node_badge_offset: f32,
    pub connection_badge_offset: f32,
    pub label_max_width_process: f32,
    pub label_max_width_decision: f32,
    pub label_max_width_circle: f32,
    pub label_max_lines: usize,
    pub label_line_height: f32,
    pub fast_text_metrics: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            lane_margin_top: 50.0,
            lane_gutter: 10.0,
            lane_left: 20.0,
            lane_label_offset_x: 20.0,
            lane_label_offset_y: 30.0,
            lane_center_offset: 70.0,
            default_lane_height: 140.0,
            min_lane_height: 100.0,
            default_canvas_width: 1440.0,
            phase_padding: 100.0,
            canvas_margin_bottom: 50.0,
            phase_header_offset: 15.0,
            resize_grip: 6.0,
            reorder_handle_size: 30.0,
            node_radius: 35.0,
            process_width: 100.0,
            process_height: 50.0,
            process_corner: 25.0,
            anchor_offset: 35.0,
            anchor_radius: 8.0,
            straight_threshold: 10.0,
            curve_gap_threshold: 100.0,
            max_control_offset: 150.0,
            detour_min: 50.0,
            detour_ratio: 0.3,
            connection_label_offset: 5.0,
            badge_pitch: 30.0,
            badge_size: 20.0,
            node_badge_offset: 50.0,
            connection_badge_offset: 20.0,
            label_max_width_process: 90.0,
            label_max_width_decision: 50.0,
            label_max_width_circle: 60.0,
            label_max_lines: 3,
            label_line_height: 1.2,
            fast_text_metrics: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub history_depth: usize,
    pub path_cache_capacity: usize,
    pub min_view_width: f32,
    pub max_view_width: f32,
    /// Wheel-up zoom factor.
    pub zoom_step: f32,
    /// Wheel-down zoom factor.
    pub zoom_out_step: f32,
    pub fit_padding: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: 50,
            path_cache_capacity: 100,
            min_view_width: 200.0,
            max_view_width: 10_000.0,
            zoom_step: 1.1,
            zoom_out_step: 0.9,
            fit_padding: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub editor: EditorConfig,
}

/// Loads a config file and overlays it on the defaults. The file may be JSON
/// or JSON5 and may name a base theme with `"themeName"`.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    let overlay: serde_json::Value = match serde_json::from_str(contents) {
        Ok(value) => value,
        Err(_) => json5::from_str(contents).map_err(|err| ConfigError::Parse(err.to_string()))?,
    };

    let mut base = Config::default();
    if let Some(name) = overlay.get("themeName").and_then(|v| v.as_str()) {
        base.theme = Theme::by_name(name).ok_or_else(|| ConfigError::UnknownTheme(name.to_string()))?;
    }

    let mut merged =
        serde_json::to_value(&base).map_err(|err| ConfigError::Parse(err.to_string()))?;
    merge_json(&mut merged, &overlay);
    if let Some(object) = merged.as_object_mut() {
        object.remove("themeName");
    }
    let config: Config =
        serde_json::from_value(merged).map_err(|err| ConfigError::Parse(err.to_string()))?;
    log::debug!(history_depth = config.editor.history_depth; "config loaded");
    Ok(config)
}

fn merge_json(base: &mut serde_json::Value, overlay: &serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}
