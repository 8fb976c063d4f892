use crate::model::{NodeKind, Risk, RiskLevel};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Circle,
    Diamond,
    RoundedRect,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeColors {
    pub start: String,
    pub end: String,
    pub process: String,
    pub decision: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RiskColors {
    pub low: String,
    pub medium: String,
    pub high: String,
    pub critical: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub icon_font_size: f32,
    pub text_color: String,
    pub node_text_color: String,
    pub node_stroke: String,
    pub node_colors: NodeColors,
    pub lane_palette: Vec<String>,
    pub lane_stroke: String,
    pub line_color: String,
    pub label_color: String,
    pub phase_line_color: String,
    pub anchor_fill: String,
    /// Badge fill for a risk with at least one control.
    pub badge_controlled: String,
    /// Badge fill for a risk with no controls.
    pub badge_uncontrolled: String,
    pub risk_colors: RiskColors,
    pub preview_color: String,
    pub background: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self::pastel()
    }
}

impl Theme {
    pub fn pastel() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 12.0,
            icon_font_size: 20.0,
            text_color: "#333333".to_string(),
            node_text_color: "#FFFFFF".to_string(),
            node_stroke: "white".to_string(),
            node_colors: NodeColors::default(),
            lane_palette: [
                "#e3f2fd", "#f3e5f5", "#e8f5e9", "#fff3e0", "#fce4ec", "#f1f8e9", "#e0f2f1",
                "#ede7f6", "#fff8e1", "#efebe9",
            ]
            .iter()
            .map(|value| value.to_string())
            .collect(),
            lane_stroke: "#cfd8dc".to_string(),
            line_color: "#666666".to_string(),
            label_color: "#444444".to_string(),
            phase_line_color: "#90a4ae".to_string(),
            anchor_fill: "#2196f3".to_string(),
            badge_controlled: "#ff9800".to_string(),
            badge_uncontrolled: "#f44336".to_string(),
            risk_colors: RiskColors::default(),
            preview_color: "#2196f3".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    /// Blue "water" lane palette used for imported diagrams.
    pub fn water() -> Self {
        Self {
            lane_palette: ["#64b5f6", "#4fc3f7", "#29b6f6", "#03a9f4", "#039be5", "#0288d1"]
                .iter()
                .map(|value| value.to_string())
                .collect(),
            ..Self::pastel()
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "pastel" | "default" => Some(Self::pastel()),
            "water" => Some(Self::water()),
            _ => None,
        }
    }

    pub fn node_color(&self, kind: NodeKind) -> &str {
        match kind {
            NodeKind::Start => &self.node_colors.start,
            NodeKind::End => &self.node_colors.end,
            NodeKind::Process => &self.node_colors.process,
            NodeKind::Decision => &self.node_colors.decision,
        }
    }

    pub fn node_icon(&self, kind: NodeKind) -> &'static str {
        match kind {
            NodeKind::Start => "\u{25B6}",
            NodeKind::End => "\u{25A0}",
            NodeKind::Process => "\u{2699}",
            NodeKind::Decision => "?",
        }
    }

    pub fn node_shape(&self, kind: NodeKind) -> ShapeKind {
        match kind {
            NodeKind::Start | NodeKind::End => ShapeKind::Circle,
            NodeKind::Decision => ShapeKind::Diamond,
            NodeKind::Process => ShapeKind::RoundedRect,
        }
    }

    pub fn lane_color(&self, index: usize) -> String {
        if self.lane_palette.is_empty() {
            return self.background.clone();
        }
        self.lane_palette[index % self.lane_palette.len()].clone()
    }

    pub fn risk_color(&self, level: RiskLevel) -> &str {
        match level {
            RiskLevel::Low => &self.risk_colors.low,
            RiskLevel::Medium => &self.risk_colors.medium,
            RiskLevel::High => &self.risk_colors.high,
            RiskLevel::Critical => &self.risk_colors.critical,
        }
    }

    /// Amber when mitigated, red when the risk has no control.
    pub fn badge_color(&self, risk: &Risk) -> &str {
        if risk.is_controlled() {
            &self.badge_controlled
        } else {
            &self.badge_uncontrolled
        }
    }
}

impl Default for NodeColors {
    fn default() -> Self {
        Self {
            start: "#4caf50".to_string(),
            end: "#f44336".to_string(),
            process: "#2196f3".to_string(),
            decision: "#ff9800".to_string(),
        }
    }
}

impl Default for RiskColors {
    fn default() -> Self {
        Self {
            low: "#4caf50".to_string(),
            medium: "#ff9800".to_string(),
            high: "#f44336".to_string(),
            critical: "#9c27b0".to_string(),
        }
    }
}
