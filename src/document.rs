//! Diagram file format and share links.
//!
//! Import always goes through [`crate::validate`]; export writes the layout's
//! lane centers as `position.y` so older readers still get a usable value.

use crate::config::LayoutConfig;
use crate::error::LoadError;
use crate::layout::compute_layout;
use crate::model::{Control, Diagram, Risk};
use crate::theme::Theme;
use crate::validate::{Limits, validate_diagram};
use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD},
};
use serde::Serialize;

/// Longest `data` parameter accepted from a share link.
pub const MAX_SHARE_PARAM_CHARS: usize = 100_000;
/// Longest JSON text a share link may decode to.
pub const MAX_SHARE_DECODED_CHARS: usize = 500_000;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DiagramFile {
    pub title: String,
    pub phases: Vec<PhaseFile>,
    pub lanes: Vec<LaneFile>,
    pub connections: Vec<ConnectionFile>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PhaseFile {
    pub id: String,
    pub name: String,
    pub position: f32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LaneFile {
    pub id: String,
    pub name: String,
    pub color: String,
    pub height: f32,
    pub nodes: Vec<NodeFile>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NodeFile {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: String,
    pub position: PositionFile,
    pub risks: Vec<RiskFile>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PositionFile {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RiskFile {
    pub id: String,
    pub text: String,
    pub level: &'static str,
    pub description: String,
    pub controls: Vec<ControlFile>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ControlFile {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConnectionFile {
    pub from: String,
    pub to: String,
    pub label: String,
    pub risks: Vec<RiskFile>,
}

/// Parses and validates diagram JSON.
pub fn parse_diagram(json: &str, theme: &Theme) -> Result<Diagram, LoadError> {
    let limit = Limits::default().max_bytes;
    if json.len() > limit {
        return Err(LoadError::TooLarge {
            actual: json.len(),
            limit,
        });
    }
    let value: serde_json::Value = serde_json::from_str(json)?;
    let diagram = validate_diagram(&value, theme)?;
    log::info!(
        lanes = diagram.lanes.len(),
        nodes = diagram.node_count(),
        connections = diagram.connections.len();
        "diagram parsed"
    );
    Ok(diagram)
}

pub fn to_document(diagram: &Diagram, config: &LayoutConfig) -> DiagramFile {
    let layout = compute_layout(diagram, config);
    DiagramFile {
        title: diagram.title.clone(),
        phases: diagram
            .phases
            .iter()
            .map(|phase| PhaseFile {
                id: phase.id.clone(),
                name: phase.name.clone(),
                position: phase.position,
            })
            .collect(),
        lanes: diagram
            .lanes
            .iter()
            .map(|lane| LaneFile {
                id: lane.id.clone(),
                name: lane.name.clone(),
                color: lane.color.clone(),
                height: lane.height,
                nodes: lane
                    .nodes
                    .iter()
                    .map(|node| {
                        let y = layout
                            .node_center(&node.id)
                            .map(|center| center.y)
                            .unwrap_or_default();
                        NodeFile {
                            id: node.id.clone(),
                            text: node.text.clone(),
                            kind: node.kind.as_str(),
                            description: node.description.clone(),
                            position: PositionFile { x: node.x, y },
                            risks: risk_files(&node.risks),
                        }
                    })
                    .collect(),
            })
            .collect(),
        connections: diagram
            .connections
            .iter()
            .map(|conn| ConnectionFile {
                from: conn.from.clone(),
                to: conn.to.clone(),
                label: conn.label.clone(),
                risks: risk_files(&conn.risks),
            })
            .collect(),
    }
}

fn risk_files(risks: &[Risk]) -> Vec<RiskFile> {
    risks
        .iter()
        .map(|risk| RiskFile {
            id: risk.id.clone(),
            text: risk.text.clone(),
            level: risk.level.as_str(),
            description: risk.description.clone(),
            controls: risk.controls.iter().map(control_file).collect(),
        })
        .collect()
}

fn control_file(control: &Control) -> ControlFile {
    ControlFile {
        id: control.id.clone(),
        text: control.text.clone(),
        kind: control.kind.as_str(),
        description: control.description.clone(),
    }
}

/// Pretty-printed diagram file. Never mutates the diagram.
pub fn export_json(diagram: &Diagram, config: &LayoutConfig) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&to_document(diagram, config))
}

/// `base?data=<Base64 of the compact JSON>`, URL-safe alphabet, no padding.
pub fn share_url(base: &str, diagram: &Diagram, config: &LayoutConfig) -> serde_json::Result<String> {
    let json = serde_json::to_string(&to_document(diagram, config))?;
    let encoded = URL_SAFE_NO_PAD.encode(json.as_bytes());
    let separator = if base.contains('?') { '&' } else { '?' };
    Ok(format!("{base}{separator}data={encoded}"))
}

/// Decodes a share link's `data` parameter into JSON text. Accepts the
/// URL-safe and standard Base64 alphabets, padded or not, and payloads that
/// were percent-encoded before Base64 encoding.
pub fn decode_share_param(param: &str) -> Result<String, LoadError> {
    let param = param.trim();
    if param.len() > MAX_SHARE_PARAM_CHARS {
        return Err(LoadError::TooLarge {
            actual: param.len(),
            limit: MAX_SHARE_PARAM_CHARS,
        });
    }
    // A literal `+` arrives as a space after form decoding.
    let cleaned = param.replace(' ', "+");
    let unpadded = cleaned.trim_end_matches('=');
    let bytes = if unpadded.contains(['+', '/']) {
        STANDARD_NO_PAD.decode(unpadded)?
    } else {
        URL_SAFE_NO_PAD.decode(unpadded)?
    };
    let mut text = String::from_utf8(bytes)?;
    if text.starts_with('%') {
        text = percent_decode(&text)?;
    }
    let chars = text.chars().count();
    if chars > MAX_SHARE_DECODED_CHARS {
        return Err(LoadError::TooLarge {
            actual: chars,
            limit: MAX_SHARE_DECODED_CHARS,
        });
    }
    Ok(text)
}

/// Pulls the `data` parameter out of a full share URL.
pub fn share_param_from_url(url: &str) -> Result<String, LoadError> {
    let query = url.split_once('?').map(|(_, query)| query).unwrap_or(url);
    let query = query.split('#').next().unwrap_or_default();
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("data="))
        .filter(|value| !value.is_empty())
        .ok_or(LoadError::MissingShareData)
        .and_then(percent_decode)
}

/// Loads a diagram from either a full share URL or a bare `data` value.
pub fn load_share_link(link: &str, theme: &Theme) -> Result<Diagram, LoadError> {
    let param = if link.contains("data=") {
        share_param_from_url(link)?
    } else {
        link.to_string()
    };
    let json = decode_share_param(&param)?;
    parse_diagram(&json, theme)
}

fn percent_decode(input: &str) -> Result<String, LoadError> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'%' => {
                let hex = input
                    .get(idx + 1..idx + 3)
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                    .ok_or_else(|| LoadError::Invalid("malformed percent escape".into()))?;
                out.push(hex);
                idx += 3;
            }
            byte => {
                out.push(byte);
                idx += 1;
            }
        }
    }
    Ok(String::from_utf8(out)?)
}
