use crate::config::LayoutConfig;
use crate::layout::TextBlock;
use crate::scene::{NodeShape, NodeVisual, RiskBadge, SceneGraph};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

pub fn render_svg(scene: &SceneGraph, theme: &Theme, config: &LayoutConfig) -> String {
    let mut svg = String::new();
    let width = scene.width;
    let height = scene.height;

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));
    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.line_color
    ));
    svg.push_str("</defs>");

    svg.push_str("<g class=\"lanes\">");
    for lane in &scene.lanes {
        if let Some(y) = lane.divider_y {
            svg.push_str(&format!(
                "<line x1=\"{:.2}\" y1=\"{y:.2}\" x2=\"{:.2}\" y2=\"{y:.2}\" stroke=\"{}\" stroke-width=\"1\"/>",
                lane.rect.x,
                lane.rect.x + lane.rect.width,
                theme.lane_stroke
            ));
        }
        svg.push_str(&format!(
            "<rect data-lane-id=\"{}\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
            escape_xml(&lane.lane_id),
            lane.rect.x,
            lane.rect.y,
            lane.rect.width,
            lane.rect.height,
            lane.fill,
            theme.lane_stroke
        ));
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" font-weight=\"bold\" fill=\"{}\">{}</text>",
            lane.label.x,
            lane.label.y,
            theme.font_family,
            theme.font_size + 2.0,
            theme.text_color,
            escape_xml(&lane.name)
        ));
        let handle = lane.reorder_handle;
        svg.push_str(&format!(
            "<rect class=\"lane-handle\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"4\" ry=\"4\" fill=\"none\" stroke=\"{}\"/>",
            handle.x, handle.y, handle.width, handle.height, theme.lane_stroke
        ));
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"phases\">");
    for phase in &scene.phases {
        svg.push_str(&format!(
            "<line x1=\"{x:.2}\" y1=\"{:.2}\" x2=\"{x:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-dasharray=\"6 4\" stroke-width=\"1.2\"/>",
            phase.divider_top,
            phase.divider_bottom,
            theme.phase_line_color,
            x = phase.end
        ));
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            phase.header.x,
            phase.header.y,
            theme.font_family,
            theme.font_size,
            theme.text_color,
            escape_xml(&phase.name)
        ));
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"connections\">");
    for conn in scene.connections.values() {
        svg.push_str(&format!(
            "<path data-from=\"{}\" data-to=\"{}\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\" marker-end=\"url(#arrow)\"/>",
            escape_xml(&conn.key.from),
            escape_xml(&conn.key.to),
            conn.d,
            theme.line_color
        ));
        if let Some(label) = &conn.label {
            svg.push_str(&format!(
                "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
                label.position.x,
                label.position.y,
                theme.font_family,
                theme.font_size,
                theme.label_color,
                escape_xml(&label.text)
            ));
        }
        svg.push_str(&badges_svg(&conn.badges, theme));
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"nodes\">");
    for node in scene.nodes.values() {
        svg.push_str(&node_svg(node, theme, config));
    }
    svg.push_str("</g>");

    svg.push_str("</svg>");
    svg
}

fn node_svg(node: &NodeVisual, theme: &Theme, config: &LayoutConfig) -> String {
    let mut out = String::new();
    let class = if node.state.dragging {
        "node dragging"
    } else {
        "node"
    };
    out.push_str(&format!(
        "<g class=\"{class}\" data-node-id=\"{}\">",
        escape_xml(&node.node_id)
    ));
    if let Some(tooltip) = &node.tooltip {
        out.push_str(&format!("<title>{}</title>", escape_xml(tooltip)));
    }
    let (cx, cy) = (node.center.x, node.center.y);
    match node.shape {
        NodeShape::Circle { radius } => out.push_str(&format!(
            "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{radius:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"2\"/>",
            node.fill, node.stroke
        )),
        NodeShape::Diamond { half } => out.push_str(&format!(
            "<polygon points=\"{:.2},{:.2} {:.2},{:.2} {:.2},{:.2} {:.2},{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"2\"/>",
            cx,
            cy - half,
            cx + half,
            cy,
            cx,
            cy + half,
            cx - half,
            cy,
            node.fill,
            node.stroke
        )),
        NodeShape::RoundedRect {
            width,
            height,
            corner,
        } => out.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" rx=\"{corner:.2}\" ry=\"{corner:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"2\"/>",
            cx - width / 2.0,
            cy - height / 2.0,
            node.fill,
            node.stroke
        )),
    }
    out.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-size=\"{}\" fill=\"{}\">{}</text>",
        node.icon_pos.x,
        node.icon_pos.y,
        theme.icon_font_size,
        theme.node_text_color,
        escape_xml(&node.icon)
    ));
    out.push_str(&text_block_svg(
        node.label_pos.x,
        node.label_pos.y,
        &node.label,
        theme,
        config,
    ));
    if node.anchors_visible() {
        for anchor in &node.anchors {
            out.push_str(&format!(
                "<circle class=\"anchor\" cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\" stroke=\"white\" stroke-width=\"2\"/>",
                anchor.center.x, anchor.center.y, anchor.radius, theme.anchor_fill
            ));
        }
    }
    out.push_str(&badges_svg(&node.badges, theme));
    out.push_str("</g>");
    out
}

fn badges_svg(badges: &[RiskBadge], theme: &Theme) -> String {
    let mut out = String::new();
    for badge in badges {
        let half = badge.size / 2.0;
        let (x, y) = (badge.center.x, badge.center.y);
        out.push_str(&format!(
            "<g class=\"risk-badge\" data-risk-id=\"{}\"><title>{}</title><polygon points=\"{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}\" fill=\"{}\" stroke=\"white\" stroke-width=\"1\"/><text x=\"{x:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-size=\"{}\" font-weight=\"bold\" fill=\"white\">!</text></g>",
            escape_xml(&badge.risk_id),
            escape_xml(&badge.title),
            x,
            y - half,
            x + half,
            y + half,
            x - half,
            y + half,
            badge.color,
            y + half - 3.0,
            theme.font_size
        ));
    }
    out
}

fn text_block_svg(x: f32, y: f32, label: &TextBlock, theme: &Theme, config: &LayoutConfig) -> String {
    let mut text = String::new();
    let line_height = theme.font_size * config.label_line_height;
    let start_y = y + theme.font_size / 2.0;
    text.push_str(&format!(
        "<text x=\"{x:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">",
        theme.font_family, theme.font_size, theme.node_text_color
    ));
    for (idx, line) in label.lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_height };
        text.push_str(&format!(
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        ));
    }
    text.push_str("</text>");
    text
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
