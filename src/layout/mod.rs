//! Layout engine: pure functions from a diagram snapshot to geometry.

mod routing;
mod text;
mod types;

pub use routing::{ConnectionPath, compute_connection_path, connection_midpoint};
pub use text::{label_max_width, wrap_label};
pub use types::{LaneBand, Layout, PhaseSpan, Point, Rect, TextBlock};

use crate::config::LayoutConfig;
use crate::model::{Diagram, Lane, Node};
use std::collections::BTreeMap;

pub fn compute_layout(diagram: &Diagram, config: &LayoutConfig) -> Layout {
    let lanes = compute_lane_bands(diagram, config);
    let mut nodes = BTreeMap::new();
    for (lane, band) in diagram.lanes.iter().zip(&lanes) {
        for node in &lane.nodes {
            nodes.insert(node.id.clone(), compute_node_center(node, band, config));
        }
    }
    Layout {
        phases: compute_phase_spans(diagram, config),
        width: compute_canvas_width(diagram, config),
        height: compute_canvas_height(diagram, config),
        lanes,
        nodes,
    }
}

/// Lanes stack top-down from the margin, separated by the gutter.
pub fn compute_lane_bands(diagram: &Diagram, config: &LayoutConfig) -> Vec<LaneBand> {
    let mut top = config.lane_margin_top;
    diagram
        .lanes
        .iter()
        .enumerate()
        .map(|(index, lane)| {
            let height = lane_height(lane, config);
            let band = LaneBand {
                lane_id: lane.id.clone(),
                index,
                top,
                height,
            };
            top += height + config.lane_gutter;
            band
        })
        .collect()
}

pub fn compute_canvas_width(diagram: &Diagram, config: &LayoutConfig) -> f32 {
    diagram
        .phases
        .iter()
        .map(|phase| phase.position)
        .reduce(f32::max)
        .map(|rightmost| rightmost + config.phase_padding)
        .unwrap_or(config.default_canvas_width)
}

pub fn compute_canvas_height(diagram: &Diagram, config: &LayoutConfig) -> f32 {
    let lanes: f32 = diagram
        .lanes
        .iter()
        .map(|lane| lane_height(lane, config) + config.lane_gutter)
        .sum();
    config.lane_margin_top + lanes + config.canvas_margin_bottom
}

/// The stored x is used as-is; y is pinned to the lane's center line.
pub fn compute_node_center(node: &Node, band: &LaneBand, config: &LayoutConfig) -> Point {
    Point::new(node.x, band.top + config.lane_center_offset)
}

pub fn compute_phase_spans(diagram: &Diagram, config: &LayoutConfig) -> Vec<PhaseSpan> {
    let mut start = config.lane_left;
    diagram
        .sorted_phases()
        .into_iter()
        .map(|phase| {
            let span = PhaseSpan {
                phase_id: phase.id.clone(),
                name: phase.name.clone(),
                start,
                end: phase.position,
            };
            start = phase.position;
            span
        })
        .collect()
}

fn lane_height(lane: &Lane, config: &LayoutConfig) -> f32 {
    if lane.height > 0.0 {
        lane.height
    } else {
        config.default_lane_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;
    use crate::theme::Theme;

    fn diagram_with_lanes(heights: &[f32]) -> Diagram {
        let theme = Theme::default();
        let mut diagram = Diagram::new("Layout");
        for (idx, height) in heights.iter().enumerate() {
            let id = diagram.add_lane(Some(&format!("L{idx}")), &theme, 140.0);
            diagram.set_lane_height(&id, *height, 0.0);
        }
        diagram
    }

    #[test]
    fn lanes_stack_with_margin_and_gutter() {
        let diagram = diagram_with_lanes(&[140.0, 200.0, 140.0]);
        let bands = compute_lane_bands(&diagram, &LayoutConfig::default());
        let tops: Vec<f32> = bands.iter().map(|band| band.top).collect();
        assert_eq!(tops, vec![50.0, 200.0, 410.0]);
    }

    #[test]
    fn canvas_size_tracks_lanes_and_phases() {
        let config = LayoutConfig::default();
        let mut diagram = diagram_with_lanes(&[140.0, 140.0]);
        assert_eq!(compute_canvas_width(&diagram, &config), 1440.0);
        assert_eq!(compute_canvas_height(&diagram, &config), 400.0);
        diagram.add_phase("Intake", 400.0);
        diagram.add_phase("Review", 1800.0);
        assert_eq!(compute_canvas_width(&diagram, &config), 1900.0);
    }

    #[test]
    fn node_center_pins_y_to_lane() {
        let mut diagram = diagram_with_lanes(&[140.0, 140.0]);
        let lane = diagram.lanes[1].id.clone();
        let node = diagram
            .add_node(&lane, NodeKind::Process, "Check", Some(-40.0))
            .unwrap();
        let layout = compute_layout(&diagram, &LayoutConfig::default());
        assert_eq!(layout.node_center(&node), Some(Point::new(-40.0, 270.0)));
    }

    #[test]
    fn lane_lookup_ignores_gutters() {
        let diagram = diagram_with_lanes(&[140.0, 140.0]);
        let layout = compute_layout(&diagram, &LayoutConfig::default());
        assert_eq!(layout.lane_at(60.0).map(|band| band.index), Some(0));
        assert_eq!(layout.lane_at(195.0), None);
        assert_eq!(layout.lane_at(220.0).map(|band| band.index), Some(1));
    }

    #[test]
    fn phases_are_laid_end_to_end() {
        let mut diagram = diagram_with_lanes(&[140.0]);
        diagram.add_phase("B", 800.0);
        diagram.add_phase("A", 400.0);
        let spans = compute_phase_spans(&diagram, &LayoutConfig::default());
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].start, spans[0].end), (20.0, 400.0));
        assert_eq!((spans[1].start, spans[1].end), (400.0, 800.0));
        assert_eq!(spans[0].name, "A");
    }
}
