use std::path::Path;

use swimlane_editor::layout::{Point, compute_connection_path};
use swimlane_editor::model::{Diagram, NodeKind, NodeUpdate, RiskLevel, RiskTarget};
use swimlane_editor::path_cache::PathCache;
use swimlane_editor::scene::{RenderKind, RenderMode};
use swimlane_editor::{Config, SceneRenderer, parse_diagram, render_svg};

const FIXTURES: [&str; 2] = ["order_flow.json", "minimal.json"];

fn load_fixture(name: &str, config: &Config) -> Diagram {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let json = std::fs::read_to_string(&path).expect("fixture read failed");
    parse_diagram(&json, &config.theme).expect("fixture failed validation")
}

fn renderer(config: &Config) -> SceneRenderer {
    SceneRenderer::new(config.theme.clone(), config.layout.clone(), &config.editor)
}

#[test]
fn full_render_is_idempotent() {
    let config = Config::default();
    for fixture in FIXTURES {
        let diagram = load_fixture(fixture, &config);
        let mut renderer = renderer(&config);
        renderer.full_render(&diagram);
        let first = renderer.scene().clone();
        renderer.full_render(&diagram);
        assert_eq!(&first, renderer.scene(), "{fixture}: full render drifted");
    }
}

#[test]
fn differential_render_matches_full_render() {
    let config = Config::default();
    let before = load_fixture("order_flow.json", &config);
    let mut after = before.clone();
    after.set_node_x("pick", 610.0);
    after.move_node_to_lane("ship", "sales");
    after.update_node(
        "order",
        &NodeUpdate {
            text: Some("Order placed online by a returning customer".to_string()),
            ..Default::default()
        },
    );
    after.add_risk(&RiskTarget::Node("receive".to_string()), "Lost", RiskLevel::Critical, "");
    after.update_connection("check", "pick", "credit ok");
    after.delete_connection("pick", "ship");
    let extra = after
        .add_node("warehouse", NodeKind::Process, "Restock", Some(300.0))
        .unwrap();
    after.add_connection("pick", &extra, "");
    assert!(SceneRenderer::can_use_differential_render(&before, &after));

    let mut patched = renderer(&config);
    patched.full_render(&before);
    let stats = patched.differential_render(&before, &after);
    assert_eq!(stats.kind, RenderKind::Differential);
    assert_eq!(stats.created, 2);
    assert_eq!(stats.removed, 1);

    let mut fresh = renderer(&config);
    fresh.full_render(&after);

    assert_eq!(patched.scene().without_state(), fresh.scene().without_state());
    assert_eq!(patched.scene().badge_count(), fresh.scene().badge_count());
}

#[test]
fn structural_change_forces_full_render() {
    let config = Config::default();
    let before = load_fixture("order_flow.json", &config);
    let mut after = before.clone();
    after.delete_phase("delivery");
    assert!(!SceneRenderer::can_use_differential_render(&before, &after));

    let mut renderer = renderer(&config);
    renderer.full_render(&before);
    let stats = renderer.differential_render(&before, &after);
    assert_eq!(stats.kind, RenderKind::Full);
    assert_eq!(renderer.scene().phases.len(), 1);
}

#[test]
fn auto_mode_patches_when_shape_is_stable() {
    let config = Config::default();
    let mut diagram = load_fixture("minimal.json", &config);
    let mut renderer = renderer(&config);
    assert_eq!(renderer.render(&diagram, RenderMode::Auto).kind, RenderKind::Full);

    diagram.set_node_x("a", 260.0);
    assert_eq!(
        renderer.render(&diagram, RenderMode::Auto).kind,
        RenderKind::Differential
    );
    assert_eq!(
        renderer.render(&diagram, RenderMode::ForceFull).kind,
        RenderKind::Full
    );
}

#[test]
fn cached_paths_equal_computed_paths() {
    let config = Config::default();
    let mut cache = PathCache::new(config.editor.path_cache_capacity);
    let pairs = [
        (Point::new(100.0, 120.0), Point::new(500.0, 124.0)),
        (Point::new(100.0, 120.0), Point::new(50.0, 270.0)),
        (Point::new(100.0, 120.0), Point::new(800.0, 270.0)),
        (Point::new(100.0, 120.0), Point::new(240.0, 270.0)),
    ];
    for round in 0..2 {
        for (idx, (from, to)) in pairs.iter().enumerate() {
            let cached = cache.get_or_compute("a", &format!("b{idx}"), *from, *to, &config.layout);
            assert_eq!(cached, compute_connection_path(*from, *to, &config.layout), "round {round}");
        }
    }
    assert_eq!(cache.misses(), 4);
    assert_eq!(cache.hits(), 4);
}

#[test]
fn path_cache_stays_bounded_during_a_drag() {
    let config = Config::default();
    let mut diagram = load_fixture("order_flow.json", &config);
    let mut renderer = renderer(&config);
    renderer.full_render(&diagram);
    for step in 0..200 {
        diagram.set_node_x("check", 330.0 + step as f32);
        renderer.render(&diagram, RenderMode::Auto);
    }
    assert_eq!(renderer.path_cache().len(), config.editor.path_cache_capacity);
}

#[test]
fn svg_renders_for_all_fixtures() {
    let config = Config::default();
    for fixture in FIXTURES {
        let diagram = load_fixture(fixture, &config);
        let mut renderer = renderer(&config);
        renderer.full_render(&diagram);
        let svg = render_svg(renderer.scene(), &config.theme, &config.layout);
        assert!(svg.contains("<svg"), "{fixture}: missing <svg tag");
        assert!(svg.contains("</svg>"), "{fixture}: missing </svg tag");
        for node in diagram.nodes().map(|(_, node)| node) {
            assert!(
                svg.contains(&format!("data-node-id=\"{}\"", node.id)),
                "{fixture}: node {} not drawn",
                node.id
            );
        }
    }
}
