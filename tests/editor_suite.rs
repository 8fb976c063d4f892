use swimlane_editor::interaction::{
    Editor, InteractionState, NoopHooks, PointerEvent, PointerEventHandler,
};
use swimlane_editor::layout::{ConnectionPath, Point, Rect};
use swimlane_editor::model::{ConnectionKey, ControlKind, Diagram, NodeKind, RiskLevel, RiskTarget};
use swimlane_editor::{Config, document};

struct Fixture {
    editor: Editor,
    l1: String,
    l2: String,
    n1: String,
}

/// Two 140-unit lanes (tops at 50 and 200) and `N1` in the first lane.
fn two_lanes(n1_x: f32) -> Fixture {
    let config = Config::default();
    let mut diagram = Diagram::new("Scenario");
    let l1 = diagram.add_lane(Some("L1"), &config.theme, 140.0);
    let l2 = diagram.add_lane(Some("L2"), &config.theme, 140.0);
    let n1 = diagram
        .add_node(&l1, NodeKind::Process, "N1", Some(n1_x))
        .unwrap();
    let mut editor = Editor::with_diagram(config, Box::new(NoopHooks), diagram);
    editor.viewport_mut().fit_to(
        Rect {
            x: 0.0,
            y: 0.0,
            width: 1440.0,
            height: 800.0,
        },
        0.0,
    );
    Fixture { editor, l1, l2, n1 }
}

fn lane_node_ids(diagram: &Diagram, lane_id: &str) -> Vec<String> {
    diagram
        .find_lane(lane_id)
        .unwrap()
        .nodes
        .iter()
        .map(|node| node.id.clone())
        .collect()
}

#[test]
fn dragging_into_second_lane_reassigns_node() {
    let Fixture {
        mut editor,
        l1,
        l2,
        n1,
    } = two_lanes(150.0);
    assert_eq!(editor.scene().node(&n1).unwrap().center, Point::new(150.0, 120.0));

    editor.on_down(&PointerEvent::at(150.0, 120.0));
    editor.on_move(&PointerEvent::at(150.0, 220.0));
    editor.on_animation_frame();
    editor.on_up(&PointerEvent::at(150.0, 220.0));

    assert!(lane_node_ids(editor.diagram(), &l1).is_empty());
    assert_eq!(lane_node_ids(editor.diagram(), &l2), vec![n1.clone()]);
    assert_eq!(editor.diagram().node_count(), 1);
    let node = editor.scene().node(&n1).unwrap();
    assert_eq!(node.center.y, 270.0);
    assert_eq!(node.lane_id, l2);
}

#[test]
fn dragging_within_a_lane_keeps_ownership() {
    let Fixture {
        mut editor, l1, n1, ..
    } = two_lanes(150.0);
    editor.on_down(&PointerEvent::at(150.0, 120.0));
    editor.on_move(&PointerEvent::at(400.0, 160.0));
    editor.on_move(&PointerEvent::at(-80.0, 130.0));
    editor.on_up(&PointerEvent::at(-80.0, 130.0));

    assert_eq!(lane_node_ids(editor.diagram(), &l1), vec![n1.clone()]);
    // Node x is not clamped.
    assert_eq!(editor.diagram().find_node(&n1).unwrap().x, -80.0);
    assert_eq!(editor.scene().node(&n1).unwrap().center, Point::new(-80.0, 120.0));
}

#[test]
fn aligned_nodes_connect_with_a_straight_line() {
    let Fixture {
        mut editor, l1, n1, ..
    } = two_lanes(100.0);
    let n2 = editor
        .add_node(&l1, NodeKind::Process, "N2", Some(500.0))
        .unwrap();
    assert!(editor.add_connection(&n1, &n2, ""));
    let visual = editor
        .scene()
        .connection(&ConnectionKey::new(&n1, &n2))
        .unwrap();
    assert_eq!(visual.d, "M 135 120 L 465 120");
}

#[test]
fn node_behind_the_source_gets_a_detour() {
    let Fixture {
        mut editor, l2, n1, ..
    } = two_lanes(100.0);
    let n2 = editor
        .add_node(&l2, NodeKind::Process, "N2", Some(50.0))
        .unwrap();
    assert!(editor.add_connection(&n1, &n2, ""));
    let visual = editor
        .scene()
        .connection(&ConnectionKey::new(&n1, &n2))
        .unwrap();
    assert!(matches!(visual.path, ConnectionPath::Detour { .. }));
    assert_eq!(visual.path.segment_count(), 3);
}

#[test]
fn risk_badge_turns_amber_once_controlled() {
    let Fixture { mut editor, n1, .. } = two_lanes(150.0);
    let target = RiskTarget::Node(n1.clone());
    let risk = editor
        .add_risk(&target, "Manual entry", RiskLevel::Medium, "")
        .unwrap();
    let red = editor.config().theme.badge_uncontrolled.clone();
    let amber = editor.config().theme.badge_controlled.clone();
    assert_eq!(editor.scene().node(&n1).unwrap().badges[0].color, red);

    editor
        .add_control(&target, &risk, "Double check", ControlKind::Detective, "")
        .unwrap();
    assert_eq!(editor.scene().node(&n1).unwrap().badges[0].color, amber);
}

#[test]
fn deleting_a_lane_cascades_to_connections() {
    let Fixture {
        mut editor,
        l1,
        l2,
        n1,
    } = two_lanes(150.0);
    let n2 = editor.add_node(&l1, NodeKind::End, "N2", Some(500.0)).unwrap();
    let n3 = editor.add_node(&l2, NodeKind::Decision, "N3", Some(300.0)).unwrap();
    editor.add_connection(&n1, &n3, "");
    editor.add_connection(&n3, &n2, "");
    editor.add_connection(&n1, &n2, "");

    assert!(editor.delete_node(&n2));
    assert_eq!(editor.diagram().connections.len(), 1);
    assert!(editor.diagram().find_connection(&n1, &n3).is_some());

    assert!(editor.delete_lane(&l1));
    assert!(editor.diagram().connections.is_empty());
    assert!(editor.scene().connections.is_empty());
    assert!(editor.scene().node(&n1).is_none());
    assert!(editor.scene().node(&n3).is_some());
}

#[test]
fn undo_and_redo_round_trip() {
    let Fixture {
        mut editor, l2, n1, ..
    } = two_lanes(150.0);
    let before = editor.diagram().clone();
    let n2 = editor.add_node(&l2, NodeKind::End, "Done", None).unwrap();
    editor.add_connection(&n1, &n2, "finish");
    let after = editor.diagram().clone();

    assert!(editor.undo());
    assert!(editor.undo());
    assert_eq!(editor.diagram(), &before);
    assert!(editor.scene().node(&n2).is_none());

    assert!(editor.redo());
    assert!(editor.redo());
    assert_eq!(editor.diagram(), &after);
    assert!(!editor.redo());
}

#[test]
fn history_keeps_fifty_steps() {
    let Fixture { mut editor, l1, .. } = two_lanes(150.0);
    for step in 0..60 {
        editor.rename_lane(&l1, &format!("name {step}"));
    }
    let mut undos = 0;
    while editor.undo() {
        undos += 1;
    }
    assert_eq!(undos, 50);
    assert_eq!(editor.diagram().find_lane(&l1).unwrap().name, "name 9");
}

#[test]
fn anchors_connect_two_nodes() {
    let Fixture {
        mut editor, l2, n1, ..
    } = two_lanes(150.0);
    let n2 = editor.add_node(&l2, NodeKind::Process, "N2", Some(450.0)).unwrap();

    editor.on_click(&PointerEvent::at(185.0, 120.0));
    assert!(matches!(editor.state(), InteractionState::Connecting { .. }));
    editor.on_click(&PointerEvent::at(415.0, 270.0));
    assert_eq!(editor.state(), &InteractionState::Idle);
    let conn = editor.diagram().find_connection(&n1, &n2).unwrap();
    assert_eq!(conn.label, "");
}

#[test]
fn share_link_restores_the_diagram() {
    let Fixture {
        mut editor, l2, n1, ..
    } = two_lanes(150.0);
    let n2 = editor.add_node(&l2, NodeKind::End, "Done", None).unwrap();
    editor.add_connection(&n1, &n2, "go");
    let config = editor.config().clone();

    let url = document::share_url("https://example.test/editor", editor.diagram(), &config.layout)
        .unwrap();
    let restored = document::load_share_link(&url, &config.theme).unwrap();
    assert_eq!(restored.lanes, editor.diagram().lanes);
    assert_eq!(restored.connections, editor.diagram().connections);
}

#[test]
fn loading_json_replaces_diagram_and_history() {
    let Fixture { mut editor, l1, .. } = two_lanes(150.0);
    editor.rename_lane(&l1, "Renamed");
    assert!(editor.can_undo());

    let json = include_str!("fixtures/order_flow.json");
    editor.load_json(json).unwrap();
    assert_eq!(editor.diagram().title, "Order fulfilment");
    assert_eq!(editor.diagram().lanes.len(), 3);
    assert!(!editor.can_undo());
}
