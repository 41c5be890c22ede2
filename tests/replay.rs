//! Gesture scripts run end to end

use collage_layout::layout::{CollectionId, ItemId, NodeId};
use collage_layout::replay::ActiveView;
use collage_layout::{run_script, ReplayError, Scene, Session, Settings};
use pretty_assertions::assert_eq;

const SCENE: &str = r#"
csrf = "s3cret"

[[groups]]
id = 1
name = "Climbing club"

[[groups.nodes]]
id = 1
label = "Saturday"
x = 400.0
y = 300.0

[[groups.events]]
id = 10
title = "Bouldering"
node = 1

[[groups.events]]
id = 11
title = "Top rope"
x = 900.0
y = 600.0

[[panels]]
id = 20
title = "RSVPs"
analysis_type = "rsvp-distribution"

[[panels]]
id = 21
title = "Hosts"
analysis_type = "top-hosts"

[[templates]]
name = "busy-periods"
title = "Busy periods"
"#;

const PALETTE_DROP: &str = r#"
view dashboard
press 100 200 on template "busy-periods"
move 300 150
frame
release
sync
"#;

fn scene() -> Scene {
    Scene::from_str(SCENE).unwrap()
}

fn with_token() -> Settings {
    Settings::from_str("[sync]\ncsrf = \"s3cret\"").unwrap()
}

fn call_names(session: &Session) -> String {
    session
        .api()
        .log()
        .iter()
        .map(|c| c.call.name())
        .collect::<Vec<_>>()
        .join(" ")
}

fn dashboard_order(session: &Session) -> Vec<u64> {
    session
        .store()
        .collection(CollectionId::Dashboard)
        .unwrap()
        .persisted_order()
}

#[test]
fn test_palette_drop_creates_panel() {
    let session = run_script(&scene(), PALETTE_DROP, &with_token()).unwrap();

    insta::assert_snapshot!(call_names(&session), @"fetch_item_data create_item set_order");
    assert_eq!(dashboard_order(&session), vec![22, 20, 21]);
    assert_eq!(
        session.api().order_of(CollectionId::Dashboard),
        vec![22, 20, 21]
    );
    assert!(session.notices().is_empty());

    let created = session
        .store()
        .item(CollectionId::Dashboard, ItemId::Persisted(22))
        .unwrap();
    assert_eq!(created.title, "Busy periods");
    assert!(!created.unsaved);
}

#[test]
fn test_missing_token_rolls_back_palette_drop() {
    let session = run_script(&scene(), PALETTE_DROP, &Settings::default()).unwrap();

    let messages: Vec<&str> = session
        .notices()
        .iter()
        .map(|n| n.message.as_str())
        .collect();
    insta::assert_snapshot!(
        messages.join("\n"),
        @"Could not add item: server responded 403: missing anti-forgery token"
    );
    assert_eq!(dashboard_order(&session), vec![20, 21]);
    assert_eq!(
        session
            .store()
            .collection(CollectionId::Dashboard)
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn test_event_snaps_to_node_and_is_saved() {
    let script = "press 980 650 on item 11\nmove 420 320\nframe\nrelease\nsync";
    let session = run_script(&scene(), script, &with_token()).unwrap();

    let item = session
        .store()
        .item(CollectionId::Group(1), ItemId::Persisted(11))
        .unwrap();
    assert_eq!(item.snapped_to, Some(NodeId(1)));

    let saved = &session.api().group(1).unwrap().events[1];
    assert_eq!(saved.node_id, Some(1));
    assert_eq!((saved.x, saved.y), (item.position.x, item.position.y));
}

#[test]
fn test_fit_node_then_reset() {
    let session = run_script(&scene(), "fit node 1\ntick 400", &Settings::default()).unwrap();
    let viewport = session.canvas().viewport();
    assert!(!viewport.is_animating());
    assert!(viewport.scale() > 1.0);

    let session = run_script(
        &scene(),
        "fit node 1 padding 80\ntick 400\nreset zoom\ntick 400",
        &Settings::default(),
    )
    .unwrap();
    assert_eq!(session.canvas().viewport().scale(), 1.0);
}

#[test]
fn test_refused_commands_are_reported() {
    let script = "view dashboard\npan 10 10\npress 0 0 button 2 on item 20\nrelease";
    let session = run_script(&scene(), script, &Settings::default()).unwrap();

    assert_eq!(session.active(), ActiveView::Dashboard);
    insta::assert_snapshot!(session.rejected().join("\n"), @r"
    pan: needs a group view
    press: button 2 does not start a drag
    release: no gesture in progress
    ");
}

#[test]
fn test_parse_errors_point_at_source() {
    let source = "view dashboard\npress 10 on item 1";
    let Err(ReplayError::Parse(errors)) = run_script(&scene(), source, &Settings::default()) else {
        panic!("expected a parse error");
    };
    assert!(!errors.is_empty());
    assert!(errors[0].span().start >= 15);

    let rendered = errors[0].format(source, "gestures.txt");
    assert!(rendered.contains("gestures.txt"));
}

#[test]
fn test_json_and_svg_output() {
    let session = run_script(&scene(), PALETTE_DROP, &with_token()).unwrap();

    let report: serde_json::Value = serde_json::from_str(&session.to_json().unwrap()).unwrap();
    assert_eq!(report["view"], "dashboard");
    assert_eq!(report["calls"].as_array().unwrap().len(), 3);
    assert_eq!(report["rejected"], serde_json::json!([]));

    let svg = session.to_svg().unwrap();
    assert!(svg.starts_with("<?xml"));
    assert!(svg.contains(r#"id="item-22""#));
    assert!(svg.contains("Busy periods"));
}
