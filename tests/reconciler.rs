//! Reconciler behaviour against the in-memory server

use collage_layout::drag::{Canvas, CanvasConfig, Press, PressTarget};
use collage_layout::layout::{CollectionId, Item, ItemId, ItemKind, NodeId, Point, Size};
use collage_layout::store::{Collection, Store};
use collage_layout::sync::{
    group_collection, run_blocking, ApiError, GroupRecord, ItemRecord, MemoryApi, NodeRecord,
    Outcome, Reconciler,
};
use pretty_assertions::assert_eq;

const DASHBOARD: CollectionId = CollectionId::Dashboard;
const GROUP: CollectionId = CollectionId::Group(7);

fn record(id: u64, kind: ItemKind) -> ItemRecord {
    ItemRecord {
        id,
        kind,
        title: format!("Item {id}"),
        x: 0.0,
        y: 0.0,
        node_id: None,
        configuration: serde_json::Value::Null,
    }
}

fn panel(id: u64) -> ItemRecord {
    record(
        id,
        ItemKind::Panel {
            analysis_type: "rsvp-distribution".into(),
        },
    )
}

fn dashboard(ids: &[u64]) -> (Store, MemoryApi) {
    let records: Vec<ItemRecord> = ids.iter().copied().map(panel).collect();
    let mut store = Store::new();
    store.insert_collection(Collection::with_contents(
        DASHBOARD,
        "Insights",
        records
            .iter()
            .cloned()
            .map(|r| r.into_item(Size::new(300.0, 255.0)))
            .collect(),
        Vec::new(),
    ));
    (store, MemoryApi::new().with_dashboard(records))
}

fn group() -> GroupRecord {
    GroupRecord {
        id: 7,
        name: "Hiking".into(),
        nodes: vec![NodeRecord {
            id: 1,
            label: "Trailhead".into(),
            x: 200.0,
            y: 200.0,
        }],
        events: vec![
            ItemRecord {
                node_id: Some(1),
                x: 150.0,
                y: 120.0,
                ..record(30, ItemKind::Event)
            },
            record(31, ItemKind::Event),
        ],
    }
}

fn group_setup() -> (Store, MemoryApi) {
    let mut store = Store::new();
    store.insert_collection(group_collection(group(), Size::new(160.0, 100.0), 30.0));
    (store, MemoryApi::new().with_group(group()))
}

fn order(store: &Store) -> Vec<u64> {
    store.collection(DASHBOARD).unwrap().persisted_order()
}

#[test]
fn test_rapid_reorders_settle_on_last() {
    let (mut store, mut api) = dashboard(&[1, 2, 3]);
    let mut reconciler = Reconciler::new();

    let panels = store.collection_mut(DASHBOARD).unwrap();
    panels.move_to(ItemId::Persisted(1), 1);
    reconciler.persist_order(&store, DASHBOARD).unwrap();

    let panels = store.collection_mut(DASHBOARD).unwrap();
    panels.move_to(ItemId::Persisted(1), 2);
    reconciler.persist_order(&store, DASHBOARD).unwrap();
    assert_eq!(order(&store), vec![2, 3, 1]);

    let outcomes = run_blocking(&mut api, &mut reconciler, &mut store);
    assert_eq!(outcomes, vec![Outcome::Superseded, Outcome::Applied]);
    assert_eq!(store.collection(DASHBOARD).unwrap().confirmed_order(), &[2, 3, 1]);
    assert_eq!(api.order_of(DASHBOARD), vec![2, 3, 1]);
}

#[test]
fn test_same_order_twice_is_sent_once() {
    let (mut store, mut api) = dashboard(&[1, 2]);
    let mut reconciler = Reconciler::new();

    store
        .collection_mut(DASHBOARD)
        .unwrap()
        .move_to(ItemId::Persisted(2), 0);
    reconciler.persist_order(&store, DASHBOARD).unwrap();
    assert_eq!(reconciler.persist_order(&store, DASHBOARD).unwrap(), None);

    run_blocking(&mut api, &mut reconciler, &mut store);
    assert_eq!(api.count("set_order"), 1);
}

#[test]
fn test_server_never_sees_transient_ids() {
    let (mut store, mut api) = dashboard(&[1, 2]);
    let mut reconciler = Reconciler::new();

    for index in [0, 2] {
        let id = store.next_transient_id();
        let item = Item::new(
            id,
            ItemKind::Panel {
                analysis_type: "busy-periods".into(),
            },
            "New panel",
            Size::new(300.0, 255.0),
        );
        assert!(item.unsaved);
        store.collection_mut(DASHBOARD).unwrap().insert(index, item);
        reconciler.create_item(&store, DASHBOARD, id).unwrap();
        reconciler.persist_order(&store, DASHBOARD).unwrap();
    }

    run_blocking(&mut api, &mut reconciler, &mut store);

    let items = store.collection(DASHBOARD).unwrap().items();
    assert!(items.iter().all(|i| i.id.is_persisted() && !i.unsaved));
    assert_eq!(order(&store), vec![3, 1, 4, 2]);
    assert_eq!(api.order_of(DASHBOARD), vec![3, 1, 4, 2]);
    assert!(api.log().iter().all(|logged| logged.ok));
}

#[test]
fn test_missing_csrf_rolls_back_with_notice() {
    let (mut store, api) = dashboard(&[1, 2, 3]);
    let mut api = api.with_required_csrf("s3cret");
    let mut reconciler = Reconciler::new();

    store
        .collection_mut(DASHBOARD)
        .unwrap()
        .move_to(ItemId::Persisted(3), 0);
    reconciler.persist_order(&store, DASHBOARD).unwrap();

    let outcomes = run_blocking(&mut api, &mut reconciler, &mut store);
    let Outcome::Failed(notice) = &outcomes[0] else {
        panic!("expected a failure, got {outcomes:?}");
    };
    insta::assert_snapshot!(
        notice.message.as_str(),
        @"Could not save order: server responded 403: missing anti-forgery token"
    );
    assert_eq!(order(&store), vec![1, 2, 3]);
    assert_eq!(api.order_of(DASHBOARD), vec![1, 2, 3]);
}

#[test]
fn test_csrf_is_attached_to_mutations_only() {
    let (mut store, api) = dashboard(&[1, 2]);
    let mut api = api.with_required_csrf("s3cret");
    let mut reconciler = Reconciler::new().with_csrf("s3cret");

    reconciler.fetch_preview(DASHBOARD, "busy-periods", 1);
    reconciler
        .delete_item(&mut store, DASHBOARD, ItemId::Persisted(1))
        .unwrap();
    run_blocking(&mut api, &mut reconciler, &mut store);

    let tokens: Vec<Option<&str>> = api.log().iter().map(|c| c.csrf.as_deref()).collect();
    assert_eq!(tokens, vec![None, Some("s3cret")]);
    assert_eq!(api.order_of(DASHBOARD), vec![2]);
}

#[test]
fn test_failed_node_move_restores_position() {
    let (mut store, mut api) = group_setup();
    let mut reconciler = Reconciler::new();

    let start = store.node(GROUP, NodeId(1)).unwrap().position;
    store
        .move_node(GROUP, NodeId(1), Point::new(640.0, 480.0))
        .unwrap();
    reconciler.move_node(&store, GROUP, NodeId(1), start).unwrap();

    api.fail_next(ApiError::Network("connection reset".into()));
    let outcomes = run_blocking(&mut api, &mut reconciler, &mut store);

    assert!(matches!(&outcomes[0], Outcome::Failed(n) if n.message.starts_with("Could not move node")));
    assert_eq!(store.node(GROUP, NodeId(1)).unwrap().position, start);
    assert_eq!(api.group(7).unwrap().nodes[0].x, 200.0);
}

#[test]
fn test_failed_placement_restores_snap() {
    let (mut store, mut api) = group_setup();
    let mut reconciler = Reconciler::new();
    let id = ItemId::Persisted(31);

    let item = store.item_mut(GROUP, id).unwrap();
    let previous = (item.position, item.snapped_to);
    item.position = Point::new(180.0, 60.0);
    item.snapped_to = Some(NodeId(1));
    reconciler
        .save_placement(&store, GROUP, id, previous)
        .unwrap();

    api.fail_next(ApiError::status(500, "boom"));
    run_blocking(&mut api, &mut reconciler, &mut store);

    let item = store.item(GROUP, id).unwrap();
    assert_eq!((item.position, item.snapped_to), previous);
}

/// Two cards orbiting node 1, one orbiting node 2
fn two_node_setup() -> (Canvas, Store, MemoryApi) {
    let snapped = |id, node| ItemRecord {
        node_id: Some(node),
        ..record(id, ItemKind::Event)
    };
    let group = GroupRecord {
        id: 7,
        name: "Hiking".into(),
        nodes: vec![
            NodeRecord {
                id: 1,
                label: "Trailhead".into(),
                x: 200.0,
                y: 200.0,
            },
            NodeRecord {
                id: 2,
                label: "Summit".into(),
                x: 700.0,
                y: 200.0,
            },
        ],
        events: vec![snapped(30, 1), snapped(31, 1), snapped(32, 2)],
    };
    let mut store = Store::new();
    store.insert_collection(group_collection(group.clone(), Size::new(160.0, 100.0), 30.0));
    let mut canvas = Canvas::new(CanvasConfig::default(), GROUP);
    canvas.relayout_all(&mut store).unwrap();
    (canvas, store, MemoryApi::new().with_group(group))
}

fn placements(store: &Store) -> Vec<(ItemId, Point, Option<NodeId>)> {
    store
        .collection(GROUP)
        .unwrap()
        .items()
        .iter()
        .map(|i| (i.id, i.position, i.snapped_to))
        .collect()
}

fn drop_card(canvas: &mut Canvas, store: &mut Store, reconciler: &mut Reconciler, id: u64, to: Point) {
    let center = store.item(GROUP, ItemId::Persisted(id)).unwrap().center();
    canvas
        .press(store, Press::primary(center, PressTarget::Item(ItemId::Persisted(id))))
        .unwrap();
    canvas.pointer_move(to);
    canvas.frame(store).unwrap();
    canvas.release(store, reconciler).unwrap();
}

#[test]
fn test_failed_drop_restores_orbit_neighbours() {
    let (mut canvas, mut store, mut api) = two_node_setup();
    let mut reconciler = Reconciler::new();
    let before = placements(&store);

    drop_card(&mut canvas, &mut store, &mut reconciler, 30, Point::new(700.0, 150.0));
    // Card 31 moved up into the slot card 30 left
    let moved = store.item(GROUP, ItemId::Persisted(31)).unwrap().position;
    assert_eq!(moved, before[0].1);

    api.fail_next(ApiError::status(500, "boom"));
    let outcomes = run_blocking(&mut api, &mut reconciler, &mut store);

    assert!(matches!(&outcomes[0], Outcome::Failed(n) if n.message.starts_with("Could not save item")));
    assert_eq!(placements(&store), before);
    let a = store.item(GROUP, ItemId::Persisted(30)).unwrap().center();
    let b = store.item(GROUP, ItemId::Persisted(31)).unwrap().center();
    assert!(a.distance_to(b) > 1.0);
}

#[test]
fn test_failed_drop_restores_order_and_resends_it() {
    let (mut canvas, mut store, mut api) = two_node_setup();
    let mut reconciler = Reconciler::new();
    let before = placements(&store);

    // Lower-right of the summit: second slot of its ring, after card 32
    drop_card(&mut canvas, &mut store, &mut reconciler, 30, Point::new(740.0, 225.0));
    assert_eq!(store.collection(GROUP).unwrap().persisted_order(), vec![31, 32, 30]);

    api.fail_next(ApiError::status(500, "boom"));
    let outcomes = run_blocking(&mut api, &mut reconciler, &mut store);

    assert!(matches!(
        &outcomes[..],
        [Outcome::Failed(_), Outcome::Superseded, Outcome::Applied]
    ));
    assert_eq!(placements(&store), before);
    assert_eq!(store.collection(GROUP).unwrap().confirmed_order(), &[30, 31, 32]);
    assert_eq!(api.order_of(GROUP), vec![30, 31, 32]);
}

#[test]
fn test_failed_delete_drop_restores_orbit_neighbours() {
    let (mut canvas, mut store, mut api) = two_node_setup();
    let mut reconciler = Reconciler::new();
    let before = placements(&store);

    drop_card(&mut canvas, &mut store, &mut reconciler, 30, Point::new(1200.0, 720.0));
    assert!(store.item(GROUP, ItemId::Persisted(30)).is_err());

    api.fail_next(ApiError::Network("offline".into()));
    run_blocking(&mut api, &mut reconciler, &mut store);

    assert_eq!(placements(&store), before);
    assert_eq!(api.order_of(GROUP), vec![30, 31, 32]);
}

#[test]
fn test_placement_is_persisted() {
    let (mut store, mut api) = group_setup();
    let mut reconciler = Reconciler::new();
    let id = ItemId::Persisted(31);

    let item = store.item_mut(GROUP, id).unwrap();
    let previous = (item.position, item.snapped_to);
    item.position = Point::new(180.0, 60.0);
    item.snapped_to = Some(NodeId(1));
    reconciler
        .save_placement(&store, GROUP, id, previous)
        .unwrap();
    run_blocking(&mut api, &mut reconciler, &mut store);

    let saved = &api.group(7).unwrap().events[1];
    assert_eq!((saved.x, saved.y, saved.node_id), (180.0, 60.0, Some(1)));
}

#[test]
fn test_refresh_groups_replaces_local_state() {
    let (mut store, mut api) = group_setup();
    let mut reconciler = Reconciler::new().with_sizes(Size::new(120.0, 80.0), 24.0);

    // Local drift the server never heard about
    store
        .collection_mut(GROUP)
        .unwrap()
        .remove(ItemId::Persisted(30));
    store
        .move_node(GROUP, NodeId(1), Point::new(0.0, 0.0))
        .unwrap();

    reconciler.refresh_groups();
    let outcomes = run_blocking(&mut api, &mut reconciler, &mut store);
    assert_eq!(outcomes, vec![Outcome::Applied]);

    let collection = store.collection(GROUP).unwrap();
    assert_eq!(collection.confirmed_order(), &[30, 31]);
    assert_eq!(collection.nodes()[0].position, Point::new(200.0, 200.0));
    assert_eq!(collection.nodes()[0].radius, 24.0);
    let event = collection.item(ItemId::Persisted(30)).unwrap();
    assert_eq!(event.snapped_to, Some(NodeId(1)));
    assert_eq!(event.size, Size::new(120.0, 80.0));
}
