//! Integration tests for a single reconciliation pass.
//!
//! Every test builds a sidebar from a fixture, runs one or more passes, and
//! reads the list back through `describe`.
//!
//! ## Running
//!
//! ```bash
//! cargo test -p groupy --test reconcile_integration
//! ```

use groupy_lib::config::DomContract;
use groupy_lib::constants::classes;
use groupy_lib::dom::{Document, ElementMatcher, NodeId};
use groupy_lib::reconcile::{PassReport, PassState, ReconcilerSettings, run_pass};
use groupy_lib::rules::{Rule, parse_rules};
use groupy_lib::sidebar::{EntryView, RoomFixture, RoomView, SidebarFixture, describe, room_labels};

// ============================================================================
// Helpers
// ============================================================================

fn sidebar(rooms: &[(&str, u32, bool)]) -> Document {
    SidebarFixture {
        rooms: rooms
            .iter()
            .map(|&(name, unread, mention)| RoomFixture::new(name, unread, mention))
            .collect(),
    }
    .build(&DomContract::default())
    .unwrap()
}

fn pass(doc: &mut Document, rules: &[Rule], state: &mut PassState) -> PassReport {
    run_pass(doc, rules, &ReconcilerSettings::default(), state)
        .expect("pass should succeed")
        .expect("room list should exist")
}

fn entries(doc: &Document) -> Vec<EntryView> {
    describe(doc, &DomContract::default()).expect("room list should exist")
}

fn group_names(doc: &Document) -> Vec<String> {
    entries(doc)
        .into_iter()
        .filter_map(|entry| match entry {
            EntryView::Group { name, .. } => Some(name),
            EntryView::Room(_) => None,
        })
        .collect()
}

fn labels(doc: &Document) -> Vec<String> {
    room_labels(doc, &DomContract::default()).into_iter().flatten().collect()
}

fn header_of(doc: &Document, group: &str) -> NodeId {
    let list = doc.element_by_id("RoomList").unwrap();
    let container = doc
        .query_all(list, &ElementMatcher::class(classes::GROUP))
        .into_iter()
        .find(|&node| doc.attribute(node, "data-group") == Some(group))
        .unwrap_or_else(|| panic!("group {group} not rendered"));
    doc.query(container, &ElementMatcher::class(classes::HEADER)).unwrap()
}

fn room(name: &str, unread: u32, mention: bool) -> RoomView {
    RoomView { name: Some(name.to_string()), unread, mention }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_single_rule_groups_matching_room() {
    let mut doc = sidebar(&[("Alpha Chat", 3, false), ("Beta Chat", 0, false)]);
    let rules = vec![Rule::new(1, "Team A", &["Alpha"])];

    pass(&mut doc, &rules, &mut PassState::new());

    assert_eq!(entries(&doc), vec![
        EntryView::Group {
            name: "Team A".to_string(),
            unread_total: 3,
            mention: false,
            open: false,
            rooms: vec![room("Alpha Chat", 3, false)],
        },
        EntryView::Room(room("Beta Chat", 0, false)),
    ]);
}

#[test]
fn test_last_matching_rule_wins() {
    let mut doc = sidebar(&[("foobar", 0, false)]);
    let rules = vec![Rule::new(1, "X", &["foo"]), Rule::new(2, "Y", &["foo"])];

    let report = pass(&mut doc, &rules, &mut PassState::new());

    assert_eq!(group_names(&doc), vec!["Y"]);
    assert_eq!(report.groups.len(), 1);
}

#[test]
fn test_clearing_rules_restores_flat_list() {
    let mut doc = sidebar(&[
        ("Alpha 1", 0, false),
        ("Beta 1", 0, false),
        ("Gamma", 0, false),
        ("Alpha 2", 0, false),
    ]);
    let rules = vec![Rule::new(1, "A", &["Alpha"]), Rule::new(2, "B", &["Beta"])];
    let mut state = PassState::new();
    pass(&mut doc, &rules, &mut state);
    let header = header_of(&doc, "A");
    doc.click(header);
    let order_before = labels(&doc);

    let report = pass(&mut doc, &[], &mut state);

    assert_eq!(report.unwrapped, 2);
    assert!(group_names(&doc).is_empty());
    assert_eq!(labels(&doc), order_before);
    let list = doc.element_by_id("RoomList").unwrap();
    assert!(doc.query(list, &ElementMatcher::class(classes::GROUP)).is_none());
}

#[test]
fn test_mention_without_unread_marks_group() {
    let mut doc = sidebar(&[("Alpha Ops", 0, true), ("Alpha Chat", 0, false)]);
    let rules = vec![Rule::new(1, "Team A", &["Alpha"])];

    let report = pass(&mut doc, &rules, &mut PassState::new());

    assert!(report.groups[0].has_mention);
    assert_eq!(report.groups[0].unread_total, 0);
    let EntryView::Group { mention, unread_total, .. } = &entries(&doc)[0] else {
        panic!("expected a group first");
    };
    assert!(*mention);
    assert_eq!(*unread_total, 0);
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_every_room_appears_exactly_once() {
    let mut doc = sidebar(&[
        ("Alpha", 1, false),
        ("Beta", 2, false),
        ("Alpha Beta", 3, true),
        ("Delta", 0, false),
        ("alpha lower", 0, false),
    ]);
    let rules = vec![Rule::new(1, "A", &["Alpha"]), Rule::new(2, "B", &["Beta"])];
    let mut expected = labels(&doc);

    pass(&mut doc, &rules, &mut PassState::new());

    let mut after = labels(&doc);
    expected.sort();
    after.sort();
    assert_eq!(after, expected);
}

#[test]
fn test_pass_is_idempotent() {
    let mut doc = sidebar(&[("Alpha", 1, false), ("Beta", 2, true), ("Gamma", 0, false)]);
    let rules = vec![Rule::new(1, "A", &["Alpha"]), Rule::new(2, "G", &["Gamma"])];
    let mut state = PassState::new();

    pass(&mut doc, &rules, &mut state);
    let first = entries(&doc);
    pass(&mut doc, &rules, &mut state);

    assert_eq!(entries(&doc), first);
}

#[test]
fn test_groups_follow_rule_order_then_ungrouped_in_place() {
    let mut doc = sidebar(&[
        ("x1", 0, false),
        ("b1", 0, false),
        ("x2", 0, false),
        ("a1", 0, false),
        ("b2", 0, false),
        ("x3", 0, false),
    ]);
    let rules = vec![Rule::new(1, "A", &["a"]), Rule::new(2, "B", &["b"])];

    pass(&mut doc, &rules, &mut PassState::new());

    let view = entries(&doc);
    let names: Vec<String> = view
        .iter()
        .map(|entry| match entry {
            EntryView::Group { name, rooms, .. } => {
                let members: Vec<_> = rooms.iter().filter_map(|r| r.name.clone()).collect();
                format!("{name}[{}]", members.join(","))
            }
            EntryView::Room(room) => room.name.clone().unwrap_or_default(),
        })
        .collect();
    assert_eq!(names, vec!["A[a1]", "B[b1,b2]", "x1", "x2", "x3"]);
}

#[test]
fn test_group_totals_sum_members() {
    let mut doc = sidebar(&[("Alpha 1", 4, false), ("Alpha 2", 5, true), ("Beta", 9, false)]);
    let rules = vec![Rule::new(1, "A", &["Alpha"])];

    let report = pass(&mut doc, &rules, &mut PassState::new());

    assert_eq!(report.groups[0].unread_total, 9);
    assert_eq!(report.groups[0].rooms, 2);
    assert!(report.groups[0].has_mention);
}

#[test]
fn test_open_group_stays_open_across_passes() {
    let mut doc = sidebar(&[("Alpha", 0, false), ("Beta", 0, false)]);
    let rules = vec![Rule::new(1, "A", &["Alpha"]), Rule::new(2, "B", &["Beta"])];
    let mut state = PassState::new();
    pass(&mut doc, &rules, &mut state);

    let header = header_of(&doc, "B");
    doc.click(header);
    let report = pass(&mut doc, &rules, &mut state);

    let open: Vec<_> = report.groups.iter().map(|group| (group.name.as_str(), group.open)).collect();
    assert_eq!(open, vec![("A", false), ("B", true)]);
}

#[test]
fn test_removed_group_forgets_open_state() {
    let mut doc = sidebar(&[("Alpha", 0, false)]);
    let rules = vec![Rule::new(1, "A", &["Alpha"])];
    let mut state = PassState::new();
    pass(&mut doc, &rules, &mut state);
    let header = header_of(&doc, "A");
    doc.click(header);

    pass(&mut doc, &[], &mut state);
    let report = pass(&mut doc, &rules, &mut state);

    assert!(!report.groups[0].open);
}

#[test]
fn test_removing_a_rule_releases_its_rooms() {
    let mut doc = sidebar(&[("Alpha", 0, false), ("Beta", 0, false)]);
    let mut state = PassState::new();
    pass(&mut doc, &[Rule::new(1, "A", &["Alpha"]), Rule::new(2, "B", &["Beta"])], &mut state);

    pass(&mut doc, &[Rule::new(2, "B", &["Beta"])], &mut state);

    assert_eq!(group_names(&doc), vec!["B"]);
    assert!(entries(&doc).contains(&EntryView::Room(room("Alpha", 0, false))));
}

#[test]
fn test_malformed_rule_is_skipped() {
    let rules = parse_rules(
        r#"[
            { "id": 1, "groupName": "Broken", "keywords": "Alpha" },
            { "id": 2, "groupName": "B", "keywords": ["Beta"] }
        ]"#,
    );
    let mut doc = sidebar(&[("Alpha", 0, false), ("Beta", 0, false)]);

    pass(&mut doc, &rules, &mut PassState::new());

    assert_eq!(group_names(&doc), vec!["B"]);
}

#[test]
fn test_unlabelled_room_is_never_grouped() {
    let mut doc = SidebarFixture {
        rooms: vec![RoomFixture { name: None, unread: 2, mention: false }, RoomFixture::new("Alpha", 0, false)],
    }
    .build(&DomContract::default())
    .unwrap();

    let report = pass(&mut doc, &[Rule::new(1, "All", &[""])], &mut PassState::new());

    assert_eq!(report.groups[0].rooms, 1);
    assert_eq!(report.ungrouped, 1);
}

#[test]
fn test_missing_list_leaves_document_alone() {
    let mut doc = Document::new();

    let result = run_pass(&mut doc, &[], &ReconcilerSettings::default(), &mut PassState::new());

    assert!(matches!(result, Ok(None)));
    assert!(doc.children(doc.root()).is_empty());
}
