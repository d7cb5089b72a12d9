//! Tests for the layout document tree and its element helpers.

use vellum_core::document::{CustomAttr, InsertMode, ReadingDirection};
use vellum_core::{ElementKind, ErrorKind, LayoutDocument, NodeId};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<(f64, f64)> {
    vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
}

fn sample() -> (LayoutDocument, NodeId, NodeId) {
    let mut doc = LayoutDocument::new("tester");
    let page = doc.add_page("scan 1.png", 400, 300).unwrap();
    let region = doc.add_text_region(page, None, None).unwrap();
    doc.set_coords(region, &rect(10.0, 10.0, 390.0, 290.0)).unwrap();
    (doc, page, region)
}

// ============================================================================
// Tree structure
// ============================================================================

#[test]
fn test_new_document_has_metadata() {
    let doc = LayoutDocument::new("tester");
    let meta = doc.metadata().unwrap();
    let kinds: Vec<_> = doc.children(meta).iter().map(|&n| doc.kind(n)).collect();
    assert_eq!(
        kinds,
        vec![ElementKind::Creator, ElementKind::Created, ElementKind::LastChange]
    );
    assert_eq!(doc.text(doc.children(meta)[0]), Some("tester"));
    assert!(doc.last_change().is_some());
}

#[test]
fn test_create_node_placement() {
    let (mut doc, page, region) = sample();
    let after = doc
        .create_node(ElementKind::TextRegion, Some("after"), region, InsertMode::NextSibling)
        .unwrap();
    let before = doc
        .create_node(ElementKind::TextRegion, Some("before"), region, InsertMode::PrevSibling)
        .unwrap();
    assert_eq!(doc.children(page), &[before, region, after]);
    assert_eq!(doc.parent(after), Some(page));

    let err = doc
        .create_node(ElementKind::TextRegion, Some("after"), page, InsertMode::Child)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_remove_node_drops_subtree() {
    let (mut doc, _, region) = sample();
    let line = doc.add_text_line(region, None, None).unwrap();
    let word = doc.add_word(line, None, None).unwrap();
    doc.remove_node(line).unwrap();
    assert!(!doc.is_alive(line));
    assert!(!doc.is_alive(word));
    assert!(doc.find_by_id("t1_l1").is_none());
    assert!(doc.remove_node(doc.root()).is_err());
    assert_eq!(doc.remove_nodes(&[line, word]).unwrap(), 0);
}

#[test]
fn test_closest_and_descendants() {
    let (mut doc, page, region) = sample();
    let line = doc.add_text_line(region, None, None).unwrap();
    let word = doc.add_word(line, None, None).unwrap();
    assert_eq!(doc.closest(ElementKind::TextRegion, word), Some(region));
    assert_eq!(doc.closest(ElementKind::Page, word), Some(page));
    assert_eq!(doc.closest(ElementKind::Word, word), Some(word));
    assert_eq!(doc.closest(ElementKind::Glyph, word), None);

    let kinds: Vec<_> = doc
        .descendants(region)
        .into_iter()
        .map(|n| doc.kind(n))
        .collect();
    assert_eq!(
        kinds,
        vec![ElementKind::Coords, ElementKind::TextLine, ElementKind::Word]
    );
}

#[test]
fn test_import_subtree_copies_everything() {
    let (mut src, _, region) = sample();
    let line = src.add_text_line(region, Some("l1"), None).unwrap();
    src.set_baseline(line, &[(20.0, 40.0), (200.0, 40.0)]).unwrap();
    src.set_text_equiv(line, "hello", Some(0.9)).unwrap();

    let (mut dst, _, target) = sample();
    let copied = dst.import_subtree(&src, line, target, InsertMode::Child).unwrap();
    assert_eq!(dst.id(copied), Some("l1"));
    assert_eq!(dst.baseline(copied).unwrap().unwrap(), vec![(20.0, 40.0), (200.0, 40.0)]);
    assert_eq!(dst.text_equiv(copied), Some("hello"));

    let err = dst.import_subtree(&src, line, target, InsertMode::Child).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(dst.children_of_kind(target, ElementKind::TextLine).len(), 1);
}

// ============================================================================
// Selectors
// ============================================================================

#[test]
fn test_select_paths() {
    let (mut doc, page, region) = sample();
    let l1 = doc.add_text_line(region, None, None).unwrap();
    let l2 = doc.add_text_line(region, None, None).unwrap();
    let other = doc.add_text_region(page, Some("other"), None).unwrap();
    let l3 = doc.add_text_line(other, None, None).unwrap();

    assert_eq!(doc.select("//TextLine", None).unwrap(), vec![l1, l2, l3]);
    assert_eq!(
        doc.select("//TextRegion[@id='other']/TextLine", None).unwrap(),
        vec![l3]
    );
    assert_eq!(doc.select("TextLine", Some(region)).unwrap(), vec![l1, l2]);
    assert_eq!(doc.select("..", Some(l3)).unwrap(), vec![other]);
    assert_eq!(doc.select("//*[@id]", Some(l3)).unwrap().len(), 5);
    assert_eq!(doc.count("//TextRegion/Coords", None).unwrap(), 1);
    assert_eq!(doc.select_one("//Word", None).unwrap(), None);
}

#[test]
fn test_select_rejects_bad_syntax() {
    let doc = LayoutDocument::new("tester");
    assert!(doc.select("//TextLine[@id='x'", None).is_err());
    assert!(doc.select("//TextLine/", None).is_err());
    assert!(doc.select("TextLine[id='x']", None).is_err());
    assert!(doc.select("//Bogus", None).unwrap().is_empty());
}

// ============================================================================
// Element helpers
// ============================================================================

#[test]
fn test_id_synthesis_skips_taken_ids() {
    let (mut doc, page, region) = sample();
    assert_eq!(doc.id(region), Some("t1"));
    doc.add_text_region(page, Some("t3"), None).unwrap();
    let r = doc.add_text_region(page, None, None).unwrap();
    assert_eq!(doc.id(r), Some("t4"));

    let line = doc.add_text_line(region, None, None).unwrap();
    let word = doc.add_word(line, None, None).unwrap();
    let glyph = doc.add_glyph(word, None, None).unwrap();
    assert_eq!(doc.id(line), Some("t1_l1"));
    assert_eq!(doc.id(word), Some("t1_l1_w1"));
    assert_eq!(doc.id(glyph), Some("t1_l1_w1_g1"));
}

#[test]
fn test_add_before_sibling() {
    let (mut doc, _, region) = sample();
    let a = doc.add_text_line(region, Some("a"), None).unwrap();
    let b = doc.add_text_line(region, Some("b"), Some("a")).unwrap();
    assert_eq!(doc.children_of_kind(region, ElementKind::TextLine), vec![b, a]);
    assert!(doc.add_text_line(region, None, Some("missing")).is_err());
}

#[test]
fn test_failed_set_coords_keeps_old_points() {
    let (mut doc, _, region) = sample();
    let err = doc.set_coords(region, &[(0.0, 0.0), (1.0, 1.0)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(doc.coords(region).unwrap().unwrap(), rect(10.0, 10.0, 390.0, 290.0));

    let err = doc
        .set_coords(region, &[(0.0, 0.0), (f64::NAN, 1.0), (2.0, 2.0)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(doc.children_of_kind(region, ElementKind::Coords).len(), 1);
}

#[test]
fn test_geometry_children_order() {
    let (mut doc, _, region) = sample();
    let line = doc.add_text_line(region, None, None).unwrap();
    doc.set_text_equiv(line, "abc", None).unwrap();
    doc.set_baseline(line, &[(20.0, 50.0), (100.0, 50.0)]).unwrap();
    doc.set_polystripe(line, 20.0, 0.25).unwrap();

    let kinds: Vec<_> = doc.children(line).iter().map(|&n| doc.kind(n)).collect();
    assert_eq!(
        kinds,
        vec![ElementKind::Coords, ElementKind::Baseline, ElementKind::TextEquiv]
    );
    assert_eq!(
        doc.coords(line).unwrap().unwrap(),
        vec![(20.0, 35.0), (100.0, 35.0), (100.0, 55.0), (20.0, 55.0)]
    );
}

#[test]
fn test_text_equiv_replaces() {
    let (mut doc, _, region) = sample();
    doc.set_text_equiv(region, "first", None).unwrap();
    doc.set_text_equiv(region, "second", Some(0.5)).unwrap();
    assert_eq!(doc.text_equiv(region), Some("second"));
    assert_eq!(doc.children_of_kind(region, ElementKind::TextEquiv).len(), 1);
}

#[test]
fn test_page_properties() {
    let (mut doc, page, region) = sample();
    assert_eq!(doc.page_size(page).unwrap(), (400, 300));
    assert_eq!(doc.image_base(page).unwrap(), "scan_1");
    assert_eq!(doc.page_number(region), Some(0));
    assert_eq!(doc.page_orientation(page).unwrap(), 0.0);

    let second = doc.add_page("p2.jpg", 10, 10).unwrap();
    assert_eq!(doc.page_number(second), Some(1));
    assert!(doc.add_page("empty.png", 0, 10).is_err());
}

#[test]
fn test_rotation_and_direction_inherit_from_region() {
    let (mut doc, _, region) = sample();
    let line = doc.add_text_line(region, None, None).unwrap();

    doc.set_rotation(region, 90.0).unwrap();
    doc.set_reading_direction(region, ReadingDirection::RightToLeft).unwrap();
    assert_eq!(doc.rotation(line).unwrap(), 90.0);
    assert_eq!(doc.reading_direction(line).unwrap(), ReadingDirection::RightToLeft);

    doc.set_rotation(line, -1.5).unwrap();
    doc.set_reading_direction(line, ReadingDirection::TopToBottom).unwrap();
    assert_eq!(doc.rotation(line).unwrap(), -1.5);
    assert_eq!(doc.reading_direction(line).unwrap(), ReadingDirection::TopToBottom);
    assert_eq!(
        doc.attr(line, "custom"),
        Some("readingOrientation: -1.5; readingDirection: ttb;")
    );

    doc.set_rotation(line, 0.0).unwrap();
    doc.set_reading_direction(line, ReadingDirection::LeftToRight).unwrap();
    assert_eq!(doc.attr(line, "custom"), None);
    assert_eq!(doc.rotation(line).unwrap(), 90.0);

    assert!(doc.set_rotation(doc.root(), 10.0).is_err());
}

#[test]
fn test_x_height_from_custom() {
    let (mut doc, _, region) = sample();
    let line = doc.add_text_line(region, None, None).unwrap();
    assert_eq!(doc.x_height(line).unwrap(), None);
    doc.set_attr(line, "custom", "readingOrder {index:0;} x-height: 17px;")
        .unwrap();
    assert_eq!(doc.x_height(line).unwrap(), Some(17.0));
    doc.set_attr(line, "custom", "x-height: tall;").unwrap();
    assert!(doc.x_height(line).is_err());
}

#[test]
fn test_fpgram_from_coords() {
    let (mut doc, _, region) = sample();
    let line = doc.add_text_line(region, None, None).unwrap();
    assert_eq!(doc.fpgram(line).unwrap(), None);

    let coords = doc.set_coords(line, &rect(20.0, 20.0, 200.0, 50.0)).unwrap();
    assert_eq!(doc.fpgram(line).unwrap(), None);

    doc.set_attr(coords, "fpgram", "20,22 200,20 200,48 20,50").unwrap();
    assert_eq!(
        doc.fpgram(line).unwrap(),
        Some(vec![(20.0, 22.0), (200.0, 20.0), (200.0, 48.0), (20.0, 50.0)])
    );
    doc.set_attr(coords, "fpgram", "20,22 oops").unwrap();
    assert_eq!(doc.fpgram(line).unwrap_err().kind(), ErrorKind::Validation);
}

#[test]
fn test_custom_attr_round_trip() {
    let raw = "readingOrder {index:2;} structure {type:heading;level:1;} x-height: 12px;";
    let custom = CustomAttr::parse(raw).unwrap();
    assert_eq!(custom.group_value("structure", "level"), Some("1"));
    assert_eq!(custom.get("x-height"), Some("12px"));
    assert_eq!(custom.to_string(), raw);
    assert_eq!(CustomAttr::parse(&custom.to_string()).unwrap(), custom);

    assert!(CustomAttr::parse("readingOrder {index:2;").is_err());
    assert!(CustomAttr::parse("lonely;").is_err());
}

#[test]
fn test_simplify_ids() {
    let mut doc = LayoutDocument::new("tester");
    let page = doc.add_page("scan 1.png", 400, 300).unwrap();
    let region = doc.add_text_region(page, Some("scan_1_r5"), None).unwrap();
    let line = doc.add_text_line(region, Some("scan_1_r5.l2"), None).unwrap();
    let kept = doc.add_text_region(page, Some("r7"), None).unwrap();

    assert_eq!(doc.simplify_ids(page).unwrap(), 2);
    assert_eq!(doc.id(region), Some("r5"));
    assert_eq!(doc.attr(region, "orig-id"), Some("scan_1_r5"));
    assert_eq!(doc.id(line), Some("r5_l2"));
    assert_eq!(doc.id(kept), Some("r7"));
    assert!(doc.unique_ids());
}

#[test]
fn test_reorder_children_keeps_other_slots() {
    let (mut doc, _, region) = sample();
    let a = doc.add_text_line(region, Some("a"), None).unwrap();
    let b = doc.add_text_line(region, Some("b"), None).unwrap();
    let c = doc.add_text_line(region, Some("c"), None).unwrap();
    let coords = doc.children(region)[0];

    doc.reorder_children(region, &[c, a, b]).unwrap();
    assert_eq!(doc.children(region), &[coords, c, a, b]);
    assert!(doc.reorder_children(region, &[a, a]).is_err());
}

// ============================================================================
// Process metadata
// ============================================================================

#[test]
fn test_process_records_metadata() {
    let mut doc = LayoutDocument::new("tester");
    let handle = doc.process_start("lineorder");
    assert_eq!(handle.tool(), "lineorder");
    let process = doc.process_end(handle).unwrap();

    assert_eq!(doc.kind(process), ElementKind::Process);
    assert_eq!(doc.parent(process), doc.metadata());
    assert_eq!(doc.attr(process, "tool"), Some("lineorder"));
    let time: f64 = doc.attr(process, "time").unwrap().parse().unwrap();
    assert!(time >= 0.0);
    assert!(doc.attr(process, "started").unwrap().ends_with('Z'));
}
