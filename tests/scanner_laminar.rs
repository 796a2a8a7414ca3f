//! Invariant 9: the `@elements` family the scanner emits is always laminar
//! (a "parenthesis nesting" family) — for any two element regions, either
//! one contains the other or they are disjoint; partial overlap never
//! happens, no matter how the input nests or leaves tags unclosed.

use proptest::prelude::*;

use sgrep::region::Region;
use sgrep::scanner::sgml::{scan, ScanConfig, ScanMode};
use sgrep::leaf::LeafKind;

fn laminar(mut regions: Vec<Region>) -> bool {
    regions.sort_by_key(|r| (r.start, r.end));
    for i in 0..regions.len() {
        for j in (i + 1)..regions.len() {
            let a = regions[i];
            let b = regions[j];
            let disjoint = a.end < b.start || b.end < a.start;
            let nested = (a.start <= b.start && b.end <= a.end) || (b.start <= a.start && a.end <= b.end);
            if !disjoint && !nested {
                return false;
            }
        }
    }
    true
}

fn element_regions(xml: &str) -> Vec<Region> {
    let config = ScanConfig::new(ScanMode::Xml);
    let mut out = Vec::new();
    scan(xml.as_bytes(), 0, &config, &mut |kind, region| {
        if matches!(kind, LeafKind::Element(None)) {
            out.push(region);
        }
    });
    out
}

/// Generates a tree of balanced elements, each tagged with a name from a
/// small alphabet, serialized depth-first.
fn gi_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just("a".to_string()), Just("b".to_string()), Just("c".to_string())]
}

fn xml_tree(depth: u32) -> BoxedStrategy<String> {
    let leaf = gi_strategy().prop_map(|gi| format!("<{gi}/>"));
    if depth == 0 {
        return leaf.boxed();
    }
    let recurse = xml_tree(depth - 1);
    let branch = (gi_strategy(), prop::collection::vec(recurse, 0..3))
        .prop_map(|(gi, children)| format!("<{gi}>{}</{gi}>", children.concat()));
    prop_oneof![leaf, branch].boxed()
}

proptest! {
    #[test]
    fn well_formed_nesting_is_always_laminar(xml in xml_tree(3)) {
        prop_assert!(laminar(element_regions(&xml)));
    }

    #[test]
    fn unclosed_tags_still_close_laminar(gis in prop::collection::vec(gi_strategy(), 1..6)) {
        let xml: String = gis.iter().map(|g| format!("<{g}>")).collect();
        prop_assert!(laminar(element_regions(&xml)));
    }
}

#[test]
fn manually_interleaved_close_order_stays_laminar() {
    let regions = element_regions("<a><b><c/></b></a>");
    assert!(laminar(regions));
}
