//! Algebraic properties of the region operators (§8 invariants 1-6, 8),
//! exercised through the public query language rather than the evaluator's
//! private helpers: a constant region list literal is both the input and
//! the oracle, so these tests double as grammar coverage for `[(s,e),...]`.

use proptest::prelude::*;

use sgrep::engine::Engine;
use sgrep::region::Region;
use sgrep::scanner::sgml::{ScanConfig, ScanMode};
use sgrep::Parser;

fn eval(expr: &str) -> Vec<Region> {
    let mut engine = Engine::new();
    let root = Parser::parse(expr.as_bytes(), "<test>").unwrap();
    let config = ScanConfig::new(ScanMode::PlainText);
    let result = engine.run(root, None, &config);
    let v = result.borrow().as_start_sorted();
    v
}

fn render(regions: &[(i32, i32)]) -> String {
    let body: Vec<String> = regions.iter().map(|(s, e)| format!("({s},{e})")).collect();
    format!("[{}]", body.join(","))
}

/// Flat (non-overlapping, non-touching) regions built from a list of
/// (gap, length) steps, keeping every generated constant list well-formed
/// for the `[(s,e),...]` grammar without needing to special-case nesting.
fn flat_regions(steps: &[(u8, u8)]) -> Vec<(i32, i32)> {
    let mut cursor = 0i32;
    let mut out = Vec::new();
    for &(gap, len) in steps {
        cursor += i32::from(gap) + 1;
        let start = cursor;
        let end = start + i32::from(len);
        out.push((start, end));
        cursor = end + 1;
    }
    out
}

fn steps_strategy() -> impl Strategy<Value = Vec<(u8, u8)>> {
    prop::collection::vec((0u8..4, 0u8..4), 0..8)
}

proptest! {
    #[test]
    fn in_whole_span_is_a_superset_of_the_original(steps in steps_strategy()) {
        let regions = flat_regions(&steps);
        let a = render(&regions);
        let n = regions.iter().map(|(_, e)| e + 2).max().unwrap_or(1);
        let expr = format!("{a} in [(0,{})]", n - 1);
        let result = eval(&expr);
        for r in regions.iter().map(|&(s, e)| Region::new(s, e)) {
            prop_assert!(result.contains(&r));
        }
    }

    #[test]
    fn as_start_sorted_is_always_non_decreasing(steps in steps_strategy()) {
        let regions = flat_regions(&steps);
        let a = render(&regions);
        let result = eval(&a);
        for w in result.windows(2) {
            prop_assert!((w[0].start, w[0].end) <= (w[1].start, w[1].end));
        }
    }

    #[test]
    fn or_with_itself_is_the_identity(steps in steps_strategy()) {
        let regions = flat_regions(&steps);
        let a = render(&regions);
        let expr = format!("{a} or {a}");
        prop_assert_eq!(eval(&expr), eval(&a));
    }

    #[test]
    fn containing_empty_is_empty(steps in steps_strategy()) {
        let a = render(&flat_regions(&steps));
        let expr = format!("{a} containing []");
        prop_assert!(eval(&expr).is_empty());
    }

    #[test]
    fn not_containing_empty_is_the_identity(steps in steps_strategy()) {
        let regions = flat_regions(&steps);
        let a = render(&regions);
        let expr = format!("{a} not containing []");
        prop_assert_eq!(eval(&expr), eval(&a));
    }

    #[test]
    fn outer_is_idempotent(steps in steps_strategy()) {
        let a = render(&flat_regions(&steps));
        prop_assert_eq!(eval(&format!("outer(outer({a}))")), eval(&format!("outer({a})")));
    }

    #[test]
    fn inner_is_idempotent(steps in steps_strategy()) {
        let a = render(&flat_regions(&steps));
        prop_assert_eq!(eval(&format!("inner(inner({a}))")), eval(&format!("inner({a})")));
    }

    #[test]
    fn concat_is_idempotent(steps in steps_strategy()) {
        let a = render(&flat_regions(&steps));
        prop_assert_eq!(eval(&format!("concat(concat({a}))")), eval(&format!("concat({a})")));
    }

    #[test]
    fn extracting_distributes_over_concat_of_the_cutter(
        a_steps in steps_strategy(),
        b_steps in steps_strategy(),
    ) {
        let a = render(&flat_regions(&a_steps));
        let b = render(&flat_regions(&b_steps));
        let lhs = format!("{a} extracting concat({b})");
        let rhs = format!("{a} extracting {b}");
        prop_assert_eq!(eval(&lhs), eval(&rhs));
    }

    #[test]
    fn join_by_one_is_the_identity(steps in steps_strategy()) {
        let regions = flat_regions(&steps);
        let a = render(&regions);
        prop_assert_eq!(eval(&format!("join(1, {a})")), eval(&a));
    }

    #[test]
    fn first_of_last_k_equals_last_k_when_long_enough(steps in steps_strategy()) {
        let regions = flat_regions(&steps);
        if regions.len() < 2 {
            return Ok(());
        }
        let k = (regions.len() / 2).max(1) as i64;
        let a = render(&regions);
        let last_k = format!("last({k}, {a})");
        let first_of_last = format!("first({k}, {last_k})");
        prop_assert_eq!(eval(&first_of_last), eval(&last_k));
    }
}

#[test]
fn varint_bijectivity_on_small_and_large_magnitudes() {
    use sgrep::index::varint::{decode, encode_value, Varint};
    for v in [0i64, 1, 126, 127, 128, 16383, 16384, (1 << 21) - 1, 1 << 21, i32::MAX as i64, -1, -127, -(i32::MAX as i64)]
    {
        let mut buf = Vec::new();
        encode_value(v, &mut buf);
        let (decoded, consumed) = decode(&buf).unwrap();
        assert_eq!(decoded, Varint::Value(v));
        assert_eq!(consumed, buf.len());
    }
}
