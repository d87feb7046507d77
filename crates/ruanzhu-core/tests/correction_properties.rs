//! Property-based tests for the OCR correction table.
//!
//! A single correction pass must be a fixed point: applying the table to
//! its own output changes nothing, for the built-in table and for any
//! extended table the constructor accepts.

use proptest::prelude::*;
use ruanzhu_core::certificate::rules::BUILTIN_CORRECTIONS;
use ruanzhu_core::CorrectionTable;

/// Garbled keys, their replacements, every character of both, and filler.
fn fragments() -> Vec<String> {
    let mut fragments: Vec<String> = Vec::new();
    for (garbled, correct) in BUILTIN_CORRECTIONS {
        fragments.push(garbled.to_string());
        fragments.push(correct.to_string());
        fragments.extend(garbled.chars().map(String::from));
        fragments.extend(correct.chars().map(String::from));
    }
    fragments.extend(["窗", "管理系统", " ", "\n", "a", "：", "2021SR"].map(String::from));
    fragments
}

fn fragment_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(fragments()), 0..24).prop_map(|parts| parts.concat())
}

/// Pairs over a small alphabet so that overlaps between keys and
/// replacements are common.
fn extra_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[ab软件钦包]{1,3}", "[ab软件钦包]{1,3}"), 0..4)
}

#[test]
fn proptest_builtin_apply_is_idempotent() {
    let table = CorrectionTable::builtin();
    proptest!(|(text in fragment_text())| {
        let once = table.apply(&text).into_owned();
        let twice = table.apply(&once).into_owned();
        prop_assert_eq!(once, twice);
    });
}

#[test]
fn proptest_accepted_extensions_stay_idempotent() {
    proptest!(|(extra in extra_pairs(), text in "[ab软件钦包应用基浮]{0,16}")| {
        if let Ok(table) = CorrectionTable::builtin().with_pairs(extra) {
            let once = table.apply(&text).into_owned();
            let twice = table.apply(&once).into_owned();
            prop_assert_eq!(once, twice);
        }
    });
}

#[test]
fn proptest_accepted_tables_stay_idempotent() {
    proptest!(|(pairs in extra_pairs(), text in "[ab软件钦包]{0,16}")| {
        if let Ok(table) = CorrectionTable::new(pairs) {
            let once = table.apply(&text).into_owned();
            let twice = table.apply(&once).into_owned();
            prop_assert_eq!(once, twice);
        }
    });
}
