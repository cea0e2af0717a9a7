//! Per-category set difference between two document snapshots.
//!
//! # Responsibility
//! - Record units missing on the target side under the caller's operation.
//! - Record units present on both sides but structurally unequal as `Update`.
//!
//! # Invariants
//! - Processing follows the source side's unit order; nothing is sorted.
//! - A unit already recorded in the delta is never recorded twice.
//! - A missing category on either side reads as empty, never as an error.

use super::equality::units_equal;
use crate::model::delta::{ChangeOp, Delta};
use crate::model::document::Document;
use crate::model::unit::Category;
use log::{debug, info};

/// Records into `delta` every unit of `category` in `source` that needs
/// `op` applied to reach `target`.
///
/// Returns the number of entries recorded by this call.
pub fn diff_category(
    category: Category,
    source: &Document,
    target: &Document,
    op: ChangeOp,
    delta: &mut Delta,
) -> usize {
    let mut recorded = 0;
    for unit in source.units(category) {
        match target.unit(category, &unit.name) {
            None => {
                debug!(
                    "event=diff_found module=diff category={} op={} unit={}",
                    category, op, unit.name
                );
                delta.record(category, op, unit.clone());
                recorded += 1;
            }
            Some(counterpart) => {
                if delta.contains(category, &unit.name) {
                    continue;
                }
                if !units_equal(Some(unit), Some(counterpart)) {
                    debug!(
                        "event=diff_found module=diff category={} op=update unit={}",
                        category, unit.name
                    );
                    delta.record(category, ChangeOp::Update, unit.clone());
                    recorded += 1;
                }
            }
        }
    }
    recorded
}

/// Builds a fresh delta between `baseline` and `working`.
///
/// For every category the first pass walks the baseline (deletions and
/// updates holding the baseline copy), the second walks the working copy
/// (additions).
pub fn compute_delta(baseline: &Document, working: &Document) -> Delta {
    let mut delta = Delta::new();
    for category in Category::ALL {
        diff_category(category, baseline, working, ChangeOp::Delete, &mut delta);
        diff_category(category, working, baseline, ChangeOp::Add, &mut delta);
    }
    info!(
        "event=delta_computed module=diff status=ok entries={} changes={:?}",
        delta.len(),
        delta.changed_units()
    );
    delta
}

#[cfg(test)]
mod tests {
    use super::{compute_delta, diff_category};
    use crate::model::delta::{ChangeOp, Delta};
    use crate::model::document::Document;
    use crate::model::unit::{Category, Field, Unit};

    #[test]
    fn second_pass_skips_units_already_recorded() {
        let mut baseline = Document::new();
        baseline.push_unit(Category::Enum, Unit::enumeration("Enum_A", vec![Field::new("X", 0)]));
        let mut working = Document::new();
        working.push_unit(Category::Enum, Unit::enumeration("Enum_A", vec![Field::new("Y", 0)]));

        let mut delta = Delta::new();
        let first = diff_category(Category::Enum, &baseline, &working, ChangeOp::Delete, &mut delta);
        let second = diff_category(Category::Enum, &working, &baseline, ChangeOp::Add, &mut delta);

        assert_eq!(first, 1);
        assert_eq!(second, 0);
        let entry = delta.entry(Category::Enum, "Enum_A").expect("update entry");
        assert_eq!(entry.op, ChangeOp::Update);
        assert_eq!(entry.unit.fields()[0].name, "X");
    }

    #[test]
    fn identical_documents_produce_empty_delta() {
        let mut doc = Document::new();
        doc.push_unit(Category::Data, Unit::message("Data_A", vec![]));
        assert!(compute_delta(&doc, &doc.clone()).is_empty());
    }

    #[test]
    fn absent_categories_are_treated_as_empty() {
        let baseline = Document::new();
        let mut working = Document::new();
        working.push_unit(Category::Rpc, Unit::rpc("Rpc_Ping", vec![]));

        let delta = compute_delta(&baseline, &working);
        assert_eq!(delta.changed_units(), vec!["[add]Rpc_Ping"]);
    }
}
