//! Order-independent keyed merge of section results
//!
//! Section units finish in any order. Their results are combined by section
//! number, so the merged map is the same for every completion order. Two
//! results claiming the same number are rejected rather than silently
//! overwritten.

use crate::error::MergeError;
use quill_types::{Section, SectionNumber};
use std::collections::{BTreeMap, HashSet};

/// Merge a batch of sections into `target`
///
/// `target` is left untouched if the batch is rejected.
///
/// # Errors
/// `MergeError::DuplicateSection` if two sections in `batch` share a number,
/// or a number is already present in `target`.
pub fn merge_sections(
    target: &mut BTreeMap<SectionNumber, Section>,
    batch: Vec<Section>,
) -> Result<(), MergeError> {
    validate_unique_numbers(target, &batch)?;
    target.extend(batch.into_iter().map(|s| (s.section_number, s)));
    Ok(())
}

fn validate_unique_numbers(
    target: &BTreeMap<SectionNumber, Section>,
    batch: &[Section],
) -> Result<(), MergeError> {
    let mut seen = HashSet::with_capacity(batch.len());
    for section in batch {
        let number = section.section_number;
        if target.contains_key(&number) || !seen.insert(number) {
            return Err(MergeError::DuplicateSection(number));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use quill_types::SectionPlan;

    fn section(n: SectionNumber) -> Section {
        let mut s = Section::from_plan(n, SectionPlan::new(format!("S{n}"), "", true));
        s.content = format!("content {n}");
        s
    }

    #[test]
    fn merges_disjoint_batches() {
        let mut map = BTreeMap::new();
        merge_sections(&mut map, vec![section(3), section(1)]).unwrap();
        merge_sections(&mut map, vec![section(2)]).unwrap();
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn rejects_duplicate_within_batch() {
        let mut map = BTreeMap::new();
        let err = merge_sections(&mut map, vec![section(1), section(1)]).unwrap_err();
        assert_eq!(err, MergeError::DuplicateSection(1));
        assert!(map.is_empty());
    }

    #[test]
    fn rejects_number_already_merged() {
        let mut map = BTreeMap::new();
        merge_sections(&mut map, vec![section(1)]).unwrap();
        let err = merge_sections(&mut map, vec![section(2), section(1)]).unwrap_err();
        assert_eq!(err, MergeError::DuplicateSection(1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn empty_batch_is_noop() {
        let mut map = BTreeMap::new();
        merge_sections(&mut map, Vec::new()).unwrap();
        assert!(map.is_empty());
    }

    proptest! {
        #[test]
        fn merge_is_independent_of_completion_order(
            order in Just((1..=8u32).collect::<Vec<_>>()).prop_shuffle()
        ) {
            let mut shuffled = BTreeMap::new();
            merge_sections(&mut shuffled, order.iter().map(|&n| section(n)).collect()).unwrap();

            let mut sorted = BTreeMap::new();
            merge_sections(&mut sorted, (1..=8).map(section).collect()).unwrap();

            prop_assert_eq!(shuffled, sorted);
        }
    }
}
