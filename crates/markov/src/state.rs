//! Mapping between arbitrary state labels and dense state indices.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView2};

use crate::error::MarkovError;

/// Ordered set of state labels.
///
/// Index `i` of the state space is the `i`-th label. Labels come either from
/// an explicit ordered list or from the sorted unique values observed in a
/// panel.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSpace<L> {
    labels: Vec<L>,
    index: BTreeMap<L, usize>,
}

impl<L: Ord + Clone> StateSpace<L> {
    /// Builds a state space from an explicit, ordered class list.
    ///
    /// # Errors
    ///
    /// Returns [`MarkovError::EmptyData`] for an empty list and
    /// [`MarkovError::InvalidConfig`] if a label is repeated.
    pub fn new(classes: Vec<L>) -> Result<Self, MarkovError> {
        if classes.is_empty() {
            return Err(MarkovError::EmptyData);
        }
        let mut index = BTreeMap::new();
        for (i, label) in classes.iter().enumerate() {
            if index.insert(label.clone(), i).is_some() {
                return Err(MarkovError::InvalidConfig {
                    reason: format!("class label at position {i} is repeated"),
                });
            }
        }
        Ok(Self {
            labels: classes,
            index,
        })
    }

    /// Builds a state space from the sorted unique labels in `ids`.
    ///
    /// # Errors
    ///
    /// Returns [`MarkovError::EmptyData`] if `ids` has no elements.
    pub fn from_observed(ids: ArrayView2<'_, L>) -> Result<Self, MarkovError> {
        let mut labels: Vec<L> = ids.iter().cloned().collect();
        labels.sort();
        labels.dedup();
        Self::new(labels)
    }

    /// Number of states.
    pub fn k(&self) -> usize {
        self.labels.len()
    }

    /// Labels in index order.
    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    /// Label of state `i`.
    pub fn label(&self, i: usize) -> Option<&L> {
        self.labels.get(i)
    }

    /// Index of `label`, if it belongs to the state space.
    pub fn index_of(&self, label: &L) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Maps every label of `ids` to its state index.
    ///
    /// # Errors
    ///
    /// Returns [`MarkovError::UnknownLabel`] for the first label that is not
    /// part of the state space.
    pub fn encode(&self, ids: ArrayView2<'_, L>) -> Result<Array2<usize>, MarkovError> {
        let mut codes = Array2::zeros(ids.raw_dim());
        for ((unit, period), label) in ids.indexed_iter() {
            codes[[unit, period]] = self
                .index_of(label)
                .ok_or(MarkovError::UnknownLabel { unit, period })?;
        }
        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn observed_labels_are_sorted_and_unique() {
        let ids = array![["b", "a"], ["c", "a"]];
        let space = StateSpace::from_observed(ids.view()).unwrap();
        assert_eq!(space.labels(), &["a", "b", "c"]);
        assert_eq!(space.index_of(&"c"), Some(2));
        assert_eq!(space.k(), 3);
    }

    #[test]
    fn explicit_order_is_kept() {
        let space = StateSpace::new(vec![3, 1, 2]).unwrap();
        assert_eq!(space.index_of(&3), Some(0));
        assert_eq!(space.label(2), Some(&2));
        assert_eq!(space.label(3), None);
    }

    #[test]
    fn encode_rejects_undeclared_label() {
        let space = StateSpace::new(vec![0, 1]).unwrap();
        let ids = array![[0, 1], [1, 5]];
        assert!(matches!(
            space.encode(ids.view()),
            Err(MarkovError::UnknownLabel { unit: 1, period: 1 })
        ));
    }

    #[test]
    fn repeated_or_empty_classes_rejected() {
        assert!(matches!(
            StateSpace::new(vec![1, 1]),
            Err(MarkovError::InvalidConfig { .. })
        ));
        assert!(matches!(
            StateSpace::<u8>::new(Vec::new()),
            Err(MarkovError::EmptyData)
        ));
    }
}
