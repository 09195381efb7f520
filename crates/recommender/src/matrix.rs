//! Implicit-feedback interaction matrix
//!
//! Rows are users, columns are items. Both axes are sorted ascending by id;
//! the column order is the item index used by every downstream structure.

use crate::repository::InteractionRecord;
use ndarray::Array2;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Sparse binary user-item matrix
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionMatrix {
    user_ids: Vec<String>,
    item_ids: Vec<String>,
    /// (user_index, item_index) pairs with weight 1
    entries: HashSet<(usize, usize)>,
}

impl InteractionMatrix {
    /// Build from raw records; duplicate (user, item) pairs collapse to one entry
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a InteractionRecord>,
    {
        let records: Vec<&InteractionRecord> = records.into_iter().collect();

        let user_ids: Vec<String> = records
            .iter()
            .map(|r| r.user_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let item_ids: Vec<String> = records
            .iter()
            .map(|r| r.item_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let user_positions = positions(&user_ids);
        let item_positions = positions(&item_ids);

        let entries = records
            .iter()
            .map(|r| (user_positions[r.user_id.as_str()], item_positions[r.item_id.as_str()]))
            .collect();

        Self {
            user_ids,
            item_ids,
            entries,
        }
    }

    pub fn num_users(&self) -> usize {
        self.user_ids.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_ids.len()
    }

    /// Number of non-zero cells
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn user_ids(&self) -> &[String] {
        &self.user_ids
    }

    /// Column order; position `i` is column `i`
    pub fn item_ids(&self) -> &[String] {
        &self.item_ids
    }

    /// Interaction count per item, in column order
    pub fn item_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.item_ids.len()];
        for &(_, item_idx) in &self.entries {
            counts[item_idx] += 1;
        }
        counts
    }

    /// Dense `[num_users x num_items]` copy for factorization
    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::<f64>::zeros((self.num_users(), self.num_items()));
        for &(u, i) in &self.entries {
            dense[[u, i]] = 1.0;
        }
        dense
    }
}

fn positions(ids: &[String]) -> HashMap<&str, usize> {
    ids.iter()
        .enumerate()
        .map(|(idx, id)| (id.as_str(), idx))
        .collect()
}
