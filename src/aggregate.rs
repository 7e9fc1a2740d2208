//! Aggregates over a filtered record view.

use crate::dataset::Record;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Key/value pairs ordered by value, largest first.
///
/// Entries with equal values keep the order in which their key was first
/// seen in the input, so identical input always ranks identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking<V> {
    entries: Vec<(String, V)>,
}

impl<V> Ranking<V> {
    pub fn entries(&self) -> &[(String, V)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl<V: Clone> Ranking<V> {
    /// First `n` entries, or all of them when there are fewer.
    pub fn head(&self, n: usize) -> Ranking<V> {
        Ranking {
            entries: self.entries.iter().take(n).cloned().collect(),
        }
    }
}

impl<V> FromIterator<(String, V)> for Ranking<V> {
    /// Collects entries as given; no reordering happens here.
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Ranking {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Group values by key in first-seen order, then stable-sort descending.
fn rank_by<V, F>(items: impl Iterator<Item = (String, V)>, mut fold: F) -> Ranking<V>
where
    V: PartialOrd,
    F: FnMut(&mut V, V),
{
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut entries: Vec<(String, V)> = Vec::new();

    for (key, value) in items {
        match slots.get(&key) {
            Some(&i) => fold(&mut entries[i].1, value),
            None => {
                slots.insert(key.clone(), entries.len());
                entries.push((key, value));
            }
        }
    }

    entries.sort_by(|a, b| descending_nan_last(&a.1, &b.1));
    Ranking { entries }
}

/// Largest first, with values that do not compare to themselves (NaN) last.
fn descending_nan_last<V: PartialOrd>(a: &V, b: &V) -> Ordering {
    let a_nan = a.partial_cmp(a).is_none();
    let b_nan = b.partial_cmp(b).is_none();
    match (a_nan, b_nan) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        _ => b.partial_cmp(a).unwrap_or(Ordering::Equal),
    }
}

/// Aggregate computations over one filtered view.
pub struct Aggregator<'a> {
    records: &'a [&'a Record],
}

impl<'a> Aggregator<'a> {
    pub fn new(records: &'a [&'a Record]) -> Self {
        Aggregator { records }
    }

    pub fn total_count(&self) -> usize {
        self.records.len()
    }

    /// Sum of points over records that have a value. Missing adds nothing.
    pub fn total_points(&self) -> f64 {
        self.records.iter().filter_map(|r| r.points).sum()
    }

    /// Number of records whose points value is present.
    pub fn points_present(&self) -> usize {
        self.records.iter().filter(|r| r.points.is_some()).count()
    }

    pub fn parent_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_parent()).count()
    }

    pub fn subtask_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_subtask()).count()
    }

    /// Record count per normalized store key. Records without a store are
    /// not counted.
    pub fn counts_by_store(&self) -> Ranking<usize> {
        rank_by(
            self.records
                .iter()
                .filter_map(|r| r.normalized_store_name.clone().map(|k| (k, 1usize))),
            |acc, v| *acc += v,
        )
    }

    /// Points per normalized store key, missing points counting as 0.
    pub fn points_by_store(&self) -> Ranking<f64> {
        rank_by(
            self.records.iter().filter_map(|r| {
                r.normalized_store_name
                    .clone()
                    .map(|k| (k, r.points.unwrap_or(0.0)))
            }),
            |acc, v| *acc += v,
        )
    }

    /// Number of subtasks in this view referencing each parent id.
    pub fn subtask_count_by_parent(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for parent_id in self.records.iter().filter_map(|r| r.parent_id.as_ref()) {
            *counts.entry(parent_id.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Display text for the total points metric: no decimals, and "0" when no
/// record carries a value.
pub fn format_total_points(total: f64, present: usize) -> String {
    if present == 0 || total.is_nan() {
        "0".to_string()
    } else {
        format!("{:.0}", total)
    }
}
