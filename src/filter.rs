//! Record filtering by task type and store.

use crate::dataset::{Dataset, Record};
use std::collections::BTreeSet;
use std::fmt;

/// Which side of the parent/subtask split to keep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TaskTypeMode {
    #[default]
    All,
    /// Records without a parent id.
    ParentsOnly,
    /// Records with a parent id.
    SubtasksOnly,
}

impl TaskTypeMode {
    pub const ALL: [TaskTypeMode; 3] = [
        TaskTypeMode::All,
        TaskTypeMode::ParentsOnly,
        TaskTypeMode::SubtasksOnly,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TaskTypeMode::All => "Todos",
            TaskTypeMode::ParentsOnly => "Tarefas Pai",
            TaskTypeMode::SubtasksOnly => "Subtarefas",
        }
    }

    pub fn matches(self, record: &Record) -> bool {
        match self {
            TaskTypeMode::All => true,
            TaskTypeMode::ParentsOnly => record.is_parent(),
            TaskTypeMode::SubtasksOnly => record.is_subtask(),
        }
    }
}

impl fmt::Display for TaskTypeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Store restriction. `Exact` compares the raw display name, not the
/// normalized key, so "Loja A" does not match "loja a".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum StoreFilter {
    #[default]
    AllSellers,
    Exact(String),
}

impl StoreFilter {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            StoreFilter::AllSellers => true,
            StoreFilter::Exact(name) => record.store_name.as_deref() == Some(name.as_str()),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, StoreFilter::AllSellers)
    }
}

impl fmt::Display for StoreFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreFilter::AllSellers => f.write_str("Todos"),
            StoreFilter::Exact(name) => f.write_str(name),
        }
    }
}

/// The active filter selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Filters {
    pub task_type: TaskTypeMode,
    pub store: StoreFilter,
}

impl Filters {
    pub fn new(task_type: TaskTypeMode, store: StoreFilter) -> Self {
        Filters { task_type, store }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.task_type.matches(record) && self.store.matches(record)
    }
}

/// Keep the records that pass both predicates, in their original order.
pub fn filter_records<'a, I>(records: I, filters: &Filters) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    records.into_iter().filter(|r| filters.matches(r)).collect()
}

/// Filter a whole dataset.
pub fn apply_filters<'a>(dataset: &'a Dataset, filters: &Filters) -> Vec<&'a Record> {
    filter_records(dataset.records(), filters)
}

/// Distinct raw store names present in the dataset, sorted.
pub fn seller_options(dataset: &Dataset) -> Vec<String> {
    dataset
        .records()
        .iter()
        .filter_map(|r| r.store_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
