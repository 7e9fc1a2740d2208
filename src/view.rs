//! Shaping aggregates into what the front ends display.
//!
//! `compute_view` is the single entry point: it takes a loaded dataset and
//! the current filter selection and returns a `ViewModel` holding every
//! metric, ranked series and table of the dashboard. It is pure, so front
//! ends simply call it again whenever a selection changes.

use crate::aggregate::{format_total_points, Aggregator, Ranking};
use crate::coerce::is_na_token;
use crate::dataset::{Dataset, Field, Record};
use crate::filter::{apply_filters, Filters};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Number of entries shown in each ranked chart.
pub const DEFAULT_TOP_N: usize = 10;

/// Base of the task link built from a task id.
pub const TASK_URL_BASE: &str = "https://app.clickup.com/t/";

/// What an absent task id renders as inside a subtask link.
pub const MISSING_MARKER: &str = "nan";

pub const NO_PARENT_TASKS: &str = "Nenhuma tarefa pai encontrada com os filtros aplicados.";
pub const NO_SUBTASKS: &str = "Nenhuma subtarefa encontrada com os filtros aplicados.";

// Display column titles for computed columns.
pub const COL_TASK_URL: &str = "Task URL";
pub const COL_TOTAL_SUBTASKS: &str = "Total Subtarefas";
pub const COL_STORE_KEY: &str = "Nome da loja normalizado";
pub const COL_STORE_COUNT: &str = "Quantidade de tarefas";
pub const COL_STORE_POINTS: &str = "Total de pontos";
pub const COL_NORMALIZED_NAME: &str = "Nome Normalizado";

/// Knobs that shape the view without affecting filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewOptions {
    pub top_n: usize,
    pub task_url_base: String,
}

impl Default for ViewOptions {
    fn default() -> Self {
        ViewOptions {
            top_n: DEFAULT_TOP_N,
            task_url_base: TASK_URL_BASE.to_string(),
        }
    }
}

// ============================================================================
// Table building blocks
// ============================================================================

/// A single display cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Link(String),
}

impl Cell {
    fn text(value: Option<&str>) -> Cell {
        match value {
            Some(s) => Cell::Text(s.to_string()),
            None => Cell::Empty,
        }
    }

    fn number(value: Option<f64>) -> Cell {
        match value {
            Some(n) => Cell::Number(n),
            None => Cell::Empty,
        }
    }

    fn link(url: String) -> Cell {
        if url.is_empty() {
            Cell::Empty
        } else {
            Cell::Link(url)
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) | Cell::Link(s) => f.write_str(s),
            Cell::Number(n) => f.write_str(&format_number(*n)),
        }
    }
}

/// Render a number without a trailing ".0" for whole values.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A display table: column titles plus rows of cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column by its title.
    pub fn column(&self, title: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == title)
    }
}

/// A dashboard section that shows either a table or a "no data" message.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Table(Table),
    NoData(String),
}

impl Section {
    pub fn table(&self) -> Option<&Table> {
        match self {
            Section::Table(t) => Some(t),
            Section::NoData(_) => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Section::NoData(_))
    }
}

/// Select the columns of a row set that the dataset can fill.
struct ColumnPlan<R> {
    columns: Vec<(String, fn(&R) -> Cell)>,
}

impl<R> ColumnPlan<R> {
    fn new() -> Self {
        ColumnPlan {
            columns: Vec::new(),
        }
    }

    fn always(mut self, title: &str, cell: fn(&R) -> Cell) -> Self {
        self.columns.push((title.to_string(), cell));
        self
    }

    fn when(self, dataset: &Dataset, field: Field, cell: fn(&R) -> Cell) -> Self {
        if dataset.has_column(field) {
            self.always(field.header(), cell)
        } else {
            self
        }
    }

    fn build(&self, rows: &[R]) -> Table {
        Table {
            headers: self.columns.iter().map(|(t, _)| t.clone()).collect(),
            rows: rows
                .iter()
                .map(|r| self.columns.iter().map(|(_, cell)| cell(r)).collect())
                .collect(),
        }
    }
}

// ============================================================================
// Assemblers
// ============================================================================

/// First `n` ranked entries, order preserved.
pub fn top_n<V: Clone>(ranking: &Ranking<V>, n: usize) -> Ranking<V> {
    ranking.head(n)
}

/// One line of the per-store analysis. Serializes under the display titles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreRow {
    #[serde(rename = "Nome da loja normalizado")]
    pub normalized_name: String,
    #[serde(rename = "Quantidade de tarefas")]
    pub count: usize,
    #[serde(rename = "Total de pontos")]
    pub points: f64,
}

/// Join store counts with store points. Every counted store appears; a store
/// without points shows 0.
pub fn store_analysis_table(counts: &Ranking<usize>, points: &Ranking<f64>) -> Vec<StoreRow> {
    counts
        .entries()
        .iter()
        .map(|(name, count)| StoreRow {
            normalized_name: name.clone(),
            count: *count,
            points: points.get(name).copied().unwrap_or(0.0),
        })
        .collect()
}

/// Link to a task, or empty when the id is absent.
pub fn task_url(base: &str, task_id: Option<&str>) -> String {
    match task_id {
        Some(id) => format!("{}{}", base, id),
        None => String::new(),
    }
}

/// Link to a subtask. The id is not checked for absence, so a subtask
/// without an id links to the missing marker.
pub fn subtask_url(base: &str, task_id: Option<&str>) -> String {
    format!("{}{}", base, task_id.unwrap_or(MISSING_MARKER))
}

/// A parent task with its number of subtasks in the current view.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentTaskRow {
    pub task_url: String,
    pub task_name: Option<String>,
    pub store_name: Option<String>,
    pub points: Option<f64>,
    pub total_subtasks: usize,
}

/// Every parent task of the view, in view order.
pub fn parent_task_table(records: &[&Record], url_base: &str) -> Vec<ParentTaskRow> {
    let subtasks = Aggregator::new(records).subtask_count_by_parent();
    records
        .iter()
        .filter(|r| r.is_parent())
        .map(|r| ParentTaskRow {
            task_url: task_url(url_base, r.task_id.as_deref()),
            task_name: r.task_name.clone(),
            store_name: r.store_name.clone(),
            points: r.points,
            total_subtasks: total_subtasks_for(&subtasks, r.task_id.as_deref()),
        })
        .collect()
}

fn total_subtasks_for(counts: &HashMap<String, usize>, task_id: Option<&str>) -> usize {
    task_id.and_then(|id| counts.get(id)).copied().unwrap_or(0)
}

/// A subtask with links to itself and its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtaskRow {
    pub parent_url: Option<String>,
    pub parent_name: Option<String>,
    pub task_name: Option<String>,
    pub task_url: String,
    pub store_name: Option<String>,
    pub points: Option<f64>,
    /// Sort key only; not displayed.
    pub task_id: Option<String>,
}

/// Every subtask of the view, sorted by task id then task name, absent
/// values last.
pub fn subtask_table(records: &[&Record], url_base: &str) -> Vec<SubtaskRow> {
    let mut rows: Vec<SubtaskRow> = records
        .iter()
        .filter(|r| r.is_subtask())
        .map(|r| SubtaskRow {
            parent_url: r.parent_url.clone(),
            parent_name: r.parent_name.clone(),
            task_name: r.task_name.clone(),
            task_url: subtask_url(url_base, r.task_id.as_deref()),
            store_name: r.store_name.clone(),
            points: r.points,
            task_id: r.task_id.clone(),
        })
        .collect();
    rows.sort_by(|a, b| {
        cmp_absent_last(&a.task_id, &b.task_id)
            .then_with(|| cmp_absent_last(&a.task_name, &b.task_name))
    });
    rows
}

fn cmp_absent_last(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ============================================================================
// Display tables
// ============================================================================

pub fn store_display_table(rows: &[StoreRow]) -> Table {
    ColumnPlan::<StoreRow>::new()
        .always(COL_STORE_KEY, |r| Cell::Text(r.normalized_name.clone()))
        .always(COL_STORE_COUNT, |r| Cell::Number(r.count as f64))
        .always(COL_STORE_POINTS, |r| Cell::Number(r.points))
        .build(rows)
}

/// Parent task table restricted to the columns the dataset has.
pub fn parent_display_table(dataset: &Dataset, rows: &[ParentTaskRow]) -> Table {
    ColumnPlan::<ParentTaskRow>::new()
        .always(COL_TASK_URL, |r| Cell::link(r.task_url.clone()))
        .when(dataset, Field::TaskName, |r| Cell::text(r.task_name.as_deref()))
        .when(dataset, Field::StoreName, |r| Cell::text(r.store_name.as_deref()))
        .when(dataset, Field::Points, |r| Cell::number(r.points))
        .always(COL_TOTAL_SUBTASKS, |r| Cell::Number(r.total_subtasks as f64))
        .build(rows)
}

/// Subtask table restricted to the columns the dataset has.
pub fn subtask_display_table(dataset: &Dataset, rows: &[SubtaskRow]) -> Table {
    ColumnPlan::<SubtaskRow>::new()
        .when(dataset, Field::ParentUrl, |r| {
            Cell::link(r.parent_url.clone().unwrap_or_default())
        })
        .when(dataset, Field::ParentName, |r| Cell::text(r.parent_name.as_deref()))
        .when(dataset, Field::TaskName, |r| Cell::text(r.task_name.as_deref()))
        .always(COL_TASK_URL, |r| Cell::link(r.task_url.clone()))
        .when(dataset, Field::StoreName, |r| Cell::text(r.store_name.as_deref()))
        .when(dataset, Field::Points, |r| Cell::number(r.points))
        .build(rows)
}

/// Every column of the filtered records, plus the normalized store key when
/// the export has a store column. "No value" markers show as empty cells.
pub fn filtered_display_table(dataset: &Dataset, records: &[&Record]) -> Table {
    let with_key = dataset.has_column(Field::StoreName);

    let mut headers = dataset.headers().to_vec();
    if with_key {
        headers.push(COL_NORMALIZED_NAME.to_string());
    }

    let rows = records
        .iter()
        .map(|r| {
            let mut cells: Vec<Cell> = r
                .cells
                .iter()
                .map(|c| {
                    if is_na_token(c) {
                        Cell::Empty
                    } else {
                        Cell::Text(c.clone())
                    }
                })
                .collect();
            if with_key {
                cells.push(Cell::text(r.normalized_store_name.as_deref()));
            }
            cells
        })
        .collect();

    Table { headers, rows }
}

// ============================================================================
// View model
// ============================================================================

/// Headline numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_cards: usize,
    pub total_points: f64,
    /// Records contributing to `total_points`.
    pub points_present: usize,
    pub parent_tasks: usize,
    pub subtasks: usize,
}

impl Metrics {
    pub fn total_points_display(&self) -> String {
        format_total_points(self.total_points, self.points_present)
    }
}

/// The two ranked series shown as bar charts.
#[derive(Debug, Clone, PartialEq)]
pub struct Charts {
    pub task_counts: Ranking<usize>,
    pub points: Ranking<f64>,
}

/// Everything the dashboard shows for one filter selection, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub filters: Filters,
    pub metrics: Metrics,
    pub charts: Charts,
    /// Only present when no store filter is active.
    pub store_analysis: Option<Table>,
    pub parent_tasks: Section,
    pub subtasks: Section,
    pub filtered_data: Table,
}

/// Run the whole pipeline for one filter selection.
pub fn compute_view(dataset: &Dataset, filters: &Filters, options: &ViewOptions) -> ViewModel {
    let filtered = apply_filters(dataset, filters);
    let agg = Aggregator::new(&filtered);

    let metrics = Metrics {
        total_cards: agg.total_count(),
        total_points: agg.total_points(),
        points_present: agg.points_present(),
        parent_tasks: agg.parent_count(),
        subtasks: agg.subtask_count(),
    };

    let counts = agg.counts_by_store();
    let points = agg.points_by_store();

    let charts = Charts {
        task_counts: top_n(&counts, options.top_n),
        points: top_n(&points, options.top_n),
    };

    let store_analysis = if filters.store.is_all() {
        Some(store_display_table(&store_analysis_table(&counts, &points)))
    } else {
        None
    };

    let parent_rows = parent_task_table(&filtered, &options.task_url_base);
    let parent_tasks = if parent_rows.is_empty() {
        Section::NoData(NO_PARENT_TASKS.to_string())
    } else {
        Section::Table(parent_display_table(dataset, &parent_rows))
    };

    let subtask_rows = subtask_table(&filtered, &options.task_url_base);
    let subtasks = if subtask_rows.is_empty() {
        Section::NoData(NO_SUBTASKS.to_string())
    } else {
        Section::Table(subtask_display_table(dataset, &subtask_rows))
    };

    log::debug!(
        "View for {:?}: {} of {} records",
        filters,
        metrics.total_cards,
        dataset.len()
    );

    ViewModel {
        filters: filters.clone(),
        metrics,
        charts,
        store_analysis,
        parent_tasks,
        subtasks,
        filtered_data: filtered_display_table(dataset, &filtered),
    }
}
