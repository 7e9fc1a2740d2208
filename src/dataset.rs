//! Loading card exports into typed records.
//!
//! Column names are fixed by the export format. Each contract column is
//! resolved once by header name; a column that is not in the file leaves the
//! corresponding field absent on every record instead of failing the load.

use crate::coerce::{coerce, is_na_token, RawValue};
use crate::normalize::normalize_name;
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;

/// A contract column of the card export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    TaskId,
    ParentId,
    StoreName,
    Points,
    TaskName,
    ParentName,
    ParentUrl,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::TaskId,
        Field::ParentId,
        Field::StoreName,
        Field::Points,
        Field::TaskName,
        Field::ParentName,
        Field::ParentUrl,
    ];

    /// Header string used by the export for this column.
    pub fn header(self) -> &'static str {
        match self {
            Field::TaskId => "Task ID",
            Field::ParentId => "Parent ID",
            Field::StoreName => "Nome da loja (short text)",
            Field::Points => "Pontos de Front (number)",
            Field::TaskName => "Task Name",
            Field::ParentName => "Parent Name",
            Field::ParentUrl => "Parent URL",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Header positions of the contract columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ColumnIndex {
    positions: [Option<usize>; 7],
}

impl ColumnIndex {
    fn resolve(headers: &[String]) -> Self {
        let mut index = ColumnIndex::default();
        for field in Field::ALL {
            index.positions[field.slot()] = headers.iter().position(|h| h == field.header());
        }
        index
    }

    fn get(&self, field: Field) -> Option<usize> {
        self.positions[field.slot()]
    }
}

/// One row of the card export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub task_id: Option<String>,
    /// Present for subtasks, absent for parent tasks.
    pub parent_id: Option<String>,
    pub store_name: Option<String>,
    /// Grouping key derived from `store_name`; absent iff `store_name` is.
    pub normalized_store_name: Option<String>,
    pub points: Option<f64>,
    pub task_name: Option<String>,
    pub parent_name: Option<String>,
    pub parent_url: Option<String>,
    /// Raw cells, aligned with `Dataset::headers`.
    pub cells: Vec<String>,
}

impl Record {
    /// Build a record from its identifying fields, deriving the normalized
    /// store key and coercing the points value.
    pub fn new<'a>(
        task_id: Option<&str>,
        parent_id: Option<&str>,
        store_name: Option<&str>,
        points: impl Into<RawValue<'a>>,
    ) -> Self {
        Record {
            task_id: task_id.map(str::to_string),
            parent_id: parent_id.map(str::to_string),
            store_name: store_name.map(str::to_string),
            normalized_store_name: normalize_name(store_name),
            points: coerce(points.into()),
            ..Record::default()
        }
    }

    #[cfg(test)]
    pub fn with_task_name(mut self, name: &str) -> Self {
        self.task_name = Some(name.to_string());
        self
    }

    #[cfg(test)]
    pub fn with_parent_name(mut self, name: &str) -> Self {
        self.parent_name = Some(name.to_string());
        self
    }

    /// A subtask references another record through its parent id.
    pub fn is_subtask(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn is_parent(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Raw text of a contract field as it would appear in the export.
    #[cfg(test)]
    fn contract_cell(&self, field: Field) -> String {
        let value = match field {
            Field::TaskId => self.task_id.clone(),
            Field::ParentId => self.parent_id.clone(),
            Field::StoreName => self.store_name.clone(),
            Field::Points => self.points.map(|p| p.to_string()),
            Field::TaskName => self.task_name.clone(),
            Field::ParentName => self.parent_name.clone(),
            Field::ParentUrl => self.parent_url.clone(),
        };
        value.unwrap_or_default()
    }
}

/// Turn a raw cell into a value, treating "no value" markers as absent.
fn cell_value(cell: Option<&str>) -> Option<&str> {
    cell.filter(|c| !is_na_token(c))
}

/// The loaded export: headers plus typed records. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    source_name: String,
    headers: Vec<String>,
    columns: ColumnIndex,
    records: Vec<Record>,
}

impl Dataset {
    /// Load a card export CSV from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open input CSV: {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("(unknown)")
            .to_string();
        Self::from_reader(file, &name)
    }

    /// Load a card export from any CSV reader.
    pub fn from_reader<R: Read>(input: R, source_name: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(input);
        let headers: Vec<String> = reader
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(|h| h.to_string())
            .collect();
        let columns = ColumnIndex::resolve(&headers);

        for field in Field::ALL {
            if columns.get(field).is_none() {
                log::warn!(
                    "{}: column '{}' not found, dependent values will be omitted",
                    source_name,
                    field.header()
                );
            }
        }

        let mut records = Vec::new();
        let mut unparsed_points = 0usize;

        for (row_num, result) in reader.records().enumerate() {
            let row = result.with_context(|| format!("Failed to read CSV row {}", row_num + 1))?;
            let get = |field: Field| cell_value(columns.get(field).and_then(|i| row.get(i)));

            let points_cell = get(Field::Points);
            let mut record = Record::new(
                get(Field::TaskId),
                get(Field::ParentId),
                get(Field::StoreName),
                points_cell,
            );
            if points_cell.is_some() && record.points.is_none() {
                unparsed_points += 1;
                log::debug!(
                    "Row {}: points value {:?} is not numeric",
                    row_num + 1,
                    points_cell.unwrap_or_default()
                );
            }
            record.task_name = get(Field::TaskName).map(str::to_string);
            record.parent_name = get(Field::ParentName).map(str::to_string);
            record.parent_url = get(Field::ParentUrl).map(str::to_string);
            record.cells = (0..headers.len())
                .map(|i| row.get(i).unwrap_or("").to_string())
                .collect();
            records.push(record);
        }

        if unparsed_points > 0 {
            log::warn!(
                "{}: {} points values were not numeric and count as missing",
                source_name,
                unparsed_points
            );
        }
        log::debug!("{}: loaded {} records", source_name, records.len());

        Ok(Dataset {
            source_name: source_name.to_string(),
            headers,
            columns,
            records,
        })
    }

    /// Build a dataset from records already in memory. All contract columns
    /// are considered present and raw cells are regenerated from the fields.
    #[cfg(test)]
    pub fn from_records(source_name: &str, records: Vec<Record>) -> Self {
        let headers: Vec<String> = Field::ALL.iter().map(|f| f.header().to_string()).collect();
        let columns = ColumnIndex::resolve(&headers);
        let records = records
            .into_iter()
            .map(|mut r| {
                r.cells = Field::ALL.iter().map(|f| r.contract_cell(*f)).collect();
                r
            })
            .collect();
        Dataset {
            source_name: source_name.to_string(),
            headers,
            columns,
            records,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the export carried this contract column.
    pub fn has_column(&self, field: Field) -> bool {
        self.columns.get(field).is_some()
    }
}
