//! Pipeline functions for programmatic use by both CLI and GUI.
//!
//! Loading an input source, rendering a computed view as text, and writing
//! tables and workbooks. Everything here returns structured results or
//! strings; printing is left to the callers.

use crate::aggregate::Ranking;
use crate::dataset::Dataset;
use crate::filter::Filters;
use crate::view::{format_number, Cell, Section, Table, ViewModel};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write;
use std::path::{Path, PathBuf};

// ============================================================================
// Input sources
// ============================================================================

/// Where the export comes from. Both kinds load into the same `Dataset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// A file picked or uploaded by the user.
    Upload(PathBuf),
    /// A file from the local collection folder, by file name.
    Collection { dir: PathBuf, name: String },
}

impl InputSource {
    pub fn path(&self) -> PathBuf {
        match self {
            InputSource::Upload(path) => path.clone(),
            InputSource::Collection { dir, name } => dir.join(name),
        }
    }
}

/// Read and type the export behind an input source.
pub fn load_dataset(source: &InputSource) -> Result<Dataset> {
    let path = source.path();
    if let InputSource::Collection { dir, name } = source {
        if !path.is_file() {
            anyhow::bail!("'{}' not found in collection {}", name, dir.display());
        }
    }
    let dataset = Dataset::from_path(&path)?;
    log::info!("Loaded {} records from {}", dataset.len(), path.display());
    Ok(dataset)
}

/// CSV files of the local collection, sorted by file name.
pub fn list_collection(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read collection folder: {}", dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

// ============================================================================
// Text rendering
// ============================================================================

const BAR_WIDTH: usize = 40;
const LABEL_WIDTH: usize = 28;

/// Render the headline part of a view: metrics, both ranked series and,
/// when present, the per-store analysis.
pub fn render_report(view: &ViewModel) -> Result<String> {
    let mut out = String::new();

    writeln!(
        out,
        "Filters: task type = {}, seller = {}",
        view.filters.task_type, view.filters.store
    )?;
    writeln!(out, "\n{:=^80}", " Metrics ")?;
    writeln!(
        out,
        "{:>18} {:>18} {:>18} {:>18}",
        "Total de Cards", "Total de Pontos", "Tarefas Pai", "Subtarefas"
    )?;
    writeln!(
        out,
        "{:>18} {:>18} {:>18} {:>18}",
        view.metrics.total_cards,
        view.metrics.total_points_display(),
        view.metrics.parent_tasks,
        view.metrics.subtasks
    )?;

    writeln!(
        out,
        "\n{:=^80}",
        format!(" Top {} - Quantidade de Tarefas ", view.charts.task_counts.len())
    )?;
    out.push_str(&render_bars(&view.charts.task_counts, |v| *v as f64));

    writeln!(
        out,
        "\n{:=^80}",
        format!(" Top {} - Pontos por Loja ", view.charts.points.len())
    )?;
    out.push_str(&render_bars(&view.charts.points, |v| *v));

    if let Some(stores) = &view.store_analysis {
        writeln!(out, "\n{:=^80}", " Análise por Loja (Nomes Normalizados) ")?;
        out.push_str(&render_table(stores, None));
    }

    writeln!(out, "\n{:=^80}", "")?;
    Ok(out)
}

/// Horizontal text bars scaled to the largest value.
pub fn render_bars<V>(ranking: &Ranking<V>, value: impl Fn(&V) -> f64) -> String {
    if ranking.is_empty() {
        return "(sem dados)\n".to_string();
    }

    let max = ranking
        .entries()
        .iter()
        .map(|(_, v)| value(v))
        .fold(0.0_f64, f64::max);

    let mut out = String::new();
    for (label, v) in ranking.entries() {
        let n = value(v);
        let len = if max > 0.0 && n > 0.0 {
            ((n / max) * BAR_WIDTH as f64).round().max(1.0) as usize
        } else {
            0
        };
        let _ = writeln!(
            out,
            "{:<width$} {:<bar$} {}",
            truncate_label(label, LABEL_WIDTH),
            "#".repeat(len),
            format_number(n),
            width = LABEL_WIDTH,
            bar = BAR_WIDTH
        );
    }
    out
}

/// A section as text: its table, or its no-data message.
pub fn render_section(section: &Section, limit: Option<usize>) -> String {
    match section {
        Section::Table(table) => render_table(table, limit),
        Section::NoData(message) => format!("{}\n", message),
    }
}

/// Fixed-width text table. `limit` caps the number of rows printed.
pub fn render_table(table: &Table, limit: Option<usize>) -> String {
    const MAX_COL_WIDTH: usize = 48;

    let shown = limit.unwrap_or(table.rows.len()).min(table.rows.len());
    let rows: Vec<Vec<String>> = table.rows[..shown]
        .iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect();

    let widths: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
                .min(MAX_COL_WIDTH)
        })
        .collect();

    let mut out = String::new();
    let line = |cells: &[String], out: &mut String| {
        let parts: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                format!("{:<w$}", truncate_label(cell, *w), w = *w)
            })
            .collect();
        out.push_str(parts.join("  ").trim_end());
        out.push('\n');
    };

    line(table.headers.as_slice(), &mut out);
    let rule_len: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    out.push_str(&"-".repeat(rule_len));
    out.push('\n');
    for row in &rows {
        line(row.as_slice(), &mut out);
    }
    if shown < table.rows.len() {
        let _ = writeln!(out, "... and {} more rows", table.rows.len() - shown);
    }
    out
}

/// Shorten a label to `max_len` characters, marking the cut with "...".
fn truncate_label(label: &str, max_len: usize) -> String {
    if label.chars().count() <= max_len {
        label.to_string()
    } else if max_len <= 3 {
        label.chars().take(max_len).collect()
    } else {
        let head: String = label.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

// ============================================================================
// CSV export
// ============================================================================

/// Write a display table to CSV.
pub fn write_table_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create output CSV: {}", path.display()))?;
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|c| c.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write typed rows to CSV, one header per serialized field.
pub fn write_rows_csv<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create output CSV: {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

// ============================================================================
// Excel export
// ============================================================================

/// Configuration for the workbook export.
pub struct ExportConfig {
    /// Display name of the loaded export (for the Summary sheet)
    pub source_name: String,
    /// Output xlsx path
    pub output: PathBuf,
}

/// Write a computed view to an Excel workbook.
///
/// Produces Summary, Stores, Parent Tasks, Subtasks and Filtered Data
/// sheets. Returns a summary string on success.
pub fn export_workbook(view: &ViewModel, config: &ExportConfig) -> Result<String> {
    use rust_xlsxwriter::{Format, FormatAlign, FormatUnderline, Formula, Workbook};

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let left_fmt = Format::new().set_align(FormatAlign::Left);
    let link_fmt = Format::new()
        .set_font_color("#0563C1")
        .set_underline(FormatUnderline::Single);

    // ---------------------------------------------------------------
    // Summary sheet (first tab)
    // ---------------------------------------------------------------
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;

        let title_fmt = Format::new().set_bold().set_font_size(16);
        let mut row: u32 = 0;

        sheet.write_string_with_format(row, 0, "Card Insights", &title_fmt)?;
        row += 2;

        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let lines: [(&str, String); 8] = [
            ("Source", config.source_name.clone()),
            ("Export Date", now),
            ("Tipo de Card", view.filters.task_type.to_string()),
            ("Seller", view.filters.store.to_string()),
            ("Total de Cards", view.metrics.total_cards.to_string()),
            ("Total de Pontos", view.metrics.total_points_display()),
            ("Tarefas Pai", view.metrics.parent_tasks.to_string()),
            ("Subtarefas", view.metrics.subtasks.to_string()),
        ];
        for (label, value) in &lines {
            sheet.write_string_with_format(row, 0, *label, &bold)?;
            sheet.write_string_with_format(row, 1, value, &left_fmt)?;
            row += 1;
        }

        sheet.set_column_width(0, 22)?;
        sheet.set_column_width(1, 36)?;
    }

    // ---------------------------------------------------------------
    // Table sheets
    // ---------------------------------------------------------------
    let empty = Table::default();
    let sheets: [(&str, Option<&Table>, Option<&str>); 4] = [
        ("Stores", view.store_analysis.as_ref(), None),
        (
            "Parent Tasks",
            view.parent_tasks.table(),
            no_data_message(&view.parent_tasks),
        ),
        (
            "Subtasks",
            view.subtasks.table(),
            no_data_message(&view.subtasks),
        ),
        ("Filtered Data", Some(&view.filtered_data), None),
    ];

    let mut written = 0usize;
    for (name, table, message) in sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;

        if let Some(message) = message {
            sheet.write_string(0, 0, message)?;
            continue;
        }
        let table = table.unwrap_or(&empty);

        for (col, header) in table.headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, header, &bold)?;
        }
        for (i, cells) in table.rows.iter().enumerate() {
            let row = (i + 1) as u32;
            for (col, cell) in cells.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Empty => {}
                    Cell::Text(s) => {
                        sheet.write_string(row, col, s)?;
                    }
                    Cell::Number(n) => {
                        sheet.write_number(row, col, *n)?;
                    }
                    Cell::Link(url) => {
                        // Blue underline so HYPERLINK formulas render as links
                        let escaped = url.replace('"', "\"\"");
                        let formula = format!("HYPERLINK(\"{url}\",\"{url}\")", url = escaped);
                        sheet.write_formula_with_format(row, col, Formula::new(formula), &link_fmt)?;
                    }
                }
            }
        }
        if !table.headers.is_empty() {
            sheet.autofilter(0, 0, table.rows.len() as u32, table.headers.len() as u16 - 1)?;
        }
        sheet.set_freeze_panes(1, 0)?;
        written += table.rows.len();
    }

    workbook
        .save(&config.output)
        .with_context(|| format!("Failed to save workbook: {}", config.output.display()))?;

    Ok(format!(
        "Workbook written to {} ({} table rows)",
        config.output.display(),
        written
    ))
}

fn no_data_message(section: &Section) -> Option<&str> {
    match section {
        Section::NoData(message) => Some(message.as_str()),
        Section::Table(_) => None,
    }
}

/// Compute a view and export it in one call.
pub fn export_source(
    source: &InputSource,
    filters: &Filters,
    options: &crate::view::ViewOptions,
    output: &Path,
) -> Result<String> {
    let dataset = load_dataset(source)?;
    let view = crate::view::compute_view(&dataset, filters, options);
    export_workbook(
        &view,
        &ExportConfig {
            source_name: dataset.source_name().to_string(),
            output: output.to_path_buf(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Record;
    use crate::filter::{StoreFilter, TaskTypeMode};
    use crate::view::{compute_view, ViewOptions};

    fn sample_view(filters: &Filters) -> ViewModel {
        let ds = Dataset::from_records(
            "sample",
            vec![
                Record::new(Some("p1"), None, Some("Loja A"), "8").with_task_name("Home"),
                Record::new(Some("s1"), Some("p1"), Some("Loja B"), "2")
                    .with_task_name("Banner")
                    .with_parent_name("Home"),
            ],
        );
        compute_view(&ds, filters, &ViewOptions::default())
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("short", 10), "short");
        assert_eq!(truncate_label("a very long store name", 10), "a very ...");
        assert_eq!(truncate_label("abcdef", 2), "ab");
    }

    #[test]
    fn test_render_bars_scales_to_max() {
        let ranking: Ranking<usize> = vec![("a".to_string(), 4), ("b".to_string(), 2)]
            .into_iter()
            .collect();
        let text = render_bars(&ranking, |v| *v as f64);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].matches('#').count(), BAR_WIDTH);
        assert_eq!(lines[1].matches('#').count(), BAR_WIDTH / 2);
        assert!(lines[0].ends_with(" 4"));
    }

    #[test]
    fn test_render_bars_empty() {
        let ranking: Ranking<f64> = Ranking::default();
        assert_eq!(render_bars(&ranking, |v| *v), "(sem dados)\n");
    }

    #[test]
    fn test_render_report_sections() {
        let view = sample_view(&Filters::default());
        let text = render_report(&view).unwrap();
        assert!(text.contains("Total de Cards"));
        assert!(text.contains("Análise por Loja"));
        assert!(text.contains("lojaa"));

        let filtered = sample_view(&Filters::new(
            TaskTypeMode::All,
            StoreFilter::Exact("Loja A".to_string()),
        ));
        let text = render_report(&filtered).unwrap();
        assert!(!text.contains("Análise por Loja"));
        assert!(text.contains("seller = Loja A"));
    }

    #[test]
    fn test_render_table_limit() {
        let view = sample_view(&Filters::default());
        let text = render_table(&view.filtered_data, Some(1));
        assert!(text.starts_with("Task ID"));
        assert!(text.contains("... and 1 more rows"));
    }

    #[test]
    fn test_render_no_data_section() {
        let view = sample_view(&Filters::new(
            TaskTypeMode::ParentsOnly,
            StoreFilter::AllSellers,
        ));
        let text = render_section(&view.subtasks, None);
        assert_eq!(text, format!("{}\n", crate::view::NO_SUBTASKS));
    }

    #[test]
    fn test_write_table_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parents.csv");
        let view = sample_view(&Filters::default());
        write_table_csv(view.parent_tasks.table().unwrap(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("Task URL,Task Name,Nome da loja (short text),Pontos de Front (number),Total Subtarefas")
        );
        assert_eq!(
            lines.next(),
            Some("https://app.clickup.com/t/p1,Home,Loja A,8,1")
        );
    }

    #[test]
    fn test_write_rows_csv_uses_display_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stores.csv");
        let rows = vec![crate::view::StoreRow {
            normalized_name: "lojaa".to_string(),
            count: 2,
            points: 7.5,
        }];
        write_rows_csv(&rows, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Nome da loja normalizado,Quantidade de tarefas,Total de pontos"));
        assert!(content.contains("lojaa,2,7.5"));
    }

    #[test]
    fn test_export_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("dashboard.xlsx");
        let view = sample_view(&Filters::default());
        let summary = export_workbook(
            &view,
            &ExportConfig {
                source_name: "sample".to_string(),
                output: output.clone(),
            },
        )
        .unwrap();
        assert!(summary.contains("dashboard.xlsx"));
        assert!(output.exists());
        assert!(std::fs::metadata(&output).unwrap().len() > 0);
    }

    #[test]
    fn test_export_workbook_with_no_data_sections() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("empty.xlsx");
        let view = sample_view(&Filters::new(
            TaskTypeMode::All,
            StoreFilter::Exact("Unknown".to_string()),
        ));
        export_workbook(
            &view,
            &ExportConfig {
                source_name: "sample".to_string(),
                output: output.clone(),
            },
        )
        .unwrap();
        assert!(output.exists());
    }

    #[test]
    fn test_list_collection() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.csv"), "Task ID\n").unwrap();
        std::fs::write(dir.path().join("a.CSV"), "Task ID\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let files = list_collection(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["a.CSV", "b.csv"]);
    }

    #[test]
    fn test_load_from_collection() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("cards.csv"),
            "Task ID,Parent ID\nt1,\nt2,t1\n",
        )
        .unwrap();

        let source = InputSource::Collection {
            dir: dir.path().to_path_buf(),
            name: "cards.csv".to_string(),
        };
        let ds = load_dataset(&source).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.source_name(), "cards.csv");

        let missing = InputSource::Collection {
            dir: dir.path().to_path_buf(),
            name: "other.csv".to_string(),
        };
        let err = load_dataset(&missing).unwrap_err();
        assert!(err.to_string().contains("not found in collection"));
    }
}
