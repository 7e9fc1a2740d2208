//! Integration test for the dashboard pipeline on a realistic export
//!
//! Loads a CSV the way both front ends do, runs `compute_view` for several
//! filter selections and checks the metrics, rankings, tables and exports.

use card_insights::aggregate::Aggregator;
use card_insights::filter::{apply_filters, seller_options, Filters, StoreFilter, TaskTypeMode};
use card_insights::pipeline::{
    export_source, load_dataset, render_report, write_rows_csv, write_table_csv, InputSource,
};
use card_insights::view::{
    compute_view, store_analysis_table, Cell, Section, ViewOptions, NO_PARENT_TASKS, NO_SUBTASKS,
};
use card_insights::Dataset;
use std::fs;
use std::path::PathBuf;

const EXPORT: &str = "\
Task ID,Task Name,Parent ID,Parent Name,Parent URL,Nome da loja (short text),Pontos de Front (number),Status
p1,Home,,,,Loja São João,8,open
p2,Checkout,,,,loja sao joao,n/a,done
s1,Banner,p1,Home,https://app.clickup.com/t/p1,Loja B,3,open
s2,\"Footer, dark\",p1,Home,https://app.clickup.com/t/p1,Loja São João,2,open
p3,Search,,,,,5,open
";

fn write_export(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn load(content: &str) -> (tempfile::TempDir, Dataset) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_export(&dir, "cards.csv", content);
    let dataset = load_dataset(&InputSource::Upload(path)).unwrap();
    (dir, dataset)
}

#[test]
fn test_full_dashboard_without_filters() {
    let (_dir, dataset) = load(EXPORT);
    assert_eq!(dataset.len(), 5);

    let view = compute_view(&dataset, &Filters::default(), &ViewOptions::default());

    assert_eq!(view.metrics.total_cards, 5);
    assert_eq!(view.metrics.total_points, 18.0);
    assert_eq!(view.metrics.total_points_display(), "18");
    assert_eq!(view.metrics.parent_tasks, 3);
    assert_eq!(view.metrics.subtasks, 2);

    // Accented and lowercase spellings share one key; the store-less card is not ranked
    assert_eq!(
        view.charts.task_counts.entries(),
        &[("lojasaojoao".to_string(), 3), ("lojab".to_string(), 1)]
    );
    assert_eq!(
        view.charts.points.entries(),
        &[("lojasaojoao".to_string(), 10.0), ("lojab".to_string(), 3.0)]
    );

    let stores = view.store_analysis.as_ref().unwrap();
    assert_eq!(stores.len(), 2);
    assert_eq!(stores.rows[0][0], Cell::Text("lojasaojoao".to_string()));

    let parents = view.parent_tasks.table().unwrap();
    assert_eq!(parents.len(), 3);
    let url = parents.column("Task URL").unwrap();
    let subtasks = parents.column("Total Subtarefas").unwrap();
    assert_eq!(
        parents.rows[0][url],
        Cell::Link("https://app.clickup.com/t/p1".to_string())
    );
    assert_eq!(parents.rows[0][subtasks], Cell::Number(2.0));
    assert_eq!(parents.rows[1][subtasks], Cell::Number(0.0));

    let subs = view.subtasks.table().unwrap();
    assert_eq!(subs.len(), 2);
    assert_eq!(
        subs.headers,
        vec![
            "Parent URL",
            "Parent Name",
            "Task Name",
            "Task URL",
            "Nome da loja (short text)",
            "Pontos de Front (number)",
        ]
    );
    assert_eq!(subs.rows[0][2], Cell::Text("Banner".to_string()));

    // Raw display keeps every column, including ones outside the contract,
    // followed by the normalized store key
    let data = &view.filtered_data;
    assert_eq!(data.len(), 5);
    assert_eq!(data.column("Status"), Some(7));
    assert_eq!(data.column("Nome Normalizado"), Some(8));
    assert_eq!(data.rows[3][1], Cell::Text("Footer, dark".to_string()));
    assert_eq!(data.rows[1][8], Cell::Text("lojasaojoao".to_string()));
    assert_eq!(data.rows[1][6], Cell::Empty);
    assert_eq!(data.rows[4][8], Cell::Empty);
}

#[test]
fn test_seller_options_keep_raw_spellings() {
    let (_dir, dataset) = load(EXPORT);
    assert_eq!(
        seller_options(&dataset),
        vec!["Loja B", "Loja São João", "loja sao joao"]
    );
}

#[test]
fn test_store_filter_selection() {
    let (_dir, dataset) = load(EXPORT);
    let filters = Filters::new(
        TaskTypeMode::All,
        StoreFilter::Exact("Loja São João".to_string()),
    );
    let view = compute_view(&dataset, &filters, &ViewOptions::default());

    // Exact raw match: "loja sao joao" is a different seller here
    assert_eq!(view.metrics.total_cards, 2);
    assert!(view.store_analysis.is_none());

    let parents = view.parent_tasks.table().unwrap();
    assert_eq!(parents.len(), 1);
    let subtasks = parents.column("Total Subtarefas").unwrap();
    assert_eq!(parents.rows[0][subtasks], Cell::Number(1.0));
}

#[test]
fn test_subtasks_only_on_parents_only_export() {
    let (_dir, dataset) = load(
        "Task ID,Parent ID,Nome da loja (short text),Pontos de Front (number)\n\
         a,,Loja A,1\n\
         b,,Loja B,2\n",
    );
    let filters = Filters::new(TaskTypeMode::SubtasksOnly, StoreFilter::AllSellers);
    let view = compute_view(&dataset, &filters, &ViewOptions::default());

    assert_eq!(view.subtasks, Section::NoData(NO_SUBTASKS.to_string()));
    assert_eq!(view.parent_tasks, Section::NoData(NO_PARENT_TASKS.to_string()));
    assert!(view.charts.task_counts.is_empty());
    assert_eq!(view.metrics.total_points_display(), "0");
}

#[test]
fn test_top_n_with_fewer_stores() {
    let (_dir, dataset) = load(
        "Task ID,Parent ID,Nome da loja (short text)\n\
         1,,Gamma\n2,,Alpha\n3,,Alpha\n4,,Beta\n5,,Alpha\n6,,Beta\n",
    );
    let view = compute_view(&dataset, &Filters::default(), &ViewOptions::default());
    let keys: Vec<&str> = view.charts.task_counts.keys().collect();
    assert_eq!(keys, vec!["alpha", "beta", "gamma"]);
}

#[test]
fn test_missing_columns_are_tolerated() {
    let (_dir, dataset) = load("Task ID,Task Name\nt1,Only a name\n");
    let view = compute_view(&dataset, &Filters::default(), &ViewOptions::default());

    // Without a Parent ID column every card counts as a parent
    assert_eq!(view.metrics.parent_tasks, 1);
    assert_eq!(view.metrics.total_points_display(), "0");
    let parents = view.parent_tasks.table().unwrap();
    assert_eq!(parents.headers, vec!["Task URL", "Task Name", "Total Subtarefas"]);
}

#[test]
fn test_report_and_csv_output() {
    let (dir, dataset) = load(EXPORT);
    let view = compute_view(&dataset, &Filters::default(), &ViewOptions::default());

    let report = render_report(&view).unwrap();
    assert!(report.contains("Top 2 - Quantidade de Tarefas"));
    assert!(report.contains("lojasaojoao"));

    let out = dir.path().join("subtasks.csv");
    write_table_csv(view.subtasks.table().unwrap(), &out).unwrap();
    let content = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[1],
        "https://app.clickup.com/t/p1,Home,Banner,https://app.clickup.com/t/s1,Loja B,3"
    );
    assert!(lines[2].contains("\"Footer, dark\""));
}

#[test]
fn test_store_rows_to_csv() {
    let (dir, dataset) = load(EXPORT);
    let filters = Filters::new(TaskTypeMode::ParentsOnly, StoreFilter::AllSellers);
    let filtered = apply_filters(&dataset, &filters);
    let agg = Aggregator::new(&filtered);
    let rows = store_analysis_table(&agg.counts_by_store(), &agg.points_by_store());

    let out = dir.path().join("stores.csv");
    write_rows_csv(&rows, &out).unwrap();
    let content = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Nome da loja normalizado,Quantidade de tarefas,Total de pontos",
            "lojasaojoao,2,8.0",
        ]
    );
}

#[test]
fn test_export_from_collection() {
    let dir = tempfile::tempdir().unwrap();
    write_export(&dir, "cards.csv", EXPORT);
    let output = dir.path().join("dashboard.xlsx");

    let source = InputSource::Collection {
        dir: dir.path().to_path_buf(),
        name: "cards.csv".to_string(),
    };
    let summary = export_source(
        &source,
        &Filters::new(TaskTypeMode::ParentsOnly, StoreFilter::AllSellers),
        &ViewOptions::default(),
        &output,
    )
    .unwrap();

    assert!(summary.starts_with("Workbook written to"));
    assert!(output.exists());
}

#[test]
fn test_unreadable_input_reports_context() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_dataset(&InputSource::Upload(dir.path().join("missing.csv"))).unwrap_err();
    assert!(err.to_string().contains("Failed to open input CSV"));
}
