//! Card Insights - Graphical User Interface
//!
//! Sidebar for choosing the export and the filters; the main area shows the
//! dashboard sections for the current selection.

use card_insights::aggregate::Ranking;
use card_insights::config::DashboardConfig;
use card_insights::dataset::Dataset;
use card_insights::filter::{seller_options, Filters, StoreFilter, TaskTypeMode};
use card_insights::pipeline::{self, InputSource};
use card_insights::view::{compute_view, format_number, Cell, Section, Table, ViewModel};
use iced::widget::{
    button, column, container, pick_list, progress_bar, row, rule, scrollable, text,
};
use iced::{Center, Element, Fill, Task, Theme};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> iced::Result {
    env_logger::init();
    iced::application(App::new, App::update, App::view)
        .theme(App::theme)
        .centered()
        .run()
}

// ============================================================================
// App State
// ============================================================================

/// Entry of the seller selector. "Todos" stands for no store filter.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SellerChoice {
    All,
    Store(String),
}

impl fmt::Display for SellerChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SellerChoice::All => f.write_str("Todos"),
            SellerChoice::Store(name) => f.write_str(name),
        }
    }
}

impl From<&SellerChoice> for StoreFilter {
    fn from(choice: &SellerChoice) -> Self {
        match choice {
            SellerChoice::All => StoreFilter::AllSellers,
            SellerChoice::Store(name) => StoreFilter::Exact(name.clone()),
        }
    }
}

struct App {
    config: DashboardConfig,

    // Input
    collection: Vec<String>,
    selected_collection: Option<String>,
    dataset: Option<Arc<Dataset>>,
    loading: bool,

    // Filters
    task_type: TaskTypeMode,
    seller: SellerChoice,
    seller_choices: Vec<SellerChoice>,

    view_model: Option<ViewModel>,

    // Export
    is_exporting: bool,
    status_text: String,
}

#[derive(Debug, Clone)]
enum Message {
    // Input
    BrowseUpload,
    UploadSelected(Option<PathBuf>),
    BrowseCollectionFolder,
    CollectionFolderSelected(Option<PathBuf>),
    CollectionSelected(String),
    DatasetLoaded(Result<Arc<Dataset>, String>),

    // Filters
    TaskTypeSelected(TaskTypeMode),
    SellerSelected(SellerChoice),

    // Export
    BrowseExport,
    ExportSelected(Option<PathBuf>),
    ExportCompleted(Result<String, String>),
}

impl App {
    fn theme(&self) -> Theme {
        Theme::Dark
    }

    fn new() -> (Self, Task<Message>) {
        let config = DashboardConfig::load();
        let collection = scan_collection(&config.data_dir);

        (
            App {
                config,
                collection,
                selected_collection: None,
                dataset: None,
                loading: false,
                task_type: TaskTypeMode::All,
                seller: SellerChoice::All,
                seller_choices: vec![SellerChoice::All],
                view_model: None,
                is_exporting: false,
                status_text: String::new(),
            },
            Task::none(),
        )
    }

    fn load(&mut self, source: InputSource) -> Task<Message> {
        self.loading = true;
        self.status_text = format!("Loading {}...", source.path().display());
        Task::perform(
            async move {
                pipeline::load_dataset(&source)
                    .map(Arc::new)
                    .map_err(|e| format!("{:#}", e))
            },
            Message::DatasetLoaded,
        )
    }

    /// Recompute the dashboard for the current dataset and filters.
    fn refresh(&mut self) {
        self.view_model = self.dataset.as_ref().map(|dataset| {
            let filters = Filters::new(self.task_type, StoreFilter::from(&self.seller));
            compute_view(dataset, &filters, &self.config.view_options())
        });
    }
}

// ============================================================================
// Update
// ============================================================================

impl App {
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            // -- Input --
            Message::BrowseUpload => Task::perform(
                async {
                    let file = rfd::AsyncFileDialog::new()
                        .set_title("Adicione o CSV")
                        .add_filter("CSV files", &["csv"])
                        .pick_file()
                        .await;
                    file.map(|f| f.path().to_path_buf())
                },
                Message::UploadSelected,
            ),
            Message::UploadSelected(path) => match path {
                Some(p) => {
                    self.selected_collection = None;
                    self.load(InputSource::Upload(p))
                }
                None => Task::none(),
            },
            Message::BrowseCollectionFolder => Task::perform(
                async {
                    let folder = rfd::AsyncFileDialog::new()
                        .set_title("Select collection folder")
                        .pick_folder()
                        .await;
                    folder.map(|f| f.path().to_path_buf())
                },
                Message::CollectionFolderSelected,
            ),
            Message::CollectionFolderSelected(folder) => {
                if let Some(dir) = folder {
                    self.collection = scan_collection(&dir);
                    self.selected_collection = None;
                    self.config.data_dir = dir;
                    if let Err(e) = self.config.save() {
                        self.status_text = format!("Error: {:#}", e);
                    }
                }
                Task::none()
            }
            Message::CollectionSelected(name) => {
                self.selected_collection = Some(name.clone());
                let source = InputSource::Collection {
                    dir: self.config.data_dir.clone(),
                    name,
                };
                self.load(source)
            }
            Message::DatasetLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(dataset) => {
                        self.status_text = format!(
                            "{}: {} records",
                            dataset.source_name(),
                            dataset.len()
                        );
                        self.seller_choices = std::iter::once(SellerChoice::All)
                            .chain(seller_options(&dataset).into_iter().map(SellerChoice::Store))
                            .collect();
                        if !self.seller_choices.contains(&self.seller) {
                            self.seller = SellerChoice::All;
                        }
                        self.dataset = Some(dataset);
                        self.refresh();
                    }
                    Err(e) => self.status_text = format!("Error: {}", e),
                }
                Task::none()
            }

            // -- Filters --
            Message::TaskTypeSelected(mode) => {
                self.task_type = mode;
                self.refresh();
                Task::none()
            }
            Message::SellerSelected(choice) => {
                self.seller = choice;
                self.refresh();
                Task::none()
            }

            // -- Export --
            Message::BrowseExport => Task::perform(
                async {
                    let file = rfd::AsyncFileDialog::new()
                        .add_filter("Excel files", &["xlsx"])
                        .set_file_name("dashboard.xlsx")
                        .save_file()
                        .await;
                    file.map(|f| f.path().to_path_buf())
                },
                Message::ExportSelected,
            ),
            Message::ExportSelected(path) => {
                let (Some(output), Some(view), Some(dataset)) =
                    (path, self.view_model.clone(), self.dataset.as_ref())
                else {
                    return Task::none();
                };
                let config = pipeline::ExportConfig {
                    source_name: dataset.source_name().to_string(),
                    output,
                };
                self.is_exporting = true;
                self.status_text = "Creating workbook...".to_string();
                Task::perform(
                    async move { pipeline::export_workbook(&view, &config).map_err(|e| e.to_string()) },
                    Message::ExportCompleted,
                )
            }
            Message::ExportCompleted(result) => {
                self.is_exporting = false;
                self.status_text = match result {
                    Ok(s) => s,
                    Err(e) => format!("Error: {}", e),
                };
                Task::none()
            }
        }
    }
}

// ============================================================================
// View
// ============================================================================

impl App {
    fn view(&self) -> Element<'_, Message> {
        let main: Element<'_, Message> = match &self.view_model {
            Some(view) => self.view_dashboard(view),
            None => container(
                text("Adicione um CSV ou escolha um arquivo da coleção para começar.")
                    .size(16)
                    .color(iced::Color::from_rgb(0.6, 0.6, 0.6)),
            )
            .padding(20)
            .into(),
        };

        row![
            container(self.view_sidebar()).padding(16).width(280).height(Fill),
            rule::vertical(1),
            scrollable(container(main).padding(20).width(Fill)).height(Fill),
        ]
        .into()
    }

    fn view_sidebar(&self) -> Element<'_, Message> {
        let busy = self.loading || self.is_exporting;

        let mut items: Vec<Element<'_, Message>> = Vec::new();
        items.push(text("Analise de dados").size(22).into());

        // Upload
        items.push(text("Adicione o CSV").size(14).into());
        items.push(
            button(text("Browse").size(13))
                .on_press_maybe(if busy { None } else { Some(Message::BrowseUpload) })
                .into(),
        );

        // Local collection
        items.push(rule::horizontal(1).into());
        items.push(
            row![
                text("Coleção").size(14).width(Fill),
                button(text("Pasta").size(12))
                    .on_press_maybe(if busy {
                        None
                    } else {
                        Some(Message::BrowseCollectionFolder)
                    })
                    .style(button::secondary),
            ]
            .align_y(Center)
            .into(),
        );
        if self.collection.is_empty() {
            items.push(
                text(format!("-- nenhum CSV em {} --", self.config.data_dir.display()))
                    .size(12)
                    .color(iced::Color::from_rgb(0.6, 0.6, 0.6))
                    .into(),
            );
        } else {
            let entries: Vec<Element<'_, Message>> = self
                .collection
                .iter()
                .map(|name| {
                    let active = self.selected_collection.as_deref() == Some(name.as_str());
                    toggle_button(
                        name,
                        active,
                        (!busy).then(|| Message::CollectionSelected(name.clone())),
                    )
                })
                .collect();
            items.push(scrollable(column(entries).spacing(4)).height(160).into());
        }

        // Filters
        if self.dataset.is_some() {
            items.push(rule::horizontal(1).into());
            items.push(text("Filtros").size(16).into());
            items.push(text("Tipo de Card").size(13).into());
            let modes: Vec<Element<'_, Message>> = TaskTypeMode::ALL
                .iter()
                .map(|mode| {
                    toggle_button(
                        mode.label(),
                        *mode == self.task_type,
                        Some(Message::TaskTypeSelected(*mode)),
                    )
                })
                .collect();
            items.push(column(modes).spacing(4).into());

            items.push(text("Seller").size(13).into());
            items.push(
                pick_list(
                    self.seller_choices.as_slice(),
                    Some(&self.seller),
                    Message::SellerSelected,
                )
                .width(Fill)
                .into(),
            );

            items.push(rule::horizontal(1).into());
            items.push(
                button(text("Export Workbook").size(13))
                    .on_press_maybe(if busy { None } else { Some(Message::BrowseExport) })
                    .into(),
            );
        }

        if !self.status_text.is_empty() {
            let color = if self.status_text.starts_with("Error") {
                iced::Color::from_rgb(0.9, 0.4, 0.4)
            } else {
                iced::Color::from_rgb(0.6, 0.6, 0.6)
            };
            items.push(text(&self.status_text).size(12).color(color).into());
        }

        column(items).spacing(10).into()
    }

    fn view_dashboard<'a>(&'a self, view: &'a ViewModel) -> Element<'a, Message> {
        let mut items: Vec<Element<'a, Message>> = Vec::new();

        // Metrics
        let metrics = &view.metrics;
        items.push(
            row![
                metric("Total de Cards", metrics.total_cards.to_string()),
                metric("Total de Pontos", metrics.total_points_display()),
                metric("Tarefas Pai", metrics.parent_tasks.to_string()),
                metric("Subtarefas", metrics.subtasks.to_string()),
            ]
            .spacing(20)
            .into(),
        );

        // Charts
        items.push(rule::horizontal(1).into());
        items.push(
            row![
                column![
                    heading(format!(
                        "Top {} - Quantidade de Tarefas",
                        view.charts.task_counts.len()
                    )),
                    bar_chart(&view.charts.task_counts, |v| *v as f64),
                ]
                .spacing(8)
                .width(Fill),
                column![
                    heading(format!("Top {} - Pontos por Loja", view.charts.points.len())),
                    bar_chart(&view.charts.points, |v| *v),
                ]
                .spacing(8)
                .width(Fill),
            ]
            .spacing(30)
            .into(),
        );

        if let Some(stores) = &view.store_analysis {
            items.push(rule::horizontal(1).into());
            items.push(heading("Análise por Loja (Nomes Normalizados)".to_string()));
            items.push(table_view(stores));
        }

        items.push(rule::horizontal(1).into());
        items.push(heading("Todas as Tarefas Pai".to_string()));
        items.push(section_view(&view.parent_tasks));

        items.push(rule::horizontal(1).into());
        items.push(heading("Cards Pai com suas Subtarefas".to_string()));
        items.push(section_view(&view.subtasks));

        items.push(rule::horizontal(1).into());
        items.push(heading("Dados Filtrados".to_string()));
        items.push(table_view(&view.filtered_data));

        column(items).spacing(14).into()
    }
}

/// File names of the CSVs in a collection folder; empty if it cannot be read.
fn scan_collection(dir: &Path) -> Vec<String> {
    match pipeline::list_collection(dir) {
        Ok(files) => files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .map(str::to_string)
            .collect(),
        Err(e) => {
            log::warn!("{:#}", e);
            Vec::new()
        }
    }
}

// ============================================================================
// Helper widgets
// ============================================================================

const TABLE_COL_WIDTH: f32 = 170.0;
const TABLE_HEIGHT: f32 = 320.0;

/// A selectable entry, highlighted when active.
fn toggle_button<'a>(label: &'a str, active: bool, on_press: Option<Message>) -> Element<'a, Message> {
    let btn = button(text(label).size(13)).width(Fill);
    if active {
        btn.style(button::primary).into()
    } else {
        btn.on_press_maybe(on_press).style(button::secondary).into()
    }
}

fn heading<'a>(title: String) -> Element<'a, Message> {
    text(title).size(18).into()
}

fn metric<'a>(label: &'a str, value: String) -> Element<'a, Message> {
    column![
        text(label).size(13).color(iced::Color::from_rgb(0.6, 0.6, 0.6)),
        text(value).size(26),
    ]
    .spacing(2)
    .width(Fill)
    .into()
}

/// Horizontal bars scaled to the largest value of the ranking.
fn bar_chart<'a, V>(ranking: &'a Ranking<V>, value: impl Fn(&V) -> f64) -> Element<'a, Message> {
    if ranking.is_empty() {
        return text("Sem dados").size(13).into();
    }

    let max = ranking
        .entries()
        .iter()
        .map(|(_, v)| value(v))
        .fold(0.0_f64, f64::max)
        .max(1.0) as f32;

    let bars: Vec<Element<'a, Message>> = ranking
        .entries()
        .iter()
        .map(|(label, v)| {
            let n = value(v);
            row![
                text(label.as_str()).size(12).width(140),
                progress_bar(0.0..=max, n as f32),
                text(format_number(n)).size(12).width(60),
            ]
            .spacing(8)
            .align_y(Center)
            .into()
        })
        .collect();

    column(bars).spacing(4).into()
}

fn section_view(section: &Section) -> Element<'_, Message> {
    match section {
        Section::Table(table) => table_view(table),
        Section::NoData(message) => text(message.as_str())
            .size(13)
            .color(iced::Color::from_rgb(0.4, 0.7, 0.9))
            .into(),
    }
}

fn table_view(table: &Table) -> Element<'_, Message> {
    let header = row(table
        .headers
        .iter()
        .map(|h| text(h.as_str()).size(12).width(TABLE_COL_WIDTH).into()))
    .spacing(8);

    let rows: Vec<Element<'_, Message>> = table
        .rows
        .iter()
        .map(|cells| {
            row(cells.iter().map(|cell| {
                let label = text(cell.to_string()).size(12).width(TABLE_COL_WIDTH);
                match cell {
                    Cell::Link(_) => label.color(iced::Color::from_rgb(0.4, 0.6, 1.0)).into(),
                    _ => label.into(),
                }
            }))
            .spacing(8)
            .into()
        })
        .collect();

    column![
        header,
        rule::horizontal(1),
        scrollable(column(rows).spacing(2)).height(TABLE_HEIGHT),
        text(format!("{} linhas", table.len()))
            .size(11)
            .color(iced::Color::from_rgb(0.6, 0.6, 0.6)),
    ]
    .spacing(4)
    .into()
}
