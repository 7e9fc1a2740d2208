//! Card CSV Tool - Dashboard reports over task-card exports
//!
//! Prints the dashboard metrics, rankings and tables for a CSV export, writes
//! any table to CSV, and packages the whole dashboard into an Excel workbook.

use anyhow::Result;
use card_insights::aggregate::Aggregator;
use card_insights::config::DashboardConfig;
use card_insights::dataset::Dataset;
use card_insights::filter::{apply_filters, seller_options, Filters, StoreFilter, TaskTypeMode};
use card_insights::pipeline::{
    export_source, list_collection, load_dataset, render_report, render_section, render_table,
    write_rows_csv, write_table_csv, InputSource,
};
use card_insights::view::{
    compute_view, store_analysis_table, store_display_table, Section, ViewModel, ViewOptions,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "card-csv")]
#[command(about = "Metrics, rankings and tables from task-card CSV exports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Input CSV file
    #[arg(short, long, conflicts_with = "from_collection")]
    input: Option<PathBuf>,

    /// File name from the local collection folder
    #[arg(long)]
    from_collection: Option<String>,

    /// Collection folder (default: from ~/.card-insights.conf, else "data")
    #[arg(long, env = "CARD_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum TaskTypeArg {
    All,
    Parents,
    Subtasks,
}

impl From<TaskTypeArg> for TaskTypeMode {
    fn from(arg: TaskTypeArg) -> Self {
        match arg {
            TaskTypeArg::All => TaskTypeMode::All,
            TaskTypeArg::Parents => TaskTypeMode::ParentsOnly,
            TaskTypeArg::Subtasks => TaskTypeMode::SubtasksOnly,
        }
    }
}

#[derive(Args)]
struct FilterArgs {
    /// Which cards to keep
    #[arg(long, value_enum, default_value = "all")]
    task_type: TaskTypeArg,

    /// Keep only this seller (exact store name as shown by `sellers`)
    #[arg(long)]
    store: Option<String>,

    /// Number of entries in each ranking (default: from config, else 10)
    #[arg(long)]
    top_n: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print metrics, both rankings and the per-store analysis
    Summary {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// List the distinct sellers of an export
    Sellers {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Task count and points per normalized store name
    Stores {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Write the rows to this CSV file instead of printing them
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parent tasks with their number of subtasks
    Parents {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Write the table to this CSV file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum rows to print
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Subtasks with links to their parents
    Subtasks {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Write the table to this CSV file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum rows to print
        #[arg(long)]
        limit: Option<usize>,
    },

    /// All columns of the filtered records
    Data {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Write the table to this CSV file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum rows to print
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Package the whole dashboard into an Excel workbook
    Export {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Output xlsx file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List the CSV files of the local collection
    Collection {
        /// Collection folder (default: from ~/.card-insights.conf, else "data")
        #[arg(long, env = "CARD_DATA_DIR")]
        data_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = DashboardConfig::load();

    match cli.command {
        Commands::Summary { source, filters } => {
            let (dataset, view) = compute(&config, &source, &filters)?;
            println!("Source: {} ({} records)", dataset.source_name(), dataset.len());
            print!("{}", render_report(&view)?);
        }
        Commands::Sellers { source } => {
            let dataset = open(&config, &source)?;
            println!("Todos");
            for seller in seller_options(&dataset) {
                println!("{}", seller);
            }
        }
        Commands::Stores {
            source,
            filters,
            output,
        } => {
            let dataset = open(&config, &source)?;
            let (filters, _) = selection(&config, &filters);
            let filtered = apply_filters(&dataset, &filters);
            let agg = Aggregator::new(&filtered);
            let rows = store_analysis_table(&agg.counts_by_store(), &agg.points_by_store());
            match output {
                Some(path) => {
                    write_rows_csv(&rows, &path)?;
                    println!("Wrote {} rows to {}", rows.len(), path.display());
                }
                None => print!("{}", render_table(&store_display_table(&rows), None)),
            }
        }
        Commands::Parents {
            source,
            filters,
            output,
            limit,
        } => {
            let (_, view) = compute(&config, &source, &filters)?;
            emit_section(&view.parent_tasks, output.as_deref(), limit)?;
        }
        Commands::Subtasks {
            source,
            filters,
            output,
            limit,
        } => {
            let (_, view) = compute(&config, &source, &filters)?;
            emit_section(&view.subtasks, output.as_deref(), limit)?;
        }
        Commands::Data {
            source,
            filters,
            output,
            limit,
        } => {
            let (_, view) = compute(&config, &source, &filters)?;
            let section = Section::Table(view.filtered_data);
            emit_section(&section, output.as_deref(), Some(limit))?;
        }
        Commands::Export {
            source,
            filters,
            output,
        } => {
            let (filters, options) = selection(&config, &filters);
            let summary = export_source(
                &input_source(&config, &source)?,
                &filters,
                &options,
                &output,
            )?;
            println!("{}", summary);
        }
        Commands::Collection { data_dir } => {
            let dir = data_dir.unwrap_or_else(|| config.data_dir.clone());
            let files = list_collection(&dir)?;
            if files.is_empty() {
                println!("No CSV files in {}", dir.display());
            }
            for file in files {
                if let Some(name) = file.file_name().and_then(|n| n.to_str()) {
                    println!("{}", name);
                }
            }
        }
    }

    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn input_source(config: &DashboardConfig, args: &SourceArgs) -> Result<InputSource> {
    match (&args.input, &args.from_collection) {
        (Some(path), _) => Ok(InputSource::Upload(path.clone())),
        (None, Some(name)) => Ok(InputSource::Collection {
            dir: args
                .data_dir
                .clone()
                .unwrap_or_else(|| config.data_dir.clone()),
            name: name.clone(),
        }),
        (None, None) => Err(anyhow::anyhow!(
            "No input given: pass --input FILE or --from-collection NAME"
        )),
    }
}

fn open(config: &DashboardConfig, args: &SourceArgs) -> Result<Dataset> {
    load_dataset(&input_source(config, args)?)
}

fn compute(
    config: &DashboardConfig,
    source: &SourceArgs,
    args: &FilterArgs,
) -> Result<(Dataset, ViewModel)> {
    let dataset = open(config, source)?;
    let (filters, options) = selection(config, args);
    let view = compute_view(&dataset, &filters, &options);
    Ok((dataset, view))
}

/// Filters and view options from the command line, over the config defaults.
fn selection(config: &DashboardConfig, args: &FilterArgs) -> (Filters, ViewOptions) {
    let filters = Filters::new(
        args.task_type.into(),
        match &args.store {
            Some(name) => StoreFilter::Exact(name.clone()),
            None => StoreFilter::AllSellers,
        },
    );
    let mut options = config.view_options();
    if let Some(n) = args.top_n {
        options.top_n = n;
    }
    (filters, options)
}

/// Print a section, or write its table to CSV when an output path is given.
fn emit_section(section: &Section, output: Option<&Path>, limit: Option<usize>) -> Result<()> {
    match (section, output) {
        (Section::Table(table), Some(path)) => {
            write_table_csv(table, path)?;
            println!("Wrote {} rows to {}", table.len(), path.display());
        }
        (Section::Table(table), None) => print!("{}", render_table(table, limit)),
        (Section::NoData(_), _) => print!("{}", render_section(section, limit)),
    }
    Ok(())
}
