//! Card Insights
//!
//! Metrics, rankings and tables over task-card CSV exports, grouped by seller.
//!
//! This library provides:
//! - `normalize`: Canonical comparison keys for store names
//! - `coerce`: Lenient numeric coercion of raw cells
//! - `dataset`: Typed records loaded from the export CSV
//! - `filter`: Task-type and seller filters
//! - `aggregate`: Counts, sums and rankings over a filtered view
//! - `view`: `compute_view`, the single entry point producing a `ViewModel`
//! - `pipeline`: Input sources, text reports, CSV and Excel export
//! - `config`: Persisted front-end settings
//!
//! Binaries:
//! - `card-csv`: Command-line reports and exports
//! - `card-ui`: Desktop dashboard

pub mod aggregate;
pub mod coerce;
pub mod config;
pub mod dataset;
pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod view;

pub use dataset::{Dataset, Record};
pub use filter::{Filters, StoreFilter, TaskTypeMode};
pub use view::{compute_view, ViewModel, ViewOptions};
