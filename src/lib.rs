//! Dashbuild - pre-aggregated dashboard data for spending datasets.
//!
//! The core is the [`analysis`] pipeline: filter rows, derive a grouping
//! key, rank and select series, and fold the rest into a chart-ready
//! [`models::AggregateResult`]. The remaining modules load tables, read the
//! dashboard registry and write the JSON artifacts.

pub mod analysis;
pub mod builder;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod registry;
pub mod report;
