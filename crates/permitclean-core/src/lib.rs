//! permitclean Core Library
//!
//! This crate provides the normalization pipeline for vendor permit exports:
//! - Project configuration, column catalogs and directive tables
//! - CSV load/store of polars data frames, with explicit text decoding
//! - The stages: schema validation, projection, field derivation,
//!   reference merge, string cleansing and date normalization
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌────────┐   ┌───────┐   ┌─────────┐   ┌───────┐
//! │ Validate │──▶│ Project │──▶│ Derive │──▶│ Merge │──▶│ Cleanse │──▶│ Dates │
//! └──────────┘   └─────────┘   └────────┘   └───────┘   └─────────┘   └───────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use permitclean_core::{Config, Pipeline};
//!
//! let config = Config::load("./cl-project")?;
//! let pipeline = Pipeline::from_config(&config)?;
//! let df = permitclean_core::io::read_csv("cl_all.csv", config.project.encoding)?;
//! let output = pipeline.run(df)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod cleanse;
pub mod clock;
pub mod config;
pub mod dates;
pub mod derive;
pub mod error;
pub mod io;
pub mod merge;
pub mod pipeline;
pub mod project;
pub mod table;
pub mod validate;

pub use catalog::{ColumnCatalog, ColumnGroup};
pub use config::{Config, ProjectConfig, VendorTag};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineOutput};
