//! Schema validation
//!
//! The frame is serialized to an array of row objects and checked against the
//! vendor's JSON Schema. By default a failing frame is only reported; with
//! [`Severity::Fail`] it stops the run.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::config::VendorTag;
use crate::error::{Error, Result};
use crate::table::to_records;

/// What an invalid table does to the run
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Log the failure and continue
    #[default]
    Warn,
    /// Abort with [`Error::SchemaMismatch`]
    Fail,
}

/// Outcome of one validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Vendor whose schema was used
    pub vendor: VendorTag,
    /// Whether the table conforms
    pub valid: bool,
    /// One description per schema violation
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Turn an invalid report into an error under [`Severity::Fail`].
    pub fn enforce(&self, severity: Severity) -> Result<()> {
        if self.valid || severity == Severity::Warn {
            return Ok(());
        }
        Err(Error::SchemaMismatch {
            vendor: self.vendor.to_string(),
            count: self.errors.len(),
            first: self.errors.first().cloned().unwrap_or_default(),
        })
    }
}

/// A compiled vendor schema
pub struct SchemaValidator {
    vendor: VendorTag,
    validator: jsonschema::Validator,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("vendor", &self.vendor)
            .finish_non_exhaustive()
    }
}

impl SchemaValidator {
    /// Read and compile a schema document.
    pub fn load(path: &Path, vendor: VendorTag) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let schema: serde_json::Value =
            serde_json::from_str(&contents).map_err(|e| Error::SchemaInvalid {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Self::from_value(&schema, vendor, &path.display().to_string())
    }

    /// Compile an in-memory schema; `origin` names it in errors.
    pub fn from_value(schema: &serde_json::Value, vendor: VendorTag, origin: &str) -> Result<Self> {
        let validator = jsonschema::validator_for(schema).map_err(|e| Error::SchemaInvalid {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!("Compiled {} schema from {}", vendor, origin);
        Ok(Self { vendor, validator })
    }

    /// Vendor the schema belongs to
    pub fn vendor(&self) -> VendorTag {
        self.vendor
    }

    /// Validate the frame's row records.
    pub fn validate(&self, df: &DataFrame) -> Result<ValidationReport> {
        let records = to_records(df)?;
        let errors: Vec<String> = self
            .validator
            .iter_errors(&records)
            .map(|e| e.to_string())
            .collect();
        let valid = errors.is_empty();

        if valid {
            tracing::info!(
                "Frame ({} rows) passed the {} schema",
                df.height(),
                self.vendor
            );
        } else {
            tracing::warn!(
                "Frame ({} rows) failed the {} schema with {} error(s)",
                df.height(),
                self.vendor,
                errors.len()
            );
            for error in &errors {
                tracing::warn!("  {}", error);
            }
        }

        Ok(ValidationReport {
            vendor: self.vendor,
            valid,
            errors,
        })
    }
}
