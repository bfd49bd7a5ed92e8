//! Configuration parsing and validation
//!
//! This module handles loading the project file and the tables it points to.
//!
//! # Configuration Files
//!
//! - `permitclean.yaml` - Project root configuration
//! - column catalog CSV - column groups for each stage
//! - directive CSV - field derivation directives
//! - reference CSV - code → label table for the merge stage (optional)
//! - JSON Schema document for the vendor

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::catalog::{ColumnCatalog, ColumnGroup};
use crate::cleanse::CleanseMatching;
use crate::derive::{DerivationDirective, DirectiveColumns};
use crate::error::{Error, Result};
use crate::io::{self, Encoding};
use crate::merge::ReferenceTable;
use crate::validate::{SchemaValidator, Severity};

/// Default project file name inside a project directory
pub const PROJECT_FILE: &str = "permitclean.yaml";

/// Source system of the input export
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VendorTag {
    /// Compact `YYYYMMDD` issue dates, sentinel-filled nulls
    #[serde(alias = "cl")]
    VendorA,
    /// `MM/DD/YYYY` dates
    #[serde(alias = "cm")]
    VendorB,
}

impl fmt::Display for VendorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VendorA => f.write_str("vendor_a"),
            Self::VendorB => f.write_str("vendor_b"),
        }
    }
}

impl FromStr for VendorTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vendor_a" | "cl" => Ok(Self::VendorA),
            "vendor_b" | "cm" => Ok(Self::VendorB),
            other => Err(Error::ConfigInvalid {
                message: format!("unknown vendor '{}'", other),
            }),
        }
    }
}

/// Root project configuration from `permitclean.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Vendor whose export is processed
    pub vendor: VendorTag,

    /// Encoding of every CSV input
    #[serde(default)]
    pub encoding: Encoding,

    /// How cleanse columns are classified; deliberately has no default
    pub cleanse_matching: CleanseMatching,

    /// JSON Schema document for the vendor
    pub schema: PathBuf,

    /// Column catalog CSV
    pub catalog: PathBuf,

    /// Derivation directive CSV
    pub directives: PathBuf,

    /// Reference table for the merge stage
    #[serde(default)]
    pub reference: Option<ReferenceConfig>,

    /// Validation behavior
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Default output path
    #[serde(default)]
    pub output: Option<PathBuf>,
}

/// Reference table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Reference CSV path
    pub path: PathBuf,

    /// Label column name; positional column 2 when absent
    #[serde(default)]
    pub label: Option<String>,
}

/// Schema validation settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationConfig {
    /// Whether an invalid table stops the run
    #[serde(default)]
    pub severity: Severity,
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project; relative paths resolve against it
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory or a project file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the project directory or permitclean.yaml file
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./cl-project")?;
    /// println!("Project: {}", config.project.name);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join(PROJECT_FILE), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;

        Ok(Self { project, base_path })
    }

    /// Resolve a configured path against the project directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    fn existing(&self, path: &Path) -> Result<PathBuf> {
        let resolved = self.resolve(path);
        if !resolved.exists() {
            return Err(Error::ConfigNotFound {
                path: resolved.display().to_string(),
            });
        }
        Ok(resolved)
    }

    /// Load the column catalog
    pub fn load_catalog(&self) -> Result<ColumnCatalog> {
        let path = self.existing(&self.project.catalog)?;
        let catalog = ColumnCatalog::load(path, self.project.encoding)?;
        for group in ColumnGroup::ALL {
            tracing::debug!("Catalog group '{}': {} column(s)", group, catalog.get(group).len());
        }
        Ok(catalog)
    }

    /// Load the derivation directives, using the catalog's directive headers
    pub fn load_directives(&self, catalog: &ColumnCatalog) -> Result<Vec<DerivationDirective>> {
        let path = self.existing(&self.project.directives)?;
        let columns = DirectiveColumns::from_catalog(catalog)?;
        let df = io::read_csv(path, self.project.encoding)?;
        DerivationDirective::from_table(&df, &columns)
    }

    /// Load the reference table, if one is configured
    pub fn load_reference(&self, catalog: &ColumnCatalog) -> Result<Option<ReferenceTable>> {
        let Some(reference) = &self.project.reference else {
            return Ok(None);
        };
        let path = self.existing(&reference.path)?;
        let (key, _) = catalog.merge_keys()?;
        let df = io::read_csv(path, self.project.encoding)?;
        ReferenceTable::from_table(&df, key, reference.label.as_deref()).map(Some)
    }

    /// Load and compile the vendor schema
    pub fn load_schema(&self) -> Result<SchemaValidator> {
        let path = self.existing(&self.project.schema)?;
        SchemaValidator::load(&path, self.project.vendor)
    }

    /// Default output path, resolved against the project directory
    pub fn output_path(&self) -> Option<PathBuf> {
        self.project.output.as_deref().map(|p| self.resolve(p))
    }
}
