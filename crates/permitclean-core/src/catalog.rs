//! Column-group catalog
//!
//! The catalog maps a purpose tag to the ordered list of column names the
//! stages operate on. Vendor catalogs are long-format CSV files:
//!
//! ```text
//! col_group,col_names
//! kept_cols,Permit Number
//! kept_cols,Permit Issue Date
//! non_string,Permit Number of Units
//! convert,Permit Issue Date
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use polars::prelude::DataFrame;

use crate::error::{Error, Result};
use crate::io::{self, Encoding};
use crate::table::{render_text, require};

/// Header of the group column in catalog files
pub const GROUP_HEADER: &str = "col_group";

/// Header of the name column in catalog files
pub const NAME_HEADER: &str = "col_names";

/// Purpose tag for a set of columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnGroup {
    /// Columns re-coerced to numbers (`non_string`)
    Numeric,
    /// Columns kept by projection (`kept_cols`)
    Keep,
    /// Header names of the directive table (`create`)
    Derive,
    /// Reference key name, then table key name (`merge`)
    MergeKey,
    /// Columns passed through the cleanser (`cleanse`)
    Cleanse,
    /// Columns parsed into dates (`convert`)
    Date,
}

impl ColumnGroup {
    /// All groups, in pipeline order
    pub const ALL: [ColumnGroup; 6] = [
        Self::Numeric,
        Self::Keep,
        Self::Derive,
        Self::MergeKey,
        Self::Cleanse,
        Self::Date,
    ];

    /// Name used in vendor catalog files
    pub fn legacy_name(self) -> &'static str {
        match self {
            Self::Numeric => "non_string",
            Self::Keep => "kept_cols",
            Self::Derive => "create",
            Self::MergeKey => "merge",
            Self::Cleanse => "cleanse",
            Self::Date => "convert",
        }
    }
}

impl fmt::Display for ColumnGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.legacy_name())
    }
}

impl FromStr for ColumnGroup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "non_string" | "numeric" => Ok(Self::Numeric),
            "kept_cols" | "keep" => Ok(Self::Keep),
            "create" | "derive" => Ok(Self::Derive),
            "merge" | "merge_key" => Ok(Self::MergeKey),
            "cleanse" => Ok(Self::Cleanse),
            "convert" | "date" => Ok(Self::Date),
            other => Err(Error::ConfigInvalid {
                message: format!("unknown column group '{}'", other),
            }),
        }
    }
}

/// Read-only mapping from column group to column names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnCatalog {
    groups: HashMap<ColumnGroup, Vec<String>>,
}

impl ColumnCatalog {
    /// Build a catalog from `(group, name)` pairs, preserving pair order.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (ColumnGroup, S)>,
        S: Into<String>,
    {
        let mut groups: HashMap<ColumnGroup, Vec<String>> = HashMap::new();
        for (group, name) in pairs {
            groups.entry(group).or_default().push(name.into());
        }
        Self { groups }
    }

    /// Load a long-format catalog CSV file
    pub fn load<P: AsRef<Path>>(path: P, encoding: Encoding) -> Result<Self> {
        let df = io::read_csv(path, encoding)?;
        Self::from_table(&df)
    }

    /// Build a catalog from a loaded `col_group,col_names` table.
    ///
    /// Rows with an unknown group or a missing name are skipped.
    pub fn from_table(df: &DataFrame) -> Result<Self> {
        let groups = render_text(require(df, GROUP_HEADER, "column catalog")?)?;
        let names = render_text(require(df, NAME_HEADER, "column catalog")?)?;

        let mut pairs = Vec::with_capacity(df.height());
        for (row, (group, name)) in groups.into_iter().zip(names.into_iter()).enumerate() {
            let (Some(group), Some(name)) = (group, name) else {
                tracing::warn!("Catalog row {} is incomplete, skipping", row);
                continue;
            };
            match group.parse::<ColumnGroup>() {
                Ok(group) => pairs.push((group, name)),
                Err(_) => {
                    tracing::warn!("Catalog row {}: unknown group '{}', skipping", row, group)
                }
            }
        }
        Ok(Self::from_pairs(pairs))
    }

    /// Column names of a group; empty when the group is not configured
    pub fn get(&self, group: ColumnGroup) -> &[String] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or_default()
    }

    /// The `(reference key, table key)` pair of the merge group
    pub fn merge_keys(&self) -> Result<(&str, &str)> {
        match self.get(ColumnGroup::MergeKey) {
            [reference, table, ..] => Ok((reference.as_str(), table.as_str())),
            other => Err(Error::ConfigInvalid {
                message: format!(
                    "merge group needs a reference key and a table key, found {} name(s)",
                    other.len()
                ),
            }),
        }
    }
}
