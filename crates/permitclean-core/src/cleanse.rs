//! String cleansing
//!
//! Each cleanse column is classified by its name once, when the pipeline is
//! built, and then normalized according to its class. Nulls are filled with a
//! single space before normalization.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::table::{render_text, require};

/// Fill value for null cells
const NULL_FILL: &str = " ";

/// How identifier columns are recognized
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CleanseMatching {
    /// Only names containing `Number`; matches the historical exports
    Legacy,
    /// Names containing `Number` or `NUMBER`
    AnyOf,
}

/// Normalization rule for a cleanse column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnClass {
    /// Remove every whitespace character
    Identifier,
    /// Trim and lower-case
    Description,
    /// Lower-case only
    CodedDescription,
    /// No rule applies
    Untouched,
}

impl ColumnClass {
    /// Classify a column name; the first matching rule wins.
    pub fn resolve(name: &str, matching: CleanseMatching) -> Self {
        let identifier = match matching {
            CleanseMatching::Legacy => name.contains("Number"),
            CleanseMatching::AnyOf => name.contains("Number") || name.contains("NUMBER"),
        };
        if identifier {
            Self::Identifier
        } else if name.contains("Description") {
            Self::Description
        } else if name.contains("DESCR") {
            Self::CodedDescription
        } else {
            Self::Untouched
        }
    }

    fn apply(self, text: &str) -> String {
        match self {
            Self::Identifier => text.chars().filter(|c| !c.is_whitespace()).collect(),
            Self::Description => text.trim().to_lowercase(),
            Self::CodedDescription => text.to_lowercase(),
            Self::Untouched => text.to_string(),
        }
    }
}

/// A cleanse column with its resolved class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanseRule {
    /// Column to cleanse
    pub column: String,
    /// Rule resolved from the name
    pub class: ColumnClass,
}

impl CleanseRule {
    /// Resolve the rule for a column
    pub fn new(column: impl Into<String>, matching: CleanseMatching) -> Self {
        let column = column.into();
        let class = ColumnClass::resolve(&column, matching);
        Self { column, class }
    }
}

/// Resolve rules for a list of cleanse columns.
pub fn resolve_rules<S: AsRef<str>>(
    columns: &[S],
    matching: CleanseMatching,
) -> Vec<CleanseRule> {
    columns
        .iter()
        .map(|c| CleanseRule::new(c.as_ref(), matching))
        .collect()
}

/// Cleanse one column in place.
pub fn cleanse(mut df: DataFrame, rule: &CleanseRule) -> Result<DataFrame> {
    let column = require(&df, &rule.column, "cleanse")?;
    if rule.class == ColumnClass::Untouched {
        tracing::debug!("Cleanse: no rule matches '{}', leaving it as is", rule.column);
        return Ok(df);
    }

    let text = render_text(column)?;
    let filled = text.null_count();
    let mut builder = StringChunkedBuilder::new(rule.column.as_str().into(), text.len());
    for value in text.into_iter() {
        builder.append_value(rule.class.apply(value.unwrap_or(NULL_FILL)));
    }
    df.with_column(builder.finish().into_series())?;
    tracing::debug!(
        "Cleansed '{}' as {:?} ({} null(s) filled)",
        rule.column,
        rule.class,
        filled
    );
    Ok(df)
}
