//! Reference-table merge
//!
//! Left-joins a small code → label table onto the main frame. Keys on both
//! sides are zero-padded to two characters before matching, every main-frame
//! row is kept in its original order, and the join key is dropped afterwards.

use polars::prelude::*;
use std::collections::HashSet;

use crate::derive::zero_pad;
use crate::error::{Error, Result};
use crate::table::{has_column, map_text, render_text, require};

/// Width both join keys are padded to
pub const KEY_WIDTH: usize = 2;

/// Position of the label column in legacy reference files
const POSITIONAL_LABEL: usize = 2;

/// Positions discarded from legacy reference files
const POSITIONAL_DISCARDED: [usize; 3] = [0, 1, 3];

/// Padded key column shared by both sides of the join
const JOIN_KEY: &str = "__permitclean_join_key";

/// Row position, used to restore input order after the join
const ROW_INDEX: &str = "__permitclean_row";

/// Code → label lookup with unique padded keys
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    label: String,
    frame: DataFrame,
}

impl ReferenceTable {
    /// Build a lookup directly from `(key, label)` pairs.
    pub fn new<I, K, V>(label: impl Into<String>, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let label = label.into();
        let mut seen = HashSet::new();
        let mut keys = StringChunkedBuilder::new(JOIN_KEY.into(), 0);
        let mut labels = StringChunkedBuilder::new(label.as_str().into(), 0);
        for (key, value) in entries {
            let key = zero_pad(key.as_ref(), KEY_WIDTH);
            if !seen.insert(key.clone()) {
                return Err(Error::MergeKeyCollision { key });
            }
            keys.append_value(&key);
            match value {
                Some(value) => labels.append_value(value.as_ref()),
                None => labels.append_null(),
            }
        }
        let frame = DataFrame::new(vec![
            keys.finish().into_series().into(),
            labels.finish().into_series().into(),
        ])?;
        Ok(Self { label, frame })
    }

    /// Build a lookup from a loaded reference table.
    ///
    /// `key` names the code column. The label column is `label` when given;
    /// otherwise the legacy layout applies, where columns 0, 1 and 3 are
    /// discarded and column 2 holds the label.
    pub fn from_table(df: &DataFrame, key: &str, label: Option<&str>) -> Result<Self> {
        const CONTEXT: &str = "reference table";
        let key_position = df
            .get_column_index(key)
            .ok_or_else(|| Error::column_not_found(key, CONTEXT))?;

        let label_column = match label {
            Some(name) => require(df, name, CONTEXT)?,
            None => {
                if df.width() <= POSITIONAL_DISCARDED[2] {
                    return Err(Error::ConfigInvalid {
                        message: format!(
                            "positional reference layout needs at least 4 columns, found {}",
                            df.width()
                        ),
                    });
                }
                if key_position == POSITIONAL_LABEL || POSITIONAL_DISCARDED.contains(&key_position)
                {
                    return Err(Error::ConfigInvalid {
                        message: format!(
                            "reference key '{}' sits at position {}, \
                             which the positional layout discards",
                            key, key_position
                        ),
                    });
                }
                &df.get_columns()[POSITIONAL_LABEL]
            }
        };
        if label_column.name().as_str() == key {
            return Err(Error::ConfigInvalid {
                message: format!("reference label and key are both '{}'", key),
            });
        }

        let keys = render_text(&df.get_columns()[key_position])?;
        let labels = render_text(label_column)?;
        let mut entries = Vec::with_capacity(keys.len());
        for (row, (code, value)) in keys.into_iter().zip(labels.into_iter()).enumerate() {
            match code {
                Some(code) => entries.push((code, value)),
                None => tracing::warn!("Reference row {} has no key, skipping", row),
            }
        }

        let reference = Self::new(label_column.name().as_str(), entries)?;
        tracing::debug!(
            "Loaded {} reference entries for label '{}'",
            reference.len(),
            reference.label
        );
        Ok(reference)
    }

    /// Name of the label column added by the merge
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Padded keys and their labels
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    /// Whether the lookup has no keys
    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }
}

/// Left-join `reference` on `table_key`, then drop `table_key`.
pub fn merge_reference(
    mut df: DataFrame,
    reference: &ReferenceTable,
    table_key: &str,
) -> Result<DataFrame> {
    if has_column(&df, reference.label()) {
        return Err(Error::ConfigInvalid {
            message: format!(
                "merge would overwrite existing column '{}'",
                reference.label()
            ),
        });
    }

    let keys = render_text(require(&df, table_key, "reference merge")?)?;
    df.with_column(map_text(JOIN_KEY, &keys, |k| zero_pad(k, KEY_WIDTH)))?;

    let args = JoinArgs::new(JoinType::Left).with_coalesce(JoinCoalesce::CoalesceColumns);
    let mut merged = df
        .with_row_index(ROW_INDEX.into(), None)?
        .lazy()
        .join(
            reference.frame().clone().lazy(),
            [col(JOIN_KEY)],
            [col(JOIN_KEY)],
            args,
        )
        .sort([ROW_INDEX], SortMultipleOptions::default())
        .collect()?;
    for name in [ROW_INDEX, JOIN_KEY, table_key] {
        merged.drop_in_place(name)?;
    }

    let unmatched = merged.column(reference.label())?.null_count();
    tracing::info!(
        "Merged '{}' on '{}': {} of {} row(s) unmatched",
        reference.label(),
        table_key,
        unmatched,
        merged.height()
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{names, owned, text_cells};

    fn states() -> DataFrame {
        df! {
            "State Name" => ["California", "Texas", "Alabama"],
            "Region" => ["West", "South", "South"],
            "State Abbvr" => ["CA", "TX", "AL"],
            "Division" => ["9", "7", "6"],
            "State Cd" => ["6", "48", "01"],
        }
        .unwrap()
    }

    fn permits() -> DataFrame {
        df! {
            "Permit Number" => ["P1", "P2", "P3", "P4"],
            "State FIPS" => [Some("06"), Some("1"), Some("99"), None],
        }
        .unwrap()
    }

    #[test]
    fn test_positional_layout_takes_column_two() {
        let reference = ReferenceTable::from_table(&states(), "State Cd", None).unwrap();
        assert_eq!(reference.label(), "State Abbvr");
        assert_eq!(reference.len(), 3);
        let frame = reference.frame();
        assert_eq!(text_cells(frame, JOIN_KEY), owned(&[Some("06"), Some("48"), Some("01")]));
        assert_eq!(
            text_cells(frame, "State Abbvr"),
            owned(&[Some("CA"), Some("TX"), Some("AL")])
        );
    }

    #[test]
    fn test_named_label() {
        let reference =
            ReferenceTable::from_table(&states(), "State Cd", Some("State Name")).unwrap();
        assert_eq!(reference.label(), "State Name");
        let merged = merge_reference(permits(), &reference, "State FIPS").unwrap();
        assert_eq!(text_cells(&merged, "State Name")[0].as_deref(), Some("California"));
    }

    #[test]
    fn test_missing_key_column() {
        let err = ReferenceTable::from_table(&states(), "FIPS", None).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { .. }));
    }

    #[test]
    fn test_positional_layout_rejects_discarded_key() {
        let err = ReferenceTable::from_table(&states(), "Region", None).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn test_positional_layout_needs_four_columns() {
        let df = df! {
            "a" => ["1"],
            "b" => ["2"],
            "c" => ["3"],
        }
        .unwrap();
        let err = ReferenceTable::from_table(&df, "a", None).unwrap_err();
        assert!(err.to_string().contains("at least 4"));
    }

    #[test]
    fn test_duplicate_keys_collide_after_padding() {
        let err = ReferenceTable::new("label", [("6", Some("a")), ("06", Some("b"))]).unwrap_err();
        assert!(matches!(err, Error::MergeKeyCollision { ref key } if key == "06"));
    }

    #[test]
    fn test_merge_keeps_every_row_and_drops_key() {
        let reference = ReferenceTable::from_table(&states(), "State Cd", None).unwrap();
        let merged = merge_reference(permits(), &reference, "State FIPS").unwrap();

        assert_eq!(merged.height(), 4);
        assert_eq!(names(&merged), ["Permit Number", "State Abbvr"]);
        assert_eq!(
            text_cells(&merged, "Permit Number"),
            owned(&[Some("P1"), Some("P2"), Some("P3"), Some("P4")])
        );
        assert_eq!(
            text_cells(&merged, "State Abbvr"),
            owned(&[Some("CA"), Some("AL"), None, None])
        );
    }

    #[test]
    fn test_merge_requires_table_key() {
        let reference = ReferenceTable::from_table(&states(), "State Cd", None).unwrap();
        let err = merge_reference(permits(), &reference, "FIPS").unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { .. }));
    }

    #[test]
    fn test_merge_refuses_to_overwrite() {
        let reference = ReferenceTable::new("Permit Number", [("01", Some("x"))]).unwrap();
        let err = merge_reference(permits(), &reference, "State FIPS").unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }
}
