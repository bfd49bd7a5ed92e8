//! Field derivation directives and their interpreter
//!
//! Each row of the directive table creates (or overwrites) one column. Rows are
//! applied strictly in order, so a directive may read a column produced by an
//! earlier one.
//!
//! # Operations
//!
//! - `to_str` - text of the source, truncated to `field_len` characters
//! - `zfill` - source zero-padded on the left to `field_len`
//! - `str_zfill` - truncate, then zero-pad, to `field_len`
//! - `populate` - the literal from `descrp` in every row
//! - `starttime` - the run's wall-clock time in every row
//!
//! Any other operation string is skipped.
//!
//! # Example
//!
//! ```text
//! new_col,condition_col,var_type,field_len,operation,descrp
//! State FIPS,Permit Location Collection ID,str,2,str_zfill,
//! vendor_name,,str,,populate,Construction Leads
//! Run Date,,datetime,,starttime,
//! ```

use polars::prelude::*;
use std::fmt;

use crate::catalog::{ColumnCatalog, ColumnGroup};
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::table::{DATETIME_FORMAT, map_text, render_text, require};

/// Directive table headers used when the catalog has no `create` group
pub const DEFAULT_DIRECTIVE_HEADERS: [&str; 6] = [
    "new_col",
    "condition_col",
    "var_type",
    "field_len",
    "operation",
    "descrp",
];

/// Header names of the six directive-table fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveColumns {
    /// Column to create
    pub new_column: String,
    /// Column to read from
    pub source_column: String,
    /// Declared value type (informational)
    pub value_kind: String,
    /// Target length
    pub field_length: String,
    /// Operation name
    pub operation: String,
    /// Literal for `populate`
    pub literal: String,
}

impl Default for DirectiveColumns {
    fn default() -> Self {
        let [new_column, source_column, value_kind, field_length, operation, literal] =
            DEFAULT_DIRECTIVE_HEADERS.map(String::from);
        Self {
            new_column,
            source_column,
            value_kind,
            field_length,
            operation,
            literal,
        }
    }
}

impl DirectiveColumns {
    /// Take the header names from the catalog's `create` group, in order.
    pub fn from_catalog(catalog: &ColumnCatalog) -> Result<Self> {
        match catalog.get(ColumnGroup::Derive) {
            [] => Ok(Self::default()),
            [new_column, source_column, value_kind, field_length, operation, literal, ..] => {
                Ok(Self {
                    new_column: new_column.clone(),
                    source_column: source_column.clone(),
                    value_kind: value_kind.clone(),
                    field_length: field_length.clone(),
                    operation: operation.clone(),
                    literal: literal.clone(),
                })
            }
            short => Err(Error::ConfigInvalid {
                message: format!(
                    "'{}' group must name 6 directive columns, found {}",
                    ColumnGroup::Derive,
                    short.len()
                ),
            }),
        }
    }
}

/// A derivation operation, resolved once when directives are loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Text cast and truncate
    ToStr,
    /// Zero-pad on the left
    Zfill,
    /// Truncate, then zero-pad
    StrZfill,
    /// Constant fill from the literal field
    Populate,
    /// Run timestamp
    StartTime,
    /// Anything else; the directive is skipped
    Unrecognized(String),
}

impl Operation {
    /// Resolve an operation name from a directive table
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "to_str" => Self::ToStr,
            "zfill" => Self::Zfill,
            "str_zfill" => Self::StrZfill,
            "populate" => Self::Populate,
            "starttime" => Self::StartTime,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    fn needs_length(&self) -> bool {
        matches!(self, Self::ToStr | Self::Zfill | Self::StrZfill)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToStr => f.write_str("to_str"),
            Self::Zfill => f.write_str("zfill"),
            Self::StrZfill => f.write_str("str_zfill"),
            Self::Populate => f.write_str("populate"),
            Self::StartTime => f.write_str("starttime"),
            Self::Unrecognized(name) => f.write_str(name),
        }
    }
}

/// One row of the directive table
#[derive(Debug, Clone, PartialEq)]
pub struct DerivationDirective {
    /// Column to create or overwrite
    pub new_column: String,
    /// Column read by `to_str`, `zfill` and `str_zfill`
    pub source_column: Option<String>,
    /// Declared value type; carried through but not interpreted
    pub value_kind: Option<String>,
    /// Target length for the length-based operations
    pub field_length: Option<usize>,
    /// What to do
    pub operation: Operation,
    /// Literal for `populate`
    pub literal: Option<String>,
}

impl DerivationDirective {
    /// A directive with no source, length or literal
    pub fn new(new_column: impl Into<String>, operation: Operation) -> Self {
        Self {
            new_column: new_column.into(),
            source_column: None,
            value_kind: None,
            field_length: None,
            operation,
            literal: None,
        }
    }

    /// Set the source column
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_column = Some(source.into());
        self
    }

    /// Set the field length
    pub fn with_length(mut self, length: usize) -> Self {
        self.field_length = Some(length);
        self
    }

    /// Set the literal
    pub fn with_literal(mut self, literal: impl Into<String>) -> Self {
        self.literal = Some(literal.into());
        self
    }

    /// Parse every row of a loaded directive table.
    pub fn from_table(df: &DataFrame, columns: &DirectiveColumns) -> Result<Vec<Self>> {
        let field = |name: &str| -> Result<StringChunked> {
            render_text(require(df, name, "directive table")?)
        };
        let new_columns = field(&columns.new_column)?;
        let sources = field(&columns.source_column)?;
        let kinds = field(&columns.value_kind)?;
        let lengths = field(&columns.field_length)?;
        let operations = field(&columns.operation)?;
        let literals = field(&columns.literal)?;

        (0..df.height())
            .map(|row| {
                let new_column = new_columns.get(row).map(str::to_string).ok_or_else(|| {
                    Error::InvalidDirective {
                        index: row,
                        new_column: String::new(),
                        message: format!("'{}' is empty", columns.new_column),
                    }
                })?;
                let field_length = match lengths.get(row) {
                    Some(text) => Some(parse_length(text).ok_or_else(|| {
                        Error::InvalidDirective {
                            index: row,
                            new_column: new_column.clone(),
                            message: format!("field length '{}' is not a whole number", text),
                        }
                    })?),
                    None => None,
                };
                Ok(Self {
                    new_column,
                    source_column: sources.get(row).map(str::to_string),
                    value_kind: kinds.get(row).map(str::to_string),
                    field_length,
                    operation: Operation::parse(operations.get(row).unwrap_or_default()),
                    literal: literals.get(row).map(str::to_string),
                })
            })
            .collect()
    }
}

/// Accepts `"3"` as well as `"3.0"`, which spreadsheet exports produce.
fn parse_length(text: &str) -> Option<usize> {
    let text = text.trim();
    if let Ok(n) = text.parse::<usize>() {
        return Some(n);
    }
    let f = text.parse::<f64>().ok()?;
    (f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64).then_some(f as usize)
}

/// Apply directives in order.
pub fn derive(
    mut df: DataFrame,
    directives: &[DerivationDirective],
    clock: &dyn Clock,
) -> Result<DataFrame> {
    tracing::info!("Applying {} derivation directive(s)", directives.len());
    for (index, directive) in directives.iter().enumerate() {
        apply_one(&mut df, index, directive, clock)?;
    }
    Ok(df)
}

fn apply_one(
    df: &mut DataFrame,
    index: usize,
    directive: &DerivationDirective,
    clock: &dyn Clock,
) -> Result<()> {
    let invalid = |message: String| Error::InvalidDirective {
        index,
        new_column: directive.new_column.clone(),
        message,
    };

    let length = match (directive.operation.needs_length(), directive.field_length) {
        (true, None) => {
            return Err(invalid(format!(
                "'{}' requires a field length",
                directive.operation
            )));
        }
        (_, length) => length.unwrap_or_default(),
    };

    let name = directive.new_column.as_str();
    let column = match &directive.operation {
        Operation::ToStr => {
            let source = render_text(source_column(df, index, directive)?)?;
            map_text(name, &source, |s| truncate(s, length))
        }
        Operation::Zfill | Operation::StrZfill => {
            let source = source_column(df, index, directive)?;
            if source.dtype() != &DataType::String {
                return Err(invalid(format!(
                    "'{}' requires a text column, but '{}' holds {} values",
                    directive.operation,
                    source.name(),
                    source.dtype()
                )));
            }
            let source = source.str()?;
            if directive.operation == Operation::StrZfill {
                map_text(name, source, |s| zero_pad(&truncate(s, length), length))
            } else {
                map_text(name, source, |s| zero_pad(s, length))
            }
        }
        Operation::Populate => match directive.literal.as_deref() {
            Some(literal) => Column::new(name.into(), vec![literal; df.height()]),
            None => Column::full_null(name.into(), df.height(), &DataType::String),
        },
        Operation::StartTime => {
            let stamp = clock.now().format(DATETIME_FORMAT).to_string();
            Column::new(name.into(), vec![stamp; df.height()])
        }
        Operation::Unrecognized(operation) => {
            tracing::debug!(
                "Skipping directive #{} ('{}'): unrecognized operation '{}'",
                index,
                directive.new_column,
                operation
            );
            return Ok(());
        }
    };

    tracing::debug!(
        "Directive #{}: {} -> '{}'",
        index,
        directive.operation,
        directive.new_column
    );
    df.with_column(column)?;
    Ok(())
}

fn source_column<'a>(
    df: &'a DataFrame,
    index: usize,
    directive: &DerivationDirective,
) -> Result<&'a Column> {
    let name = directive
        .source_column
        .as_deref()
        .ok_or_else(|| Error::InvalidDirective {
            index,
            new_column: directive.new_column.clone(),
            message: format!("'{}' requires a source column", directive.operation),
        })?;
    let context = format!("directive #{} ('{}')", index, directive.new_column);
    require(df, name, &context)
}

/// First `length` characters of `s`
pub fn truncate(s: &str, length: usize) -> String {
    s.chars().take(length).collect()
}

/// Left-pad with `'0'` to `width` characters, keeping a leading sign first.
pub fn zero_pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let fill = "0".repeat(width - len);
    match s.chars().next() {
        Some(sign @ ('+' | '-')) => format!("{}{}{}", sign, fill, &s[1..]),
        _ => format!("{}{}", fill, s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::table::{names, one_column, owned, text_cells};
    use chrono::NaiveDate;
    use rstest::rstest;

    fn clock() -> FixedClock {
        FixedClock(
            NaiveDate::from_ymd_opt(2024, 5, 6)
                .unwrap()
                .and_hms_opt(7, 8, 9)
                .unwrap(),
        )
    }

    #[rstest]
    #[case(Operation::ToStr, "abcdef", 3, "abc")]
    #[case(Operation::ToStr, "ab", 3, "ab")]
    #[case(Operation::ToStr, "ñandú", 2, "ña")]
    #[case(Operation::Zfill, "42", 5, "00042")]
    #[case(Operation::Zfill, "123456", 4, "123456")]
    #[case(Operation::Zfill, "-42", 5, "-0042")]
    #[case(Operation::StrZfill, "123456", 4, "1234")]
    #[case(Operation::StrZfill, "12", 4, "0012")]
    #[case(Operation::StrZfill, "6", 2, "06")]
    fn test_length_operations(
        #[case] operation: Operation,
        #[case] input: &str,
        #[case] length: usize,
        #[case] expected: &str,
    ) {
        let df = one_column("src", &[Some(input)]);
        let directive = DerivationDirective::new("out", operation)
            .with_source("src")
            .with_length(length);
        let df = derive(df, &[directive], &clock()).unwrap();
        assert_eq!(text_cells(&df, "out"), owned(&[Some(expected)]));
    }

    #[test]
    fn test_to_str_casts_numbers() {
        let df = df! { "units" => [Some(12345i64), None] }.unwrap();
        let directive = DerivationDirective::new("units_str", Operation::ToStr)
            .with_source("units")
            .with_length(3);
        let df = derive(df, &[directive], &clock()).unwrap();
        assert_eq!(text_cells(&df, "units_str"), owned(&[Some("123"), None]));
    }

    #[test]
    fn test_zfill_rejects_numeric_source() {
        let df = df! { "units" => [7i64] }.unwrap();
        let directive = DerivationDirective::new("padded", Operation::Zfill)
            .with_source("units")
            .with_length(3);
        let err = derive(df, &[directive], &clock()).unwrap_err();
        match err {
            Error::InvalidDirective { index, message, .. } => {
                assert_eq!(index, 0);
                assert!(message.contains("requires a text column"));
                assert!(message.contains("i64"));
            }
            other => panic!("Expected InvalidDirective, got {other:?}"),
        }
    }

    #[test]
    fn test_zfill_keeps_nulls() {
        let df = one_column("code", &[None, Some("7")]);
        let directive = DerivationDirective::new("code", Operation::Zfill)
            .with_source("code")
            .with_length(2);
        let df = derive(df, &[directive], &clock()).unwrap();
        assert_eq!(text_cells(&df, "code"), owned(&[None, Some("07")]));
        assert_eq!(df.width(), 1);
    }

    #[test]
    fn test_populate_fills_every_row() {
        let df = one_column("id", &[Some("a"), Some("b"), Some("c")]);
        let directive =
            DerivationDirective::new("vendor_name", Operation::Populate).with_literal("X");
        let df = derive(df, &[directive], &clock()).unwrap();
        assert_eq!(
            text_cells(&df, "vendor_name"),
            owned(&[Some("X"), Some("X"), Some("X")])
        );
    }

    #[test]
    fn test_populate_without_literal_fills_nulls() {
        let df = one_column("id", &[Some("a")]);
        let directive = DerivationDirective::new("blank", Operation::Populate);
        let df = derive(df, &[directive], &clock()).unwrap();
        assert_eq!(text_cells(&df, "blank"), owned(&[None]));
    }

    #[test]
    fn test_starttime_uses_injected_clock() {
        let df = one_column("id", &[Some("a"), Some("b")]);
        let directive = DerivationDirective::new("Run Date", Operation::StartTime);
        let df = derive(df, &[directive], &clock()).unwrap();
        let stamp = Some("2024-05-06 07:08:09");
        assert_eq!(text_cells(&df, "Run Date"), owned(&[stamp, stamp]));
    }

    #[test]
    fn test_unrecognized_operation_is_skipped() {
        let df = one_column("id", &[Some("a")]);
        let directive = DerivationDirective::new("ignored", Operation::parse("uppercase"));
        let result = derive(df.clone(), &[directive], &clock()).unwrap();
        assert!(result.equals_missing(&df));
    }

    #[test]
    fn test_later_directive_reads_earlier_output() {
        let df = one_column("id", &[Some("123456789")]);
        let directives = vec![
            DerivationDirective::new("prefix", Operation::ToStr)
                .with_source("id")
                .with_length(2),
            DerivationDirective::new("padded", Operation::Zfill)
                .with_source("prefix")
                .with_length(4),
        ];
        let df = derive(df, &directives, &clock()).unwrap();
        assert_eq!(names(&df), ["id", "prefix", "padded"]);
        assert_eq!(text_cells(&df, "padded"), owned(&[Some("0012")]));
    }

    #[test]
    fn test_missing_source_column_is_fatal() {
        let df = one_column("id", &[Some("a")]);
        let directive = DerivationDirective::new("out", Operation::ToStr)
            .with_source("nope")
            .with_length(1);
        let err = derive(df, &[directive], &clock()).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { ref column, .. } if column == "nope"));
    }

    #[test]
    fn test_missing_length_is_fatal() {
        let df = one_column("id", &[Some("a")]);
        let directive = DerivationDirective::new("out", Operation::StrZfill).with_source("id");
        let err = derive(df, &[directive], &clock()).unwrap_err();
        assert!(err.to_string().contains("field length"));
    }

    fn directive_table(rows: &[[Option<&str>; 6]]) -> DataFrame {
        let columns = DEFAULT_DIRECTIVE_HEADERS
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cells: Vec<Option<&str>> = rows.iter().map(|row| row[i]).collect();
                Column::new((*header).into(), cells)
            })
            .collect();
        DataFrame::new(columns).unwrap()
    }

    #[test]
    fn test_from_table_parses_rows() {
        let df = directive_table(&[
            [
                Some("State FIPS"),
                Some("Collection ID"),
                Some("str"),
                Some("2.0"),
                Some("str_zfill"),
                None,
            ],
            [
                Some("vendor_name"),
                None,
                Some("str"),
                None,
                Some("populate"),
                Some("CL"),
            ],
            [Some("other"), None, None, None, None, None],
        ]);
        let directives =
            DerivationDirective::from_table(&df, &DirectiveColumns::default()).unwrap();
        assert_eq!(directives.len(), 3);
        assert_eq!(directives[0].operation, Operation::StrZfill);
        assert_eq!(directives[0].field_length, Some(2));
        assert_eq!(
            directives[0].source_column.as_deref(),
            Some("Collection ID")
        );
        assert_eq!(directives[1].literal.as_deref(), Some("CL"));
        assert_eq!(directives[2].operation, Operation::Unrecognized(String::new()));
    }

    #[test]
    fn test_from_table_rejects_bad_length() {
        let df = directive_table(&[[
            Some("x"),
            Some("y"),
            None,
            Some("two"),
            Some("to_str"),
            None,
        ]]);
        let err = DerivationDirective::from_table(&df, &DirectiveColumns::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidDirective { index: 0, .. }));
    }

    #[test]
    fn test_directive_columns_from_catalog() {
        let names = ["new", "src", "kind", "len", "op", "lit"];
        let catalog = ColumnCatalog::from_pairs(names.map(|n| (ColumnGroup::Derive, n)));
        let columns = DirectiveColumns::from_catalog(&catalog).unwrap();
        assert_eq!(columns.field_length, "len");
        assert_eq!(columns.literal, "lit");

        let short = ColumnCatalog::from_pairs([(ColumnGroup::Derive, "new")]);
        assert!(DirectiveColumns::from_catalog(&short).is_err());
        assert_eq!(
            DirectiveColumns::from_catalog(&ColumnCatalog::default()).unwrap(),
            DirectiveColumns::default()
        );
    }
}
