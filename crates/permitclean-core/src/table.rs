//! Shared helpers over polars data frames
//!
//! Input columns load as strings. Stages take the frame by value and hand it
//! back, replacing or appending whole columns with [`DataFrame::with_column`].

use polars::prelude::*;
use serde_json::{Map, Number};

use crate::error::{Error, Result};

/// Rendering used for date cells in text and JSON form
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Rendering used for date-time cells in text and JSON form
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Look up a column that configuration requires to exist
pub fn require<'a>(df: &'a DataFrame, name: &str, context: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| Error::column_not_found(name, context))
}

/// Whether the frame has a column with this name
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Render any column as text; dates and date-times use the crate formats.
pub fn render_text(column: &Column) -> Result<StringChunked> {
    let text = match column.dtype() {
        DataType::String => column.str()?.clone(),
        DataType::Date => column.date()?.to_string(DATE_FORMAT)?,
        DataType::Datetime(_, _) => column.datetime()?.to_string(DATETIME_FORMAT)?,
        _ => column.cast(&DataType::String)?.str()?.clone(),
    };
    Ok(text.with_name(column.name().clone()))
}

/// Build a text column by mapping every non-null cell of `source`.
pub fn map_text<F>(name: &str, source: &StringChunked, f: F) -> Column
where
    F: Fn(&str) -> String,
{
    let mut builder = StringChunkedBuilder::new(name.into(), source.len());
    for value in source.into_iter() {
        match value {
            Some(value) => builder.append_value(f(value)),
            None => builder.append_null(),
        }
    }
    builder.finish().into_series().into()
}

/// Serialize to an array of row objects.
///
/// Non-finite floats have no JSON form and become `null`.
pub fn to_records(df: &DataFrame) -> Result<serde_json::Value> {
    let mut rows = vec![Map::new(); df.height()];
    for column in df.get_columns() {
        let cells = json_cells(column)?;
        for (row, cell) in rows.iter_mut().zip(cells) {
            row.insert(column.name().to_string(), cell);
        }
    }
    let records = rows.into_iter().map(serde_json::Value::Object).collect();
    Ok(serde_json::Value::Array(records))
}

fn json_cells(column: &Column) -> Result<Vec<serde_json::Value>> {
    use serde_json::Value as Json;

    let dtype = column.dtype();
    let cells = if dtype.is_integer() {
        let ints = column.cast(&DataType::Int64)?;
        ints.i64()?
            .into_iter()
            .map(|v| v.map_or(Json::Null, Json::from))
            .collect()
    } else if matches!(dtype, DataType::Float32) {
        column
            .f32()?
            .into_iter()
            .map(|v| v.and_then(float32_number).map_or(Json::Null, Json::Number))
            .collect()
    } else if dtype.is_float() {
        let floats = column.cast(&DataType::Float64)?;
        floats
            .f64()?
            .into_iter()
            .map(|v| v.and_then(Number::from_f64).map_or(Json::Null, Json::Number))
            .collect()
    } else if matches!(dtype, DataType::Boolean) {
        column
            .bool()?
            .into_iter()
            .map(|v| v.map_or(Json::Null, Json::Bool))
            .collect()
    } else {
        let text = render_text(column)?;
        text.into_iter()
            .map(|v| v.map_or(Json::Null, |s| Json::String(s.to_string())))
            .collect()
    };
    Ok(cells)
}

// Go through the shortest decimal form so 40.7128f32 stays 40.7128
fn float32_number(f: f32) -> Option<Number> {
    f.to_string().parse::<f64>().ok().and_then(Number::from_f64)
}

/// Cells of a column rendered as owned text
#[cfg(test)]
pub(crate) fn text_cells(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    let text = render_text(df.column(name).unwrap()).unwrap();
    text.into_iter().map(|v| v.map(str::to_string)).collect()
}

/// Owned copy of expected cells
#[cfg(test)]
pub(crate) fn owned(values: &[Option<&str>]) -> Vec<Option<String>> {
    values.iter().map(|v| v.map(str::to_string)).collect()
}

/// Column names in order
#[cfg(test)]
pub(crate) fn names(df: &DataFrame) -> Vec<String> {
    df.get_column_names_owned()
        .iter()
        .map(|n| n.to_string())
        .collect()
}

/// One string column
#[cfg(test)]
pub(crate) fn one_column(name: &str, values: &[Option<&str>]) -> DataFrame {
    DataFrame::new(vec![Column::new(name.into(), values.to_vec())]).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> DataFrame {
        df! {
            "id" => [1i64, 2],
            "name" => [Some("Alice"), None],
        }
        .unwrap()
    }

    #[test]
    fn test_require_reports_context() {
        let df = sample();
        assert!(require(&df, "id", "projection").is_ok());
        let err = require(&df, "missing", "projection").unwrap_err();
        assert!(err.to_string().contains("missing"));
        assert!(err.to_string().contains("projection"));
        assert!(has_column(&df, "name"));
        assert!(!has_column(&df, "missing"));
    }

    #[test]
    fn test_render_text_uses_source_formats() {
        let df = df! {
            "int" => [42i64],
            "float" => [12.5f64],
            "level" => [40.7128f32],
        }
        .unwrap();
        assert_eq!(text_cells(&df, "int"), owned(&[Some("42")]));
        assert_eq!(text_cells(&df, "float"), owned(&[Some("12.5")]));
        assert_eq!(text_cells(&df, "level"), owned(&[Some("40.7128")]));

        let date = NaiveDate::from_ymd_opt(2021, 1, 15).unwrap();
        let dates = DateChunked::from_naive_date_options("d".into(), [Some(date), None]);
        let df = DataFrame::new(vec![dates.into_series().into()]).unwrap();
        assert_eq!(text_cells(&df, "d"), owned(&[Some("2021-01-15"), None]));
    }

    #[test]
    fn test_map_text_keeps_nulls() {
        let df = one_column("code", &[Some("ab"), None]);
        let source = df.column("code").unwrap().str().unwrap();
        let mapped = map_text("upper", source, |s| s.to_uppercase());
        assert_eq!(mapped.name().as_str(), "upper");
        assert_eq!(mapped.null_count(), 1);
        assert_eq!(mapped.str().unwrap().get(0), Some("AB"));
    }

    #[test]
    fn test_to_records_serializes_rows() {
        let records = to_records(&sample()).unwrap();
        assert_eq!(records[0]["id"], 1);
        assert_eq!(records[0]["name"], "Alice");
        assert!(records[1]["name"].is_null());
    }

    #[test]
    fn test_float_records_keep_short_form() {
        let df = df! {
            "lat" => [40.7128f32],
            "nan" => [f64::NAN],
        }
        .unwrap();
        let records = to_records(&df).unwrap();
        assert_eq!(records[0]["lat"], serde_json::json!(40.7128));
        assert!(records[0]["nan"].is_null());
    }
}
