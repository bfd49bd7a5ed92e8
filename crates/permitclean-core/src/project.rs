//! Column projection and numeric typing
//!
//! Restricts a frame to the configured columns, renders every kept column as
//! text, then casts the numeric columns. Casts are non-strict, so a cell that
//! does not parse as a number becomes null.

use polars::prelude::*;

use crate::error::Result;
use crate::table::{has_column, render_text, require};

/// Columns whose name contains this marker are stored as `f32`
const REDUCED_PRECISION_MARKER: &str = "Level";

/// Project to `keep`, then type `numeric` columns.
pub fn project<S: AsRef<str>>(df: DataFrame, numeric: &[S], keep: &[S]) -> Result<DataFrame> {
    for name in keep {
        if !has_column(&df, name.as_ref()) {
            tracing::warn!("Kept column '{}' is not in the input", name.as_ref());
        }
    }

    let kept: Vec<PlSmallStr> = df
        .get_column_names_owned()
        .into_iter()
        .filter(|name| keep.iter().any(|k| k.as_ref() == name.as_str()))
        .collect();
    let mut projected = df.select(kept)?;
    tracing::info!(
        "Projected {} of {} column(s), {} row(s)",
        projected.width(),
        df.width(),
        projected.height()
    );

    for name in projected.get_column_names_owned() {
        let text = render_text(projected.column(&name)?)?;
        projected.with_column(text.into_series())?;
    }

    for name in numeric {
        let name = name.as_ref();
        let typed = type_numeric(require(&projected, name, "numeric typing")?)?;
        projected.with_column(typed)?;
    }

    Ok(projected)
}

/// Cast one text column to numbers.
///
/// Whole numbers give `Int64`, anything fractional `Float64`, and `Level`
/// columns `Float32`.
fn type_numeric(column: &Column) -> Result<Series> {
    let name = column.name().clone();
    let text = render_text(column)?;
    let trimmed: StringChunked = text.into_iter().map(|v| v.map(str::trim)).collect();
    let trimmed = trimmed.with_name(name.clone()).into_series();

    let floats = trimmed.cast(&DataType::Float64)?;
    let lost = floats.null_count() - text.null_count();
    if lost > 0 {
        tracing::warn!(
            "Column '{}': {} value(s) could not be parsed as numbers and were set to null",
            name,
            lost
        );
    }

    if name.contains(REDUCED_PRECISION_MARKER) {
        return Ok(floats.cast(&DataType::Float32)?);
    }
    let ints = trimmed.cast(&DataType::Int64)?;
    if ints.null_count() == floats.null_count() {
        return Ok(ints);
    }
    let integral = floats
        .f64()?
        .into_iter()
        .flatten()
        .all(|f| f.fract() == 0.0 && f.abs() < 9.2e18);
    if integral {
        Ok(floats.cast(&DataType::Int64)?)
    } else {
        Ok(floats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::table::{names, owned, text_cells};

    fn sample() -> DataFrame {
        df! {
            "Permit Number" => [Some("A-1"), None, Some("C-3")],
            "Permit Number of Units" => ["12", "n/a units", " 3 "],
            "Parcel Level Latitude" => [Some("40.7128"), None, Some("-73.5")],
            "Drop Me" => ["x", "y", "z"],
        }
        .unwrap()
    }

    const NO_NUMERIC: [&str; 0] = [];
    const NUMERIC: [&str; 2] = ["Permit Number of Units", "Parcel Level Latitude"];
    const KEEP: [&str; 3] = [
        "Permit Number",
        "Permit Number of Units",
        "Parcel Level Latitude",
    ];

    fn ints(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
        let column = df.column(name).unwrap();
        column.i64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_keeps_exactly_the_configured_columns_in_order() {
        let keep = ["Parcel Level Latitude", "Permit Number"];
        let df = project(sample(), &NO_NUMERIC, &keep).unwrap();
        assert_eq!(names(&df), ["Permit Number", "Parcel Level Latitude"]);
        assert_eq!(df.height(), 3);
    }

    #[test]
    fn test_unknown_keep_columns_are_ignored() {
        let df = project(sample(), &NO_NUMERIC, &["Permit Number", "Not There"]).unwrap();
        assert_eq!(names(&df), ["Permit Number"]);
    }

    #[test]
    fn test_integer_coercion_nulls_failures() {
        let df = project(sample(), &NUMERIC, &KEEP).unwrap();
        assert_eq!(ints(&df, "Permit Number of Units"), [Some(12), None, Some(3)]);
    }

    #[test]
    fn test_level_columns_are_reduced_precision() {
        let df = project(sample(), &NUMERIC, &KEEP).unwrap();
        let lat = df.column("Parcel Level Latitude").unwrap();
        assert_eq!(lat.dtype(), &DataType::Float32);
        let values: Vec<Option<f32>> = lat.f32().unwrap().into_iter().collect();
        assert_eq!(values, [Some(40.7128), None, Some(-73.5)]);
    }

    #[test]
    fn test_non_numeric_columns_become_text() {
        let df = df! {
            "Permit Number" => ["A-1", "B-2"],
            "Units" => [1i64, 2],
        }
        .unwrap();
        let df = project(df, &NO_NUMERIC, &["Permit Number", "Units"]).unwrap();
        assert_eq!(df.column("Units").unwrap().dtype(), &DataType::String);
        assert_eq!(text_cells(&df, "Units"), owned(&[Some("1"), Some("2")]));
    }

    #[test]
    fn test_fractional_values_keep_the_column_float() {
        let df = df! { "PMT_VALUE" => ["1500", "99.5", "oops"] }.unwrap();
        let df = project(df, &["PMT_VALUE"], &["PMT_VALUE"]).unwrap();
        let values: Vec<Option<f64>> = df
            .column("PMT_VALUE")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, [Some(1500.0), Some(99.5), None]);
    }

    #[test]
    fn test_integral_floats_downcast_to_int() {
        let df = df! { "PMT_UNITS" => ["2.0", "7"] }.unwrap();
        let df = project(df, &["PMT_UNITS"], &["PMT_UNITS"]).unwrap();
        assert_eq!(ints(&df, "PMT_UNITS"), [Some(2), Some(7)]);
    }

    #[test]
    fn test_missing_numeric_column_is_fatal() {
        let err = project(sample(), &["Nope"], &KEEP).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { ref column, .. } if column == "Nope"));
    }
}
