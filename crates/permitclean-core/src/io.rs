//! CSV load and store for data frames
//!
//! Vendor exports, catalogs, directive tables and reference tables are all
//! CSV files with a header row. Bytes are decoded with the configured
//! encoding first; a UTF-8 input with malformed sequences is rejected rather
//! than silently repaired. Every column loads as a string column. Empty
//! fields and the usual missing-value markers (`NA`, `NaN`, `null`, ...) load
//! as nulls.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::table::{DATE_FORMAT, DATETIME_FORMAT};

/// Tokens read as missing values
const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Text encoding of an input file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// UTF-8
    #[default]
    #[serde(alias = "utf-8")]
    Utf8,
    /// ISO-8859-1, decoded with the windows-1252 superset
    #[serde(alias = "latin", alias = "latin-1", alias = "iso-8859-1")]
    Latin1,
}

impl Encoding {
    fn codec(self) -> &'static encoding_rs::Encoding {
        match self {
            Self::Utf8 => encoding_rs::UTF_8,
            Self::Latin1 => encoding_rs::WINDOWS_1252,
        }
    }

    /// Decode a whole file. A byte-order mark overrides the configured
    /// encoding.
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        let (text, used, malformed) = self.codec().decode(bytes);
        if malformed {
            let count = text.matches(char::REPLACEMENT_CHARACTER).count();
            tracing::warn!("{} malformed {} sequence(s) in input", count, used.name());
            return Err(Error::Decode {
                encoding: used.name().to_string(),
                count,
            });
        }
        if used != self.codec() {
            tracing::debug!("Byte-order mark selects {}", used.name());
        }
        Ok(text.into_owned())
    }
}

/// Load a data frame from a CSV file
pub fn read_csv<P: AsRef<Path>>(path: P, encoding: Encoding) -> Result<DataFrame> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let df = read_csv_from(file, encoding)?;
    tracing::debug!(
        "Loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

/// Load a data frame from any CSV reader
pub fn read_csv_from<R: Read>(mut reader: R, encoding: Encoding) -> Result<DataFrame> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let text = encoding.decode(&bytes)?;

    let null_values = NullValues::AllColumns(NA_TOKENS.iter().map(|t| (*t).into()).collect());
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| opts.with_null_values(Some(null_values.clone())))
        .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
        .finish()?;
    Ok(df)
}

/// Write a data frame to a CSV file, creating parent directories as needed
pub fn write_csv<P: AsRef<Path>>(df: &DataFrame, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_csv_to(df, file)?;
    tracing::debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Write a data frame to any writer. Nulls become empty fields.
pub fn write_csv_to<W: Write>(df: &DataFrame, writer: W) -> Result<()> {
    let mut df = df.clone();
    CsvWriter::new(writer)
        .include_header(true)
        .with_date_format(Some(DATE_FORMAT.into()))
        .with_datetime_format(Some(DATETIME_FORMAT.into()))
        .finish(&mut df)?;
    Ok(())
}
