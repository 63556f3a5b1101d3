use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Map, Number, Value};
use tracing::debug;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::structures::{column::FieldValue, db_err::DBError};
use super::table::Table;


/// the longest sheet name a workbook accepts
pub const MAX_SHEET_NAME_LEN: usize = 31;

const JSON_INDENT: &[u8] = b"    ";
const MIN_COLUMN_WIDTH: f64 = 10.0;
const MAX_COLUMN_WIDTH: f64 = 60.0;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
    /// a zip archive with the csv and json of every table
    Zip
}


impl ExportFormat {
    pub fn parse_str(str: &str) -> Option<ExportFormat> {
        match str.trim().to_lowercase().as_str() {
            "csv"                  => Some(ExportFormat::Csv),
            "json"                 => Some(ExportFormat::Json),
            "xlsx" | "excel"       => Some(ExportFormat::Xlsx),
            "zip"                  => Some(ExportFormat::Zip),
            _ => None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv  => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Zip  => "zip",
        }
    }
}


impl Table {

    /// serializes the table in `format`. A spreadsheet gets a single sheet and an archive
    /// a single csv/json pair, both named after the table.
    pub fn export(&self, format: ExportFormat) -> Result<Vec<u8>, DBError> {
        match format {
            ExportFormat::Csv  => self.to_csv(),
            ExportFormat::Json => self.to_json(),
            ExportFormat::Xlsx => to_spreadsheet(&[(self.name(), self)]),
            ExportFormat::Zip  => to_bundle(&[self]),
        }
    }


    /// one JSON object per row, rows in table order and keys in column order
    pub fn to_json_value(&self) -> Value {
        let records = self.rows()
            .iter()
            .map(|row| {
                let mut record = Map::with_capacity(self.column_count());
                for (col, value) in self.columns().iter().zip(self.ordered_values(row)) {
                    record.insert(col.get_name().to_string(), json_value(value));
                }
                Value::Object(record)
            })
            .collect();

        Value::Array(records)
    }


    /// the rows as a JSON array of objects, indented by 4 spaces.
    ///
    /// ## Note
    /// non-ASCII text is written as is, never escaped
    pub fn to_json(&self) -> Result<Vec<u8>, DBError> {
        to_pretty_json(&self.to_json_value())
    }
}


/// pretty prints any serializable value with the 4 space indent used by every JSON export
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, DBError> {
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(JSON_INDENT));
    value.serialize(&mut serializer)?;
    Ok(buffer)
}


fn json_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Integer(v) => Value::Number(Number::from(*v)),
        FieldValue::Float(v)   => Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null),
        FieldValue::String(v)  => Value::String(v.clone()),
        FieldValue::Date(_)    => Value::String(value.to_string()),
        FieldValue::Boolean(v) => Value::Bool(*v),
        FieldValue::Null       => Value::Null,
    }
}


/// the name a sheet gets in a workbook: characters a workbook rejects become `_`,
/// then the name is cut to `MAX_SHEET_NAME_LEN` characters
pub fn sheet_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .take(MAX_SHEET_NAME_LEN)
        .collect::<String>()
        .trim_matches('\'')
        .to_string()
}


/// builds an xlsx workbook with one sheet per `(name, table)` pair, in the given order.
///
/// ### Errors
/// `SheetNameCollision` when two names end up the same after `sheet_name()`
/// (workbooks compare sheet names case-insensitively)
pub fn to_spreadsheet(sheets: &[(&str, &Table)]) -> Result<Vec<u8>, DBError> {
    let mut taken: HashMap<String, &str> = HashMap::new();
    let mut names: Vec<String> = Vec::with_capacity(sheets.len());

    for &(raw, _) in sheets {
        let name = sheet_name(raw);
        if name.is_empty() {
            return Err(DBError::validation(format!("'{raw}' cannot be used as a sheet name")));
        }
        if let Some(first) = taken.insert(name.to_lowercase(), raw) {
            return Err(DBError::SheetNameCollision {
                first: first.to_string(),
                second: raw.to_string(),
                truncated: name,
            });
        }
        names.push(name);
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for (name, (_, table)) in names.iter().zip(sheets) {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name)?;
        write_sheet(worksheet, table, &header_format)?;
        debug!(sheet = name.as_str(), rows = table.row_count(), "wrote worksheet");
    }

    Ok(workbook.save_to_buffer()?)
}


/// builds a zip archive holding `<name>.csv` and `<name>.json` for every table, in the given order.
///
/// entries carry a fixed timestamp, so the same tables always give the same bytes.
///
/// ### Errors
/// `Validation` when two tables share a name
pub fn to_bundle(tables: &[&Table]) -> Result<Vec<u8>, DBError> {
    let mut taken: HashSet<&str> = HashSet::new();
    if let Some(dup) = tables.iter().find(|t| !taken.insert(t.name())) {
        return Err(DBError::validation(format!("the table '{}' would be bundled twice", dup.name())));
    }

    let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .last_modified_time(zip::DateTime::default())
        .compression_method(CompressionMethod::Deflated);

    for table in tables {
        for (format, bytes) in [(ExportFormat::Csv, table.to_csv()?), (ExportFormat::Json, table.to_json()?)] {
            let entry = format!("{}.{}", table.name(), format.extension());
            archive.start_file(entry, options)?;
            archive.write_all(&bytes).map_err(|e| DBError::Export(e.to_string()))?;
        }
        debug!(table = table.name(), rows = table.row_count(), "bundled table");
    }

    Ok(archive.finish()?.into_inner())
}


fn write_sheet(worksheet: &mut Worksheet, table: &Table, header_format: &Format) -> Result<(), DBError> {

    for (idx, col) in table.columns().iter().enumerate() {
        let col_idx = sheet_column(idx)?;
        worksheet.write_string_with_format(0, col_idx, col.get_name(), header_format)?;

        // width fits the longest cell, within limits
        let longest = table.rows()
            .iter()
            .map(|r| r.get(col.get_name()).map_or(0, |v| v.to_csv_field().chars().count()))
            .chain(std::iter::once(col.get_name().chars().count()))
            .max()
            .unwrap_or(0);
        let width = (longest as f64 + 2.0).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);
        worksheet.set_column_width(col_idx, width)?;
    }

    for (row_idx, row) in table.rows().iter().enumerate() {
        let xlsx_row_number = u32::try_from(row_idx + 1)
            .map_err(|_| DBError::Export(format!("'{}' has too many rows for a worksheet", table.name())))?;

        for (idx, value) in table.ordered_values(row).into_iter().enumerate() {
            let col_idx = sheet_column(idx)?;
            match value {
                FieldValue::Integer(v) => { worksheet.write_number(xlsx_row_number, col_idx, *v as f64)?; }
                FieldValue::Float(v)   => { worksheet.write_number(xlsx_row_number, col_idx, *v)?; }
                FieldValue::Boolean(v) => { worksheet.write_boolean(xlsx_row_number, col_idx, *v)?; }
                FieldValue::String(v)  => { worksheet.write_string(xlsx_row_number, col_idx, v)?; }
                FieldValue::Date(_)    => { worksheet.write_string(xlsx_row_number, col_idx, value.to_string())?; }
                FieldValue::Null       => (),
            }
        }
    }

    Ok(())
}


fn sheet_column(idx: usize) -> Result<u16, DBError> {
    u16::try_from(idx).map_err(|_| DBError::Export(format!("column {idx} is past the last worksheet column")))
}
