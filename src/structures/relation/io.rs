use std::{fs, path::Path};

use calamine::{open_workbook, Data, DataType as _, Reader, Xlsx};
use tracing::debug;

use crate::structures::{
    column::{infer_data_type, Column, FieldValue, DATE_FORMAT},
    db_err::DBError,
    schema::Schema,
};
use super::table::{Row, Table};


const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";


// ---------------
//      IMPORT
// ---------------


/// reads the whole CSV file at `path` into a table shaped like `schema`.
///
/// ### Errors
/// - `FileNotFound` if nothing exists at `path`
/// - `Parse` if a row has the wrong number of fields, the header does not
///   match the schema or a cell does not fit its column type
pub fn load(path: impl AsRef<Path>, schema: &Schema) -> Result<Table, DBError> {
    let bytes = read_file(path.as_ref())?;
    parse_csv(&bytes, schema, &path.as_ref().display().to_string())
}


/// same as `load()`, but the column types are inferred from the data.
///
/// the table is named after the file stem and has no key column.
pub fn load_inferred(path: impl AsRef<Path>) -> Result<Table, DBError> {
    let path = path.as_ref();
    let bytes = read_file(path)?;
    let source = path.display().to_string();

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| source.clone());

    let (header, records) = read_records(&bytes, &source)?;
    build_inferred(&name, &header, &records, &source)
}


/// reads the sheet `sheet` of the xlsx workbook at `path` into a table shaped like `schema`.
///
/// the first row of the sheet is the header, cells are read back as text and parsed
/// exactly like CSV cells, so an empty cell is `Null`.
///
/// ### Errors
/// - `FileNotFound` if nothing exists at `path`
/// - `IOFailure` if the file is not a readable workbook
/// - `Validation` if the workbook has no sheet named `sheet`
/// - `Parse` on the same header and cell problems `load()` reports
pub fn load_workbook(path: impl AsRef<Path>, sheet: &str, schema: &Schema) -> Result<Table, DBError> {
    schema.validate()?;
    let path = path.as_ref();
    let source = format!("{}[{sheet}]", path.display());
    let (header, records) = read_sheet(path, sheet, &source)?;
    build_table(schema, &header, &records, &source)
}


/// same as `load_workbook()` with inferred column types; the table is named after the sheet
pub fn load_workbook_inferred(path: impl AsRef<Path>, sheet: &str) -> Result<Table, DBError> {
    let path = path.as_ref();
    let source = format!("{}[{sheet}]", path.display());
    let (header, records) = read_sheet(path, sheet, &source)?;
    build_inferred(sheet, &header, &records, &source)
}


/// names of the sheets in the workbook at `path`, in workbook order
pub fn workbook_sheets(path: impl AsRef<Path>) -> Result<Vec<String>, DBError> {
    Ok(open_xlsx(path.as_ref())?.sheet_names())
}


fn read_file(path: &Path) -> Result<Vec<u8>, DBError> {
    if !path.exists() {
        return Err(DBError::FileNotFound(path.display().to_string()));
    }
    fs::read(path).map_err(
        |e| DBError::IOFailure(path.display().to_string(), e.to_string())
    )
}


/// parses CSV bytes into a table shaped like `schema`. `source` is only used in error messages.
pub fn parse_csv(bytes: &[u8], schema: &Schema, source: &str) -> Result<Table, DBError> {
    schema.validate()?;
    let (header, records) = read_records(bytes, source)?;
    build_table(schema, &header, &records, source)
}


type NumberedRecord = (u64, csv::StringRecord);


fn open_xlsx(path: &Path) -> Result<Xlsx<std::io::BufReader<fs::File>>, DBError> {
    if !path.exists() {
        return Err(DBError::FileNotFound(path.display().to_string()));
    }
    open_workbook(path).map_err(|e: calamine::XlsxError| DBError::IOFailure(path.display().to_string(), e.to_string()))
}


/// the sheet as a header plus numbered records, the same shape `read_records()` gives for CSV
fn read_sheet(path: &Path, sheet: &str, source: &str) -> Result<(Vec<String>, Vec<NumberedRecord>), DBError> {
    let mut workbook = open_xlsx(path)?;
    if !workbook.sheet_names().iter().any(|s| s == sheet) {
        return Err(DBError::validation(format!("'{}' has no sheet named '{sheet}'", path.display())));
    }

    let range = workbook.worksheet_range(sheet).map_err(|e| parse_error(source, 1, e.to_string()))?;
    // rows above the first used cell are not part of the range
    let first_line = range.start().map_or(1, |(row, _)| u64::from(row) + 1);
    let mut rows = range.rows();

    let header: Vec<String> = rows
        .next()
        .map(|cells| cells.iter().map(|c| cell_text(c).unwrap_or_default().trim().to_string()).collect())
        .unwrap_or_default();

    if header.is_empty() || header.iter().all(String::is_empty) {
        return Err(parse_error(source, first_line, "missing header row".to_string()));
    }

    let mut records = Vec::new();
    for (idx, cells) in rows.enumerate() {
        let line = first_line + idx as u64 + 1;
        let fields = cells
            .iter()
            .map(cell_text)
            .collect::<Option<Vec<String>>>()
            .ok_or_else(|| parse_error(source, line, "the row holds a formula error".to_string()))?;
        records.push((line, csv::StringRecord::from(fields)));
    }

    Ok((header, records))
}


/// a workbook cell as the text a CSV cell would hold, `None` for an error cell
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty                                      => Some(String::new()),
        Data::String(v) | Data::DurationIso(v)           => Some(v.clone()),
        Data::Int(v)                                     => Some(v.to_string()),
        // workbooks store every number as a float, whole ones read back as integers
        Data::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => Some(format!("{}", *v as i64)),
        Data::Float(v)                                   => Some(v.to_string()),
        Data::Bool(v)                                    => Some(v.to_string()),
        Data::DateTime(_) | Data::DateTimeIso(_)         => cell.as_date().map(|d| d.format(DATE_FORMAT).to_string()),
        Data::Error(_)                                   => None,
    }
}


fn read_records(bytes: &[u8], source: &str) -> Result<(Vec<String>, Vec<NumberedRecord>), DBError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let header: Vec<String> = reader
        .headers()
        .map_err(|e| parse_error(source, 1, e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if header.is_empty() || header.iter().all(String::is_empty) {
        return Err(parse_error(source, 1, "missing header row".to_string()));
    }

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // header is line 1, so the first record is line 2
        let fallback_line = idx as u64 + 2;
        let record = result.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(fallback_line);
            parse_error(source, line, e.to_string())
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(fallback_line);

        if record.len() != header.len() {
            return Err(parse_error(
                source,
                line,
                format!("expected {} fields, found {}", header.len(), record.len())
            ));
        }
        records.push((line, record));
    }

    Ok((header, records))
}


fn build_inferred(name: &str, header: &[String], records: &[NumberedRecord], source: &str) -> Result<Table, DBError> {
    let mut schema = Schema::new(name);
    for (idx, col_name) in header.iter().enumerate() {
        let data_type = infer_data_type(records.iter().map(|(_, r)| r.get(idx).unwrap_or("")));
        schema = schema.column(col_name, data_type);
    }
    build_table(&schema, header, records, source)
}


fn build_table(schema: &Schema, header: &[String], records: &[NumberedRecord], source: &str) -> Result<Table, DBError> {

    // map every schema column to its position in the file
    let mut positions: Vec<(&Column, usize)> = Vec::with_capacity(schema.columns().len());
    for col in schema.columns() {
        let position = header
            .iter()
            .position(|h| h == col.get_name())
            .ok_or_else(|| parse_error(source, 1, format!("missing column '{}'", col.get_name())))?;
        positions.push((col, position));
    }

    if let Some(extra) = header.iter().find(|h| schema.columns().iter().all(|c| c.get_name() != h.as_str())) {
        return Err(parse_error(source, 1, format!("unexpected column '{extra}'")));
    }

    if let Some(repeated) = header.iter().enumerate().find_map(|(i, h)| header[..i].contains(h).then_some(h)) {
        return Err(parse_error(source, 1, format!("column '{repeated}' appears more than once")));
    }

    let mut table = Table::from_schema(schema)?;
    for (line, record) in records {
        let mut row: Row = Row::with_capacity(positions.len());
        for (col, position) in &positions {
            let raw = record.get(*position).unwrap_or("");
            let value = FieldValue::parse(raw, col.get_data_type()).map_err(|e| {
                parse_error(source, *line, format!("column '{}': {}", col.get_name(), e))
            })?;
            row.insert(col.get_name().to_string(), value);
        }
        table.push_row(row);
    }

    debug!(source, rows = table.row_count(), columns = table.column_count(), "loaded table");
    Ok(table)
}


fn parse_error(source: &str, line: u64, message: String) -> DBError {
    DBError::Parse { file: source.to_string(), line, message }
}


// ---------------
//     EXPORT
// ---------------
impl Table {

    /// serializes the table as comma separated values with a header row and no index column
    pub fn to_csv(&self) -> Result<Vec<u8>, DBError> {
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());

        writer.write_record(self.columns().iter().map(|c| c.get_name()))?;
        for row in self.rows() {
            writer.write_record(self.ordered_values(row).iter().map(|v| v.to_csv_field()))?;
        }

        writer.into_inner().map_err(|e| DBError::Export(e.to_string()))
    }
}


// ---------------
//   TEXT INPUT
// ---------------
impl Table {

    /// parses `raw` as a value of the column `col_name`
    pub fn parse_value(&self, col_name: &str, raw: &str) -> Result<FieldValue, DBError> {
        FieldValue::parse(raw, &self.data_type_of(col_name)?)
    }


    /// turns `column=value` pairs into a record, each value parsed by its column type.
    ///
    /// `column=` gives `Null`. Only the first `=` splits, so values may contain one.
    pub fn parse_record<S: AsRef<str>>(&self, assignments: &[S]) -> Result<Row, DBError> {
        let mut record = Row::with_capacity(assignments.len());

        for assignment in assignments {
            let assignment = assignment.as_ref();
            let (col_name, raw) = assignment
                .split_once('=')
                .ok_or_else(|| DBError::validation(format!("'{assignment}' is not of the form column=value")))?;

            let col_name = col_name.trim();
            if !self.is_valid_column(col_name) {
                return Err(DBError::validation(format!("the column '{col_name}' does not exist in '{}'", self.name())));
            }
            if record.insert(col_name.to_string(), self.parse_value(col_name, raw)?).is_some() {
                return Err(DBError::validation(format!("the column '{col_name}' is assigned twice")));
            }
        }

        Ok(record)
    }
}


#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempdir::TempDir;

    use super::*;
    use crate::structures::{column::DataType, relation::export::to_spreadsheet};

    fn invoice_schema() -> Schema {
        Schema::new("facturas")
            .column("id_factura", DataType::Integer)
            .column("fecha", DataType::Date)
            .column("total", DataType::Float)
            .key("id_factura", true)
    }

    #[test]
    fn parses_typed_rows_in_schema_order() {
        let csv = b"total,id_factura,fecha\n10.5,1,2024-01-05\n,2,2024-02-01\n";
        let table = parse_csv(csv, &invoice_schema(), "mem").unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.all_column_names(), vec!["id_factura", "fecha", "total"]);
        assert_eq!(table.value(0, "total"), Some(&FieldValue::Float(10.5)));
        assert_eq!(table.value(1, "total"), Some(&FieldValue::Null));
    }

    #[test]
    fn inconsistent_field_count_is_a_parse_error() {
        let csv = b"id_factura,fecha,total\n1,2024-01-05,3.0\n2,2024-01-06\n";
        match parse_csv(csv, &invoice_schema(), "mem") {
            Err(DBError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn unparsable_typed_cell_is_a_parse_error() {
        let csv = b"id_factura,fecha,total\n1,yesterday,3.0\n";
        assert!(matches!(parse_csv(csv, &invoice_schema(), "mem"), Err(DBError::Parse { line: 2, .. })));
    }

    #[test]
    fn header_must_match_schema() {
        let missing = b"id_factura,total\n1,3.0\n";
        assert!(matches!(parse_csv(missing, &invoice_schema(), "mem"), Err(DBError::Parse { line: 1, .. })));

        let extra = b"id_factura,fecha,total,notes\n1,2024-01-01,3.0,x\n";
        assert!(matches!(parse_csv(extra, &invoice_schema(), "mem"), Err(DBError::Parse { line: 1, .. })));
    }

    #[test]
    fn repeated_header_column_is_a_parse_error() {
        let schema = Schema::new("t").column("id", DataType::Integer).column("n", DataType::String);
        match parse_csv(b"id,n,n\n1,a,SECRET\n", &schema, "mem") {
            Err(DBError::Parse { line, message, .. }) => {
                assert_eq!(line, 1);
                assert!(message.contains("'n'"));
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn inferred_types_tolerate_empty_cells() {
        let dir = TempDir::new("load_inferred").unwrap();
        let path = dir.path().join("pedidos.csv");
        fs::write(&path, "id,precio,fecha,pagado,nota,vacia\n1,2.5,2024-01-05,true,,\n2,,2024-02-01,false,urgente,\n3,4,,,,\n").unwrap();

        let table = load_inferred(&path).unwrap();
        assert_eq!(table.name(), "pedidos");
        assert_eq!(table.key_column(), None);
        assert_eq!(table.row_count(), 3);

        let types: Vec<DataType> = table.columns().iter().map(|c| *c.get_data_type()).collect();
        assert_eq!(types, vec![
            DataType::Integer, DataType::Float, DataType::Date, DataType::Boolean, DataType::String, DataType::String,
        ]);

        assert_eq!(table.value(1, "precio"), Some(&FieldValue::Null));
        assert_eq!(table.value(2, "precio"), Some(&FieldValue::Float(4.0)));
        assert_eq!(table.value(0, "fecha"), Some(&FieldValue::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())));
        assert_eq!(table.value(2, "pagado"), Some(&FieldValue::Null));
        assert_eq!(table.value(1, "nota"), Some(&FieldValue::from("urgente")));
        assert_eq!(table.value(0, "vacia"), Some(&FieldValue::Null));
    }

    #[test]
    fn workbook_sheet_loads_like_csv() {
        let csv = b"id_factura,fecha,total\n1,2024-01-05,10.5\n2,2024-02-01,\n3,2024-02-09,7.0\n";
        let table = parse_csv(csv, &invoice_schema(), "mem").unwrap();

        let dir = TempDir::new("load_workbook").unwrap();
        let path = dir.path().join("facturas.xlsx");
        fs::write(&path, to_spreadsheet(&[("otra", &table), ("facturas", &table)]).unwrap()).unwrap();

        assert_eq!(workbook_sheets(&path).unwrap(), vec!["otra", "facturas"]);
        assert_eq!(load_workbook(&path, "facturas", &invoice_schema()).unwrap(), table);

        let inferred = load_workbook_inferred(&path, "facturas").unwrap();
        assert_eq!(inferred.name(), "facturas");
        assert_eq!(*inferred.columns()[0].get_data_type(), DataType::Integer);
        assert_eq!(inferred.value(2, "total"), Some(&FieldValue::Float(7.0)));

        let missing = load_workbook(&path, "clientes", &invoice_schema());
        assert!(matches!(missing, Err(DBError::Validation(_))));
        let not_there = load_workbook(dir.path().join("nope.xlsx"), "facturas", &invoice_schema());
        assert!(matches!(not_there, Err(DBError::FileNotFound(_))));
    }

    #[test]
    fn missing_file_is_not_found() {
        let result = load("/definitely/not/here.csv", &invoice_schema());
        assert!(matches!(result, Err(DBError::FileNotFound(_))));
    }

    #[test]
    fn csv_quotes_embedded_delimiters() {
        let schema = Schema::new("notes").column("id", DataType::Integer).column("text", DataType::String);
        let mut table = Table::from_schema(&schema).unwrap();
        table.push_row(Row::from([
            ("id".to_string(), FieldValue::Integer(1)),
            ("text".to_string(), FieldValue::from("hola, \"mundo\"")),
        ]));

        let bytes = table.to_csv().unwrap();
        assert_eq!(String::from_utf8(bytes.clone()).unwrap(), "id,text\n1,\"hola, \"\"mundo\"\"\"\n");
        assert_eq!(parse_csv(&bytes, &schema, "mem").unwrap(), table);
    }

    #[test]
    fn parses_assignments_by_column_type() {
        let table = parse_csv(b"id_factura,fecha,total\n", &invoice_schema(), "mem").unwrap();
        let record = table.parse_record(&["total=12.5", "fecha=2024-03-01", "id_factura="]).unwrap();

        assert_eq!(record.get("total"), Some(&FieldValue::Float(12.5)));
        assert_eq!(record.get("id_factura"), Some(&FieldValue::Null));
        assert!(matches!(table.parse_record(&["total"]), Err(DBError::Validation(_))));
        assert!(matches!(table.parse_record(&["nope=1"]), Err(DBError::Validation(_))));
        assert!(matches!(table.parse_record(&["total=abc"]), Err(DBError::Validation(_))));
    }
}
