use std::fs;

use chrono::NaiveDate;
use tempdir::TempDir;

use tally::{
    sales::{ReportSet, SalesDataset, TableKind},
    Config, ExportFormat, FieldValue, Row,
};


fn config(dir: &TempDir) -> Config {
    Config {
        data_dir: dir.path().join("data"),
        export_dir: dir.path().join("salida"),
        preview_rows: 5,
    }
}


fn row(values: &[(&str, FieldValue)]) -> Row {
    values.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}


fn seeded_dataset(config: &Config) -> SalesDataset {
    let mut dataset = SalesDataset::create(config).expect("unable to create the dataset");

    let clientes = dataset.store_mut(TableKind::Clientes);
    clientes.insert(row(&[
        ("nombre", "María".into()),
        ("apellido", "Núñez".into()),
        ("email", "maria@mail.com".into()),
        ("id_localidad", FieldValue::Integer(3)),
    ])).unwrap();

    let empleados = dataset.store_mut(TableKind::Empleados);
    empleados.insert(row(&[
        ("nombre", "Juan".into()),
        ("labor", "Vendedor".into()),
        ("id_sucursal", FieldValue::Integer(1)),
    ])).unwrap();

    let facturas = dataset.store_mut(TableKind::FacturasEnc);
    for (day, total) in [(3, 120.0), (18, 80.25)] {
        facturas.insert(row(&[
            ("fecha", FieldValue::Date(NaiveDate::from_ymd_opt(2024, 5, day).unwrap())),
            ("id_cliente", FieldValue::Integer(1)),
            ("id_sucursal", FieldValue::Integer(1)),
            ("id_empleado", FieldValue::Integer(1)),
            ("total", FieldValue::Float(total)),
        ])).unwrap();
    }

    let detalles = dataset.store_mut(TableKind::FacturasDet);
    detalles.insert(row(&[
        ("id_factura", FieldValue::Integer(1)),
        ("id_producto", FieldValue::Integer(4)),
        ("cantidad", FieldValue::Integer(3)),
        ("precio_unitario", FieldValue::Float(40.0)),
    ])).unwrap();

    dataset
}


#[test]
fn test_create_then_open_dataset() {
    let dir = TempDir::new("test_dataset").expect("Unable to create temporary directory");
    let config = config(&dir);
    seeded_dataset(&config);

    let reopened = SalesDataset::open(&config).unwrap();
    assert_eq!(reopened.table(TableKind::FacturasEnc).row_count(), 2);
    assert_eq!(reopened.table(TableKind::Clientes).value(0, "nombre"), Some(&FieldValue::from("María")));
}


#[test]
fn test_write_all_formats() {
    let dir = TempDir::new("test_reports").expect("Unable to create temporary directory");
    let config = config(&dir);
    let dataset = seeded_dataset(&config);
    let exported_at = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();

    let reports = ReportSet::build(&dataset.tables(), exported_at).unwrap();
    let written = reports
        .write_all(&config.export_dir, &[ExportFormat::Csv, ExportFormat::Json, ExportFormat::Xlsx])
        .unwrap();

    // nine reports, two JSON documents, one workbook
    assert_eq!(written.len(), 12);
    for path in &written {
        assert!(path.is_file(), "{} was not written", path.display());
    }

    let ranking = fs::read_to_string(config.export_dir.join("ventas_por_cliente.csv")).unwrap();
    assert_eq!(
        ranking,
        "id_cliente,total_comprado,nombre_completo,email,id_localidad\n1,200.25,María Núñez,maria@mail.com,3\n"
    );

    let summary = fs::read_to_string(config.export_dir.join("resumen_estadistico.json")).unwrap();
    assert!(summary.starts_with("{\n    \"total_clientes\": 1,"));
    assert!(summary.contains("\"periodo_inicio\": \"2024-05-03\""));
    assert!(summary.contains("\"fecha_exportacion\": \"2024-06-01 09:00:00\""));

    let full: serde_json::Value =
        serde_json::from_slice(&fs::read(config.export_dir.join("resumen_analisis_completo.json")).unwrap()).unwrap();
    assert_eq!(full["top_10_clientes"][0]["nombre_completo"], "María Núñez");
    assert_eq!(full["ventas_mensuales"][0]["mes"], "2024-05");
    assert_eq!(full["resumen_estadistico"]["ventas_totales"], 200.25);

    let workbook = fs::read(config.export_dir.join("analisis_completo.xlsx")).unwrap();
    assert_eq!(&workbook[..2], b"PK");
}


#[test]
fn test_zip_bundle_and_workbook_read_back() {
    let dir = TempDir::new("test_bundle").expect("Unable to create temporary directory");
    let config = config(&dir);
    let dataset = seeded_dataset(&config);
    let exported_at = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();

    let reports = ReportSet::build(&dataset.tables(), exported_at).unwrap();
    let written = reports.write_all(&config.export_dir, &[ExportFormat::Zip, ExportFormat::Xlsx]).unwrap();
    assert_eq!(written, vec![
        config.export_dir.join("sistema_ventas_completo.zip"),
        config.export_dir.join("analisis_completo.xlsx"),
    ]);

    let bundle = fs::File::open(&written[0]).unwrap();
    let mut archive = zip::ZipArchive::new(bundle).unwrap();
    let mut clientes = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("clientes.csv").unwrap(), &mut clientes).unwrap();
    assert_eq!(clientes.as_bytes(), dataset.table(TableKind::Clientes).to_csv().unwrap().as_slice());

    let kind = TableKind::FacturasEnc;
    let sheet = tally::load_workbook(&written[1], kind.sheet_name(), &kind.schema()).unwrap();
    assert_eq!(&sheet, dataset.table(kind));
}
