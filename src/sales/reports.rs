use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use tracing::info;

use crate::{
    store::storage::{FileStorage, Storage},
    structures::{
        db_err::DBError,
        relation::{
            aggregate::{AggregateOp, Aggregation},
            export::{to_bundle, to_pretty_json, to_spreadsheet, ExportFormat},
            sort::SortOrder,
            table::Table,
        },
    },
};
use super::{dataset::SalesTables, schemas::TableKind, summary::SummaryStatistics};


pub const TOP_INVOICES: usize = 20;
/// rows of each ranking kept in the combined JSON summary
pub const JSON_TOP_ROWS: usize = 10;

pub const FULL_JSON_FILE: &str = "resumen_analisis_completo.json";
pub const SUMMARY_JSON_FILE: &str = "resumen_estadistico.json";
pub const WORKBOOK_FILE: &str = "analisis_completo.xlsx";
pub const BUNDLE_FILE: &str = "sistema_ventas_completo.zip";
const SUMMARY_SHEET: &str = "Resumen";


// |=========================|
// |     Report builders     |
// |=========================|


/// clients with their full name, the shape every client-facing report joins against
fn client_details(clientes: &Table) -> Result<Table, DBError> {
    clientes
        .with_concat_column("nombre_completo", &["nombre", "apellido"], " ")?
        .select_columns(&["id_cliente", "nombre_completo", "email", "id_localidad"])
}


/// total bought per client, best client first
pub fn sales_by_client(tables: &SalesTables) -> Result<Table, DBError> {
    Ok(tables.facturas_enc
        .aggregate_named(&["id_cliente"], &[Aggregation::new(AggregateOp::Sum, "total", "total_comprado")])?
        .left_join(&client_details(tables.clientes)?, "id_cliente")?
        .sort_by("total_comprado", SortOrder::Descending)?
        .named("ventas_por_cliente"))
}


/// `sales_by_client` plus the invoice count and the average ticket of each client
pub fn average_ticket_by_client(tables: &SalesTables) -> Result<Table, DBError> {
    let invoice_counts = tables.facturas_enc
        .aggregate_named(&["id_cliente"], &[Aggregation::new(AggregateOp::Count, "id_factura", "cantidad_facturas")])?;

    Ok(sales_by_client(tables)?
        .left_join(&invoice_counts, "id_cliente")?
        .with_ratio_column("ticket_promedio", "total_comprado", "cantidad_facturas")?
        .named("ticket_promedio_por_cliente"))
}


/// the `TOP_INVOICES` largest invoices with the buyer's name
pub fn top_invoices(tables: &SalesTables) -> Result<Table, DBError> {
    Ok(tables.facturas_enc
        .left_join(&client_details(tables.clientes)?, "id_cliente")?
        .sort_by("total", SortOrder::Descending)?
        .head(TOP_INVOICES)
        .select_columns(&["id_factura", "fecha", "nombre_completo", "total", "id_sucursal"])?
        .named("top_facturas"))
}


/// total, invoice count and average sale per `YYYY-MM`, oldest month first
pub fn sales_by_month(tables: &SalesTables) -> Result<Table, DBError> {
    Ok(tables.facturas_enc
        .with_year_month_column("mes", "fecha")?
        .aggregate_named(&["mes"], &sales_figures())?
        .sort_by("mes", SortOrder::Ascending)?
        .named("ventas_por_mes"))
}


pub fn top_products_by_quantity(tables: &SalesTables) -> Result<Table, DBError> {
    Ok(tables.facturas_det
        .aggregate_named(&["id_producto"], &[Aggregation::new(AggregateOp::Sum, "cantidad", "cantidad_vendida")])?
        .sort_by("cantidad_vendida", SortOrder::Descending)?
        .named("productos_mas_vendidos_cantidad"))
}


/// revenue (`cantidad * precio_unitario`) per product, highest first
pub fn top_products_by_revenue(tables: &SalesTables) -> Result<Table, DBError> {
    Ok(tables.facturas_det
        .with_product_column("facturacion", "cantidad", "precio_unitario")?
        .aggregate_named(&["id_producto"], &[Aggregation::new(AggregateOp::Sum, "facturacion", "facturacion")])?
        .sort_by("facturacion", SortOrder::Descending)?
        .named("productos_mas_vendidos_facturacion"))
}


pub fn sales_by_branch(tables: &SalesTables) -> Result<Table, DBError> {
    Ok(tables.facturas_enc
        .aggregate_named(&["id_sucursal"], &sales_figures())?
        .sort_by("id_sucursal", SortOrder::Ascending)?
        .named("ventas_por_sucursal"))
}


pub fn clients_by_locality(tables: &SalesTables) -> Result<Table, DBError> {
    Ok(tables.clientes
        .aggregate_named(&["id_localidad"], &[Aggregation::new(AggregateOp::Count, "id_cliente", "cantidad_clientes")])?
        .sort_by("cantidad_clientes", SortOrder::Descending)?
        .named("clientes_por_localidad"))
}


pub fn employees_by_role(tables: &SalesTables) -> Result<Table, DBError> {
    Ok(tables.empleados
        .aggregate_named(&["labor"], &[Aggregation::new(AggregateOp::Count, "nombre", "cantidad_empleados")])?
        .sort_by("cantidad_empleados", SortOrder::Descending)?
        .named("empleados_por_cargo"))
}


fn sales_figures() -> [Aggregation; 3] {
    [
        Aggregation::new(AggregateOp::Sum, "total", "ventas_totales"),
        Aggregation::new(AggregateOp::Count, "total", "cantidad_facturas"),
        Aggregation::new(AggregateOp::Mean, "total", "promedio_ventas"),
    ]
}


// |====================|
// |     Report set     |
// |====================|


/// every report of the dataset, computed once and written in any format
#[derive(Debug, Clone)]
pub struct ReportSet {
    sources: Vec<(TableKind, Table)>,
    reports: Vec<Table>,
    summary: SummaryStatistics,
}


impl ReportSet {

    pub fn build(tables: &SalesTables, exported_at: NaiveDateTime) -> Result<ReportSet, DBError> {
        let reports = vec![
            sales_by_client(tables)?,
            average_ticket_by_client(tables)?,
            top_invoices(tables)?,
            sales_by_month(tables)?,
            top_products_by_quantity(tables)?,
            top_products_by_revenue(tables)?,
            sales_by_branch(tables)?,
            clients_by_locality(tables)?,
            employees_by_role(tables)?,
        ];

        let sources = vec![
            (TableKind::Clientes, tables.clientes.clone()),
            (TableKind::Empleados, tables.empleados.clone()),
            (TableKind::FacturasEnc, tables.facturas_enc.clone()),
            (TableKind::FacturasDet, tables.facturas_det.clone()),
        ];

        Ok(ReportSet { sources, reports, summary: SummaryStatistics::compute(tables, exported_at)? })
    }


    /// the reports in the order they are written
    pub fn reports(&self) -> &Vec<Table> { &self.reports }

    pub fn report(&self, name: &str) -> Option<&Table> { self.reports.iter().find(|r| r.name() == name) }

    pub fn summary(&self) -> &SummaryStatistics { &self.summary }


    /// writes the set into `dir`, creating it if needed, and returns the written paths.
    ///
    /// - csv: one file per report
    /// - json: the combined summary plus the summary statistics alone
    /// - xlsx: one workbook with the source tables, every report and a summary sheet
    /// - zip: one archive with the csv and json of the source tables and every report
    pub fn write_all(&self, dir: &Path, formats: &[ExportFormat]) -> Result<Vec<PathBuf>, DBError> {
        let mut written: Vec<PathBuf> = Vec::new();

        for format in formats {
            match format {
                ExportFormat::Csv => {
                    for report in &self.reports {
                        let path = dir.join(format!("{}.{}", report.name(), format.extension()));
                        write_file(&path, &report.to_csv()?)?;
                        written.push(path);
                    }
                }
                ExportFormat::Json => {
                    let full = dir.join(FULL_JSON_FILE);
                    write_file(&full, &to_pretty_json(&self.full_summary()?)?)?;
                    written.push(full);

                    let summary = dir.join(SUMMARY_JSON_FILE);
                    write_file(&summary, &to_pretty_json(&self.summary)?)?;
                    written.push(summary);
                }
                ExportFormat::Xlsx => {
                    let path = dir.join(WORKBOOK_FILE);
                    write_file(&path, &self.workbook()?)?;
                    written.push(path);
                }
                ExportFormat::Zip => {
                    let path = dir.join(BUNDLE_FILE);
                    write_file(&path, &self.bundle()?)?;
                    written.push(path);
                }
            }
        }

        info!(dir = %dir.display(), files = written.len(), "wrote reports");
        Ok(written)
    }


    /// the summary statistics with the top rankings and the full grouped reports
    pub fn full_summary(&self) -> Result<Value, DBError> {
        let top = |name: &str| self.require(name).map(|t| t.head(JSON_TOP_ROWS).to_json_value());
        let all = |name: &str| self.require(name).map(Table::to_json_value);

        let mut document = Map::new();
        document.insert("resumen_estadistico".to_string(), serde_json::to_value(&self.summary)?);
        document.insert("top_10_clientes".to_string(), top("ventas_por_cliente")?);
        document.insert("top_10_productos_cantidad".to_string(), top("productos_mas_vendidos_cantidad")?);
        document.insert("top_10_productos_facturacion".to_string(), top("productos_mas_vendidos_facturacion")?);
        document.insert("ventas_mensuales".to_string(), all("ventas_por_mes")?);
        document.insert("ventas_por_sucursal".to_string(), all("ventas_por_sucursal")?);
        document.insert("clientes_por_localidad".to_string(), all("clientes_por_localidad")?);
        document.insert("empleados_por_cargo".to_string(), all("empleados_por_cargo")?);

        Ok(Value::Object(document))
    }


    /// the whole set as one xlsx workbook
    pub fn workbook(&self) -> Result<Vec<u8>, DBError> {
        let summary = self.summary.as_table()?;

        let mut sheets: Vec<(&str, &Table)> = self.sources
            .iter()
            .map(|(kind, table)| (kind.sheet_name(), table))
            .collect();
        sheets.extend(self.reports.iter().map(|r| (r.name(), r)));
        sheets.push((SUMMARY_SHEET, &summary));

        to_spreadsheet(&sheets)
    }


    /// the source tables then every report, each as csv and json, in one zip archive
    pub fn bundle(&self) -> Result<Vec<u8>, DBError> {
        let tables: Vec<&Table> = self.sources
            .iter()
            .map(|(_, table)| table)
            .chain(&self.reports)
            .collect();
        to_bundle(&tables)
    }


    fn require(&self, name: &str) -> Result<&Table, DBError> {
        self.report(name).ok_or_else(|| DBError::Export(format!("the report '{name}' was not built")))
    }
}


fn write_file(path: &Path, bytes: &[u8]) -> Result<(), DBError> {
    FileStorage::new(path).write(bytes)
}
