use tracing::info;

use crate::{
    config::Config,
    store::{record_store::RecordStore, storage::FileStorage},
    structures::{db_err::DBError, relation::table::Table},
};
use super::schemas::TableKind;


/// the four stores of the sales dataset, each backed by `<data_dir>/<table>.csv`
#[derive(Debug)]
pub struct SalesDataset {
    clientes: RecordStore,
    empleados: RecordStore,
    facturas_enc: RecordStore,
    facturas_det: RecordStore,
}


/// borrowed views of the four tables, the input of every report
#[derive(Debug, Clone, Copy)]
pub struct SalesTables<'a> {
    pub clientes: &'a Table,
    pub empleados: &'a Table,
    pub facturas_enc: &'a Table,
    pub facturas_det: &'a Table,
}


impl SalesDataset {

    /// opens every table in `config.data_dir`. All four files must exist.
    pub fn open(config: &Config) -> Result<SalesDataset, DBError> {
        let open = |kind: TableKind| RecordStore::<FileStorage>::open(config.table_path(&kind.file_name()), kind.schema());
        SalesDataset::from_stores(open)
    }


    /// like `open()`, creating any missing table file with only its header
    pub fn create(config: &Config) -> Result<SalesDataset, DBError> {
        let create = |kind: TableKind| RecordStore::<FileStorage>::create(config.table_path(&kind.file_name()), kind.schema());
        SalesDataset::from_stores(create)
    }


    fn from_stores<F>(mut open: F) -> Result<SalesDataset, DBError>
    where
        F: FnMut(TableKind) -> Result<RecordStore, DBError>
    {
        let dataset = SalesDataset {
            clientes: open(TableKind::Clientes)?,
            empleados: open(TableKind::Empleados)?,
            facturas_enc: open(TableKind::FacturasEnc)?,
            facturas_det: open(TableKind::FacturasDet)?,
        };

        info!(
            clientes = dataset.clientes.list().row_count(),
            empleados = dataset.empleados.list().row_count(),
            facturas = dataset.facturas_enc.list().row_count(),
            detalles = dataset.facturas_det.list().row_count(),
            "loaded sales dataset"
        );
        Ok(dataset)
    }


    pub fn store(&self, kind: TableKind) -> &RecordStore {
        match kind {
            TableKind::Clientes    => &self.clientes,
            TableKind::Empleados   => &self.empleados,
            TableKind::FacturasEnc => &self.facturas_enc,
            TableKind::FacturasDet => &self.facturas_det,
        }
    }


    pub fn store_mut(&mut self, kind: TableKind) -> &mut RecordStore {
        match kind {
            TableKind::Clientes    => &mut self.clientes,
            TableKind::Empleados   => &mut self.empleados,
            TableKind::FacturasEnc => &mut self.facturas_enc,
            TableKind::FacturasDet => &mut self.facturas_det,
        }
    }


    pub fn table(&self, kind: TableKind) -> &Table { self.store(kind).list() }


    pub fn tables(&self) -> SalesTables<'_> {
        SalesTables {
            clientes: self.clientes.list(),
            empleados: self.empleados.list(),
            facturas_enc: self.facturas_enc.list(),
            facturas_det: self.facturas_det.list(),
        }
    }


    /// rereads every table from disk
    pub fn reload(&mut self) -> Result<(), DBError> {
        for kind in TableKind::ALL {
            self.store_mut(kind).reload()?;
        }
        Ok(())
    }
}
