use crate::structures::{column::DataType, schema::Schema};


/// the four tables of the sales dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Clientes,
    Empleados,
    FacturasEnc,
    FacturasDet
}


impl TableKind {
    pub const ALL: [TableKind; 4] = [TableKind::Clientes, TableKind::Empleados, TableKind::FacturasEnc, TableKind::FacturasDet];


    pub fn parse_str(str: &str) -> Option<TableKind> {
        match str.trim().to_lowercase().replace('-', "_").as_str() {
            "clientes"                     => Some(TableKind::Clientes),
            "empleados"                    => Some(TableKind::Empleados),
            "facturas_enc" | "facturas"    => Some(TableKind::FacturasEnc),
            "facturas_det" | "detalles"    => Some(TableKind::FacturasDet),
            _ => None
        }
    }


    pub fn name(&self) -> &'static str {
        match self {
            TableKind::Clientes    => "clientes",
            TableKind::Empleados   => "empleados",
            TableKind::FacturasEnc => "facturas_enc",
            TableKind::FacturasDet => "facturas_det",
        }
    }


    /// the sheet this table gets in the full workbook
    pub fn sheet_name(&self) -> &'static str {
        match self {
            TableKind::Clientes    => "Clientes",
            TableKind::Empleados   => "Empleados",
            TableKind::FacturasEnc => "Facturas_Enc",
            TableKind::FacturasDet => "Facturas_Det",
        }
    }


    pub fn file_name(&self) -> String { format!("{}.csv", self.name()) }


    pub fn schema(&self) -> Schema {
        match self {
            TableKind::Clientes => Schema::new(self.name())
                .column("id_cliente", DataType::Integer)
                .column("nombre", DataType::String)
                .column("apellido", DataType::String)
                .column("email", DataType::String)
                .column("telefono", DataType::String)
                .column("direccion", DataType::String)
                .column("id_localidad", DataType::Integer)
                .key("id_cliente", true),

            TableKind::Empleados => Schema::new(self.name())
                .column("id_empleado", DataType::Integer)
                .column("nombre", DataType::String)
                .column("apellido", DataType::String)
                .column("labor", DataType::String)
                .column("id_sucursal", DataType::Integer)
                .key("id_empleado", true),

            TableKind::FacturasEnc => Schema::new(self.name())
                .column("id_factura", DataType::Integer)
                .column("fecha", DataType::Date)
                .column("id_cliente", DataType::Integer)
                .column("id_sucursal", DataType::Integer)
                .column("id_empleado", DataType::Integer)
                .column("total", DataType::Float)
                .key("id_factura", true),

            TableKind::FacturasDet => Schema::new(self.name())
                .column("id_factura_det", DataType::Integer)
                .column("id_factura", DataType::Integer)
                .column("id_producto", DataType::Integer)
                .column("cantidad", DataType::Integer)
                .column("precio_unitario", DataType::Float)
                .key("id_factura_det", true),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_schema_is_valid_and_keyed() {
        for kind in TableKind::ALL {
            let schema = kind.schema();
            assert!(schema.validate().is_ok(), "{}", kind.name());
            assert!(schema.auto_increment());
            assert_eq!(TableKind::parse_str(kind.name()), Some(kind));
        }
        assert_eq!(TableKind::parse_str("Facturas-Det"), Some(TableKind::FacturasDet));
        assert_eq!(TableKind::FacturasEnc.file_name(), "facturas_enc.csv");
    }
}
