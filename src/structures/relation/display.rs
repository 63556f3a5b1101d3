use super::table::Table;


const ASCII_TABLE_FORMAT: &str = "     ══            "; // header sep only


impl Table {

    /// renders the first `max_rows` rows as a text table.
    ///
    /// `Null` cells are left blank.
    pub fn as_string(&self, max_rows: usize) -> String {
        let mut text_table = comfy_table::Table::new();
        let mut header_row: Vec<comfy_table::Cell> = Vec::new();

        for col in self.columns() {
            let cell = comfy_table::Cell::new(format!("{}\n<{}>", col.get_name(), col.get_data_type()))
                .set_alignment(comfy_table::CellAlignment::Center);
            header_row.push(cell);
        }
        text_table.set_header(header_row);

        for row in self.rows().iter().take(max_rows) {
            let formatted_row: Vec<String> = self
                .ordered_values(row)
                .iter()
                .map(|v| v.to_csv_field())
                .collect();
            text_table.add_row(formatted_row);
        }

        text_table.load_preset(ASCII_TABLE_FORMAT);
        text_table.to_string()
    }


    /// `clientes (showing 10 of 250 records)`
    pub fn caption(&self, max_rows: usize) -> String {
        if self.is_empty() {
            return format!("{} is empty", self.name());
        }
        format!("{} (showing {} of {} records)", self.name(), max_rows.min(self.row_count()), self.row_count())
    }
}
