use std::{fs, path::{Path, PathBuf}, process::ExitCode};

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::debug;

use tally::{
    config::Config,
    load_inferred, load_workbook_inferred, logging,
    sales::{ReportSet, SalesDataset, TableKind},
    structures::relation::export::to_pretty_json,
    workbook_sheets, DBError, ExportFormat, Table,
};

// cargo install --path cli

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "manage the sales tables and build their reports")]
struct CLI {
    /// directory holding clientes.csv, empleados.csv, facturas_enc.csv and facturas_det.csv
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// directory reports and exports are written to
    #[arg(long, global = true, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command
}


#[derive(Subcommand)]
enum Command {
    /// Create the missing table files in the data directory, each with only its header
    Init,
    /// Print the first rows of a table
    List {
        /// clientes, empleados, facturas_enc or facturas_det
        table: String,
        /// Number of rows to show
        #[arg(short, long)]
        rows: Option<usize>,
    },
    /// Add a row to a table
    Insert {
        table: String,
        /// column=value pairs; the key is assigned when left out
        #[arg(required = true, value_name = "COLUMN=VALUE")]
        values: Vec<String>,
    },
    /// Change the rows matching a key
    Update {
        table: String,
        /// value of the key column, or of --column when given
        #[arg(short, long)]
        key: String,
        /// match on this column instead of the key column
        #[arg(short, long)]
        column: Option<String>,
        #[arg(required = true, value_name = "COLUMN=VALUE")]
        values: Vec<String>,
    },
    /// Remove the rows matching a key
    Delete {
        table: String,
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        column: Option<String>,
    },
    /// Write one table as csv, json, xlsx or zip
    Export {
        table: String,
        #[arg(short, long, default_value = "csv")]
        format: String,
        /// output file, defaults to <export dir>/<table>.<format>
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build every report and write it in the given formats
    Reports {
        /// repeatable; csv, json and xlsx when left out
        #[arg(short, long)]
        format: Vec<String>,
    },
    /// Print the summary statistics
    Summary,
    /// Describe the columns of a table or of any csv/xlsx file: types, missing values and statistics
    Profile {
        /// one of the sales tables, or the path of a csv or xlsx file
        source: String,
        /// sheet to read from a workbook, defaults to the first one
        #[arg(short, long)]
        sheet: Option<String>,
        /// print the profile as JSON
        #[arg(long)]
        json: bool,
    },
    /// Read any csv or xlsx file, inferring the column types, and write it in another format
    Convert {
        file: PathBuf,
        #[arg(short, long, default_value = "json")]
        format: String,
        #[arg(short, long)]
        sheet: Option<String>,
        /// output file, defaults to <export dir>/<file name>.<format>
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}


fn main() -> ExitCode {
    let cli = CLI::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}", e.to_string().yellow());
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let label = if e.is_user_error() { "invalid input" } else { "error" };
            eprintln!("{}: {}", label.red().bold(), e);
            ExitCode::FAILURE
        }
    }
}


fn run(cli: CLI) -> Result<(), DBError> {
    let config = Config::load()?.with_overrides(cli.data_dir, cli.export_dir);
    debug!(data_dir = %config.data_dir.display(), export_dir = %config.export_dir.display(), "resolved configuration");

    match cli.command {
        Command::Init => {
            let dataset = SalesDataset::create(&config)?;
            for kind in TableKind::ALL {
                let table = dataset.table(kind);
                println!("  {} {} ({} rows)", "•".cyan(), config.table_path(&kind.file_name()).display(), table.row_count());
            }
            println!("{} {}", "ready".green(), config.data_dir.display());
        }

        Command::Profile { source, sheet, json } => {
            let table = match TableKind::parse_str(&source) {
                Some(kind) => open_dataset(&config)?.table(kind).clone(),
                None => load_file(Path::new(&source), sheet.as_deref())?,
            };
            let profile = table.profile()?;

            if json {
                println!("{}", String::from_utf8_lossy(&to_pretty_json(&profile)?));
            } else {
                println!(
                    "{} {} rows, {} columns, {} missing values",
                    profile.tabla.bold(), profile.filas, profile.columnas, profile.valores_faltantes
                );
                println!("{}", profile.as_table()?.as_string(usize::MAX));
            }
        }

        Command::Convert { file, format, sheet, output } => {
            let format = parse_format(&format)?;
            let table = load_file(&file, sheet.as_deref())?;
            let path = output.unwrap_or_else(|| config.export_dir.join(format!("{}.{}", table.name(), format.extension())));
            write_output(&path, &table.export(format)?)?;
            println!("{} {} rows to {}", "converted".green(), table.row_count(), path.display());
        }

        Command::List { table, rows } => {
            let dataset = open_dataset(&config)?;
            let table = dataset.table(parse_table(&table)?);
            let rows = rows.unwrap_or(config.preview_rows);
            println!("{}", table.caption(rows).bold());
            println!("{}", table.as_string(rows));
        }

        Command::Insert { table, values } => {
            let mut dataset = open_dataset(&config)?;
            let store = dataset.store_mut(parse_table(&table)?);
            let record = store.list().parse_record(&values)?;
            let key = store.insert(record)?;
            println!("{} {} into {}", "inserted".green(), key, store.list().name());
        }

        Command::Update { table, key, column, values } => {
            let mut dataset = open_dataset(&config)?;
            let store = dataset.store_mut(parse_table(&table)?);
            let column = resolve_column(column, store.schema().key_column())?;
            let key = store.list().parse_value(&column, &key)?;
            let changes = store.list().parse_record(&values)?;
            let changed = store.update_where(&column, &key, changes)?;
            println!("{} {} row(s) where {} = {}", "updated".green(), changed, column, key);
        }

        Command::Delete { table, key, column } => {
            let mut dataset = open_dataset(&config)?;
            let store = dataset.store_mut(parse_table(&table)?);
            let column = resolve_column(column, store.schema().key_column())?;
            let key = store.list().parse_value(&column, &key)?;
            let deleted = store.delete_where(&column, &key)?;
            println!("{} {} row(s) where {} = {}", "deleted".green(), deleted, column, key);
        }

        Command::Export { table, format, output } => {
            let kind = parse_table(&table)?;
            let format = parse_format(&format)?;
            let bytes = open_dataset(&config)?.store(kind).export(format)?;

            let path = output.unwrap_or_else(|| config.export_dir.join(format!("{}.{}", kind.name(), format.extension())));
            write_output(&path, &bytes)?;
            println!("{} {}", "wrote".green(), path.display());
        }

        Command::Reports { format } => {
            let formats = if format.is_empty() {
                vec![ExportFormat::Csv, ExportFormat::Json, ExportFormat::Xlsx]
            } else {
                format.iter().map(|f| parse_format(f)).collect::<Result<Vec<_>, _>>()?
            };

            let dataset = open_dataset(&config)?;
            let reports = ReportSet::build(&dataset.tables(), chrono::Local::now().naive_local())?;
            for path in reports.write_all(&config.export_dir, &formats)? {
                println!("  {} {}", "•".cyan(), path.display());
            }
            println!("{} {} report(s)", "built".green(), reports.reports().len());
        }

        Command::Summary => {
            let dataset = open_dataset(&config)?;
            let reports = ReportSet::build(&dataset.tables(), chrono::Local::now().naive_local())?;
            println!("{}", reports.summary().as_table()?.as_string(usize::MAX));
        }
    }

    Ok(())
}


/// opens the dataset, pointing at `init` when a table file is missing
fn open_dataset(config: &Config) -> Result<SalesDataset, DBError> {
    SalesDataset::open(config).inspect_err(|e| {
        if matches!(e, DBError::FileNotFound(_)) {
            eprintln!("{}", "run `tally init` to create the missing table files".yellow());
        }
    })
}


/// a csv or xlsx file with inferred column types
fn load_file(path: &Path, sheet: Option<&str>) -> Result<Table, DBError> {
    let is_workbook = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
    if !is_workbook {
        return load_inferred(path);
    }

    let sheet = match sheet {
        Some(sheet) => sheet.to_string(),
        None => workbook_sheets(path)?
            .into_iter()
            .next()
            .ok_or_else(|| DBError::validation(format!("'{}' has no sheets", path.display())))?,
    };
    load_workbook_inferred(path, &sheet)
}


fn write_output(path: &Path, bytes: &[u8]) -> Result<(), DBError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DBError::IOFailure(parent.display().to_string(), e.to_string()))?;
    }
    fs::write(path, bytes).map_err(|e| DBError::IOFailure(path.display().to_string(), e.to_string()))
}


fn parse_table(name: &str) -> Result<TableKind, DBError> {
    TableKind::parse_str(name).ok_or_else(|| {
        let known: Vec<&str> = TableKind::ALL.iter().map(|k| k.name()).collect();
        DBError::validation(format!("unknown table '{name}', expected one of {}", known.join(", ")))
    })
}


fn parse_format(name: &str) -> Result<ExportFormat, DBError> {
    ExportFormat::parse_str(name).ok_or_else(|| DBError::validation(format!("unknown format '{name}', expected csv, json, xlsx or zip")))
}


fn resolve_column(column: Option<String>, key_column: Option<&str>) -> Result<String, DBError> {
    column
        .or_else(|| key_column.map(str::to_string))
        .ok_or_else(|| DBError::validation("the table has no key column, pass --column"))
}
