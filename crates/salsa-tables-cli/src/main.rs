//! salsa-tables CLI - typed tables and schema-checked SQLite access.

use clap::{Parser, Subcommand};
use salsa_tables::store::{self, command};
use salsa_tables::{
    BatchInsert, Config, DefaultResolver, InterfaceState, PortSynchronizer, SalsaError,
    SqliteSchemaSource, StoreTarget, Table, Value,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};

/// Message printed when a command is not armed with --execute.
const NOT_ARMED: &str = "Set --execute to run.";

#[derive(Parser)]
#[command(name = "salsa-tables")]
#[command(about = "Typed tables and schema-checked SQLite access")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database file (overrides store.path)
    #[arg(short, long)]
    database: Option<String>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a table if it does not exist
    CreateTable {
        /// Table name
        #[arg(long)]
        table: String,

        /// Column definition as name:type (type is text, bool, int or double)
        #[arg(long = "column", required = true)]
        columns: Vec<String>,

        /// Actually run the statement
        #[arg(long)]
        execute: bool,
    },

    /// Show a table's columns and their types
    Describe {
        /// Table name
        #[arg(long)]
        table: String,
    },

    /// Append rows from a JSON file, checked against the live schema
    Insert {
        /// Table name
        #[arg(long)]
        table: String,

        /// JSON file: an object mapping column names to arrays of values
        #[arg(long)]
        data: PathBuf,

        /// Saved interface state; created or updated after a successful sync
        #[arg(long)]
        state: Option<PathBuf>,

        /// Actually write
        #[arg(long)]
        execute: bool,
    },

    /// Run a query and print the result table
    Query {
        /// SQL text
        #[arg(long)]
        sql: String,

        /// Print value counts for this column instead of rows
        #[arg(long)]
        counts: Option<String>,

        /// Actually run the query
        #[arg(long)]
        execute: bool,
    },

    /// Run a statement that returns no rows
    Command {
        /// SQL text
        #[arg(long)]
        sql: String,

        /// Actually run the statement
        #[arg(long)]
        execute: bool,
    },

    /// Select columns from a table
    Select {
        /// Table name
        #[arg(long)]
        table: String,

        /// Comma-separated columns (default: all)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        /// WHERE clause, passed through as written
        #[arg(long)]
        filter: Option<String>,

        /// Print value counts for this column instead of rows
        #[arg(long)]
        counts: Option<String>,

        /// Actually run the query
        #[arg(long)]
        execute: bool,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<(), SalsaError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(SalsaError::Config)?;

    let config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };

    match cli.command {
        Commands::CreateTable {
            table,
            columns,
            execute,
        } => {
            let definitions = columns
                .iter()
                .map(|c| parse_column_arg(c))
                .collect::<Result<Vec<_>, _>>()?;
            let specs = command::parse_column_definitions(&definitions)?;
            if !execute {
                println!("{}", NOT_ARMED);
                return Ok(());
            }

            let target = target(&config, &cli.database)?;
            let sql = command::create_table(&target, &table, &specs)?;
            if cli.output_json {
                println!("{}", serde_json::json!({ "table": table, "sql": sql }));
            } else {
                println!("Table '{}' is ready.", table);
            }
        }

        Commands::Describe { table } => {
            let target = target(&config, &cli.database)?;
            let schema = store::describe(&target, &table)?;
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&schema)?);
            } else {
                println!("Table: {}", schema.table);
                for column in &schema.columns {
                    println!("  {}\t{}", column.name, column.scalar_type);
                }
            }
        }

        Commands::Insert {
            table,
            data,
            state,
            execute,
        } => {
            if !execute {
                println!("{}", NOT_ARMED);
                return Ok(());
            }

            let target = target(&config, &cli.database)?;
            let mut ports = match &state {
                Some(path) if path.exists() => {
                    let saved = InterfaceState::from_json(&std::fs::read_to_string(path)?)?;
                    PortSynchronizer::restore(3, saved)
                }
                _ => PortSynchronizer::new(3, config.interface.default_mode),
            };

            let source = SqliteSchemaSource::new(DefaultResolver).with_busy_timeout(config.store.busy_timeout());
            ports.sync_with_source(&source, &target.display_name(), &table)?;
            if ports.ports().is_empty() {
                return Err(SalsaError::InvalidInput(format!(
                    "The interface has no ports in {} mode",
                    ports.mode()
                )));
            }
            if let Some(path) = &state {
                std::fs::write(path, ports.state().to_json()?)?;
            }

            let values = read_port_values(&data, &ports, &table)?;
            let outcome = BatchInsert {
                execute,
                table,
                columns: ports.write_columns(values)?,
            }
            .run_on(&target)?;

            if cli.output_json {
                println!("{}", serde_json::json!({ "message": outcome.message() }));
            } else {
                println!("{}", outcome.message());
            }
        }

        Commands::Query {
            sql,
            counts,
            execute,
        } => {
            if !execute {
                println!("{}", NOT_ARMED);
                return Ok(());
            }
            let target = target(&config, &cli.database)?;
            let result = command::execute_query(&target, &sql)?;
            print_table(&result, counts.as_deref(), cli.output_json)?;
        }

        Commands::Command { sql, execute } => {
            if !execute {
                println!("{}", NOT_ARMED);
                return Ok(());
            }
            let target = target(&config, &cli.database)?;
            let affected = command::execute_command(&target, &sql)?;
            if cli.output_json {
                println!("{}", serde_json::json!({ "rows_affected": affected }));
            } else {
                println!("Rows affected: {}", affected);
            }
        }

        Commands::Select {
            table,
            columns,
            filter,
            counts,
            execute,
        } => {
            let sql = command::select_sql(&table, &columns, filter.as_deref())?;
            if !execute {
                println!("{}", sql);
                println!("{}", NOT_ARMED);
                return Ok(());
            }
            let target = target(&config, &cli.database)?;
            let result = command::select(&target, &table, &columns, filter.as_deref())?;
            print_table(&result, counts.as_deref(), cli.output_json)?;
        }
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}'", other)),
    }

    Ok(())
}

fn target(config: &Config, database: &Option<String>) -> Result<StoreTarget, SalsaError> {
    config.store.target(&DefaultResolver, database.as_deref())
}

/// Split a `name:type` column argument.
fn parse_column_arg(arg: &str) -> Result<(String, String), SalsaError> {
    match arg.rsplit_once(':') {
        Some((name, ty)) if !name.trim().is_empty() && !ty.trim().is_empty() => {
            Ok((name.trim().to_string(), ty.trim().to_string()))
        }
        _ => Err(SalsaError::InvalidInput(format!(
            "Column must be given as name:type, got '{}'",
            arg
        ))),
    }
}

/// Read one value list per port from a JSON object keyed by column name.
fn read_port_values(
    path: &Path,
    ports: &PortSynchronizer,
    table: &str,
) -> Result<Vec<Vec<Value>>, SalsaError> {
    let content = std::fs::read_to_string(path)?;
    let mut data: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)?;

    let mut values = Vec::with_capacity(ports.ports().len());
    for port in ports.ports() {
        match data.remove(port.nickname()) {
            Some(serde_json::Value::Array(items)) => {
                values.push(items.into_iter().map(Value::from).collect());
            }
            Some(_) => {
                return Err(SalsaError::InvalidInput(format!(
                    "Values for column '{}' must be an array",
                    port.nickname()
                )))
            }
            None => {
                return Err(SalsaError::InvalidInput(format!(
                    "No values given for column '{}'",
                    port.nickname()
                )))
            }
        }
    }

    if !data.is_empty() {
        return Err(SalsaError::UnknownColumn {
            table: table.to_string(),
            columns: data.keys().cloned().collect(),
        });
    }
    Ok(values)
}

fn print_table(table: &Table, counts: Option<&str>, json: bool) -> Result<(), SalsaError> {
    if let Some(column) = counts {
        let counts = table.value_counts(column)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&counts)?);
        } else {
            for entry in counts {
                println!("{}\t{}", entry.count, entry.value);
            }
        }
        return Ok(());
    }

    if json {
        println!("{}", table.to_json()?);
        return Ok(());
    }

    println!("{}", table.summary());
    let header: Vec<&str> = table.columns().iter().map(|c| c.name()).collect();
    println!("{}", header.join("\t"));
    for row in table.rows() {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        println!("{}", cells.join("\t"));
    }
    Ok(())
}
