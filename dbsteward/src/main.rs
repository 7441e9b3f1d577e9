//! Command-line table administration.
//!
//! This binary connects to a SQLite or PostgreSQL database and manages the
//! rows of any table through introspected metadata. Deletes remove every
//! dependent row first, in one transaction.
//!
//! # Security Guarantees
//! - Data values are bound as parameters, never interpolated
//! - Credentials are redacted from logs and error output

mod output;

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use dbsteward_core::error::redact_database_url;
use dbsteward_core::logging::init_logging;
use dbsteward_core::models::{QueryOutcome, Value};
use dbsteward_core::{
    AdminError, DataAdmin, GeneratorConfig, Result, SyntheticDataGenerator, catalog, demo,
};
use output::{CatalogEntry, Format};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "dbsteward")]
#[command(about = "Generic table administration with cascade-aware deletes")]
#[command(version)]
#[command(long_about = "
DBSteward - generic relational table administration

Reads, inserts, updates and deletes rows of any table using only the
database's own catalog. Deleting a row first removes every row that depends
on it through foreign keys, all in one transaction.

SUPPORTED DATABASES:
- PostgreSQL (postgres:// or postgresql://)
- SQLite (sqlite: URLs or .db/.sqlite files)

EXAMPLES:
  dbsteward --database-url sqlite://delivery.db init
  dbsteward --database-url sqlite://delivery.db seed --orders 50
  dbsteward --database-url sqlite://delivery.db delete customers customer_id 1
  dbsteward query --list
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Database connection URL
    #[arg(
        long,
        global = true,
        env = "DATABASE_URL",
        help = "Database connection string (credentials will be sanitized in logs)"
    )]
    pub database_url: Option<String>,

    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all log output except errors")]
    pub quiet: bool,

    /// Result format
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(Subcommand)]
pub enum Command {
    /// Test database connection
    Test,
    /// Create the demo delivery schema
    Init,
    /// Fill the demo tables with synthetic rows
    Seed(SeedArgs),
    /// List tables
    Tables,
    /// Describe the columns of a table
    Columns {
        /// Table name
        table: String,
    },
    /// Print every row of a table
    Read {
        /// Table name
        table: String,
    },
    /// Insert one row, values in column order (`NULL` or empty for null)
    Insert {
        /// Table name
        table: String,
        /// One value per column
        #[arg(allow_hyphen_values = true)]
        values: Vec<String>,
    },
    /// Change one column of the row with the given primary key
    Update {
        table: String,
        pk_column: String,
        pk_value: String,
        column: String,
        #[arg(allow_hyphen_values = true)]
        new_value: String,
    },
    /// Delete a row and everything that depends on it
    Delete {
        table: String,
        pk_column: String,
        pk_value: String,
    },
    /// Run a canned query or ad-hoc SQL
    Query(QueryArgs),
}

/// Row counts for `seed`.
#[derive(Args)]
pub struct SeedArgs {
    /// Customers to create
    #[arg(long, default_value_t = GeneratorConfig::default().customers)]
    pub customers: usize,
    /// Restaurants to create
    #[arg(long, default_value_t = GeneratorConfig::default().restaurants)]
    pub restaurants: usize,
    /// Orders to create
    #[arg(long, default_value_t = GeneratorConfig::default().orders)]
    pub orders: usize,
    /// Deliveries to create
    #[arg(long, default_value_t = GeneratorConfig::default().deliveries)]
    pub deliveries: usize,
    /// Seed for reproducible data
    #[arg(long)]
    pub seed: Option<u64>,
}

impl From<&SeedArgs> for GeneratorConfig {
    fn from(args: &SeedArgs) -> Self {
        Self {
            customers: args.customers,
            restaurants: args.restaurants,
            orders: args.orders,
            deliveries: args.deliveries,
            seed: args.seed,
        }
    }
}

#[derive(Args)]
pub struct QueryArgs {
    /// List the canned queries
    #[arg(long, conflicts_with_all = ["selector", "sql"])]
    pub list: bool,

    /// Run arbitrary SQL; nothing it changes is committed
    #[arg(long, conflicts_with = "selector")]
    pub sql: Option<String>,

    /// Canned query number or name
    pub selector: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e.full_message());
            ExitCode::FAILURE
        }
    }
}

/// Free-form CLI input to a value: `NULL` or nothing at all means null.
fn parse_value(input: &str) -> Value {
    if input.is_empty() {
        Value::Null
    } else {
        Value::from_input(input)
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", output::to_json(value)?);
    Ok(())
}

async fn connect(cli: &Cli) -> Result<DataAdmin> {
    let database_url = cli.global.database_url.as_deref().ok_or_else(|| {
        AdminError::configuration("Database URL is required (--database-url or DATABASE_URL)")
    })?;
    info!("Target: {}", redact_database_url(database_url));
    DataAdmin::connect(database_url).await
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let format = cli.global.format;

    if let Command::Query(args) = &cli.command
        && args.list
    {
        list_catalog(format)?;
        return Ok(ExitCode::SUCCESS);
    }

    let admin = connect(cli).await?;
    let result = dispatch(&admin, &cli.command, format).await;
    admin.close().await;
    result
}

async fn dispatch(admin: &DataAdmin, command: &Command, format: Format) -> Result<ExitCode> {
    match command {
        Command::Test => {
            admin.test_connection().await?;
            println!(
                "Connection to {} database successful",
                admin.adapter().database_type()
            );
        }
        Command::Init => {
            demo::install_schema(admin.adapter()).await?;
            println!("Demo schema ready: {}", demo::TABLES.join(", "));
        }
        Command::Seed(args) => {
            let mut generator = SyntheticDataGenerator::new(GeneratorConfig::from(args));
            let report = generator.populate(admin).await?;
            match format {
                Format::Json => print_json(&report)?,
                Format::Text => println!(
                    "Inserted {} customers, {} restaurants, {} orders, {} deliveries",
                    report.customers.len(),
                    report.restaurants.len(),
                    report.orders.len(),
                    report.deliveries.len()
                ),
            }
        }
        Command::Tables => {
            let tables = admin.list_tables().await?;
            match format {
                Format::Json => print_json(&tables)?,
                Format::Text => tables.iter().for_each(|t| println!("{}", t)),
            }
        }
        Command::Columns { table } => {
            let schema = admin.describe_table(table).await?;
            match format {
                Format::Json => print_json(&schema)?,
                Format::Text => print!("{}", output::render_schema(&schema)),
            }
        }
        Command::Read { table } => {
            let rows = admin.read(table).await?;
            match format {
                Format::Json => print_json(&rows)?,
                Format::Text => print!("{}", output::render_table(&rows)),
            }
        }
        Command::Insert { table, values } => {
            let values = values.iter().map(|v| parse_value(v)).collect();
            let key = admin.insert(table, values).await?;
            match format {
                Format::Json => print_json(&key)?,
                Format::Text => println!("Inserted into {} with key {}", table, key),
            }
        }
        Command::Update {
            table,
            pk_column,
            pk_value,
            column,
            new_value,
        } => {
            let changed = admin
                .update(
                    table,
                    pk_column,
                    parse_value(pk_value),
                    column,
                    parse_value(new_value),
                )
                .await?;
            match format {
                Format::Json => print_json(&changed)?,
                Format::Text => println!("Updated {} row in {}", changed, table),
            }
        }
        Command::Delete {
            table,
            pk_column,
            pk_value,
        } => {
            let report = admin.delete(table, pk_column, parse_value(pk_value)).await?;
            match format {
                Format::Json => print_json(&report)?,
                Format::Text => print!("{}", output::render_delete_report(&report)),
            }
        }
        Command::Query(args) => return run_query(admin, args, format).await,
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_query(admin: &DataAdmin, args: &QueryArgs, format: Format) -> Result<ExitCode> {
    let outcome = match (&args.sql, &args.selector) {
        (Some(sql), _) => admin.execute(sql).await,
        (None, Some(selector)) => {
            let query = catalog::find(selector).ok_or_else(|| {
                AdminError::configuration(format!(
                    "No canned query '{}' (see `dbsteward query --list`)",
                    selector
                ))
            })?;
            if format == Format::Text {
                println!("{}", query);
            }
            admin.run_catalog_query(query).await
        }
        (None, None) => {
            return Err(AdminError::configuration(
                "Give a query number or name, --sql, or --list",
            ));
        }
    };

    if format == Format::Json {
        print_json(&outcome)?;
    }
    match outcome {
        QueryOutcome::Rows(rows) => {
            if format == Format::Text {
                print!("{}", output::render_table(&rows));
            }
            Ok(ExitCode::SUCCESS)
        }
        QueryOutcome::Failed { message } => {
            if format == Format::Text {
                eprintln!("Query failed: {}", message);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn list_catalog(format: Format) -> Result<()> {
    match format {
        Format::Json => {
            let entries: Vec<CatalogEntry> = catalog::CATALOG.iter().map(CatalogEntry::from).collect();
            print_json(&entries)
        }
        Format::Text => {
            for query in catalog::CATALOG {
                println!("{}", query);
            }
            Ok(())
        }
    }
}
