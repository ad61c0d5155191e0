//! Command-line interface for the WordNet-LMF library.
//!
//! `import` loads an LMF XML file into the database, `query` runs one SQL
//! statement against it and prints the result.

use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use log::{LevelFilter, debug, info};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use wordnet_lmf::{
    ImportOptions, ImportSummary, Lmf, LmfOptions, OutputFormat, ParserKind, QueryOptions,
    QueryOutput,
    error::Result,
    progress::{ProgressCallback, ProgressUpdate},
};

const PROGRAM: &str = "wordnet-lmf";

#[derive(Parser, Debug)]
#[command(
    name = PROGRAM,
    about = "Import WordNet LMF XML into an SQLite database and query it",
    long_about = None,
    disable_version_flag = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// LMF DB file
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Set verbosity level (use -v, -vv, or -vvv for increasing verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Display program version information
    #[arg(short = 'V', long)]
    version: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import LMF XML into LMF DB
    Import {
        /// LMF XML input file
        xml_file: PathBuf,
        /// XML SAX parser to use
        #[arg(short, long, value_enum, default_value_t = ParserKind::Sax)]
        parser: ParserKind,
        /// Number of times to parse and expand XML entities
        #[arg(short = 'e', long, default_value_t = 1)]
        parse_entities: u32,
    },
    /// Query LMF DB
    Query {
        /// One SQL query
        sql_query: String,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Output file ("-" for standard output)
        #[arg(short, long, default_value = "-")]
        output: String,
    },
}

/// Sets up logging based on verbosity level.
fn setup_logging(verbose: u8) {
    let log_level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter(None, log_level)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
}

/// Creates a progress callback rendering the import stages on a spinner.
fn create_progress_callback(spinner: ProgressBar) -> ProgressCallback {
    Box::new(move |update: ProgressUpdate| {
        spinner.set_prefix(update.stage_description.clone());
        let mut message = match update.total_items {
            Some(total) => format!("{}/{}", update.current_item, total),
            None if update.current_item > 0 => format!("{}", update.current_item),
            None => String::new(),
        };
        if let Some(extra) = update.message {
            if !message.is_empty() {
                message.push(' ');
            }
            message.push_str(&extra);
        }
        spinner.set_message(message);
        true
    })
}

fn new_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{prefix:>16.cyan.bold} [{elapsed_precise}] {spinner} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_version() {
    eprintln!("{} {}", PROGRAM, env!("CARGO_PKG_VERSION"));
    eprintln!("{}", env!("CARGO_PKG_DESCRIPTION"));
    eprintln!(
        "Licensed under {} <http://spdx.org/licenses/{}.html>",
        env!("CARGO_PKG_LICENSE"),
        env!("CARGO_PKG_LICENSE")
    );
}

fn fail(command: Option<&str>, message: impl std::fmt::Display) -> ! {
    match command {
        Some(command) => eprintln!("{}: {}: {} {}", PROGRAM, command, "ERROR:".red(), message),
        None => eprintln!("{}: {} {}", PROGRAM, "ERROR:".red(), message),
    }
    std::process::exit(1);
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if cli.version {
        print_version();
        std::process::exit(0);
    }

    let options = LmfOptions {
        database: cli.database,
    };

    match cli.command {
        Some(Commands::Import {
            xml_file,
            parser,
            parse_entities,
        }) => {
            let import_options = ImportOptions {
                parser,
                parse_entities,
            };
            match handle_import(options, xml_file, import_options).await {
                Ok(summary) => {
                    info!(
                        "Imported {} row(s) from {} element(s).",
                        summary.statements, summary.elements
                    );
                    for (table, rows) in &summary.rows_per_table {
                        info!("  {:<22} {:>9}", table, rows);
                    }
                }
                Err(e) => fail(Some("import"), e),
            }
        }
        Some(Commands::Query {
            sql_query,
            format,
            output,
        }) => {
            if let Err(e) = handle_query(options, &sql_query, format, &output).await {
                fail(Some("query"), e);
            }
        }
        None => fail(None, "missing command"),
    }
}

/// Opens the database, imports one file and closes the database again, also
/// when the import fails.
async fn handle_import(
    options: LmfOptions,
    xml_file: PathBuf,
    import_options: ImportOptions,
) -> Result<ImportSummary> {
    let mut lmf = Lmf::new(options)?;
    lmf.open().await?;

    let spinner = new_spinner();
    let outcome = lmf
        .import_with_progress(
            &xml_file,
            import_options,
            Some(create_progress_callback(spinner.clone())),
        )
        .await;
    spinner.finish_and_clear();

    let closed = lmf.close().await;
    let summary = outcome?;
    closed?;
    Ok(summary)
}

/// Opens the database, runs one query, closes the database and writes the
/// rendered result.
async fn handle_query(
    options: LmfOptions,
    sql: &str,
    format: OutputFormat,
    output: &str,
) -> Result<()> {
    let mut lmf = Lmf::new(options)?;
    lmf.open().await?;
    let outcome = lmf
        .query(
            sql,
            QueryOptions {
                format,
                colors: output == "-",
            },
        )
        .await;
    let closed = lmf.close().await;
    let result = outcome?;
    closed?;

    let text = match result {
        QueryOutput::Text(text) => text,
        QueryOutput::Raw(rows) => format!("{:?}\n", rows),
    };
    if output == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
    } else {
        debug!("Writing query result to {}", output);
        tokio::fs::write(output, text).await?;
    }
    Ok(())
}
