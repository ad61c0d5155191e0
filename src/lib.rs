// Declare modules
pub mod db;
pub mod error;
pub mod format;
pub mod import;
pub mod mapper;
pub mod models;
pub mod parse;
pub mod progress;

// Re-export key types for easier use
pub use error::{LmfError, Result};
pub use format::OutputFormat;
pub use import::{ImportOptions, ImportSummary};
pub use models::{Node, QueryResult, Row, Value};
pub use parse::ParserKind;

use log::{debug, info};
use progress::{
    ProgressCallback, ProgressUpdate, STAGE_PARSING, STAGE_READING, STAGE_WRITING, report,
};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tokio::task;

/// Options for constructing an [`Lmf`] handle.
#[derive(Debug, Default, Clone)]
pub struct LmfOptions {
    /// Path of the SQLite database file. Required; there is no default location.
    pub database: Option<PathBuf>,
}

/// Options for [`Lmf::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Output format. Default: `OutputFormat::Table`.
    pub format: OutputFormat,
    /// Highlight the table header on terminals. Default: `true`.
    pub colors: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            format: OutputFormat::Table,
            colors: true,
        }
    }
}

/// What [`Lmf::query`] produces.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// Rendered text for the `table`, `csv`, `json` and `yaml` formats.
    Text(String),
    /// The row set itself for `OutputFormat::Raw`.
    Raw(QueryResult),
}

/// Handle on one LMF database file.
///
/// Lifecycle: `open` → any number of `import`/`query` calls → `close`. Every
/// operation except `open` fails with [`LmfError::NotOpen`] while closed; a
/// second `open` fails with [`LmfError::AlreadyOpen`]. Whoever calls `open` is
/// responsible for calling `close` on every exit path.
pub struct Lmf {
    database: PathBuf,
    conn: Option<Connection>,
}

impl Lmf {
    /// Creates a closed handle. Fails if no database path is configured.
    pub fn new(options: LmfOptions) -> Result<Self> {
        let database = options
            .database
            .ok_or_else(|| LmfError::Configuration("no database path given".to_string()))?;
        Ok(Lmf {
            database,
            conn: None,
        })
    }

    /// Shortcut for `Lmf::new` with just a database path.
    pub fn with_database(path: impl Into<PathBuf>) -> Self {
        Lmf {
            database: path.into(),
            conn: None,
        }
    }

    pub fn database_path(&self) -> &Path {
        &self.database
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Opens the database file. A file that did not exist before is created and
    /// receives the schema; an existing file is used as it is.
    pub async fn open(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Err(LmfError::AlreadyOpen);
        }
        let existed = tokio::fs::try_exists(&self.database).await?;
        info!("Using database path: {:?}", self.database);
        let conn = db::open_db_connection(&self.database)?;
        if existed {
            info!("Database exists. Skipping schema creation.");
            db::check_schema_version(&conn);
        } else if let Err(e) = db::initialize_database(&conn) {
            // Do not leave a half-initialized file behind.
            drop(conn);
            let _ = tokio::fs::remove_file(&self.database).await;
            return Err(e);
        }
        self.conn = Some(conn);
        Ok(())
    }

    /// Imports an LMF XML file. All generated rows are written in one
    /// transaction: either all of them land or none do.
    pub async fn import(
        &mut self,
        xml_file: impl AsRef<Path>,
        options: ImportOptions,
    ) -> Result<ImportSummary> {
        self.import_with_progress(xml_file, options, None).await
    }

    /// Like [`Lmf::import`], reporting the reading, parsing and writing stages.
    pub async fn import_with_progress(
        &mut self,
        xml_file: impl AsRef<Path>,
        options: ImportOptions,
        mut progress: Option<ProgressCallback>,
    ) -> Result<ImportSummary> {
        let conn = self.conn.as_mut().ok_or(LmfError::NotOpen)?;
        let xml_file = xml_file.as_ref();

        if !tokio::fs::try_exists(xml_file).await? {
            return Err(LmfError::InputFileNotFound(xml_file.display().to_string()));
        }
        report(
            &mut progress,
            ProgressUpdate::new_stage(STAGE_READING, None)
                .with_message(xml_file.display().to_string()),
        );
        info!("Reading LMF XML file: {:?}", xml_file);
        let xml = tokio::fs::read_to_string(xml_file).await?;

        info!(
            "Parsing LMF XML with the {} parser ({} entity pass(es))...",
            options.parser, options.parse_entities
        );
        report(&mut progress, ProgressUpdate::new_stage(STAGE_PARSING, None));
        // Parsing and mapping are CPU-bound; keep them off the async worker.
        let (sql, summary, mut progress) =
            task::spawn_blocking(move || import::generate_sql(&xml, options, progress))
                .await
                .map_err(|e| LmfError::Internal(format!("parser task failed: {}", e)))??;

        report(
            &mut progress,
            ProgressUpdate::new_stage(STAGE_WRITING, Some(summary.statements)),
        );
        db::execute_import(conn, &sql)?;
        report(
            &mut progress,
            ProgressUpdate::at(STAGE_WRITING, summary.statements, Some(summary.statements)),
        );

        info!(
            "Imported {} row(s) from {} element(s).",
            summary.statements, summary.elements
        );
        for (table, rows) in &summary.rows_per_table {
            debug!("  {}: {} row(s)", table, rows);
        }
        Ok(summary)
    }

    /// Executes one SQL statement and renders its rows.
    pub async fn query(&self, sql: &str, options: QueryOptions) -> Result<QueryOutput> {
        let result = self.query_rows(sql).await?;
        match options.format {
            OutputFormat::Raw => Ok(QueryOutput::Raw(result)),
            text_format => Ok(QueryOutput::Text(format::render(
                &result,
                text_format,
                options.colors,
            )?)),
        }
    }

    /// Executes one SQL statement and returns its rows unformatted.
    pub async fn query_rows(&self, sql: &str) -> Result<QueryResult> {
        let conn = self.conn.as_ref().ok_or(LmfError::NotOpen)?;
        db::run_query(conn, sql)
    }

    /// Closes the database, releasing the connection.
    pub async fn close(&mut self) -> Result<()> {
        let conn = self.conn.take().ok_or(LmfError::NotOpen)?;
        conn.close().map_err(|(conn, e)| {
            // Keep the handle usable so the caller may retry.
            self.conn = Some(conn);
            LmfError::Database(e)
        })?;
        debug!("Database closed: {:?}", self.database);
        Ok(())
    }
}
