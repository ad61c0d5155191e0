//! Turns an LMF document into the SQL batch executed by `Lmf::import`.

use crate::error::{LmfError, Result};
use crate::mapper::map_node;
use crate::models::Node;
use crate::parse::{NodeHandler, ParserKind, StreamingParser};
use crate::progress::{
    PARSE_REPORT_INTERVAL, ProgressCallback, ProgressUpdate, STAGE_PARSING, report,
};
use log::{debug, warn};
use std::collections::BTreeMap;

/// Options for `Lmf::import`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Parser back-end. Default: `ParserKind::Sax`.
    pub parser: ParserKind,
    /// Entity-decoding passes applied to attribute values. Default: 1.
    pub parse_entities: u32,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            parser: ParserKind::Sax,
            parse_entities: 1,
        }
    }
}

/// Statistics of one import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Start-tags seen, recognized or not.
    pub elements: u64,
    /// Insert statements generated.
    pub statements: u64,
    /// Generated rows per target table.
    pub rows_per_table: BTreeMap<&'static str, u64>,
}

impl ImportSummary {
    pub fn rows(&self, table: &str) -> u64 {
        self.rows_per_table.get(table).copied().unwrap_or(0)
    }
}

/// Accumulates insert statements in document order.
pub struct SqlCollector {
    sql: String,
    summary: ImportSummary,
    progress: Option<ProgressCallback>,
}

impl SqlCollector {
    pub fn new(progress: Option<ProgressCallback>) -> Self {
        SqlCollector {
            sql: String::new(),
            summary: ImportSummary::default(),
            progress,
        }
    }

    /// Returns the statement buffer, the summary and the progress callback.
    pub fn finish(self) -> (String, ImportSummary, Option<ProgressCallback>) {
        (self.sql, self.summary, self.progress)
    }
}

impl NodeHandler for SqlCollector {
    fn on_open(&mut self, node: &Node, ancestors: &[Node]) -> Result<()> {
        self.summary.elements += 1;
        if let Some(insert) = map_node(node, ancestors) {
            *self.summary.rows_per_table.entry(insert.table).or_default() += 1;
            self.summary.statements += 1;
            self.sql.push_str(&insert.to_string());
            self.sql.push('\n');
        }
        if self.summary.elements % PARSE_REPORT_INTERVAL == 0 {
            report(
                &mut self.progress,
                ProgressUpdate::at(STAGE_PARSING, self.summary.elements, None),
            );
        }
        Ok(())
    }

    fn on_error(&mut self, error: &LmfError) {
        warn!(
            "XML parsing aborted after {} element(s): {}",
            self.summary.elements, error
        );
    }

    fn on_end(&mut self) {
        debug!(
            "XML parsing finished: {} element(s), {} statement(s)",
            self.summary.elements, self.summary.statements
        );
        report(
            &mut self.progress,
            ProgressUpdate::at(
                STAGE_PARSING,
                self.summary.elements,
                Some(self.summary.elements),
            ),
        );
    }
}

/// Parses `xml` and returns the generated SQL batch, its summary and the
/// progress callback so later stages can keep reporting.
pub fn generate_sql(
    xml: &str,
    options: ImportOptions,
    progress: Option<ProgressCallback>,
) -> Result<(String, ImportSummary, Option<ProgressCallback>)> {
    let parser = StreamingParser::new(options.parser, options.parse_entities);
    let mut collector = SqlCollector::new(progress);
    parser.parse(xml, &mut collector)?;
    Ok(collector.finish())
}
