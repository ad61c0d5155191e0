//! Renders query results as text.

use crate::error::{LmfError, Result};
use crate::models::{QueryResult, Value};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Output format of `Lmf::query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned grid with a header row.
    #[default]
    Table,
    Csv,
    /// Pretty-printed array of objects, 4-space indentation.
    Json,
    /// Block-style YAML sequence of mappings, 4-space indentation.
    Yaml,
    /// The row set itself, unformatted (library callers only).
    #[value(skip)]
    Raw,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Raw => "raw",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = LmfError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            "raw" => Ok(OutputFormat::Raw),
            _ => Err(LmfError::InvalidArgument(format!("invalid format \"{}\"", s))),
        }
    }
}

/// Renders `result` in a textual format. `colors` highlights the table header
/// (styling is only emitted when writing to a terminal).
///
/// `Raw` has no text form and is rejected here; `Lmf::query` hands the row set
/// back directly instead.
pub fn render(result: &QueryResult, format: OutputFormat, colors: bool) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(result, colors)),
        OutputFormat::Csv => render_csv(result),
        OutputFormat::Json => render_json(result),
        OutputFormat::Yaml => render_yaml(result),
        OutputFormat::Raw => Err(LmfError::InvalidArgument(
            "raw results cannot be rendered as text".to_string(),
        )),
    }
}

/// Header-only grid when there are no rows.
pub fn render_table(result: &QueryResult, colors: bool) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Disabled);
    table.set_header(result.columns.iter().map(|name| {
        let cell = Cell::new(name);
        if colors { cell.fg(Color::Cyan) } else { cell }
    }));
    for row in &result.rows {
        table.add_row(row.values().map(Value::to_string));
    }
    let mut output = table.to_string();
    output.push('\n');
    output
}

/// Header line followed by one line per row, quoted where necessary.
/// Statements without result columns render as nothing.
pub fn render_csv(result: &QueryResult) -> Result<String> {
    if result.columns.is_empty() {
        return Ok(String::new());
    }
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(&result.columns)?;
    for row in &result.rows {
        writer.write_record(row.values().map(Value::to_string))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| LmfError::Internal(format!("CSV buffer flush failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| LmfError::Internal(e.to_string()))
}

pub fn render_json(result: &QueryResult) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    result.rows.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| LmfError::Internal(e.to_string()))
}

const YAML_INDENT: &str = "    ";

/// serde_yaml always indents by two, so the sequence/mapping layout is written
/// here and serde_yaml only encodes the individual keys and scalars.
pub fn render_yaml(result: &QueryResult) -> Result<String> {
    if result.rows.is_empty() {
        return Ok("[]\n".to_string());
    }
    let mut output = String::new();
    for row in &result.rows {
        if row.is_empty() {
            output.push_str("- {}\n");
            continue;
        }
        for (i, (name, value)) in row.iter().enumerate() {
            output.push_str(if i == 0 { "-   " } else { YAML_INDENT });
            output.push_str(&yaml_scalar(&name)?);
            output.push(':');
            let scalar = yaml_scalar(value)?;
            let mut lines = scalar.lines();
            if let Some(first) = lines.next() {
                output.push(' ');
                output.push_str(first);
            }
            // Block scalars continue on following lines, nested below the key.
            for line in lines {
                output.push('\n');
                output.push_str(YAML_INDENT);
                output.push_str(line);
            }
            output.push('\n');
        }
    }
    Ok(output)
}

fn yaml_scalar<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let encoded = serde_yaml::to_string(value)?;
    Ok(encoded.trim_end_matches('\n').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Row;

    fn sample() -> QueryResult {
        QueryResult {
            columns: vec!["id".into(), "partOfSpeech".into(), "score".into()],
            rows: vec![
                Row::new(vec![
                    ("id".into(), Value::Text("s1".into())),
                    ("partOfSpeech".into(), Value::Text("n".into())),
                    ("score".into(), Value::Integer(3)),
                ]),
                Row::new(vec![
                    ("id".into(), Value::Text("s2, \"quoted\"".into())),
                    ("partOfSpeech".into(), Value::Null),
                    ("score".into(), Value::Real(0.5)),
                ]),
            ],
        }
    }

    fn empty() -> QueryResult {
        QueryResult {
            columns: vec!["id".into(), "partOfSpeech".into()],
            rows: Vec::new(),
        }
    }

    #[test]
    fn test_json_uses_four_space_indent() {
        let json = render_json(&sample()).unwrap();
        assert!(json.starts_with("[\n    {\n        \"id\": \"s1\",\n        \"partOfSpeech\": \"n\",\n"));
        assert!(json.contains("\"partOfSpeech\": null"));
        assert!(json.ends_with("]"));
    }

    #[test]
    fn test_json_is_deterministic() {
        let result = sample();
        assert_eq!(render_json(&result).unwrap(), render_json(&result).unwrap());
        assert_eq!(render_json(&empty()).unwrap(), "[]");
    }

    #[test]
    fn test_csv_quotes_where_needed() {
        let csv = render_csv(&sample()).unwrap();
        assert_eq!(
            csv,
            "id,partOfSpeech,score\ns1,n,3\n\"s2, \"\"quoted\"\"\",,0.5\n"
        );
        assert_eq!(render_csv(&empty()).unwrap(), "id,partOfSpeech\n");
    }

    #[test]
    fn test_csv_without_columns_is_empty() {
        assert_eq!(render_csv(&QueryResult::default()).unwrap(), "");
    }

    #[test]
    fn test_yaml_block_style() {
        let yaml = render_yaml(&sample()).unwrap();
        assert!(yaml.starts_with("-   id: s1\n    partOfSpeech: n\n    score: 3\n-   id: "));
        assert!(yaml.ends_with("    partOfSpeech: null\n    score: 0.5\n"));
        assert_eq!(render_yaml(&empty()).unwrap(), "[]\n");
    }

    #[test]
    fn test_yaml_output_parses_back() {
        let result = sample();
        let yaml = render_yaml(&result).unwrap();
        let parsed: Vec<std::collections::BTreeMap<String, serde_yaml::Value>> =
            serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1]["id"], serde_yaml::Value::from("s2, \"quoted\""));

        let multiline = QueryResult {
            columns: vec!["note".into()],
            rows: vec![Row::new(vec![("note".into(), Value::Text("one\ntwo".into()))])],
        };
        let yaml = render_yaml(&multiline).unwrap();
        let parsed: Vec<std::collections::BTreeMap<String, String>> =
            serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed[0]["note"], "one\ntwo");
    }

    #[test]
    fn test_table_has_header_and_rows() {
        let table = render_table(&sample(), false);
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[1].contains("id") && lines[1].contains("partOfSpeech"));
        assert!(table.contains("s1"));
        assert!(table.ends_with('\n'));
        // all lines of the grid have the same width
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }

    #[test]
    fn test_empty_table_prints_header_only() {
        let table = render_table(&empty(), false);
        assert!(table.contains("id"));
        assert!(table.contains("partOfSpeech"));
        assert!(table.lines().all(|line| !line.contains("s1")));
    }

    #[test]
    fn test_format_names() {
        assert_eq!("yaml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!(OutputFormat::Csv.to_string(), "csv");
        assert!(matches!(
            "xml".parse::<OutputFormat>(),
            Err(LmfError::InvalidArgument(_))
        ));
        assert!(render(&sample(), OutputFormat::Raw, false).is_err());
    }
}
