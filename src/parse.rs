//! Streaming XML adapter over three interchangeable parser back-ends.
//!
//! Back-ends only tokenize tags and report raw attribute values. The adapter
//! decodes entities, keeps the stack of open ancestor elements and hands each
//! event to a [`NodeHandler`] together with the current ancestors.

mod easysax;
mod sax;
mod saxophone;

use crate::error::{LmfError, Result};
use crate::models::Node;
use log::debug;
use quick_xml::escape::resolve_xml_entity;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Selects the tokenizer used to read the XML document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum ParserKind {
    /// Strict: checks end-tag names, attribute syntax and unclosed elements.
    #[default]
    Sax,
    /// Lenient: strips the DOCTYPE and normalizes attribute spacing first.
    Saxophone,
    /// Fast non-validating tag scanner; only unterminated markup is an error.
    #[value(name = "easysax")]
    EasySax,
}

impl ParserKind {
    pub const ALL: [ParserKind; 3] = [ParserKind::Sax, ParserKind::Saxophone, ParserKind::EasySax];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParserKind::Sax => "sax",
            ParserKind::Saxophone => "saxophone",
            ParserKind::EasySax => "easysax",
        }
    }
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParserKind {
    type Err = LmfError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sax" => Ok(ParserKind::Sax),
            "saxophone" => Ok(ParserKind::Saxophone),
            "easysax" => Ok(ParserKind::EasySax),
            _ => Err(LmfError::InvalidArgument(format!("invalid parser \"{}\"", s))),
        }
    }
}

/// Receives the decoded event stream of one document.
///
/// `ancestors` lists the enclosing open elements, outermost first. For
/// `on_open` it does not include the element being opened; for `on_close` the
/// closed element has already been removed.
pub trait NodeHandler {
    fn on_open(&mut self, node: &Node, ancestors: &[Node]) -> Result<()>;

    fn on_close(&mut self, _name: &str, _ancestors: &[Node]) -> Result<()> {
        Ok(())
    }

    fn on_error(&mut self, _error: &LmfError) {}

    fn on_end(&mut self) {}
}

/// Raw tag events produced by a back-end.
pub(crate) trait TagSink {
    /// A start-tag with undecoded attribute values. Self-closing tags are
    /// reported as `open` directly followed by `close`.
    fn open(&mut self, name: &str, attributes: Vec<(String, String)>) -> Result<()>;

    fn close(&mut self, name: &str) -> Result<()>;
}

/// Parses whole documents with the chosen back-end.
#[derive(Debug, Clone, Copy)]
pub struct StreamingParser {
    kind: ParserKind,
    entity_passes: u32,
}

impl StreamingParser {
    /// `entity_passes` is the number of entity-decoding passes applied to every
    /// attribute value; 0 leaves values exactly as written in the document.
    pub fn new(kind: ParserKind, entity_passes: u32) -> Self {
        StreamingParser {
            kind,
            entity_passes,
        }
    }

    /// Emits all events of `xml` to `handler` in document order, then calls
    /// `on_end`. On malformed input `on_error` is called and the error returned;
    /// events already delivered are not retracted.
    pub fn parse<H: NodeHandler>(&self, xml: &str, handler: &mut H) -> Result<()> {
        debug!(
            "Parsing {} bytes of XML with the {} parser ({} entity pass(es))",
            xml.len(),
            self.kind,
            self.entity_passes
        );
        let mut adapter = Adapter {
            handler: &mut *handler,
            stack: Vec::new(),
            entity_passes: self.entity_passes,
        };
        let outcome = match self.kind {
            ParserKind::Sax => sax::parse(xml, &mut adapter),
            ParserKind::Saxophone => saxophone::parse(xml, &mut adapter),
            ParserKind::EasySax => easysax::parse(xml, &mut adapter),
        };
        match outcome {
            Ok(()) => {
                handler.on_end();
                Ok(())
            }
            Err(err) => {
                handler.on_error(&err);
                Err(err)
            }
        }
    }
}

struct Adapter<'h, H: NodeHandler> {
    handler: &'h mut H,
    stack: Vec<Node>,
    entity_passes: u32,
}

impl<H: NodeHandler> TagSink for Adapter<'_, H> {
    fn open(&mut self, name: &str, attributes: Vec<(String, String)>) -> Result<()> {
        let mut node = Node::new(name);
        for (key, value) in attributes {
            node.attributes
                .insert(key, decode_entities(&value, self.entity_passes));
        }
        self.handler.on_open(&node, &self.stack)?;
        self.stack.push(node);
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<()> {
        // Lenient back-ends may report a stray end-tag with nothing open.
        if self.stack.pop().is_some() {
            self.handler.on_close(name, &self.stack)?;
        }
        Ok(())
    }
}

/// Applies `passes` rounds of entity decoding. Each round expands the five
/// predefined XML entities and numeric character references; any other
/// reference (`&nbsp;`, `&eacute;`, ...) is kept as written.
pub fn decode_entities(value: &str, passes: u32) -> String {
    let mut decoded = value.to_string();
    for _ in 0..passes {
        let next = match decode_entity_references(&decoded) {
            Cow::Borrowed(_) => break,
            Cow::Owned(next) => next,
        };
        if next == decoded {
            break;
        }
        decoded = next;
    }
    decoded
}

static ENTITY_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9A-Fa-f]+|[A-Za-z_][A-Za-z0-9._-]*);").expect("valid regex")
});

fn decode_entity_references(value: &str) -> Cow<'_, str> {
    ENTITY_REFERENCE.replace_all(value, |caps: &Captures| {
        let reference = &caps[1];
        let decoded = match reference.strip_prefix('#') {
            Some(number) => char_reference(number).map(String::from),
            None => resolve_xml_entity(reference).map(String::from),
        };
        decoded.unwrap_or_else(|| caps[0].to_string())
    })
}

/// `number` is the part after `&#`, decimal or `x`-prefixed hexadecimal.
fn char_reference(number: &str) -> Option<char> {
    let code = match number.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => number.parse().ok()?,
    };
    if code == 0 {
        return None;
    }
    char::from_u32(code)
}

/// Closing sequence of markup that carries no element: comments, CDATA
/// sections, processing instructions and declarations.
pub(crate) fn skipped_markup_terminator(rest: &str) -> Option<&'static str> {
    if rest.starts_with("<!--") {
        Some("-->")
    } else if rest.starts_with("<![CDATA[") {
        Some("]]>")
    } else if rest.starts_with("<?") {
        Some("?>")
    } else if rest.starts_with("<!") {
        Some(">")
    } else {
        None
    }
}

/// Offset of the `>` closing the tag that starts `rest`, ignoring any `>`
/// inside quoted attribute values.
pub(crate) fn tag_end(rest: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in rest.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

static ATTRIBUTE_SPACING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z][A-Za-z-])(?:\s+=\s*|\s*=\s+)(["'])$"#).expect("valid regex")
});

/// Forces `=` adjacency between attribute names and their quoted values.
///
/// Only the unquoted parts of tags are rewritten. Text content, quoted values,
/// comments, CDATA sections and declarations are copied unchanged, as is any
/// markup that is never terminated.
pub(crate) fn normalize_attribute_spacing(xml: &str) -> String {
    let mut output = String::with_capacity(xml.len());
    let mut pos = 0;

    while let Some(offset) = xml[pos..].find('<') {
        let start = pos + offset;
        output.push_str(&xml[pos..start]);
        let rest = &xml[start..];

        let skipped = skipped_markup_terminator(rest);
        let end = match skipped {
            Some(terminator) => rest.find(terminator).map(|end| end + terminator.len()),
            None => tag_end(rest).map(|end| end + 1),
        };
        let Some(end) = end else {
            pos = start;
            break;
        };
        if skipped.is_some() {
            output.push_str(&rest[..end]);
        } else {
            normalize_tag(&rest[..end], &mut output);
        }
        pos = start + end;
    }
    output.push_str(&xml[pos..]);
    output
}

fn normalize_tag(tag: &str, output: &mut String) {
    let mut segment_start = 0;
    let mut quote: Option<char> = None;
    for (i, c) in tag.char_indices() {
        match quote {
            Some(q) if c == q => {
                output.push_str(&tag[segment_start..=i]);
                segment_start = i + 1;
                quote = None;
            }
            Some(_) => {}
            None if c == '"' || c == '\'' => {
                // The unquoted run ends with the opening quote of a value.
                output.push_str(&ATTRIBUTE_SPACING.replace(&tag[segment_start..=i], "${1}=${2}"));
                segment_start = i + 1;
                quote = Some(c);
            }
            None => {}
        }
    }
    output.push_str(&tag[segment_start..]);
}
