//! Lenient back-end: pre-normalizes the document, then reads it with quick-xml
//! without end-tag name checks.

use super::sax::read_tag;
use super::{TagSink, normalize_attribute_spacing};
use crate::error::{LmfError, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use std::sync::LazyLock;

static DOCTYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!DOCTYPE[^>]*>").expect("valid regex"));

pub(super) fn parse(xml: &str, sink: &mut dyn TagSink) -> Result<()> {
    let xml = DOCTYPE.replace(xml, "");
    let xml = normalize_attribute_spacing(&xml);

    let mut reader = Reader::from_str(&xml);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let (name, attributes) = read_tag(e, false)?;
                sink.open(&name, attributes)?;
            }
            Ok(Event::Empty(ref e)) => {
                let (name, attributes) = read_tag(e, false)?;
                sink.open(&name, attributes)?;
                sink.close(&name)?;
            }
            Ok(Event::End(ref e)) => {
                let qname = e.name();
                sink.close(&String::from_utf8_lossy(qname.as_ref()))?;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(LmfError::XmlParse(format!(
                    "{} (at byte {})",
                    e,
                    reader.error_position()
                )));
            }
            Ok(_) => {}
        }
    }
    Ok(())
}
