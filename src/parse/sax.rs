//! Strict back-end on top of the quick-xml pull reader.

use super::TagSink;
use crate::error::{LmfError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

pub(super) fn parse(xml: &str, sink: &mut dyn TagSink) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = true;

    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let (name, attributes) = read_tag(e, true)?;
                sink.open(&name, attributes)?;
                depth += 1;
            }
            Ok(Event::Empty(ref e)) => {
                let (name, attributes) = read_tag(e, true)?;
                sink.open(&name, attributes)?;
                sink.close(&name)?;
            }
            Ok(Event::End(ref e)) => {
                let qname = e.name();
                sink.close(utf8(qname.as_ref())?)?;
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(LmfError::XmlParse(format!(
                    "{} (at byte {})",
                    e,
                    reader.error_position()
                )));
            }
            Ok(_) => {} // text, comments, declarations, DOCTYPE
        }
    }

    if depth > 0 {
        return Err(LmfError::XmlParse(format!(
            "unexpected end of document: {} element(s) still open",
            depth
        )));
    }
    Ok(())
}

/// Splits a start-tag into its name and raw attribute values.
///
/// With `strict` set, malformed attributes are an error; otherwise they are
/// skipped.
pub(super) fn read_tag(e: &BytesStart, strict: bool) -> Result<(String, Vec<(String, String)>)> {
    let name = utf8(e.name().as_ref())?.to_string();
    let mut attributes = Vec::new();
    let mut iter = e.attributes();
    iter.with_checks(strict);
    for attr in iter {
        let attr = match attr {
            Ok(attr) => attr,
            Err(err) if strict => {
                return Err(LmfError::XmlParse(format!(
                    "malformed attribute in <{}>: {}",
                    name, err
                )));
            }
            Err(_) => continue,
        };
        let key = utf8(attr.key.as_ref())?.to_string();
        let value = utf8(&attr.value)?.to_string();
        attributes.push((key, value));
    }
    Ok((name, attributes))
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| LmfError::XmlParse(format!("invalid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Tags(Vec<String>);

    impl TagSink for Tags {
        fn open(&mut self, name: &str, attributes: Vec<(String, String)>) -> Result<()> {
            self.0.push(format!("+{}{:?}", name, attributes));
            Ok(())
        }

        fn close(&mut self, name: &str) -> Result<()> {
            self.0.push(format!("-{}", name));
            Ok(())
        }
    }

    #[test]
    fn test_reports_raw_attribute_values() {
        let mut tags = Tags::default();
        parse(r#"<Form writtenForm="a&amp;b"/>"#, &mut tags).unwrap();
        assert_eq!(
            tags.0,
            vec![
                r#"+Form[("writtenForm", "a&amp;b")]"#.to_string(),
                "-Form".to_string()
            ]
        );
    }

    #[test]
    fn test_rejects_duplicate_attributes() {
        let mut tags = Tags::default();
        let outcome = parse(r#"<Synset id="a" id="b"/>"#, &mut tags);
        assert!(matches!(outcome, Err(LmfError::XmlParse(_))));
    }
}
