//! Fast non-validating tag scanner.
//!
//! Walks the document from `<` to `>` without building any tree or checking
//! nesting. Comments, CDATA sections, processing instructions and declarations
//! are skipped; the only error is markup that is never terminated.

use super::{TagSink, normalize_attribute_spacing, skipped_markup_terminator, tag_end};
use crate::error::{LmfError, Result};
use regex::Regex;
use std::sync::LazyLock;

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s=/"']+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

pub(super) fn parse(xml: &str, sink: &mut dyn TagSink) -> Result<()> {
    let xml = normalize_attribute_spacing(xml);
    let mut pos = 0;

    while let Some(offset) = xml[pos..].find('<') {
        let start = pos + offset;
        let rest = &xml[start..];

        if let Some(terminator) = skipped_markup_terminator(rest) {
            let end = rest
                .find(terminator)
                .ok_or_else(|| unterminated(start))?;
            pos = start + end + terminator.len();
            continue;
        }

        let end = tag_end(rest).ok_or_else(|| unterminated(start))?;
        let tag = &rest[1..end];
        pos = start + end + 1;

        if let Some(name) = tag.strip_prefix('/') {
            sink.close(name.trim())?;
            continue;
        }

        let (body, self_closing) = match tag.strip_suffix('/') {
            Some(body) => (body, true),
            None => (tag, false),
        };
        let name_end = body
            .find(|c: char| c.is_whitespace())
            .unwrap_or(body.len());
        let name = &body[..name_end];
        if name.is_empty() {
            return Err(LmfError::XmlParse(format!(
                "missing element name (at byte {})",
                start
            )));
        }

        let attributes = ATTRIBUTE
            .captures_iter(&body[name_end..])
            .map(|caps| {
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .map_or("", |m| m.as_str());
                (caps[1].to_string(), value.to_string())
            })
            .collect();
        sink.open(name, attributes)?;
        if self_closing {
            sink.close(name)?;
        }
    }
    Ok(())
}

fn unterminated(position: usize) -> LmfError {
    LmfError::XmlParse(format!("unterminated markup (at byte {})", position))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Tags(Vec<String>);

    impl TagSink for Tags {
        fn open(&mut self, name: &str, attributes: Vec<(String, String)>) -> Result<()> {
            let attrs: Vec<String> = attributes
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            self.0.push(format!("+{}({})", name, attrs.join(",")));
            Ok(())
        }

        fn close(&mut self, name: &str) -> Result<()> {
            self.0.push(format!("-{}", name));
            Ok(())
        }
    }

    #[test]
    fn test_quoted_gt_does_not_end_tag() {
        let mut tags = Tags::default();
        parse(r#"<ILIDefinition note="a > b" status='ok'/>"#, &mut tags).unwrap();
        assert_eq!(tags.0, vec!["+ILIDefinition(note=a > b,status=ok)", "-ILIDefinition"]);
    }

    #[test]
    fn test_skips_comments_and_cdata() {
        let mut tags = Tags::default();
        let xml = "<?xml version=\"1.0\"?><!-- <Synset/> --><Synset><![CDATA[<Lemma/>]]></Synset >";
        parse(xml, &mut tags).unwrap();
        assert_eq!(tags.0, vec!["+Synset()", "-Synset"]);
    }

    #[test]
    fn test_unterminated_comment_is_an_error() {
        let mut tags = Tags::default();
        assert!(parse("<Synset><!-- never closed", &mut tags).is_err());
    }
}
