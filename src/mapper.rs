//! Maps LMF XML start-tags to SQL insert statements.
//!
//! Each recognized element yields exactly one row. Child elements take their
//! parent reference from the innermost open ancestor (the last entry of the
//! ancestor slice). Missing attributes become SQL `NULL`; unknown elements are
//! ignored.

use crate::models::Node;
use std::fmt;

/// Tables filled by the importer, in schema order.
pub const TABLES: [&str; 10] = [
    "Lexicon",
    "LexicalEntry",
    "Lemma",
    "Sense",
    "Form",
    "SyntacticalBehaviour",
    "Synset",
    "Definition",
    "ILIDefinition",
    "SynsetRelation",
];

/// Typed form of one `INSERT` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
    pub table: &'static str,
    pub columns: Vec<(&'static str, Option<String>)>,
}

impl Insert {
    fn new(table: &'static str) -> Self {
        Insert {
            table,
            columns: Vec::new(),
        }
    }

    fn column(mut self, name: &'static str, value: Option<&str>) -> Self {
        self.columns.push((name, value.map(str::to_string)));
        self
    }

    /// Value bound to a column, `None` if the column is unknown or NULL.
    pub fn value(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| *name == column)
            .and_then(|(_, value)| value.as_deref())
    }
}

impl fmt::Display for Insert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INSERT INTO {} (", self.table)?;
        for (i, (name, _)) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
        }
        f.write_str(") VALUES (")?;
        for (i, (_, value)) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match value {
                Some(v) => write!(f, "'{}'", v.replace('\'', "''"))?,
                None => f.write_str("NULL")?,
            }
        }
        f.write_str(");")
    }
}

/// Maps one start-tag to its insert statement.
///
/// `ancestors` holds the currently open enclosing elements, outermost first.
pub fn map_node(node: &Node, ancestors: &[Node]) -> Option<Insert> {
    let parent_id = ancestors.last().and_then(|parent| parent.attr("id"));
    let insert = match node.name.as_str() {
        "Lexicon" => Insert::new("Lexicon")
            .column("id", node.attr("id"))
            .column("label", node.attr("label"))
            .column("language", node.attr("language"))
            .column("email", node.attr("email"))
            .column("license", node.attr("license"))
            .column("version", node.attr("version")),
        "LexicalEntry" => Insert::new("LexicalEntry").column("id", node.attr("id")),
        "Lemma" => Insert::new("Lemma")
            .column("lexicalEntryId", parent_id)
            .column("writtenForm", node.attr("writtenForm"))
            .column("partOfSpeech", node.attr("partOfSpeech")),
        "Sense" => Insert::new("Sense")
            .column("lexicalEntryId", parent_id)
            .column("id", node.attr("id"))
            .column("synset", node.attr("synset")),
        "Form" => Insert::new("Form")
            .column("lexicalEntryId", parent_id)
            .column("writtenForm", node.attr("writtenForm")),
        "SyntacticalBehaviour" => Insert::new("SyntacticalBehaviour")
            .column("lexicalEntryId", parent_id)
            .column("subcategorizationFrame", node.attr("subcategorizationFrame")),
        "Synset" => Insert::new("Synset")
            .column("id", node.attr("id"))
            .column("partOfSpeech", node.attr("partOfSpeech")),
        "Definition" => Insert::new("Definition")
            .column("synsetId", parent_id)
            .column("language", node.attr("language"))
            .column("sourceSense", node.attr("sourceSense")),
        "ILIDefinition" => Insert::new("ILIDefinition")
            .column("synsetId", parent_id)
            .column("status", node.attr("status"))
            .column("note", node.attr("note"))
            .column("confidenceScore", node.attr("confidenceScore")),
        "SynsetRelation" => Insert::new("SynsetRelation")
            .column("synsetId", parent_id)
            .column("target", node.attr("target"))
            .column("relType", node.attr("relType")),
        _ => return None,
    };
    Some(insert)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lemma_takes_entry_id_from_innermost_ancestor() {
        let ancestors = vec![
            Node::new("LexicalResource"),
            Node::new("Lexicon").with_attr("id", "lex"),
            Node::new("LexicalEntry").with_attr("id", "w1"),
        ];
        let lemma = Node::new("Lemma")
            .with_attr("writtenForm", "run")
            .with_attr("partOfSpeech", "v");
        let insert = map_node(&lemma, &ancestors).unwrap();
        assert_eq!(insert.table, "Lemma");
        assert_eq!(insert.value("lexicalEntryId"), Some("w1"));
        assert_eq!(
            insert.to_string(),
            "INSERT INTO Lemma (lexicalEntryId, writtenForm, partOfSpeech) VALUES ('w1', 'run', 'v');"
        );
    }

    #[test]
    fn test_missing_attributes_become_null() {
        let lexicon = Node::new("Lexicon").with_attr("id", "x");
        let insert = map_node(&lexicon, &[]).unwrap();
        assert_eq!(
            insert.to_string(),
            "INSERT INTO Lexicon (id, label, language, email, license, version) \
             VALUES ('x', NULL, NULL, NULL, NULL, NULL);"
        );
    }

    #[test]
    fn test_child_without_parent_gets_null_reference() {
        let def = Node::new("Definition").with_attr("language", "en");
        let insert = map_node(&def, &[]).unwrap();
        assert_eq!(insert.value("synsetId"), None);
        assert!(insert.to_string().starts_with("INSERT INTO Definition (synsetId, language, sourceSense) VALUES (NULL, 'en', NULL)"));
    }

    #[test]
    fn test_unknown_element_is_ignored() {
        assert_eq!(map_node(&Node::new("Comment"), &[]), None);
        assert_eq!(map_node(&Node::new("Example"), &[]), None);
    }

    #[test]
    fn test_quotes_are_escaped() {
        let form = Node::new("Form").with_attr("writtenForm", "o'clock");
        let entry = Node::new("LexicalEntry").with_attr("id", "w'2");
        let insert = map_node(&form, &[entry]).unwrap();
        assert_eq!(
            insert.to_string(),
            "INSERT INTO Form (lexicalEntryId, writtenForm) VALUES ('w''2', 'o''clock');"
        );
    }

    #[test]
    fn test_synset_children() {
        let synset = Node::new("Synset")
            .with_attr("id", "s1")
            .with_attr("partOfSpeech", "n");
        let relation = Node::new("SynsetRelation")
            .with_attr("target", "s2")
            .with_attr("relType", "hypernym");
        let ili = Node::new("ILIDefinition").with_attr("confidenceScore", "1.0");

        let rel = map_node(&relation, std::slice::from_ref(&synset)).unwrap();
        assert_eq!(rel.value("synsetId"), Some("s1"));
        assert_eq!(rel.value("relType"), Some("hypernym"));

        let ili = map_node(&ili, std::slice::from_ref(&synset)).unwrap();
        assert_eq!(ili.value("synsetId"), Some("s1"));
        assert_eq!(ili.value("status"), None);
        assert_eq!(ili.value("confidenceScore"), Some("1.0"));
    }

    #[test]
    fn test_every_table_is_mapped() {
        for table in TABLES {
            let insert = map_node(&Node::new(table), &[]).unwrap();
            assert_eq!(insert.table, table);
        }
    }
}
