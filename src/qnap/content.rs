//! Note content: the escape protocol and the rich-text document tree
//!
//! The `content` field of `noteInfo.json` is a JSON document serialized into
//! a string of the outer JSON record. Real backslashes in it would be
//! collapsed by the outer parse, so decoding runs in a fixed order:
//!
//! 1. every `\\` in the raw record becomes [`BACKSLASH_SENTINEL`]
//! 2. the record is parsed as JSON
//! 3. in the content string `\"` becomes `"` and the sentinel becomes `\`
//! 4. the content string is parsed as the document tree
//!
//! Plain text fields of the record (note and tag names) only need the
//! sentinel turned back into `\` after step 2.
//!
//! The protocol breaks for content that legitimately contains the sentinel.
//! The steps live in [`protect_backslashes`], [`restore_backslashes`] and
//! [`unescape_content`] and nowhere else.

use serde::{Deserialize, Deserializer};

use super::errors::{QnapError, Result};

/// Token standing in for a literal backslash between the two parses
pub const BACKSLASH_SENTINEL: &str = "~#~";

/// Replace every double backslash of the raw record with the sentinel
pub fn protect_backslashes(raw: &str) -> String {
    raw.replace("\\\\", BACKSLASH_SENTINEL)
}

/// Turn sentinels in a plain text field of a protected record back into `\`
pub fn restore_backslashes(text: &str) -> String {
    text.replace(BACKSLASH_SENTINEL, "\\")
}

/// Undo the outer escaping of a content string taken from a protected record
pub fn unescape_content(content: &str) -> String {
    content
        .replace("\\\"", "\"")
        .replace(BACKSLASH_SENTINEL, "\\")
}

/// Parse the document tree held in a content string
pub fn decode_document(raw_content: &str) -> Result<Document> {
    let json = unescape_content(raw_content);
    serde_json::from_str(&json).map_err(|e| QnapError::MalformedContent(e.to_string()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Root of a note's rich text (`{"type": "doc", "content": [...]}`)
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Document {
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Vec<Node>,
}

/// Block-level node
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Paragraph {
        #[serde(default, deserialize_with = "null_as_default")]
        attrs: ParagraphStyle,
        #[serde(default, deserialize_with = "null_as_default")]
        content: Vec<Option<Inline>>,
    },
    Heading {
        #[serde(default, deserialize_with = "null_as_default")]
        attrs: HeadingAttrs,
        #[serde(default, deserialize_with = "null_as_default")]
        content: Vec<Option<Inline>>,
    },
    Table {
        #[serde(default, deserialize_with = "null_as_default")]
        content: Vec<TableRow>,
    },
    BulletList {
        #[serde(default, deserialize_with = "null_as_default")]
        content: Vec<ListItem>,
    },
    OrderedList {
        #[serde(default, deserialize_with = "null_as_default")]
        content: Vec<ListItem>,
    },
    CheckList {
        #[serde(default, deserialize_with = "null_as_default")]
        content: Vec<CheckListItem>,
    },
    Blockquote {
        #[serde(default, deserialize_with = "null_as_default")]
        content: Vec<Node>,
    },
    CodeBlock {
        #[serde(default, deserialize_with = "null_as_default")]
        content: Vec<Option<Inline>>,
    },
    HorizontalRule,
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ParagraphStyle {
    #[serde(default)]
    pub indent: Option<f64>,
    #[serde(default)]
    pub align: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct HeadingAttrs {
    #[serde(default)]
    pub level: Option<u8>,
}

impl HeadingAttrs {
    pub fn level(&self) -> usize {
        self.level.unwrap_or(1) as usize
    }
}

/// A table row; cells of type `table_cell` and `table_header` alike
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TableRow {
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TableCell {
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Vec<Node>,
}

/// `list_item` of a bullet or ordered list: a paragraph, optionally
/// followed by nested lists
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ListItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CheckListItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub attrs: CheckAttrs,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CheckAttrs {
    #[serde(default)]
    pub checked: Option<bool>,
}

/// Inline content of paragraphs, headings and code blocks
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inline {
    Text {
        #[serde(default)]
        text: String,
        #[serde(default, deserialize_with = "null_as_default")]
        marks: Vec<Mark>,
    },
    File {
        #[serde(default, deserialize_with = "null_as_default")]
        attrs: FileAttrs,
    },
    Image {
        #[serde(default, deserialize_with = "null_as_default")]
        attrs: FileAttrs,
    },
    HardBreak,
    #[serde(other)]
    Unsupported,
}

/// Reference to a resource stored next to the note in the archive
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct FileAttrs {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl FileAttrs {
    /// Last path segment of `src`, the file name inside the archive
    pub fn filename(&self) -> &str {
        self.src.rsplit('/').next().unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_else(|| self.filename())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mark {
    #[serde(rename = "em")]
    Emphasis,
    Strong,
    Superscript,
    Subscript,
    Underline,
    #[serde(alias = "strike")]
    Strikethrough,
    Link {
        #[serde(default, deserialize_with = "null_as_default")]
        attrs: LinkAttrs,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct LinkAttrs {
    #[serde(default)]
    pub href: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qnap::{Location, Note};

    /// Produce a `noteInfo.json` record the way the exporter does: the
    /// document is serialized, then embedded as a string in the outer record.
    fn encode_note_info(document: &serde_json::Value) -> Vec<u8> {
        serde_json::json!({
            "note_name": "Escaped",
            "content": document.to_string(),
            "tag_list": []
        })
        .to_string()
        .into_bytes()
    }

    fn paragraph(text: &str) -> serde_json::Value {
        serde_json::json!({
            "type": "doc",
            "content": [{
                "type": "paragraph",
                "content": [{ "type": "text", "text": text }]
            }]
        })
    }

    fn first_text(document: &Document) -> &str {
        match &document.content[0] {
            Node::Paragraph { content, .. } => match content[0].as_ref().unwrap() {
                Inline::Text { text, .. } => text.as_str(),
                other => panic!("unexpected inline {:?}", other),
            },
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_escape_round_trip() {
        let samples = [
            r"C:\Users\noether",
            r#"she said "hello""#,
            r#"\"quoted backslash\""#,
            r"\\server\share",
            r"trailing backslash \",
            r#"mixed \n "and" \t literal"#,
            "unicode \u{00fc}ber \\ \"",
        ];

        for sample in samples {
            let raw = encode_note_info(&paragraph(sample));
            let note = Note::from_note_info(Location::new("1/1/1"), &raw).unwrap();
            let document = note.document().unwrap();
            assert_eq!(first_text(&document), sample);
        }
    }

    #[test]
    fn test_sentinel_helpers() {
        assert_eq!(protect_backslashes(r"a\\b\\\\c"), "a~#~b~#~~#~c");
        assert_eq!(unescape_content(r#"a~#~b \"q\""#), r#"a\b "q""#);
    }

    #[test]
    fn test_missing_type_is_malformed() {
        let err = decode_document(r#"{"content":[{"content":[]}]}"#).unwrap_err();
        assert!(matches!(err, QnapError::MalformedContent(_)));

        let err = decode_document("{not json").unwrap_err();
        assert!(matches!(err, QnapError::MalformedContent(_)));
    }

    #[test]
    fn test_unknown_types_are_tolerated() {
        let document = decode_document(
            r#"{"type":"doc","content":[
                {"type":"mermaid_diagram","content":[{"type":"text","text":"x"}]},
                {"type":"paragraph","content":[
                    null,
                    {"type":"emoji","attrs":{"name":"smile"}},
                    {"type":"text","text":"t","marks":[{"type":"highlight"}]}
                ]}
            ]}"#,
        )
        .unwrap();

        assert_eq!(document.content[0], Node::Unsupported);
        match &document.content[1] {
            Node::Paragraph { content, .. } => {
                assert!(content[0].is_none());
                assert_eq!(content[1], Some(Inline::Unsupported));
                assert_eq!(
                    content[2],
                    Some(Inline::Text {
                        text: "t".to_string(),
                        marks: vec![Mark::Unsupported],
                    })
                );
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_node_taxonomy() {
        let document = decode_document(
            r#"{"type":"doc","content":[
                {"type":"heading","attrs":{"level":2},"content":[{"type":"text","text":"H"}]},
                {"type":"paragraph","attrs":{"indent":2,"align":"center"},"content":null},
                {"type":"check_list","content":[
                    {"type":"check_list_item","attrs":{"checked":true},"content":[]}
                ]},
                {"type":"horizontal_rule"},
                {"type":"code_block","attrs":{"language":null},"content":[{"type":"text","text":"x"}]},
                {"type":"paragraph","content":[
                    {"type":"text","text":"s","marks":[{"type":"strike"},{"type":"em"},{"type":"link","attrs":{"href":"u"}}]},
                    {"type":"image","attrs":{"src":"./image/abc.png","title":"Plot"}},
                    {"type":"hard_break"}
                ]}
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            document.content[0],
            Node::Heading {
                attrs: HeadingAttrs { level: Some(2) },
                content: vec![Some(Inline::Text {
                    text: "H".to_string(),
                    marks: vec![]
                })],
            }
        );
        assert_eq!(
            document.content[1],
            Node::Paragraph {
                attrs: ParagraphStyle {
                    indent: Some(2.0),
                    align: Some("center".to_string())
                },
                content: vec![],
            }
        );
        match &document.content[2] {
            Node::CheckList { content } => assert_eq!(content[0].attrs.checked, Some(true)),
            other => panic!("unexpected node {:?}", other),
        }
        assert_eq!(document.content[3], Node::HorizontalRule);
        assert!(matches!(document.content[4], Node::CodeBlock { .. }));

        match &document.content[5] {
            Node::Paragraph { content, .. } => {
                assert_eq!(
                    content[0],
                    Some(Inline::Text {
                        text: "s".to_string(),
                        marks: vec![
                            Mark::Strikethrough,
                            Mark::Emphasis,
                            Mark::Link {
                                attrs: LinkAttrs {
                                    href: "u".to_string()
                                }
                            },
                        ],
                    })
                );
                match content[1].as_ref().unwrap() {
                    Inline::Image { attrs } => {
                        assert_eq!(attrs.filename(), "abc.png");
                        assert_eq!(attrs.title(), "Plot");
                    }
                    other => panic!("unexpected inline {:?}", other),
                }
                assert_eq!(content[2], Some(Inline::HardBreak));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_file_attrs_without_title() {
        let attrs = FileAttrs {
            src: "attachment/report.pdf".to_string(),
            title: None,
        };
        assert_eq!(attrs.filename(), "report.pdf");
        assert_eq!(attrs.title(), "report.pdf");
    }
}
