//! Content blocks
//!
//! A document body is an ordered sequence of [`Block`]s. On the wire a block
//! is a flat JSON object keyed by `type` (`core/heading`, `core/paragraph`,
//! ...); unknown types are kept verbatim as [`Block::Other`], every field
//! other than `type` and `content` riding along in its `extra` map.

use crate::hash::CanonicalHasher;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire tag for heading blocks
pub const HEADING: &str = "core/heading";
/// Wire tag for paragraph blocks
pub const PARAGRAPH: &str = "core/paragraph";
/// Wire tag for list blocks
pub const LIST: &str = "core/list";
/// Wire tag for image blocks
pub const IMAGE: &str = "core/image";
/// Wire tag for code blocks
pub const CODE: &str = "core/code";
/// Wire tag for quote blocks
pub const QUOTE: &str = "core/quote";

/// Default heading level when none is given
pub const DEFAULT_HEADING_LEVEL: u8 = 2;

/// A single content block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawBlock", into = "RawBlock")]
pub enum Block {
    /// Section heading, level 1..=6
    Heading {
        /// Heading level
        level: u8,
        /// Heading text
        content: String,
    },
    /// Plain paragraph
    Paragraph {
        /// Paragraph text
        content: String,
    },
    /// Bulleted or numbered list
    List {
        /// Numbered rather than bulleted
        ordered: bool,
        /// Item texts
        items: Vec<String>,
    },
    /// Image reference
    Image {
        /// Source URL
        url: Option<String>,
        /// Alternative text (`altText` on the wire)
        alt_text: Option<String>,
    },
    /// Preformatted code
    Code {
        /// Source text
        content: String,
    },
    /// Block quote, may span lines
    Quote {
        /// Quoted text
        content: String,
    },
    /// Any block type this crate does not model
    Other {
        /// Wire `type` tag
        block_type: String,
        /// Text content, if any
        content: Option<String>,
        /// Remaining wire fields, unchanged
        extra: Map<String, Value>,
    },
}

impl Block {
    /// Heading block
    #[must_use]
    pub fn heading(level: u8, content: impl Into<String>) -> Self {
        Self::Heading {
            level: level.clamp(1, 6),
            content: content.into(),
        }
    }

    /// Paragraph block
    #[must_use]
    pub fn paragraph(content: impl Into<String>) -> Self {
        Self::Paragraph {
            content: content.into(),
        }
    }

    /// List block
    #[must_use]
    pub fn list<I, S>(ordered: bool, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List {
            ordered,
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    /// Wire type tag
    #[must_use]
    pub fn type_tag(&self) -> &str {
        match self {
            Self::Heading { .. } => HEADING,
            Self::Paragraph { .. } => PARAGRAPH,
            Self::List { .. } => LIST,
            Self::Image { .. } => IMAGE,
            Self::Code { .. } => CODE,
            Self::Quote { .. } => QUOTE,
            Self::Other { block_type, .. } => block_type,
        }
    }

    /// Heading text, if this is a non-empty heading
    #[must_use]
    pub fn heading_text(&self) -> Option<&str> {
        match self {
            Self::Heading { content, .. } if !content.is_empty() => Some(content),
            _ => None,
        }
    }

    /// Plain text contributed to the document's core text
    #[must_use]
    pub fn plain_text(&self) -> Option<String> {
        match self {
            Self::Heading { content, .. }
            | Self::Paragraph { content }
            | Self::Code { content }
            | Self::Quote { content } => Some(content.clone()),
            Self::List { items, .. } if !items.is_empty() => Some(items.join("\n")),
            Self::Image { alt_text, .. } => alt_text.clone(),
            Self::Other { content, .. } => content.clone(),
            Self::List { .. } => None,
        }
    }

    /// Feed the content-relevant fields into a canonical hasher
    pub(crate) fn hash_into(&self, hasher: &mut CanonicalHasher) {
        hasher.field(0x10, self.type_tag());
        match self {
            Self::Heading { level, content } => {
                hasher.number(0x11, u64::from(*level)).field(0x12, content);
            }
            Self::Paragraph { content } | Self::Code { content } | Self::Quote { content } => {
                hasher.field(0x12, content);
            }
            Self::List { ordered, items } => {
                hasher
                    .number(0x13, u64::from(*ordered))
                    .number(0x14, items.len() as u64);
                for item in items {
                    hasher.field(0x15, item);
                }
            }
            Self::Image { url, alt_text } => {
                hasher
                    .opt_field(0x16, url.as_deref())
                    .opt_field(0x17, alt_text.as_deref());
            }
            Self::Other { content, extra, .. } => {
                hasher.opt_field(0x12, content.as_deref());
                let mut keys: Vec<&String> = extra.keys().collect();
                keys.sort();
                for key in keys {
                    hasher.field(0x18, key).field(0x19, &extra[key.as_str()].to_string());
                }
            }
        }
    }
}

/// Flat wire shape shared by every block type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawBlock {
    #[serde(rename = "type", default)]
    block_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    items: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    ordered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(rename = "altText", default, skip_serializing_if = "Option::is_none")]
    alt_text: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RawBlock> for Block {
    fn from(raw: RawBlock) -> Self {
        let content = raw.content.unwrap_or_default();
        match raw.block_type.as_str() {
            HEADING => Self::Heading {
                // clamp(1, 6) keeps the value in u8 range
                level: raw
                    .level
                    .map_or(DEFAULT_HEADING_LEVEL, |l| l.clamp(1, 6) as u8),
                content,
            },
            PARAGRAPH => Self::Paragraph { content },
            LIST => Self::List {
                ordered: raw.ordered,
                items: raw.items,
            },
            IMAGE => Self::Image {
                url: raw.url,
                alt_text: raw.alt_text,
            },
            CODE => Self::Code { content },
            QUOTE => Self::Quote { content },
            _ => {
                // fields parsed for modelled types go back where they came from
                let mut extra = raw.extra;
                if let Some(level) = raw.level {
                    extra.insert("level".to_string(), Value::from(level));
                }
                if !raw.items.is_empty() {
                    extra.insert("items".to_string(), Value::from(raw.items));
                }
                if raw.ordered {
                    extra.insert("ordered".to_string(), Value::Bool(true));
                }
                if let Some(url) = raw.url {
                    extra.insert("url".to_string(), Value::String(url));
                }
                if let Some(alt) = raw.alt_text {
                    extra.insert("altText".to_string(), Value::String(alt));
                }
                Self::Other {
                    block_type: if raw.block_type.is_empty() {
                        "unknown".to_string()
                    } else {
                        raw.block_type
                    },
                    content: Some(content).filter(|c| !c.is_empty()),
                    extra,
                }
            }
        }
    }
}

impl From<Block> for RawBlock {
    fn from(block: Block) -> Self {
        let block_type = block.type_tag().to_string();
        match block {
            Block::Heading { level, content } => Self {
                block_type,
                level: Some(i64::from(level)),
                content: Some(content),
                ..Self::default()
            },
            Block::Paragraph { content } | Block::Code { content } | Block::Quote { content } => {
                Self {
                    block_type,
                    content: Some(content),
                    ..Self::default()
                }
            }
            Block::List { ordered, items } => Self {
                block_type,
                items,
                ordered,
                ..Self::default()
            },
            Block::Image { url, alt_text } => Self {
                block_type,
                url,
                alt_text,
                ..Self::default()
            },
            Block::Other { content, extra, .. } => Self {
                block_type,
                content,
                extra,
                ..Self::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn heading_parses_with_level() {
        let block: Block =
            serde_json::from_value(json!({"type": "core/heading", "level": 3, "content": "Intro"}))
                .unwrap();
        assert_eq!(block, Block::heading(3, "Intro"));
    }

    #[test]
    fn heading_level_defaults_and_clamps() {
        let default: Block =
            serde_json::from_value(json!({"type": "core/heading", "content": "H"})).unwrap();
        assert_eq!(default, Block::heading(2, "H"));

        let deep: Block =
            serde_json::from_value(json!({"type": "core/heading", "level": 9, "content": "H"}))
                .unwrap();
        assert_eq!(deep, Block::heading(6, "H"));
    }

    #[test]
    fn image_uses_camel_case_alt_text() {
        let block: Block = serde_json::from_value(
            json!({"type": "core/image", "url": "https://x/y.png", "altText": "pic"}),
        )
        .unwrap();
        assert_eq!(
            block,
            Block::Image {
                url: Some("https://x/y.png".into()),
                alt_text: Some("pic".into())
            }
        );
        let back = serde_json::to_value(&block).unwrap();
        assert_eq!(back["altText"], "pic");
    }

    #[test]
    fn unknown_type_is_preserved() {
        let block: Block =
            serde_json::from_value(json!({"type": "acme/widget", "content": "raw"})).unwrap();
        assert_eq!(block.type_tag(), "acme/widget");
        assert_eq!(block.plain_text().as_deref(), Some("raw"));
    }

    #[test]
    fn unknown_type_keeps_every_field() {
        let wire = json!({
            "type": "acme/gallery",
            "content": "caption",
            "items": ["a.png", "b.png"],
            "url": "https://x/g",
            "columns": 3,
            "attrs": { "align": "wide" }
        });
        let block: Block = serde_json::from_value(wire.clone()).unwrap();
        assert_eq!(serde_json::to_value(&block).unwrap(), wire);
    }

    #[test]
    fn unknown_extra_fields_change_the_hash() {
        let hash = |columns: i64| {
            let block: Block =
                serde_json::from_value(json!({ "type": "acme/gallery", "columns": columns }))
                    .unwrap();
            let mut hasher = CanonicalHasher::new();
            block.hash_into(&mut hasher);
            hasher.finish()
        };
        assert_ne!(hash(2), hash(3));
    }

    #[test]
    fn missing_type_becomes_unknown() {
        let block: Block = serde_json::from_value(json!({"content": "loose"})).unwrap();
        assert_eq!(block.type_tag(), "unknown");
    }

    #[test]
    fn list_serializes_without_empty_fields() {
        let block = Block::list(false, ["a", "b"]);
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value, json!({"type": "core/list", "items": ["a", "b"]}));
    }
}
