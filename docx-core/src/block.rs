//! The Block type: a single unit of document content in the IR.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Kind of a block-level node. `Other` carries the engine's own style name
/// for kinds we don't otherwise recognize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockType {
    Paragraph,
    Heading,
    ListItem,
    TableRow,
    Toc,
    Other(String),
}

impl Serialize for BlockType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BlockType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(BlockType::from(s.as_str()))
    }
}

impl BlockType {
    pub fn as_str(&self) -> &str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::Heading => "heading",
            BlockType::ListItem => "listItem",
            BlockType::TableRow => "tableRow",
            BlockType::Toc => "toc",
            BlockType::Other(s) => s.as_str(),
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for BlockType {
    fn from(s: &str) -> Self {
        match s {
            "paragraph" => BlockType::Paragraph,
            "heading" => BlockType::Heading,
            "listItem" => BlockType::ListItem,
            "tableRow" => BlockType::TableRow,
            "toc" => BlockType::Toc,
            other => BlockType::Other(other.to_string()),
        }
    }
}

/// A single block-level content unit, as emitted in the Document IR.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    pub seq_id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub level: Option<u32>,
    pub text: String,
    pub start_pos: usize,
    pub end_pos: usize,
    /// Present only when `text` was truncated by `maxTextLength`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_length: Option<usize>,
    /// Flags a TOC structure; consulted by the applicator to skip mutation.
    #[serde(default)]
    pub is_toc: bool,
    /// Engine-native paragraph/character style name, when exposed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_name: Option<String>,
}

impl Block {
    pub fn new(
        id: String,
        seq_id: String,
        block_type: BlockType,
        level: Option<u32>,
        text: String,
        start_pos: usize,
        end_pos: usize,
    ) -> Self {
        Block {
            id,
            seq_id,
            block_type,
            level,
            text,
            start_pos,
            end_pos,
            original_length: None,
            is_toc: false,
            style_name: None,
        }
    }

    /// Truncate `text` to `max_len` bytes (on a char boundary), recording
    /// `original_length` if truncation actually occurred.
    pub fn truncate_text(&mut self, max_len: usize) {
        if self.text.len() <= max_len {
            return;
        }
        let original_len = self.text.len();
        let mut cut = max_len;
        while cut > 0 && !self.text.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.truncate(cut);
        self.original_length = Some(original_len);
    }
}
