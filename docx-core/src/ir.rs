//! The Document IR and its extractor: walks a loaded `DocxEngine`'s block
//! tree once (plus one O(n) defined-terms pass) and produces the
//! JSON-serializable snapshot the validator, dry-run reporter, and `/v1/read`
//! all consume.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockType};
use crate::engine::EngineBlock;
use crate::ids::BlockIdRegistry;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub filename: String,
    pub generated: String,
    pub version: String,
    pub format: String,
    pub block_count: usize,
    pub ids_assigned: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineNode {
    pub id: String,
    pub seq_id: String,
    pub title: String,
    pub level: u32,
    pub children: Vec<OutlineNode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinedTermEntry {
    pub defining_block_seq_id: String,
    pub usage_block_seq_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentIr {
    pub metadata: DocumentMetadata,
    pub blocks: Vec<Block>,
    pub outline: Vec<OutlineNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defined_terms: Option<HashMap<String, DefinedTermEntry>>,
    pub id_mapping: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub format: String,
    pub include_defined_terms: bool,
    pub include_outline: bool,
    pub max_text_length: Option<usize>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            format: "docx".to_string(),
            include_defined_terms: true,
            include_outline: true,
            max_text_length: None,
        }
    }
}

/// Extract a Document IR from the blocks an already-loaded engine reports.
///
/// Single traversal to build blocks/outline/id-mapping, plus one additional
/// O(n) pass over block text for defined terms when requested.
pub fn extract(
    engine_blocks: &[EngineBlock],
    filename: &str,
    engine_version: Option<String>,
    options: &ExtractOptions,
    generated_at: &str,
) -> DocumentIr {
    let mut registry = BlockIdRegistry::new();
    let mut blocks = Vec::with_capacity(engine_blocks.len());
    let mut outline_builder = OutlineBuilder::new();

    for eb in engine_blocks {
        let seq_id = registry.register_existing(&eb.id);
        let mut block = Block::new(
            eb.id.clone(),
            seq_id.clone(),
            BlockType::from(eb.block_type.as_str()),
            eb.level,
            eb.text.clone(),
            eb.start_pos,
            eb.end_pos,
        );
        block.is_toc = eb.is_toc;
        block.style_name = eb.style_name.clone();
        if let Some(max_len) = options.max_text_length {
            block.truncate_text(max_len);
        }

        if options.include_outline && eb.block_type == "heading" {
            let level = eb.level.unwrap_or(1);
            outline_builder.push(OutlineNode {
                id: eb.id.clone(),
                seq_id: seq_id.clone(),
                title: eb.text.clone(),
                level,
                children: Vec::new(),
            });
        }

        blocks.push(block);
    }
    let outline = outline_builder.finish();

    let defined_terms = if options.include_defined_terms {
        Some(scan_defined_terms(&blocks))
    } else {
        None
    };

    let id_mapping = registry.export();
    let metadata = DocumentMetadata {
        filename: filename.to_string(),
        generated: generated_at.to_string(),
        version: "1".to_string(),
        format: options.format.clone(),
        block_count: blocks.len(),
        ids_assigned: registry.len(),
        engine_version,
    };

    DocumentIr {
        metadata,
        blocks,
        outline,
        defined_terms,
        id_mapping,
    }
}

/// Builds the outline tree from a stream of heading events without
/// self-referential pointers: `stack` holds the chain of currently-open
/// ancestors (owned, not borrowed); a new heading at level `L` pops and
/// finalizes every open ancestor at level >= `L` before pushing itself.
struct OutlineBuilder {
    stack: Vec<OutlineNode>,
    roots: Vec<OutlineNode>,
}

impl OutlineBuilder {
    fn new() -> Self {
        OutlineBuilder {
            stack: Vec::new(),
            roots: Vec::new(),
        }
    }

    fn push(&mut self, node: OutlineNode) {
        while let Some(top) = self.stack.last() {
            if top.level >= node.level {
                let finished = self.stack.pop().unwrap();
                self.attach(finished);
            } else {
                break;
            }
        }
        self.stack.push(node);
    }

    fn attach(&mut self, node: OutlineNode) {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
        } else {
            self.roots.push(node);
        }
    }

    fn finish(mut self) -> Vec<OutlineNode> {
        while let Some(node) = self.stack.pop() {
            if let Some(parent) = self.stack.last_mut() {
                parent.children.push(node);
            } else {
                self.roots.push(node);
            }
        }
        self.roots
    }
}

/// Two-pass O(n) defined-terms scan.
///
/// Pass one builds an inverted index from a normalized candidate term
/// spelling to the block that *defines* it, recognized via an explicit
/// `Term:` or quoted-then-parenthetical introduction pattern (e.g.
/// `"Effective Date" means ...` or `the Effective Date (the "Term")`).
/// Pass two walks all block text once more, recording usages of any indexed
/// term.
fn scan_defined_terms(blocks: &[Block]) -> HashMap<String, DefinedTermEntry> {
    let mut index: HashMap<String, String> = HashMap::new();

    for block in blocks {
        for candidate in find_definition_candidates(&block.text) {
            index
                .entry(normalize_term(&candidate))
                .or_insert_with(|| block.seq_id.clone());
        }
    }

    let mut terms: HashMap<String, DefinedTermEntry> = HashMap::new();
    for (normalized, defining_seq_id) in &index {
        terms.insert(
            normalized.clone(),
            DefinedTermEntry {
                defining_block_seq_id: defining_seq_id.clone(),
                usage_block_seq_ids: Vec::new(),
            },
        );
    }

    for block in blocks {
        for candidate in find_term_candidates(&block.text) {
            let normalized = normalize_term(&candidate);
            if let Some(entry) = terms.get_mut(&normalized) {
                if entry.defining_block_seq_id != block.seq_id
                    && !entry.usage_block_seq_ids.contains(&block.seq_id)
                {
                    entry.usage_block_seq_ids.push(block.seq_id.clone());
                }
            }
        }
    }

    terms
}

fn normalize_term(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Recognize `Term:` introduction lines and quoted-definition patterns,
/// e.g. `Confidential Information: means ...` or `the "Effective Date"`.
fn find_definition_candidates(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(colon_idx) = text.find(':') {
        let head = text[..colon_idx].trim();
        if !head.is_empty() && head.split_whitespace().count() <= 5 && is_likely_defined_term(head) {
            out.push(head.to_string());
        }
    }
    out.extend(extract_quoted_terms(text));
    out
}

fn find_term_candidates(text: &str) -> Vec<String> {
    extract_quoted_terms(text)
        .into_iter()
        .chain(text.split_whitespace().filter_map(|word| {
            let trimmed = word.trim_matches(|c: char| c.is_ascii_punctuation());
            if !trimmed.is_empty() && is_likely_defined_term(trimmed) {
                Some(trimmed.to_string())
            } else {
                None
            }
        }))
        .collect()
}

fn extract_quoted_terms(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '"' || c == '“' {
            if let Some(end) = text[i + c.len_utf8()..].find(|c: char| c == '"' || c == '”') {
                let start = i + c.len_utf8();
                let term = &text[start..start + end];
                if !term.is_empty() {
                    out.push(term.to_string());
                }
            }
        }
    }
    out
}

/// Title-Case or ALL-CAPS heuristic for a defined-term candidate: first
/// character uppercase, remaining characters either all lowercase or all
/// uppercase (allows multi-word phrases passed in whole).
fn is_likely_defined_term(s: &str) -> bool {
    let mut chars = s.chars().filter(|c| c.is_alphabetic());
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    if !first.is_uppercase() {
        return false;
    }
    let rest: Vec<char> = chars.collect();
    if rest.is_empty() {
        return true;
    }
    rest.iter().all(|c| c.is_lowercase()) || rest.iter().all(|c| c.is_uppercase())
}
