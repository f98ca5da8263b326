//! The editor engine contract: the opaque external collaborator this crate
//! builds the IR/validate/apply pipeline on top of.
//!
//! The real DOCX parser/exporter is explicitly out of scope (see the crate's
//! top-level documentation): this module defines the trait boundary
//! (`DocxEngine`) plus `memory::MemoryEngine`, a minimal in-repo
//! implementation used by tests. `MemoryEngine` is not a production OOXML
//! engine — it exists so the rest of the pipeline has something concrete to
//! drive.

use thiserror::Error;

/// Mode an editor is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Editing,
    Suggesting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineBlock {
    pub id: String,
    pub block_type: String,
    pub level: Option<u32>,
    pub text: String,
    pub start_pos: usize,
    pub end_pos: usize,
    pub is_toc: bool,
    pub style_name: Option<String>,
}

/// A word-level tracked-change operation, as produced by `diff::word_diff`
/// and consumed by `replace`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackedOp {
    Equal(String),
    Insert(String),
    Delete(String),
}

#[derive(Debug, Clone)]
pub struct Author {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load document: {0}")]
    LoadFailed(String),
    #[error("block not found: {0}")]
    BlockNotFound(String),
    #[error("export failed: {0}")]
    ExportFailed(String),
    #[error("engine operation failed: {0}")]
    OperationFailed(String),
}

/// The editor engine contract (load / traverse / mutate / export / destroy).
///
/// Implementations own all in-memory state for a single loaded document;
/// callers are responsible for calling `destroy` exactly once all mutation
/// is finished (see `docx_service::lifecycle`).
pub trait DocxEngine: Send {
    /// Load a DOCX buffer, returning a live editor in the given mode.
    fn load(buffer: &[u8], mode: EditorMode) -> Result<Self, EngineError>
    where
        Self: Sized;

    /// Iterate block-level nodes in document order.
    fn traverse(&self) -> Vec<EngineBlock>;

    /// Replace a block's contents. `tracked` is `Some` when the diff-based
    /// minimal-ops path is used; `None` means a full-block replace.
    fn replace(
        &mut self,
        block_id: &str,
        text: &str,
        tracked: Option<&[TrackedOp]>,
        author: &Author,
    ) -> Result<(), EngineError>;

    /// Remove a block.
    fn delete(&mut self, block_id: &str, author: &Author) -> Result<(), EngineError>;

    /// Insert a new block immediately after `after_block_id`, returning the
    /// new block's engine-native id.
    fn insert_after(
        &mut self,
        after_block_id: &str,
        text: &str,
        block_type: &str,
        level: Option<u32>,
        author: &Author,
    ) -> Result<String, EngineError>;

    /// Attach an external review comment to a block, returning a comment id.
    fn add_comment(
        &mut self,
        block_id: &str,
        text: &str,
        author: &Author,
    ) -> Result<String, EngineError>;

    /// Serialize the current state to a DOCX byte buffer.
    fn export(&mut self) -> Result<Vec<u8>, EngineError>;

    /// Release all in-memory state. Idempotent.
    fn destroy(&mut self);

    /// Version string reported by the engine, if any — purely informational
    /// (`DocumentIr.metadata.engineVersion`).
    fn version(&self) -> Option<String> {
        None
    }
}

pub mod memory {
    //! `MemoryEngine`: an in-repo stand-in for the real DOCX engine, used by
    //! unit and integration tests. It treats the uploaded buffer as a
    //! minimal ZIP archive holding a single `word/document.xml` entry with
    //! one line of plain text per block, and re-serializes the same way on
    //! export. It is not a production OOXML implementation.

    use super::{Author, DocxEngine, EditorMode, EngineBlock, EngineError, TrackedOp};
    use std::io::{Read, Write};

    #[derive(Debug, Clone)]
    struct MemoryBlock {
        id: String,
        block_type: String,
        level: Option<u32>,
        text: String,
        is_toc: bool,
    }

    /// A minimal ZIP-backed in-memory editor. Every line of
    /// `word/document.xml` is one paragraph block; a line starting with
    /// `#<n> ` is a heading of level `n`; a line starting with `[TOC]` is
    /// flagged as a TOC block; a line starting with `- ` is a list item.
    pub struct MemoryEngine {
        blocks: Vec<MemoryBlock>,
        #[allow(dead_code)]
        mode: EditorMode,
        destroyed: bool,
        next_id: u64,
        comments: Vec<(String, String, String)>,
    }

    impl MemoryEngine {
        fn fresh_id(&mut self) -> String {
            self.next_id += 1;
            format!("mem-uuid-{:08x}", self.next_id)
        }

        /// All comments attached so far: `(block_id, comment_id, text)`.
        pub fn comments(&self) -> &[(String, String, String)] {
            &self.comments
        }

        fn parse_document_xml(xml: &str, start_id: u64) -> (Vec<MemoryBlock>, u64) {
            let mut blocks = Vec::new();
            let mut next = start_id;
            for line in xml.lines() {
                next += 1;
                let id = format!("mem-uuid-{:08x}", next);
                if let Some(rest) = line.strip_prefix("[TOC]") {
                    blocks.push(MemoryBlock {
                        id,
                        block_type: "toc".to_string(),
                        level: None,
                        text: rest.trim_start().to_string(),
                        is_toc: true,
                    });
                } else if let Some(rest) = line.strip_prefix('#') {
                    let (level_str, text) = rest.split_once(' ').unwrap_or((rest, ""));
                    let level = level_str.parse::<u32>().ok();
                    blocks.push(MemoryBlock {
                        id,
                        block_type: "heading".to_string(),
                        level,
                        text: text.to_string(),
                        is_toc: false,
                    });
                } else if let Some(rest) = line.strip_prefix("- ") {
                    blocks.push(MemoryBlock {
                        id,
                        block_type: "listItem".to_string(),
                        level: None,
                        text: rest.to_string(),
                        is_toc: false,
                    });
                } else {
                    blocks.push(MemoryBlock {
                        id,
                        block_type: "paragraph".to_string(),
                        level: None,
                        text: line.to_string(),
                        is_toc: false,
                    });
                }
            }
            (blocks, next)
        }

        fn render_document_xml(&self) -> String {
            let mut out = String::new();
            for (i, b) in self.blocks.iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                match b.block_type.as_str() {
                    "toc" => out.push_str(&format!("[TOC]{}", b.text)),
                    "heading" => out.push_str(&format!("#{} {}", b.level.unwrap_or(1), b.text)),
                    "listItem" => out.push_str(&format!("- {}", b.text)),
                    _ => out.push_str(&b.text),
                }
            }
            out
        }

        fn position_of(&self, idx: usize) -> (usize, usize) {
            let start: usize = self.blocks[..idx].iter().map(|b| b.text.len() + 1).sum();
            let end = start + self.blocks[idx].text.len();
            (start, end)
        }

        fn index_of(&self, block_id: &str) -> Option<usize> {
            self.blocks.iter().position(|b| b.id == block_id)
        }
    }

    impl DocxEngine for MemoryEngine {
        fn load(buffer: &[u8], mode: EditorMode) -> Result<Self, EngineError> {
            let cursor = std::io::Cursor::new(buffer);
            let mut archive = zip::ZipArchive::new(cursor)
                .map_err(|e| EngineError::LoadFailed(e.to_string()))?;
            let mut xml = String::new();
            {
                let mut entry = archive
                    .by_name("word/document.xml")
                    .map_err(|e| EngineError::LoadFailed(e.to_string()))?;
                entry
                    .read_to_string(&mut xml)
                    .map_err(|e| EngineError::LoadFailed(e.to_string()))?;
            }
            let (blocks, next_id) = Self::parse_document_xml(&xml, 0);
            Ok(MemoryEngine {
                blocks,
                mode,
                destroyed: false,
                next_id,
                comments: Vec::new(),
            })
        }

        fn traverse(&self) -> Vec<EngineBlock> {
            let mut out = Vec::with_capacity(self.blocks.len());
            for (i, b) in self.blocks.iter().enumerate() {
                let (start_pos, end_pos) = self.position_of(i);
                out.push(EngineBlock {
                    id: b.id.clone(),
                    block_type: b.block_type.clone(),
                    level: b.level,
                    text: b.text.clone(),
                    start_pos,
                    end_pos,
                    is_toc: b.is_toc,
                    style_name: None,
                });
            }
            out
        }

        fn replace(
            &mut self,
            block_id: &str,
            text: &str,
            tracked: Option<&[TrackedOp]>,
            _author: &Author,
        ) -> Result<(), EngineError> {
            let idx = self
                .index_of(block_id)
                .ok_or_else(|| EngineError::BlockNotFound(block_id.to_string()))?;
            let new_text = match tracked {
                Some(ops) => ops
                    .iter()
                    .filter_map(|op| match op {
                        TrackedOp::Equal(t) | TrackedOp::Insert(t) => Some(t.as_str()),
                        TrackedOp::Delete(_) => None,
                    })
                    .collect::<String>(),
                None => text.to_string(),
            };
            self.blocks[idx].text = new_text;
            Ok(())
        }

        fn delete(&mut self, block_id: &str, _author: &Author) -> Result<(), EngineError> {
            let idx = self
                .index_of(block_id)
                .ok_or_else(|| EngineError::BlockNotFound(block_id.to_string()))?;
            self.blocks.remove(idx);
            Ok(())
        }

        fn insert_after(
            &mut self,
            after_block_id: &str,
            text: &str,
            block_type: &str,
            level: Option<u32>,
            _author: &Author,
        ) -> Result<String, EngineError> {
            let idx = self
                .index_of(after_block_id)
                .ok_or_else(|| EngineError::BlockNotFound(after_block_id.to_string()))?;
            let id = self.fresh_id();
            self.blocks.insert(
                idx + 1,
                MemoryBlock {
                    id: id.clone(),
                    block_type: block_type.to_string(),
                    level,
                    text: text.to_string(),
                    is_toc: false,
                },
            );
            Ok(id)
        }

        fn add_comment(
            &mut self,
            block_id: &str,
            text: &str,
            _author: &Author,
        ) -> Result<String, EngineError> {
            self.index_of(block_id)
                .ok_or_else(|| EngineError::BlockNotFound(block_id.to_string()))?;
            let comment_id = format!("comment-{}", self.comments.len() + 1);
            self.comments
                .push((block_id.to_string(), comment_id.clone(), text.to_string()));
            Ok(comment_id)
        }

        fn export(&mut self) -> Result<Vec<u8>, EngineError> {
            let xml = self.render_document_xml();
            let mut buf = Vec::new();
            {
                let cursor = std::io::Cursor::new(&mut buf);
                let mut writer = zip::ZipWriter::new(cursor);
                let options = zip::write::FileOptions::default()
                    .compression_method(zip::CompressionMethod::Stored);
                writer
                    .start_file("word/document.xml", options)
                    .map_err(|e| EngineError::ExportFailed(e.to_string()))?;
                writer
                    .write_all(xml.as_bytes())
                    .map_err(|e| EngineError::ExportFailed(e.to_string()))?;
                writer
                    .finish()
                    .map_err(|e| EngineError::ExportFailed(e.to_string()))?;
            }
            Ok(buf)
        }

        fn destroy(&mut self) {
            if self.destroyed {
                return;
            }
            self.blocks.clear();
            self.comments.clear();
            self.destroyed = true;
        }

        fn version(&self) -> Option<String> {
            Some("memory-engine-0.1".to_string())
        }
    }

    impl Drop for MemoryEngine {
        fn drop(&mut self) {
            self.destroy();
        }
    }

    /// Build a minimal single-entry DOCX buffer from plain-text lines, for
    /// tests that need a `load`-able byte buffer.
    pub fn build_fixture(lines: &[&str]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let cursor = std::io::Cursor::new(&mut buf);
            let mut writer = zip::ZipWriter::new(cursor);
            let options = zip::write::FileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            writer.start_file("word/document.xml", options).unwrap();
            writer.write_all(lines.join("\n").as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn author() -> Author {
            Author {
                name: "Test Author".into(),
                email: "test@example.com".into(),
            }
        }

        #[test]
        fn load_and_traverse_round_trips_blocks() {
            let buf = build_fixture(&["#1 Title", "Body text", "- item one"]);
            let engine = MemoryEngine::load(&buf, EditorMode::Editing).unwrap();
            let blocks = engine.traverse();
            assert_eq!(blocks.len(), 3);
            assert_eq!(blocks[0].block_type, "heading");
            assert_eq!(blocks[0].level, Some(1));
            assert_eq!(blocks[1].block_type, "paragraph");
            assert_eq!(blocks[2].block_type, "listItem");
            assert_eq!(blocks[2].text, "item one");
        }

        #[test]
        fn replace_without_tracked_ops_is_full_replace() {
            let buf = build_fixture(&["hello"]);
            let mut engine = MemoryEngine::load(&buf, EditorMode::Editing).unwrap();
            let id = engine.traverse()[0].id.clone();
            engine.replace(&id, "goodbye", None, &author()).unwrap();
            assert_eq!(engine.traverse()[0].text, "goodbye");
        }

        #[test]
        fn delete_removes_the_block() {
            let buf = build_fixture(&["one", "two"]);
            let mut engine = MemoryEngine::load(&buf, EditorMode::Editing).unwrap();
            let id = engine.traverse()[0].id.clone();
            engine.delete(&id, &author()).unwrap();
            let remaining = engine.traverse();
            assert_eq!(remaining.len(), 1);
            assert_eq!(remaining[0].text, "two");
        }

        #[test]
        fn insert_after_places_new_block_immediately_after_target() {
            let buf = build_fixture(&["one", "two"]);
            let mut engine = MemoryEngine::load(&buf, EditorMode::Editing).unwrap();
            let first = engine.traverse()[0].id.clone();
            engine
                .insert_after(&first, "middle", "paragraph", None, &author())
                .unwrap();
            let blocks = engine.traverse();
            assert_eq!(blocks.len(), 3);
            assert_eq!(blocks[1].text, "middle");
        }

        #[test]
        fn export_then_reload_preserves_text() {
            let buf = build_fixture(&["alpha", "beta"]);
            let mut engine = MemoryEngine::load(&buf, EditorMode::Editing).unwrap();
            let exported = engine.export().unwrap();
            let reloaded = MemoryEngine::load(&exported, EditorMode::Editing).unwrap();
            let blocks = reloaded.traverse();
            assert_eq!(blocks[0].text, "alpha");
            assert_eq!(blocks[1].text, "beta");
        }

        #[test]
        fn destroy_is_idempotent() {
            let buf = build_fixture(&["alpha"]);
            let mut engine = MemoryEngine::load(&buf, EditorMode::Editing).unwrap();
            engine.destroy();
            engine.destroy();
            assert!(engine.traverse().is_empty());
        }

        #[test]
        fn unknown_block_id_is_an_error() {
            let buf = build_fixture(&["alpha"]);
            let mut engine = MemoryEngine::load(&buf, EditorMode::Editing).unwrap();
            let err = engine.delete("not-a-real-id", &author());
            assert!(matches!(err, Err(EngineError::BlockNotFound(_))));
        }
    }
}
