//! Document IR extraction, edit validation, and edit application over an
//! opaque DOCX editor engine.
//!
//! This crate does not parse or render OOXML itself; it sits on top of
//! whatever implements [`engine::DocxEngine`] and provides everything
//! around it: stable block identity, the document IR, the edit model and
//! its two wire formats (JSON array, markdown table), validation, ordered
//! application, and archive recompression for export.

pub mod applicator;
pub mod block;
pub mod diff;
pub mod edit;
pub mod engine;
pub mod ids;
pub mod ir;
pub mod markdown;
pub mod recompress;
pub mod validator;

pub use applicator::{apply, AppliedComment, ApplyError, ApplyResult, SkippedEdit};
pub use block::{Block, BlockType};
pub use edit::{decode_json, Author, Edit, EditDecodeError};
pub use engine::{DocxEngine, EditorMode, EngineBlock, EngineError, TrackedOp};
pub use ids::BlockIdRegistry;
pub use ir::{extract, DocumentIr, DocumentMetadata, ExtractOptions, OutlineNode};
pub use markdown::{looks_like_markdown, ParsedMarkdownEdits};
pub use recompress::{recompress, RecompressError};
pub use validator::{validate, IssueType, ValidationIssue, ValidationResult};
