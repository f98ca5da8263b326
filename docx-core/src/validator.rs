//! The edit validator: seven ordered per-edit checks against an IR,
//! producing a structured issue/warning list. Never mutates its inputs, and
//! never short-circuits — every edit is checked and every check that fires
//! is recorded.

use serde::{Deserialize, Serialize};

use crate::edit::{Edit, EditDecodeError};
use crate::ir::DocumentIr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    InvalidOperation,
    MissingField,
    MissingBlock,
    EmptySourceForDiff,
    TruncationRisk,
    TocBlock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub edit_index: usize,
    pub block_id: Option<String>,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total_edits: usize,
    pub valid_edits: usize,
    pub invalid_edits: usize,
    pub warning_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub summary: ValidationSummary,
}

/// Resolve a `blockId`/`afterBlockId` reference against an IR: try `seqId`
/// first, then UUID (§3.4's documented precedence).
pub fn resolve_block_id<'a>(ir: &'a DocumentIr, reference: &str) -> Option<&'a crate::block::Block> {
    ir.blocks
        .iter()
        .find(|b| b.seq_id == reference)
        .or_else(|| ir.blocks.iter().find(|b| b.id == reference))
}

pub fn validate(edits: &[Result<Edit, EditDecodeError>], ir: &DocumentIr) -> ValidationResult {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();
    let mut invalid_count = 0;

    for (edit_index, decoded) in edits.iter().enumerate() {
        let mut edit_has_issue = false;

        // Checks 1 (operation-in-closed-set) and 2 (required fields) are
        // resolved already at decode time (`edit::normalize` /
        // `markdown::build_edit`); a `Err` here is exactly those checks
        // firing, so it becomes the matching issue directly.
        let edit = match decoded {
            Ok(edit) => edit,
            Err(EditDecodeError::InvalidOperation) => {
                issues.push(ValidationIssue {
                    edit_index,
                    block_id: None,
                    issue_type: IssueType::InvalidOperation,
                    message: "operation is not one of replace, delete, insert, comment".to_string(),
                });
                invalid_count += 1;
                continue;
            }
            Err(EditDecodeError::MissingField(field)) => {
                issues.push(ValidationIssue {
                    edit_index,
                    block_id: None,
                    issue_type: IssueType::MissingField,
                    message: format!("required field '{}' is missing", field),
                });
                invalid_count += 1;
                continue;
            }
        };

        let target_ref = edit.target_ref();
        let resolved = resolve_block_id(ir, target_ref);

        match edit {
            Edit::Replace { .. } | Edit::Delete { .. } | Edit::Comment { .. } => {
                if resolved.is_none() {
                    issues.push(ValidationIssue {
                        edit_index,
                        block_id: Some(target_ref.to_string()),
                        issue_type: IssueType::MissingBlock,
                        message: format!("block '{}' not found in document", target_ref),
                    });
                    edit_has_issue = true;
                }
            }
            Edit::Insert { .. } => {
                if resolved.is_none() {
                    issues.push(ValidationIssue {
                        edit_index,
                        block_id: Some(target_ref.to_string()),
                        issue_type: IssueType::MissingBlock,
                        message: format!("afterBlockId '{}' not found in document", target_ref),
                    });
                    edit_has_issue = true;
                }
            }
        }

        if let (Edit::Replace { diff: true, .. }, Some(block)) = (edit, resolved) {
            if block.text.is_empty() {
                issues.push(ValidationIssue {
                    edit_index,
                    block_id: Some(block.seq_id.clone()),
                    issue_type: IssueType::EmptySourceForDiff,
                    message: "cannot diff against an empty source block".to_string(),
                });
                edit_has_issue = true;
            }
        }

        if let (Edit::Replace { new_text, .. }, Some(block)) = (edit, resolved) {
            if !block.text.is_empty() && new_text.len() * 2 <= block.text.len() {
                warnings.push(ValidationIssue {
                    edit_index,
                    block_id: Some(block.seq_id.clone()),
                    issue_type: IssueType::TruncationRisk,
                    message: "replacement text is less than half the length of the current block"
                        .to_string(),
                });
            }
        }

        if let Some(block) = resolved {
            if block.is_toc {
                warnings.push(ValidationIssue {
                    edit_index,
                    block_id: Some(block.seq_id.clone()),
                    issue_type: IssueType::TocBlock,
                    message: "target block is a table of contents; apply will skip it".to_string(),
                });
            }
        }

        if edit_has_issue {
            invalid_count += 1;
        }
    }

    let total_edits = edits.len();
    let valid_edits = total_edits - invalid_count;
    let valid = issues.is_empty();

    ValidationResult {
        valid,
        summary: ValidationSummary {
            total_edits,
            valid_edits,
            invalid_edits: invalid_count,
            warning_count: warnings.len(),
        },
        issues,
        warnings,
    }
}
