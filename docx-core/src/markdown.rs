//! The markdown edits grammar: a direct line/section scanner recovering a
//! normalized `Vec<Edit>` plus a warning list, mirroring §6.2.2. No table/
//! markdown-parser crate — the grammar is narrow enough that hand-rolled
//! string handling is the idiomatic choice here.

use std::collections::HashMap;

use crate::edit::{Author, Edit, EditDecodeError};

#[derive(Debug, Clone)]
pub struct ParsedMarkdownEdits {
    pub edits: Vec<Result<Edit, EditDecodeError>>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct TableRow {
    block: String,
    op: String,
    diff: String,
    comment: String,
}

/// True when `text` begins with one of the markdown-edits header markers
/// the HTTP layer uses to decide "is this markdown, not JSON".
pub fn looks_like_markdown(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with("# Edits")
        || trimmed.starts_with("## Edits Table")
        || trimmed.starts_with("## Metadata")
        || trimmed.lines().any(|l| l.trim_start().starts_with("| Block |"))
}

/// Parse a markdown edits document into a normalized edit list.
///
/// Returns `Err` only when the document has no `## Edits Table` section at
/// all (the "unparseable/empty" case of §4.9.4); individual malformed rows
/// are skipped with a warning instead of failing the whole parse.
pub fn parse(text: &str) -> Result<ParsedMarkdownEdits, String> {
    let sections = split_sections(text);
    let mut warnings = Vec::new();

    let default_author = sections
        .get("metadata")
        .map(|body| parse_metadata_author(body))
        .unwrap_or(None);

    let table_body = sections
        .get("edits table")
        .ok_or_else(|| "missing required '## Edits Table' section".to_string())?;
    let rows = parse_table_rows(table_body, &mut warnings);

    let replacements = sections
        .get("replacement text")
        .map(|body| parse_replacement_sections(body))
        .unwrap_or_default();

    let edits = rows
        .into_iter()
        .map(|row| build_edit(&row, &replacements, default_author.clone(), &mut warnings))
        .collect();

    Ok(ParsedMarkdownEdits { edits, warnings })
}

/// Split the document into `## <heading>` sections (lowercased heading as
/// the key), collecting each section's raw body until the next `##` or end
/// of document. A leading `# Edits` top-level header, if present, is
/// ignored for sectioning purposes.
fn split_sections(text: &str) -> HashMap<String, String> {
    let mut sections: HashMap<String, String> = HashMap::new();
    let mut current_key: Option<String> = None;
    let mut current_body = String::new();

    for line in text.lines() {
        let trimmed = line.trim_start();
        if let Some(heading) = trimmed.strip_prefix("## ") {
            if let Some(key) = current_key.take() {
                sections.insert(key, std::mem::take(&mut current_body));
            }
            current_key = Some(heading.trim().to_lowercase());
            continue;
        }
        if trimmed.starts_with("# ") {
            // Top-level header; not a section boundary itself.
            continue;
        }
        if current_key.is_some() {
            current_body.push_str(line);
            current_body.push('\n');
        }
    }
    if let Some(key) = current_key {
        sections.insert(key, current_body);
    }
    sections
}

fn parse_metadata_author(body: &str) -> Option<Author> {
    let mut name = None;
    let mut email = None;
    for line in body.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Author Name:") {
            name = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("Author Email:") {
            email = Some(rest.trim().to_string());
        }
    }
    match (name, email) {
        (Some(name), Some(email)) => Some(Author { name, email }),
        _ => None,
    }
}

fn parse_table_rows(body: &str, warnings: &mut Vec<String>) -> Vec<TableRow> {
    let mut rows = Vec::new();
    for (i, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || !line.starts_with('|') {
            continue;
        }
        // Header row and separator row (---) are skipped.
        let lower = line.to_lowercase();
        if lower.starts_with("| block") || line.chars().all(|c| matches!(c, '|' | '-' | ' ' | ':')) {
            continue;
        }
        let cells: Vec<&str> = line
            .trim_matches('|')
            .split('|')
            .map(|c| c.trim())
            .collect();
        if cells.len() != 4 {
            warnings.push(format!(
                "row {} skipped: expected 4 cells, found {}",
                i + 1,
                cells.len()
            ));
            continue;
        }
        rows.push(TableRow {
            block: cells[0].to_string(),
            op: cells[1].to_lowercase(),
            diff: cells[2].to_string(),
            comment: cells[3].to_string(),
        });
    }
    rows
}

/// `### <seqId> newText` / `### <seqId> insertText` sections; body is raw
/// text until the next `###` or `##`.
fn parse_replacement_sections(body: &str) -> HashMap<(String, String), String> {
    let mut out: HashMap<(String, String), String> = HashMap::new();
    let mut current_key: Option<(String, String)> = None;
    let mut current_body = String::new();

    for line in body.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("### ") {
            if let Some(key) = current_key.take() {
                out.insert(key, current_body.trim_end_matches('\n').to_string());
            }
            current_body = String::new();
            let mut parts = rest.trim().splitn(2, char::is_whitespace);
            let seq_id = parts.next().unwrap_or("").to_string();
            let kind = parts.next().unwrap_or("").trim().to_string();
            current_key = Some((seq_id, kind));
            continue;
        }
        if current_key.is_some() {
            current_body.push_str(line);
            current_body.push('\n');
        }
    }
    if let Some(key) = current_key {
        out.insert(key, current_body.trim_end_matches('\n').to_string());
    }
    out
}

fn build_edit(
    row: &TableRow,
    replacements: &HashMap<(String, String), String>,
    default_author: Option<Author>,
    warnings: &mut Vec<String>,
) -> Result<Edit, EditDecodeError> {
    let diff = match row.diff.as_str() {
        "true" => true,
        "false" => false,
        _ => true, // "-" or anything else: unspecified -> default
    };
    let comment = if row.comment.is_empty() || row.comment == "-" {
        None
    } else {
        Some(row.comment.clone())
    };

    match row.op.as_str() {
        "replace" => {
            let new_text = replacements.get(&(row.block.clone(), "newText".to_string()));
            let Some(new_text) = new_text else {
                warnings.push(format!(
                    "replace row for block '{}' has no matching newText section",
                    row.block
                ));
                return Err(EditDecodeError::MissingField("newText"));
            };
            Ok(Edit::Replace {
                block_id: row.block.clone(),
                new_text: new_text.clone(),
                diff,
                comment,
                author: default_author,
            })
        }
        "delete" => Ok(Edit::Delete {
            block_id: row.block.clone(),
            comment,
            author: default_author,
        }),
        "insert" => {
            let text = replacements.get(&(row.block.clone(), "insertText".to_string()));
            let Some(text) = text else {
                warnings.push(format!(
                    "insert row for '{}' has no matching insertText section",
                    row.block
                ));
                return Err(EditDecodeError::MissingField("text"));
            };
            Ok(Edit::Insert {
                after_block_id: row.block.clone(),
                text: text.clone(),
                block_type: None,
                level: None,
                comment,
                author: default_author,
            })
        }
        "comment" => Ok(Edit::Comment {
            block_id: row.block.clone(),
            comment: row.comment.clone(),
            author: default_author,
        }),
        other => {
            warnings.push(format!("unrecognized operation '{}'", other));
            Err(EditDecodeError::InvalidOperation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_like_markdown_detects_all_header_forms() {
        assert!(looks_like_markdown("# Edits\n..."));
        assert!(looks_like_markdown("## Edits Table\n..."));
        assert!(looks_like_markdown("## Metadata\n..."));
        assert!(looks_like_markdown("| Block | Op | Diff | Comment |"));
        assert!(!looks_like_markdown("[{}]"));
    }

    #[test]
    fn parses_a_comment_row_like_the_spec_example() {
        let doc = "## Edits Table\n| Block | Op | Diff | Comment |\n|---|---|---|---|\n| b003 | comment | - | hi |\n";
        let parsed = parse(doc).unwrap();
        assert_eq!(parsed.edits.len(), 1);
        match parsed.edits[0].as_ref().unwrap() {
            Edit::Comment { block_id, comment, .. } => {
                assert_eq!(block_id, "b003");
                assert_eq!(comment, "hi");
            }
            other => panic!("expected comment edit, got {:?}", other),
        }
    }

    #[test]
    fn replace_row_binds_to_matching_replacement_section() {
        let doc = "\
## Edits Table
| Block | Op | Diff | Comment |
|---|---|---|---|
| b005 | replace | true | note |

## Replacement Text
### b005 newText
the new paragraph text
";
        let parsed = parse(doc).unwrap();
        match parsed.edits[0].as_ref().unwrap() {
            Edit::Replace { new_text, diff, .. } => {
                assert_eq!(new_text.trim(), "the new paragraph text");
                assert!(*diff);
            }
            other => panic!("expected replace edit, got {:?}", other),
        }
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn replace_row_without_section_is_a_missing_field_decode_error() {
        let doc = "## Edits Table\n| Block | Op | Diff | Comment |\n|---|---|---|---|\n| b005 | replace | true | - |\n";
        let parsed = parse(doc).unwrap();
        assert_eq!(parsed.warnings.len(), 1);
        assert!(matches!(
            parsed.edits[0],
            Err(EditDecodeError::MissingField("newText"))
        ));
    }

    #[test]
    fn malformed_row_is_skipped_with_warning() {
        let doc = "## Edits Table\n| Block | Op | Diff | Comment |\n|---|---|---|---|\n| b005 | replace | true |\n";
        let parsed = parse(doc).unwrap();
        assert_eq!(parsed.edits.len(), 0);
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn insert_row_binds_seq_id_as_after_block_id() {
        let doc = "\
## Edits Table
| Block | Op | Diff | Comment |
|---|---|---|---|
| b010 | insert | - | - |

## Replacement Text
### b010 insertText
brand new block
";
        let parsed = parse(doc).unwrap();
        match parsed.edits[0].as_ref().unwrap() {
            Edit::Insert { after_block_id, text, .. } => {
                assert_eq!(after_block_id, "b010");
                assert_eq!(text.trim(), "brand new block");
            }
            other => panic!("expected insert edit, got {:?}", other),
        }
    }

    #[test]
    fn missing_edits_table_section_is_an_error() {
        let doc = "## Metadata\nVersion: 1\n";
        assert!(parse(doc).is_err());
    }

    #[test]
    fn metadata_author_applies_to_all_rows() {
        let doc = "\
## Metadata
Author Name: Jane Reviewer
Author Email: jane@example.com

## Edits Table
| Block | Op | Diff | Comment |
|---|---|---|---|
| b003 | comment | - | hi |
";
        let parsed = parse(doc).unwrap();
        match parsed.edits[0].as_ref().unwrap() {
            Edit::Comment { author, .. } => {
                let author = author.as_ref().expect("author should be set");
                assert_eq!(author.name, "Jane Reviewer");
            }
            other => panic!("expected comment edit, got {:?}", other),
        }
    }
}
