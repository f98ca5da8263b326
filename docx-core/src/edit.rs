//! The Edit model: a tagged union over `operation`.
//!
//! Decoding is intentionally permissive at the JSON-shape level and strict
//! at the per-edit level: a malformed top-level value (not an array, not
//! JSON at all) is a hard decode failure the HTTP layer reports as
//! `INVALID_EDITS_JSON`; an individual edit with an unrecognized operation
//! or a missing required field decodes to an `EditDecodeError` that the
//! validator turns into an `invalid_operation`/`missing_field` issue at that
//! edit's index, exactly like any other validation issue. This lets the
//! validator's check ordering (§4.3) own checks 1 and 2 instead of duplicating
//! them as separate JSON-deserialize failures.

use serde::{Deserialize, Serialize};

/// Author attribution for a tracked change or comment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum Edit {
    #[serde(rename_all = "camelCase")]
    Replace {
        block_id: String,
        new_text: String,
        #[serde(default = "default_true")]
        diff: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        author: Option<Author>,
    },
    #[serde(rename_all = "camelCase")]
    Delete {
        block_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        author: Option<Author>,
    },
    #[serde(rename_all = "camelCase")]
    Insert {
        after_block_id: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        author: Option<Author>,
    },
    #[serde(rename_all = "camelCase")]
    Comment {
        block_id: String,
        comment: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        author: Option<Author>,
    },
}

fn default_true() -> bool {
    true
}

impl Edit {
    /// `blockId` or `afterBlockId`, whichever this operation carries — the
    /// reference the validator/applicator must resolve.
    pub fn target_ref(&self) -> &str {
        match self {
            Edit::Replace { block_id, .. } => block_id,
            Edit::Delete { block_id, .. } => block_id,
            Edit::Insert { after_block_id, .. } => after_block_id,
            Edit::Comment { block_id, .. } => block_id,
        }
    }

    pub fn operation_name(&self) -> &'static str {
        match self {
            Edit::Replace { .. } => "replace",
            Edit::Delete { .. } => "delete",
            Edit::Insert { .. } => "insert",
            Edit::Comment { .. } => "comment",
        }
    }

    pub fn author(&self) -> Option<&Author> {
        match self {
            Edit::Replace { author, .. } => author.as_ref(),
            Edit::Delete { author, .. } => author.as_ref(),
            Edit::Insert { author, .. } => author.as_ref(),
            Edit::Comment { author, .. } => author.as_ref(),
        }
    }
}

/// Why a single edit entry could not be normalized into an `Edit` — the
/// validator's checks 1 and 2 (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditDecodeError {
    InvalidOperation,
    MissingField(&'static str),
}

/// Parse the top-level JSON value and require it to be an array. This is
/// the only JSON-level failure mode (`INVALID_EDITS_JSON` / `MISSING_EDITS`
/// at the HTTP layer); per-item problems are deferred to `normalize`.
pub fn decode_json_array(raw: &str) -> Result<Vec<serde_json::Value>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    match value {
        serde_json::Value::Array(items) => Ok(items),
        other => {
            let unexpected = serde::de::Unexpected::Other(match other {
                serde_json::Value::Object(_) => "object",
                serde_json::Value::Null => "null",
                serde_json::Value::Bool(_) => "boolean",
                serde_json::Value::Number(_) => "number",
                serde_json::Value::String(_) => "string",
                serde_json::Value::Array(_) => unreachable!(),
            });
            Err(serde::de::Error::invalid_type(
                unexpected,
                &"a JSON array of edit objects",
            ))
        }
    }
}

/// Normalize one JSON object into an `Edit`, checking operation membership
/// and required fields (validator checks 1 and 2) by hand rather than via
/// serde's tagged-enum deserialize, so a bad item produces a typed error
/// instead of failing the whole batch.
pub fn normalize(value: &serde_json::Value) -> Result<Edit, EditDecodeError> {
    let operation = value.get("operation").and_then(|v| v.as_str());
    let operation = match operation {
        Some(op @ ("replace" | "delete" | "insert" | "comment")) => op,
        _ => return Err(EditDecodeError::InvalidOperation),
    };

    let get_str = |key: &str| -> Option<String> {
        value.get(key).and_then(|v| v.as_str()).map(str::to_string)
    };
    let author = value
        .get("author")
        .and_then(|v| serde_json::from_value::<Author>(v.clone()).ok());
    let aux_comment = get_str("comment");

    match operation {
        "replace" => {
            let block_id = get_str("blockId").ok_or(EditDecodeError::MissingField("blockId"))?;
            let new_text = get_str("newText").ok_or(EditDecodeError::MissingField("newText"))?;
            let diff = value.get("diff").and_then(|v| v.as_bool()).unwrap_or(true);
            Ok(Edit::Replace {
                block_id,
                new_text,
                diff,
                comment: aux_comment,
                author,
            })
        }
        "delete" => {
            let block_id = get_str("blockId").ok_or(EditDecodeError::MissingField("blockId"))?;
            Ok(Edit::Delete {
                block_id,
                comment: aux_comment,
                author,
            })
        }
        "insert" => {
            let after_block_id =
                get_str("afterBlockId").ok_or(EditDecodeError::MissingField("afterBlockId"))?;
            let text = get_str("text").ok_or(EditDecodeError::MissingField("text"))?;
            let block_type = get_str("type");
            let level = value.get("level").and_then(|v| v.as_u64()).map(|n| n as u32);
            Ok(Edit::Insert {
                after_block_id,
                text,
                block_type,
                level,
                comment: aux_comment,
                author,
            })
        }
        "comment" => {
            let block_id = get_str("blockId").ok_or(EditDecodeError::MissingField("blockId"))?;
            let comment = get_str("comment").ok_or(EditDecodeError::MissingField("comment"))?;
            Ok(Edit::Comment {
                block_id,
                comment,
                author,
            })
        }
        _ => unreachable!("operation already checked against the closed set"),
    }
}

/// Decode a raw JSON edits document into the validator's normalized
/// per-item form: `Ok` for a well-formed edit, `Err` for one with an
/// unrecognized operation or a missing required field. Fails only if the
/// top-level value isn't a JSON array.
pub fn decode_json(raw: &str) -> Result<Vec<Result<Edit, EditDecodeError>>, serde_json::Error> {
    let items = decode_json_array(raw)?;
    Ok(items.iter().map(normalize).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_the_spec_example_array() {
        let raw = r#"[
          {"blockId":"b005","operation":"replace","newText":"hi","diff":true,"comment":"c"},
          {"blockId":"b010","operation":"delete"},
          {"afterBlockId":"b010","operation":"insert","text":"new block","type":"paragraph"},
          {"blockId":"b020","operation":"comment","comment":"review"}
        ]"#;
        let edits: Vec<Edit> = decode_json(raw).unwrap().into_iter().map(Result::unwrap).collect();
        assert_eq!(edits.len(), 4);
        assert_eq!(edits[0].operation_name(), "replace");
        assert_eq!(edits[0].target_ref(), "b005");
        assert_eq!(edits[2].target_ref(), "b010");
        assert_eq!(edits[2].operation_name(), "insert");
    }

    #[test]
    fn replace_defaults_diff_to_true() {
        let raw = r#"[{"blockId":"b001","operation":"replace","newText":"x"}]"#;
        let edits = decode_json(raw).unwrap();
        match edits[0].as_ref().unwrap() {
            Edit::Replace { diff, .. } => assert!(*diff),
            _ => panic!("expected replace"),
        }
    }

    #[test]
    fn unknown_operation_is_a_per_item_decode_error_not_a_parse_failure() {
        let raw = r#"[{"blockId":"b001","operation":"frobnicate"}]"#;
        let edits = decode_json(raw).unwrap();
        assert_eq!(edits.len(), 1);
        assert!(matches!(edits[0], Err(EditDecodeError::InvalidOperation)));
    }

    #[test]
    fn missing_required_field_is_a_per_item_decode_error() {
        let raw = r#"[{"operation":"replace"}]"#;
        let edits = decode_json(raw).unwrap();
        assert!(matches!(edits[0], Err(EditDecodeError::MissingField("blockId"))));
    }

    #[test]
    fn non_array_top_level_fails_to_parse() {
        let raw = r#"{"not":"an array"}"#;
        assert!(decode_json(raw).is_err());
    }
}
