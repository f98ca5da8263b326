//! Word-level tokenization and diff, used by the applicator's `replace`
//! dispatch to compute minimal tracked-change ops instead of a full-block
//! replace.

use similar::{capture_diff_slices, Algorithm, DiffOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Number,
    Punctuation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    /// Lowercased comparison key; diff runs over this, not `text`.
    pub normalized: String,
    pub offset: usize,
}

fn is_punctuation(c: char) -> bool {
    matches!(
        c,
        '.' | ',' | ';' | ':' | '!' | '?' | '\'' | '"' | '(' | ')' | '[' | ']' | '{' | '}'
            | '-' | '/' | '\\' | '—' | '–' | '…' | '“' | '”' | '‘' | '’' | '•' | '§' | '¶'
    )
}

fn classify_word(word: &str) -> TokenKind {
    if word.chars().all(|c| c.is_ascii_digit() || c == '.') && word.chars().any(|c| c.is_ascii_digit()) {
        TokenKind::Number
    } else {
        TokenKind::Word
    }
}

/// Split `text` into word, number, and punctuation tokens, recording byte
/// offsets and dropping whitespace runs (they carry no semantic weight in
/// the diff, only in reconstruction via the original string).
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let bytes = text.as_bytes();
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut i = 0;
    while i < chars.len() {
        let (offset, c) = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if is_punctuation(c) {
            let end = offset + c.len_utf8();
            tokens.push(Token {
                text: text[offset..end].to_string(),
                kind: TokenKind::Punctuation,
                normalized: c.to_lowercase().to_string(),
                offset,
            });
            i += 1;
            continue;
        }
        let start = offset;
        let mut end = offset;
        let mut j = i;
        while j < chars.len() {
            let (o, cc) = chars[j];
            if cc.is_whitespace() || is_punctuation(cc) {
                break;
            }
            end = o + cc.len_utf8();
            j += 1;
        }
        let word = std::str::from_utf8(&bytes[start..end]).unwrap_or("");
        tokens.push(Token {
            text: word.to_string(),
            kind: classify_word(word),
            normalized: word.to_lowercase(),
            offset: start,
        });
        i = j;
    }
    tokens
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffKind {
    Equal,
    Insert,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffGroup {
    pub kind: DiffKind,
    pub tokens: Vec<Token>,
}

/// Run the Myers diff algorithm over normalized token text, grouping
/// consecutive same-kind ops into `(equal|insert|delete, tokens)` runs.
pub fn word_diff(original: &[Token], updated: &[Token]) -> Vec<DiffGroup> {
    let original_norm: Vec<&str> = original.iter().map(|t| t.normalized.as_str()).collect();
    let updated_norm: Vec<&str> = updated.iter().map(|t| t.normalized.as_str()).collect();
    let ops = capture_diff_slices(Algorithm::Myers, &original_norm, &updated_norm);

    let mut groups: Vec<DiffGroup> = Vec::new();
    for op in ops {
        match op {
            DiffOp::Equal { old_index, len, .. } => {
                push_group(&mut groups, DiffKind::Equal, &original[old_index..old_index + len]);
            }
            DiffOp::Delete {
                old_index, old_len, ..
            } => {
                push_group(&mut groups, DiffKind::Delete, &original[old_index..old_index + old_len]);
            }
            DiffOp::Insert {
                new_index, new_len, ..
            } => {
                push_group(&mut groups, DiffKind::Insert, &updated[new_index..new_index + new_len]);
            }
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                push_group(&mut groups, DiffKind::Delete, &original[old_index..old_index + old_len]);
                push_group(&mut groups, DiffKind::Insert, &updated[new_index..new_index + new_len]);
            }
        }
    }
    groups
}

fn push_group(groups: &mut Vec<DiffGroup>, kind: DiffKind, tokens: &[Token]) {
    if tokens.is_empty() {
        return;
    }
    if let Some(last) = groups.last_mut() {
        if last.kind == kind {
            last.tokens.extend_from_slice(tokens);
            return;
        }
    }
    groups.push(DiffGroup {
        kind,
        tokens: tokens.to_vec(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_words_numbers_and_punctuation() {
        let tokens = tokenize("Hello, world 42.");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Word,
                TokenKind::Punctuation,
                TokenKind::Word,
                TokenKind::Number,
                TokenKind::Punctuation,
            ]
        );
    }

    #[test]
    fn tokenize_drops_whitespace_runs() {
        let tokens = tokenize("a    b");
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn tokenize_records_byte_offsets() {
        let tokens = tokenize("ab cd");
        assert_eq!(tokens[0].offset, 0);
        assert_eq!(tokens[1].offset, 3);
    }

    #[test]
    fn word_diff_identical_text_is_all_equal() {
        let a = tokenize("the quick fox");
        let b = tokenize("the quick fox");
        let groups = word_diff(&a, &b);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].kind, DiffKind::Equal);
    }

    #[test]
    fn word_diff_detects_single_word_change_as_delete_then_insert() {
        let a = tokenize("the quick fox");
        let b = tokenize("the slow fox");
        let groups = word_diff(&a, &b);
        let kinds: Vec<&DiffKind> = groups.iter().map(|g| &g.kind).collect();
        assert_eq!(kinds, vec![&DiffKind::Equal, &DiffKind::Delete, &DiffKind::Insert, &DiffKind::Equal]);
    }

    #[test]
    fn word_diff_pure_insertion_at_end() {
        let a = tokenize("hello");
        let b = tokenize("hello world");
        let groups = word_diff(&a, &b);
        assert_eq!(groups.last().unwrap().kind, DiffKind::Insert);
    }

    #[test]
    fn word_diff_pure_deletion() {
        let a = tokenize("hello world");
        let b = tokenize("hello");
        let groups = word_diff(&a, &b);
        assert_eq!(groups.last().unwrap().kind, DiffKind::Delete);
    }
}
